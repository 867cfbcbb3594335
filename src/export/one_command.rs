//! 单条命令导出：召唤一串叠放的实体模拟命令方块级联
//!
//! 结构（自下而上）：下落的红石块 -> 下落的激活铁轨 -> 若干命令方块矿车。
//! 矿车落到铁轨上后依次执行各自的命令，最后一辆负责清理。
//! 三个版本段的实体 ID 与嵌套标签不同：
//! - 1.8：`Riding` 向下嵌套（最外层是最顶端的矿车），`FallingSand` / `MinecartCommandBlock`
//! - 1.9-1.12：`Passengers` 向上嵌套，方块用 `Block:`，1.11 起实体 ID 改为小写下划线形式
//! - 1.13+：`Passengers`，方块用 `BlockState:{Name:...}`，矿车为 `command_block_minecart`

use crate::merge::merge_regions;
use crate::version::VersionProfile;
use crate::voxel::{BlockPos, Voxel};
use anyhow::{bail, Result};

/// 结构相对矿车的偏移：命令方块东侧一格、与命令方块同高
pub const STRUCTURE_OFFSET: BlockPos = [1, -2, 0];

/// 命令方块可接受的长度上限附近
const COMMAND_LENGTH_WARN: usize = 32_500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bracket {
    Riding,
    LegacyPassengers,
    Modern,
}

struct EntityIds {
    falling: &'static str,
    minecart: &'static str,
}

fn bracket(version: &VersionProfile) -> Bracket {
    if version.before("1.9") {
        Bracket::Riding
    } else if version.numeric_ids {
        Bracket::LegacyPassengers
    } else {
        Bracket::Modern
    }
}

fn entity_ids(version: &VersionProfile) -> EntityIds {
    if !version.numeric_ids {
        EntityIds {
            falling: "minecraft:falling_block",
            minecart: "minecraft:command_block_minecart",
        }
    } else if version.legacy_entity_ids {
        EntityIds {
            falling: "FallingSand",
            minecart: "MinecartCommandBlock",
        }
    } else {
        EntityIds {
            falling: "falling_block",
            minecart: "commandblock_minecart",
        }
    }
}

/// 转义为 NBT 字符串内容
fn escape(command: &str) -> String {
    command.replace('\\', "\\\\").replace('"', "\\\"")
}

/// 清理命令：移除命令方块、红石块与铁轨，再移除矿车
fn cleanup_commands(version: &VersionProfile) -> Vec<String> {
    let ids = entity_ids(version);
    let minecart = ids.minecart.trim_start_matches("minecraft:");
    let kill = if version.numeric_ids {
        format!("kill @e[type={},r=1]", minecart)
    } else {
        format!("kill @e[type={},distance=..2]", minecart)
    };
    let air = if version.numeric_ids { "air" } else { "minecraft:air" };
    vec![format!("fill ~ ~-2 ~ ~ ~ ~ {}", air), kill]
}

/// 生成单条召唤命令
pub fn generate_one_command(voxels: &[Voxel], version: &VersionProfile) -> Result<String> {
    if voxels.is_empty() {
        bail!("没有可导出的方块");
    }
    let mut commands: Vec<String> = merge_regions(voxels, version)
        .iter()
        .map(|r| r.translated(STRUCTURE_OFFSET).to_command())
        .collect();
    commands.extend(cleanup_commands(version));

    let ids = entity_ids(version);
    let block = |name: &str| -> String {
        match bracket(version) {
            Bracket::Modern => format!("BlockState:{{Name:\"minecraft:{}\"}}", name),
            _ => format!("Block:{}", name),
        }
    };
    let minecart = |command: &str| format!("id:{},Command:\"{}\"", ids.minecart, escape(command));

    let command = match bracket(version) {
        Bracket::Riding => {
            // 自底向上：红石块 <- 铁轨 <- 矿车...，每层骑在内层之上
            let mut inner = format!("id:{},{},Time:1", ids.falling, block("redstone_block"));
            inner = format!("id:{},{},Time:1,Riding:{{{}}}", ids.falling, block("activator_rail"), inner);
            for c in &commands[..commands.len() - 1] {
                inner = format!("{},Riding:{{{}}}", minecart(c), inner);
            }
            let top = &commands[commands.len() - 1];
            format!(
                "summon {} ~ ~1 ~ {{Command:\"{}\",Riding:{{{}}}}}",
                ids.minecart,
                escape(top),
                inner
            )
        }
        Bracket::LegacyPassengers | Bracket::Modern => {
            // 自顶向下：最内层是最后一条命令
            let mut chain: Option<String> = None;
            for c in commands.iter().rev() {
                chain = Some(match chain {
                    Some(above) => format!("{{{},Passengers:[{}]}}", minecart(c), above),
                    None => format!("{{{}}}", minecart(c)),
                });
            }
            let carts = chain.unwrap_or_default();
            let rail = format!(
                "{{id:{},{},Time:1,Passengers:[{}]}}",
                ids.falling,
                block("activator_rail"),
                carts
            );
            format!(
                "summon {} ~ ~1 ~ {{{},Time:1,Passengers:[{}]}}",
                ids.falling,
                block("redstone_block"),
                rail
            )
        }
    };

    if command.len() > COMMAND_LENGTH_WARN {
        log::warn!(
            "单条命令长度 {} 超过命令方块上限附近 ({})，游戏内可能无法粘贴",
            command.len(),
            COMMAND_LENGTH_WARN
        );
    }
    Ok(command)
}
