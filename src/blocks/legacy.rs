//! 旧版（1.13 之前）数字 ID 时代的方块名与元数据编码

use super::{data_rows, parse_properties, property, warn_once, BlockState};
use crate::version::VersionProfile;
use once_cell::sync::Lazy;
use std::collections::HashMap;

const LEGACY_TSV: &str = include_str!("../../data/legacy.tsv");

/// 旧名表条目
#[derive(Debug, Clone)]
struct LegacyEntry {
    name: &'static str,
    meta: u8,
    /// 该旧名出现的版本，早于此版本使用替代方块
    since: Option<&'static str>,
    alt_name: &'static str,
    alt_meta: u8,
}

static LEGACY: Lazy<HashMap<&'static str, LegacyEntry>> = Lazy::new(|| {
    data_rows(LEGACY_TSV)
        .filter_map(|cols| {
            let modern = *cols.first()?;
            let entry = LegacyEntry {
                name: cols.get(1)?,
                meta: cols.get(2).and_then(|m| m.parse().ok()).unwrap_or(0),
                since: cols.get(3).copied(),
                alt_name: cols.get(4).copied().unwrap_or("stone"),
                alt_meta: cols.get(5).and_then(|m| m.parse().ok()).unwrap_or(0),
            };
            Some((modern, entry))
        })
        .collect()
});

/// 旧版方块短名及基础元数据
pub fn legacy_name(modern: &str, version: &VersionProfile) -> Option<(&'static str, u8)> {
    let entry = LEGACY.get(modern)?;
    match entry.since {
        Some(since) if version.before(since) => Some((entry.alt_name, entry.alt_meta)),
        _ => Some((entry.name, entry.meta)),
    }
}

/// 旧名表中是否有该方块（包括带替代方块的条目）
pub fn has_legacy_entry(modern: &str) -> bool {
    LEGACY.contains_key(modern)
}

/// 格式化为旧版命令中的方块标识：`name` 或 `name meta`（元数据为 0 时省略）
pub fn format_legacy(state: &BlockState, version: &VersionProfile) -> String {
    let (name, base, replaced) = match LEGACY.get(state.name.as_str()) {
        Some(entry) => match entry.since {
            Some(since) if version.before(since) => (entry.alt_name, entry.alt_meta, true),
            _ => (entry.name, entry.meta, false),
        },
        None => {
            warn_once(format!("方块 {} 没有旧版名称，使用 stone", state.name));
            ("stone", 0, true)
        }
    };

    let meta = if replaced || !has_property_semantics(&state.name) {
        base
    } else {
        base | metadata_from_pairs(&state.name, &state.properties)
    };

    if meta == 0 {
        name.to_string()
    } else {
        format!("{} {}", name, meta)
    }
}

fn has_property_semantics(block: &str) -> bool {
    block_kind(block).is_some()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Stairs,
    Slab,
    Log,
    Trapdoor,
    FenceGate,
    Door,
    Chest,
    Bed,
    Rail,
    PoweredRail,
}

fn block_kind(block: &str) -> Option<BlockKind> {
    let block = block.rsplit(':').next().unwrap_or(block);
    let kind = if block.ends_with("_stairs") {
        BlockKind::Stairs
    } else if block.ends_with("_slab") {
        BlockKind::Slab
    } else if block.ends_with("_log") || block.ends_with("_wood") {
        BlockKind::Log
    } else if block.ends_with("_trapdoor") {
        BlockKind::Trapdoor
    } else if block.ends_with("_fence_gate") {
        BlockKind::FenceGate
    } else if block.ends_with("_door") {
        BlockKind::Door
    } else if matches!(block, "chest" | "trapped_chest" | "ender_chest") {
        BlockKind::Chest
    } else if block.ends_with("_bed") {
        BlockKind::Bed
    } else if block == "rail" {
        BlockKind::Rail
    } else if matches!(block, "powered_rail" | "detector_rail" | "activator_rail") {
        BlockKind::PoweredRail
    } else {
        return None;
    };
    Some(kind)
}

/// 属性 -> 旧版元数据位
///
/// 未知方块或属性缺失返回 0
pub fn properties_to_metadata(block: &str, props: Option<&str>) -> u8 {
    match props {
        Some(p) => metadata_from_pairs(block, &parse_properties(p)),
        None => 0,
    }
}

fn metadata_from_pairs(block: &str, props: &[(String, String)]) -> u8 {
    let Some(kind) = block_kind(block) else {
        return 0;
    };
    let get = |key: &str| property(props, key).unwrap_or("");
    let flag = |key: &str, value: &str| get(key) == value;

    match kind {
        BlockKind::Stairs => {
            let facing = index_of(get("facing"), &["east", "west", "south", "north"]);
            facing + if flag("half", "top") { 4 } else { 0 }
        }
        BlockKind::Slab => {
            if flag("type", "top") {
                8
            } else {
                0
            }
        }
        BlockKind::Log => match get("axis") {
            "x" => 4,
            "z" => 8,
            _ => 0,
        },
        BlockKind::Trapdoor => {
            let facing = index_of(get("facing"), &["north", "south", "west", "east"]);
            facing
                + if flag("open", "true") { 4 } else { 0 }
                + if flag("half", "top") { 8 } else { 0 }
        }
        BlockKind::FenceGate => {
            let facing = index_of(get("facing"), &["south", "west", "north", "east"]);
            facing + if flag("open", "true") { 4 } else { 0 }
        }
        BlockKind::Door => {
            if flag("half", "upper") {
                8 + if flag("hinge", "right") { 1 } else { 0 }
                    + if flag("powered", "true") { 2 } else { 0 }
            } else {
                let facing = index_of(get("facing"), &["east", "south", "west", "north"]);
                facing + if flag("open", "true") { 4 } else { 0 }
            }
        }
        BlockKind::Chest => match get("facing") {
            "north" => 2,
            "south" => 3,
            "west" => 4,
            "east" => 5,
            _ => 0,
        },
        BlockKind::Bed => {
            let facing = index_of(get("facing"), &["south", "west", "north", "east"]);
            facing + if flag("part", "head") { 8 } else { 0 }
        }
        BlockKind::Rail => rail_shape(get("shape")).unwrap_or(0),
        BlockKind::PoweredRail => {
            let shape = rail_shape(get("shape")).filter(|s| *s <= 5).unwrap_or(0);
            shape + if flag("powered", "true") { 8 } else { 0 }
        }
    }
}

fn index_of(value: &str, table: &[&str]) -> u8 {
    table.iter().position(|v| *v == value).unwrap_or(0) as u8
}

fn rail_shape(shape: &str) -> Option<u8> {
    let table = [
        "north_south",
        "east_west",
        "ascending_east",
        "ascending_west",
        "ascending_north",
        "ascending_south",
        "south_east",
        "south_west",
        "north_west",
        "north_east",
    ];
    table.iter().position(|s| *s == shape).map(|i| i as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::resolve_block_id;
    use crate::version::profile;

    #[test]
    fn test_stairs_metadata() {
        let cases = [
            ("facing=east,half=bottom", 0),
            ("facing=west,half=bottom", 1),
            ("facing=south,half=bottom", 2),
            ("facing=north,half=bottom", 3),
            ("facing=east,half=top", 4),
            ("facing=north,half=top", 7),
        ];
        for (props, expected) in cases {
            assert_eq!(properties_to_metadata("oak_stairs", Some(props)), expected, "{}", props);
        }
    }

    #[test]
    fn test_slab_and_log_metadata() {
        assert_eq!(properties_to_metadata("oak_slab", Some("type=bottom")), 0);
        assert_eq!(properties_to_metadata("stone_slab", Some("type=top")), 8);
        assert_eq!(properties_to_metadata("oak_log", Some("axis=y")), 0);
        assert_eq!(properties_to_metadata("oak_log", Some("axis=x")), 4);
        assert_eq!(properties_to_metadata("spruce_log", Some("axis=z")), 8);
    }

    #[test]
    fn test_trapdoor_metadata() {
        assert_eq!(properties_to_metadata("oak_trapdoor", Some("facing=north,half=bottom,open=false")), 0);
        assert_eq!(properties_to_metadata("oak_trapdoor", Some("facing=south,half=bottom,open=false")), 1);
        assert_eq!(properties_to_metadata("oak_trapdoor", Some("facing=west,half=bottom,open=true")), 6);
        assert_eq!(properties_to_metadata("oak_trapdoor", Some("facing=north,half=top,open=true")), 12);
        assert_eq!(properties_to_metadata("iron_trapdoor", Some("facing=east,half=top,open=true")), 15);
    }

    #[test]
    fn test_fence_gate_and_door_metadata() {
        assert_eq!(properties_to_metadata("oak_fence_gate", Some("facing=south,open=false")), 0);
        assert_eq!(properties_to_metadata("oak_fence_gate", Some("facing=east,open=true")), 7);
        assert_eq!(properties_to_metadata("oak_door", Some("facing=east,half=lower,open=false")), 0);
        assert_eq!(properties_to_metadata("oak_door", Some("facing=north,half=lower,open=true")), 7);
        assert_eq!(properties_to_metadata("oak_door", Some("half=upper,hinge=left,powered=false")), 8);
        assert_eq!(properties_to_metadata("oak_door", Some("half=upper,hinge=right,powered=true")), 11);
    }

    #[test]
    fn test_chest_and_bed_metadata() {
        assert_eq!(properties_to_metadata("chest", Some("facing=north")), 2);
        assert_eq!(properties_to_metadata("chest", Some("facing=south")), 3);
        assert_eq!(properties_to_metadata("chest", Some("facing=west")), 4);
        assert_eq!(properties_to_metadata("chest", Some("facing=east")), 5);
        assert_eq!(properties_to_metadata("red_bed", Some("facing=south,part=foot")), 0);
        assert_eq!(properties_to_metadata("red_bed", Some("facing=north,part=head")), 10);
    }

    #[test]
    fn test_rail_metadata() {
        assert_eq!(properties_to_metadata("rail", Some("shape=north_south")), 0);
        assert_eq!(properties_to_metadata("rail", Some("shape=ascending_south")), 5);
        assert_eq!(properties_to_metadata("rail", Some("shape=north_east")), 9);
        assert_eq!(properties_to_metadata("powered_rail", Some("shape=north_south,powered=true")), 8);
        assert_eq!(properties_to_metadata("powered_rail", Some("shape=ascending_west,powered=false")), 3);
        // 动力铁轨没有弯道形状
        assert_eq!(properties_to_metadata("powered_rail", Some("shape=south_east,powered=true")), 8);
    }

    #[test]
    fn test_unknown_or_missing() {
        assert_eq!(properties_to_metadata("stone", Some("facing=north")), 0);
        assert_eq!(properties_to_metadata("oak_stairs", None), 0);
        assert_eq!(properties_to_metadata("not_a_block", None), 0);
    }

    #[test]
    fn test_format_legacy_tokens() {
        let v = profile("1.12");
        assert_eq!(resolve_block_id("stone", None, v), "stone");
        assert_eq!(resolve_block_id("spruce_planks", None, v), "planks 1");
        assert_eq!(resolve_block_id("oak_stairs", Some("facing=north,half=top"), v), "oak_stairs 7");
        assert_eq!(resolve_block_id("birch_log", Some("axis=x"), v), "log 6");
        assert_eq!(resolve_block_id("brick_slab", Some("type=top"), v), "stone_slab 12");
        assert_eq!(resolve_block_id("white_concrete", None, v), "concrete");
        // 1.12 之前混凝土不存在
        assert_eq!(resolve_block_id("red_concrete", None, profile("1.10")), "wool 14");
        // 1.13 之后的方块先回退再映射
        assert_eq!(resolve_block_id("cherry_planks", None, v), "planks");
    }

    #[test]
    fn test_pre_flattening_blocks_use_curated_alternatives() {
        assert_eq!(resolve_block_id("purpur_block", None, profile("1.8")), "quartz_block");
        assert_eq!(resolve_block_id("magma_block", None, profile("1.9")), "netherrack");
        assert_eq!(resolve_block_id("observer", None, profile("1.10")), "dispenser");
        assert_eq!(resolve_block_id("magma_block", None, profile("1.10")), "magma");
    }
}
