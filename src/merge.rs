//! 区域合并（贪心网格化）与命令编译
//!
//! 按解析后的方块标识分组，每组独立地沿 X、Z、Y 依次扩展为最大长方体。
//! 不同标识的坐标集合互不相交，各组可并行处理后按分组顺序拼接。

use crate::blocks::{is_air_name, resolve_block_id};
use crate::version::VersionProfile;
use crate::voxel::{BlockPos, Bounds, Voxel};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

/// 单个 fill 区域每条边的上限，保证体积不超过 32768
pub const MAX_REGION_EDGE: i32 = 32;

/// 合并后的长方体区域
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub min: BlockPos,
    pub max: BlockPos,
    /// 目标版本下的方块标识
    pub block: String,
}

impl Region {
    pub fn is_single(&self) -> bool {
        self.min == self.max
    }

    pub fn volume(&self) -> i64 {
        Bounds {
            min: self.min,
            max: self.max,
        }
        .volume()
    }

    /// 整体平移
    pub fn translated(&self, d: BlockPos) -> Region {
        Region {
            min: [self.min[0] + d[0], self.min[1] + d[1], self.min[2] + d[2]],
            max: [self.max[0] + d[0], self.max[1] + d[1], self.max[2] + d[2]],
            block: self.block.clone(),
        }
    }

    /// 相对坐标的 `setblock` / `fill` 命令（不带前导斜杠）
    pub fn to_command(&self) -> String {
        let [x1, y1, z1] = self.min;
        if self.is_single() {
            format!("setblock ~{} ~{} ~{} {}", x1, y1, z1, self.block)
        } else {
            let [x2, y2, z2] = self.max;
            format!("fill ~{} ~{} ~{} ~{} ~{} ~{} {}", x1, y1, z1, x2, y2, z2, self.block)
        }
    }
}

/// 将坐标平移到以全局最小值为原点
pub fn normalize_positions(voxels: &[Voxel]) -> Vec<Voxel> {
    let Some(bounds) = Bounds::enclosing(voxels.iter().map(|v| &v.position)) else {
        return Vec::new();
    };
    voxels
        .iter()
        .map(|v| Voxel {
            position: [
                v.position[0] - bounds.min[0],
                v.position[1] - bounds.min[1],
                v.position[2] - bounds.min[2],
            ],
            ..v.clone()
        })
        .collect()
}

/// 贪心合并一组坐标，返回覆盖全部坐标且互不重叠的长方体
pub fn greedy_merge(positions: &[BlockPos]) -> Vec<(BlockPos, BlockPos)> {
    let cells: HashSet<BlockPos> = positions.iter().copied().collect();
    let mut visited: HashSet<BlockPos> = HashSet::with_capacity(cells.len());
    let free = |p: &BlockPos, visited: &HashSet<BlockPos>| cells.contains(p) && !visited.contains(p);
    let mut boxes = Vec::new();

    for &seed in positions {
        if visited.contains(&seed) {
            continue;
        }
        let [x0, y0, z0] = seed;

        let mut x1 = x0;
        while x1 - x0 + 1 < MAX_REGION_EDGE && free(&[x1 + 1, y0, z0], &visited) {
            x1 += 1;
        }

        let mut z1 = z0;
        while z1 - z0 + 1 < MAX_REGION_EDGE && (x0..=x1).all(|x| free(&[x, y0, z1 + 1], &visited)) {
            z1 += 1;
        }

        let mut y1 = y0;
        while y1 - y0 + 1 < MAX_REGION_EDGE
            && (z0..=z1).all(|z| (x0..=x1).all(|x| free(&[x, y1 + 1, z], &visited)))
        {
            y1 += 1;
        }

        for y in y0..=y1 {
            for z in z0..=z1 {
                for x in x0..=x1 {
                    visited.insert([x, y, z]);
                }
            }
        }
        boxes.push(([x0, y0, z0], [x1, y1, z1]));
    }
    boxes
}

/// 规范化坐标、解析方块标识并分组合并
pub fn merge_regions(voxels: &[Voxel], version: &VersionProfile) -> Vec<Region> {
    // 同一坐标以最后一次出现为准，空气不生成命令
    let last: HashMap<BlockPos, usize> = voxels.iter().enumerate().map(|(i, v)| (v.position, i)).collect();
    let winners: Vec<Voxel> = voxels
        .iter()
        .enumerate()
        .filter(|(i, v)| last[&v.position] == *i && !is_air_name(&v.block_type))
        .map(|(_, v)| v.clone())
        .collect();
    let normalized = normalize_positions(&winners);

    // 分组保持首次出现的顺序
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<BlockPos>> = HashMap::new();
    for v in &normalized {
        let id = resolve_block_id(&v.block_type, v.properties.as_deref(), version);
        groups
            .entry(id.clone())
            .or_insert_with(|| {
                order.push(id);
                Vec::new()
            })
            .push(v.position);
    }

    order
        .par_iter()
        .map(|id| {
            greedy_merge(&groups[id])
                .into_iter()
                .map(|(min, max)| Region {
                    min,
                    max,
                    block: id.clone(),
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::profile;

    fn cover(boxes: &[(BlockPos, BlockPos)]) -> Vec<BlockPos> {
        boxes
            .iter()
            .flat_map(|(a, b)| Bounds::new(*a, *b).positions().collect::<Vec<_>>())
            .collect()
    }

    fn assert_exact_cover(input: &[BlockPos]) {
        let boxes = greedy_merge(input);
        let covered = cover(&boxes);
        let unique: HashSet<BlockPos> = covered.iter().copied().collect();
        assert_eq!(unique.len(), covered.len(), "区域重叠");
        let expected: HashSet<BlockPos> = input.iter().copied().collect();
        assert_eq!(unique, expected);
    }

    #[test]
    fn test_solid_box_merges_to_one() {
        let input: Vec<BlockPos> = Bounds::new([0, 0, 0], [4, 3, 2]).positions().collect();
        let boxes = greedy_merge(&input);
        assert_eq!(boxes, vec![([0, 0, 0], [4, 3, 2])]);
    }

    #[test]
    fn test_exact_cover_irregular() {
        let input: Vec<BlockPos> = Bounds::new([0, 0, 0], [9, 9, 9])
            .positions()
            .filter(|p| crate::builder::random_at(p[0], p[1], p[2], 3) < 0.6)
            .collect();
        assert_exact_cover(&input);
    }

    #[test]
    fn test_exact_cover_l_shape_and_duplicates() {
        let mut input: Vec<BlockPos> = Bounds::new([0, 0, 0], [5, 0, 0]).positions().collect();
        input.extend(Bounds::new([0, 0, 1], [2, 0, 3]).positions());
        input.push([0, 0, 0]);
        assert_exact_cover(&input);
    }

    #[test]
    fn test_edge_cap() {
        let input: Vec<BlockPos> = (0..70).map(|x| [x, 0, 0]).collect();
        let boxes = greedy_merge(&input);
        assert_eq!(boxes.len(), 3);
        assert!(boxes.iter().all(|(a, b)| b[0] - a[0] < MAX_REGION_EDGE));
    }

    #[test]
    fn test_commands_relative_and_normalized() {
        let voxels = vec![
            Voxel::new([10, 64, 10], "stone"),
            Voxel::new([11, 64, 10], "stone"),
            Voxel::new([12, 65, 10], "oak_planks"),
        ];
        let regions = merge_regions(&voxels, profile("1.21"));
        let commands: Vec<String> = regions.iter().map(Region::to_command).collect();
        assert_eq!(
            commands,
            vec![
                "fill ~0 ~0 ~0 ~1 ~0 ~0 minecraft:stone".to_string(),
                "setblock ~2 ~1 ~0 minecraft:oak_planks".to_string(),
            ]
        );
    }

    #[test]
    fn test_identity_groups_do_not_merge() {
        let voxels = vec![
            Voxel::new([0, 0, 0], "oak_stairs").with_properties("facing=north"),
            Voxel::new([1, 0, 0], "oak_stairs").with_properties("facing=south"),
        ];
        assert_eq!(merge_regions(&voxels, profile("1.21")).len(), 2);
        // 1.12 中两者元数据不同
        assert_eq!(merge_regions(&voxels, profile("1.12")).len(), 2);
    }

    #[test]
    fn test_last_write_wins_and_air_skipped() {
        let voxels = vec![
            Voxel::new([0, 0, 0], "stone"),
            Voxel::new([1, 0, 0], "air"),
            Voxel::new([0, 0, 0], "glass"),
        ];
        let regions = merge_regions(&voxels, profile("1.21"));
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].block, "minecraft:glass");
    }
}
