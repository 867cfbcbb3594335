//! 命令脚本：每个合并区域一行相对坐标命令

use crate::merge::{merge_regions, Region};
use crate::version::VersionProfile;
use crate::voxel::Voxel;

/// 合并后的 `setblock` / `fill` 命令列表
pub fn generate_optimized_commands(voxels: &[Voxel], version: &VersionProfile) -> Vec<String> {
    let regions = merge_regions(voxels, version);
    log::debug!("{} 个方块合并为 {} 条命令", voxels.len(), regions.len());
    regions.iter().map(Region::to_command).collect()
}

/// 清除区域：以不超过 32 格边长的 `fill ... air` 覆盖整个包围盒
pub fn clear_commands(size: [i32; 3], version: &VersionProfile) -> Vec<String> {
    let air = if version.numeric_ids { "air" } else { "minecraft:air" };
    let step = crate::merge::MAX_REGION_EDGE;
    let mut out = Vec::new();
    for y in (0..size[1]).step_by(step as usize) {
        for z in (0..size[2]).step_by(step as usize) {
            for x in (0..size[0]).step_by(step as usize) {
                let x2 = (x + step - 1).min(size[0] - 1);
                let y2 = (y + step - 1).min(size[1] - 1);
                let z2 = (z + step - 1).min(size[2] - 1);
                out.push(format!("fill ~{} ~{} ~{} ~{} ~{} ~{} {}", x, y, z, x2, y2, z2, air));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::profile;

    #[test]
    fn test_version_token_format() {
        let voxels = vec![
            Voxel::new([0, 0, 0], "oak_stairs").with_properties("facing=north,half=top"),
            Voxel::new([0, 1, 0], "spruce_planks"),
        ];
        assert_eq!(
            generate_optimized_commands(&voxels, profile("1.21")),
            vec![
                "setblock ~0 ~0 ~0 minecraft:oak_stairs[facing=north,half=top]",
                "setblock ~0 ~1 ~0 minecraft:spruce_planks",
            ]
        );
        assert_eq!(
            generate_optimized_commands(&voxels, profile("1.12")),
            vec!["setblock ~0 ~0 ~0 oak_stairs 7", "setblock ~0 ~1 ~0 planks 1"]
        );
    }

    #[test]
    fn test_deterministic_output() {
        let build = || {
            let mut b = crate::builder::Builder::new();
            b.draw_sphere([0, 0, 0], 4.0, "stone", &Default::default());
            b.scatter([-6, -6], [6, 6], 5, "oak_leaves", 0.3, &Default::default());
            generate_optimized_commands(&b.voxels(), profile("1.20"))
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_clear_commands_tile_box() {
        let cmds = clear_commands([40, 5, 10], profile("1.21"));
        assert_eq!(
            cmds,
            vec![
                "fill ~0 ~0 ~0 ~31 ~4 ~9 minecraft:air",
                "fill ~32 ~0 ~0 ~39 ~4 ~9 minecraft:air",
            ]
        );
        assert_eq!(clear_commands([1, 1, 1], profile("1.8")), vec!["fill ~0 ~0 ~0 ~0 ~0 ~0 air"]);
    }
}
