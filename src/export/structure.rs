//! 原版结构文件（.nbt）

use super::{nbt_gzip, state_nbt, Volume};
use crate::version::VersionProfile;
use crate::voxel::Voxel;
use anyhow::Result;
use fastnbt::Value;

/// 构建结构 NBT：`DataVersion`、`size`、`palette`、`blocks`、`entities`
pub fn structure_nbt(volume: &Volume, version: &VersionProfile) -> Value {
    // 结构文件只列出实际方块，调色板不需要空气
    let palette = volume.palette[1..].iter().map(state_nbt).collect();
    let blocks = volume
        .cells
        .iter()
        .map(|(p, i)| {
            super::compound([
                ("pos", Value::List(p.iter().map(|v| Value::Int(*v)).collect())),
                ("state", Value::Int(*i as i32 - 1)),
            ])
        })
        .collect();

    super::compound([
        ("DataVersion", Value::Int(version.data_version)),
        ("size", Value::List(volume.size.iter().map(|v| Value::Int(*v)).collect())),
        ("palette", Value::List(palette)),
        ("blocks", Value::List(blocks)),
        ("entities", Value::List(Vec::new())),
    ])
}

/// 导出为 gzip 压缩的结构文件
pub fn export_structure(voxels: &[Voxel], version: &VersionProfile) -> Result<Vec<u8>> {
    let volume = Volume::resolve(voxels, version)?;
    if volume.size.iter().any(|s| *s > 48) {
        log::warn!("结构尺寸 {:?} 超过结构方块的 48 格限制，只能通过其它工具加载", volume.size);
    }
    nbt_gzip(&structure_nbt(&volume, version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::read_gzip_nbt;
    use crate::version::profile;

    fn get<'a>(v: &'a Value, key: &str) -> &'a Value {
        match v {
            Value::Compound(map) => &map[key],
            _ => panic!("不是 compound"),
        }
    }

    #[test]
    fn test_structure_layout() {
        let voxels = vec![
            Voxel::new([10, 5, 10], "stone"),
            Voxel::new([11, 5, 10], "oak_stairs").with_properties("facing=east"),
            Voxel::new([10, 6, 12], "stone"),
        ];
        let bytes = export_structure(&voxels, profile("1.20")).unwrap();
        let root = read_gzip_nbt(&bytes).unwrap();

        assert_eq!(get(&root, "DataVersion"), &Value::Int(3700));
        assert_eq!(
            get(&root, "size"),
            &Value::List(vec![Value::Int(2), Value::Int(2), Value::Int(3)])
        );
        let Value::List(palette) = get(&root, "palette") else { panic!() };
        assert_eq!(palette.len(), 2);
        assert_eq!(get(&palette[0], "Name"), &Value::String("minecraft:stone".into()));
        assert_eq!(
            get(get(&palette[1], "Properties"), "facing"),
            &Value::String("east".into())
        );

        let Value::List(blocks) = get(&root, "blocks") else { panic!() };
        assert_eq!(blocks.len(), 3);
        assert_eq!(get(&blocks[2], "pos"), &Value::List(vec![Value::Int(0), Value::Int(1), Value::Int(2)]));
        assert_eq!(get(&blocks[2], "state"), &Value::Int(0));
        assert_eq!(get(&blocks[1], "state"), &Value::Int(1));
    }

    #[test]
    fn test_version_fallback_in_palette() {
        let voxels = vec![Voxel::new([0, 0, 0], "cherry_planks")];
        let root = read_gzip_nbt(&export_structure(&voxels, profile("1.16")).unwrap()).unwrap();
        let Value::List(palette) = get(&root, "palette") else { panic!() };
        assert_eq!(get(&palette[0], "Name"), &Value::String("minecraft:oak_planks".into()));
    }
}
