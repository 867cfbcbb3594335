//! Litematica 投影（.litematic）

use super::packing::{pack_spanning, spanning_bits};
use super::{compound, nbt_gzip, state_nbt, xyz, ExportMeta, Volume};
use crate::version::VersionProfile;
use crate::voxel::Voxel;
use anyhow::Result;
use fastnbt::{LongArray, Value};

/// 自该 DataVersion（1.20.5）起使用格式版本 6
const V6_DATA_VERSION: i32 = 3837;

fn format_version(version: &VersionProfile) -> i32 {
    if version.data_version >= V6_DATA_VERSION {
        6
    } else {
        5
    }
}

pub fn litematic_nbt(volume: &Volume, version: &VersionProfile, meta: &ExportMeta) -> Value {
    let bits = spanning_bits(volume.palette.len());
    let states = pack_spanning(&volume.dense(), bits);
    let palette = volume.palette.iter().map(state_nbt).collect();

    let region = compound([
        ("Position", xyz([0, 0, 0])),
        ("Size", xyz(volume.size)),
        ("BlockStatePalette", Value::List(palette)),
        ("BlockStates", Value::LongArray(LongArray::new(states))),
        ("TileEntities", Value::List(Vec::new())),
        ("Entities", Value::List(Vec::new())),
        ("PendingBlockTicks", Value::List(Vec::new())),
        ("PendingFluidTicks", Value::List(Vec::new())),
    ]);

    let region_name = if meta.name.is_empty() { "main".to_string() } else { meta.name.clone() };
    let metadata = compound([
        ("Name", Value::String(meta.name.clone())),
        ("Author", Value::String(meta.author.clone())),
        ("Description", Value::String(meta.description.clone())),
        ("RegionCount", Value::Int(1)),
        ("TimeCreated", Value::Long(meta.created)),
        ("TimeModified", Value::Long(meta.created)),
        ("TotalBlocks", Value::Int(volume.block_count() as i32)),
        ("TotalVolume", Value::Int(volume.volume() as i32)),
        ("EnclosingSize", xyz(volume.size)),
    ]);

    let mut root = vec![
        ("Version".to_string(), Value::Int(format_version(version))),
        ("MinecraftDataVersion".to_string(), Value::Int(version.data_version)),
        ("Metadata".to_string(), metadata),
        (
            "Regions".to_string(),
            Value::Compound([(region_name, region)].into_iter().collect()),
        ),
    ];
    if format_version(version) >= 6 {
        root.push(("SubVersion".to_string(), Value::Int(1)));
    }
    Value::Compound(root.into_iter().collect())
}

pub fn export_litematic(voxels: &[Voxel], version: &VersionProfile, meta: &ExportMeta) -> Result<Vec<u8>> {
    let volume = Volume::resolve(voxels, version)?;
    nbt_gzip(&litematic_nbt(&volume, version, meta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::packing::unpack_spanning;
    use crate::export::read_gzip_nbt;
    use crate::version::profile;

    fn get<'a>(v: &'a Value, key: &str) -> &'a Value {
        match v {
            Value::Compound(map) => &map[key],
            _ => panic!("不是 compound"),
        }
    }

    #[test]
    fn test_litematic_layout() {
        let voxels: Vec<Voxel> = ["stone", "dirt", "glass", "oak_planks"]
            .iter()
            .enumerate()
            .map(|(i, t)| Voxel::new([i as i32, 0, 0], *t))
            .chain(std::iter::once(Voxel::new([0, 1, 1], "stone")))
            .collect();
        let mut meta = ExportMeta::new("tower");
        meta.author = "builder".to_string();
        let root = read_gzip_nbt(&export_litematic(&voxels, profile("1.21"), &meta).unwrap()).unwrap();

        assert_eq!(get(&root, "Version"), &Value::Int(6));
        assert_eq!(get(&root, "SubVersion"), &Value::Int(1));
        assert_eq!(get(&root, "MinecraftDataVersion"), &Value::Int(3953));
        let m = get(&root, "Metadata");
        assert_eq!(get(m, "TotalBlocks"), &Value::Int(5));
        assert_eq!(get(m, "TotalVolume"), &Value::Int(16));
        assert_eq!(get(m, "Author"), &Value::String("builder".into()));

        let region = get(get(&root, "Regions"), "tower");
        let Value::LongArray(states) = get(region, "BlockStates") else { panic!() };
        // 5 个调色板条目 -> 3 位，16 格共 48 位
        assert_eq!(states.len(), 1);
        let indices = unpack_spanning(states, 3, 16);
        assert_eq!(&indices[..4], &[1, 2, 3, 4]);
        // (0,1,1) -> 0 + 1*4 + 1*4*2 = 12
        assert_eq!(indices[12], 1);
    }

    #[test]
    fn test_old_format_version() {
        let voxels = vec![Voxel::new([0, 0, 0], "stone")];
        let root = read_gzip_nbt(&export_litematic(&voxels, profile("1.18"), &ExportMeta::new("")).unwrap()).unwrap();
        assert_eq!(get(&root, "Version"), &Value::Int(5));
        let Value::Compound(map) = &root else { panic!() };
        assert!(!map.contains_key("SubVersion"));
        // 两项调色板仍使用最小 2 位
        let region = get(get(&root, "Regions"), "main");
        let Value::LongArray(states) = get(region, "BlockStates") else { panic!() };
        assert_eq!(unpack_spanning(states, 2, 1), vec![1]);
    }
}
