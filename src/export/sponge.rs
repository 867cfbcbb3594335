//! Sponge Schematic v3（.schem，WorldEdit 使用）

use super::packing::write_varint;
use super::{compound, nbt_gzip, ExportMeta, Volume};
use crate::version::VersionProfile;
use crate::voxel::Voxel;
use anyhow::{bail, Result};
use fastnbt::{ByteArray, IntArray, Value};

/// 调色板键：`minecraft:name[k=v,...]`
pub fn schematic_nbt(volume: &Volume, version: &VersionProfile, meta: &ExportMeta) -> Result<Value> {
    if volume.size.iter().any(|s| *s > u16::MAX as i32) {
        bail!("结构尺寸 {:?} 超出 Sponge 格式的 16 位上限", volume.size);
    }

    let palette = volume
        .palette
        .iter()
        .enumerate()
        .map(|(i, state)| (state.modern_id(), Value::Int(i as i32)))
        .collect();

    let mut data = Vec::with_capacity(volume.volume() as usize);
    for index in volume.dense() {
        write_varint(&mut data, index as u32);
    }

    let [w, h, l] = volume.size;
    let schematic = compound([
        ("Version", Value::Int(3)),
        ("DataVersion", Value::Int(version.data_version)),
        ("Width", Value::Short(w as u16 as i16)),
        ("Height", Value::Short(h as u16 as i16)),
        ("Length", Value::Short(l as u16 as i16)),
        ("Offset", Value::IntArray(IntArray::new(vec![0, 0, 0]))),
        (
            "Metadata",
            compound([
                ("Name", Value::String(meta.name.clone())),
                ("Author", Value::String(meta.author.clone())),
                ("Date", Value::Long(meta.created)),
            ]),
        ),
        (
            "Blocks",
            compound([
                ("Palette", Value::Compound(palette)),
                ("Data", Value::ByteArray(ByteArray::new(data.into_iter().map(|b| b as i8).collect()))),
                ("BlockEntities", Value::List(Vec::new())),
            ]),
        ),
    ]);
    Ok(compound([("Schematic", schematic)]))
}

pub fn export_schematic(voxels: &[Voxel], version: &VersionProfile, meta: &ExportMeta) -> Result<Vec<u8>> {
    let volume = Volume::resolve(voxels, version)?;
    nbt_gzip(&schematic_nbt(&volume, version, meta)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::packing::read_varint;
    use crate::export::read_gzip_nbt;
    use crate::version::profile;

    fn get<'a>(v: &'a Value, key: &str) -> &'a Value {
        match v {
            Value::Compound(map) => &map[key],
            _ => panic!("不是 compound"),
        }
    }

    #[test]
    fn test_schematic_v3_layout() {
        let mut voxels = vec![Voxel::new([0, 0, 0], "stone"), Voxel::new([2, 1, 1], "oak_log").with_properties("axis=x")];
        for i in 0..140 {
            let color = ["white_wool", "red_wool", "blue_wool"][i % 3];
            voxels.push(Voxel::new([3 + i as i32, 0, 0], color));
        }
        voxels.push(Voxel::new([0, 2, 0], "glass"));
        let bytes = export_schematic(&voxels, profile("1.21"), &ExportMeta::new("test")).unwrap();
        let root = read_gzip_nbt(&bytes).unwrap();
        let s = get(&root, "Schematic");

        assert_eq!(get(s, "Version"), &Value::Int(3));
        assert_eq!(get(s, "DataVersion"), &Value::Int(3953));
        assert_eq!(get(s, "Width"), &Value::Short(143));
        assert_eq!(get(s, "Height"), &Value::Short(3));
        assert_eq!(get(s, "Length"), &Value::Short(2));

        let blocks = get(s, "Blocks");
        let Value::Compound(palette) = get(blocks, "Palette") else { panic!() };
        assert_eq!(palette["minecraft:air"], Value::Int(0));
        let log_index = match palette["minecraft:oak_log[axis=x]"] {
            Value::Int(i) => i as u32,
            _ => panic!(),
        };

        let Value::ByteArray(data) = get(blocks, "Data") else { panic!() };
        let bytes: Vec<u8> = data.iter().map(|b| *b as u8).collect();
        let mut indices = Vec::new();
        let mut rest = &bytes[..];
        while !rest.is_empty() {
            let (v, n) = read_varint(rest).unwrap();
            indices.push(v);
            rest = &rest[n..];
        }
        assert_eq!(indices.len(), 143 * 3 * 2);
        // 线性索引 x + z*W + y*W*L
        assert_eq!(indices[2 + 143 + 143 * 2], log_index);
        assert_eq!(indices[0], 1);
    }
}
