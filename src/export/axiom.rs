//! Axiom 蓝图（.bp）
//!
//! 文件布局：
//! ```text
//! [0x0A][E5 BB 36 00][元数据长度: 3 字节大端]
//! [元数据 NBT（未压缩）]
//! [缩略图长度: 4 字节大端][PNG]
//! [方块数据长度: 4 字节大端][gzip 压缩的方块数据 NBT]
//! ```
//! 方块数据按 16x16x16 分区，每个分区有独立调色板；
//! 打包为对齐格式（索引不跨 64 位字），调色板只有一项时省略 data。

use super::packing::{aligned_bits, pack_aligned};
use super::{compound, nbt_gzip, state_nbt, ExportMeta, Volume};
use crate::blocks::BlockState;
use crate::version::VersionProfile;
use crate::voxel::{BlockPos, Voxel};
use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use fastnbt::{LongArray, Value};
use std::collections::BTreeMap;

/// 格式字节
pub const FORMAT_BYTE: u8 = 0x0A;
/// 魔数
pub const MAGIC: [u8; 4] = [0xE5, 0xBB, 0x36, 0x00];
/// 元数据长度字段可表示的最大值
const MAX_METADATA_LEN: usize = 0xFF_FFFF;

/// 占位缩略图：1x1 PNG
const PLACEHOLDER_PNG: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

const REGION_EDGE: i32 = 16;

fn metadata_nbt(volume: &Volume, meta: &ExportMeta) -> Value {
    compound([
        ("Version", Value::Int(1)),
        ("Name", Value::String(meta.name.clone())),
        ("Author", Value::String(meta.author.clone())),
        ("Tags", Value::List(Vec::new())),
        ("ThumbnailYaw", Value::Float(meta.thumbnail_yaw)),
        ("ThumbnailPitch", Value::Float(meta.thumbnail_pitch)),
        ("LockedThumbnail", Value::Byte(0)),
        ("BlockCount", Value::Int(volume.block_count() as i32)),
        ("ContainsAir", Value::Byte(0)),
    ])
}

/// 单个 16³ 分区的 BlockStates：`{palette, data?}`
fn region_states(cells: &[(usize, &BlockState)]) -> Value {
    let mut palette: Vec<&BlockState> = Vec::new();
    let air = BlockState::air();
    palette.push(&air);
    let mut indices = vec![0usize; (REGION_EDGE * REGION_EDGE * REGION_EDGE) as usize];
    for &(slot, state) in cells {
        let index = match palette.iter().position(|s| *s == state) {
            Some(i) => i,
            None => {
                palette.push(state);
                palette.len() - 1
            }
        };
        indices[slot] = index;
    }

    let palette_nbt = Value::List(palette.iter().map(|s| state_nbt(s)).collect());
    if palette.len() == 1 {
        return compound([("palette", palette_nbt)]);
    }
    let data = pack_aligned(&indices, aligned_bits(palette.len()));
    compound([("palette", palette_nbt), ("data", Value::LongArray(LongArray::new(data)))])
}

fn block_data_nbt(volume: &Volume, version: &VersionProfile) -> Value {
    // 按分区坐标分组，BTreeMap 保证输出顺序稳定
    let mut regions: BTreeMap<BlockPos, Vec<(usize, &BlockState)>> = BTreeMap::new();
    for &(p, i) in &volume.cells {
        let key = p.map(|v| v.div_euclid(REGION_EDGE));
        let [lx, ly, lz] = p.map(|v| v.rem_euclid(REGION_EDGE));
        let slot = ((ly * REGION_EDGE + lz) * REGION_EDGE + lx) as usize;
        regions.entry(key).or_default().push((slot, &volume.palette[i]));
    }

    let list = regions
        .iter()
        .map(|(key, cells)| {
            compound([
                ("X", Value::Int(key[0])),
                ("Y", Value::Int(key[1])),
                ("Z", Value::Int(key[2])),
                ("BlockStates", region_states(cells)),
            ])
        })
        .collect();

    compound([
        ("DataVersion", Value::Int(version.data_version)),
        ("BlockRegion", Value::List(list)),
        ("BlockEntities", Value::List(Vec::new())),
    ])
}

/// 组装蓝图文件
pub fn blueprint_bytes(volume: &Volume, version: &VersionProfile, meta: &ExportMeta, thumbnail: &[u8]) -> Result<Vec<u8>> {
    let metadata = fastnbt::to_bytes(&metadata_nbt(volume, meta)).context("蓝图元数据序列化失败")?;
    if metadata.len() > MAX_METADATA_LEN {
        bail!("蓝图元数据过长: {} 字节", metadata.len());
    }
    let blocks = nbt_gzip(&block_data_nbt(volume, version))?;

    let mut out = Vec::with_capacity(8 + metadata.len() + 8 + thumbnail.len() + blocks.len());
    out.push(FORMAT_BYTE);
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&(metadata.len() as u32).to_be_bytes()[1..]);
    out.extend_from_slice(&metadata);
    out.extend_from_slice(&(thumbnail.len() as u32).to_be_bytes());
    out.extend_from_slice(thumbnail);
    out.extend_from_slice(&(blocks.len() as u32).to_be_bytes());
    out.extend_from_slice(&blocks);
    Ok(out)
}

pub fn placeholder_thumbnail() -> Result<Vec<u8>> {
    BASE64.decode(PLACEHOLDER_PNG).context("占位缩略图解码失败")
}

pub fn export_blueprint(voxels: &[Voxel], version: &VersionProfile, meta: &ExportMeta) -> Result<Vec<u8>> {
    let volume = Volume::resolve(voxels, version)?;
    blueprint_bytes(&volume, version, meta, &placeholder_thumbnail()?)
}
