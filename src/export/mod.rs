//! 多格式导出
//!
//! 所有导出器共享同一前置步骤：坐标平移到以全局最小值为原点、
//! 逐个解析方块状态、构建调色板（索引 0 固定为空气）。

pub mod axiom;
pub mod commands;
pub mod datapack;
pub mod litematica;
pub mod one_command;
pub mod packing;
pub mod sponge;
pub mod structure;

use crate::blocks::{is_air_name, resolve_state, BlockState};
use crate::version::VersionProfile;
use crate::voxel::{BlockPos, Bounds, Voxel};
use anyhow::{bail, Context, Result};
use fastnbt::Value;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// 导出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// 命令脚本（每行一条 setblock/fill）
    Commands,
    /// 单条召唤命令（实体叠加）
    OneCommand,
    /// 原版结构文件
    Nbt,
    /// Sponge Schematic v3
    Schem,
    /// Litematica 投影
    Litematic,
    /// Axiom 蓝图
    Axiom,
    /// 数据包
    Datapack,
}

impl Format {
    pub fn extension(self) -> &'static str {
        match self {
            Format::Commands => "mcfunction",
            Format::OneCommand => "txt",
            Format::Nbt => "nbt",
            Format::Schem => "schem",
            Format::Litematic => "litematic",
            Format::Axiom => "bp",
            Format::Datapack => "zip",
        }
    }

    pub fn all() -> &'static [Format] {
        &[
            Format::Commands,
            Format::OneCommand,
            Format::Nbt,
            Format::Schem,
            Format::Litematic,
            Format::Axiom,
            Format::Datapack,
        ]
    }
}

/// 导出元数据
#[derive(Debug, Clone)]
pub struct ExportMeta {
    pub name: String,
    pub author: String,
    pub description: String,
    /// 毫秒时间戳
    pub created: i64,
    /// 数据包命名空间
    pub namespace: String,
    /// 单个函数文件的命令数上限
    pub max_commands: usize,
    /// 蓝图缩略图视角
    pub thumbnail_yaw: f32,
    pub thumbnail_pitch: f32,
}

impl ExportMeta {
    pub fn new(name: impl Into<String>) -> Self {
        let created = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default();
        Self {
            name: name.into(),
            author: String::new(),
            description: String::new(),
            created,
            namespace: datapack::DEFAULT_NAMESPACE.to_string(),
            max_commands: datapack::MAX_COMMANDS_PER_FILE,
            thumbnail_yaw: 135.0,
            thumbnail_pitch: 30.0,
        }
    }
}

/// 规范化后的方块体：调色板 + 非空气方块
#[derive(Debug, Clone)]
pub struct Volume {
    pub size: [i32; 3],
    /// 索引 0 为空气
    pub palette: Vec<BlockState>,
    /// (规范化坐标, 调色板索引)，按首次出现顺序，同一坐标后者覆盖
    pub cells: Vec<(BlockPos, usize)>,
}

impl Volume {
    /// 解析体素列表，空输入（或全为空气）返回错误
    pub fn resolve(voxels: &[Voxel], version: &VersionProfile) -> Result<Self> {
        let mut palette = vec![BlockState::air()];
        let mut palette_index: HashMap<BlockState, usize> = HashMap::new();
        palette_index.insert(BlockState::air(), 0);
        let mut slots: HashMap<BlockPos, usize> = HashMap::new();
        let mut cells: Vec<(BlockPos, usize)> = Vec::new();

        for v in voxels {
            let state = resolve_state(&v.block_type, v.properties.as_deref(), version);
            let index = match palette_index.get(&state) {
                Some(&i) => i,
                None => {
                    palette.push(state.clone());
                    palette_index.insert(state, palette.len() - 1);
                    palette.len() - 1
                }
            };
            match slots.get(&v.position) {
                Some(&slot) => cells[slot].1 = index,
                None => {
                    slots.insert(v.position, cells.len());
                    cells.push((v.position, index));
                }
            }
        }
        // 与合并器一致：cave_air、void_air 及带属性的空气都不导出
        cells.retain(|(_, i)| !is_air_name(&palette[*i].name));

        let Some(bounds) = Bounds::enclosing(cells.iter().map(|(p, _)| p)) else {
            bail!("没有可导出的方块");
        };
        for (p, _) in cells.iter_mut() {
            for i in 0..3 {
                p[i] -= bounds.min[i];
            }
        }

        // 只保留实际使用的调色板条目
        let mut used = vec![false; palette.len()];
        used[0] = true;
        for (_, i) in &cells {
            used[*i] = true;
        }
        let mut remap = vec![0usize; palette.len()];
        let mut compact = Vec::new();
        for (i, state) in palette.into_iter().enumerate() {
            if used[i] {
                remap[i] = compact.len();
                compact.push(state);
            }
        }
        for (_, i) in cells.iter_mut() {
            *i = remap[*i];
        }

        Ok(Self {
            size: bounds.size(),
            palette: compact,
            cells,
        })
    }

    pub fn block_count(&self) -> usize {
        self.cells.len()
    }

    pub fn volume(&self) -> i64 {
        self.size[0] as i64 * self.size[1] as i64 * self.size[2] as i64
    }

    /// 线性索引：Y 最外层、Z 居中、X 最内层
    pub fn linear_index(&self, p: BlockPos) -> usize {
        let [w, _, l] = self.size;
        (p[1] as usize * l as usize + p[2] as usize) * w as usize + p[0] as usize
    }

    /// 稠密调色板索引数组，空位为 0（空气）
    pub fn dense(&self) -> Vec<usize> {
        let mut out = vec![0usize; self.volume() as usize];
        for &(p, i) in &self.cells {
            out[self.linear_index(p)] = i;
        }
        out
    }
}

// ============== NBT 辅助 ==============

/// 由键值对构造 Compound
pub(crate) fn compound<const N: usize>(entries: [(&str, Value); N]) -> Value {
    Value::Compound(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

/// `{Name, Properties?}` 形式的方块状态
pub(crate) fn state_nbt(state: &BlockState) -> Value {
    let mut map = HashMap::new();
    map.insert("Name".to_string(), Value::String(state.namespaced()));
    if !state.properties.is_empty() {
        let props = state
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        map.insert("Properties".to_string(), Value::Compound(props));
    }
    Value::Compound(map)
}

pub(crate) fn xyz(v: [i32; 3]) -> Value {
    compound([("x", Value::Int(v[0])), ("y", Value::Int(v[1])), ("z", Value::Int(v[2]))])
}

/// gzip 压缩
pub fn gzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

/// 序列化为无名根 NBT 并 gzip 压缩
pub fn nbt_gzip(value: &Value) -> Result<Vec<u8>> {
    let data = fastnbt::to_bytes(value).context("NBT 序列化失败")?;
    gzip(&data)
}

/// 按格式导出为字节
pub fn export_bytes(format: Format, voxels: &[Voxel], version: &VersionProfile, meta: &ExportMeta) -> Result<Vec<u8>> {
    if voxels.is_empty() {
        bail!("没有可导出的方块");
    }
    match format {
        Format::Commands => {
            let mut text = commands::generate_optimized_commands(voxels, version).join("\n");
            text.push('\n');
            Ok(text.into_bytes())
        }
        Format::OneCommand => Ok(one_command::generate_one_command(voxels, version)?.into_bytes()),
        Format::Nbt => structure::export_structure(voxels, version),
        Format::Schem => sponge::export_schematic(voxels, version, meta),
        Format::Litematic => litematica::export_litematic(voxels, version, meta),
        Format::Axiom => axiom::export_blueprint(voxels, version, meta),
        Format::Datapack => datapack::export_datapack(voxels, version, meta),
    }
}

/// 导出并写入 `<dir>/<filename>.<ext>`，返回写入的路径
pub fn export_to_file(
    format: Format,
    voxels: &[Voxel],
    version: &VersionProfile,
    meta: &ExportMeta,
    dir: &Path,
    filename: &str,
) -> Result<std::path::PathBuf> {
    let bytes = export_bytes(format, voxels, version, meta)?;
    fs::create_dir_all(dir).with_context(|| format!("无法创建目录: {}", dir.display()))?;
    let path = dir.join(format!("{}.{}", filename, format.extension()));
    fs::write(&path, bytes).with_context(|| format!("无法写入: {}", path.display()))?;
    log::info!("已导出 {}", path.display());
    Ok(path)
}

/// 解压 gzip 后解析 NBT（测试与校验用）
pub fn read_gzip_nbt(bytes: &[u8]) -> Result<Value> {
    let mut data = Vec::new();
    std::io::Read::read_to_end(&mut flate2::read::GzDecoder::new(bytes), &mut data)?;
    Ok(fastnbt::from_bytes(&data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::profile;

    #[test]
    fn test_volume_normalizes_and_dedupes() {
        let voxels = vec![
            Voxel::new([5, 10, -3], "stone"),
            Voxel::new([6, 10, -3], "dirt"),
            Voxel::new([5, 10, -3], "glass"),
            Voxel::new([7, 11, -3], "air"),
        ];
        let v = Volume::resolve(&voxels, profile("1.21")).unwrap();
        assert_eq!(v.size, [2, 1, 1]);
        assert_eq!(v.block_count(), 2);
        assert_eq!(v.cells[0].0, [0, 0, 0]);
        // stone 被覆盖后不再出现在调色板中
        let names: Vec<&str> = v.palette.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["air", "dirt", "glass"]);
        assert_eq!(v.palette[v.cells[0].1].name, "glass");
    }

    #[test]
    fn test_air_variants_are_dropped() {
        let voxels = vec![
            Voxel::new([0, 0, 0], "stone"),
            Voxel::new([1, 0, 0], "cave_air"),
            Voxel::new([0, 3, 0], "void_air"),
            Voxel::new([0, 0, 2], "air").with_properties("waterlogged=true"),
        ];
        let v = Volume::resolve(&voxels, profile("1.21")).unwrap();
        assert_eq!(v.size, [1, 1, 1]);
        assert_eq!(v.block_count(), 1);
        let names: Vec<&str> = v.palette.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["air", "stone"]);

        let bytes = export_bytes(Format::Schem, &voxels, profile("1.21"), &ExportMeta::new("x")).unwrap();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn test_empty_input_is_error() {
        assert!(Volume::resolve(&[], profile("1.21")).is_err());
        assert!(Volume::resolve(&[Voxel::new([0, 0, 0], "air")], profile("1.21")).is_err());
        assert!(export_bytes(Format::Nbt, &[], profile("1.21"), &ExportMeta::new("x")).is_err());
    }

    #[test]
    fn test_dense_order() {
        let voxels = vec![Voxel::new([0, 0, 0], "stone"), Voxel::new([1, 1, 1], "dirt")];
        let v = Volume::resolve(&voxels, profile("1.21")).unwrap();
        let dense = v.dense();
        assert_eq!(dense.len(), 8);
        assert_eq!(dense[0], 1);
        assert_eq!(dense[7], 2);
        assert_eq!(v.linear_index([1, 0, 0]), 1);
        assert_eq!(v.linear_index([0, 0, 1]), 2);
        assert_eq!(v.linear_index([0, 1, 0]), 4);
    }

    #[test]
    fn test_export_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let voxels = vec![Voxel::new([0, 0, 0], "stone")];
        let path = export_to_file(Format::Nbt, &voxels, profile("1.20"), &ExportMeta::new("t"), dir.path(), "house").unwrap();
        assert!(path.ends_with("house.nbt"));
        assert!(path.exists());
    }
}
