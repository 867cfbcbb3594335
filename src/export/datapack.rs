//! 数据包（.zip）：把命令脚本包装为可在游戏内调用的函数

use super::commands::{clear_commands, generate_optimized_commands};
use super::{ExportMeta, Volume};
use crate::version::VersionProfile;
use crate::voxel::Voxel;
use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const DEFAULT_NAMESPACE: &str = "mcvox";

/// 单个函数文件的命令数上限
pub const MAX_COMMANDS_PER_FILE: usize = 60_000;

static INVALID_NAMESPACE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9_.\-]").expect("命名空间正则无效"));

/// 命名空间只允许 `[a-z0-9_.-]`，其余字符替换为下划线
pub fn sanitize_namespace(raw: &str) -> String {
    let lower = raw.trim().to_ascii_lowercase();
    let ns = INVALID_NAMESPACE_CHARS.replace_all(&lower, "_").to_string();
    if ns.trim_matches('_').is_empty() {
        DEFAULT_NAMESPACE.to_string()
    } else {
        ns
    }
}

/// 数据包内的文件列表 (路径, 内容)
pub fn datapack_files(voxels: &[Voxel], version: &VersionProfile, meta: &ExportMeta) -> Result<Vec<(String, String)>> {
    if !version.datapacks {
        bail!("版本 {} 不支持数据包（需要 1.13 及以上）", version.id);
    }
    let volume = Volume::resolve(voxels, version)?;
    let ns = sanitize_namespace(&meta.namespace);
    let dir = format!("data/{}/{}", ns, version.function_dir());
    let per_file = meta.max_commands.max(1);

    let mut files = Vec::new();
    let description = if meta.name.is_empty() {
        "mcvox 导出的建筑".to_string()
    } else {
        meta.name.clone()
    };
    let mcmeta = json!({
        "pack": {
            "pack_format": version.pack_format,
            "description": description,
        }
    });
    files.push(("pack.mcmeta".to_string(), serde_json::to_string_pretty(&mcmeta)?));

    let commands = generate_optimized_commands(voxels, version);
    if commands.len() <= per_file {
        files.push((format!("{}/build.mcfunction", dir), join_lines(&commands)));
    } else {
        let mut dispatcher = Vec::new();
        for (i, chunk) in commands.chunks(per_file).enumerate() {
            let part = format!("build_part{}", i + 1);
            files.push((format!("{}/{}.mcfunction", dir, part), join_lines(chunk)));
            dispatcher.push(format!("function {}:{}", ns, part));
        }
        files.push((format!("{}/build.mcfunction", dir), join_lines(&dispatcher)));
    }

    let load = vec![format!(
        "tellraw @a {}",
        json!({ "text": format!("[{}] 已加载，执行 /function {}:build 在当前位置建造", description, ns) })
    )];
    files.push((format!("{}/load.mcfunction", dir), join_lines(&load)));
    files.push((
        format!("{}/clear.mcfunction", dir),
        join_lines(&clear_commands(volume.size, version)),
    ));

    let tag = json!({ "values": [format!("{}:load", ns)] });
    files.push((
        format!("data/minecraft/{}/load.json", version.function_tag_dir()),
        serde_json::to_string_pretty(&tag)?,
    ));
    Ok(files)
}

fn join_lines(lines: &[String]) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// 打包为 zip
pub fn export_datapack(voxels: &[Voxel], version: &VersionProfile, meta: &ExportMeta) -> Result<Vec<u8>> {
    let files = datapack_files(voxels, version, meta)?;
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (path, content) in &files {
        zip.start_file(path.as_str(), options)
            .with_context(|| format!("无法写入 {}", path))?;
        zip.write_all(content.as_bytes())?;
    }
    let cursor = zip.finish().context("数据包打包失败")?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::profile;
    use std::io::Read;

    fn sample() -> Vec<Voxel> {
        vec![Voxel::new([0, 0, 0], "stone"), Voxel::new([1, 0, 0], "glass")]
    }

    #[test]
    fn test_namespace_sanitize() {
        assert_eq!(sanitize_namespace("My House!"), "my_house_");
        assert_eq!(sanitize_namespace("castle.v2"), "castle.v2");
        assert_eq!(sanitize_namespace("???"), DEFAULT_NAMESPACE);
    }

    #[test]
    fn test_versioned_folders() {
        let meta = ExportMeta::new("house");
        let files = datapack_files(&sample(), profile("1.21"), &meta).unwrap();
        let paths: Vec<&str> = files.iter().map(|(p, _)| p.as_str()).collect();
        assert!(paths.contains(&"data/mcvox/function/build.mcfunction"));
        assert!(paths.contains(&"data/minecraft/tags/function/load.json"));

        let files = datapack_files(&sample(), profile("1.20"), &meta).unwrap();
        let paths: Vec<&str> = files.iter().map(|(p, _)| p.as_str()).collect();
        assert!(paths.contains(&"data/mcvox/functions/clear.mcfunction"));
        assert!(paths.contains(&"data/minecraft/tags/functions/load.json"));
        let mcmeta = &files[0].1;
        assert!(mcmeta.contains("\"pack_format\": 26"));
    }

    #[test]
    fn test_split_with_dispatcher() {
        let voxels: Vec<Voxel> = (0..5)
            .map(|i| Voxel::new([i * 2, 0, 0], "stone"))
            .collect();
        let mut meta = ExportMeta::new("row");
        meta.max_commands = 2;
        meta.namespace = "Row".to_string();
        let files = datapack_files(&voxels, profile("1.21"), &meta).unwrap();
        let find = |p: &str| files.iter().find(|(path, _)| path == p).map(|(_, c)| c.clone());
        assert_eq!(find("data/row/function/build_part3.mcfunction").unwrap().lines().count(), 1);
        assert_eq!(
            find("data/row/function/build.mcfunction").unwrap(),
            "function row:build_part1\nfunction row:build_part2\nfunction row:build_part3\n"
        );
    }

    #[test]
    fn test_pre_flattening_rejected() {
        assert!(datapack_files(&sample(), profile("1.12"), &ExportMeta::new("x")).is_err());
    }

    #[test]
    fn test_zip_roundtrip() {
        let bytes = export_datapack(&sample(), profile("1.21"), &ExportMeta::new("house")).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut build = String::new();
        archive
            .by_name("data/mcvox/function/build.mcfunction")
            .unwrap()
            .read_to_string(&mut build)
            .unwrap();
        assert_eq!(build, "setblock ~0 ~0 ~0 minecraft:stone\nsetblock ~1 ~0 ~0 minecraft:glass\n");
        let mut load = String::new();
        archive
            .by_name("data/minecraft/tags/function/load.json")
            .unwrap()
            .read_to_string(&mut load)
            .unwrap();
        assert!(load.contains("mcvox:load"));
    }
}
