//! Minecraft 体素建筑构建与多版本导出工具

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use mcvox::blocks::fallback::{generate_fallbacks, render_table, FallbackTables};
use mcvox::export::{export_to_file, Format};
use mcvox::{generate_optimized_commands, version, Config, Plan, Voxel};

/// Minecraft 体素建筑构建与多版本导出工具
#[derive(Parser)]
#[command(name = "mcvox", version, about)]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 执行建造计划并导出
    Build {
        /// 计划文件（.json / .yaml / .toml）
        plan: PathBuf,
        /// 导出格式，可重复指定
        #[arg(short, long, value_enum)]
        format: Vec<Format>,
        /// 导出全部格式
        #[arg(long)]
        all: bool,
        /// 目标版本（默认取配置）
        #[arg(short, long)]
        target: Option<String>,
        /// 输出目录
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// 额外写出带分组信息的体素 JSON
        #[arg(long)]
        voxels: bool,
    },
    /// 将体素 JSON 导出为指定格式
    Export {
        /// 体素 JSON 文件：[{ position, type, properties? }]
        input: PathBuf,
        #[arg(short, long, value_enum, default_value = "nbt")]
        format: Format,
        /// 目标版本（默认取配置）
        #[arg(short, long)]
        target: Option<String>,
        /// 输出目录
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// 结构名称（默认取文件名）
        #[arg(short, long)]
        name: Option<String>,
    },
    /// 打印合并后的命令
    Commands {
        /// 体素 JSON 文件
        input: PathBuf,
        /// 目标版本（默认取配置）
        #[arg(short, long)]
        target: Option<String>,
    },
    /// 列出支持的版本
    Versions,
    /// 重新生成跨版本回退表
    GenFallbacks {
        /// 输出路径
        #[arg(short, long, default_value = "data/fallbacks.tsv")]
        output: PathBuf,
    },
    /// 生成默认配置文件
    Config {
        /// 输出路径（默认: mcvox.toml）
        #[arg(short, long, default_value = "mcvox.toml")]
        output: PathBuf,
        /// 覆盖已存在的文件
        #[arg(long)]
        force: bool,
    },
}

fn load_config(config_path: Option<PathBuf>) -> Config {
    if let Some(path) = config_path {
        match Config::load_from_file(&path) {
            Ok(config) => {
                log::info!("已加载配置: {}", path.display());
                return config;
            }
            Err(e) => {
                log::warn!("无法加载配置 {}: {:#}", path.display(), e);
            }
        }
    }
    Config::load()
}

fn read_voxels(path: &Path) -> Result<Vec<Voxel>> {
    let text = fs::read_to_string(path).with_context(|| format!("无法读取: {}", path.display()))?;
    let voxels: Vec<Voxel> = serde_json::from_str(&text).with_context(|| format!("体素 JSON 格式错误: {}", path.display()))?;
    if voxels.is_empty() {
        bail!("没有可导出的方块: {}", path.display());
    }
    Ok(voxels)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("structure")
        .to_string()
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(cli.config);

    match cli.command {
        Commands::Build {
            plan,
            format,
            all,
            target,
            output,
            voxels,
        } => {
            let version = version::profile(target.as_deref().unwrap_or(&config.export.version));
            let output_dir = output.unwrap_or_else(|| config.export.output_dir.clone());
            let formats: Vec<Format> = if all {
                Format::all().to_vec()
            } else if format.is_empty() {
                vec![Format::Nbt]
            } else {
                format
            };

            let start = Instant::now();
            let parsed = Plan::load(&plan)?;
            let name = parsed.name.clone().unwrap_or_else(|| file_stem(&plan));
            let builder = parsed.build();
            let built = builder.voxels();
            println!("计划: {:?}", plan);
            println!("方块数: {}", built.len());
            if let Some(bounds) = builder.bounds() {
                println!("尺寸: {:?}", bounds.size());
            }
            println!("目标版本: {}", version.id);
            println!();

            if voxels {
                fs::create_dir_all(&output_dir)?;
                let path = output_dir.join(format!("{}.voxels.json", name));
                fs::write(&path, serde_json::to_string_pretty(&builder.placements())?)?;
                println!("  {:?}", path);
            }

            let mut meta = config.export_meta(&name);
            if let Some(d) = &parsed.description {
                meta.description = d.clone();
            }
            for f in formats {
                match export_to_file(f, &built, version, &meta, &output_dir, &name) {
                    Ok(path) => println!("  {:?}", path),
                    // 单个格式失败（如旧版本不支持数据包）不影响其它格式
                    Err(e) => eprintln!("  {:?} 导出失败: {:#}", f, e),
                }
            }
            println!("\n耗时: {:.2}s", start.elapsed().as_secs_f64());
        }

        Commands::Export {
            input,
            format,
            target,
            output,
            name,
        } => {
            let version = version::profile(target.as_deref().unwrap_or(&config.export.version));
            let output_dir = output.unwrap_or_else(|| config.export.output_dir.clone());
            let name = name.unwrap_or_else(|| file_stem(&input));

            let start = Instant::now();
            let voxels = read_voxels(&input)?;
            println!("导出: {:?} -> {:?} ({})", input, format, version.id);
            let path = export_to_file(format, &voxels, version, &config.export_meta(&name), &output_dir, &name)?;
            println!("已写入: {:?}", path);
            println!("\n耗时: {:.2}s", start.elapsed().as_secs_f64());
        }

        Commands::Commands { input, target } => {
            let version = version::profile(target.as_deref().unwrap_or(&config.export.version));
            let voxels = read_voxels(&input)?;
            for command in generate_optimized_commands(&voxels, version) {
                println!("{}", command);
            }
        }

        Commands::Versions => {
            println!("{:<8}{:>12}{:>12}{:>10}{:>10}", "版本", "DataVersion", "pack_format", "数字ID", "数据包");
            for v in version::all() {
                println!(
                    "{:<8}{:>12}{:>12}{:>10}{:>10}{}",
                    v.id,
                    v.data_version,
                    v.pack_format,
                    if v.numeric_ids { "是" } else { "否" },
                    if v.datapacks { "是" } else { "否" },
                    if v.latest { "  (最新)" } else { "" }
                );
            }
        }

        Commands::GenFallbacks { output } => {
            let start = Instant::now();
            let tables = FallbackTables::embedded()?;
            let map = generate_fallbacks(&tables);
            if let Some(parent) = output.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&output, render_table(&map))?;
            println!("已生成 {} 条回退映射: {:?}", map.len(), output);
            println!("\n耗时: {:.2}s", start.elapsed().as_secs_f64());
        }

        Commands::Config { output, force } => {
            if output.exists() && !force {
                bail!("文件已存在: {:?}\n使用 --force 覆盖", output);
            }

            let default_config = Config::default();
            default_config.save_to_file(&output)?;
            println!("已生成配置文件: {:?}", output);
            println!("\n配置项说明:");
            println!("  [export]");
            println!("    version = {:?}      # 默认目标版本", default_config.export.version);
            println!("    author = \"\"          # 写入元数据的作者");
            println!("    output_dir = {:?}   # 输出目录", default_config.export.output_dir);
            println!("  [datapack]");
            println!("    namespace = {:?}    # 数据包命名空间", default_config.datapack.namespace);
            println!("    max_commands = {}   # 单个函数文件的命令上限", default_config.datapack.max_commands);
            println!("  [blueprint]");
            println!("    thumbnail_yaw / thumbnail_pitch  # 蓝图缩略图视角");
        }
    }

    Ok(())
}
