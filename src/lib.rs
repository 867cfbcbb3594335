//! Minecraft 体素建筑构建与多版本导出
//!
//! 构建器累积带优先级的方块放置，导出器把结果合并、按目标版本解析方块标识，
//! 再写成命令脚本、结构文件、投影、蓝图或数据包。

pub mod blocks;
pub mod builder;
pub mod config;
pub mod export;
pub mod merge;
pub mod plan;
pub mod version;
pub mod voxel;

pub use blocks::{properties_to_metadata, resolve_block_id, resolve_state, BlockState};
pub use builder::{Builder, PlaceOptions, SetOptions, CLEAR_PRIORITY};
pub use config::Config;
pub use export::commands::generate_optimized_commands;
pub use export::one_command::generate_one_command;
pub use export::{export_bytes, export_to_file, ExportMeta, Format};
pub use merge::{merge_regions, Region};
pub use plan::{Op, Plan, PlanFormat};
pub use version::{profile, VersionProfile};
pub use voxel::{Bounds, BlockPos, PlacedVoxel, Voxel};
