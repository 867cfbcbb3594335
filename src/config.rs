//! 配置文件加载与管理

use crate::export::datapack::{DEFAULT_NAMESPACE, MAX_COMMANDS_PER_FILE};
use crate::export::ExportMeta;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 当前目录下的配置文件名
pub const LOCAL_CONFIG: &str = "mcvox.toml";

/// 主配置结构
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 导出配置
    pub export: ExportConfig,
    /// 数据包配置
    pub datapack: DatapackConfig,
    /// 蓝图配置
    pub blueprint: BlueprintConfig,
}

/// 导出配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// 默认目标版本
    pub version: String,
    /// 写入元数据的作者名
    pub author: String,
    /// 默认输出目录
    pub output_dir: PathBuf,
}

/// 数据包配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatapackConfig {
    pub namespace: String,
    /// 单个函数文件的命令数上限
    pub max_commands: usize,
}

/// 蓝图缩略图视角
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlueprintConfig {
    pub thumbnail_yaw: f32,
    pub thumbnail_pitch: f32,
}

// ============== 默认值 ==============

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            version: crate::version::latest().id.to_string(),
            author: String::new(),
            output_dir: PathBuf::from("output"),
        }
    }
}

impl Default for DatapackConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            max_commands: MAX_COMMANDS_PER_FILE,
        }
    }
}

impl Default for BlueprintConfig {
    fn default() -> Self {
        Self {
            thumbnail_yaw: 135.0,
            thumbnail_pitch: 30.0,
        }
    }
}

// ============== 配置加载 ==============

impl Config {
    /// 从文件加载配置
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).with_context(|| format!("无法读取配置: {}", path.display()))?;
        let config: Config = toml::from_str(&content).with_context(|| format!("配置格式错误: {}", path.display()))?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// 获取默认配置文件路径
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("mcvox").join("config.toml"))
    }

    /// 按优先级加载配置：
    /// 1. 当前目录的 mcvox.toml
    /// 2. 用户配置目录的 config.toml
    /// 3. 默认配置
    pub fn load() -> Self {
        let local_config = Path::new(LOCAL_CONFIG);
        if local_config.exists() {
            match Self::load_from_file(local_config) {
                Ok(config) => {
                    log::info!("已加载配置: {}", LOCAL_CONFIG);
                    return config;
                }
                Err(e) => log::warn!("{:#}", e),
            }
        }

        if let Some(user_config) = Self::default_config_path() {
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => {
                        log::info!("已加载配置: {}", user_config.display());
                        return config;
                    }
                    Err(e) => log::warn!("{:#}", e),
                }
            }
        }

        Self::default()
    }

    /// 生成默认配置文件内容
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }

    /// 按配置填充导出元数据
    pub fn export_meta(&self, name: &str) -> ExportMeta {
        let mut meta = ExportMeta::new(name);
        meta.author = self.export.author.clone();
        meta.namespace = self.datapack.namespace.clone();
        meta.max_commands = self.datapack.max_commands;
        meta.thumbnail_yaw = self.blueprint.thumbnail_yaw;
        meta.thumbnail_pitch = self.blueprint.thumbnail_pitch;
        meta
    }
}
