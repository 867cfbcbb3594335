//! 版本注册表 - 各游戏版本的静态元数据

use once_cell::sync::Lazy;
use std::cmp::Ordering;
use std::collections::HashMap;

/// 版本档案（启动时由静态表创建，之后不可变）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionProfile {
    /// 版本标识，如 "1.12"
    pub id: &'static str,
    /// NBT 中的 DataVersion
    pub data_version: i32,
    /// 数据包 pack_format
    pub pack_format: i32,
    /// 使用数字 ID + 元数据（1.13 扁平化之前）
    pub numeric_ids: bool,
    /// 使用旧版驼峰实体 ID（FallingSand 等）
    pub legacy_entity_ids: bool,
    /// 支持数据包
    pub datapacks: bool,
    /// 是否为最新支持的版本
    pub latest: bool,
    /// 在表中的顺序，用于版本比较
    order: usize,
}

impl VersionProfile {
    /// 本版本是否不早于 `other`
    pub fn at_least(&self, other: &str) -> bool {
        match lookup(other) {
            Some(p) => self.order >= p.order,
            None => false,
        }
    }

    /// 本版本是否早于 `other`
    pub fn before(&self, other: &str) -> bool {
        match lookup(other) {
            Some(p) => self.order < p.order,
            None => false,
        }
    }

    /// 数据包函数目录名（1.21 起为单数）
    pub fn function_dir(&self) -> &'static str {
        if self.at_least("1.21") {
            "function"
        } else {
            "functions"
        }
    }

    /// 数据包函数标签目录名
    pub fn function_tag_dir(&self) -> &'static str {
        if self.at_least("1.21") {
            "tags/function"
        } else {
            "tags/functions"
        }
    }
}

impl PartialOrd for VersionProfile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionProfile {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order.cmp(&other.order)
    }
}

// (id, data_version, pack_format, numeric_ids, legacy_entity_ids, datapacks)
const VERSION_TABLE: &[(&str, i32, i32, bool, bool, bool)] = &[
    ("1.8", 0, 1, true, true, false),
    ("1.9", 184, 2, true, true, false),
    ("1.10", 512, 2, true, true, false),
    ("1.11", 922, 3, true, false, false),
    ("1.12", 1343, 3, true, false, false),
    ("1.13", 1631, 4, false, false, true),
    ("1.14", 1976, 4, false, false, true),
    ("1.15", 2230, 5, false, false, true),
    ("1.16", 2586, 6, false, false, true),
    ("1.17", 2730, 7, false, false, true),
    ("1.18", 2975, 9, false, false, true),
    ("1.19", 3337, 12, false, false, true),
    ("1.20", 3700, 26, false, false, true),
    ("1.21", 3953, 48, false, false, true),
];

static PROFILES: Lazy<Vec<VersionProfile>> = Lazy::new(|| {
    let last = VERSION_TABLE.len() - 1;
    VERSION_TABLE
        .iter()
        .enumerate()
        .map(
            |(order, &(id, data_version, pack_format, numeric_ids, legacy_entity_ids, datapacks))| {
                VersionProfile {
                    id,
                    data_version,
                    pack_format,
                    numeric_ids,
                    legacy_entity_ids,
                    datapacks,
                    latest: order == last,
                    order,
                }
            },
        )
        .collect()
});

static BY_ID: Lazy<HashMap<&'static str, usize>> =
    Lazy::new(|| PROFILES.iter().enumerate().map(|(i, p)| (p.id, i)).collect());

/// 精确查找版本，未知返回 None
pub fn lookup(id: &str) -> Option<&'static VersionProfile> {
    let id = id.trim();
    if let Some(&i) = BY_ID.get(id) {
        return Some(&PROFILES[i]);
    }
    // 允许补丁号：1.20.4 -> 1.20
    let mut parts = id.splitn(3, '.');
    let major = parts.next()?;
    let minor = parts.next()?;
    BY_ID.get(format!("{}.{}", major, minor).as_str()).map(|&i| &PROFILES[i])
}

/// 解析版本，未知版本回退到最新版本
pub fn profile(id: &str) -> &'static VersionProfile {
    match lookup(id) {
        Some(p) => p,
        None => {
            log::warn!("未知版本 {:?}，使用最新版本 {}", id, latest().id);
            latest()
        }
    }
}

/// 最新支持的版本
pub fn latest() -> &'static VersionProfile {
    PROFILES.last().expect("版本表不能为空")
}

/// 全部版本（从旧到新）
pub fn all() -> &'static [VersionProfile] {
    &PROFILES
}
