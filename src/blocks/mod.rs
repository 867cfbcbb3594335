//! 方块标识解析 - 语义名/原始名 -> 目标版本的方块标识
//!
//! 解析过程永不失败：任何缺失的数据都退化为有文档说明的回退值
//! （`stone`、元数据 0），并通过日志发出警告。

pub mod fallback;
pub mod legacy;

use crate::version::VersionProfile;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

pub use legacy::{format_legacy, properties_to_metadata};

/// 语义前缀（大小写敏感，避免误伤 `wall_torch` 之类的真实方块）
const SEMANTIC_PREFIXES: &[&str] = &["WALL_", "ROOF_", "FLOOR_", "FRAME_"];

/// 语义别名
const SEMANTIC_ALIASES: &[(&str, &str)] = &[
    ("wood", "oak_planks"),
    ("plank", "oak_planks"),
    ("planks", "oak_planks"),
    ("log", "oak_log"),
    ("leaves", "oak_leaves"),
    ("cobble", "cobblestone"),
    ("brick", "bricks"),
    ("window", "glass_pane"),
    ("door", "oak_door"),
    ("stairs", "oak_stairs"),
    ("slab", "oak_slab"),
    ("fence", "oak_fence"),
    ("gate", "oak_fence_gate"),
    ("trapdoor", "oak_trapdoor"),
    ("light", "glowstone"),
    ("lamp", "lantern"),
    ("path", "dirt_path"),
    ("roof", "dark_oak_planks"),
    ("floor", "oak_planks"),
    ("wall", "stone_bricks"),
    ("frame", "stripped_oak_log"),
    ("foundation", "cobblestone"),
    ("pillar", "quartz_pillar"),
    ("sign", "oak_sign"),
    ("empty", "air"),
];

/// 跨版本改名：`from` 在 `since` 版本改名为 `to`；`since` 为空表示单向无条件改名
struct Rename {
    from: &'static str,
    to: &'static str,
    since: Option<&'static str>,
}

const RENAMES: &[Rename] = &[
    Rename { from: "grass", to: "short_grass", since: Some("1.20") },
    Rename { from: "grass_path", to: "dirt_path", since: Some("1.17") },
    Rename { from: "snow", to: "snow_block", since: None },
];

/// 校验失败后的小型修正表
const FIXUPS: &[(&str, &str)] = &[
    ("stone_brick", "stone_bricks"),
    ("nether_brick", "nether_bricks"),
    ("red_nether_brick", "red_nether_bricks"),
    ("end_stone_brick", "end_stone_bricks"),
    ("mud_brick", "mud_bricks"),
    ("tuff_brick", "tuff_bricks"),
    ("deepslate_brick", "deepslate_bricks"),
    ("polished_blackstone_brick", "polished_blackstone_bricks"),
    ("quartz", "quartz_block"),
    ("wooden_planks", "oak_planks"),
    ("oak_wood_planks", "oak_planks"),
    ("wool", "white_wool"),
    ("concrete", "white_concrete"),
    ("stained_glass", "white_stained_glass"),
    ("carpet", "white_carpet"),
    ("smooth_stone_slabs", "smooth_stone_slab"),
    ("lit_pumpkin", "jack_o_lantern"),
    ("hardened_clay", "terracotta"),
];

/// 方块形状类别后缀，回退替换时只有同类方块才保留属性
const SHAPE_SUFFIXES: &[&str] = &[
    "_fence_gate",
    "_trapdoor",
    "_door",
    "_stairs",
    "_slab",
    "_wall_sign",
    "_sign",
    "_wall",
    "_fence",
    "_pane",
    "_button",
    "_pressure_plate",
    "_log",
    "_wood",
    "_stem",
    "_hyphae",
    "_bed",
    "_leaves",
];

const BLOCKS_TSV: &str = include_str!("../../data/blocks.tsv");

/// 最新版本的合法方块集合：方块名 -> 引入版本
static INTRODUCED: Lazy<HashMap<String, String>> = Lazy::new(|| {
    data_rows(BLOCKS_TSV)
        .filter_map(|cols| Some((cols.first()?.to_string(), cols.get(1)?.to_string())))
        .collect()
});

static PROPERTY_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_]+$").expect("属性正则无效"));

static WARNED: Lazy<Mutex<HashSet<String>>> = Lazy::new(|| Mutex::new(HashSet::new()));

/// 同一条数据质量警告只输出一次
pub(crate) fn warn_once(message: String) {
    if let Ok(mut seen) = WARNED.lock() {
        if seen.insert(message.clone()) {
            log::warn!("{}", message);
        }
    }
}

/// 解析内嵌数据表：跳过空行和 `#` 注释，按制表符切分
pub(crate) fn data_rows(text: &'static str) -> impl Iterator<Item = Vec<&'static str>> {
    text.lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| l.split('\t').collect())
}

// ============== 类型字符串 ==============

/// 放置模式（类型字符串的 `:mode` 后缀）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceMode {
    /// 普通放置
    #[default]
    Set,
    /// 仅当位置为空时放置
    Keep,
    /// 仅当位置已有非空气方块时放置
    Replace,
}

impl PlaceMode {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "set" => Some(PlaceMode::Set),
            "keep" => Some(PlaceMode::Keep),
            "replace" => Some(PlaceMode::Replace),
            _ => None,
        }
    }
}

/// `type:mode?props` 解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSpec {
    pub base: String,
    pub mode: PlaceMode,
    pub properties: Option<String>,
}

/// 解析类型字符串，支持 `oak_stairs?facing=north`、`stone:keep`、
/// `minecraft:oak_stairs[facing=north]` 等写法
pub fn parse_block_spec(raw: &str) -> BlockSpec {
    let raw = raw.trim();
    let (head, mut properties) = match raw.split_once('?') {
        Some((h, p)) => (h.trim(), non_empty(p)),
        None => (raw, None),
    };

    let mut head = head;
    if let Some(open) = head.find('[') {
        if head.ends_with(']') {
            properties = merge_properties(non_empty(&head[open + 1..head.len() - 1]).as_deref(), properties.as_deref());
            head = &head[..open];
        }
    }

    let (base, mode) = match head.rsplit_once(':') {
        Some((left, right)) => match PlaceMode::parse(&right.to_ascii_lowercase()) {
            Some(mode) => (left, mode),
            // 不是已知模式，视为命名空间
            None => (head, PlaceMode::Set),
        },
        None => (head, PlaceMode::Set),
    };

    BlockSpec {
        base: base.trim().to_string(),
        mode,
        properties,
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// 合并两个属性串，后者覆盖前者的同名键
pub fn merge_properties(first: Option<&str>, second: Option<&str>) -> Option<String> {
    match (first, second) {
        (None, None) => None,
        (Some(a), None) => non_empty(a),
        (None, Some(b)) => non_empty(b),
        (Some(a), Some(b)) => {
            let mut pairs = parse_properties(a);
            for (k, v) in parse_properties(b) {
                match pairs.iter_mut().find(|(key, _)| *key == k) {
                    Some(slot) => slot.1 = v,
                    None => pairs.push((k, v)),
                }
            }
            Some(join_properties(&pairs)).filter(|s| !s.is_empty())
        }
    }
}

/// 解析 `k=v,k=v` 属性串，格式错误的片段直接跳过
pub fn parse_properties(s: &str) -> Vec<(String, String)> {
    s.split(',')
        .filter_map(|part| {
            let (k, v) = part.split_once('=')?;
            let (k, v) = (k.trim(), v.trim());
            (!k.is_empty() && !v.is_empty()).then(|| (k.to_string(), v.to_string()))
        })
        .collect()
}

pub fn join_properties(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

/// 读取单个属性值
pub fn property<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

// ============== 解析结果 ==============

/// 目标版本下的方块状态（不含命名空间）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockState {
    pub name: String,
    /// 已清洗、按键排序的属性
    pub properties: Vec<(String, String)>,
}

impl BlockState {
    pub fn air() -> Self {
        Self {
            name: "air".to_string(),
            properties: Vec::new(),
        }
    }

    pub fn is_air(&self) -> bool {
        self.name == "air"
    }

    /// 带命名空间的方块名
    pub fn namespaced(&self) -> String {
        format!("minecraft:{}", self.name)
    }

    /// 现代格式：`minecraft:name[k=v,...]`
    pub fn modern_id(&self) -> String {
        if self.properties.is_empty() {
            self.namespaced()
        } else {
            format!("{}[{}]", self.namespaced(), join_properties(&self.properties))
        }
    }
}

/// 名称规范化（步骤 1-4）：去语义前缀、别名、规范改名、合法性校验
///
/// 无法识别时回退为 `stone` 并发出警告
pub fn normalize_name(raw: &str) -> String {
    normalize_checked(raw).unwrap_or_else(|| {
        if raw.trim().is_empty() {
            warn_once("空方块类型，使用 stone".to_string());
        } else {
            warn_once(format!("未知方块 {:?}，使用 stone", raw));
        }
        "stone".to_string()
    })
}

fn normalize_checked(raw: &str) -> Option<String> {
    let mut name = raw.trim();
    for prefix in SEMANTIC_PREFIXES {
        if let Some(rest) = name.strip_prefix(prefix) {
            name = rest;
            break;
        }
    }
    let mut name = name.to_ascii_lowercase().replace(' ', "_");

    if let Some((_, alias)) = SEMANTIC_ALIASES.iter().find(|(k, _)| *k == name) {
        name = alias.to_string();
    }
    if let Some(r) = RENAMES.iter().find(|r| r.from == name) {
        name = r.to.to_string();
    }

    let bare = match name.rsplit_once(':') {
        Some((_, n)) => n.to_string(),
        None => name,
    };
    if is_valid(&bare) {
        return Some(bare);
    }
    FIXUPS
        .iter()
        .find(|(k, _)| *k == bare)
        .map(|(_, fixed)| fixed.to_string())
}

/// 是否为最新版本的合法方块
pub fn is_valid(name: &str) -> bool {
    INTRODUCED.contains_key(name)
}

/// 方块的引入版本
pub fn introduced_in(name: &str) -> Option<&'static str> {
    INTRODUCED.get(name).map(|v| v.as_str())
}

/// 原始名是否表示空气
pub fn is_air_name(raw: &str) -> bool {
    matches!(normalize_name_quiet(raw).as_str(), "air" | "cave_air" | "void_air")
}

fn normalize_name_quiet(raw: &str) -> String {
    let mut name = raw.trim();
    for prefix in SEMANTIC_PREFIXES {
        if let Some(rest) = name.strip_prefix(prefix) {
            name = rest;
            break;
        }
    }
    let lower = name.to_ascii_lowercase();
    let bare = lower.rsplit(':').next().unwrap_or_default().to_string();
    match SEMANTIC_ALIASES.iter().find(|(k, _)| *k == bare) {
        Some((_, alias)) => alias.to_string(),
        None => bare,
    }
}

/// 清洗属性：键值只允许 `[a-z0-9_]`，同名键后者覆盖，按键排序
pub fn sanitize_properties(props: Option<&str>) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    for (k, v) in props.map(parse_properties).unwrap_or_default() {
        let (k, v) = (k.to_ascii_lowercase(), v.to_ascii_lowercase());
        if !PROPERTY_TOKEN.is_match(&k) || !PROPERTY_TOKEN.is_match(&v) {
            warn_once(format!("丢弃非法属性 {}={}", k, v));
            continue;
        }
        match out.iter_mut().find(|(key, _)| *key == k) {
            Some(slot) => slot.1 = v,
            None => out.push((k, v)),
        }
    }
    out.sort();
    out
}

fn shape_class(name: &str) -> Option<&'static str> {
    SHAPE_SUFFIXES.iter().copied().find(|s| name.ends_with(s))
}

/// 解析为目标版本下的方块状态（步骤 1-5）
pub fn resolve_state(raw: &str, props: Option<&str>, version: &VersionProfile) -> BlockState {
    let spec = parse_block_spec(raw);
    let merged = merge_properties(spec.properties.as_deref(), props);
    let mut properties = sanitize_properties(merged.as_deref());

    let requested = match normalize_checked(&spec.base) {
        Some(name) => name,
        None => {
            // 回退到 stone 时原有属性不再适用
            properties.clear();
            normalize_name(&spec.base)
        }
    };

    let mut name = requested.clone();
    if let Some(intro) = introduced_in(&name) {
        // 数字 ID 版本中旧名表自带替代方块，交给 format_legacy 处理
        let deferred = version.numeric_ids && legacy::has_legacy_entry(&name);
        if version.before(intro) && !deferred {
            name = fallback::fallback_for(&name).to_string();
            let same_shape = shape_class(&name).is_some() && shape_class(&name) == shape_class(&requested);
            if !same_shape {
                properties.clear();
            }
        }
    }

    // 目标版本早于改名时还原旧名（旧版数字 ID 由旧名表处理）
    if !version.numeric_ids {
        if let Some(r) = RENAMES.iter().find(|r| r.to == name) {
            if let Some(since) = r.since {
                if version.before(since) {
                    name = r.from.to_string();
                }
            }
        }
    }

    BlockState { name, properties }
}

/// 解析为命令中使用的方块标识（步骤 6）
///
/// 现代版本输出 `minecraft:name[props]`，数字 ID 版本输出 `legacy_name [meta]`
pub fn resolve_block_id(raw: &str, props: Option<&str>, version: &VersionProfile) -> String {
    let state = resolve_state(raw, props, version);
    if version.numeric_ids {
        format_legacy(&state, version)
    } else {
        state.modern_id()
    }
}
