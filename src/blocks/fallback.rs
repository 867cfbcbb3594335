//! 跨版本回退映射
//!
//! 运行时只读取已提交的 `data/fallbacks.tsv`；生成器是离线工具
//! （`mcvox gen-fallbacks`），根据引入版本表与两张相似度表重新计算该表。

use super::{data_rows, INTRODUCED};
use crate::version;
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};

const FALLBACKS_TSV: &str = include_str!("../../data/fallbacks.tsv");
const COLOR_GROUPS: &str = include_str!("../../data/color_groups.txt");
const MATERIAL_GROUPS: &str = include_str!("../../data/material_groups.txt");
const PATTERN_RULES: &str = include_str!("../../data/fallback_rules.tsv");

/// 基线版本：回退目标必须在此版本中已存在
pub const BASELINE_VERSION: &str = "1.13";

/// 所有规则都不命中时的默认回退
pub const DEFAULT_FALLBACK: &str = "stone";

static FALLBACKS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    data_rows(FALLBACKS_TSV)
        .filter_map(|cols| Some((*cols.first()?, *cols.get(1)?)))
        .collect()
});

/// 查询预先计算的回退方块
pub fn fallback_for(name: &str) -> &'static str {
    FALLBACKS.get(name).copied().unwrap_or(DEFAULT_FALLBACK)
}

/// 生成器输入
pub struct FallbackTables {
    /// 方块 -> 引入版本
    pub introduced: BTreeMap<String, String>,
    /// 颜色分组（保持文件顺序）
    pub color_groups: Vec<(String, Vec<String>)>,
    /// 材质/结构分组（保持文件顺序）
    pub material_groups: Vec<(String, Vec<String>)>,
    /// (正则, 回退模板)，按顺序首个命中生效
    pub rules: Vec<(Regex, String)>,
}

impl FallbackTables {
    /// 读取内嵌的数据表
    pub fn embedded() -> Result<Self> {
        let introduced = INTRODUCED
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let rules = data_rows(PATTERN_RULES)
            .map(|cols| {
                let pattern = cols.first().copied().unwrap_or_default();
                let re = Regex::new(pattern).with_context(|| format!("回退规则正则无效: {}", pattern))?;
                Ok((re, cols.get(1).copied().unwrap_or(DEFAULT_FALLBACK).to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            introduced,
            color_groups: parse_groups(COLOR_GROUPS),
            material_groups: parse_groups(MATERIAL_GROUPS),
            rules,
        })
    }
}

/// 解析 `组名: 成员 成员 ...`
fn parse_groups(text: &str) -> Vec<(String, Vec<String>)> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| {
            let (name, members) = l.split_once(':')?;
            Some((
                name.trim().to_string(),
                members.split_whitespace().map(str::to_string).collect(),
            ))
        })
        .collect()
}

/// 为每个基线之后引入的方块计算回退方块
///
/// 顺序：同材质组 -> 同颜色组 -> 正则规则 -> `stone`
pub fn generate_fallbacks(tables: &FallbackTables) -> BTreeMap<String, String> {
    let baseline = version::profile(BASELINE_VERSION);
    let is_post_baseline = |intro: &str| match version::lookup(intro) {
        Some(v) => v > baseline,
        None => false,
    };
    let base_set: HashSet<&str> = tables
        .introduced
        .iter()
        .filter(|(_, intro)| !is_post_baseline(intro))
        .map(|(name, _)| name.as_str())
        .collect();

    tables
        .introduced
        .iter()
        .filter(|(_, intro)| is_post_baseline(intro))
        .map(|(name, _)| {
            let fallback = first_other_member(&tables.material_groups, name, &base_set)
                .or_else(|| first_other_member(&tables.color_groups, name, &base_set))
                .or_else(|| pattern_fallback(&tables.rules, name, &base_set))
                .unwrap_or_else(|| DEFAULT_FALLBACK.to_string());
            (name.clone(), fallback)
        })
        .collect()
}

fn first_other_member(groups: &[(String, Vec<String>)], name: &str, base: &HashSet<&str>) -> Option<String> {
    let (_, members) = groups.iter().find(|(_, members)| members.iter().any(|m| m == name))?;
    members
        .iter()
        .find(|m| m.as_str() != name && base.contains(m.as_str()))
        .cloned()
}

fn pattern_fallback(rules: &[(Regex, String)], name: &str, base: &HashSet<&str>) -> Option<String> {
    rules.iter().find_map(|(re, template)| {
        let caps = re.captures(name)?;
        let mut out = String::new();
        caps.expand(template, &mut out);
        base.contains(out.as_str()).then_some(out)
    })
}

/// 渲染为 `data/fallbacks.tsv` 的内容
pub fn render_table(map: &BTreeMap<String, String>) -> String {
    let mut out = String::from("# 由 `mcvox gen-fallbacks` 生成，请勿手工修改\n");
    for (name, fallback) in map {
        out.push_str(name);
        out.push('\t');
        out.push_str(fallback);
        out.push('\n');
    }
    out
}
