//! 声明式建造计划
//!
//! 计划文件（JSON / YAML / TOML）由一组组件定义和一串操作组成，
//! 每个操作对应构建器的一个方法。组件内的字符串可以引用 `${参数}`，
//! 放置时用调用参数（缺省值来自组件定义）替换。

use crate::builder::{
    Builder, GroupOptions, HangingOptions, PlaceOptions, PolyRoofOptions, RoofOptions, ScatterOptions, SetOptions,
    ShapeOptions, SpiralOptions,
};
use crate::voxel::{Bounds, IntoBlockPos};
use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

static PARAM_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{(\w+)\}").expect("参数正则无效"));

fn default_width() -> f64 {
    1.0
}

/// 单个建造操作
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    Set {
        pos: [f64; 3],
        block: String,
        #[serde(default)]
        priority: Option<i32>,
        #[serde(default)]
        properties: Option<String>,
    },
    /// 从候选列表中按坐标确定性地挑选一种方块
    Pick {
        pos: [f64; 3],
        blocks: Vec<String>,
        #[serde(default)]
        seed: i64,
    },
    Fill {
        from: [f64; 3],
        to: [f64; 3],
        block: String,
    },
    Walls {
        from: [f64; 3],
        to: [f64; 3],
        block: String,
    },
    Line {
        from: [f64; 3],
        to: [f64; 3],
        block: String,
    },
    /// 缺少范围时清空整个构建器
    Clear {
        #[serde(default)]
        from: Option<[f64; 3]>,
        #[serde(default)]
        to: Option<[f64; 3]>,
    },
    Priority {
        value: i32,
    },
    BeginGroup {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        priority: Option<i32>,
    },
    EndGroup,
    Sphere {
        center: [f64; 3],
        radius: f64,
        block: String,
        #[serde(default)]
        options: ShapeOptions,
    },
    Ellipsoid {
        center: [f64; 3],
        radii: [f64; 3],
        block: String,
        #[serde(default)]
        options: ShapeOptions,
    },
    Cylinder {
        base: [f64; 3],
        radius: f64,
        height: i32,
        block: String,
        #[serde(default)]
        options: ShapeOptions,
    },
    Torus {
        center: [f64; 3],
        major: f64,
        minor: f64,
        block: String,
        #[serde(default)]
        options: ShapeOptions,
    },
    Polygon {
        base: [f64; 3],
        radius: f64,
        sides: u32,
        height: i32,
        block: String,
        #[serde(default)]
        options: ShapeOptions,
    },
    Pyramid {
        base: [f64; 3],
        half: f64,
        height: i32,
        block: String,
        #[serde(default)]
        options: ShapeOptions,
    },
    Bezier {
        points: Vec<[f64; 3]>,
        block: String,
        #[serde(default = "default_width")]
        width: f64,
    },
    PolyRoof {
        center: [f64; 3],
        radius: f64,
        height: i32,
        stairs: String,
        #[serde(default)]
        options: PolyRoofOptions,
    },
    Roof {
        from: [i32; 2],
        to: [i32; 2],
        y: i32,
        stairs: String,
        #[serde(default)]
        options: RoofOptions,
    },
    SpiralStairs {
        center: [f64; 3],
        radius: i32,
        height: i32,
        stairs: String,
        #[serde(default)]
        options: SpiralOptions,
    },
    Hanging {
        origin: [f64; 3],
        length: i32,
        block: String,
        #[serde(default)]
        options: HangingOptions,
    },
    HangingRing {
        center: [f64; 3],
        radius: f64,
        length: i32,
        block: String,
        #[serde(default)]
        options: HangingOptions,
    },
    Scatter {
        from: [i32; 2],
        to: [i32; 2],
        y: i32,
        block: String,
        density: f64,
        #[serde(default)]
        options: ScatterOptions,
    },
    #[serde(rename = "scatter_3d")]
    Scatter3d {
        from: [f64; 3],
        to: [f64; 3],
        block: String,
        density: f64,
        #[serde(default)]
        options: ScatterOptions,
    },
    Place {
        component: String,
        pos: [f64; 3],
        #[serde(default)]
        params: Value,
        #[serde(default)]
        rotate_y: i32,
        #[serde(default)]
        group: Option<String>,
        #[serde(default)]
        priority: Option<i32>,
    },
}

/// 组件定义：参数缺省值 + 未展开的操作
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentDef {
    #[serde(default)]
    pub params: Map<String, Value>,
    pub ops: Vec<Value>,
}

impl ComponentDef {
    /// 合并缺省参数与调用参数
    fn bind(&self, params: &Value) -> Map<String, Value> {
        let mut merged = self.params.clone();
        if let Value::Object(given) = params {
            for (k, v) in given {
                merged.insert(k.clone(), v.clone());
            }
        }
        merged
    }

    /// 展开参数引用后解析为操作列表
    pub fn expand(&self, params: &Value) -> Result<Vec<Op>> {
        let bound = self.bind(params);
        let ops = self.ops.iter().map(|op| substitute(op, &bound)).collect();
        serde_json::from_value(Value::Array(ops)).context("组件操作解析失败")
    }
}

/// 建造计划
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub components: BTreeMap<String, ComponentDef>,
    #[serde(default)]
    pub ops: Vec<Op>,
}

/// 计划文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanFormat {
    Json,
    Yaml,
    Toml,
}

impl PlanFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        Ok(match ext.as_str() {
            "json" => PlanFormat::Json,
            "yaml" | "yml" => PlanFormat::Yaml,
            "toml" => PlanFormat::Toml,
            _ => bail!("无法识别的计划文件格式: {}", path.display()),
        })
    }
}

impl Plan {
    pub fn parse(text: &str, format: PlanFormat) -> Result<Self> {
        let plan = match format {
            PlanFormat::Json => serde_json::from_str(text).context("JSON 计划解析失败")?,
            PlanFormat::Yaml => serde_yaml::from_str(text).context("YAML 计划解析失败")?,
            PlanFormat::Toml => toml::from_str(text).context("TOML 计划解析失败")?,
        };
        Ok(plan)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let format = PlanFormat::from_path(path)?;
        let text = fs::read_to_string(path).with_context(|| format!("无法读取计划文件: {}", path.display()))?;
        Self::parse(&text, format)
    }

    /// 在全新的构建器上执行计划
    pub fn build(&self) -> Builder {
        let mut builder = Builder::new();
        self.run(&mut builder);
        builder
    }

    /// 注册组件并依次执行操作，返回各操作放置数之和
    pub fn run(&self, builder: &mut Builder) -> usize {
        for (name, def) in &self.components {
            let def = def.clone();
            let component = name.clone();
            builder.define_component(name, move |b: &mut Builder, params: &Value| match def.expand(params) {
                Ok(ops) => {
                    for op in &ops {
                        apply(b, op);
                    }
                }
                Err(e) => log::warn!("组件 {} 展开失败: {:#}", component, e),
            });
        }
        self.ops.iter().map(|op| apply(builder, op)).sum()
    }
}

/// 替换值树中的 `${参数}`
///
/// 整个字符串恰为一个引用时保留参数原类型，否则按文本插值
pub fn substitute(value: &Value, params: &Map<String, Value>) -> Value {
    match value {
        Value::String(s) => {
            if let Some(caps) = PARAM_REF.captures(s) {
                if caps[0].len() == s.len() {
                    if let Some(v) = params.get(&caps[1]) {
                        return v.clone();
                    }
                }
            }
            let replaced = PARAM_REF.replace_all(s, |caps: &Captures| match params.get(&caps[1]) {
                Some(Value::String(v)) => v.clone(),
                Some(v) => v.to_string(),
                None => {
                    log::warn!("未提供参数 {}", &caps[1]);
                    caps[0].to_string()
                }
            });
            Value::String(replaced.into_owned())
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| substitute(v, params)).collect()),
        Value::Object(map) => Value::Object(map.iter().map(|(k, v)| (k.clone(), substitute(v, params))).collect()),
        other => other.clone(),
    }
}

/// 执行单个操作，返回放置的方块数
pub fn apply(b: &mut Builder, op: &Op) -> usize {
    match op {
        Op::Set {
            pos,
            block,
            priority,
            properties,
        } => {
            let opts = SetOptions {
                priority: *priority,
                properties: properties.as_deref(),
            };
            b.set_with(*pos, block, &opts) as usize
        }
        Op::Pick { pos, blocks, seed } => {
            let [x, y, z] = pos.into_block_pos();
            match b.pick_at(blocks, x, y, z, *seed).cloned() {
                Some(block) => b.set([x, y, z], &block) as usize,
                None => 0,
            }
        }
        Op::Fill { from, to, block } => b.fill(*from, *to, block),
        Op::Walls { from, to, block } => b.walls(*from, *to, block),
        Op::Line { from, to, block } => b.line(*from, *to, block),
        Op::Clear { from, to } => {
            let region = match (from, to) {
                (Some(from), Some(to)) => Some(Bounds::new(*from, *to)),
                _ => None,
            };
            b.clear(region);
            0
        }
        Op::Priority { value } => {
            b.set_priority(*value);
            0
        }
        Op::BeginGroup { name, priority } => {
            b.begin_group(name.as_deref(), GroupOptions { priority: *priority });
            0
        }
        Op::EndGroup => {
            b.end_group();
            0
        }
        Op::Sphere {
            center,
            radius,
            block,
            options,
        } => b.draw_sphere(*center, *radius, block, options),
        Op::Ellipsoid {
            center,
            radii,
            block,
            options,
        } => b.draw_ellipsoid(*center, *radii, block, options),
        Op::Cylinder {
            base,
            radius,
            height,
            block,
            options,
        } => b.draw_cylinder(*base, *radius, *height, block, options),
        Op::Torus {
            center,
            major,
            minor,
            block,
            options,
        } => b.draw_torus(*center, *major, *minor, block, options),
        Op::Polygon {
            base,
            radius,
            sides,
            height,
            block,
            options,
        } => b.draw_polygon(*base, *radius, *sides, *height, block, options),
        Op::Pyramid {
            base,
            half,
            height,
            block,
            options,
        } => b.draw_pyramid(*base, *half, *height, block, options),
        Op::Bezier { points, block, width } => b.draw_bezier(points, block, *width),
        Op::PolyRoof {
            center,
            radius,
            height,
            stairs,
            options,
        } => b.draw_poly_roof(center.into_block_pos(), *radius, *height, stairs, options),
        Op::Roof {
            from,
            to,
            y,
            stairs,
            options,
        } => b.draw_roof_bounds(*from, *to, *y, stairs, options),
        Op::SpiralStairs {
            center,
            radius,
            height,
            stairs,
            options,
        } => b.draw_spiral_stairs(*center, *radius, *height, stairs, options),
        Op::Hanging {
            origin,
            length,
            block,
            options,
        } => b.draw_hanging(*origin, *length, block, options),
        Op::HangingRing {
            center,
            radius,
            length,
            block,
            options,
        } => b.draw_hanging_ring(*center, *radius, *length, block, options),
        Op::Scatter {
            from,
            to,
            y,
            block,
            density,
            options,
        } => b.scatter(*from, *to, *y, block, *density, options),
        Op::Scatter3d {
            from,
            to,
            block,
            density,
            options,
        } => b.scatter_3d(*from, *to, block, *density, options),
        Op::Place {
            component,
            pos,
            params,
            rotate_y,
            group,
            priority,
        } => {
            let before = b.record_count();
            let opts = PlaceOptions {
                rotate_y: *rotate_y,
                group: group.clone(),
                priority: *priority,
            };
            b.place_component(component, *pos, params, &opts);
            b.record_count() - before
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_plan() {
        let text = r#"{
            "name": "hut",
            "ops": [
                { "op": "fill", "from": [0, 0, 0], "to": [4, 0, 4], "block": "stone" },
                { "op": "walls", "from": [0, 1, 0], "to": [4, 3, 4], "block": "oak_planks" },
                { "op": "set", "pos": [2, 1, 0], "block": "air", "priority": 5 },
                { "op": "set", "pos": [2.7, 2.2, 0.9], "block": "glass" }
            ]
        }"#;
        let plan = Plan::parse(text, PlanFormat::Json).unwrap();
        assert_eq!(plan.name.as_deref(), Some("hut"));
        let b = plan.build();
        assert_eq!(b.get([4, 0, 4]), Some("stone"));
        assert_eq!(b.get([0, 3, 2]), Some("oak_planks"));
        assert_eq!(b.get([2, 2, 2]), None);
        // 门洞被高优先级空气清出
        assert_eq!(b.get([2, 1, 0]), Some("air"));
        assert_eq!(b.get([2, 2, 0]), Some("glass"));
    }

    #[test]
    fn test_component_params_and_rotation() {
        let text = r#"
components:
  lamp:
    params:
      light: glowstone
      height: 2
    ops:
      - { op: fill, from: [0, 0, 0], to: [0, "${height}", 0], block: oak_fence }
      - { op: set, pos: [0, 3, 0], block: "${light}" }
      - { op: set, pos: [1, 0, 0], block: "oak_stairs?facing=north" }
ops:
  - { op: place, component: lamp, pos: [10, 5, 10], rotate_y: 90, params: { light: sea_lantern } }
"#;
        let plan = Plan::parse(text, PlanFormat::Yaml).unwrap();
        let b = plan.build();
        assert_eq!(b.get([10, 7, 10]), Some("oak_fence"));
        assert_eq!(b.get([10, 8, 10]), Some("sea_lantern"));
        assert_eq!(b.get([10, 5, 9]), Some("oak_stairs"));
        assert_eq!(b.properties_at([10, 5, 9]), Some("facing=east"));
        let groups: Vec<_> = b.placements().into_iter().filter_map(|p| p.group_id).collect();
        assert!(groups.iter().all(|g| g.starts_with("lamp#")));
    }

    #[test]
    fn test_toml_plan_with_options() {
        let text = r#"
[[ops]]
op = "sphere"
center = [0, 10, 0]
radius = 3
block = "stone"
options = { hollow = true }

[[ops]]
op = "roof"
from = [0, 0]
to = [4, 6]
y = 20
stairs = "oak_stairs"
options = { gable = "white_terracotta" }
"#;
        let plan = Plan::parse(text, PlanFormat::Toml).unwrap();
        let b = plan.build();
        assert_eq!(b.get([0, 10, 0]), None);
        assert_eq!(b.get([3, 10, 0]), Some("stone"));
        assert!(b.get([0, 20, 3]).is_some());
    }

    #[test]
    fn test_substitute_keeps_types() {
        let params: Map<String, Value> = [("r".to_string(), json!(4)), ("m".to_string(), json!("oak"))]
            .into_iter()
            .collect();
        let out = substitute(&json!({ "radius": "${r}", "block": "${m}_log", "missing": "${x}" }), &params);
        assert_eq!(out, json!({ "radius": 4, "block": "oak_log", "missing": "${x}" }));
    }

    #[test]
    fn test_unknown_component_is_skipped() {
        let plan = Plan {
            ops: vec![Op::Place {
                component: "nothing".into(),
                pos: [0.0, 0.0, 0.0],
                params: Value::Null,
                rotate_y: 0,
                group: None,
                priority: None,
            }],
            ..Default::default()
        };
        assert!(plan.build().is_empty());
    }

    #[test]
    fn test_plan_format_from_path() {
        assert_eq!(PlanFormat::from_path(Path::new("a/house.YML")).unwrap(), PlanFormat::Yaml);
        assert!(PlanFormat::from_path(Path::new("house.txt")).is_err());
    }
}
