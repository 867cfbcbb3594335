//! 可复用组件：定义一次，按参数在任意位置实例化，支持绕 Y 轴旋转

use super::{Builder, SetOptions};
use crate::blocks::{join_properties, parse_properties};
use crate::voxel::{BlockPos, IntoBlockPos};
use serde_json::Value;
use std::rc::Rc;

/// 组件构建函数：在临时构建器的相对坐标系中绘制
pub type ComponentFn = dyn Fn(&mut Builder, &Value);

/// `place_component` 的可选参数
#[derive(Debug, Clone, Default)]
pub struct PlaceOptions {
    /// 绕 Y 轴旋转角度，取最近的 90 度倍数
    pub rotate_y: i32,
    /// 分组名，缺省为 `组件名#序号`
    pub group: Option<String>,
    /// 基准优先级，缺省为当前优先级
    pub priority: Option<i32>,
}

const FACING_CYCLE: [&str; 4] = ["north", "east", "south", "west"];

/// 旋转角度化为 0..4 的四分之一圈数
pub fn quarter_turns(degrees: i32) -> u8 {
    (((degrees as f64 / 90.0).round() as i64).rem_euclid(4)) as u8
}

/// 相对坐标绕 Y 轴旋转：90 度时 (x, z) -> (z, -x)
pub fn rotate_position(p: BlockPos, turns: u8) -> BlockPos {
    let [x, y, z] = p;
    match turns % 4 {
        1 => [z, y, -x],
        2 => [-x, y, -z],
        3 => [-z, y, x],
        _ => p,
    }
}

/// 旋转方向相关属性：facing 按 北→东→南→西 循环，axis 在 90/270 度时 x、z 互换，
/// rotation（0-15）每四分之一圈加 4
pub fn rotate_properties(props: &str, turns: u8) -> String {
    let turns = turns % 4;
    let pairs: Vec<(String, String)> = parse_properties(props)
        .into_iter()
        .map(|(k, v)| {
            let v = match k.as_str() {
                "facing" => match FACING_CYCLE.iter().position(|f| *f == v) {
                    Some(i) => FACING_CYCLE[(i + turns as usize) % 4].to_string(),
                    None => v,
                },
                "axis" if turns % 2 == 1 => match v.as_str() {
                    "x" => "z".to_string(),
                    "z" => "x".to_string(),
                    _ => v,
                },
                "rotation" => match v.parse::<u32>() {
                    Ok(r) => ((r + turns as u32 * 4) % 16).to_string(),
                    Err(_) => v,
                },
                _ => v,
            };
            (k, v)
        })
        .collect();
    join_properties(&pairs)
}

impl Builder {
    /// 注册组件，同名组件会被覆盖
    pub fn define_component(&mut self, name: &str, build: impl Fn(&mut Builder, &Value) + 'static) {
        self.components.insert(name.to_string(), Rc::new(build));
    }

    pub fn has_component(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    /// 在 `origin` 处实例化组件，返回是否放置
    ///
    /// 未定义的组件只记录警告，不中断构建
    pub fn place_component(&mut self, name: &str, origin: impl IntoBlockPos, params: &Value, opts: &PlaceOptions) -> bool {
        let Some(build) = self.components.get(name).cloned() else {
            log::warn!("组件 {} 未定义，已跳过", name);
            return false;
        };
        if self.component_depth >= super::MAX_COMPONENT_DEPTH {
            log::warn!("组件 {} 嵌套过深，已跳过", name);
            return false;
        }

        let mut scratch = Builder::new();
        scratch.components = self.components.clone();
        scratch.component_depth = self.component_depth + 1;
        build(&mut scratch, params);

        let origin = origin.into_block_pos();
        let turns = quarter_turns(opts.rotate_y);
        let base_priority = opts.priority.unwrap_or(self.priority);

        let saved_group = self.group.clone();
        let saved_priority = self.priority;
        self.group_counter += 1;
        let group = opts
            .group
            .clone()
            .unwrap_or_else(|| format!("{}#{}", name, self.group_counter));
        self.group = Some(Rc::from(group.as_str()));

        for (rel, base, props, priority) in scratch.raw_winners() {
            let r = rotate_position(rel, turns);
            let pos = [origin[0] + r[0], origin[1] + r[1], origin[2] + r[2]];
            let props = props.map(|p| rotate_properties(&p, turns));
            self.set_with(
                pos,
                &base,
                &SetOptions {
                    priority: Some(base_priority + priority),
                    properties: props.as_deref(),
                },
            );
        }

        self.group = saved_group;
        self.priority = saved_priority;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rotate_position() {
        assert_eq!(rotate_position([1, 0, 0], 1), [0, 0, -1]);
        assert_eq!(rotate_position([1, 0, 0], 2), [-1, 0, 0]);
        assert_eq!(rotate_position([1, 0, 0], 3), [0, 0, 1]);
        assert_eq!(rotate_position([2, 5, 3], 4), [2, 5, 3]);
    }

    #[test]
    fn test_quarter_turns() {
        assert_eq!(quarter_turns(90), 1);
        assert_eq!(quarter_turns(-90), 3);
        assert_eq!(quarter_turns(450), 1);
        assert_eq!(quarter_turns(100), 1);
    }

    #[test]
    fn test_rotate_properties() {
        assert_eq!(rotate_properties("facing=north,half=top", 1), "facing=east,half=top");
        assert_eq!(rotate_properties("facing=west", 1), "facing=north");
        assert_eq!(rotate_properties("facing=up", 1), "facing=up");
        assert_eq!(rotate_properties("axis=x", 1), "axis=z");
        assert_eq!(rotate_properties("axis=x", 2), "axis=x");
        assert_eq!(rotate_properties("rotation=14", 1), "rotation=2");
    }

    #[test]
    fn test_place_rotated_component() {
        let mut b = Builder::new();
        b.define_component("marker", |c, _| {
            c.set([1, 0, 0], "oak_stairs?facing=north");
        });
        let placed = b.place_component(
            "marker",
            [10, 5, 10],
            &Value::Null,
            &PlaceOptions {
                rotate_y: 90,
                ..Default::default()
            },
        );
        assert!(placed);
        assert_eq!(b.get([10, 5, 9]), Some("oak_stairs"));
        assert_eq!(b.properties_at([10, 5, 9]), Some("facing=east"));
        assert_eq!(b.placements()[0].group_id.as_deref(), Some("marker#1"));
    }

    #[test]
    fn test_component_params_and_nesting() {
        let mut b = Builder::new();
        b.define_component("post", |c, p| {
            let h = p["height"].as_i64().unwrap_or(1) as i32;
            c.fill([0, 0, 0], [0, h - 1, 0], "oak_fence");
        });
        b.define_component("gate", |c, _| {
            c.place_component("post", [0, 0, 0], &json!({"height": 3}), &PlaceOptions::default());
            c.place_component("post", [4, 0, 0], &json!({"height": 3}), &PlaceOptions::default());
        });
        b.place_component("gate", [0, 0, 0], &Value::Null, &PlaceOptions::default());
        assert_eq!(b.get([4, 2, 0]), Some("oak_fence"));
        assert_eq!(b.len(), 6);
    }

    #[test]
    fn test_undefined_component_is_noop() {
        let mut b = Builder::new();
        assert!(!b.place_component("missing", [0, 0, 0], &Value::Null, &PlaceOptions::default()));
        assert!(b.is_empty());
    }

    #[test]
    fn test_recursive_component_terminates() {
        let mut b = Builder::new();
        b.define_component("loop", |c, _| {
            c.set([0, 0, 0], "stone");
            c.place_component("loop", [0, 1, 0], &Value::Null, &PlaceOptions::default());
        });
        assert!(b.place_component("loop", [0, 0, 0], &Value::Null, &PlaceOptions::default()));
        assert!(b.len() <= super::super::MAX_COMPONENT_DEPTH);
    }

    #[test]
    fn test_group_and_priority_restored() {
        let mut b = Builder::new();
        b.define_component("block", |c, _| {
            c.set([0, 0, 0], "stone");
        });
        b.begin_group(Some("outer"), super::super::GroupOptions { priority: Some(4) });
        b.place_component("block", [0, 0, 0], &Value::Null, &PlaceOptions::default());
        assert_eq!(b.current_group(), Some("outer"));
        assert_eq!(b.priority(), 4);
        assert_eq!(b.placements()[0].priority, 4);
    }
}
