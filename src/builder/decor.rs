//! 装饰性生成器：螺旋楼梯、垂挂物、散布

use super::random::random_at;
use super::Builder;
use crate::voxel::{BlockPos, IntoBlockPos};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::f64::consts::{FRAC_PI_4, TAU};

/// 螺旋楼梯参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpiralOptions {
    /// 总圈数
    pub turns: f64,
    /// 踏步宽度（从外圈向内），缺省为整个半径
    pub width: Option<i32>,
    /// 中心柱材质
    pub pillar: Option<String>,
    pub clockwise: bool,
}

impl Default for SpiralOptions {
    fn default() -> Self {
        Self {
            turns: 1.0,
            width: None,
            pillar: None,
            clockwise: false,
        }
    }
}

/// 垂挂物参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HangingOptions {
    /// 长度随机增减的最大值
    pub jitter: i32,
    /// 末端的最大水平摆动（方块）
    pub sway: f64,
    /// 末端方块
    pub tip: Option<String>,
    /// 环形垂挂时每个挂点的出现概率
    pub density: f64,
    pub seed: i64,
}

impl Default for HangingOptions {
    fn default() -> Self {
        Self {
            jitter: 0,
            sway: 0.0,
            tip: None,
            density: 1.0,
            seed: 0,
        }
    }
}

/// 散布参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScatterOptions {
    /// 要求下方已有非空气方块
    pub require_support: bool,
    /// 不覆盖已有方块
    pub no_overwrite: bool,
    /// 两个散布点之间的最小切比雪夫距离
    pub min_spacing: i32,
    pub seed: i64,
}

impl Default for ScatterOptions {
    fn default() -> Self {
        Self {
            require_support: false,
            no_overwrite: true,
            min_spacing: 0,
            seed: 0,
        }
    }
}

/// 角度（弧度，0 为 +X，逆时针朝 +Z）所在八分区对应的楼梯朝向
fn octant_facing(angle: f64) -> &'static str {
    const TABLE: [&str; 8] = ["east", "south", "south", "west", "west", "north", "north", "east"];
    let octant = (angle.rem_euclid(TAU) / FRAC_PI_4).floor() as usize;
    TABLE[octant.min(7)]
}

impl Builder {
    /// 绕竖直轴的螺旋楼梯，每上升一格转过 `turns * 360 / height` 度
    pub fn draw_spiral_stairs(
        &mut self,
        center: impl IntoBlockPos,
        radius: i32,
        height: i32,
        stairs: &str,
        opts: &SpiralOptions,
    ) -> usize {
        let [cx, cy, cz] = center.into_block_pos();
        let height = height.max(1);
        let radius = radius.max(1);
        let inner = (radius - opts.width.unwrap_or(radius) + 1).max(1);
        let direction = if opts.clockwise { -1.0 } else { 1.0 };
        let stair_base = stairs.split('?').next().unwrap_or(stairs).to_string();
        let priority = self.priority;
        let mut placed = 0;

        if let Some(pillar) = &opts.pillar {
            let brush = self.brush(pillar);
            for y in cy..cy + height {
                if self.paint([cx, y, cz], brush, priority) {
                    placed += 1;
                }
            }
        }

        for step in 0..height {
            let theta = direction * step as f64 / height as f64 * opts.turns * TAU;
            // 行进方向为切线方向
            let tangent = theta + direction * std::f64::consts::FRAC_PI_2;
            let facing = octant_facing(tangent);
            let brush = self.brush_with(&stair_base, Some(&format!("facing={},half=bottom", facing)));
            let mut seen: HashSet<BlockPos> = HashSet::new();
            for k in inner..=radius {
                let p = [
                    cx + (k as f64 * theta.cos()).round() as i32,
                    cy + step,
                    cz + (k as f64 * theta.sin()).round() as i32,
                ];
                if p[0] == cx && p[2] == cz && opts.pillar.is_some() {
                    continue;
                }
                if seen.insert(p) && self.paint(p, brush, priority) {
                    placed += 1;
                }
            }
        }
        placed
    }

    /// 从 `origin` 向下垂挂，长度按坐标随机增减，越靠近末端摆动越大
    pub fn draw_hanging(&mut self, origin: impl IntoBlockPos, length: i32, block_type: &str, opts: &HangingOptions) -> usize {
        let [x, y, z] = origin.into_block_pos();
        let jitter = ((random_at(x, y, z, opts.seed) * 2.0 - 1.0) * opts.jitter as f64).round() as i32;
        let length = (length + jitter).max(1);
        let angle = random_at(x, y, z, opts.seed.wrapping_add(1)) * TAU;
        let brush = self.brush(block_type);
        let tip = opts.tip.as_deref().map(|t| self.brush(t));
        let priority = self.priority;

        let mut placed = 0;
        for i in 0..length {
            let f = i as f64 / length as f64;
            let offset = opts.sway * f * f;
            let p = [
                x + (angle.cos() * offset).round() as i32,
                y - i,
                z + (angle.sin() * offset).round() as i32,
            ];
            let b = match tip {
                Some(t) if i == length - 1 => t,
                _ => brush,
            };
            if self.paint(p, b, priority) {
                placed += 1;
            }
        }
        placed
    }

    /// 沿水平圆环分布的垂挂物
    pub fn draw_hanging_ring(
        &mut self,
        center: impl IntoBlockPos,
        radius: f64,
        length: i32,
        block_type: &str,
        opts: &HangingOptions,
    ) -> usize {
        let [cx, cy, cz] = center.into_block_pos();
        let count = ((TAU * radius).round() as usize).max(4);
        let mut anchors: Vec<BlockPos> = Vec::new();
        for k in 0..count {
            let theta = k as f64 / count as f64 * TAU;
            let p = [
                cx + (radius * theta.cos()).round() as i32,
                cy,
                cz + (radius * theta.sin()).round() as i32,
            ];
            if !anchors.contains(&p) {
                anchors.push(p);
            }
        }
        anchors
            .into_iter()
            .filter(|p| random_at(p[0], p[1], p[2], opts.seed.wrapping_add(2)) < opts.density)
            .map(|p| self.draw_hanging(p, length, block_type, opts))
            .sum()
    }

    /// 在水平区域 `from..=to`（x, z）的 `y` 层上按密度散布
    pub fn scatter(&mut self, from: [i32; 2], to: [i32; 2], y: i32, block_type: &str, density: f64, opts: &ScatterOptions) -> usize {
        let lo = [from[0].min(to[0]), y, from[1].min(to[1])];
        let hi = [from[0].max(to[0]), y, from[1].max(to[1])];
        self.scatter_3d(lo, hi, block_type, density, opts)
    }

    /// 在长方体内按密度散布
    pub fn scatter_3d(
        &mut self,
        from: impl IntoBlockPos,
        to: impl IntoBlockPos,
        block_type: &str,
        density: f64,
        opts: &ScatterOptions,
    ) -> usize {
        let bounds = crate::voxel::Bounds::new(from, to);
        let brush = self.brush(block_type);
        let priority = self.priority;
        let mut chosen: Vec<BlockPos> = Vec::new();
        let mut placed = 0;

        for p in bounds.positions() {
            if random_at(p[0], p[1], p[2], opts.seed) >= density {
                continue;
            }
            if opts.no_overwrite && self.occupied(p) {
                continue;
            }
            if opts.require_support && !self.occupied([p[0], p[1] - 1, p[2]]) {
                continue;
            }
            if opts.min_spacing > 0
                && chosen.iter().any(|c| (0..3).all(|i| (c[i] - p[i]).abs() < opts.min_spacing))
            {
                continue;
            }
            if self.paint(p, brush, priority) {
                chosen.push(p);
                placed += 1;
            }
        }
        placed
    }

    fn occupied(&self, p: BlockPos) -> bool {
        self.cells
            .get(&p)
            .is_some_and(|c| !self.palette_air[c.block as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_octant_facing() {
        assert_eq!(octant_facing(0.1), "east");
        assert_eq!(octant_facing(std::f64::consts::FRAC_PI_2), "south");
        assert_eq!(octant_facing(std::f64::consts::PI), "west");
        assert_eq!(octant_facing(-0.1), "east");
        assert_eq!(octant_facing(-std::f64::consts::FRAC_PI_2 + 0.01), "north");
    }

    #[test]
    fn test_spiral_one_step_per_level() {
        let mut b = Builder::new();
        let opts = SpiralOptions {
            width: Some(1),
            pillar: Some("stone".to_string()),
            ..Default::default()
        };
        b.draw_spiral_stairs([0, 0, 0], 3, 12, "oak_stairs", &opts);
        for y in 0..12 {
            let steps = b
                .voxels()
                .into_iter()
                .filter(|v| v.position[1] == y && v.block_type == "oak_stairs")
                .count();
            assert_eq!(steps, 1, "y={}", y);
            assert_eq!(b.get([0, y, 0]), Some("stone"));
        }
        // 第一级在 +X 方向，逆时针前进朝 +Z
        assert_eq!(b.get([3, 0, 0]), Some("oak_stairs"));
        assert_eq!(b.properties_at([3, 0, 0]), Some("facing=south,half=bottom"));
    }

    #[test]
    fn test_hanging_length_and_tip() {
        let mut b = Builder::new();
        let opts = HangingOptions {
            tip: Some("glowstone".to_string()),
            ..Default::default()
        };
        assert_eq!(b.draw_hanging([0, 10, 0], 4, "chain", &opts), 4);
        assert_eq!(b.get([0, 10, 0]), Some("chain"));
        assert_eq!(b.get([0, 7, 0]), Some("glowstone"));
        assert_eq!(b.get([0, 6, 0]), None);
    }

    #[test]
    fn test_hanging_ring_is_deterministic() {
        let opts = HangingOptions {
            jitter: 2,
            sway: 1.5,
            density: 0.6,
            seed: 11,
            ..Default::default()
        };
        let mut a = Builder::new();
        let mut b = Builder::new();
        a.draw_hanging_ring([0, 20, 0], 6.0, 5, "oak_leaves", &opts);
        b.draw_hanging_ring([0, 20, 0], 6.0, 5, "oak_leaves", &opts);
        assert!(!a.is_empty());
        assert_eq!(a.voxels(), b.voxels());
    }

    #[test]
    fn test_scatter_support_and_overwrite() {
        let mut b = Builder::new();
        b.fill([0, 0, 0], [9, 0, 4], "grass_block");
        let opts = ScatterOptions {
            require_support: true,
            ..Default::default()
        };
        let n = b.scatter([0, 0], [19, 9], 1, "poppy", 0.5, &opts);
        assert!(n > 0);
        for v in b.voxels().iter().filter(|v| v.block_type == "poppy") {
            assert!(v.position[0] <= 9 && v.position[2] <= 4);
        }
        // 不覆盖已有方块
        let n = b.scatter_3d([0, 0, 0], [9, 0, 4], "stone", 1.0, &ScatterOptions::default());
        assert_eq!(n, 0);
    }

    #[test]
    fn test_scatter_min_spacing() {
        let mut b = Builder::new();
        let opts = ScatterOptions {
            min_spacing: 3,
            ..Default::default()
        };
        b.scatter([0, 0], [15, 15], 0, "stone", 1.0, &opts);
        let v = b.voxels();
        for (i, a) in v.iter().enumerate() {
            for c in &v[i + 1..] {
                let far = (0..3).any(|k| (a.position[k] - c.position[k]).abs() >= 3);
                assert!(far);
            }
        }
    }
}
