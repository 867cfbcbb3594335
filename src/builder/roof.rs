//! 屋顶光栅化
//!
//! - 多边形/圆锥屋顶：按层缩小半径，外圈放楼梯、内部填实，再做两轮楼梯降级
//! - 矩形屋顶：陡坡按列、缓坡按层迭代，保证每一级之间没有水平缝隙；
//!   可选山墙（低于屋顶优先级）与屋脊（高于屋顶优先级）

use super::Builder;
use crate::voxel::BlockPos;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// 屋顶轮廓曲线
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoofStyle {
    #[default]
    #[serde(alias = "cone")]
    Straight,
    #[serde(alias = "spherical")]
    Dome,
    #[serde(alias = "asian")]
    Curve,
    #[serde(alias = "gothic")]
    Steep,
}

impl RoofStyle {
    /// 归一化高度 t 处的半径系数
    pub fn radius_factor(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            RoofStyle::Straight => 1.0 - t,
            RoofStyle::Dome => (1.0 - t * t).sqrt(),
            RoofStyle::Curve => (1.0 - t).powi(2),
            RoofStyle::Steep => 1.0 - t * t,
        }
    }
}

/// 多边形屋顶参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolyRoofOptions {
    /// 边数，0 表示圆形
    pub sides: u32,
    pub style: RoofStyle,
    /// 内部实心材质，缺省由楼梯推导
    pub fill: Option<String>,
}

impl Default for PolyRoofOptions {
    fn default() -> Self {
        Self {
            sides: 0,
            style: RoofStyle::Straight,
            fill: None,
        }
    }
}

/// 屋脊方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoofAxis {
    X,
    Z,
}

/// 矩形屋顶参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoofOptions {
    /// 屋脊方向，缺省沿长边
    pub axis: Option<RoofAxis>,
    /// 每水平一格的上升高度
    pub slope: f64,
    /// 两端山墙方向的挑檐
    pub overhang: i32,
    /// 山墙填充材质
    pub gable: Option<String>,
    /// 屋脊材质
    pub ridge: Option<String>,
    /// 楼梯下方的实心材质，缺省由楼梯推导
    pub fill: Option<String>,
}

impl Default for RoofOptions {
    fn default() -> Self {
        Self {
            axis: None,
            slope: 1.0,
            overhang: 0,
            gable: None,
            ridge: None,
            fill: None,
        }
    }
}

/// 楼梯对应的实心方块
pub fn solid_for(stairs: &str) -> String {
    let base = stairs.split(['?', '[']).next().unwrap_or(stairs);
    let Some(stem) = base.strip_suffix("_stairs") else {
        return base.to_string();
    };
    let stem = stem.strip_prefix("minecraft:").unwrap_or(stem);
    const WOODS: &[&str] = &[
        "oak", "spruce", "birch", "jungle", "acacia", "dark_oak", "mangrove", "cherry", "bamboo", "crimson", "warped",
    ];
    if WOODS.contains(&stem) {
        return format!("{}_planks", stem);
    }
    match stem {
        "stone_brick" | "mossy_stone_brick" | "end_stone_brick" | "nether_brick" | "red_nether_brick"
        | "mud_brick" | "deepslate_brick" | "tuff_brick" | "polished_blackstone_brick" | "deepslate_tile"
        | "prismarine_brick" => format!("{}s", stem),
        "brick" => "bricks".to_string(),
        "quartz" => "quartz_block".to_string(),
        "purpur" => "purpur_block".to_string(),
        _ => stem.to_string(),
    }
}

const FACINGS: [&str; 4] = ["north", "east", "south", "west"];

/// 从 (x, z) 指向 (tx, tz) 的主方向
fn facing_toward(dx: f64, dz: f64) -> &'static str {
    if dx.abs() >= dz.abs() {
        if dx > 0.0 {
            "east"
        } else {
            "west"
        }
    } else if dz > 0.0 {
        "south"
    } else {
        "north"
    }
}

fn opposite(facing: &str) -> &'static str {
    let i = FACINGS.iter().position(|f| *f == facing).unwrap_or(0);
    FACINGS[(i + 2) % 4]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoofCell {
    Stair(&'static str),
    Solid,
}

impl Builder {
    /// 多边形/圆锥屋顶，`center` 的 Y 为屋檐高度
    pub fn draw_poly_roof(
        &mut self,
        center: BlockPos,
        radius: f64,
        height: i32,
        stairs: &str,
        opts: &PolyRoofOptions,
    ) -> usize {
        let height = height.max(1);
        let stair_base = stairs.split('?').next().unwrap_or(stairs).to_string();
        let fill = opts.fill.clone().unwrap_or_else(|| solid_for(stairs));
        let inside = |dx: f64, dz: f64, r: f64| -> bool {
            if r < 0.0 {
                return false;
            }
            if opts.sides >= 3 {
                super::shapes::polygon_distance(dx, dz, opts.sides) <= super::shapes::apothem(r, opts.sides) + 0.5
            } else {
                dx * dx + dz * dz <= (r + 0.5) * (r + 0.5)
            }
        };

        // 第一轮：逐层外圈楼梯、内部实心
        let reach = radius.ceil() as i32 + 1;
        let mut cells: BTreeMap<BlockPos, RoofCell> = BTreeMap::new();
        for layer in 0..height {
            let r = radius * opts.style.radius_factor(layer as f64 / height as f64);
            let y = center[1] + layer;
            for dz in -reach..=reach {
                for dx in -reach..=reach {
                    let (fx, fz) = (dx as f64, dz as f64);
                    if !inside(fx, fz, r) {
                        continue;
                    }
                    let ring = !inside(fx, fz, r - 1.0);
                    let cell = if ring && (dx, dz) != (0, 0) {
                        RoofCell::Stair(facing_toward(-fx, -fz))
                    } else {
                        RoofCell::Solid
                    };
                    cells.insert([center[0] + dx, y, center[2] + dz], cell);
                }
            }
        }

        // 第二轮：同层有 3 个以上楼梯邻居的楼梯降级为实心
        // 只计楼梯邻居，同层实心格不计入
        let demote: Vec<BlockPos> = cells
            .iter()
            .filter(|(_, c)| matches!(c, RoofCell::Stair(_)))
            .filter(|(p, _)| {
                [[1, 0], [-1, 0], [0, 1], [0, -1]]
                    .iter()
                    .filter(|[dx, dz]| {
                        matches!(cells.get(&[p[0] + dx, p[1], p[2] + dz]), Some(RoofCell::Stair(_)))
                    })
                    .count()
                    >= 3
            })
            .map(|(p, _)| *p)
            .collect();
        for p in demote {
            cells.insert(p, RoofCell::Solid);
        }

        // 第三轮：不是所在列最高方块的楼梯降级为实心
        let mut top: HashMap<(i32, i32), i32> = HashMap::new();
        for p in cells.keys() {
            let t = top.entry((p[0], p[2])).or_insert(p[1]);
            *t = (*t).max(p[1]);
        }
        for (p, cell) in cells.iter_mut() {
            if matches!(cell, RoofCell::Stair(_)) && top.get(&(p[0], p[2])) != Some(&p[1]) {
                *cell = RoofCell::Solid;
            }
        }

        let solid = self.brush(&fill);
        let priority = self.priority;
        let mut placed = 0;
        for (p, cell) in cells {
            let brush = match cell {
                RoofCell::Solid => solid,
                RoofCell::Stair(facing) => self.brush_with(&stair_base, Some(&format!("facing={},half=bottom", facing))),
            };
            if self.paint(p, brush, priority) {
                placed += 1;
            }
        }
        placed
    }

    /// 矩形屋顶：`from`/`to` 为占地的 (x, z) 角点，`base_y` 为最低一级楼梯的高度
    pub fn draw_roof_bounds(
        &mut self,
        from: [i32; 2],
        to: [i32; 2],
        base_y: i32,
        stairs: &str,
        opts: &RoofOptions,
    ) -> usize {
        let (x1, x2) = (from[0].min(to[0]), from[0].max(to[0]));
        let (z1, z2) = (from[1].min(to[1]), from[1].max(to[1]));
        let axis = opts.axis.unwrap_or(if x2 - x1 >= z2 - z1 { RoofAxis::X } else { RoofAxis::Z });
        let slope = if opts.slope > 0.0 { opts.slope } else { 1.0 };

        // along：屋脊方向；across：坡面方向
        let (along, across) = match axis {
            RoofAxis::X => ((x1, x2), (z1, z2)),
            RoofAxis::Z => ((z1, z2), (x1, x2)),
        };
        let width = across.1 - across.0 + 1;
        let to_world = |a: i32, c: i32, y: i32| -> BlockPos {
            match axis {
                RoofAxis::X => [a, y, c],
                RoofAxis::Z => [c, y, a],
            }
        };
        // 楼梯朝向：坡面上升的方向
        let (up_from_low, up_from_high) = match axis {
            RoofAxis::X => ("south", "north"),
            RoofAxis::Z => ("east", "west"),
        };

        let profile = if slope >= 1.0 {
            steep_profile(width, slope)
        } else {
            shallow_profile(width, slope)
        };

        let stair_base = stairs.split('?').next().unwrap_or(stairs).to_string();
        let fill = opts.fill.clone().unwrap_or_else(|| solid_for(stairs));
        let solid = self.brush(&fill);
        let roof_priority = self.priority;
        let mut placed = 0;

        for (i, row) in profile.iter().enumerate() {
            let c = across.0 + i as i32;
            let facing = match row.side {
                Side::Low => Some(up_from_low),
                Side::High => Some(up_from_high),
                Side::Center => None,
            };
            for a in (along.0 - opts.overhang)..=(along.1 + opts.overhang) {
                for y in row.bottom..=row.top {
                    let brush = match facing {
                        Some(f) if y == row.top && row.stair => {
                            self.brush_with(&stair_base, Some(&format!("facing={},half=bottom", f)))
                        }
                        _ => solid,
                    };
                    if self.paint(to_world(a, c, base_y + y), brush, roof_priority) {
                        placed += 1;
                    }
                }
            }
        }

        if let Some(gable) = &opts.gable {
            let brush = self.brush(gable);
            for end in [along.0, along.1] {
                for (i, row) in profile.iter().enumerate() {
                    let c = across.0 + i as i32;
                    for y in 0..row.bottom {
                        if self.paint(to_world(end, c, base_y + y), brush, roof_priority - 1) {
                            placed += 1;
                        }
                    }
                }
            }
        }

        if let Some(ridge) = &opts.ridge {
            let brush = self.brush(ridge);
            let peak = profile.iter().map(|r| r.top).max().unwrap_or(0);
            for (i, row) in profile.iter().enumerate() {
                if row.top != peak {
                    continue;
                }
                // 奇数宽度替换屋脊中心列，偶数宽度盖在两侧对向楼梯之上
                let y = if row.side == Side::Center { peak } else { peak + 1 };
                let c = across.0 + i as i32;
                for a in (along.0 - opts.overhang)..=(along.1 + opts.overhang) {
                    if self.paint(to_world(a, c, base_y + y), brush, roof_priority + 1) {
                        placed += 1;
                    }
                }
            }
        }

        placed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Low,
    High,
    Center,
}

/// 坡面上一行（沿屋脊方向延伸）的竖向范围，相对屋檐高度
#[derive(Debug, Clone, Copy)]
struct RoofRow {
    side: Side,
    bottom: i32,
    top: i32,
    /// 顶部是否为楼梯
    stair: bool,
}

fn row_side(i: i32, width: i32) -> (Side, i32) {
    let mirrored = width - 1 - i;
    match i.cmp(&mirrored) {
        std::cmp::Ordering::Less => (Side::Low, i),
        std::cmp::Ordering::Greater => (Side::High, mirrored),
        std::cmp::Ordering::Equal => (Side::Center, i),
    }
}

/// 陡坡（slope >= 1）：按行迭代，每行填满 [floor(d*s), floor((d+1)*s)-1] 的竖向跨度
fn steep_profile(width: i32, slope: f64) -> Vec<RoofRow> {
    (0..width)
        .map(|i| {
            let (side, d) = row_side(i, width);
            let bottom = (d as f64 * slope).floor() as i32;
            let top = (((d + 1) as f64 * slope).floor() as i32 - 1).max(bottom);
            RoofRow {
                side,
                bottom,
                top,
                stair: side != Side::Center,
            }
        })
        .collect()
}

/// 缓坡（slope < 1）：按高度层迭代，每层最外一行放楼梯，其余行为实心台面
fn shallow_profile(width: i32, slope: f64) -> Vec<RoofRow> {
    let level = |d: i32| (d as f64 * slope).floor() as i32;
    (0..width)
        .map(|i| {
            let (side, d) = row_side(i, width);
            let y = level(d);
            let outermost = d == 0 || level(d - 1) < y;
            RoofRow {
                side,
                bottom: y,
                top: y,
                stair: side != Side::Center && outermost,
            }
        })
        .collect()
}
