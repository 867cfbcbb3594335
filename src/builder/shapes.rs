//! 几何原语光栅化：椭球、圆柱、圆环、正多边形柱、棱锥、贝塞尔曲线
//!
//! 旋转通过逆变换采样实现：把整数格点变换回形状的局部坐标系再判断是否在内部。
//! 形状的隶属测试带一个收缩量 `shrink`（单位：方块），外表面 shrink = 0，
//! 空心形状的内表面 shrink = thickness，噪声则直接叠加到 shrink 上。

use super::random::noise3;
use super::{line_points, Brush, Builder};
use crate::voxel::{BlockPos, IntoBlockPos};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// 表面噪声扰动
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Noise {
    /// 最大偏移（方块）
    pub amount: f64,
    /// 特征尺度（方块）
    pub scale: f64,
    #[serde(default)]
    pub seed: i64,
}

/// 原语的可选参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeOptions {
    pub hollow: bool,
    pub thickness: f64,
    /// 绕 X、Y、Z 轴的旋转角（度）
    pub rotation: Option<[f64; 3]>,
    pub noise: Option<Noise>,
}

impl Default for ShapeOptions {
    fn default() -> Self {
        Self {
            hollow: false,
            thickness: 1.0,
            rotation: None,
            noise: None,
        }
    }
}

impl ShapeOptions {
    pub fn hollow(thickness: f64) -> Self {
        Self {
            hollow: true,
            thickness,
            ..Default::default()
        }
    }

    pub fn rotated(mut self, rotation: [f64; 3]) -> Self {
        self.rotation = Some(rotation);
        self
    }

    pub fn with_noise(mut self, noise: Noise) -> Self {
        self.noise = Some(noise);
        self
    }
}

/// 局部坐标系中的隐式形状
trait Solid {
    /// 局部包围盒 (min, max)
    fn local_bounds(&self) -> ([f64; 3], [f64; 3]);
    /// 点是否在收缩 `shrink` 后的形状内
    fn contains(&self, p: [f64; 3], shrink: f64) -> bool;
}

struct Ellipsoid {
    radii: [f64; 3],
}

impl Solid for Ellipsoid {
    fn local_bounds(&self) -> ([f64; 3], [f64; 3]) {
        let r = self.radii.map(|v| v + 0.5);
        ([-r[0], -r[1], -r[2]], r)
    }

    fn contains(&self, p: [f64; 3], shrink: f64) -> bool {
        let mut sum = 0.0;
        for i in 0..3 {
            let r = self.radii[i] + 0.5 - shrink;
            if r <= 0.0 {
                return false;
            }
            sum += (p[i] / r).powi(2);
        }
        sum <= 1.0
    }
}

/// 竖直圆柱，局部原点为底面中心
struct Cylinder {
    radius: f64,
    height: f64,
}

impl Solid for Cylinder {
    fn local_bounds(&self) -> ([f64; 3], [f64; 3]) {
        let r = self.radius + 0.5;
        ([-r, 0.0, -r], [r, self.height - 1.0, r])
    }

    fn contains(&self, p: [f64; 3], shrink: f64) -> bool {
        let r = self.radius + 0.5 - shrink;
        r > 0.0 && p[1] >= -0.5 && p[1] < self.height - 0.5 && p[0] * p[0] + p[2] * p[2] <= r * r
    }
}

/// 水平圆环，局部原点为中心
struct Torus {
    major: f64,
    minor: f64,
}

impl Solid for Torus {
    fn local_bounds(&self) -> ([f64; 3], [f64; 3]) {
        let outer = self.major + self.minor + 0.5;
        let h = self.minor + 0.5;
        ([-outer, -h, -outer], [outer, h, outer])
    }

    fn contains(&self, p: [f64; 3], shrink: f64) -> bool {
        let r = self.minor + 0.5 - shrink;
        if r <= 0.0 {
            return false;
        }
        let ring = (p[0] * p[0] + p[2] * p[2]).sqrt() - self.major;
        ring * ring + p[1] * p[1] <= r * r
    }
}

/// 正多边形柱，局部原点为底面中心，第一个顶点朝 +X
struct Prism {
    radius: f64,
    sides: u32,
    height: f64,
}

impl Solid for Prism {
    fn local_bounds(&self) -> ([f64; 3], [f64; 3]) {
        let r = self.radius + 0.5;
        ([-r, 0.0, -r], [r, self.height - 1.0, r])
    }

    fn contains(&self, p: [f64; 3], shrink: f64) -> bool {
        if p[1] < -0.5 || p[1] >= self.height - 0.5 {
            return false;
        }
        let limit = apothem(self.radius, self.sides) + 0.5 - shrink;
        limit > 0.0 && polygon_distance(p[0], p[2], self.sides) <= limit
    }
}

/// 四棱锥，局部原点为底面中心
struct Pyramid {
    half: f64,
    height: f64,
}

impl Solid for Pyramid {
    fn local_bounds(&self) -> ([f64; 3], [f64; 3]) {
        let r = self.half + 0.5;
        ([-r, 0.0, -r], [r, self.height - 1.0, r])
    }

    fn contains(&self, p: [f64; 3], shrink: f64) -> bool {
        if p[1] < -0.5 || p[1] >= self.height - 0.5 {
            return false;
        }
        let t = (p[1] + 0.5) / self.height;
        let half = (self.half + 0.5) * (1.0 - t) - shrink;
        half >= 0.0 && p[0].abs() <= half && p[2].abs() <= half
    }
}

/// 正多边形的边心距
pub(crate) fn apothem(radius: f64, sides: u32) -> f64 {
    radius * (PI / sides.max(3) as f64).cos()
}

/// 点到正多边形中心在各边法线方向上的最大投影
pub(crate) fn polygon_distance(x: f64, z: f64, sides: u32) -> f64 {
    let n = sides.max(3);
    (0..n)
        .map(|i| {
            let angle = (i as f64 + 0.5) * 2.0 * PI / n as f64;
            x * angle.cos() + z * angle.sin()
        })
        .fold(f64::MIN, f64::max)
}

/// 3x3 旋转矩阵 R = Rz * Ry * Rx
fn rotation_matrix(deg: [f64; 3]) -> [[f64; 3]; 3] {
    let [a, b, c] = deg.map(f64::to_radians);
    let (sa, ca) = a.sin_cos();
    let (sb, cb) = b.sin_cos();
    let (sc, cc) = c.sin_cos();
    [
        [cc * cb, cc * sb * sa - sc * ca, cc * sb * ca + sc * sa],
        [sc * cb, sc * sb * sa + cc * ca, sc * sb * ca - cc * sa],
        [-sb, cb * sa, cb * ca],
    ]
}

fn mul(m: &[[f64; 3]; 3], v: [f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

fn transpose(m: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut t = [[0.0; 3]; 3];
    for (i, row) in m.iter().enumerate() {
        for (j, v) in row.iter().enumerate() {
            t[j][i] = *v;
        }
    }
    t
}

impl Builder {
    fn rasterize(&mut self, origin: BlockPos, solid: &dyn Solid, brush: Brush, opts: &ShapeOptions) -> usize {
        let priority = self.priority;
        let (mut lo, mut hi) = solid.local_bounds();
        let pad = opts.noise.map(|n| n.amount.abs()).unwrap_or(0.0);

        let inverse = match opts.rotation {
            Some(r) if r.iter().any(|v| v.rem_euclid(360.0) != 0.0) => {
                let forward = rotation_matrix(r);
                let mut rlo = [f64::MAX; 3];
                let mut rhi = [f64::MIN; 3];
                for corner in 0..8 {
                    let c = [
                        if corner & 1 == 0 { lo[0] } else { hi[0] },
                        if corner & 2 == 0 { lo[1] } else { hi[1] },
                        if corner & 4 == 0 { lo[2] } else { hi[2] },
                    ];
                    let w = mul(&forward, c);
                    for i in 0..3 {
                        rlo[i] = rlo[i].min(w[i]);
                        rhi[i] = rhi[i].max(w[i]);
                    }
                }
                lo = rlo;
                hi = rhi;
                Some(transpose(&forward))
            }
            _ => None,
        };

        let min = [0, 1, 2].map(|i| origin[i] + (lo[i] - pad).floor() as i32);
        let max = [0, 1, 2].map(|i| origin[i] + (hi[i] + pad).ceil() as i32);

        let mut placed = 0;
        for y in min[1]..=max[1] {
            for z in min[2]..=max[2] {
                for x in min[0]..=max[0] {
                    let offset = [
                        (x - origin[0]) as f64,
                        (y - origin[1]) as f64,
                        (z - origin[2]) as f64,
                    ];
                    let local = match &inverse {
                        Some(m) => mul(m, offset),
                        None => offset,
                    };
                    let bump = match opts.noise {
                        Some(n) => noise3(x as f64, y as f64, z as f64, n.scale, n.seed) * n.amount,
                        None => 0.0,
                    };
                    let inside = solid.contains(local, -bump)
                        && !(opts.hollow && solid.contains(local, opts.thickness - bump));
                    if inside && self.paint([x, y, z], brush, priority) {
                        placed += 1;
                    }
                }
            }
        }
        placed
    }

    /// 椭球，`radii` 为三轴半径
    pub fn draw_ellipsoid(
        &mut self,
        center: impl IntoBlockPos,
        radii: [f64; 3],
        block_type: &str,
        opts: &ShapeOptions,
    ) -> usize {
        let brush = self.brush(block_type);
        self.rasterize(center.into_block_pos(), &Ellipsoid { radii }, brush, opts)
    }

    pub fn draw_sphere(&mut self, center: impl IntoBlockPos, radius: f64, block_type: &str, opts: &ShapeOptions) -> usize {
        self.draw_ellipsoid(center, [radius; 3], block_type, opts)
    }

    /// 竖直圆柱，`base` 为底面中心
    pub fn draw_cylinder(
        &mut self,
        base: impl IntoBlockPos,
        radius: f64,
        height: i32,
        block_type: &str,
        opts: &ShapeOptions,
    ) -> usize {
        let brush = self.brush(block_type);
        let solid = Cylinder {
            radius,
            height: height.max(1) as f64,
        };
        self.rasterize(base.into_block_pos(), &solid, brush, opts)
    }

    /// 水平圆环：`major` 为中心到管中心的距离，`minor` 为管半径
    pub fn draw_torus(
        &mut self,
        center: impl IntoBlockPos,
        major: f64,
        minor: f64,
        block_type: &str,
        opts: &ShapeOptions,
    ) -> usize {
        let brush = self.brush(block_type);
        self.rasterize(center.into_block_pos(), &Torus { major, minor }, brush, opts)
    }

    /// 正多边形柱（拉伸），边数小于 3 时按 3 处理
    pub fn draw_polygon(
        &mut self,
        base: impl IntoBlockPos,
        radius: f64,
        sides: u32,
        height: i32,
        block_type: &str,
        opts: &ShapeOptions,
    ) -> usize {
        let brush = self.brush(block_type);
        let solid = Prism {
            radius,
            sides: sides.max(3),
            height: height.max(1) as f64,
        };
        self.rasterize(base.into_block_pos(), &solid, brush, opts)
    }

    /// 四棱锥，`half` 为底面半边长
    pub fn draw_pyramid(
        &mut self,
        base: impl IntoBlockPos,
        half: f64,
        height: i32,
        block_type: &str,
        opts: &ShapeOptions,
    ) -> usize {
        let brush = self.brush(block_type);
        let solid = Pyramid {
            half,
            height: height.max(1) as f64,
        };
        self.rasterize(base.into_block_pos(), &solid, brush, opts)
    }

    /// 二次（3 个控制点）或三次（4 个控制点）贝塞尔曲线
    ///
    /// 采样步数为 `ceil(控制多边形总长 * 2)`，相邻采样点用直线连接；
    /// `width > 1` 时每个点放置半径 `width/2` 的球
    pub fn draw_bezier(&mut self, points: &[[f64; 3]], block_type: &str, width: f64) -> usize {
        if !(3..=4).contains(&points.len()) {
            log::warn!("贝塞尔曲线需要 3 或 4 个控制点，实际 {} 个，已跳过", points.len());
            return 0;
        }
        let chord: f64 = points.windows(2).map(|w| distance(w[0], w[1])).sum();
        let steps = ((chord * 2.0).ceil() as usize).max(1);

        let samples: Vec<BlockPos> = (0..=steps)
            .map(|i| bezier_point(points, i as f64 / steps as f64).into_block_pos())
            .collect();

        let mut path: Vec<BlockPos> = Vec::new();
        for pair in samples.windows(2) {
            for p in line_points(pair[0], pair[1]) {
                if path.last() != Some(&p) {
                    path.push(p);
                }
            }
        }
        if path.is_empty() {
            path.extend(samples.first());
        }

        if width > 1.0 {
            let opts = ShapeOptions::default();
            let radius = (width / 2.0 - 0.5).max(0.0);
            path.into_iter()
                .map(|p| self.draw_sphere(p, radius, block_type, &opts))
                .sum()
        } else {
            let brush = self.brush(block_type);
            let priority = self.priority;
            path.into_iter()
                .filter(|&p| self.paint(p, brush, priority))
                .count()
        }
    }
}

fn distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt()
}

fn bezier_point(p: &[[f64; 3]], t: f64) -> [f64; 3] {
    let u = 1.0 - t;
    let mut out = [0.0; 3];
    for i in 0..3 {
        out[i] = if p.len() == 3 {
            u * u * p[0][i] + 2.0 * u * t * p[1][i] + t * t * p[2][i]
        } else {
            u * u * u * p[0][i] + 3.0 * u * u * t * p[1][i] + 3.0 * u * t * t * p[2][i] + t * t * t * p[3][i]
        };
    }
    // 避免 0.9999999 之类的误差在取整时落到相邻格
    out.map(|v| (v * 1e9).round() / 1e9)
}
