//! 体素构建器 - 以坐标为键的方块放置，带优先级与分组
//!
//! 放置规则（新方块 N，已有方块 E）：
//! 1. 没有 E：放置
//! 2. N 非空气且 E 为空气：总是放置（清空区域后仍可建造）
//! 3. 否则仅当 N 的优先级 >= E 的优先级时放置（同级后者胜出）

pub mod component;
pub mod decor;
pub mod random;
pub mod roof;
pub mod shapes;

use crate::blocks::{is_air_name, merge_properties, parse_block_spec, PlaceMode};
use crate::voxel::{Bounds, BlockPos, IntoBlockPos, PlacedVoxel, Voxel};
use std::collections::HashMap;
use std::rc::Rc;

pub use component::{ComponentFn, PlaceOptions};
pub use decor::{HangingOptions, ScatterOptions, SpiralOptions};
pub use random::{noise3, pick_at, random_at};
pub use roof::{PolyRoofOptions, RoofAxis, RoofOptions, RoofStyle};
pub use shapes::{Noise, ShapeOptions};

/// `clear(区域)` 使用的优先级，足以覆盖常规建造
pub const CLEAR_PRIORITY: i32 = 1000;

/// 组件嵌套放置的深度上限
const MAX_COMPONENT_DEPTH: usize = 16;

/// 内部化的方块：基础类型 + 属性
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BlockKey {
    base: String,
    properties: Option<String>,
}

/// 预处理过的类型字符串，原语内复用避免重复解析
#[derive(Debug, Clone, Copy)]
pub(crate) struct Brush {
    block: u32,
    mode: PlaceMode,
    air: bool,
}

/// 坐标索引中的当前胜出者
#[derive(Debug, Clone, Copy)]
struct Cell {
    block: u32,
    priority: i32,
    record: usize,
}

#[derive(Debug, Clone)]
struct Record {
    position: BlockPos,
    block: u32,
    priority: i32,
    group: Option<Rc<str>>,
}

/// `set` 的可选参数
#[derive(Debug, Clone, Default)]
pub struct SetOptions<'a> {
    /// 覆盖当前优先级
    pub priority: Option<i32>,
    /// 追加属性，覆盖类型字符串中的同名键
    pub properties: Option<&'a str>,
}

/// `begin_group` 的可选参数
#[derive(Debug, Clone, Default)]
pub struct GroupOptions {
    pub priority: Option<i32>,
}

/// 体素构建器
pub struct Builder {
    palette: Vec<BlockKey>,
    palette_index: HashMap<BlockKey, u32>,
    palette_air: Vec<bool>,
    cells: HashMap<BlockPos, Cell>,
    records: Vec<Record>,
    priority: i32,
    group: Option<Rc<str>>,
    group_counter: usize,
    components: HashMap<String, Rc<ComponentFn>>,
    component_depth: usize,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    pub fn new() -> Self {
        Self {
            palette: Vec::new(),
            palette_index: HashMap::new(),
            palette_air: Vec::new(),
            cells: HashMap::new(),
            records: Vec::new(),
            priority: 0,
            group: None,
            group_counter: 0,
            components: HashMap::new(),
            component_depth: 0,
        }
    }

    // ============== 放置核心 ==============

    pub(crate) fn brush(&mut self, block_type: &str) -> Brush {
        self.brush_with(block_type, None)
    }

    pub(crate) fn brush_with(&mut self, block_type: &str, extra: Option<&str>) -> Brush {
        let spec = parse_block_spec(block_type);
        let key = BlockKey {
            properties: merge_properties(spec.properties.as_deref(), extra),
            base: spec.base,
        };
        let air = is_air_name(&key.base);
        let block = match self.palette_index.get(&key) {
            Some(&i) => i,
            None => {
                let i = self.palette.len() as u32;
                self.palette.push(key.clone());
                self.palette_index.insert(key, i);
                self.palette_air.push(air);
                i
            }
        };
        Brush {
            block,
            mode: spec.mode,
            air,
        }
    }

    /// 按放置规则写入一个位置，返回是否生效
    pub(crate) fn paint(&mut self, position: BlockPos, brush: Brush, priority: i32) -> bool {
        let existing = self.cells.get(&position).copied();
        let occupied = existing.filter(|c| !self.palette_air[c.block as usize]);

        match brush.mode {
            PlaceMode::Keep if occupied.is_some() => return false,
            PlaceMode::Replace if occupied.is_none() => return false,
            _ => {}
        }

        if let Some(cell) = existing {
            let over_air = !brush.air && self.palette_air[cell.block as usize];
            if !over_air && priority < cell.priority {
                return false;
            }
        }

        let record = self.records.len();
        self.records.push(Record {
            position,
            block: brush.block,
            priority,
            group: self.group.clone(),
        });
        self.cells.insert(
            position,
            Cell {
                block: brush.block,
                priority,
                record,
            },
        );
        true
    }

    // ============== 基本操作 ==============

    /// 放置单个方块
    pub fn set(&mut self, pos: impl IntoBlockPos, block_type: &str) -> bool {
        self.set_with(pos, block_type, &SetOptions::default())
    }

    pub fn set_with(&mut self, pos: impl IntoBlockPos, block_type: &str, opts: &SetOptions) -> bool {
        let brush = self.brush_with(block_type, opts.properties);
        let priority = opts.priority.unwrap_or(self.priority);
        self.paint(pos.into_block_pos(), brush, priority)
    }

    /// 查询位置上的方块类型，未设置返回 `None`
    pub fn get(&self, pos: impl IntoBlockPos) -> Option<&str> {
        let cell = self.cells.get(&pos.into_block_pos())?;
        Some(self.palette[cell.block as usize].base.as_str())
    }

    /// 查询位置上的方块属性
    pub fn properties_at(&self, pos: impl IntoBlockPos) -> Option<&str> {
        let cell = self.cells.get(&pos.into_block_pos())?;
        self.palette[cell.block as usize].properties.as_deref()
    }

    /// 填充长方体（两个角点包含在内）
    pub fn fill(&mut self, from: impl IntoBlockPos, to: impl IntoBlockPos, block_type: &str) -> usize {
        let brush = self.brush(block_type);
        let priority = self.priority;
        Bounds::new(from, to)
            .positions()
            .filter(|&p| self.paint(p, brush, priority))
            .count()
    }

    /// 长方体的四面竖墙（不含顶底）
    pub fn walls(&mut self, from: impl IntoBlockPos, to: impl IntoBlockPos, block_type: &str) -> usize {
        let brush = self.brush(block_type);
        let priority = self.priority;
        let b = Bounds::new(from, to);
        b.positions()
            .filter(|p| p[0] == b.min[0] || p[0] == b.max[0] || p[2] == b.min[2] || p[2] == b.max[2])
            .filter(|&p| self.paint(p, brush, priority))
            .count()
    }

    /// 3D DDA 直线，端点包含在内
    pub fn line(&mut self, from: impl IntoBlockPos, to: impl IntoBlockPos, block_type: &str) -> usize {
        let brush = self.brush(block_type);
        let priority = self.priority;
        line_points(from.into_block_pos(), to.into_block_pos())
            .into_iter()
            .filter(|&p| self.paint(p, brush, priority))
            .count()
    }

    /// 清除：无参数时重置全部状态，给出区域时以高优先级写入空气
    pub fn clear(&mut self, region: Option<Bounds>) {
        match region {
            None => {
                self.cells.clear();
                self.records.clear();
                self.priority = 0;
                self.group = None;
                self.group_counter = 0;
            }
            Some(bounds) => {
                let brush = self.brush("air");
                for p in bounds.positions() {
                    self.paint(p, brush, CLEAR_PRIORITY);
                }
            }
        }
    }

    // ============== 优先级与分组 ==============

    pub fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// 开始一个分组，返回分组 ID；未命名时自动编号
    pub fn begin_group(&mut self, name: Option<&str>, opts: GroupOptions) -> String {
        self.group_counter += 1;
        let id = match name {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => format!("group_{}", self.group_counter),
        };
        if let Some(p) = opts.priority {
            self.priority = p;
        }
        self.group = Some(Rc::from(id.as_str()));
        id
    }

    /// 结束分组，优先级恢复默认
    pub fn end_group(&mut self) {
        self.group = None;
        self.priority = 0;
    }

    pub fn current_group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    // ============== 随机 ==============

    pub fn random_at(&self, x: i32, y: i32, z: i32, seed: i64) -> f64 {
        random_at(x, y, z, seed)
    }

    pub fn pick_at<'a, T>(&self, items: &'a [T], x: i32, y: i32, z: i32, seed: i64) -> Option<&'a T> {
        pick_at(items, x, y, z, seed)
    }

    // ============== 输出 ==============

    /// 当前胜出的非空气方块数量
    pub fn len(&self) -> usize {
        self.cells
            .values()
            .filter(|c| !self.palette_air[c.block as usize])
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 放置记录总数（含被覆盖的）
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// 所有非空气方块的包围盒
    pub fn bounds(&self) -> Option<Bounds> {
        let positions: Vec<BlockPos> = self.winners().map(|(p, _)| p).collect();
        Bounds::enclosing(&positions)
    }

    fn winners(&self) -> impl Iterator<Item = (BlockPos, &Record)> + '_ {
        let mut active: Vec<&Cell> = self
            .cells
            .values()
            .filter(|c| !self.palette_air[c.block as usize])
            .collect();
        active.sort_by_key(|c| c.record);
        active.into_iter().map(move |c| {
            let r = &self.records[c.record];
            (r.position, r)
        })
    }

    /// 导出用体素列表：每个位置的胜出者，按放置顺序，不含空气
    pub fn voxels(&self) -> Vec<Voxel> {
        self.winners()
            .map(|(position, r)| {
                let key = &self.palette[r.block as usize];
                Voxel {
                    position,
                    block_type: key.base.clone(),
                    properties: key.properties.clone(),
                }
            })
            .collect()
    }

    /// 带优先级与分组的放置结果
    pub fn placements(&self) -> Vec<PlacedVoxel> {
        self.winners()
            .map(|(position, r)| {
                let key = &self.palette[r.block as usize];
                PlacedVoxel {
                    position,
                    block_type: key.base.clone(),
                    properties: key.properties.clone(),
                    priority: r.priority,
                    group_id: r.group.as_deref().map(str::to_string),
                }
            })
            .collect()
    }

    /// 胜出者（含空气）及其优先级，组件展开时使用
    pub(crate) fn raw_winners(&self) -> Vec<(BlockPos, String, Option<String>, i32)> {
        let mut cells: Vec<(&BlockPos, &Cell)> = self.cells.iter().collect();
        cells.sort_by_key(|(_, c)| c.record);
        cells
            .into_iter()
            .map(|(p, c)| {
                let key = &self.palette[c.block as usize];
                (*p, key.base.clone(), key.properties.clone(), c.priority)
            })
            .collect()
    }
}

/// 3D DDA：沿最长轴步进，其余轴按比例取整
pub fn line_points(from: BlockPos, to: BlockPos) -> Vec<BlockPos> {
    let d = [to[0] - from[0], to[1] - from[1], to[2] - from[2]];
    let steps = d.iter().map(|v| v.abs()).max().unwrap_or(0);
    if steps == 0 {
        return vec![from];
    }
    (0..=steps)
        .map(|i| {
            let t = i as f64 / steps as f64;
            [
                from[0] + (d[0] as f64 * t).round() as i32,
                from[1] + (d[1] as f64 * t).round() as i32,
                from[2] + (d[2] as f64 * t).round() as i32,
            ]
        })
        .collect()
}
