//! 体素记录 - 构建器与导出器之间的边界类型

use serde::{Deserialize, Serialize};

/// 整数方块坐标
pub type BlockPos = [i32; 3];

/// 导出器输入的体素：`{ position, type, properties? }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voxel {
    pub position: BlockPos,
    /// 方块类型，可带 `?k=v` 属性后缀
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<String>,
}

impl Voxel {
    pub fn new(position: BlockPos, block_type: impl Into<String>) -> Self {
        Self {
            position,
            block_type: block_type.into(),
            properties: None,
        }
    }

    pub fn with_properties(mut self, properties: impl Into<String>) -> Self {
        self.properties = Some(properties.into());
        self
    }
}

/// 构建器产出的放置记录（带分组信息，供界面分组显示）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedVoxel {
    pub position: BlockPos,
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<String>,
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

impl From<PlacedVoxel> for Voxel {
    fn from(p: PlacedVoxel) -> Self {
        Voxel {
            position: p.position,
            block_type: p.block_type,
            properties: p.properties,
        }
    }
}

/// 可转换为方块坐标的类型，浮点坐标向下取整
pub trait IntoBlockPos {
    fn into_block_pos(self) -> BlockPos;
}

impl IntoBlockPos for BlockPos {
    fn into_block_pos(self) -> BlockPos {
        self
    }
}

impl IntoBlockPos for (i32, i32, i32) {
    fn into_block_pos(self) -> BlockPos {
        [self.0, self.1, self.2]
    }
}

impl IntoBlockPos for [f64; 3] {
    fn into_block_pos(self) -> BlockPos {
        [self[0].floor() as i32, self[1].floor() as i32, self[2].floor() as i32]
    }
}

impl IntoBlockPos for (f64, f64, f64) {
    fn into_block_pos(self) -> BlockPos {
        [self.0, self.1, self.2].into_block_pos()
    }
}

/// 轴对齐包围盒（闭区间）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: BlockPos,
    pub max: BlockPos,
}

impl Bounds {
    /// 由任意两个角点构造
    pub fn new(a: impl IntoBlockPos, b: impl IntoBlockPos) -> Self {
        let (a, b) = (a.into_block_pos(), b.into_block_pos());
        Self {
            min: [a[0].min(b[0]), a[1].min(b[1]), a[2].min(b[2])],
            max: [a[0].max(b[0]), a[1].max(b[1]), a[2].max(b[2])],
        }
    }

    /// 包含所有坐标的最小包围盒
    pub fn enclosing<'a>(positions: impl IntoIterator<Item = &'a BlockPos>) -> Option<Self> {
        let mut iter = positions.into_iter();
        let first = *iter.next()?;
        let mut bounds = Bounds { min: first, max: first };
        for p in iter {
            for i in 0..3 {
                bounds.min[i] = bounds.min[i].min(p[i]);
                bounds.max[i] = bounds.max[i].max(p[i]);
            }
        }
        Some(bounds)
    }

    pub fn size(&self) -> [i32; 3] {
        [
            self.max[0] - self.min[0] + 1,
            self.max[1] - self.min[1] + 1,
            self.max[2] - self.min[2] + 1,
        ]
    }

    pub fn volume(&self) -> i64 {
        let s = self.size();
        s[0] as i64 * s[1] as i64 * s[2] as i64
    }

    pub fn contains(&self, p: BlockPos) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }

    /// 按 Y、Z、X 顺序遍历所有坐标
    pub fn positions(&self) -> impl Iterator<Item = BlockPos> + '_ {
        (self.min[1]..=self.max[1]).flat_map(move |y| {
            (self.min[2]..=self.max[2])
                .flat_map(move |z| (self.min[0]..=self.max[0]).map(move |x| [x, y, z]))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_positions_floor() {
        assert_eq!([1.7, -0.2, 3.0].into_block_pos(), [1, -1, 3]);
    }

    #[test]
    fn test_bounds() {
        let b = Bounds::new([3, 0, -1], [0, 2, 1]);
        assert_eq!(b.min, [0, 0, -1]);
        assert_eq!(b.size(), [4, 3, 3]);
        assert_eq!(b.volume(), 36);
        assert_eq!(b.positions().count(), 36);
        assert!(b.contains([1, 1, 0]));
    }

    #[test]
    fn test_voxel_json_shape() {
        let v = Voxel::new([1, 2, 3], "oak_stairs").with_properties("facing=north");
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"position":[1,2,3],"type":"oak_stairs","properties":"facing=north"}"#);
        let back: Voxel = serde_json::from_str(r#"{"position":[0,0,0],"type":"stone"}"#).unwrap();
        assert_eq!(back.properties, None);
    }
}
