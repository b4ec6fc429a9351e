//! 图层与输出文档
//!
//! 文档是 `(图层, 实体)` 的有序集合，坐标已翻转到目标坐标系。

use crate::geometry::CadEntity;
use crate::math::{BoundingBox2, Point2};
use serde::{Deserialize, Serialize};

/// 图层
///
/// 声明顺序即输出顺序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Layer {
    Lines,
    Curves,
    Shapes,
    Paths,
    /// 关闭分层时的唯一图层
    Default,
}

impl Layer {
    /// 分层开启时使用的图层
    pub const ALL: [Layer; 4] = [Layer::Lines, Layer::Curves, Layer::Shapes, Layer::Paths];

    /// 图层名称
    pub fn name(&self) -> &'static str {
        match self {
            Layer::Lines => "LINES",
            Layer::Curves => "CURVES",
            Layer::Shapes => "SHAPES",
            Layer::Paths => "PATHS",
            Layer::Default => "0",
        }
    }

    /// 按实体类型分配图层
    pub fn for_entity(entity: &CadEntity) -> Layer {
        match entity {
            CadEntity::Line(_) => Layer::Lines,
            CadEntity::Polyline(_) | CadEntity::Spline(_) => Layer::Curves,
            CadEntity::Circle(_) | CadEntity::Ellipse(_) => Layer::Shapes,
            CadEntity::Arc(_) => Layer::Paths,
        }
    }
}

/// 带图层的实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedEntity {
    pub layer: Layer,
    pub entity: CadEntity,
}

/// 输出文档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// 声明的绘图宽度（未知时为 `None`）
    pub width: Option<f64>,
    /// 声明的绘图高度
    pub height: f64,
    /// 是否按类型分层
    pub layered: bool,
    /// 按 (图层, 发现顺序) 排序
    pub entities: Vec<PlacedEntity>,
}

impl Document {
    pub fn new(width: Option<f64>, height: f64, layered: bool) -> Self {
        Self {
            width,
            height,
            layered,
            entities: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// 文档使用的图层（按输出顺序）
    pub fn layers(&self) -> Vec<Layer> {
        if self.layered {
            Layer::ALL.to_vec()
        } else {
            vec![Layer::Default]
        }
    }

    /// 实体的实际包围盒
    pub fn bounding_box(&self) -> BoundingBox2 {
        let mut bbox = BoundingBox2::empty();
        for placed in &self.entities {
            bbox.merge(&placed.entity.bounding_box());
        }
        bbox
    }

    /// 声明的绘图范围：宽度已知时为 `(0,0)-(w,h)`，否则取实体包围盒的水平范围
    pub fn extent(&self) -> BoundingBox2 {
        match self.width {
            Some(width) => BoundingBox2::new(Point2::origin(), Point2::new(width, self.height)),
            None => {
                let bbox = self.bounding_box();
                let (min_x, max_x) = if bbox.is_empty() {
                    (0.0, 0.0)
                } else {
                    (bbox.min.x, bbox.max.x)
                };
                BoundingBox2::new(Point2::new(min_x, 0.0), Point2::new(max_x, self.height))
            }
        }
    }
}
