//! 基本图形图元
//!
//! 来自 SVG 的 `rect`、`circle`、`ellipse`、`line`、`polyline`/`polygon` 元素。
//! 样式只做透传，转换器不解释样式。

use crate::math::Point2;
use serde::{Deserialize, Serialize};

/// 图形样式（原样携带）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    pub fill: String,
    pub stroke: String,
    pub stroke_width: String,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fill: "none".to_string(),
            stroke: "none".to_string(),
            stroke_width: "1".to_string(),
        }
    }
}

/// 图形图元（原始几何参数）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ShapePrimitive {
    Rect {
        origin: Point2,
        width: f64,
        height: f64,
        /// 圆角半径，0 表示直角
        #[serde(default)]
        rx: f64,
        #[serde(default)]
        ry: f64,
    },
    Circle {
        center: Point2,
        radius: f64,
    },
    Ellipse {
        center: Point2,
        rx: f64,
        ry: f64,
    },
    Line {
        start: Point2,
        end: Point2,
    },
    Polyline {
        points: Vec<Point2>,
        closed: bool,
    },
}

/// 图形类别（用于中间文件和报告）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rect,
    Circle,
    Ellipse,
    Line,
    Polyline,
    Polygon,
}

impl ShapeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeKind::Rect => "rect",
            ShapeKind::Circle => "circle",
            ShapeKind::Ellipse => "ellipse",
            ShapeKind::Line => "line",
            ShapeKind::Polyline => "polyline",
            ShapeKind::Polygon => "polygon",
        }
    }
}

impl ShapePrimitive {
    pub fn kind(&self) -> ShapeKind {
        match self {
            ShapePrimitive::Rect { .. } => ShapeKind::Rect,
            ShapePrimitive::Circle { .. } => ShapeKind::Circle,
            ShapePrimitive::Ellipse { .. } => ShapeKind::Ellipse,
            ShapePrimitive::Line { .. } => ShapeKind::Line,
            ShapePrimitive::Polyline { closed: false, .. } => ShapeKind::Polyline,
            ShapePrimitive::Polyline { closed: true, .. } => ShapeKind::Polygon,
        }
    }
}

/// 带样式的图形
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub primitive: ShapePrimitive,
    pub style: Style,
}

impl Shape {
    pub fn new(primitive: ShapePrimitive) -> Self {
        Self {
            primitive,
            style: Style::default(),
        }
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }
}
