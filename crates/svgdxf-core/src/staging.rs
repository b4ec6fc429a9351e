//! 中间文件（staging）数据结构
//!
//! 提取阶段的产物，转换阶段原样消费。字段名即文件格式：
//!
//! ```json
//! { "viewBoxWidth": 800, "viewBoxHeight": 600,
//!   "paths":  [ { "style": {...}, "segments": [...] } ],
//!   "shapes": [ { "kind": "rect", "style": {...}, "segments": [...] } ] }
//! ```

use crate::normalize::{normalize_commands, normalize_shape};
use crate::path::PathCommand;
use crate::segment::NormalizedSegment;
use crate::shape::{Shape, ShapeKind, Style};
use serde::{Deserialize, Serialize};

/// 一条路径（`<path>` 元素）的规范化线段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedPath {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub style: Style,
    pub segments: Vec<NormalizedSegment>,
}

impl StagedPath {
    pub fn from_commands(commands: &[PathCommand], style: Style) -> Self {
        Self {
            id: None,
            style,
            segments: normalize_commands(commands),
        }
    }

    pub fn with_id(mut self, id: Option<String>) -> Self {
        self.id = id;
        self
    }
}

/// 一个基本图形的规范化线段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedShape {
    pub kind: ShapeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub style: Style,
    pub segments: Vec<NormalizedSegment>,
}

impl StagedShape {
    pub fn from_shape(shape: &Shape) -> Self {
        Self {
            kind: shape.primitive.kind(),
            id: None,
            style: shape.style.clone(),
            segments: normalize_shape(&shape.primitive),
        }
    }

    pub fn with_id(mut self, id: Option<String>) -> Self {
        self.id = id;
        self
    }
}

/// 中间文件文档
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagingDocument {
    /// 源文件名（仅用于报告）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// 绘图宽度；未知时为 `None`
    pub view_box_width: Option<f64>,
    /// 绘图高度；未知时为 `None`，转换阶段将因此失败
    pub view_box_height: Option<f64>,
    #[serde(default)]
    pub paths: Vec<StagedPath>,
    #[serde(default)]
    pub shapes: Vec<StagedShape>,
}

impl StagingDocument {
    pub fn new(view_box_width: Option<f64>, view_box_height: Option<f64>) -> Self {
        Self {
            view_box_width,
            view_box_height,
            ..Default::default()
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// 所有路径与图形的线段总数
    pub fn segment_count(&self) -> usize {
        self.paths.iter().map(|p| p.segments.len()).sum::<usize>()
            + self.shapes.iter().map(|s| s.segments.len()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.shapes.is_empty()
    }
}
