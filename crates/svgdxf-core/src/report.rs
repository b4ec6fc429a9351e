//! 转换报告
//!
//! 纯函数，从文档或中间文件生成可序列化的统计结构，不参与转换主流程。

use crate::document::Document;
use crate::math::{BoundingBox2, Point2};
use crate::segment::NormalizedSegment;
use crate::staging::StagingDocument;
use serde::Serialize;
use std::collections::BTreeMap;

/// 输出文档报告
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionReport {
    pub entity_count: usize,
    pub entities_by_kind: BTreeMap<String, usize>,
    pub entities_by_layer: BTreeMap<String, usize>,
    pub width: Option<f64>,
    pub height: f64,
    /// 实体包围盒（目标坐标系），无实体时为 `None`
    pub bounds: Option<BoundingBox2>,
}

/// 中间文件报告
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagingReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub view_box_width: Option<f64>,
    pub view_box_height: Option<f64>,
    pub path_count: usize,
    pub shape_count: usize,
    pub segment_count: usize,
    pub segments_by_type: BTreeMap<String, usize>,
    pub shapes_by_kind: BTreeMap<String, usize>,
    /// 线段包围盒（源坐标系，含控制点）
    pub bounds: Option<BoundingBox2>,
}

pub fn summarize(doc: &Document) -> ConversionReport {
    let mut entities_by_kind = BTreeMap::new();
    let mut entities_by_layer = BTreeMap::new();
    for placed in &doc.entities {
        *entities_by_kind
            .entry(placed.entity.type_name().to_string())
            .or_insert(0) += 1;
        *entities_by_layer
            .entry(placed.layer.name().to_string())
            .or_insert(0) += 1;
    }

    let bbox = doc.bounding_box();
    ConversionReport {
        entity_count: doc.len(),
        entities_by_kind,
        entities_by_layer,
        width: doc.width,
        height: doc.height,
        bounds: (!bbox.is_empty()).then_some(bbox),
    }
}

pub fn summarize_staging(doc: &StagingDocument) -> StagingReport {
    let mut segments_by_type = BTreeMap::new();
    let mut shapes_by_kind = BTreeMap::new();
    let mut bbox = BoundingBox2::empty();

    let all_segments = doc
        .paths
        .iter()
        .flat_map(|p| p.segments.iter())
        .chain(doc.shapes.iter().flat_map(|s| s.segments.iter()));
    for segment in all_segments {
        *segments_by_type
            .entry(segment.type_name().to_string())
            .or_insert(0) += 1;
        for p in segment_extent_points(segment) {
            if p.x.is_finite() && p.y.is_finite() {
                bbox.expand_to_include(&p);
            }
        }
    }
    for shape in &doc.shapes {
        *shapes_by_kind
            .entry(shape.kind.as_str().to_string())
            .or_insert(0) += 1;
    }

    StagingReport {
        source: doc.source.clone(),
        view_box_width: doc.view_box_width,
        view_box_height: doc.view_box_height,
        path_count: doc.paths.len(),
        shape_count: doc.shapes.len(),
        segment_count: doc.segment_count(),
        segments_by_type,
        shapes_by_kind,
        bounds: (!bbox.is_empty()).then_some(bbox),
    }
}

/// 线段的外包点：端点、控制点，闭合图形取外接矩形角点
fn segment_extent_points(segment: &NormalizedSegment) -> Vec<Point2> {
    match *segment {
        NormalizedSegment::Line { p0, p1 } => vec![p0, p1],
        NormalizedSegment::CubicBezier { p0, c1, c2, p1 } => vec![p0, c1, c2, p1],
        NormalizedSegment::Arc { start, end, .. } => vec![start, end],
        NormalizedSegment::Circle { center, radius } => vec![
            Point2::new(center.x - radius, center.y - radius),
            Point2::new(center.x + radius, center.y + radius),
        ],
        NormalizedSegment::Ellipse { center, rx, ry } => vec![
            Point2::new(center.x - rx, center.y - ry),
            Point2::new(center.x + rx, center.y + ry),
        ],
    }
}
