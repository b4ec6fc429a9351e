//! 线段 → CAD 实体转换
//!
//! 每条路径/图形独立转换：几何错误只中止所属元素，不影响同一文件中的其他元素。

use crate::arc::{convert_arc, EndpointArc};
use crate::error::{GeometryError, GeometryErrorKind};
use crate::geometry::{CadEntity, Circle, Ellipse, Line, Spline};
use crate::segment::NormalizedSegment;
use crate::staging::StagingDocument;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 元素引用（在中间文件中的位置）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementRef {
    Path(usize),
    Shape(usize),
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementRef::Path(i) => write!(f, "path #{i}"),
            ElementRef::Shape(i) => write!(f, "shape #{i}"),
        }
    }
}

/// 一个元素转换出的实体组
#[derive(Debug, Clone, PartialEq)]
pub struct EntityGroup {
    pub source: ElementRef,
    pub entities: Vec<CadEntity>,
}

/// 单个元素的转换失败
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{element}: {error}")]
pub struct ConversionFailure {
    pub element: ElementRef,
    pub error: GeometryError,
}

/// 整个中间文件的转换结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionOutput {
    /// 按发现顺序排列（先路径，后图形）
    pub groups: Vec<EntityGroup>,
    pub failures: Vec<ConversionFailure>,
}

impl ConversionOutput {
    pub fn entity_count(&self) -> usize {
        self.groups.iter().map(|g| g.entities.len()).sum()
    }
}

/// 转换单个线段；退化线段（零长度弧、零半径圆）返回 `None`
///
/// 实体坐标仍在源坐标系，角度已是目标坐标系的值。
pub fn convert_segment(segment: &NormalizedSegment) -> Result<Option<CadEntity>, GeometryErrorKind> {
    if !segment.is_finite() {
        return Err(GeometryErrorKind::NonFinite);
    }

    match *segment {
        NormalizedSegment::Line { p0, p1 } => Ok(Some(CadEntity::Line(Line::new(p0, p1)))),
        NormalizedSegment::CubicBezier { p0, c1, c2, p1 } => {
            Ok(Some(CadEntity::Spline(Spline::cubic(p0, c1, c2, p1))))
        }
        NormalizedSegment::Arc {
            start,
            end,
            rx,
            ry,
            rotation,
            large_arc,
            sweep,
        } => convert_arc(&EndpointArc {
            start,
            end,
            rx,
            ry,
            rotation,
            large_arc,
            sweep,
        }),
        NormalizedSegment::Circle { center, radius } => {
            if radius < 0.0 {
                return Err(GeometryErrorKind::NegativeRadius(radius));
            }
            if radius == 0.0 {
                return Ok(None);
            }
            Ok(Some(CadEntity::Circle(Circle::new(center, radius))))
        }
        NormalizedSegment::Ellipse { center, rx, ry } => {
            if rx < 0.0 || ry < 0.0 {
                return Err(GeometryErrorKind::NegativeRadius(rx.min(ry)));
            }
            if rx == 0.0 || ry == 0.0 {
                return Ok(None);
            }
            if rx == ry {
                return Ok(Some(CadEntity::Circle(Circle::new(center, rx))));
            }
            Ok(Some(CadEntity::Ellipse(Ellipse::axis_aligned(center, rx, ry))))
        }
    }
}

/// 转换一条路径的全部线段；任一线段失败则整条路径失败，错误携带线段序号
pub fn convert_segments(segments: &[NormalizedSegment]) -> Result<Vec<CadEntity>, GeometryError> {
    let mut entities = Vec::with_capacity(segments.len());
    for (index, segment) in segments.iter().enumerate() {
        let entity = convert_segment(segment).map_err(|kind| GeometryError::new(kind).at(index))?;
        entities.extend(entity);
    }
    Ok(entities)
}

/// 转换整个中间文件
pub fn convert_staging(doc: &StagingDocument) -> ConversionOutput {
    let mut output = ConversionOutput::default();

    let paths = doc
        .paths
        .iter()
        .enumerate()
        .map(|(i, p)| (ElementRef::Path(i), p.segments.as_slice()));
    let shapes = doc
        .shapes
        .iter()
        .enumerate()
        .map(|(i, s)| (ElementRef::Shape(i), s.segments.as_slice()));

    for (element, segments) in paths.chain(shapes) {
        match convert_segments(segments) {
            Ok(entities) => output.groups.push(EntityGroup {
                source: element,
                entities,
            }),
            Err(error) => {
                tracing::debug!("{element} failed to convert: {error}");
                output.failures.push(ConversionFailure { element, error });
            }
        }
    }

    output
}
