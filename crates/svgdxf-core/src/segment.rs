//! 规范化线段：解析与规范化之后的中间表示
//!
//! 所有坐标均为绝对坐标，处于源坐标系（y 轴向下）。
//! 该类型直接序列化进中间文件（staging），因此字段名是文件格式的一部分。

use crate::math::{is_finite_point, Point2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum NormalizedSegment {
    Line {
        p0: Point2,
        p1: Point2,
    },
    CubicBezier {
        p0: Point2,
        c1: Point2,
        c2: Point2,
        p1: Point2,
    },
    Arc {
        start: Point2,
        end: Point2,
        rx: f64,
        ry: f64,
        /// x 轴旋转角（度）
        rotation: f64,
        large_arc: bool,
        sweep: bool,
    },
    /// 整圆（圆心与半径精确保留）
    Circle {
        center: Point2,
        radius: f64,
    },
    /// 轴对齐整椭圆
    Ellipse {
        center: Point2,
        rx: f64,
        ry: f64,
    },
}

impl NormalizedSegment {
    /// 类型名称
    pub fn type_name(&self) -> &'static str {
        match self {
            NormalizedSegment::Line { .. } => "line",
            NormalizedSegment::CubicBezier { .. } => "cubicBezier",
            NormalizedSegment::Arc { .. } => "arc",
            NormalizedSegment::Circle { .. } => "circle",
            NormalizedSegment::Ellipse { .. } => "ellipse",
        }
    }

    /// 起点（闭合图形没有起点）
    pub fn start_point(&self) -> Option<Point2> {
        match self {
            NormalizedSegment::Line { p0, .. } | NormalizedSegment::CubicBezier { p0, .. } => {
                Some(*p0)
            }
            NormalizedSegment::Arc { start, .. } => Some(*start),
            NormalizedSegment::Circle { .. } | NormalizedSegment::Ellipse { .. } => None,
        }
    }

    /// 终点（闭合图形没有终点）
    pub fn end_point(&self) -> Option<Point2> {
        match self {
            NormalizedSegment::Line { p1, .. } | NormalizedSegment::CubicBezier { p1, .. } => {
                Some(*p1)
            }
            NormalizedSegment::Arc { end, .. } => Some(*end),
            NormalizedSegment::Circle { .. } | NormalizedSegment::Ellipse { .. } => None,
        }
    }

    /// 所有坐标与数值参数是否为有限值
    pub fn is_finite(&self) -> bool {
        match self {
            NormalizedSegment::Line { p0, p1 } => is_finite_point(p0) && is_finite_point(p1),
            NormalizedSegment::CubicBezier { p0, c1, c2, p1 } => {
                [p0, c1, c2, p1].into_iter().all(is_finite_point)
            }
            NormalizedSegment::Arc {
                start,
                end,
                rx,
                ry,
                rotation,
                ..
            } => {
                is_finite_point(start)
                    && is_finite_point(end)
                    && rx.is_finite()
                    && ry.is_finite()
                    && rotation.is_finite()
            }
            NormalizedSegment::Circle { center, radius } => {
                is_finite_point(center) && radius.is_finite()
            }
            NormalizedSegment::Ellipse { center, rx, ry } => {
                is_finite_point(center) && rx.is_finite() && ry.is_finite()
            }
        }
    }
}
