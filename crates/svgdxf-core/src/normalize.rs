//! 几何规范化
//!
//! 将路径指令和图形图元展开为扁平的 [`NormalizedSegment`] 序列：
//! - 二次贝塞尔升阶为三次
//! - `ClosePath` 补一条回到子路径起点的直线
//! - 图形用最少的线段精确表示（矩形 → 4 条直线，圆 → 整圆）

use crate::math::{points_coincide, Point2};
use crate::path::PathCommand;
use crate::segment::NormalizedSegment;
use crate::shape::ShapePrimitive;

/// 二次贝塞尔升阶：返回等价三次曲线的两个控制点
///
/// `c1 = p0 + 2/3 (c - p0)`，`c2 = p1 + 2/3 (c - p1)`
pub fn elevate_quadratic(p0: Point2, c: Point2, p1: Point2) -> (Point2, Point2) {
    let c1 = p0 + (c - p0) * (2.0 / 3.0);
    let c2 = p1 + (c - p1) * (2.0 / 3.0);
    (c1, c2)
}

/// 规范化一条路径的指令序列
pub fn normalize_commands(commands: &[PathCommand]) -> Vec<NormalizedSegment> {
    let mut segments = Vec::with_capacity(commands.len());
    let mut cursor = Point2::origin();
    let mut subpath_start = cursor;

    for command in commands {
        match *command {
            PathCommand::MoveTo(p) => {
                cursor = p;
                subpath_start = p;
            }
            PathCommand::LineTo(p) => {
                segments.push(NormalizedSegment::Line { p0: cursor, p1: p });
                cursor = p;
            }
            PathCommand::CubicTo { c1, c2, end } => {
                segments.push(NormalizedSegment::CubicBezier {
                    p0: cursor,
                    c1,
                    c2,
                    p1: end,
                });
                cursor = end;
            }
            PathCommand::QuadTo { c, end } => {
                let (c1, c2) = elevate_quadratic(cursor, c, end);
                segments.push(NormalizedSegment::CubicBezier {
                    p0: cursor,
                    c1,
                    c2,
                    p1: end,
                });
                cursor = end;
            }
            PathCommand::ArcTo {
                rx,
                ry,
                rotation,
                large_arc,
                sweep,
                end,
            } => {
                segments.push(NormalizedSegment::Arc {
                    start: cursor,
                    end,
                    rx,
                    ry,
                    rotation,
                    large_arc,
                    sweep,
                });
                cursor = end;
            }
            PathCommand::ClosePath => {
                if !points_coincide(&cursor, &subpath_start) {
                    segments.push(NormalizedSegment::Line {
                        p0: cursor,
                        p1: subpath_start,
                    });
                }
                cursor = subpath_start;
            }
        }
    }

    segments
}

/// 规范化一个图形图元
pub fn normalize_shape(shape: &ShapePrimitive) -> Vec<NormalizedSegment> {
    match shape {
        ShapePrimitive::Rect {
            origin,
            width,
            height,
            rx,
            ry,
        } => normalize_rect(*origin, *width, *height, *rx, *ry),
        ShapePrimitive::Circle { center, radius } => vec![NormalizedSegment::Circle {
            center: *center,
            radius: *radius,
        }],
        ShapePrimitive::Ellipse { center, rx, ry } => vec![NormalizedSegment::Ellipse {
            center: *center,
            rx: *rx,
            ry: *ry,
        }],
        ShapePrimitive::Line { start, end } => vec![NormalizedSegment::Line {
            p0: *start,
            p1: *end,
        }],
        ShapePrimitive::Polyline { points, closed } => normalize_polyline(points, *closed),
    }
}

fn normalize_polyline(points: &[Point2], closed: bool) -> Vec<NormalizedSegment> {
    let mut segments: Vec<NormalizedSegment> = points
        .windows(2)
        .map(|w| NormalizedSegment::Line { p0: w[0], p1: w[1] })
        .collect();

    if closed && points.len() > 2 {
        let (first, last) = (points[0], points[points.len() - 1]);
        if !points_coincide(&first, &last) {
            segments.push(NormalizedSegment::Line { p0: last, p1: first });
        }
    }
    segments
}

/// 矩形：宽或高不为正时不绘制；有圆角时为 4 条直线 + 4 段四分之一弧
fn normalize_rect(origin: Point2, width: f64, height: f64, rx: f64, ry: f64) -> Vec<NormalizedSegment> {
    if !(width > 0.0 && height > 0.0) {
        return Vec::new();
    }

    // 只给出一个圆角半径时另一个取相同值，并限制在边长一半以内
    let (rx, ry) = match (rx > 0.0, ry > 0.0) {
        (false, false) => (0.0, 0.0),
        (true, false) => (rx, rx),
        (false, true) => (ry, ry),
        (true, true) => (rx, ry),
    };
    let rx = rx.min(width / 2.0);
    let ry = ry.min(height / 2.0);

    let (x, y) = (origin.x, origin.y);
    let (x1, y1) = (x + width, y + height);

    if rx == 0.0 || ry == 0.0 {
        let corners = [
            Point2::new(x, y),
            Point2::new(x1, y),
            Point2::new(x1, y1),
            Point2::new(x, y1),
        ];
        return (0..4)
            .map(|i| NormalizedSegment::Line {
                p0: corners[i],
                p1: corners[(i + 1) % 4],
            })
            .collect();
    }

    // 顺时针（源坐标系中 sweep = 1）绕行
    let corner_arc = |start: Point2, end: Point2| NormalizedSegment::Arc {
        start,
        end,
        rx,
        ry,
        rotation: 0.0,
        large_arc: false,
        sweep: true,
    };
    let edges = [
        (Point2::new(x + rx, y), Point2::new(x1 - rx, y)),
        (Point2::new(x1, y + ry), Point2::new(x1, y1 - ry)),
        (Point2::new(x1 - rx, y1), Point2::new(x + rx, y1)),
        (Point2::new(x, y1 - ry), Point2::new(x, y + ry)),
    ];

    let mut segments = Vec::with_capacity(8);
    for (i, (start, end)) in edges.iter().enumerate() {
        if !points_coincide(start, end) {
            segments.push(NormalizedSegment::Line { p0: *start, p1: *end });
        }
        let next_start = edges[(i + 1) % 4].0;
        segments.push(corner_arc(*end, next_start));
    }
    segments
}
