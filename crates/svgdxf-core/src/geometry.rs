//! CAD 实体定义
//!
//! 转换结果的实体类型：
//! - 线段 (Line)
//! - 多段线 (Polyline)
//! - 样条曲线 (Spline)
//! - 圆 (Circle)
//! - 椭圆 (Ellipse)
//! - 圆弧 (Arc)
//!
//! 角度一律以度为单位，按目标坐标系（y 轴向上）逆时针计量。

use crate::math::{normalize_degrees, BoundingBox2, Point2, Vector2};
use serde::{Deserialize, Serialize};

/// CAD 实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CadEntity {
    Line(Line),
    Polyline(Polyline),
    Spline(Spline),
    Circle(Circle),
    Ellipse(Ellipse),
    Arc(Arc),
}

impl CadEntity {
    /// 获取实体的包围盒
    pub fn bounding_box(&self) -> BoundingBox2 {
        match self {
            CadEntity::Line(l) => l.bounding_box(),
            CadEntity::Polyline(pl) => pl.bounding_box(),
            CadEntity::Spline(s) => s.bounding_box(),
            CadEntity::Circle(c) => c.bounding_box(),
            CadEntity::Ellipse(e) => e.bounding_box(),
            CadEntity::Arc(a) => a.bounding_box(),
        }
    }

    /// 获取实体的类型名称
    pub fn type_name(&self) -> &'static str {
        match self {
            CadEntity::Line(_) => "Line",
            CadEntity::Polyline(_) => "Polyline",
            CadEntity::Spline(_) => "Spline",
            CadEntity::Circle(_) => "Circle",
            CadEntity::Ellipse(_) => "Ellipse",
            CadEntity::Arc(_) => "Arc",
        }
    }

    /// 关于 `y = height / 2` 镜像：`y' = height - y`
    ///
    /// 角度已经是目标坐标系下的值，圆弧只移动圆心。
    pub fn flip_y(&self, height: f64) -> CadEntity {
        let flip = |p: &Point2| Point2::new(p.x, height - p.y);
        match self {
            CadEntity::Line(l) => CadEntity::Line(Line::new(flip(&l.start), flip(&l.end))),
            CadEntity::Polyline(pl) => CadEntity::Polyline(Polyline::new(
                pl.points.iter().map(flip).collect(),
                pl.closed,
            )),
            CadEntity::Spline(s) => CadEntity::Spline(Spline::new(
                s.control_points.iter().map(flip).collect(),
                s.degree,
            )),
            CadEntity::Circle(c) => CadEntity::Circle(Circle::new(flip(&c.center), c.radius)),
            CadEntity::Ellipse(e) => CadEntity::Ellipse(Ellipse::new(
                flip(&e.center),
                Vector2::new(e.major_axis.x, -e.major_axis.y),
                e.minor_ratio,
            )),
            CadEntity::Arc(a) => CadEntity::Arc(Arc::new(
                flip(&a.center),
                a.radius,
                a.start_angle,
                a.end_angle,
            )),
        }
    }
}

/// 线段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub start: Point2,
    pub end: Point2,
}

impl Line {
    pub fn new(start: Point2, end: Point2) -> Self {
        Self { start, end }
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        BoundingBox2::from_points([self.start, self.end])
    }
}

/// 多段线（仅直线连接）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    pub points: Vec<Point2>,
    /// 是否闭合
    pub closed: bool,
}

impl Polyline {
    pub fn new(points: Vec<Point2>, closed: bool) -> Self {
        Self { points, closed }
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        BoundingBox2::from_points(self.points.iter().copied())
    }
}

/// 样条曲线
///
/// 控制点按分段 Bézier 排列：三次时点数为 `3k + 1`，
/// 相邻两段共享一个控制点。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spline {
    pub control_points: Vec<Point2>,
    pub degree: u32,
}

impl Spline {
    pub fn new(control_points: Vec<Point2>, degree: u32) -> Self {
        Self {
            control_points,
            degree,
        }
    }

    /// 由一段三次贝塞尔曲线构造
    pub fn cubic(p0: Point2, c1: Point2, c2: Point2, p1: Point2) -> Self {
        Self::new(vec![p0, c1, c2, p1], 3)
    }

    /// Bézier 段数
    pub fn segment_count(&self) -> usize {
        let degree = self.degree.max(1) as usize;
        self.control_points.len().saturating_sub(1) / degree
    }

    pub fn start_point(&self) -> Option<Point2> {
        self.control_points.first().copied()
    }

    pub fn end_point(&self) -> Option<Point2> {
        self.control_points.last().copied()
    }

    /// 钳位分段 Bézier 节点向量
    ///
    /// 两端重复度 `degree + 1`，内部节点重复度 `degree`，
    /// 例如两段三次曲线为 `[0,0,0,0, 1,1,1, 2,2,2,2]`。
    pub fn knot_vector(&self) -> Vec<f64> {
        let degree = self.degree.max(1) as usize;
        let segments = self.segment_count();
        let mut knots = Vec::with_capacity(self.control_points.len() + degree + 1);
        knots.extend(std::iter::repeat(0.0).take(degree + 1));
        for joint in 1..segments {
            knots.extend(std::iter::repeat(joint as f64).take(degree));
        }
        knots.extend(std::iter::repeat(segments as f64).take(degree + 1));
        knots
    }

    /// 追加一条首尾相接的样条，控制点原样保留
    pub fn append(&mut self, other: &Spline) {
        self.control_points
            .extend(other.control_points.iter().skip(1).copied());
    }

    /// 控制多边形的包围盒（曲线位于其凸包内）
    pub fn bounding_box(&self) -> BoundingBox2 {
        BoundingBox2::from_points(self.control_points.iter().copied())
    }
}

/// 圆
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point2,
    pub radius: f64,
}

impl Circle {
    pub fn new(center: Point2, radius: f64) -> Self {
        Self { center, radius }
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        BoundingBox2::new(
            Point2::new(self.center.x - self.radius, self.center.y - self.radius),
            Point2::new(self.center.x + self.radius, self.center.y + self.radius),
        )
    }
}

/// 整椭圆
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    pub center: Point2,
    /// 长轴端点相对圆心的向量
    pub major_axis: Vector2,
    /// 短轴与长轴之比 (0, 1]
    pub minor_ratio: f64,
}

impl Ellipse {
    pub fn new(center: Point2, major_axis: Vector2, minor_ratio: f64) -> Self {
        Self {
            center,
            major_axis,
            minor_ratio,
        }
    }

    /// 由轴对齐半径构造，长轴取较大的一个
    pub fn axis_aligned(center: Point2, rx: f64, ry: f64) -> Self {
        if rx >= ry {
            Self::new(center, Vector2::new(rx, 0.0), ry / rx)
        } else {
            Self::new(center, Vector2::new(0.0, ry), rx / ry)
        }
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        let (ux, uy) = (self.major_axis.x, self.major_axis.y);
        let half_w = (ux * ux + (self.minor_ratio * uy).powi(2)).sqrt();
        let half_h = (uy * uy + (self.minor_ratio * ux).powi(2)).sqrt();
        BoundingBox2::new(
            Point2::new(self.center.x - half_w, self.center.y - half_h),
            Point2::new(self.center.x + half_w, self.center.y + half_h),
        )
    }
}

/// 圆弧：从 `start_angle` 逆时针到 `end_angle`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arc {
    pub center: Point2,
    pub radius: f64,
    /// 起始角度（度，[0, 360)）
    pub start_angle: f64,
    /// 终止角度（度，[0, 360)）
    pub end_angle: f64,
}

impl Arc {
    pub fn new(center: Point2, radius: f64, start_angle: f64, end_angle: f64) -> Self {
        Self {
            center,
            radius,
            start_angle,
            end_angle,
        }
    }

    /// 逆时针扫过的角度（度，(0, 360]）
    pub fn sweep_angle(&self) -> f64 {
        let sweep = normalize_degrees(self.end_angle - self.start_angle);
        if sweep == 0.0 {
            360.0
        } else {
            sweep
        }
    }

    /// 圆上指定角度（度）的点
    pub fn point_at_angle(&self, degrees: f64) -> Point2 {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Point2::new(
            self.center.x + self.radius * cos,
            self.center.y + self.radius * sin,
        )
    }

    pub fn start_point(&self) -> Point2 {
        self.point_at_angle(self.start_angle)
    }

    pub fn end_point(&self) -> Point2 {
        self.point_at_angle(self.end_angle)
    }

    /// 检查角度（度）是否落在弧上
    fn contains_angle(&self, degrees: f64) -> bool {
        normalize_degrees(degrees - self.start_angle) <= self.sweep_angle()
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        let mut bbox = BoundingBox2::from_points([self.start_point(), self.end_point()]);

        // 检查象限点
        for angle in [0.0, 90.0, 180.0, 270.0] {
            if self.contains_angle(angle) {
                bbox.expand_to_include(&self.point_at_angle(angle));
            }
        }

        bbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::EPSILON;

    #[test]
    fn test_spline_knot_vector() {
        let mut spline = Spline::cubic(
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(2.0, 1.0),
            Point2::new(3.0, 0.0),
        );
        assert_eq!(spline.knot_vector(), vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);

        spline.append(&Spline::cubic(
            Point2::new(3.0, 0.0),
            Point2::new(4.0, -1.0),
            Point2::new(5.0, -1.0),
            Point2::new(6.0, 0.0),
        ));
        assert_eq!(spline.control_points.len(), 7);
        assert_eq!(spline.segment_count(), 2);
        assert_eq!(
            spline.knot_vector(),
            vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0]
        );
        // 节点数 = 控制点数 + 阶数 + 1
        assert_eq!(spline.knot_vector().len(), 7 + 3 + 1);
    }

    #[test]
    fn test_arc_sweep_wraps_through_zero() {
        let arc = Arc::new(Point2::origin(), 1.0, 300.0, 60.0);
        assert!((arc.sweep_angle() - 120.0).abs() < EPSILON);
        let bbox = arc.bounding_box();
        // 经过 0° 象限点
        assert!((bbox.max.x - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_flip_moves_arc_center_only() {
        let arc = CadEntity::Arc(Arc::new(Point2::new(50.0, 100.0), 10.0, 30.0, 150.0));
        match arc.flip_y(600.0) {
            CadEntity::Arc(a) => {
                assert_eq!(a.center, Point2::new(50.0, 500.0));
                assert_eq!(a.start_angle, 30.0);
                assert_eq!(a.end_angle, 150.0);
            }
            other => panic!("expected arc, got {other:?}"),
        }
    }

    #[test]
    fn test_axis_aligned_ellipse_picks_major() {
        let e = Ellipse::axis_aligned(Point2::origin(), 5.0, 10.0);
        assert_eq!(e.major_axis, Vector2::new(0.0, 10.0));
        assert!((e.minor_ratio - 0.5).abs() < EPSILON);
        let bbox = e.bounding_box();
        assert!((bbox.width() - 10.0).abs() < EPSILON);
        assert!((bbox.height() - 20.0).abs() < EPSILON);
    }
}
