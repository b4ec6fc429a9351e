//! 椭圆弧重参数化
//!
//! 端点参数化（两个端点、半径、x 轴旋转、大弧标志、扫掠标志）
//! 转换为中心参数化（圆心、半径、起始角、扫过角）。
//!
//! 计算在源坐标系（y 轴向下）中进行；输出给 CAD 时所有角度取反，
//! 并按扫掠方向交换起止角，使圆弧在目标坐标系（y 轴向上）中逆时针绘制。

use crate::error::GeometryErrorKind;
use crate::geometry::{Arc, CadEntity, Line, Polyline};
use crate::math::{is_finite_point, normalize_degrees, points_coincide, rotate, Point2, Vector2};
use std::f64::consts::{PI, TAU};

/// 非圆椭圆弧的采样段数（顶点数为段数 + 1）
pub const ELLIPSE_ARC_SAMPLES: usize = 20;

/// 判定 `rx == ry` 的相对容差
const CIRCULAR_TOLERANCE: f64 = 1e-9;

/// 端点参数化的椭圆弧
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EndpointArc {
    pub start: Point2,
    pub end: Point2,
    pub rx: f64,
    pub ry: f64,
    /// x 轴旋转角（度）
    pub rotation: f64,
    pub large_arc: bool,
    pub sweep: bool,
}

/// 中心参数化的椭圆弧（源坐标系，弧度）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenterArc {
    pub center: Point2,
    /// 修正后的半径
    pub rx: f64,
    pub ry: f64,
    /// x 轴旋转角（弧度）
    pub rotation: f64,
    /// 起始参数角
    pub start_angle: f64,
    /// 扫过的参数角，(-2π, 2π)，正值表示参数角递增
    pub sweep_angle: f64,
}

/// 端点参数化的转换结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArcConversion {
    /// 起止点重合，不输出任何实体
    Empty,
    /// 某个半径为零，退化为直线
    Line(Point2, Point2),
    Center(CenterArc),
}

impl CenterArc {
    /// 参数角 `t` 处的点
    pub fn point_at(&self, t: f64) -> Point2 {
        let local = Vector2::new(self.rx * t.cos(), self.ry * t.sin());
        self.center + rotate(local, self.rotation)
    }

    pub fn start_point(&self) -> Point2 {
        self.point_at(self.start_angle)
    }

    pub fn end_point(&self) -> Point2 {
        self.point_at(self.start_angle + self.sweep_angle)
    }

    /// 是否为圆弧（两半径在相对容差内相等）
    pub fn is_circular(&self) -> bool {
        let scale = self.rx.abs().max(self.ry.abs());
        (self.rx - self.ry).abs() <= CIRCULAR_TOLERANCE * scale
    }

    /// 逆变换回端点参数化
    pub fn to_endpoint(&self) -> EndpointArc {
        EndpointArc {
            start: self.start_point(),
            end: self.end_point(),
            rx: self.rx,
            ry: self.ry,
            rotation: self.rotation.to_degrees(),
            large_arc: self.sweep_angle.abs() > PI,
            sweep: self.sweep_angle > 0.0,
        }
    }

    /// 沿参数角均匀采样 `segments + 1` 个点
    pub fn sample(&self, segments: usize) -> Vec<Point2> {
        let segments = segments.max(1);
        (0..=segments)
            .map(|i| {
                let t = self.start_angle + self.sweep_angle * i as f64 / segments as f64;
                self.point_at(t)
            })
            .collect()
    }

    /// 目标坐标系下的起止角（度，逆时针，[0, 360)）
    ///
    /// 源坐标系角度加上旋转角后取反；参数角递增的弧翻转后变为顺时针，
    /// 因此交换起止角。
    pub fn target_angles(&self) -> (f64, f64) {
        let alpha1 = (self.start_angle + self.rotation).to_degrees();
        let alpha2 = (self.start_angle + self.sweep_angle + self.rotation).to_degrees();
        let (start, end) = if self.sweep_angle > 0.0 {
            (-alpha2, -alpha1)
        } else {
            (-alpha1, -alpha2)
        };
        (normalize_degrees(start), normalize_degrees(end))
    }
}

/// 端点参数化 → 中心参数化
///
/// 按 SVG 实现说明 F.6.5 计算；半径不足以连接两端点时等比放大。
pub fn endpoint_to_center(arc: &EndpointArc) -> Result<ArcConversion, GeometryErrorKind> {
    if !is_finite_point(&arc.start)
        || !is_finite_point(&arc.end)
        || !arc.rx.is_finite()
        || !arc.ry.is_finite()
        || !arc.rotation.is_finite()
    {
        return Err(GeometryErrorKind::NonFinite);
    }
    if arc.rx < 0.0 || arc.ry < 0.0 {
        return Err(GeometryErrorKind::NegativeRadius(arc.rx.min(arc.ry)));
    }
    if points_coincide(&arc.start, &arc.end) {
        return Ok(ArcConversion::Empty);
    }
    if arc.rx == 0.0 || arc.ry == 0.0 {
        return Ok(ArcConversion::Line(arc.start, arc.end));
    }

    let phi = arc.rotation.to_radians();
    let (sin_phi, cos_phi) = phi.sin_cos();

    // 旋转到椭圆自身坐标系
    let dx2 = (arc.start.x - arc.end.x) / 2.0;
    let dy2 = (arc.start.y - arc.end.y) / 2.0;
    let x1p = cos_phi * dx2 + sin_phi * dy2;
    let y1p = -sin_phi * dx2 + cos_phi * dy2;

    // 半径修正必须在求圆心之前
    let (mut rx, mut ry) = (arc.rx, arc.ry);
    let lambda = (x1p * x1p) / (rx * rx) + (y1p * y1p) / (ry * ry);
    if lambda > 1.0 {
        let scale = lambda.sqrt();
        rx *= scale;
        ry *= scale;
    }

    let rx2 = rx * rx;
    let ry2 = ry * ry;
    let numerator = rx2 * ry2 - rx2 * y1p * y1p - ry2 * x1p * x1p;
    let denominator = rx2 * y1p * y1p + ry2 * x1p * x1p;
    let radicand = (numerator / denominator).max(0.0);

    let sign = match (arc.large_arc, arc.sweep) {
        (false, false) | (true, true) => -1.0,
        (false, true) | (true, false) => 1.0,
    };
    let coef = sign * radicand.sqrt();
    let cxp = coef * rx * y1p / ry;
    let cyp = -coef * ry * x1p / rx;

    let center = Point2::new(
        cos_phi * cxp - sin_phi * cyp + (arc.start.x + arc.end.x) / 2.0,
        sin_phi * cxp + cos_phi * cyp + (arc.start.y + arc.end.y) / 2.0,
    );

    let start_angle = ((y1p - cyp) / ry).atan2((x1p - cxp) / rx);
    let end_angle = ((-y1p - cyp) / ry).atan2((-x1p - cxp) / rx);
    let mut sweep_angle = end_angle - start_angle;
    if !arc.sweep && sweep_angle > 0.0 {
        sweep_angle -= TAU;
    } else if arc.sweep && sweep_angle < 0.0 {
        sweep_angle += TAU;
    }

    Ok(ArcConversion::Center(CenterArc {
        center,
        rx,
        ry,
        rotation: phi,
        start_angle,
        sweep_angle,
    }))
}

/// 将端点参数化的弧转换为 CAD 实体
///
/// 圆弧输出精确的 [`Arc`]；非圆椭圆弧输出 [`ELLIPSE_ARC_SAMPLES`] 段的多段线，
/// 首尾顶点与原端点严格一致。实体坐标仍在源坐标系，角度已是目标坐标系的值。
pub fn convert_arc(arc: &EndpointArc) -> Result<Option<CadEntity>, GeometryErrorKind> {
    let center_arc = match endpoint_to_center(arc)? {
        ArcConversion::Empty => return Ok(None),
        ArcConversion::Line(p0, p1) => return Ok(Some(CadEntity::Line(Line::new(p0, p1)))),
        ArcConversion::Center(center_arc) => center_arc,
    };

    if center_arc.is_circular() {
        let (start, end) = center_arc.target_angles();
        return Ok(Some(CadEntity::Arc(Arc::new(
            center_arc.center,
            center_arc.rx,
            start,
            end,
        ))));
    }

    let mut points = center_arc.sample(ELLIPSE_ARC_SAMPLES);
    if let Some(first) = points.first_mut() {
        *first = arc.start;
    }
    if let Some(last) = points.last_mut() {
        *last = arc.end;
    }
    Ok(Some(CadEntity::Polyline(Polyline::new(points, false))))
}
