//! 数学基础类型
//!
//! 基于 nalgebra 的二维点/向量别名，以及包围盒。

use serde::{Deserialize, Serialize};

pub type Point2 = nalgebra::Point2<f64>;
pub type Vector2 = nalgebra::Vector2<f64>;

/// 全局几何容差
pub const EPSILON: f64 = 1e-10;

/// 两点是否重合（考虑容差）
pub fn points_coincide(a: &Point2, b: &Point2) -> bool {
    (a - b).norm() <= EPSILON
}

/// 点的两个分量是否都是有限值
pub fn is_finite_point(p: &Point2) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

/// 将向量绕原点旋转 `angle` 弧度
pub fn rotate(v: Vector2, angle: f64) -> Vector2 {
    let (sin, cos) = angle.sin_cos();
    Vector2::new(cos * v.x - sin * v.y, sin * v.x + cos * v.y)
}

/// 将角度（度）归一化到 [0, 360)
pub fn normalize_degrees(angle: f64) -> f64 {
    let a = angle.rem_euclid(360.0);
    // -0.0 原样返回；极小负数可能得到 360.0
    if a == 0.0 || a >= 360.0 {
        0.0
    } else {
        a
    }
}

/// 轴对齐包围盒
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox2 {
    pub min: Point2,
    pub max: Point2,
}

impl BoundingBox2 {
    pub fn new(min: Point2, max: Point2) -> Self {
        Self { min, max }
    }

    /// 空包围盒（min > max），扩展任意点后变为有效
    pub fn empty() -> Self {
        Self {
            min: Point2::new(f64::INFINITY, f64::INFINITY),
            max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = Point2>) -> Self {
        let mut bbox = Self::empty();
        for p in points {
            bbox.expand_to_include(&p);
        }
        bbox
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    pub fn expand_to_include(&mut self, p: &Point2) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    pub fn merge(&mut self, other: &BoundingBox2) {
        if other.is_empty() {
            return;
        }
        self.expand_to_include(&other.min);
        self.expand_to_include(&other.max);
    }

    pub fn width(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.max.x - self.min.x
        }
    }

    pub fn height(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.max.y - self.min.y
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_from_points() {
        let bbox = BoundingBox2::from_points([
            Point2::new(1.0, 5.0),
            Point2::new(-2.0, 3.0),
            Point2::new(4.0, -1.0),
        ]);
        assert_eq!(bbox.min, Point2::new(-2.0, -1.0));
        assert_eq!(bbox.max, Point2::new(4.0, 5.0));
        assert!((bbox.width() - 6.0).abs() < EPSILON);
    }

    #[test]
    fn test_empty_bounding_box() {
        let bbox = BoundingBox2::empty();
        assert!(bbox.is_empty());
        assert_eq!(bbox.height(), 0.0);
    }

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(normalize_degrees(-360.0), 0.0);
        assert!((normalize_degrees(725.0) - 5.0).abs() < EPSILON);
    }

    #[test]
    fn test_normalize_degrees_clears_negative_zero() {
        let a = normalize_degrees(-0.0);
        assert_eq!(a, 0.0);
        assert!(a.is_sign_positive());
        assert!(normalize_degrees(-1e-20).is_sign_positive());
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let v = rotate(Vector2::new(1.0, 0.0), std::f64::consts::FRAC_PI_2);
        assert!(v.x.abs() < EPSILON);
        assert!((v.y - 1.0).abs() < EPSILON);
    }
}
