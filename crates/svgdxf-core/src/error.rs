//! 几何转换错误类型

use thiserror::Error;

/// 几何错误类别
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GeometryErrorKind {
    #[error("negative radius {0}")]
    NegativeRadius(f64),

    #[error("non-finite coordinate")]
    NonFinite,
}

/// 几何错误：只中止所属路径的转换
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("segment {segment_index}: {kind}")]
pub struct GeometryError {
    /// 出错线段在所属路径中的序号
    pub segment_index: usize,
    pub kind: GeometryErrorKind,
}

impl GeometryError {
    pub fn new(kind: GeometryErrorKind) -> Self {
        Self {
            segment_index: 0,
            kind,
        }
    }

    pub fn at(mut self, segment_index: usize) -> Self {
        self.segment_index = segment_index;
        self
    }
}

/// 装配错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssemblyError {
    #[error("drawing height is unknown; cannot flip the y axis")]
    MissingExtent,

    #[error("drawing height must be finite, got {0}")]
    InvalidExtent(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_error_message_carries_index() {
        let err = GeometryError::new(GeometryErrorKind::NegativeRadius(-2.0)).at(3);
        assert_eq!(err.to_string(), "segment 3: negative radius -2");
    }
}
