//! svgdxf 几何转换引擎
//!
//! 将 SVG 路径与基本图形转换为 CAD 实体。
//!
//! # 数据流
//!
//! ```text
//! 路径字符串 → PathParser → PathCommand
//!           → normalize  → NormalizedSegment（可写入中间文件）
//!           → convert    → CadEntity（圆弧重参数化、贝塞尔 → 样条）
//!           → Assembler  → Document（分层、y 轴翻转）
//! ```
//!
//! # 示例
//!
//! ```rust
//! use svgdxf_core::prelude::*;
//!
//! let commands = PathParser::parse("M0 0 A50 50 0 0 1 100 0", Point2::origin()).unwrap();
//! let mut staging = StagingDocument::new(Some(100.0), Some(100.0));
//! staging.paths.push(StagedPath::from_commands(&commands, Style::default()));
//!
//! let output = convert_staging(&staging);
//! let doc = Assembler::default()
//!     .assemble(&output.groups, staging.view_box_width, staging.view_box_height)
//!     .unwrap();
//! assert_eq!(doc.len(), 1);
//! ```

pub mod arc;
pub mod assemble;
pub mod convert;
pub mod document;
pub mod error;
pub mod geometry;
pub mod math;
pub mod normalize;
pub mod path;
pub mod report;
pub mod segment;
pub mod shape;
pub mod staging;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::arc::{convert_arc, endpoint_to_center, CenterArc, EndpointArc, ELLIPSE_ARC_SAMPLES};
    pub use crate::assemble::{Assembler, AssemblyOptions};
    pub use crate::convert::{convert_staging, ConversionFailure, ConversionOutput, ElementRef, EntityGroup};
    pub use crate::document::{Document, Layer, PlacedEntity};
    pub use crate::error::{AssemblyError, GeometryError, GeometryErrorKind};
    pub use crate::geometry::{Arc, CadEntity, Circle, Ellipse, Line, Polyline, Spline};
    pub use crate::math::{BoundingBox2, Point2, Vector2};
    pub use crate::path::{ParseError, ParseErrorKind, PathCommand, PathParser};
    pub use crate::segment::NormalizedSegment;
    pub use crate::shape::{Shape, ShapeKind, ShapePrimitive, Style};
    pub use crate::staging::{StagedPath, StagedShape, StagingDocument};
}
