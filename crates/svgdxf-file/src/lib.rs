//! svgdxf 文件格式处理
//!
//! 支持：
//! - `.svg` 读取（路径与基本图形）
//! - `_vectors.json` 中间文件读写
//! - `.dxf` 导出（R2010）

pub mod dxf_io;
pub mod error;
pub mod staging;
pub mod svg;

pub use dxf_io::{build_drawing, load_dxf, save_dxf, write_dxf, TARGET_VERSION};
pub use error::FileError;
pub use staging::{load_staging, save_staging, staging_path_for, STAGING_SUFFIX};
pub use svg::{extract_svg, extract_svg_str, PathFailure, SvgExtraction};
