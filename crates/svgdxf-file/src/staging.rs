//! 中间文件读写（JSON）
//!
//! 文件名约定为 `<stem>_vectors.json`。

use crate::error::FileError;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use svgdxf_core::staging::StagingDocument;

/// 中间文件名后缀
pub const STAGING_SUFFIX: &str = "_vectors.json";

/// 由源文件路径推导中间文件路径
pub fn staging_path_for(source: &Path, temp_dir: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    temp_dir.join(format!("{stem}{STAGING_SUFFIX}"))
}

/// 保存中间文件，返回写入的字节数
pub fn save_staging(doc: &StagingDocument, path: &Path) -> Result<u64, FileError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, doc)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    let size = std::fs::metadata(path)?.len();
    tracing::debug!(
        "Saved staging document with {} paths, {} shapes to {} ({} bytes)",
        doc.paths.len(),
        doc.shapes.len(),
        path.display(),
        size
    );
    Ok(size)
}

/// 加载中间文件
pub fn load_staging(path: &Path) -> Result<StagingDocument, FileError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let doc: StagingDocument = serde_json::from_reader(reader)?;

    tracing::debug!(
        "Loaded staging document with {} segments from {}",
        doc.segment_count(),
        path.display()
    );
    Ok(doc)
}
