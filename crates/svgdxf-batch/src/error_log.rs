//! 批量运行错误日志
//!
//! 每行一条：`文件名\t阶段\t详情`，详情中的换行与制表符被替换为空格。

use crate::job::Stage;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// 错误日志文件名（位于输出目录）
pub const ERROR_LOG_FILE: &str = "errors.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
    pub file: String,
    pub stage: Stage,
    pub detail: String,
}

impl ErrorEntry {
    fn line(&self) -> String {
        format!("{}\t{}\t{}", flatten(&self.file), self.stage, flatten(&self.detail))
    }
}

fn flatten(text: &str) -> String {
    text.chars()
        .map(|c| if matches!(c, '\n' | '\r' | '\t') { ' ' } else { c })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorLog {
    entries: Vec<ErrorEntry>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ErrorEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ErrorEntry] {
        &self.entries
    }

    /// 按文件名排序，使日志与完成顺序无关
    pub fn sort(&mut self) {
        self.entries.sort_by(|a, b| a.file.cmp(&b.file));
    }

    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        for entry in &self.entries {
            writeln!(writer, "{}", entry.line())?;
        }
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_flattens_details() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ERROR_LOG_FILE);

        let mut log = ErrorLog::new();
        log.push(ErrorEntry {
            file: "b.svg".into(),
            stage: Stage::Conversion,
            detail: "missing drawing extent".into(),
        });
        log.push(ErrorEntry {
            file: "a.svg".into(),
            stage: Stage::Extraction,
            detail: "path #0: invalid number\n\tat offset 4".into(),
        });
        log.sort();
        log.write_to(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "a.svg\textraction\tpath #0: invalid number  at offset 4"
        );
        assert_eq!(lines[1], "b.svg\tconversion\tmissing drawing extent");
    }
}
