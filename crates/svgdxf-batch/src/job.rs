//! 转换任务
//!
//! 一个源文件 → 一个中间文件 → 一个 DXF 文件。
//!
//! 状态机：
//!
//! ```text
//! Pending → Extracting → Converting → Done
//!               │             │
//!               └──→ Failed ←─┘
//! ```
//!
//! `Done` 与 `Failed` 为终态，不可再迁移。

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use svgdxf_core::assemble::{Assembler, AssemblyOptions};
use svgdxf_core::convert::convert_staging;
use svgdxf_core::staging::StagingDocument;
use svgdxf_file::{extract_svg, save_dxf, save_staging, staging_path_for};
use thiserror::Error;

/// 失败所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Extraction,
    Conversion,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extraction => "extraction",
            Stage::Conversion => "conversion",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 任务状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Extracting,
    Converting,
    Done,
    Failed { stage: Stage, detail: String },
}

impl JobStatus {
    pub fn name(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Extracting => "extracting",
            JobStatus::Converting => "converting",
            JobStatus::Done => "done",
            JobStatus::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed { .. })
    }

    /// 是否允许迁移到 `next`
    pub fn can_transition_to(&self, next: &JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Extracting)
                | (JobStatus::Extracting, JobStatus::Converting)
                | (JobStatus::Extracting, JobStatus::Failed { stage: Stage::Extraction, .. })
                | (JobStatus::Converting, JobStatus::Done)
                | (JobStatus::Converting, JobStatus::Failed { stage: Stage::Conversion, .. })
        )
    }
}

/// 任务错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("{stage} failed: {detail}")]
    Failed { stage: Stage, detail: String },

    #[error("invalid job transition {from} -> {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
}

impl JobError {
    fn failed(stage: Stage, detail: impl Into<String>) -> Self {
        JobError::Failed {
            stage,
            detail: detail.into(),
        }
    }
}

/// 任务执行选项（所有工作线程共享只读副本）
#[derive(Debug, Clone, PartialEq)]
pub struct JobOptions {
    /// 中间文件目录
    pub temp_dir: PathBuf,
    /// 成功后保留中间文件
    pub keep_staging_files: bool,
    /// 任一路径出错即整个文件失败；关闭时丢弃出错路径并继续
    pub fail_on_path_errors: bool,
    pub assembly: AssemblyOptions,
}

impl JobOptions {
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
            keep_staging_files: false,
            fail_on_path_errors: true,
            assembly: AssemblyOptions::default(),
        }
    }
}

/// 转换结果统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertedFile {
    /// 输出文件字节数
    pub bytes: u64,
    pub entity_count: usize,
    /// 宽松模式下被丢弃的元素数
    pub dropped_elements: usize,
}

/// 任务完成报告（工作线程 → 调度器）
#[derive(Debug, Clone)]
pub struct JobReport {
    /// 处于终态的任务
    pub job: ConversionJob,
    pub duration: Duration,
    pub output: ConvertedFile,
}

impl JobReport {
    pub fn succeeded(&self) -> bool {
        self.job.status == JobStatus::Done
    }
}

/// 转换任务
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub source: PathBuf,
    /// 提取阶段写出的中间文件
    pub staging: Option<PathBuf>,
    pub dest: PathBuf,
    pub status: JobStatus,
}

impl ConversionJob {
    pub fn new(source: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            staging: None,
            dest: dest.into(),
            status: JobStatus::Pending,
        }
    }

    /// 源文件名（用于日志）
    pub fn file_name(&self) -> String {
        self.source
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.display().to_string())
    }

    /// 状态迁移，非法迁移返回错误且状态不变
    pub fn transition(&mut self, next: JobStatus) -> Result<(), JobError> {
        if !self.status.can_transition_to(&next) {
            return Err(JobError::InvalidTransition {
                from: self.status.name(),
                to: next.name(),
            });
        }
        self.status = next;
        Ok(())
    }

    /// 执行任务直到终态
    pub fn execute(mut self, options: &JobOptions) -> JobReport {
        let started = Instant::now();
        let output = match self.run(options) {
            Ok(output) => output,
            Err(JobError::Failed { stage, detail }) => {
                self.status = JobStatus::Failed { stage, detail };
                ConvertedFile::default()
            }
            Err(err @ JobError::InvalidTransition { .. }) => {
                self.status = JobStatus::Failed {
                    stage: Stage::Extraction,
                    detail: err.to_string(),
                };
                ConvertedFile::default()
            }
        };

        JobReport {
            job: self,
            duration: started.elapsed(),
            output,
        }
    }

    fn run(&mut self, options: &JobOptions) -> Result<ConvertedFile, JobError> {
        self.transition(JobStatus::Extracting)?;
        let (staging, dropped_paths) = guarded(Stage::Extraction, || self.extract(options))?;

        self.transition(JobStatus::Converting)?;
        let dest = &self.dest;
        let mut output = guarded(Stage::Conversion, || {
            convert_document(&staging, dest, options)
        })?;
        output.dropped_elements += dropped_paths;

        if !options.keep_staging_files {
            if let Some(path) = self.staging.take() {
                if let Err(err) = std::fs::remove_file(&path) {
                    tracing::warn!("failed to remove staging file {}: {err}", path.display());
                }
            }
        }

        self.transition(JobStatus::Done)?;
        Ok(output)
    }

    /// 提取阶段：解析 SVG 并写出中间文件
    fn extract(&mut self, options: &JobOptions) -> Result<(StagingDocument, usize), JobError> {
        let extraction = extract_svg(&self.source)
            .map_err(|e| JobError::failed(Stage::Extraction, e.to_string()))?;

        if !extraction.failures.is_empty() {
            if options.fail_on_path_errors {
                return Err(JobError::failed(
                    Stage::Extraction,
                    summarize_failures(&extraction.failures),
                ));
            }
            for failure in &extraction.failures {
                tracing::warn!("{}: dropping {failure}", self.file_name());
            }
        }

        let staging_path = staging_path_for(&self.source, &options.temp_dir);
        save_staging(&extraction.document, &staging_path)
            .map_err(|e| JobError::failed(Stage::Extraction, e.to_string()))?;
        self.staging = Some(staging_path);

        Ok((extraction.document, extraction.failures.len()))
    }
}

/// 转换阶段：中间文档 → DXF 文件
///
/// 单独公开以便直接转换已保存的中间文件。
pub fn convert_document(
    staging: &StagingDocument,
    dest: &Path,
    options: &JobOptions,
) -> Result<ConvertedFile, JobError> {
    let output = convert_staging(staging);

    if !output.failures.is_empty() {
        if options.fail_on_path_errors {
            return Err(JobError::failed(
                Stage::Conversion,
                summarize_failures(&output.failures),
            ));
        }
        for failure in &output.failures {
            tracing::warn!("dropping {failure}");
        }
    }

    let document = Assembler::new(options.assembly)
        .assemble(&output.groups, staging.view_box_width, staging.view_box_height)
        .map_err(|e| JobError::failed(Stage::Conversion, e.to_string()))?;

    let bytes = save_dxf(&document, dest)
        .map_err(|e| JobError::failed(Stage::Conversion, e.to_string()))?;

    Ok(ConvertedFile {
        bytes,
        entity_count: document.len(),
        dropped_elements: output.failures.len(),
    })
}

/// 单文件转换
pub fn convert_file(source: &Path, dest: &Path, options: &JobOptions) -> JobReport {
    ConversionJob::new(source, dest).execute(options)
}

/// 执行一个阶段；阶段内的 panic 转为该阶段的失败，不影响工作线程
fn guarded<T>(stage: Stage, f: impl FnOnce() -> Result<T, JobError>) -> Result<T, JobError> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        Err(JobError::failed(
            stage,
            format!("panicked: {}", panic_message(payload.as_ref())),
        ))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

/// 多个元素错误合并为一条信息
fn summarize_failures<T: fmt::Display>(failures: &[T]) -> String {
    let details: Vec<String> = failures.iter().map(ToString::to_string).collect();
    format!("{} element(s) failed: {}", failures.len(), details.join("; "))
}
