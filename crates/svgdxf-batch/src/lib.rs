//! svgdxf 批量转换
//!
//! - [`job`]：单文件转换任务及其状态机
//! - [`orchestrator`]：工作线程池调度、断点续转与取消
//! - [`error_log`]：失败任务汇总日志
//! - [`settings`]：TOML 运行配置

pub mod error_log;
pub mod job;
pub mod orchestrator;
pub mod settings;

pub use error_log::{ErrorEntry, ErrorLog, ERROR_LOG_FILE};
pub use job::{
    convert_document, convert_file, ConversionJob, ConvertedFile, JobError, JobOptions, JobReport,
    JobStatus, Stage,
};
pub use orchestrator::{
    enumerate_sources, output_path_for, BatchConfig, BatchError, BatchRun, CancelHandle,
    Orchestrator, RunSummary,
};
pub use settings::{Settings, SettingsError};
