//! 批量转换调度
//!
//! 启动时一次性枚举输入目录，已有输出的文件直接跳过（断点续转）。
//! 固定数量的工作线程从零容量通道领取任务，完成后经结果通道回报；
//! 计数与错误日志只在调度线程中维护。
//!
//! 取消后不再派发新任务，已在执行的任务照常完成。

use crate::error_log::{ErrorEntry, ErrorLog, ERROR_LOG_FILE};
use crate::job::{ConversionJob, JobOptions, JobReport, JobStatus, Stage};
use chrono::{DateTime, Local};
use crossbeam::channel::{self, Receiver, Select, Sender};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// 输出文件扩展名
pub const OUTPUT_EXTENSION: &str = "dxf";

/// 汇总中列出的错误条数上限
const SUMMARY_ERROR_LIMIT: usize = 10;

/// 批量运行的致命错误
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("input path {0:?} is not a directory")]
    NotADirectory(PathBuf),

    #[error("failed to read input directory {path:?}: {source}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn worker thread: {0}")]
    SpawnWorker(#[source] std::io::Error),

    #[error("failed to write error log {path:?}: {source}")]
    WriteErrorLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 批量运行配置
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// 工作线程数（至少 1）
    pub workers: usize,
    /// 不输出逐文件进度
    pub quiet: bool,
    pub job: JobOptions,
}

/// 一次运行的计划：待派发任务与已跳过文件
#[derive(Debug, Clone)]
pub struct BatchRun {
    pub jobs: Vec<ConversionJob>,
    pub skipped: Vec<PathBuf>,
    /// 输出路径与先枚举到的文件冲突而不派发的文件，按失败计
    pub conflicts: Vec<ErrorEntry>,
    /// 枚举到的源文件总数
    pub total: usize,
    pub started_at: DateTime<Local>,
}

/// 取消句柄，可跨线程克隆
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Sender<()>,
}

impl CancelHandle {
    /// 请求取消；重复调用无副作用
    pub fn cancel(&self) {
        let _ = self.tx.try_send(());
    }
}

/// 运行结果汇总
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Local>,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// 因取消而未派发的任务数
    pub not_dispatched: usize,
    pub cancelled: bool,
    pub workers: usize,
    pub elapsed: Duration,
    /// 各任务耗时之和
    pub job_time: Duration,
    pub bytes_written: u64,
    pub errors: Vec<ErrorEntry>,
    /// 写出的错误日志路径
    pub error_log: Option<PathBuf>,
}

impl RunSummary {
    fn new(run: &BatchRun, workers: usize) -> Self {
        Self {
            started_at: run.started_at,
            total: run.total,
            succeeded: 0,
            failed: 0,
            skipped: run.skipped.len(),
            not_dispatched: 0,
            cancelled: false,
            workers,
            elapsed: Duration::ZERO,
            job_time: Duration::ZERO,
            bytes_written: 0,
            errors: Vec::new(),
            error_log: None,
        }
    }

    pub fn completed(&self) -> usize {
        self.succeeded + self.failed
    }

    /// 单任务平均耗时
    pub fn average_job_duration(&self) -> Duration {
        match u32::try_from(self.completed()) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.job_time / n,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && !self.cancelled
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Batch started at {}{}",
            self.started_at.format("%Y-%m-%d %H:%M:%S"),
            if self.cancelled { " (interrupted)" } else { "" }
        )?;
        writeln!(f, "  total:          {}", self.total)?;
        writeln!(f, "  succeeded:      {}", self.succeeded)?;
        writeln!(f, "  failed:         {}", self.failed)?;
        writeln!(f, "  skipped:        {}", self.skipped)?;
        if self.not_dispatched > 0 {
            writeln!(f, "  not dispatched: {}", self.not_dispatched)?;
        }
        writeln!(f, "  workers:        {}", self.workers)?;
        writeln!(f, "  elapsed:        {:.2?}", self.elapsed)?;
        writeln!(f, "  average job:    {:.2?}", self.average_job_duration())?;
        writeln!(f, "  bytes written:  {}", self.bytes_written)?;

        if !self.errors.is_empty() {
            writeln!(f, "Errors:")?;
            for entry in self.errors.iter().take(SUMMARY_ERROR_LIMIT) {
                writeln!(f, "  {} [{}] {}", entry.file, entry.stage, entry.detail)?;
            }
            if self.errors.len() > SUMMARY_ERROR_LIMIT {
                writeln!(
                    f,
                    "  ... and {} more",
                    self.errors.len() - SUMMARY_ERROR_LIMIT
                )?;
            }
            if let Some(path) = &self.error_log {
                writeln!(f, "Full error log: {}", path.display())?;
            }
        }
        Ok(())
    }
}

/// 批量调度器
pub struct Orchestrator {
    config: BatchConfig,
    cancel_tx: Sender<()>,
    cancel_rx: Receiver<()>,
}

impl Orchestrator {
    pub fn new(config: BatchConfig) -> Self {
        let (cancel_tx, cancel_rx) = channel::bounded(1);
        Self {
            config,
            cancel_tx,
            cancel_rx,
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: self.cancel_tx.clone(),
        }
    }

    /// 准备目录并生成任务计划
    pub fn prepare(&self) -> Result<BatchRun, BatchError> {
        let started_at = Local::now();
        let input = &self.config.input_dir;
        if !input.is_dir() {
            return Err(BatchError::NotADirectory(input.clone()));
        }

        create_dir(&self.config.output_dir)?;
        create_dir(&self.config.job.temp_dir)?;

        let sources = enumerate_sources(input)?;
        let total = sources.len();
        let mut jobs = Vec::new();
        let mut skipped = Vec::new();
        let mut conflicts = Vec::new();
        // 输出路径 → 占用它的源文件名；扩展名大小写不同的同名文件会映射到同一输出
        let mut claimed: HashMap<PathBuf, String> = HashMap::new();

        for source in sources {
            let dest = output_path_for(&source, &self.config.output_dir);
            let name = file_name_of(&source);

            if let Some(owner) = claimed.get(&dest) {
                let detail = format!(
                    "output {} is already claimed by {owner}",
                    dest.display()
                );
                if !self.config.quiet {
                    tracing::error!("{name}: {detail}");
                }
                conflicts.push(ErrorEntry {
                    file: name,
                    stage: Stage::Extraction,
                    detail,
                });
                continue;
            }
            claimed.insert(dest.clone(), name);

            if dest.exists() {
                if self.config.quiet {
                    tracing::debug!("skipping {}: output exists", source.display());
                } else {
                    tracing::warn!(
                        "skipping {}: {} already exists",
                        source.display(),
                        dest.display()
                    );
                }
                skipped.push(source);
            } else {
                jobs.push(ConversionJob::new(source, dest));
            }
        }

        tracing::debug!(
            "planned {} jobs, {} skipped, {} conflicting, from {}",
            jobs.len(),
            skipped.len(),
            conflicts.len(),
            input.display()
        );
        Ok(BatchRun {
            jobs,
            skipped,
            conflicts,
            total,
            started_at,
        })
    }

    /// 执行完整批量运行
    pub fn run(&self) -> Result<RunSummary, BatchError> {
        let run = self.prepare()?;
        self.execute(run)
    }

    /// 执行给定计划
    pub fn execute(&self, run: BatchRun) -> Result<RunSummary, BatchError> {
        let started = Instant::now();
        let workers = self.config.workers.max(1);
        let mut summary = RunSummary::new(&run, workers);
        let mut errors = ErrorLog::new();
        let dispatched_total = run.jobs.len();

        summary.failed += run.conflicts.len();
        for entry in run.conflicts {
            errors.push(entry);
        }

        tracing::info!(
            "converting {} files with {} workers ({} skipped)",
            dispatched_total,
            workers,
            summary.skipped
        );

        if dispatched_total > 0 {
            thread::scope(|scope| -> Result<(), BatchError> {
                let (job_tx, job_rx) = channel::bounded::<ConversionJob>(0);
                let (result_tx, result_rx) = channel::unbounded::<JobReport>();

                for id in 0..workers.min(dispatched_total) {
                    let job_rx = job_rx.clone();
                    let result_tx = result_tx.clone();
                    let options = &self.config.job;
                    thread::Builder::new()
                        .name(format!("svgdxf-worker-{id}"))
                        .spawn_scoped(scope, move || {
                            for job in job_rx.iter() {
                                tracing::debug!("worker {id} picked up {}", job.file_name());
                                if result_tx.send(job.execute(options)).is_err() {
                                    break;
                                }
                            }
                        })
                        .map_err(BatchError::SpawnWorker)?;
                }
                drop(job_rx);
                drop(result_tx);

                let mut queue = run.jobs.into_iter();
                let mut next = queue.next();
                let mut in_flight = 0usize;

                while !summary.cancelled {
                    if self.cancel_rx.try_recv().is_ok() {
                        tracing::warn!("cancellation requested, waiting for running jobs");
                        summary.cancelled = true;
                        break;
                    }
                    let Some(job) = next.take() else { break };

                    let mut select = Select::new();
                    let send_op = select.send(&job_tx);
                    let result_op = select.recv(&result_rx);
                    let cancel_op = select.recv(&self.cancel_rx);
                    let operation = select.select();

                    match operation.index() {
                        i if i == send_op => match operation.send(&job_tx, job) {
                            Ok(()) => {
                                in_flight += 1;
                                next = queue.next();
                            }
                            Err(err) => {
                                next = Some(err.into_inner());
                                break;
                            }
                        },
                        i if i == result_op => {
                            next = Some(job);
                            match operation.recv(&result_rx) {
                                Ok(report) => {
                                    in_flight -= 1;
                                    self.record(&mut summary, &mut errors, report, dispatched_total);
                                }
                                Err(_) => break,
                            }
                        }
                        i if i == cancel_op => {
                            next = Some(job);
                            let _ = operation.recv(&self.cancel_rx);
                            tracing::warn!("cancellation requested, waiting for running jobs");
                            summary.cancelled = true;
                        }
                        _ => unreachable!("unknown select operation"),
                    }
                }

                summary.not_dispatched = usize::from(next.is_some()) + queue.count();
                drop(job_tx);

                while in_flight > 0 {
                    match result_rx.recv() {
                        Ok(report) => {
                            in_flight -= 1;
                            self.record(&mut summary, &mut errors, report, dispatched_total);
                        }
                        Err(_) => break,
                    }
                }
                Ok(())
            })?;
        }

        let log_path = self.config.output_dir.join(ERROR_LOG_FILE);
        if errors.is_empty() {
            // 上一次运行留下的日志已不再成立
            match fs::remove_file(&log_path) {
                Ok(()) => tracing::debug!("removed stale {}", log_path.display()),
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(BatchError::WriteErrorLog {
                        path: log_path,
                        source,
                    })
                }
            }
        } else {
            errors.sort();
            errors
                .write_to(&log_path)
                .map_err(|source| BatchError::WriteErrorLog {
                    path: log_path.clone(),
                    source,
                })?;
            summary.error_log = Some(log_path);
        }
        summary.errors = errors.entries().to_vec();
        summary.elapsed = started.elapsed();
        Ok(summary)
    }

    /// 记录单个任务结果
    fn record(
        &self,
        summary: &mut RunSummary,
        errors: &mut ErrorLog,
        report: JobReport,
        total: usize,
    ) {
        summary.job_time += report.duration;
        let index = summary.completed() + 1;
        let name = report.job.file_name();

        match &report.job.status {
            JobStatus::Done => {
                summary.succeeded += 1;
                summary.bytes_written += report.output.bytes;
                if !self.config.quiet {
                    tracing::info!(
                        "[{index}/{total}] {name}: OK {} bytes ({:.2?})",
                        report.output.bytes,
                        report.duration
                    );
                }
            }
            JobStatus::Failed { stage, detail } => {
                summary.failed += 1;
                if !self.config.quiet {
                    tracing::error!("[{index}/{total}] {name}: FAIL [{stage}] {detail}");
                }
                errors.push(ErrorEntry {
                    file: name,
                    stage: *stage,
                    detail: detail.clone(),
                });
            }
            other => {
                tracing::error!("job {name} reported non-terminal status {}", other.name());
            }
        }
    }
}

/// 枚举目录下的 `.svg` 文件（不递归，扩展名不区分大小写，按路径排序）
pub fn enumerate_sources(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let read_error = |source: std::io::Error| BatchError::ReadInput {
        path: dir.to_path_buf(),
        source,
    };

    let mut sources = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_error)? {
        let path = entry.map_err(read_error)?.path();
        let is_svg = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
        if is_svg && path.is_file() {
            sources.push(path);
        }
    }
    sources.sort();
    Ok(sources)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// 由源文件推导输出路径：`<输出目录>/<文件名>.dxf`
pub fn output_path_for(source: &Path, output_dir: &Path) -> PathBuf {
    let mut name = source
        .file_stem()
        .unwrap_or(source.as_os_str())
        .to_os_string();
    name.push(".");
    name.push(OUTPUT_EXTENSION);
    output_dir.join(name)
}

fn create_dir(path: &Path) -> Result<(), BatchError> {
    fs::create_dir_all(path).map_err(|source| BatchError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}
