//! svgdxf 命令行入口
//!
//! 子命令：
//! - `convert`：单个 SVG → DXF
//! - `convert-staged`：已保存的中间文件 → DXF
//! - `batch`：目录批量转换（断点续转、并行、Ctrl-C 取消）
//! - `inspect`：打印 SVG 的统计报告（JSON）

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use svgdxf_batch::{
    convert_document, convert_file, BatchConfig, JobOptions, JobReport, JobStatus, Orchestrator,
    Settings,
};
use svgdxf_core::assemble::Assembler;
use svgdxf_core::convert::convert_staging;
use svgdxf_core::report::{summarize, summarize_staging};
use svgdxf_file::{extract_svg, load_staging, STAGING_SUFFIX};

#[derive(Parser)]
#[command(name = "svgdxf")]
#[command(about = "Convert SVG drawings to DXF", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件路径（缺省查找 SVGDXF_CONFIG 与 ./svgdxf.toml）
    #[arg(long, global = true, value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// 输出调试日志
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a single SVG file
    Convert {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        input: PathBuf,

        /// Output DXF path (defaults to the input path with a .dxf extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        conversion: ConversionArgs,
    },

    /// Convert a saved staging document (`*_vectors.json`)
    ConvertStaged {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        input: PathBuf,

        /// Output DXF path
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        conversion: ConversionArgs,
    },

    /// Convert every SVG file in a directory
    Batch {
        #[arg(value_hint = clap::ValueHint::DirPath)]
        input_dir: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Number of worker threads
        #[arg(short, long)]
        workers: Option<usize>,

        /// Suppress per-file progress lines
        #[arg(short, long)]
        quiet: bool,

        #[command(flatten)]
        conversion: ConversionArgs,
    },

    /// Print extraction statistics for an SVG file as JSON
    Inspect {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        input: PathBuf,

        /// Report the assembled DXF document instead of the staging document
        #[arg(long)]
        assembled: bool,
    },
}

/// 各转换子命令共用的选项
#[derive(Args, Debug, Clone, Default)]
struct ConversionArgs {
    /// Directory for staging files
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    temp: Option<PathBuf>,

    /// Keep staging files after successful conversion
    #[arg(long)]
    keep_json: bool,

    /// Put every entity on layer 0
    #[arg(long)]
    no_layers: bool,

    /// Do not merge connected cubic splines
    #[arg(long)]
    no_merge_splines: bool,

    /// Drop malformed paths instead of failing the file
    #[arg(long)]
    lenient: bool,
}

impl ConversionArgs {
    /// 命令行选项覆盖配置文件
    fn apply(&self, settings: &mut Settings) {
        if let Some(temp) = &self.temp {
            settings.batch.temp_dir = Some(temp.clone());
        }
        if self.keep_json {
            settings.batch.keep_staging_files = true;
        }
        if self.no_layers {
            settings.conversion.layering = false;
        }
        if self.no_merge_splines {
            settings.conversion.merge_splines = false;
        }
        if self.lenient {
            settings.conversion.fail_on_path_errors = false;
        }
    }
}

fn job_options(settings: &Settings) -> JobOptions {
    JobOptions {
        temp_dir: settings.batch.temp_dir(),
        keep_staging_files: settings.batch.keep_staging_files,
        fail_on_path_errors: settings.conversion.fail_on_path_errors,
        assembly: settings.conversion.assembly_options(),
    }
}

fn init_logging(level: &str, debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut settings =
        Settings::discover(cli.config.as_deref()).context("failed to load configuration")?;
    init_logging(&settings.logging.level, cli.debug);

    match cli.command {
        Commands::Convert {
            input,
            output,
            conversion,
        } => {
            conversion.apply(&mut settings);
            run_convert(&input, output, &settings)
        }
        Commands::ConvertStaged {
            input,
            output,
            conversion,
        } => {
            conversion.apply(&mut settings);
            run_convert_staged(&input, output, &settings)
        }
        Commands::Batch {
            input_dir,
            output,
            workers,
            quiet,
            conversion,
        } => {
            conversion.apply(&mut settings);
            if workers.is_some() {
                settings.batch.workers = workers;
            }
            if quiet {
                settings.batch.quiet = true;
            }
            run_batch(input_dir, output, &settings)
        }
        Commands::Inspect { input, assembled } => run_inspect(&input, assembled, &settings),
    }
}

fn run_convert(input: &Path, output: Option<PathBuf>, settings: &Settings) -> Result<ExitCode> {
    let dest = output.unwrap_or_else(|| input.with_extension("dxf"));
    let options = job_options(settings);
    std::fs::create_dir_all(&options.temp_dir).with_context(|| {
        format!(
            "failed to create staging directory {}",
            options.temp_dir.display()
        )
    })?;

    let report = convert_file(input, &dest, &options);
    Ok(print_job_report(&report))
}

fn run_convert_staged(
    input: &Path,
    output: Option<PathBuf>,
    settings: &Settings,
) -> Result<ExitCode> {
    let dest = output.unwrap_or_else(|| staged_output_path(input));
    let staging = load_staging(input)
        .with_context(|| format!("failed to load staging file {}", input.display()))?;

    let converted = convert_document(&staging, &dest, &job_options(settings))
        .with_context(|| format!("failed to convert {}", input.display()))?;
    println!(
        "{} -> {}: {} entities, {} bytes",
        input.display(),
        dest.display(),
        converted.entity_count,
        converted.bytes
    );
    Ok(ExitCode::SUCCESS)
}

/// `<stem>_vectors.json` → `<stem>.dxf`
fn staged_output_path(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name
        .strip_suffix(STAGING_SUFFIX)
        .map(str::to_string)
        .unwrap_or_else(|| {
            input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
    input.with_file_name(format!("{stem}.dxf"))
}

fn print_job_report(report: &JobReport) -> ExitCode {
    match &report.job.status {
        JobStatus::Done => {
            println!(
                "{} -> {}: {} entities, {} bytes ({:.2?})",
                report.job.source.display(),
                report.job.dest.display(),
                report.output.entity_count,
                report.output.bytes,
                report.duration
            );
            if report.output.dropped_elements > 0 {
                println!("  {} element(s) dropped", report.output.dropped_elements);
            }
            ExitCode::SUCCESS
        }
        JobStatus::Failed { stage, detail } => {
            eprintln!(
                "{}: FAIL [{stage}] {detail}",
                report.job.source.display()
            );
            ExitCode::FAILURE
        }
        other => {
            eprintln!(
                "{}: job ended in state {}",
                report.job.source.display(),
                other.name()
            );
            ExitCode::FAILURE
        }
    }
}

fn run_batch(input_dir: PathBuf, output_dir: PathBuf, settings: &Settings) -> Result<ExitCode> {
    let config = BatchConfig {
        input_dir,
        output_dir,
        workers: settings.batch.worker_count(),
        quiet: settings.batch.quiet,
        job: job_options(settings),
    };
    let orchestrator = Orchestrator::new(config);

    let handle = orchestrator.cancel_handle();
    ctrlc::set_handler(move || {
        handle.cancel();
    })
    .context("failed to set Ctrl-C handler")?;

    info!(
        "batch {} -> {}",
        orchestrator.config().input_dir.display(),
        orchestrator.config().output_dir.display()
    );
    let summary = orchestrator.run().context("batch run failed")?;
    print!("{summary}");

    Ok(ExitCode::from(u8::try_from(summary.exit_code()).unwrap_or(1)))
}

fn run_inspect(input: &Path, assembled: bool, settings: &Settings) -> Result<ExitCode> {
    let extraction =
        extract_svg(input).with_context(|| format!("failed to read {}", input.display()))?;
    for failure in &extraction.failures {
        tracing::warn!("{failure}");
    }

    let json = if assembled {
        let output = convert_staging(&extraction.document);
        for failure in &output.failures {
            tracing::warn!("{failure}");
        }
        let document = Assembler::new(settings.conversion.assembly_options())
            .assemble(
                &output.groups,
                extraction.document.view_box_width,
                extraction.document.view_box_height,
            )
            .with_context(|| format!("failed to assemble {}", input.display()))?;
        serde_json::to_string_pretty(&summarize(&document))?
    } else {
        serde_json::to_string_pretty(&summarize_staging(&extraction.document))?
    };
    println!("{json}");
    Ok(ExitCode::SUCCESS)
}
