use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use svgdxf_batch::{BatchConfig, JobOptions, Orchestrator, Stage, ERROR_LOG_FILE};

fn drawing(index: usize) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="200mm" height="100mm" viewBox="0 0 200 100">
  <g stroke="black" fill="none">
    <path d="M10 10 L{x} 10 Q 150 50 {x} 90 A 20 20 0 0 1 10 90 z"/>
    <rect x="120" y="20" width="40" height="30" rx="5"/>
    <circle cx="50" cy="50" r="{r}"/>
  </g>
</svg>"#,
        x = 100 + index,
        r = 5 + index
    )
}

const BROKEN: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100">
  <path d="M10 10 L50 50"/>
  <path id="bad" d="M10 10 L50 # 50"/>
</svg>"#;

struct Fixture {
    _root: tempfile::TempDir,
    input: std::path::PathBuf,
    output: std::path::PathBuf,
    temp: std::path::PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let input = root.path().join("in");
        let output = root.path().join("out");
        let temp = root.path().join("staging");
        fs::create_dir_all(&input).unwrap();
        Self {
            input,
            output,
            temp,
            _root: root,
        }
    }

    fn write(&self, name: &str, content: &str) {
        fs::write(self.input.join(name), content).unwrap();
    }

    fn config(&self, workers: usize) -> BatchConfig {
        BatchConfig {
            input_dir: self.input.clone(),
            output_dir: self.output.clone(),
            workers,
            quiet: true,
            job: JobOptions::new(&self.temp),
        }
    }
}

fn dxf_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".dxf"))
        .collect();
    names.sort();
    names
}

#[test]
fn converts_directory_and_cleans_staging() {
    let fixture = Fixture::new();
    for i in 0..3 {
        fixture.write(&format!("part{i}.svg"), &drawing(i));
    }
    fixture.write("readme.txt", "not a drawing");

    let summary = Orchestrator::new(fixture.config(2)).run().unwrap();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.exit_code(), 0);
    assert!(summary.bytes_written > 0);
    assert!(summary.error_log.is_none());

    assert_eq!(
        dxf_files(&fixture.output),
        vec!["part0.dxf", "part1.dxf", "part2.dxf"]
    );
    assert!(!fixture.output.join(ERROR_LOG_FILE).exists());
    // 成功后中间文件被删除
    assert_eq!(fs::read_dir(&fixture.temp).unwrap().count(), 0);

    let drawing = dxf::Drawing::load_file(fixture.output.join("part1.dxf")).unwrap();
    let layers: Vec<String> = drawing
        .entities()
        .map(|e| e.common.layer.clone())
        .collect();
    assert!(layers.iter().any(|l| l == "LINES"));
    assert!(layers.iter().any(|l| l == "CURVES"));
    assert!(layers.iter().any(|l| l == "PATHS"));
    assert!(layers.iter().any(|l| l == "SHAPES"));
}

#[test]
fn resume_skips_existing_outputs() {
    let fixture = Fixture::new();
    fixture.write("a.svg", &drawing(0));
    fixture.write("b.svg", &drawing(1));
    fs::create_dir_all(&fixture.output).unwrap();
    fs::write(fixture.output.join("a.dxf"), "existing").unwrap();

    let orchestrator = Orchestrator::new(fixture.config(2));
    let run = orchestrator.prepare().unwrap();
    assert_eq!(run.jobs.len(), 1);
    assert!(run.jobs[0].source.ends_with("b.svg"));
    assert_eq!(run.skipped.len(), 1);
    assert!(run.skipped[0].ends_with("a.svg"));

    let summary = orchestrator.execute(run).unwrap();
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.exit_code(), 0);
    // 已存在的输出未被覆盖
    assert_eq!(
        fs::read_to_string(fixture.output.join("a.dxf")).unwrap(),
        "existing"
    );
    assert!(fixture.output.join("b.dxf").exists());
}

#[test]
fn single_bad_file_does_not_abort_batch() {
    let fixture = Fixture::new();
    for i in 0..10 {
        let name = format!("file{i:02}.svg");
        if i == 3 {
            fixture.write(&name, BROKEN);
        } else {
            fixture.write(&name, &drawing(i));
        }
    }

    let summary = Orchestrator::new(fixture.config(3)).run().unwrap();
    assert_eq!(summary.total, 10);
    assert_eq!(summary.succeeded, 9);
    assert_eq!(summary.failed, 1);
    assert_ne!(summary.exit_code(), 0);

    assert_eq!(summary.errors.len(), 1);
    let entry = &summary.errors[0];
    assert_eq!(entry.file, "file03.svg");
    assert_eq!(entry.stage, Stage::Extraction);
    assert!(entry.detail.contains("id=bad"), "{}", entry.detail);

    let outputs = dxf_files(&fixture.output);
    assert_eq!(outputs.len(), 9);
    assert!(!outputs.iter().any(|n| n == "file03.dxf"));

    let log = fs::read_to_string(fixture.output.join(ERROR_LOG_FILE)).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("file03.svg\textraction\t"));
}

#[test]
fn lenient_mode_keeps_valid_paths() {
    let fixture = Fixture::new();
    fixture.write("broken.svg", BROKEN);

    let mut config = fixture.config(1);
    config.job.fail_on_path_errors = false;
    let summary = Orchestrator::new(config).run().unwrap();
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.exit_code(), 0);

    let drawing = dxf::Drawing::load_file(fixture.output.join("broken.dxf")).unwrap();
    assert_eq!(drawing.entities().count(), 1);
}

#[test]
fn keep_staging_files_retains_json() {
    let fixture = Fixture::new();
    fixture.write("part.svg", &drawing(0));

    let mut config = fixture.config(1);
    config.job.keep_staging_files = true;
    let summary = Orchestrator::new(config).run().unwrap();
    assert_eq!(summary.succeeded, 1);

    let staging = fixture.temp.join("part_vectors.json");
    assert!(staging.exists());
    let document = svgdxf_file::load_staging(&staging).unwrap();
    assert_eq!(document.view_box_height, Some(100.0));
    assert_eq!(document.paths.len(), 1);
    assert_eq!(document.shapes.len(), 2);
}

#[test]
fn cancellation_before_dispatch_runs_nothing() {
    let fixture = Fixture::new();
    for i in 0..4 {
        fixture.write(&format!("part{i}.svg"), &drawing(i));
    }

    let orchestrator = Orchestrator::new(fixture.config(2));
    let handle = orchestrator.cancel_handle();
    handle.cancel();
    handle.cancel();

    let summary = orchestrator.run().unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.completed(), 0);
    assert_eq!(summary.not_dispatched, 4);
    assert_ne!(summary.exit_code(), 0);
    assert!(dxf_files(&fixture.output).is_empty());
}

#[test]
fn missing_input_directory_is_fatal() {
    let fixture = Fixture::new();
    let mut config = fixture.config(1);
    config.input_dir = fixture.input.join("absent");
    let err = Orchestrator::new(config).run().unwrap_err();
    assert!(matches!(err, svgdxf_batch::BatchError::NotADirectory(_)));
    assert!(!fixture.output.exists());
}

#[test]
fn clean_rerun_removes_stale_error_log() {
    let fixture = Fixture::new();
    fixture.write("a.svg", BROKEN);

    let first = Orchestrator::new(fixture.config(1)).run().unwrap();
    assert_eq!(first.failed, 1);
    let log_path = fixture.output.join(ERROR_LOG_FILE);
    assert!(log_path.exists());

    fixture.write("a.svg", &drawing(0));
    let second = Orchestrator::new(fixture.config(1)).run().unwrap();
    assert_eq!(second.succeeded, 1);
    assert_eq!(second.failed, 0);
    assert_eq!(second.exit_code(), 0);
    assert!(second.error_log.is_none());
    assert!(!log_path.exists());
}

#[test]
fn sources_sharing_an_output_are_not_both_converted() {
    let fixture = Fixture::new();
    fixture.write("a.svg", &drawing(0));
    fixture.write("a.SVG", &drawing(1));
    fixture.write("b.svg", &drawing(2));

    let orchestrator = Orchestrator::new(fixture.config(2));
    let run = orchestrator.prepare().unwrap();
    assert_eq!(run.total, 3);
    assert_eq!(run.jobs.len(), 2);
    let mut dests: Vec<_> = run.jobs.iter().map(|j| j.dest.clone()).collect();
    dests.dedup();
    assert_eq!(dests.len(), 2);

    // 按路径排序，大写扩展名先占用输出
    assert_eq!(run.conflicts.len(), 1);
    let conflict = &run.conflicts[0];
    assert_eq!(conflict.file, "a.svg");
    assert!(conflict.detail.contains("a.SVG"), "{}", conflict.detail);

    let summary = orchestrator.execute(run).unwrap();
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_ne!(summary.exit_code(), 0);
    assert_eq!(dxf_files(&fixture.output), vec!["a.dxf", "b.dxf"]);

    let log = fs::read_to_string(fixture.output.join(ERROR_LOG_FILE)).unwrap();
    assert!(log.starts_with("a.svg\textraction\toutput "), "{log}");
}

#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn captured_prepare(fixture: &Fixture, quiet: bool) -> String {
    let log = CapturedLog::default();
    let writer = log.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();

    let mut config = fixture.config(1);
    config.quiet = quiet;
    let run = tracing::subscriber::with_default(subscriber, || {
        Orchestrator::new(config).prepare().unwrap()
    });
    assert_eq!(run.skipped.len(), 1);

    let bytes = log.0.lock().unwrap().clone();
    String::from_utf8(bytes).unwrap()
}

#[test]
fn quiet_run_does_not_log_skipped_files() {
    let fixture = Fixture::new();
    fixture.write("a.svg", &drawing(0));
    fs::create_dir_all(&fixture.output).unwrap();
    fs::write(fixture.output.join("a.dxf"), "existing").unwrap();

    assert!(captured_prepare(&fixture, false).contains("skipping"));
    assert!(!captured_prepare(&fixture, true).contains("skipping"));
}
