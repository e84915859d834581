use crate::engine::build_classifier;
use crate::model::{
    CatalogKind, ClassificationResult, PreviewInfo, WorkflowConfig, WorkflowEvent, WorkflowPhase,
};
use crate::orchestrator::{Admission, WorkflowController};
use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "fauna-lens",
    version,
    about = "Identify wildlife or assess livestock from a photo"
)]
pub struct Cli {
    /// Image files to classify, one at a time
    pub files: Vec<PathBuf>,

    /// Print results as JSON and exit (no TUI)
    #[arg(long, conflicts_with = "text")]
    pub json: bool,

    /// Print a text summary per file and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Reference catalog used by the built-in classifier
    #[arg(long, value_enum, default_value_t = CatalogKind::Wildlife)]
    pub catalog: CatalogKind,

    /// Classify through an HTTP backend (POST <URL>/classify) instead of the built-in classifier
    #[arg(long)]
    pub backend_url: Option<String>,

    /// Upper bound on a single classification
    #[arg(long, default_value = "15s")]
    pub timeout: humantime::Duration,

    /// Minimum simulated inference delay
    #[arg(long, default_value = "2s")]
    pub min_latency: humantime::Duration,

    /// Maximum simulated inference delay
    #[arg(long, default_value = "3500ms")]
    pub max_latency: humantime::Duration,

    /// Largest accepted upload in bytes
    #[arg(long, default_value_t = crate::validate::MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: u64,

    /// Seed for the built-in classifier's random draws
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn is_interactive(&self) -> bool {
        cfg!(feature = "tui") && !self.json && !self.text
    }
}

/// Install the logger. Interactive mode stays silent unless a log file is given, since
/// stderr output would tear the terminal UI.
pub fn init_logging(args: &Cli) -> Result<()> {
    let default_filter = if args.is_interactive() && args.log_file.is_none() {
        "off"
    } else {
        "warn"
    };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter));
    if let Some(path) = args.log_file.as_deref() {
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.try_init().context("install logger")?;
    Ok(())
}

pub async fn run(args: Cli) -> Result<()> {
    if Duration::from(args.min_latency) > Duration::from(args.max_latency) {
        return Err(anyhow::anyhow!(
            "--min-latency ({}) must not exceed --max-latency ({})",
            args.min_latency,
            args.max_latency
        ));
    }

    if args.is_interactive() {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
    }

    run_batch(args).await
}

/// Build a `WorkflowConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> WorkflowConfig {
    WorkflowConfig {
        max_upload_bytes: args.max_upload_bytes,
        classify_timeout: Duration::from(args.timeout),
        catalog: args.catalog,
        min_latency: Duration::from(args.min_latency),
        max_latency: Duration::from(args.max_latency),
        backend_url: args.backend_url.clone(),
        seed: args.seed,
        user_agent: format!("fauna-lens/{}", env!("CARGO_PKG_VERSION")),
    }
}

/// Per-file outcome for JSON output.
#[derive(Debug, Serialize)]
struct FileReport {
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<ClassificationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    /// Preview that was live while the result was shown.
    #[serde(skip)]
    preview: Option<PreviewInfo>,
}

impl FileReport {
    fn failed(path: &Path, error: impl Into<String>) -> Self {
        Self {
            file: path.display().to_string(),
            result: None,
            error: Some(error.into()),
            preview: None,
        }
    }
}

/// How a file left the workflow.
enum Processed {
    Finished(FileReport),
    /// Ctrl-C arrived while the file was being analyzed.
    Interrupted(FileReport),
}

/// Push one file through the workflow and bring it back to idle.
async fn classify_one(
    controller: &mut WorkflowController,
    path: &Path,
    max_upload_bytes: u64,
) -> Processed {
    let file = match crate::input::load_selected_file(path, max_upload_bytes).await {
        Ok(f) => f,
        Err(e) => return Processed::Finished(FileReport::failed(path, format!("{e:#}"))),
    };

    match controller.submit(file) {
        Admission::Admitted => {}
        Admission::Rejected(e) => {
            return Processed::Finished(FileReport::failed(path, e.to_string()))
        }
        Admission::Ignored => return Processed::Finished(FileReport::failed(path, "workflow busy")),
    }

    tokio::select! {
        outcome = controller.next_outcome() => controller.complete(outcome),
        _ = tokio::signal::ctrl_c() => {
            controller.abandon();
            return Processed::Interrupted(FileReport::failed(path, "interrupted"));
        }
    }

    let snapshot = controller.snapshot();
    let report = match (snapshot.phase, snapshot.result) {
        (WorkflowPhase::Result, Some(result)) => FileReport {
            file: path.display().to_string(),
            result: Some(result),
            error: None,
            preview: snapshot.preview,
        },
        _ => FileReport::failed(path, "classification failed"),
    };
    controller.reset();
    Processed::Finished(report)
}

/// Non-interactive mode: classify each file in order, then print text or JSON.
async fn run_batch(args: Cli) -> Result<()> {
    if args.files.is_empty() {
        return Err(anyhow::anyhow!(
            "no input files; pass one or more image paths (or run without --json/--text for the TUI)"
        ));
    }

    let cfg = build_config(&args);
    let classifier = build_classifier(&cfg).context("set up classifier")?;
    let (out_tx, out_handle) = spawn_output_writer();
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<WorkflowEvent>();

    // Notifications go to stderr in text mode; JSON mode keeps stderr quiet.
    let note_tx = out_tx.clone();
    let show_notes = !args.json;
    let forwarder = tokio::spawn(async move {
        while let Some(ev) = evt_rx.recv().await {
            if let WorkflowEvent::Notify(n) = ev {
                if show_notes {
                    let _ = note_tx.send(OutputLine::Stderr(
                        crate::summary::format_notification(&n),
                    ));
                }
            }
        }
    });

    let mut controller = WorkflowController::new(classifier, &cfg, evt_tx);
    let mut reports = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let (report, interrupted) = match classify_one(&mut controller, path, cfg.max_upload_bytes).await {
            Processed::Finished(report) => (report, false),
            Processed::Interrupted(report) => (report, true),
        };
        if !args.json {
            match (&report.result, &report.error) {
                (Some(result), _) => {
                    let summary = crate::summary::build_text_summary(
                        &report.file,
                        report.preview.as_ref(),
                        result,
                    );
                    for line in summary.lines {
                        let _ = out_tx.send(OutputLine::Stdout(line));
                    }
                    let _ = out_tx.send(OutputLine::Stdout(String::new()));
                }
                (None, Some(err)) => {
                    let _ = out_tx.send(OutputLine::Stderr(format!("{}: {err}", report.file)));
                }
                (None, None) => {}
            }
        }
        reports.push(report);
        if interrupted {
            break;
        }
    }

    // Closing the controller closes the event channel and ends the forwarder.
    drop(controller);
    let _ = forwarder.await;

    if args.json {
        let out = serde_json::to_string_pretty(&reports)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    }

    drop(out_tx);
    let _ = out_handle.await;

    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    if failed > 0 {
        return Err(anyhow::anyhow!(
            "{failed} of {} file(s) could not be classified",
            args.files.len()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("fauna-lens").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_match_workflow_defaults() {
        let cfg = build_config(&parse(&["a.jpg"]));
        let def = WorkflowConfig::default();
        assert_eq!(cfg.max_upload_bytes, def.max_upload_bytes);
        assert_eq!(cfg.classify_timeout, def.classify_timeout);
        assert_eq!(cfg.min_latency, def.min_latency);
        assert_eq!(cfg.max_latency, def.max_latency);
        assert_eq!(cfg.catalog, CatalogKind::Wildlife);
        assert!(cfg.backend_url.is_none());
    }

    #[test]
    fn json_and_text_conflict() {
        let res = Cli::try_parse_from(["fauna-lens", "--json", "--text", "a.jpg"]);
        assert!(res.is_err());
    }

    #[test]
    fn parses_catalog_and_durations() {
        let cfg = build_config(&parse(&[
            "--catalog",
            "livestock",
            "--timeout",
            "3s",
            "--min-latency",
            "0ms",
            "--max-latency",
            "10ms",
            "--seed",
            "5",
            "x.png",
        ]));
        assert_eq!(cfg.catalog, CatalogKind::Livestock);
        assert_eq!(cfg.classify_timeout, Duration::from_secs(3));
        assert_eq!(cfg.max_latency, Duration::from_millis(10));
        assert_eq!(cfg.seed, Some(5));
    }

    #[tokio::test]
    async fn rejects_inverted_latency_band() {
        let err = run(parse(&["--text", "--min-latency", "5s", "--max-latency", "1s", "a.jpg"]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--min-latency"));
    }

    #[tokio::test]
    async fn classify_one_reports_result_and_rejection() {
        let dir = tempfile::tempdir().unwrap();
        let img = dir.path().join("fox.png");
        let mut f = std::fs::File::create(&img).unwrap();
        f.write_all(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]).unwrap();
        drop(f);
        let txt = dir.path().join("notes.txt");
        std::fs::write(&txt, "hello").unwrap();

        let cfg = build_config(&parse(&["--min-latency", "0ms", "--max-latency", "0ms", "--seed", "1"]));
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut controller = WorkflowController::new(build_classifier(&cfg).unwrap(), &cfg, tx);

        let limit = cfg.max_upload_bytes;
        let finished = |p: Processed| match p {
            Processed::Finished(report) => report,
            Processed::Interrupted(_) => panic!("unexpected interruption"),
        };

        let ok = finished(classify_one(&mut controller, &img, limit).await);
        assert!(ok.error.is_none());
        assert_eq!(ok.preview.as_ref().map(|p| p.mime_type.as_str()), Some("image/png"));
        assert_eq!(ok.result.map(|r| r.subject_type), Some("Red Fox".to_string()));
        assert_eq!(controller.snapshot().phase, WorkflowPhase::Idle);

        let bad = finished(classify_one(&mut controller, &txt, limit).await);
        assert!(bad.result.is_none());
        assert!(bad.error.unwrap().contains("invalid file type"));

        let missing = finished(classify_one(&mut controller, &dir.path().join("gone.jpg"), limit).await);
        assert!(missing.error.is_some());
        assert_eq!(controller.previews().ledger().live(), 0);
    }

    #[tokio::test]
    async fn oversized_file_is_rejected_without_loading() {
        let dir = tempfile::tempdir().unwrap();
        let big = dir.path().join("big.png");
        let mut f = std::fs::File::create(&big).unwrap();
        f.write_all(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]).unwrap();
        f.set_len(32 * 1024 * 1024).unwrap();
        drop(f);

        let cfg = build_config(&parse(&["--min-latency", "0ms", "--max-latency", "0ms"]));
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut controller = WorkflowController::new(build_classifier(&cfg).unwrap(), &cfg, tx);

        match classify_one(&mut controller, &big, cfg.max_upload_bytes).await {
            Processed::Finished(report) => {
                assert!(report.error.unwrap().contains("file too large"));
            }
            Processed::Interrupted(_) => panic!("unexpected interruption"),
        }
        assert_eq!(controller.previews().ledger().acquired(), 0);
    }
}
