use anyhow::{Context, Result};
use clap::{ArgAction, ColorChoice, CommandFactory, FromArgMatches, Parser};
use colored::Colorize;
use detmerge::EvaluationEngine;
use detmerge::config::CliConfig;
use detmerge::evaluator::{EvalError, EvalSummary, PycocotoolsEvaluator};
use env_logger::{Builder, Env};
use is_terminal::IsTerminal;
use log::{Level, LevelFilter, debug, info};
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;

const INSTALL_HINT: &str = "Please install pycocotools! (pip install pycocotools)";

#[derive(Parser)]
#[command(
    name = "detmerge",
    about = "Merge per-image detection files into COCO results and evaluate them",
    version
)]
struct Cli {
    /// COCO annotations file (e.g. instances_val2017.json)
    #[arg(long = "gt_json", alias = "gt-json", value_name = "PATH")]
    gt_json: PathBuf,

    /// Folder with detection result json files
    #[arg(long = "det_folder", alias = "det-folder", value_name = "DIR")]
    det_folder: PathBuf,

    /// Image filename suffix [default: .jpg]
    #[arg(long = "img_suffix", alias = "img-suffix", value_name = "SUFFIX")]
    img_suffix: Option<String>,

    /// Merged detection output JSON path [default: result_coco_format.json]
    #[arg(long = "output_json", alias = "output-json", value_name = "PATH")]
    output_json: Option<PathBuf>,

    /// Python interpreter with pycocotools installed [default: python3]
    #[arg(long, value_name = "PROGRAM")]
    python: Option<String>,

    /// Only merge; skip the COCO evaluation
    #[arg(long = "no-eval")]
    no_eval: bool,

    /// Print a JSON report instead of progress messages
    #[arg(long)]
    json: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,

    /// Disable color
    #[arg(long = "no-color")]
    no_color: bool,
}

/// Settings after layering CLI flags over the config file.
#[derive(Debug)]
struct Settings {
    gt_json: PathBuf,
    det_folder: PathBuf,
    img_suffix: String,
    output_json: PathBuf,
    python: String,
    evaluate: bool,
}

impl Settings {
    fn resolve(cli: &Cli, config: CliConfig) -> Self {
        Self {
            gt_json: cli.gt_json.clone(),
            det_folder: cli.det_folder.clone(),
            img_suffix: cli
                .img_suffix
                .clone()
                .unwrap_or(config.merge.img_suffix),
            output_json: cli
                .output_json
                .clone()
                .unwrap_or(config.merge.output_json),
            python: cli.python.clone().unwrap_or(config.evaluator.python),
            evaluate: !cli.no_eval,
        }
    }
}

/// Progress lines on stdout; silent in JSON mode.
struct Progress {
    enabled: bool,
    color: bool,
}

impl Progress {
    fn step(&self, msg: &str) {
        if !self.enabled {
            return;
        }
        if self.color {
            println!("{}", msg.bold().cyan());
        } else {
            println!("{}", msg);
        }
    }

    fn line(&self, msg: &str) {
        if self.enabled {
            println!("{}", msg);
        }
    }
}

#[derive(Debug, Default)]
struct RunReport {
    total_boxes: usize,
    matched_files: usize,
    unmatched_files: usize,
    evaluated_images: usize,
    summary: Option<EvalSummary>,
}

/// `Ok(None)` means the evaluator is missing. Outside JSON mode the user has
/// been told how to install it.
fn run(settings: &Settings, progress: &Progress) -> Result<Option<RunReport>> {
    let engine = EvaluationEngine::new(PycocotoolsEvaluator::new(&settings.python));

    progress.step("Loading COCO annotations...");
    if settings.evaluate {
        match engine.probe() {
            Ok(()) => {}
            Err(EvalError::MissingDependency { evaluator, reason }) => {
                debug!("{} probe failed: {}", evaluator, reason);
                progress.line(INSTALL_HINT);
                return Ok(None);
            }
            Err(e) => return Err(e).context("probing evaluator"),
        }
    }
    let index = engine
        .load_index(&settings.gt_json)
        .context("loading ground truth")?;

    progress.step("Merging detections...");
    let merged = engine
        .merge(&settings.det_folder, &index, &settings.img_suffix)
        .context("merging detections")?;
    progress.line(&format!(
        "Total boxes merged: {} | Files unmatched: {}",
        merged.detections.len(),
        merged.unmatched_count
    ));
    info!(
        "{} detection files matched ground truth images",
        merged.matched_files
    );

    progress.line(&format!(
        "Saving merged detections file: {}",
        settings.output_json.display()
    ));
    engine
        .save(&settings.output_json, &merged)
        .context("saving merged detections")?;

    let mut report = RunReport {
        total_boxes: merged.detections.len(),
        matched_files: merged.matched_files,
        unmatched_files: merged.unmatched_count,
        ..Default::default()
    };

    if settings.evaluate {
        progress.step("Evaluating with COCO API...");
        let outcome = engine
            .evaluate(&settings.gt_json, &settings.output_json, &merged)
            .with_context(|| format!("evaluating with {}", engine.evaluator_name()))?;
        if progress.enabled {
            print!("{}", outcome.report);
        }
        report.evaluated_images = merged.image_ids.len();
        report.summary = Some(outcome.summary);
    }

    progress.step("Done.");
    Ok(Some(report))
}

fn print_json_report(settings: &Settings, report: &RunReport) -> Result<()> {
    let metrics = report
        .summary
        .as_ref()
        .map(|s| serde_json::to_value(&s.metrics))
        .transpose()?;
    let value = json!({
        "ap": report.summary.as_ref().and_then(|s| s.ap()),
        "ap50": report.summary.as_ref().and_then(|s| s.ap50()),
        "ap75": report.summary.as_ref().and_then(|s| s.ap75()),
        "evaluated": report.summary.is_some(),
        "evaluated_images": report.evaluated_images,
        "matched_files": report.matched_files,
        "metrics": metrics.unwrap_or_else(|| json!([])),
        "output_json": settings.output_json,
        "total_boxes": report.total_boxes,
        "unmatched_files": report.unmatched_files,
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn detect_color_choice() -> ColorChoice {
    // Scan args before clap so help/errors honor `--no-color`.
    // Mirror clap's parsing by stopping at `--` which terminates flags.
    let mut args = std::env::args_os();
    args.next();
    let flag = args
        .take_while(|arg| arg != "--")
        .any(|arg| arg == "--no-color");
    if flag || std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty()) {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    }
}

fn level_filter(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn init_logger(verbose: u8, quiet: bool, color: bool) {
    // Without -v/-q, RUST_LOG wins if set.
    let use_env = verbose == 0 && !quiet && std::env::var_os("RUST_LOG").is_some();

    let mut logger = if use_env {
        Builder::from_env(Env::default())
    } else {
        let mut b = Builder::new();
        b.filter_level(level_filter(verbose, quiet));
        b
    };

    logger
        .format(move |buf, record| {
            let level = record.level();
            let level_str = if !color {
                level.as_str().to_string()
            } else {
                match level {
                    Level::Error => "ERROR".red().bold().to_string(),
                    Level::Warn => "WARN".yellow().to_string(),
                    Level::Info => "INFO".green().to_string(),
                    Level::Debug => "DEBUG".blue().to_string(),
                    Level::Trace => "TRACE".magenta().to_string(),
                }
            };
            writeln!(buf, "[{}] {}", level_str, record.args())
        })
        .init();
}

fn main() {
    let color = detect_color_choice();
    let matches = Cli::command().color(color).get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    let use_color = !cli.no_color && !matches!(color, ColorChoice::Never);
    init_logger(
        cli.verbose,
        cli.quiet,
        use_color && std::io::stderr().is_terminal(),
    );

    let settings = Settings::resolve(&cli, CliConfig::load());
    debug!("resolved settings: {:?}", settings);

    let progress = Progress {
        enabled: !cli.json,
        color: use_color && std::io::stdout().is_terminal(),
    };

    match run(&settings, &progress) {
        Ok(Some(report)) if cli.json => {
            if let Err(e) = print_json_report(&settings, &report) {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        }
        Ok(None) if cli.json => {
            let value = json!({ "evaluated": false, "error": INSTALL_HINT });
            println!("{}", value);
        }
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
