use anyhow::{Context, Result, bail};
use arboard::Clipboard;
use clap::{Parser, Subcommand};
use geoselect_core::{
    AnalysisClient, AnalysisRequest, AnalysisResult, AnalysisSink, Config, FixtureScene, GeoPoint, GeoRectangle,
    Method, Operation, Outcome, PointerEvent, ScreenPoint, SelectionEngine, init, init_logging,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Override the analysis endpoint defined in .env
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Scenario description sent with every analysis request
    #[arg(long, global = true)]
    scenario: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a gesture script against a fixture scene
    Replay {
        /// Scene description (JSON)
        #[arg(long)]
        scene: PathBuf,

        /// Gesture script (JSON list of steps)
        #[arg(long)]
        script: PathBuf,

        /// Actually send committed selections to the analysis service
        #[arg(long, default_value_t = false)]
        dispatch: bool,

        /// Copy the final selection bounds to clipboard
        #[arg(short, long, default_value_t = false)]
        copy: bool,
    },
    /// Request an analysis for a bounding box
    Analyze {
        #[arg(long, allow_negative_numbers = true)]
        min_lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        max_lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        min_lon: f64,
        #[arg(long, allow_negative_numbers = true)]
        max_lon: f64,
    },
}

/// One line of a gesture script.
#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(tag = "step", rename_all = "snake_case")]
enum Step {
    Interactive,
    View,
    Arm { operation: Operation, method: Method },
    Clear,
    RestoreAll,
    Down { x: f64, y: f64 },
    Move { x: f64, y: f64 },
    Up { x: f64, y: f64 },
    Click { x: f64, y: f64 },
    /// Shorthand for down, move, up.
    Drag { from: ScreenPoint, to: ScreenPoint },
}

/// Sink used when replaying without `--dispatch`: prints what would be sent.
#[derive(Default)]
struct DryRunSink {
    sent: usize,
}

impl AnalysisSink for DryRunSink {
    fn submit(&mut self, generation: u64, request: AnalysisRequest) {
        self.sent += 1;
        let body = serde_json::to_string(&request).unwrap_or_default();
        println!("  -> POST #{generation} {body}");
    }

    fn discard(&mut self, generation: u64) {
        println!("  -> analysis discarded (generation {generation})");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup
    init();
    init_logging().context("Failed to initialize logging")?;
    let args = Args::parse();

    let mut builder = Config::builder();
    let loaded = Config::load().context("Failed to load configuration")?;
    builder = builder
        .with_analysis_url(args.endpoint.unwrap_or_else(|| loaded.analysis_url.to_string()))
        .with_timeout(loaded.request_timeout)
        .with_sample_step(loaded.sample_step_px)
        .with_flight(loaded.flight.clone());
    if let Some(text) = args.scenario.or(loaded.scenario_text) {
        builder = builder.with_scenario_text(text);
    }
    let config = builder.build().context("Invalid configuration")?;

    match args.command {
        Command::Replay {
            scene,
            script,
            dispatch,
            copy,
        } => replay(config, &scene, &script, dispatch, copy),
        Command::Analyze {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        } => {
            let bbox = GeoRectangle::from_corners(GeoPoint::new(min_lat, min_lon), GeoPoint::new(max_lat, max_lon));
            analyze(&config, bbox).await
        }
    }
}

fn replay(config: Config, scene_path: &Path, script_path: &Path, dispatch: bool, copy: bool) -> Result<()> {
    let scene = FixtureScene::load(scene_path)
        .with_context(|| format!("Failed to load scene {}", scene_path.display()))?;
    let raw = std::fs::read_to_string(script_path)
        .with_context(|| format!("Failed to read script {}", script_path.display()))?;
    let steps: Vec<Step> = serde_json::from_str(&raw).context("Failed to parse gesture script")?;
    info!(steps = steps.len(), dispatch, "replaying gesture script");

    let selection = if dispatch {
        let timeout = config.request_timeout;
        let mut engine = geoselect_core::live_engine(scene, config)?;
        run_steps(&mut engine, &steps);
        summarize(&engine);

        if engine.session().active_selection().is_some() {
            println!();
            println!("Waiting for analysis ({}s timeout)...", timeout.as_secs());
            match engine.analysis_mut().wait_latest(timeout) {
                Some(result) => print_report(result),
                None => eprintln!("No analysis report received"),
            }
        }
        engine.session().active_selection()
    } else {
        let mut engine = SelectionEngine::new(scene, DryRunSink::default(), config)?;
        run_steps(&mut engine, &steps);
        summarize(&engine);
        println!("Analysis requests: {}", engine.analysis().sent);
        engine.session().active_selection()
    };

    if copy {
        let Some(rect) = selection else {
            bail!("Nothing selected to copy");
        };
        // Copy to clipboard if requested
        match Clipboard::new() {
            Ok(mut clipboard) => {
                if let Err(e) = clipboard.set_text(rect.clipboard_text()) {
                    eprintln!("Warning: Failed to copy to clipboard: {}", e);
                } else {
                    println!("(Copied to clipboard)");
                }
            }
            Err(e) => eprintln!("Warning: Could not access clipboard: {}", e),
        }
    }

    Ok(())
}

fn run_steps<A: AnalysisSink>(engine: &mut SelectionEngine<FixtureScene, A>, steps: &[Step]) {
    for (index, step) in steps.iter().enumerate() {
        println!("[{index:>3}] {}", describe_step(step));
        match *step {
            Step::Interactive => engine.enter_interactive(),
            Step::View => engine.enter_view(),
            Step::Arm { operation, method } => {
                if !engine.arm(operation, method) {
                    println!("  -> unavailable");
                }
            }
            Step::Clear => engine.clear_selection(),
            Step::RestoreAll => {
                let restored = engine.restore_all();
                println!("  -> restored {restored}");
            }
            Step::Down { x, y } => report(engine.handle_pointer(PointerEvent::Down(ScreenPoint::new(x, y)))),
            Step::Move { x, y } => report(engine.handle_pointer(PointerEvent::Move(ScreenPoint::new(x, y)))),
            Step::Up { x, y } => report(engine.handle_pointer(PointerEvent::Up(ScreenPoint::new(x, y)))),
            Step::Click { x, y } => report(engine.handle_pointer(PointerEvent::Click(ScreenPoint::new(x, y)))),
            Step::Drag { from, to } => {
                report(engine.handle_pointer(PointerEvent::Down(from)));
                report(engine.handle_pointer(PointerEvent::Move(to)));
                report(engine.handle_pointer(PointerEvent::Up(to)));
            }
        }
    }
}

fn describe_step(step: &Step) -> String {
    match step {
        Step::Interactive => "interactive mode".to_string(),
        Step::View => "view mode".to_string(),
        Step::Arm { operation, method } => format!("arm {operation:?} by {method:?}"),
        Step::Clear => "clear selection".to_string(),
        Step::RestoreAll => "restore all".to_string(),
        Step::Down { x, y } => format!("pointer down ({x}, {y})"),
        Step::Move { x, y } => format!("pointer move ({x}, {y})"),
        Step::Up { x, y } => format!("pointer up ({x}, {y})"),
        Step::Click { x, y } => format!("click ({x}, {y})"),
        Step::Drag { from, to } => format!("drag ({}, {}) -> ({}, {})", from.x, from.y, to.x, to.y),
    }
}

fn report(outcome: Outcome) {
    match outcome {
        Outcome::Ignored | Outcome::SelectionStarted | Outcome::AreaDragStarted => {}
        Outcome::PreviewUpdated(Some(rect)) => println!("  -> preview {}", rect.clipboard_text()),
        Outcome::PreviewUpdated(None) => println!("  -> preview unavailable"),
        Outcome::SelectionCommitted(rect) => {
            println!("  -> selected {} ({:.3} km²)", rect.clipboard_text(), rect.area_km2())
        }
        Outcome::SelectionAborted => println!("  -> selection aborted"),
        Outcome::FeatureHidden(feature) => println!("  -> hid feature {feature}"),
        Outcome::FeatureRestored => println!("  -> restored nearest feature"),
        Outcome::Miss => println!("  -> nothing there"),
        Outcome::AreaApplied(summary) => println!(
            "  -> {} feature(s) affected ({} samples)",
            summary.affected, summary.samples
        ),
    }
}

fn summarize<A: AnalysisSink>(engine: &SelectionEngine<FixtureScene, A>) {
    let session = engine.session();
    println!();
    println!("Status: {}", session.status_line());
    println!("Mode: {:?}", session.mode());
    match session.armed() {
        Some(armed) => println!("Armed: {:?} by {:?}", armed.operation, armed.method),
        None => println!("Armed: none"),
    }
    match session.active_selection() {
        Some(rect) => println!("Selection: {} ({:.3} km²)", rect.clipboard_text(), rect.area_km2()),
        None => println!("Selection: none"),
    }
    let hidden: Vec<String> = engine.registry().records().iter().map(|r| r.feature().to_string()).collect();
    println!("Hidden features ({}): {}", hidden.len(), hidden.join(", "));
}

async fn analyze(config: &Config, bbox: GeoRectangle) -> Result<()> {
    let client = AnalysisClient::new(config).context("Failed to create analysis client")?;
    println!("Analyzing {} via {}...", bbox.clipboard_text(), client.endpoint());

    let request = AnalysisRequest::new(bbox, config.scenario_text.clone());
    let result = client.analyze(&request).await.context("Analysis request failed")?;
    print_report(&result);
    Ok(())
}

/// Helper to print an analysis report
fn print_report(result: &AnalysisResult) {
    let current = &result.scenarios.current;
    let future = &result.scenarios.future;

    println!();
    println!("City: {}", result.metadata.city);
    for report in [current, future] {
        println!(
            "{:<8} AQI {:>6.1}  {:<12} (LR {:.1} / DT {:.1} / RF {:.1})",
            report.label,
            report.average_aqi,
            report.category().label(),
            report.predictions.linear_regression,
            report.predictions.decision_tree,
            report.predictions.random_forest,
        );
    }
    println!("Trend: {:?} ({:+.1})", result.trend(), result.aqi_delta());
    if let Some(params) = &result.simulation_params {
        println!("Simulation: {params}");
    }
}
