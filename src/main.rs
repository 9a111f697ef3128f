use clap::{Parser, Subcommand, ValueEnum};
use env_logger::{Builder, Env};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use visual_parity::capture::{
    AnyAcquirer, CaptureError, CommandAcquirer, ServiceAcquirer, SyntheticAcquirer, check_health, render_page,
};
use visual_parity::config::{self, DEFAULT_LOG_FILTER, ENV_LOG};
use visual_parity::report::{ReportDocument, ReportMeta};
use visual_parity::{ArtifactLayout, DeviceProfile, Orchestrator, PageSet, RunContext};

/// Visual Parity - staging vs production visual regression
#[derive(Parser, Debug)]
#[command(
    name = "visual-parity",
    about = "Capture staging and production pages, diff them and write a self-contained report",
    after_help = "ENVIRONMENT VARIABLES:\n\
        VISUAL_PARITY_SCREENSHOT_DIR     Artifact root (default: screenshots)\n\
        VISUAL_PARITY_REPORT_DIR         Report directory (default: .)\n\
        VISUAL_PARITY_DEVICE             Device profile (default: desktop)\n\
        VISUAL_PARITY_CAPTURE_TIMEOUT    Per-capture timeout in seconds (default: 60)\n\
        VISUAL_PARITY_RUN_DEADLINE       Whole-run deadline in seconds (default: 1800)\n\
        VISUAL_PARITY_WORKERS            Pages in flight at once (default: 1)\n\
        VISUAL_PARITY_CAPTURE_COMMAND    Capture command template for --acquirer command\n\
        VISUAL_PARITY_CAPTURE_SERVICE    Screenshot service endpoint for --acquirer service\n\
        VISUAL_PARITY_LOG                Log filter (default: info)\n\n\
        EXIT STATUS:\n\
        0  every page passed\n\
        1  at least one page failed or errored\n\
        2  the run itself could not complete"
)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Capture every page in both environments, diff them and write the report
    Compare {
        /// Page set file (JSON with staging/prod base URLs and paths)
        #[arg(short, long)]
        config: PathBuf,

        /// Device profile: desktop, laptop, tablet, mobile, WxH, or all
        #[arg(short, long)]
        device: Option<String>,

        /// Number of pages compared concurrently
        #[arg(short, long)]
        workers: Option<usize>,

        /// How screenshots are taken
        #[arg(short, long, value_enum, default_value = "command")]
        acquirer: AcquirerKind,

        /// Capture command template, e.g. "shoot --url {url} --out {output} --size {width}x{height}"
        #[arg(long)]
        command: Option<String>,

        /// Screenshot service endpoint
        #[arg(long)]
        service: Option<String>,

        /// Per-capture timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Whole-run deadline in seconds
        #[arg(long)]
        deadline: Option<u64>,

        /// Artifact root directory
        #[arg(long)]
        screenshots: Option<PathBuf>,

        /// Directory for the HTML report and JSON results
        #[arg(short, long)]
        report_dir: Option<PathBuf>,

        /// Refuse to run when the page set has validation issues
        #[arg(long)]
        strict: bool,
    },

    /// Validate a page set file without capturing anything
    Check {
        /// Page set file
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Render a synthetic page screenshot (no browser needed)
    Mock {
        /// URL to render
        #[arg(short, long, default_value = "https://staging.example.com/")]
        url: String,

        /// Device profile for the viewport
        #[arg(short, long, default_value = "desktop")]
        device: String,

        /// Output file path
        #[arg(short, long, default_value = "./mock_page.png")]
        output: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AcquirerKind {
    Command,
    Service,
    Synthetic,
}

#[tokio::main]
async fn main() -> ExitCode {
    Builder::from_env(Env::default().filter_or(ENV_LOG, DEFAULT_LOG_FILTER)).init();

    let args = Args::parse();

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

/// Returns whether every compared page passed
async fn run(args: Args) -> Result<bool, Box<dyn Error>> {
    let settings = config::get();

    match args.command {
        Some(Commands::Compare {
            config: config_path,
            device,
            workers,
            acquirer,
            command,
            service,
            timeout,
            deadline,
            screenshots,
            report_dir,
            strict,
        }) => {
            let pages = PageSet::load(&config_path)?;
            for issue in pages.issues() {
                log::warn!("page set: {}", issue);
            }
            if strict {
                pages.require_valid()?;
            }

            let device = device.unwrap_or_else(|| settings.capture.device.clone());
            let devices = parse_devices(&device)?;
            let screenshot_dir = screenshots.unwrap_or_else(|| settings.output.screenshot_dir.clone());
            let report_dir = report_dir.unwrap_or_else(|| settings.output.report_dir.clone());
            let capture_timeout = timeout.map(Duration::from_secs).unwrap_or_else(|| settings.capture.timeout());
            let run_deadline = deadline.map(Duration::from_secs).unwrap_or_else(|| settings.run.deadline());
            let workers = workers.unwrap_or(settings.run.workers);

            let acquirer = build_acquirer(
                acquirer,
                command.or_else(|| settings.capture.command.clone()),
                service.or_else(|| settings.capture.service.clone()),
            )
            .await?;

            // One deadline for the whole invocation, across every device
            let deadline_at = tokio::time::Instant::now() + run_deadline;

            let mut all_passed = true;
            for device in devices {
                let layout = ArtifactLayout::new(&screenshot_dir, device);
                let report_path = layout.report_path(&report_dir);
                let results_path = layout.results_path(&report_dir);

                let ctx = RunContext::new(layout)
                    .capture_timeout(capture_timeout)
                    .run_deadline(run_deadline)
                    .deadline_at(deadline_at)
                    .workers(workers);
                let results = Orchestrator::new(acquirer.clone(), ctx).run(&pages).await?;

                let doc = ReportDocument::build(ReportMeta::new(&pages, device), results);
                doc.write(&report_path, &results_path)?;

                print_summary(&doc);
                println!("Report: {}", report_path.display());
                println!("Results: {}", results_path.display());

                all_passed &= doc.summary.all_passed();
            }

            Ok(all_passed)
        }

        Some(Commands::Check { config: config_path }) => {
            let pages = PageSet::load(&config_path)?;
            println!("Staging:    {}", pages.staging.base_url);
            println!("Production: {}", pages.production.base_url);
            println!("Pages:      {}", pages.len());

            if pages.issues().is_empty() {
                println!("No issues found.");
                return Ok(true);
            }
            println!("Issues:");
            for issue in pages.issues() {
                println!("  - {}", issue);
            }
            Ok(false)
        }

        Some(Commands::Mock { url, device, output }) => {
            let device = DeviceProfile::parse(&device).ok_or_else(|| invalid_device(&device))?;
            let (width, height) = device.viewport();
            let png = render_page(&url, width, height).to_png()?;
            std::fs::write(&output, &png)?;

            println!("Created mock page screenshot: {}", output.display());
            println!("  Size: {}x{} ({})", width, height, device);
            Ok(true)
        }

        None => {
            println!("Visual Parity - staging vs production visual regression");
            println!();
            println!("Usage: visual-parity <COMMAND>");
            println!();
            println!("Commands:");
            println!("  compare  Capture, diff and report every page in a page set");
            println!("  check    Validate a page set file");
            println!("  mock     Render a synthetic page screenshot");
            println!();
            println!("Run with --help for more information.");
            Ok(true)
        }
    }
}

fn parse_devices(value: &str) -> Result<Vec<DeviceProfile>, String> {
    if value.eq_ignore_ascii_case("all") {
        return Ok(DeviceProfile::all_presets());
    }
    DeviceProfile::parse(value)
        .map(|d| vec![d])
        .ok_or_else(|| invalid_device(value))
}

fn invalid_device(value: &str) -> String {
    format!(
        "Invalid device '{}'. Use: desktop, laptop, tablet, mobile, WxH, or all",
        value
    )
}

async fn build_acquirer(
    kind: AcquirerKind,
    command: Option<String>,
    service: Option<String>,
) -> Result<AnyAcquirer, CaptureError> {
    match kind {
        AcquirerKind::Command => {
            let template = command.ok_or_else(|| {
                CaptureError::Config(
                    "no capture command; pass --command or set VISUAL_PARITY_CAPTURE_COMMAND".to_string(),
                )
            })?;
            Ok(AnyAcquirer::Command(CommandAcquirer::from_template(&template)?))
        }
        AcquirerKind::Service => {
            let endpoint = service.ok_or_else(|| {
                CaptureError::Config(
                    "no screenshot service; pass --service or set VISUAL_PARITY_CAPTURE_SERVICE".to_string(),
                )
            })?;
            match check_health(&endpoint, 5).await {
                Ok(true) => log::info!("screenshot service responding at {}", endpoint),
                Ok(false) | Err(_) => {
                    log::warn!("screenshot service not responding at {}; captures will likely fail", endpoint)
                }
            }
            Ok(AnyAcquirer::Service(ServiceAcquirer::new(endpoint)))
        }
        AcquirerKind::Synthetic => Ok(AnyAcquirer::Synthetic(SyntheticAcquirer::new())),
    }
}

fn print_summary(doc: &ReportDocument) {
    println!();
    println!("Device {} ({}x{})", doc.meta.device, doc.meta.viewport.0, doc.meta.viewport.1);
    for row in &doc.rows {
        let score = row
            .result
            .outcome
            .similarity()
            .map(|s| format!("{:6.2}%", s))
            .unwrap_or_else(|| "      -".to_string());
        let reason = row
            .result
            .outcome
            .error_message()
            .map(|m| format!("  ({})", m))
            .unwrap_or_default();
        println!("  {:<5} {} {}{}", row.verdict.label(), score, row.result.page, reason);
    }
    let summary = &doc.summary;
    println!(
        "Total: {}  Passed: {}  Failed: {}  Errors: {}",
        summary.total, summary.passed, summary.failed, summary.errors
    );
}
