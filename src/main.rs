#![warn(clippy::all, clippy::dbg_macro)]

use std::process::ExitCode;

use anstream::{eprintln, println};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::InfoLevel;
use owo_colors::OwoColorize;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _};

use gitgov_audit::actor::EnvActorService;
use gitgov_audit::config::AuditorConfig;
use gitgov_audit::detectors::heuristic::HeuristicDetector;
use gitgov_audit::detectors::llm::LlmDetector;
use gitgov_audit::detectors::regex_detector::RegexDetector;
use gitgov_audit::detectors::Detector;
use gitgov_audit::file_access::local::LocalFileAccess;
use gitgov_audit::gate::{FailOn as GateFailOn, GatePolicy};
use gitgov_audit::orchestrator::DetectionOrchestrator;
use gitgov_audit::output::{EmitOptions, GroupBy as OutputGroupBy, OutputFormat as Format, render};
use gitgov_audit::record_store::InMemoryRecordStore;
use gitgov_audit::scope::ScopeRequest;
use gitgov_audit::vcs::GitVersionControl;
use gitgov_audit::waiver::WaiverIndex;
use gitgov_audit::waiver_author::WaiverAuthor;

#[cfg(all(
    not(target_family = "windows"),
    any(target_arch = "x86_64", target_arch = "aarch64")
))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// Scans a source tree for PII, credentials, and unsafe logging exposure.
#[derive(Parser)]
#[command(name = "audit", about, version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity<InfoLevel>,

    /// What to scan: `full` (the whole tree), `diff` (changes since a ref),
    /// or an explicit glob.
    #[arg(long, default_value = "full")]
    scope: String,

    /// Git ref to diff against when `--scope=diff`.
    #[arg(long, default_value = "HEAD~1")]
    since: String,

    /// The output format to emit.
    #[arg(long, value_enum, default_value_t = CliOutputFormat::Text, env = "GITGOV_AUDIT_OUTPUT")]
    output: CliOutputFormat,

    /// Shorthand for `--output json`.
    #[arg(long)]
    json: bool,

    /// The minimum severity that causes a non-zero exit code. Falls back to
    /// `audit.yml`'s `fail-on`, then to `high`, when omitted.
    #[arg(long, value_enum, env = "GITGOV_AUDIT_FAIL_ON")]
    fail_on: Option<CliFailOn>,

    /// Additional detector tiers to run on top of the always-on regex tier.
    #[arg(long, value_enum, num_args = 1.., value_delimiter = ',')]
    detector: Vec<CliDetector>,

    /// Comma-separated include globs.
    #[arg(long, value_delimiter = ',')]
    include: Vec<String>,

    /// Comma-separated exclude globs.
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<String>,

    /// Emit only a single line per critical finding, nothing else.
    #[arg(long)]
    quiet: bool,

    /// Print only the summary, omitting findings entirely.
    #[arg(long)]
    summary: bool,

    /// How to group findings in text output.
    #[arg(long, value_enum, default_value_t = CliGroupBy::File)]
    group_by: CliGroupBy,

    /// Cap the number of findings shown; the remainder are counted but hidden.
    #[arg(long)]
    max_findings: Option<usize>,

    /// The directory to audit.
    #[arg(default_value = ".")]
    path: Utf8PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Create or list waivers.
    Waive(WaiveArgs),
}

#[derive(clap::Args)]
struct WaiveArgs {
    /// The finding fingerprint to waive.
    fingerprint: Option<String>,

    /// Why this finding is acceptable to suppress.
    #[arg(long)]
    justification: Option<String>,

    /// An optional RFC 3339 expiry for the waiver.
    #[arg(long)]
    expires_at: Option<chrono::DateTime<chrono::Utc>>,

    /// List active waivers instead of creating one.
    #[arg(long)]
    list: bool,
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
enum CliOutputFormat {
    #[default]
    Text,
    Json,
    Sarif,
}

impl From<CliOutputFormat> for Format {
    fn from(value: CliOutputFormat) -> Self {
        match value {
            CliOutputFormat::Text => Format::Text,
            CliOutputFormat::Json => Format::Json,
            CliOutputFormat::Sarif => Format::Sarif,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum CliFailOn {
    Critical,
    High,
    Medium,
    Low,
    None,
}

impl From<CliFailOn> for GateFailOn {
    fn from(value: CliFailOn) -> Self {
        match value {
            CliFailOn::Critical => GateFailOn::Critical,
            CliFailOn::High => GateFailOn::High,
            CliFailOn::Medium => GateFailOn::Medium,
            CliFailOn::Low => GateFailOn::Low,
            CliFailOn::None => GateFailOn::None,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliDetector {
    Regex,
    Heuristic,
    Llm,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum CliGroupBy {
    File,
    Severity,
    Category,
}

impl From<CliGroupBy> for OutputGroupBy {
    fn from(value: CliGroupBy) -> Self {
        match value {
            CliGroupBy::File => OutputGroupBy::File,
            CliGroupBy::Severity => OutputGroupBy::Severity,
            CliGroupBy::Category => OutputGroupBy::Category,
        }
    }
}

fn init_tracing(verbose: &clap_verbosity_flag::Verbosity<InfoLevel>) {
    let filter = EnvFilter::builder()
        .with_default_directive(verbose.tracing_level_filter().into())
        .from_env()
        .expect("failed to parse RUST_LOG");

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().without_time())
        .with(filter)
        .init();
}

fn run_waive(args: &WaiveArgs) -> anyhow::Result<ExitCode> {
    let record_store = InMemoryRecordStore::new();
    let actor_service = EnvActorService;
    let author = WaiverAuthor::new(&record_store, &actor_service);

    if args.list {
        for waiver in author.list_active()? {
            println!("{}  {}", waiver.fingerprint, waiver.justification);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let fingerprint = args
        .fingerprint
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("a fingerprint is required unless --list is given"))?;
    let justification = args
        .justification
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("--justification is required to create a waiver"))?;

    let waiver = author.create_by_fingerprint(fingerprint, justification, args.expires_at)?;
    println!("waived {}", waiver.fingerprint);
    Ok(ExitCode::SUCCESS)
}

fn run_audit(cli: &Cli) -> anyhow::Result<ExitCode> {
    let config = AuditorConfig::discover(&cli.path)?;

    // Tier 0 (regex) is always on; `--detector` only adds to it.
    let mut detectors_enabled: Vec<Box<dyn Detector>> = vec![Box::new(RegexDetector::new())];
    let detector_tiers: &[CliDetector] = &cli.detector;

    if detector_tiers.contains(&CliDetector::Heuristic) {
        detectors_enabled.push(Box::new(HeuristicDetector::new()));
    }
    let llm_detector = if detector_tiers.contains(&CliDetector::Llm) {
        Some(LlmDetector::new(config.detectors.llm.clone()))
    } else {
        None
    };

    let orchestrator = DetectionOrchestrator::new(detectors_enabled, llm_detector);

    let file_access = LocalFileAccess::new(cli.path.clone());
    let version_control = GitVersionControl::new(cli.path.to_string());

    let record_store = InMemoryRecordStore::new();
    let author = WaiverAuthor::new(&record_store, &EnvActorService);
    // A failing waiver store degrades to an empty waiver set rather than
    // aborting the run: scan completeness is preserved, the gate just sees
    // every finding as new.
    let waivers = WaiverIndex::new(author.list_active().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "failed to load waivers, proceeding with none active");
        Vec::new()
    }));

    let pipeline = gitgov_audit::AuditPipeline::new(&file_access, Some(&version_control), &orchestrator, &waivers);

    let mut include = if cli.include.is_empty() { config.include.clone() } else { cli.include.clone() };
    let exclude = if cli.exclude.is_empty() { config.exclude.clone() } else { cli.exclude.clone() };

    // `--scope` selects a mode (`full`, `diff`, `baseline`) or, when it
    // matches none of those, is itself a glob narrowing `include`.
    if !matches!(cli.scope.as_str(), "full" | "diff" | "baseline") {
        include.push(cli.scope.clone());
    }

    let changed_since = match cli.scope.as_str() {
        "diff" => Some(cli.since.clone()),
        "baseline" => Some(config.baseline_ref.clone().unwrap_or_else(|| cli.since.clone())),
        _ => None,
    };
    let request = ScopeRequest {
        include,
        exclude,
        changed_since,
        base_dir: Some(cli.path.to_string()),
    };

    let result = pipeline.audit(&request)?;

    let format = if cli.json { Format::Json } else { cli.output.into() };
    let options = EmitOptions {
        quiet: cli.quiet,
        summary: cli.summary,
        group_by: cli.group_by.into(),
        max_findings: cli.max_findings.or(config.max_findings),
    };

    println!("{}", render(&result, format, &options));

    let fail_on = cli.fail_on.map(GateFailOn::from).unwrap_or(config.fail_on);
    let gate = GatePolicy::new(fail_on);

    Ok(if gate.exit_code(&result) == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn main() -> ExitCode {
    if std::env::var("CI").is_ok() {
        std::panic::set_hook(Box::new(|info| {
            eprintln!("FATAL: audit crashed. This is a bug that should be reported.");
            eprintln!("Panic information:\n{info}");
        }));
    } else {
        human_panic::setup_panic!();
    }

    let cli = Cli::parse();
    init_tracing(&cli.verbose);

    let outcome = match &cli.command {
        Some(Command::Waive(args)) => run_waive(args),
        None => run_audit(&cli),
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{fatal}: {err}", fatal = "fatal".red().bold());
            ExitCode::FAILURE
        }
    }
}
