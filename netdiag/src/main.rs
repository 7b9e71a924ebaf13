use anyhow::{anyhow, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use enrichment::HttpEnricher;
use netdiag_core::config::{DEFAULT_PORTS, DEFAULT_TIMEOUT};
use netdiag_core::{DiagConfig, DiagError, Pipeline, Probes, Target, DEFAULT_ENDPOINT};
use reachability::{ConnectProbe, PingProbe};
use report::{ReportFormat, ReportWriter};
use resolution::SystemResolver;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod config;

/// Exit status when the target list is missing.
const EXIT_INPUT_MISSING: u8 = 2;

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_else(|_| String::new())
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat { Csv, Jsonl }

impl From<OutputFormat> for ReportFormat {
    fn from(f: OutputFormat) -> Self {
        match f {
            OutputFormat::Csv => ReportFormat::Csv,
            OutputFormat::Jsonl => ReportFormat::Jsonl,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "netdiag", version, about = "Per-target DNS, ping, TCP and IP-intelligence diagnostics")]
struct Cli {
    /// Optional config file (YAML). If omitted, loads ./netdiag.yaml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Raise log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print version information
    Version,
    /// Diagnose every target in a newline-delimited file and write one row per target
    Run(RunArgs),
}

#[derive(Debug, Default, Args)]
struct RunArgs {
    /// File with newline-delimited targets (blank lines ignored). Default: targets.txt
    #[arg(long, value_name = "FILE")]
    targets: Option<PathBuf>,
    /// Report file (overwritten). Default: report.csv
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,
    /// TCP ports: comma/range list (e.g., 22,443 or 8000-8002). Default: 22,443
    #[arg(long)]
    ports: Option<String>,
    /// Timeout per probe, DNS lookup and API call in milliseconds. Default: 2000
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// IP lookup URL with an {ip} placeholder
    #[arg(long)]
    endpoint: Option<String>,
    /// Targets diagnosed at once; rows keep input order. Default: 1
    #[arg(long)]
    concurrency: Option<usize>,
    /// Abort outstanding probes after this many seconds; remaining rows are still written
    #[arg(long)]
    deadline_secs: Option<u64>,
    /// Report format. Default: csv
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,
    /// Ignore HTTP(S)_PROXY for the IP lookup
    #[arg(long, default_value_t = false)]
    no_proxy: bool,
}

/// Effective settings after merging CLI flags over the config file over defaults.
#[derive(Debug, PartialEq, Eq)]
struct RunSettings {
    targets: PathBuf,
    out: PathBuf,
    diag: DiagConfig,
    deadline: Option<Duration>,
    format: ReportFormat,
    no_proxy: bool,
}

fn resolve_settings(args: RunArgs, file: Option<config::FileConfig>) -> Result<RunSettings> {
    let file = file.unwrap_or_default();
    let ports = match args.ports.or(file.ports) {
        Some(spec) => reachability::parse_ports(&spec)?,
        None => DEFAULT_PORTS.to_vec(),
    };
    let format = match (args.format, file.format.as_deref()) {
        (Some(f), _) => f.into(),
        (None, Some("csv")) | (None, None) => ReportFormat::Csv,
        (None, Some("jsonl")) => ReportFormat::Jsonl,
        (None, Some(other)) => return Err(anyhow!("unknown report format in config: {}", other)),
    };
    let diag = DiagConfig {
        timeout: args.timeout_ms.or(file.timeout_ms).map(Duration::from_millis).unwrap_or(DEFAULT_TIMEOUT),
        ports,
        endpoint: args.endpoint.or(file.endpoint).unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        concurrency: args.concurrency.or(file.concurrency).unwrap_or(1),
    };
    Ok(RunSettings {
        targets: args.targets.or(file.targets).unwrap_or_else(|| PathBuf::from("targets.txt")),
        out: args.out.or(file.out).unwrap_or_else(|| PathBuf::from("report.csv")),
        diag,
        deadline: args.deadline_secs.or(file.deadline_secs).filter(|s| *s > 0).map(Duration::from_secs),
        format,
        no_proxy: args.no_proxy || file.no_proxy.unwrap_or(false),
    })
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(DiagError::InputMissing(path)) = e.downcast_ref::<DiagError>() {
                eprintln!("error: targets file not found: {}", path.display());
                return ExitCode::from(EXIT_INPUT_MISSING);
            }
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Version => {
            println!("netdiag {} (core {})", env!("CARGO_PKG_VERSION"), netdiag_core::version());
            Ok(())
        }
        Commands::Run(args) => {
            let file_cfg = config::load_config(cli.config.as_deref())?;
            let settings = resolve_settings(args, file_cfg)?;
            // A missing target list ends the run before anything is probed or written.
            let targets = report::read_targets(&settings.targets)?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_batch(settings, targets))
        }
    }
}

async fn run_batch(settings: RunSettings, targets: Vec<Target>) -> Result<()> {
    let enricher = if settings.no_proxy {
        HttpEnricher::without_proxy(&settings.diag.endpoint)?
    } else {
        HttpEnricher::new(&settings.diag.endpoint)?
    };
    let icmp = PingProbe::for_host();
    debug!(flavor = ?icmp.flavor(), "selected ping flavor");
    let probes = Probes {
        resolver: Arc::new(SystemResolver),
        icmp: Arc::new(icmp),
        tcp: Arc::new(ConnectProbe),
        enricher: Arc::new(enricher),
    };
    let cancel = CancellationToken::new();
    let pipeline = Pipeline::new(settings.diag.clone(), probes)?.with_cancellation(cancel.clone());

    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling outstanding probes");
                cancel.cancel();
            }
        })
    };
    let deadline = settings.deadline.map(|d| {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(d).await;
            warn!(deadline_secs = d.as_secs(), "deadline reached, cancelling outstanding probes");
            cancel.cancel();
        })
    });

    let mut writer = ReportWriter::create(&settings.out, settings.format, &settings.diag.ports)?;
    let start = Instant::now();
    info!(
        targets = targets.len(),
        concurrency = settings.diag.concurrency,
        started_at = %now_rfc3339(),
        "diagnostic run started"
    );
    let processed = pipeline.run_with(targets, |record| writer.write(&record)).await?;
    writer.finish()?;
    info!(
        processed,
        duration_ms = start.elapsed().as_millis() as u64,
        ended_at = %now_rfc3339(),
        cancelled = cancel.is_cancelled(),
        "diagnostic run finished"
    );

    interrupt.abort();
    if let Some(h) = deadline {
        h.abort();
    }

    let shown = std::fs::canonicalize(&settings.out).unwrap_or(settings.out);
    println!("OK: report written -> {}", shown.display());
    println!("targets processed: {}", processed);
    Ok(())
}
