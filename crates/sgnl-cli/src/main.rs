use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sgnl_core::{Candidate, Error as CoreError, GateConfig};
use sgnl_local::{DensityEngine, GateOrchestrator, LocalFetcher, StructuralHeuristicScorer};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "sgnl")]
#[command(about = "Content signal scoring and analysis gating", long_about = None)]
struct Cli {
    #[command(flatten)]
    overrides: ConfigOverrides,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch a URL and print its extraction (canonical text, metadata, scores).
    Extract(ExtractCmd),
    /// Gate a URL: extract, check density, and score structure when worth analyzing.
    Scan(ScanCmd),
    /// Score raw HTML structurally (reads stdin when --file is absent).
    ScoreHtml(ScoreHtmlCmd),
    /// Batch density check over pre-fetched candidates (no network).
    CheckDensity(CheckDensityCmd),
    /// Batch analysis: fetch and score each candidate, then rank.
    Analyze(AnalyzeCmd),
    /// Print the effective configuration and estimator availability (json).
    Doctor,
    /// Print version info.
    Version(VersionCmd),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Extract(_) => "extract",
            Commands::Scan(_) => "scan",
            Commands::ScoreHtml(_) => "score-html",
            Commands::CheckDensity(_) => "check-density",
            Commands::Analyze(_) => "analyze",
            Commands::Doctor => "doctor",
            Commands::Version(_) => "version",
        }
    }
}

/// Flags that take precedence over `SGNL_*` environment values.
#[derive(clap::Args, Debug, Default)]
struct ConfigOverrides {
    /// Combined density below this skips analysis.
    #[arg(long, global = true)]
    density_threshold: Option<f64>,
    /// Max characters of content handed to analysis.
    #[arg(long, global = true)]
    max_content_chars: Option<usize>,
    /// Per-fetch deadline (ms); applies to every fetch path.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
    /// Max in-flight fetches for `analyze`.
    #[arg(long, global = true)]
    concurrency: Option<usize>,
}

impl ConfigOverrides {
    fn apply(&self, mut cfg: GateConfig) -> GateConfig {
        if let Some(t) = self.density_threshold {
            cfg.density_threshold = t;
        }
        if let Some(n) = self.max_content_chars {
            cfg.max_content_chars = n;
        }
        if let Some(ms) = self.timeout_ms {
            cfg.fetch_timeout_ms = ms;
            cfg.heuristic_fetch_timeout_ms = ms;
            cfg.batch_fetch_timeout_ms = ms;
        }
        if let Some(n) = self.concurrency {
            cfg.batch_concurrency = n.max(1);
        }
        cfg
    }
}

#[derive(clap::Args, Debug)]
struct ExtractCmd {
    url: String,
    /// Run the density metrics over the whole text instead of the quick-scan prefix.
    #[arg(long)]
    force_depth: bool,
}

#[derive(clap::Args, Debug)]
struct ScanCmd {
    url: String,
}

#[derive(clap::Args, Debug)]
struct ScoreHtmlCmd {
    /// HTML file to score (default: stdin).
    #[arg(long)]
    file: Option<PathBuf>,
    /// Query context for the code-density check.
    #[arg(long, default_value = "")]
    query: String,
}

#[derive(clap::Args, Debug)]
struct CheckDensityCmd {
    /// JSON file: an array of candidates, or an object with a `results` array ("-" = stdin).
    #[arg(long)]
    input: PathBuf,
    /// Override the density threshold for this check only.
    #[arg(long)]
    threshold: Option<f64>,
}

#[derive(clap::Args, Debug)]
struct AnalyzeCmd {
    /// JSON file: an array of candidates, or an object with a `results` array ("-" = stdin).
    #[arg(long)]
    input: PathBuf,
    #[arg(long)]
    query: String,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

fn init_tracing() {
    let filter = std::env::var("SGNL_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(EnvFilter::new)
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    // stdout carries JSON; logs go to stderr.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init();
}

fn load_env_file() {
    // Opt-in only; never overrides the process environment.
    if let Ok(p) = std::env::var("SGNL_ENV_FILE") {
        let p = p.trim();
        if !p.is_empty() {
            if let Err(e) = dotenvy::from_path(p) {
                eprintln!("sgnl: could not load SGNL_ENV_FILE={p}: {e}");
            }
        }
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut s = String::new();
        std::io::stdin().read_to_string(&mut s)?;
        return Ok(s);
    }
    std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

fn parse_candidates(raw: &str) -> Result<Vec<Candidate>> {
    let v: serde_json::Value = serde_json::from_str(raw).context("input is not valid JSON")?;
    let items = match v {
        serde_json::Value::Array(_) => v,
        serde_json::Value::Object(mut m) => match m.remove("results").or_else(|| m.remove("items"))
        {
            Some(arr @ serde_json::Value::Array(_)) => arr,
            _ => anyhow::bail!("input object must carry a `results` array"),
        },
        _ => anyhow::bail!("input must be a JSON array or an object with `results`"),
    };
    serde_json::from_value(items).context("candidates did not match the expected shape")
}

fn print_json<T: serde::Serialize>(v: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(v)?);
    Ok(())
}

fn orchestrator(cfg: GateConfig) -> Result<GateOrchestrator> {
    let fetcher = LocalFetcher::new().map_err(|e| anyhow::anyhow!(e.to_string()))?;
    Ok(GateOrchestrator::new(Arc::new(fetcher), cfg))
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env_file();
    init_tracing();

    let cli = Cli::parse();
    let cfg = cli.overrides.apply(GateConfig::from_env());
    info!(
        target: "sgnl::cli",
        command = cli.command.name(),
        density_threshold = cfg.density_threshold,
        "dispatch"
    );

    match cli.command {
        Commands::Extract(args) => {
            let gate = orchestrator(cfg)?;
            let result = gate
                .extractor()
                .extract_from_url(&args.url, args.force_depth)
                .await;
            print_json(&result)?;
            if result.is_error() {
                std::process::exit(1);
            }
        }
        Commands::Scan(args) => {
            let gate = orchestrator(cfg)?;
            match gate.scan(&args.url).await {
                Ok(decision) => print_json(&decision)?,
                Err(CoreError::InsufficientContent { chars, reason }) => {
                    print_json(&serde_json::json!({
                        "ok": false,
                        "url": args.url,
                        "error": {
                            "kind": "insufficient_content",
                            "chars": chars,
                            "message": reason,
                        },
                    }))?;
                    std::process::exit(2);
                }
                Err(e) => return Err(anyhow::anyhow!(e.to_string())),
            }
        }
        Commands::ScoreHtml(args) => {
            let markup = match &args.file {
                Some(p) => read_input(p)?,
                None => read_input(Path::new("-"))?,
            };
            let score = StructuralHeuristicScorer::new().score(&markup, &args.query);
            print_json(&score)?;
        }
        Commands::CheckDensity(args) => {
            let candidates = parse_candidates(&read_input(&args.input)?)?;
            let threshold = args.threshold.unwrap_or(cfg.density_threshold);
            let gate = orchestrator(cfg)?;
            print_json(&gate.check_density(candidates, threshold))?;
        }
        Commands::Analyze(args) => {
            let candidates = parse_candidates(&read_input(&args.input)?)?;
            let gate = orchestrator(cfg)?;
            print_json(&gate.analyze_candidates(&args.query, candidates).await)?;
        }
        Commands::Doctor => {
            let engine = DensityEngine::from_config(&cfg);
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "doctor",
                "ok": true,
                "name": "sgnl",
                "version": env!("CARGO_PKG_VERSION"),
                "config": cfg,
                "estimators": {
                    "propositions": engine.has_proposition_estimator(),
                    "readability": engine.has_readability_estimator(),
                },
                "env_file": std::env::var("SGNL_ENV_FILE")
                    .ok()
                    .is_some_and(|v| !v.trim().is_empty()),
            });
            print_json(&v)?;
        }
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "version",
                "ok": true,
                "name": "sgnl",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("sgnl {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{}", v),
            }
        }
    }
    Ok(())
}
