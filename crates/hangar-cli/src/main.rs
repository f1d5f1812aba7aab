use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use hangar::auth::{self, mask_key};
use hangar::config::{self, Config, ResolvedPublication};
use hangar::engine::{Engine, Reporter, RunOptions};
use hangar::report;
use hangar::types::{Artifact, Dependency, RunReport, normalize_endpoint};

/// Log filter used with `--verbose`.
const VERBOSE_FILTER: &str = "hangar=debug,hangar_auth=debug,hangar_client=debug,hangar_config=debug";

#[derive(Parser, Debug)]
#[command(name = "hangar", version)]
#[command(about = "Publish plugin versions and documentation pages to Hangar")]
struct Cli {
    /// Path to the config file (default: nearest .hangar.toml, searching upwards)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Restrict to specific publications (repeatable). If omitted, all publications are used.
    #[arg(long = "publication")]
    publications: Vec<String>,

    /// Maximum concurrent page syncs per publication (default: config, else 4)
    #[arg(long)]
    jobs: Option<usize>,

    /// Timeout for every HTTP request, e.g. 30s or 2m (default: config, else 30s)
    #[arg(long)]
    timeout: Option<String>,

    /// Directory holding credentials.toml (default: $HANGAR_HOME, else ~/.hangar)
    #[arg(long)]
    hangar_home: Option<PathBuf>,

    /// Write the run report as JSON to this file.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Print debug logs to stderr. Otherwise `HANGAR_LOG` selects the log filter.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the resolved publications without contacting Hangar.
    Plan,
    /// Upload a new version for each selected publication.
    Publish,
    /// Push page contents for each selected publication.
    SyncPages {
        /// Only sync the page with this name (e.g. MainResourcePage).
        #[arg(long)]
        page: Option<String>,
    },
    /// Print config and credential diagnostics.
    Doctor,
}

struct CliReporter;

impl Reporter for CliReporter {
    fn info(&mut self, msg: &str) {
        eprintln!("[info] {msg}");
    }

    fn warn(&mut self, msg: &str) {
        eprintln!("[warn] {msg}");
    }

    fn error(&mut self, msg: &str) {
        eprintln!("[error] {msg}");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let (config_path, config) = load_config(&cli)?;
    let base_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let opts = RunOptions {
        jobs: cli.jobs.unwrap_or_else(|| config.jobs()).max(1),
        timeout: match &cli.timeout {
            Some(s) => parse_duration(s)?,
            None => config.timeout(),
        },
        hangar_home: cli.hangar_home.clone(),
    };

    let mut reporter = CliReporter;

    match &cli.cmd {
        Commands::Plan => {
            let targets = select_publications(&cli, &config, &base_dir)?;
            print_plan(&config_path, &targets);
        }
        Commands::Publish => {
            let targets = select_publications(&cli, &config, &base_dir)?;
            if targets.is_empty() {
                bail!("no publications configured in {}", config_path.display());
            }
            let engine = Engine::new(&opts)?;
            let run = engine.run_publish(&targets, &mut reporter);
            finish(&cli, &run, &mut reporter)?;
        }
        Commands::SyncPages { page } => {
            let targets = select_publications(&cli, &config, &base_dir)?;
            if targets.is_empty() {
                bail!("no publications configured in {}", config_path.display());
            }
            let engine = Engine::new(&opts)?;
            let run = engine.run_sync(&targets, page.as_deref(), &mut reporter)?;
            finish(&cli, &run, &mut reporter)?;
        }
        Commands::Doctor => {
            run_doctor(&cli, &config_path, &config, &opts, &mut reporter);
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::try_from_env("HANGAR_LOG").unwrap_or_else(|_| EnvFilter::new("off"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn parse_duration(s: &str) -> Result<Duration> {
    humantime::parse_duration(s).with_context(|| format!("invalid duration: {s}"))
}

fn load_config(cli: &Cli) -> Result<(PathBuf, Config)> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => {
            let cwd = env::current_dir().context("failed to determine current directory")?;
            config::find_config(&cwd).with_context(|| {
                format!(
                    "no {} found in {} or any parent directory",
                    config::CONFIG_FILE,
                    cwd.display()
                )
            })?
        }
    };
    let config = config::load_config_from_file(&path)?;
    debug!(path = %path.display(), publications = config.publications.len(), "loaded config");
    Ok((path, config))
}

fn select_publications(
    cli: &Cli,
    config: &Config,
    base_dir: &Path,
) -> Result<Vec<ResolvedPublication>> {
    if cli.publications.is_empty() {
        return config.resolve(base_dir);
    }
    cli.publications
        .iter()
        .map(|name| config.resolve_publication(name, base_dir))
        .collect()
}

fn finish(cli: &Cli, run: &RunReport, reporter: &mut dyn Reporter) -> Result<()> {
    print!("{}", report::render_summary(run));

    if let Some(path) = &cli.report {
        report::write_report(path, run)?;
        reporter.info(&format!("report written to {}", path.display()));
    }

    if !run.is_success() {
        bail!(
            "{} of {} operation(s) failed",
            run.failure_count(),
            run.operations.len()
        );
    }
    Ok(())
}

fn print_plan(config_path: &Path, targets: &[ResolvedPublication]) {
    println!("config: {}", config_path.display());

    for target in targets {
        let p = &target.publication;
        println!();
        println!("{}: {}@{} ({})", p.name, p.namespace(), p.version, p.channel);
        println!("  endpoint: {}", p.api_endpoint);
        if let Some(changelog) = &p.changelog {
            println!("  changelog: {} line(s)", changelog.lines().count());
        }
        for platform in &p.platforms {
            let source = match &platform.artifact {
                Artifact::Jar(path) => format!("jar {}", path.display()),
                Artifact::Url(url) => format!("url {url}"),
            };
            println!(
                "  platform {} [{}]: {source}",
                platform.name,
                platform.platform_versions.join(", ")
            );
            for dep in &platform.dependencies {
                let reference = match dep {
                    Dependency::Hangar { owner, slug, .. } => format!("hangar {owner}/{slug}"),
                    Dependency::Url { url, .. } => format!("url {url}"),
                };
                let required = if dep.required() { "required" } else { "optional" };
                println!("    depends on {} ({reference}, {required})", dep.name());
            }
        }
        for page in &p.pages {
            println!("  page {}", page.name);
        }
    }
}

fn run_doctor(
    cli: &Cli,
    config_path: &Path,
    config: &Config,
    opts: &RunOptions,
    reporter: &mut dyn Reporter,
) {
    let hangar_home = auth::hangar_home_path(cli.hangar_home.as_deref());

    println!("config: {}", config_path.display());
    println!("hangar_home: {}", hangar_home.display());
    println!("jobs: {}", opts.jobs);
    println!("timeout: {}", humantime::format_duration(opts.timeout));
    println!();

    for (name, raw) in &config.publications {
        if !cli.publications.is_empty() && !cli.publications.contains(name) {
            continue;
        }

        let endpoint = raw
            .api_endpoint
            .as_deref()
            .map(normalize_endpoint)
            .unwrap_or_else(|| config.api_endpoint());
        println!("{name}: endpoint {endpoint}");

        let info = auth::resolve_api_key(name, raw.api_key.as_deref(), Some(hangar_home.as_path()));
        match &info.key {
            Some(key) => println!(
                "{name}: api_key_detected: true ({}, {})",
                info.source,
                mask_key(key)
            ),
            None => {
                println!("{name}: api_key_detected: false");
                reporter.warn(&format!(
                    "no API key for '{name}'; set {} or {}",
                    auth::publication_env_var(name),
                    auth::HANGAR_API_KEY_ENV
                ));
            }
        }
    }
}
