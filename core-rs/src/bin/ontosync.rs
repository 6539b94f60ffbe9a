//! ontosync CLI
//!
//! - `ontosync check <CONFIG> [ONTOLOGY]` validates an ontology, exit 0/1
//! - `ontosync import <REPO_URL> --config <CONFIG> --ontology-file <OWL>`
//!   reconciles the repository with the ontology inside one transaction
//!
//! Both exit with 2 when the configuration or ontology file is unusable.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use ontosync_core::checker::CheckReport;
use ontosync_core::{
    logging, Config, HttpStore, ImportReport, OntologyChecker, OntologyGraph, OntologyImporter, OntologyInfo,
    OwlBinaryUploader, RepositoryConfig, SyncError,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "ontosync")]
#[command(version)]
#[command(about = "Checks an OWL ontology and imports it into a resource repository", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check restrictions and properties of an ontology
    Check {
        /// Configuration file
        config: PathBuf,

        /// Ontology file; read from the repository when omitted
        ontology: Option<PathBuf>,

        /// Repository to read the ontology from (defaults to repository.url)
        #[arg(long)]
        repo: Option<String>,

        #[arg(long)]
        user: Option<String>,

        #[arg(long)]
        password: Option<String>,

        /// Only check properties in this namespace (defaults to the ontology namespace)
        #[arg(long)]
        namespace: Option<String>,

        /// Check every property regardless of its namespace
        #[arg(long, conflicts_with = "namespace")]
        all_properties: bool,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Import an ontology into a repository
    Import {
        /// Repository API root
        repo_url: String,

        #[arg(long, short)]
        config: PathBuf,

        #[arg(long)]
        user: Option<String>,

        /// Falls back to the ONTOSYNC_PASSWORD environment variable
        #[arg(long)]
        password: Option<String>,

        #[arg(long)]
        ontology_file: PathBuf,

        /// Media type of the ontology file (guessed from its extension)
        #[arg(long)]
        media_type: Option<String>,

        #[arg(long)]
        ontology_version: Option<String>,

        /// YYYY-MM-DD or RFC 3339
        #[arg(long)]
        ontology_date: Option<String>,

        #[arg(long)]
        ontology_url: Option<String>,

        #[arg(long)]
        ontology_info: Option<String>,

        #[arg(long)]
        concurrency: Option<usize>,

        #[arg(long)]
        retry_budget: Option<usize>,

        /// Do not upload the owl file itself
        #[arg(long)]
        skip_binary: bool,

        #[arg(long, short = 'v')]
        verbose: bool,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check {
            config,
            ontology,
            repo,
            user,
            password,
            namespace,
            all_properties,
            format,
        } => {
            logging::init(true);
            let scope = if all_properties { Scope::All } else { Scope::Namespace(namespace) };
            handle_check(&config, ontology.as_deref(), repo, user, password, scope, format).await
        }

        Commands::Import {
            repo_url,
            config,
            user,
            password,
            ontology_file,
            media_type,
            ontology_version,
            ontology_date,
            ontology_url,
            ontology_info,
            concurrency,
            retry_budget,
            skip_binary,
            verbose,
            format,
        } => {
            logging::init(verbose);
            let info = OntologyInfo {
                version: ontology_version,
                date: ontology_date,
                url: ontology_url,
                info: ontology_info,
            };
            let args = ImportArgs {
                repo_url,
                user,
                password,
                ontology_file,
                media_type,
                concurrency,
                retry_budget,
                skip_binary,
                format,
            };
            handle_import(&config, args, info).await
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(failure_code(&e))
        }
    }
}

/// 2 when the run failed before reaching the repository, 1 otherwise
fn failure_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<SyncError>() {
        Some(e) if e.is_preflight() => 2,
        _ => 1,
    }
}

enum Scope {
    All,
    Namespace(Option<String>),
}

fn password_or_env(password: Option<String>) -> Option<String> {
    password.or_else(|| std::env::var("ONTOSYNC_PASSWORD").ok())
}

/// The configured repository with command line overrides applied
fn repository(config: &Config, url: Option<String>, user: Option<String>) -> anyhow::Result<RepositoryConfig> {
    let mut repo = match (config.repository.clone(), url) {
        (Some(mut repo), Some(url)) => {
            repo.url = url;
            repo
        }
        (Some(repo), None) => repo,
        (None, Some(url)) => RepositoryConfig {
            url,
            user: None,
            managed_prefixes: Vec::new(),
        },
        (None, None) => bail!("No repository URL given and none configured"),
    };
    if user.is_some() {
        repo.user = user;
    }
    Ok(repo)
}

fn connect(
    config: &Config,
    url: Option<String>,
    user: Option<String>,
    password: Option<String>,
) -> anyhow::Result<HttpStore> {
    let repo = repository(config, url, user)?;
    let store = HttpStore::from_config(&repo, config.schema.id(), password_or_env(password).as_deref())?;
    Ok(store)
}

async fn handle_check(
    config_path: &Path,
    ontology: Option<&Path>,
    repo: Option<String>,
    user: Option<String>,
    password: Option<String>,
    scope: Scope,
    format: OutputFormat,
) -> anyhow::Result<ExitCode> {
    let config = Config::load(config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    let mut graph = match ontology {
        Some(path) => OntologyGraph::load_file(path, None)
            .with_context(|| format!("Failed to load ontology from {}", path.display()))?,
        None => {
            let store = connect(&config, repo, user, password)?;
            info!("reading the ontology from {}", store.base_url());
            OntologyGraph::load_from_store(&store, &config.schema).await?
        }
    };

    let namespace = match scope {
        Scope::All => None,
        Scope::Namespace(ns) => Some(ns.unwrap_or_else(|| config.schema.namespaces.ontology.clone())),
    };

    let mut checker = OntologyChecker::new(&mut graph, &config.schema, config.import.restriction_ids);
    let report = checker.check(namespace.as_deref());
    print_check_report(&report, format)?;

    Ok(if report.is_valid() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn print_check_report(report: &CheckReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            for diagnostic in &report.diagnostics {
                println!("{}", diagnostic);
            }
            println!(
                "{} passed, {} failed, {} skipped",
                report.passed, report.failed, report.skipped
            );
        }
    }
    Ok(())
}

struct ImportArgs {
    repo_url: String,
    user: Option<String>,
    password: Option<String>,
    ontology_file: PathBuf,
    media_type: Option<String>,
    concurrency: Option<usize>,
    retry_budget: Option<usize>,
    skip_binary: bool,
    format: OutputFormat,
}

async fn handle_import(config_path: &Path, args: ImportArgs, info: OntologyInfo) -> anyhow::Result<ExitCode> {
    let config = Config::load(config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    let mut importer = OntologyImporter::new(&config);
    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 {
            bail!("--concurrency must be at least 1");
        }
        importer = importer.with_concurrency(concurrency);
    }
    if let Some(budget) = args.retry_budget {
        importer = importer.with_retry_budget(budget);
    }

    let mut graph = OntologyGraph::load_file(&args.ontology_file, args.media_type.as_deref())
        .with_context(|| format!("Failed to load ontology from {}", args.ontology_file.display()))?;

    let store = connect(&config, Some(args.repo_url), args.user, args.password)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling the import");
            on_signal.cancel();
        }
    });

    store.begin_transaction().await.context("Failed to begin a transaction")?;
    let owl_file = (!args.skip_binary).then_some(args.ontology_file.as_path());
    let result = run_import(&importer, &config, &store, &mut graph, owl_file, &info, &cancel).await;

    let report = match result {
        Ok(report) => {
            store.commit().await.context("Failed to commit the transaction")?;
            report
        }
        Err(e) => {
            if let Err(rollback) = store.rollback().await {
                error!("rollback failed: {}", rollback);
            }
            return Err(e);
        }
    };

    match args.format {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Text => println!("{}", report),
    }
    Ok(ExitCode::SUCCESS)
}

/// Reconcile the repository with `graph`, then upload `owl_file` unless
/// the binary upload is skipped
async fn run_import(
    importer: &OntologyImporter<'_>,
    config: &Config,
    store: &HttpStore,
    graph: &mut OntologyGraph,
    owl_file: Option<&Path>,
    info: &OntologyInfo,
    cancel: &CancellationToken,
) -> anyhow::Result<ImportReport> {
    let mut report = importer.import(graph, store, cancel).await?;

    if let Some(owl_path) = owl_file {
        let outcome = OwlBinaryUploader::new(config).upload(store, owl_path, info).await?;
        report.binary = Some(outcome.to_string());
    }
    Ok(report)
}
