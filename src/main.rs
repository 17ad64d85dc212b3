mod cli;

use uploadcheck::{config, export, pipeline::Pipeline, trackers::TrackerRegistry};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "uploadcheck=debug,uploadcheck_av=debug".to_string()
        } else {
            "uploadcheck=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Check => check(config_path),
        Commands::Status => status(config_path),
        Commands::Scan { dirs } => {
            let pipeline = open(config_path)?;
            println!("{}", pipeline.scan(&dirs)?);
            Ok(())
        }
        Commands::Classify => {
            let pipeline = open(config_path)?;
            println!("{}", pipeline.classify()?);
            Ok(())
        }
        Commands::Export {
            format,
            allow_risky,
            output,
        } => export_results(config_path, format, allow_risky, output),
        Commands::Resolve => block_on(async {
            let pipeline = open(config_path)?;
            println!("{}", pipeline.resolve().await?);
            Ok(())
        }),
        Commands::Search { tracker } => block_on(async {
            let pipeline = open(config_path)?;
            println!("{}", pipeline.search(tracker.as_deref()).await?);
            Ok(())
        }),
        Commands::Verify => block_on(async {
            let pipeline = open(config_path)?;
            println!("{}", pipeline.verify().await?);
            Ok(())
        }),
        Commands::Run { dirs } => block_on(run_all(config_path, dirs)),
    }
}

fn block_on<F: std::future::Future<Output = Result<()>>>(fut: F) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(fut)
}

fn open(config_path: Option<&Path>) -> Result<Pipeline> {
    let config = config::load_config_or_default(config_path)?;
    Ok(Pipeline::open(config)?)
}

async fn run_all(config_path: Option<&Path>, dirs: Vec<PathBuf>) -> Result<()> {
    let pipeline = open(config_path)?;
    tracing::info!("Running all stages over {} root(s)", dirs.len());

    println!("{}", pipeline.scan(&dirs)?);
    println!("{}", pipeline.resolve().await?);
    println!("{}", pipeline.search(None).await?);
    println!("{}", pipeline.verify().await?);
    println!("{}", pipeline.classify()?);
    Ok(())
}

fn status(config_path: Option<&Path>) -> Result<()> {
    let pipeline = open(config_path)?;
    println!("Record store: {}", pipeline.store().path().display());
    println!("{}", pipeline.status());
    Ok(())
}

fn export_results(
    config_path: Option<&Path>,
    format: export::ExportFormat,
    allow_risky: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let pipeline = open(config_path)?;
    let output = output.unwrap_or_else(|| pipeline.config().general.data_dir.clone());
    let records = pipeline.store().records();

    let files = export::export(&records, format, &output, allow_risky)?;
    for file in files {
        println!("Wrote {}", file.display());
    }
    Ok(())
}

fn check(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    println!("✓ Configuration is valid");
    println!("  Data directory: {}", config.general.data_dir.display());
    println!("  Workers: {}", config.general.workers);

    let mut all_ok = true;

    if config.tmdb.api_key.is_some() {
        println!("✓ TMDB API key");
    } else {
        all_ok = false;
        println!("✗ TMDB API key (set {})", config::TMDB_API_KEY_ENV);
    }

    let registry = TrackerRegistry::from_config(&config);
    for entry in registry.entries() {
        println!("✓ tracker {}", entry.name());
    }
    for name in registry.skipped() {
        all_ok = false;
        println!("✗ tracker {} (no API key)", name);
    }
    if registry.is_empty() && registry.skipped().is_empty() {
        println!("- no trackers configured");
    }

    for tool in uploadcheck_av::check_tools() {
        if tool.available {
            print!("✓ {}", tool.name);
            if let Some(ref version) = tool.version {
                print!(" ({})", version);
            }
            if let Some(ref path) = tool.path {
                print!(" - {}", path.display());
            }
            println!();
        } else if config.general.check_language {
            all_ok = false;
            println!("✗ {} (required for language checks)", tool.name);
        } else {
            println!("- {} not found (language checks disabled)", tool.name);
        }
    }

    println!();
    if all_ok {
        println!("Everything needed for a full run is available.");
    } else {
        println!("Some requirements are missing; affected stages will fail or be skipped.");
    }
    Ok(())
}
