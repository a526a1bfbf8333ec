use anyhow::{Context, Result};
use clap::Parser;
use depbundler::bundler::cli::BundleCommands;
use depbundler::bundler::{
    Bundler, BundlerOptions, PartialOptions, TracingObserver, OPTIONS_FILE,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "depbundler")]
#[command(
    about = "Bundle SystemJS/jspm components and vendor packages into deduplicated bundles",
    version
)]
struct Cli {
    /// Options file (default: ./bundler.toml when present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Root searched for component entry points
    #[arg(long, value_name = "DIR")]
    source: Option<PathBuf>,

    /// Filesystem base the loader paths resolve against
    #[arg(long, value_name = "DIR")]
    base_url: Option<String>,

    /// Logical prefix of bundle ids in the loader configuration
    #[arg(long, value_name = "PREFIX")]
    bundles_base_url: Option<String>,

    /// Output directory for bundles
    #[arg(long, value_name = "DIR")]
    dest: Option<PathBuf>,

    /// Loader configuration file (System.config)
    #[arg(long, value_name = "FILE")]
    system_config: Option<PathBuf>,

    /// Project manifest holding jspm.dependencies
    #[arg(long, value_name = "FILE")]
    manifest: Option<PathBuf>,

    /// Skip source map generation
    #[arg(long)]
    no_source_maps: bool,

    /// Skip minification
    #[arg(long)]
    no_minify: bool,

    /// Engine executable (name on PATH or path)
    #[arg(long, value_name = "PROGRAM")]
    engine: Option<String>,

    /// Keep the bundles already recorded in the loader configuration
    #[arg(long)]
    keep_existing_bundles: bool,

    /// Write the updated loader configuration after the command
    #[arg(long)]
    save_config: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: BundleCommands,
}

impl Cli {
    /// Options layer built from command-line flags
    fn overrides(&self) -> PartialOptions {
        PartialOptions {
            base_path: self.source.clone(),
            base_url: self.base_url.clone(),
            bundles_base_url: self.bundles_base_url.clone(),
            dest: self.dest.clone(),
            system_js_config: self.system_config.clone(),
            manifest: self.manifest.clone(),
            source_maps: self.no_source_maps.then_some(false),
            minify: self.no_minify.then_some(false),
            engine: self.engine.clone(),
            keep_existing_bundles: self.keep_existing_bundles.then_some(true),
            ..Default::default()
        }
    }
}

fn load_options(cli: &Cli) -> Result<BundlerOptions> {
    let file = match &cli.config {
        Some(path) => PartialOptions::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None if Path::new(OPTIONS_FILE).exists() => PartialOptions::from_file(Path::new(OPTIONS_FILE))
            .with_context(|| format!("loading {OPTIONS_FILE}"))?,
        None => PartialOptions::default(),
    };

    Ok(BundlerOptions::default().merge(file).merge(cli.overrides()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "depbundler=debug"
    } else {
        "depbundler=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let options = load_options(&cli)?;
    tracing::debug!(?options, "Resolved options");

    let bundler = Bundler::from_options(options)
        .await
        .context("initializing bundler")?
        .with_observer(Arc::new(TracingObserver));

    let save = cli.save_config || cli.command.always_saves();
    cli.command.run(&bundler).await?;

    if save {
        let path = bundler.save_config().await.context("saving loader configuration")?;
        println!("✓ Loader configuration saved to {}", path.display());
    }

    Ok(())
}
