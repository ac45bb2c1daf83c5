//! thumbq CLI: batch thumbnail generation through the resolver pipeline.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thumbq::config::Config;
use thumbq::event::ThumbnailReady;
use thumbq::resolver::{ImageFileResolver, ResolverRegistry};
use thumbq::telemetry::{TelemetryConfig, init_telemetry};
use thumbq::{ResourceId, ThumbnailPipeline};

#[derive(Parser)]
#[command(name = "thumbq", about = "Resolve thumbnails through pluggable resolvers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Thumbnail the given files and write PNGs to an output directory
    Resolve {
        /// Files to thumbnail
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Output directory for PNG thumbnails
        #[arg(long, default_value = "thumbnails")]
        out: PathBuf,
        /// Directory of resolver TOML specs (overrides RESOLVER_DIR)
        #[arg(long)]
        resolvers: Option<PathBuf>,
        /// Maximum thumbnail side, for resolvers that don't set their own (overrides THUMBNAIL_SIZE)
        #[arg(long)]
        size: Option<u32>,
        /// Print a JSON summary instead of text
        #[arg(long)]
        json: bool,
    },
    /// List resolvers in the order they are consulted
    Resolvers {
        /// Directory of resolver TOML specs (overrides RESOLVER_DIR)
        #[arg(long)]
        resolvers: Option<PathBuf>,
    },
}

/// One thumbnail written to disk.
#[derive(Serialize)]
struct Written {
    resource: ResourceId,
    output: PathBuf,
    width: u32,
    height: u32,
}

#[derive(Serialize)]
struct Summary {
    requested: usize,
    written: Vec<Written>,
    dropped: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let guard = init_telemetry(TelemetryConfig::from_config(&config, "thumbq"))?;

    let result = match cli.command {
        Command::Resolve {
            paths,
            out,
            resolvers,
            size,
            json,
        } => cmd_resolve(&config, paths, out, resolvers, size, json).await,
        Command::Resolvers { resolvers } => cmd_resolvers(&config, resolvers),
    };

    guard.force_flush();
    result
}

fn build_registry(
    config: &Config,
    dir: Option<PathBuf>,
    size: Option<u32>,
) -> anyhow::Result<ResolverRegistry> {
    let size = size.unwrap_or(config.thumbnail_size);
    match dir.or_else(|| config.resolver_dir.clone()) {
        Some(dir) => Ok(ResolverRegistry::load_from_dir(&dir, size)?),
        None => {
            let registry = ResolverRegistry::empty();
            registry.register(Arc::new(ImageFileResolver::standard().with_max_dimension(size)));
            Ok(registry)
        }
    }
}

async fn cmd_resolve(
    config: &Config,
    paths: Vec<PathBuf>,
    out: PathBuf,
    resolvers: Option<PathBuf>,
    size: Option<u32>,
    json: bool,
) -> anyhow::Result<()> {
    let registry = build_registry(config, resolvers, size)?;
    tokio::fs::create_dir_all(&out).await?;

    let pipeline = ThumbnailPipeline::new(Arc::new(registry));
    for path in &paths {
        pipeline.submit(ResourceId::from_path(path));
    }

    // This task is the owning thread: poll until the worker is done and
    // every result has been drained.
    let mut ticker = tokio::time::interval(config.drain_interval);
    let mut written = Vec::new();
    loop {
        ticker.tick().await;
        let idle = pipeline.is_idle();
        for ready in pipeline.drain()? {
            written.push(write_thumbnail(&out, &ready).await?);
        }
        if idle && pipeline.ready() == 0 {
            break;
        }
    }

    let summary = Summary {
        requested: paths.len(),
        dropped: paths.len().saturating_sub(written.len()),
        written,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for w in &summary.written {
            println!(
                "{}  {}x{}  {}",
                w.output.display(),
                w.width,
                w.height,
                w.resource
            );
        }
        println!(
            "\n{} of {} thumbnail(s) written, {} dropped",
            summary.written.len(),
            summary.requested,
            summary.dropped
        );
    }
    Ok(())
}

async fn write_thumbnail(out: &Path, ready: &ThumbnailReady) -> anyhow::Result<Written> {
    let stem = ready
        .resource
        .local_path()
        .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "thumbnail".to_string());
    let output = out.join(format!("{:04}-{stem}.png", ready.seq));

    let bytes = ready.image.to_png()?;
    tokio::fs::write(&output, bytes).await?;

    Ok(Written {
        resource: ready.resource.clone(),
        output,
        width: ready.image.width(),
        height: ready.image.height(),
    })
}

fn cmd_resolvers(config: &Config, resolvers: Option<PathBuf>) -> anyhow::Result<()> {
    let registry = build_registry(config, resolvers, None)?;
    if registry.is_empty() {
        println!("No resolvers registered.");
        return Ok(());
    }
    for (i, name) in registry.names().iter().enumerate() {
        println!("{:>3}. {name}", i + 1);
    }
    Ok(())
}
