//! Eduverse command-line client
//!
//! Reads and edits the locally cached Eduverse dataset and keeps it in sync
//! with a realtime database when one is configured.
//!
//! Usage:
//!   eduverse --remote https://my-app-default-rtdb.firebaseio.com show
//!   eduverse add batches '{"name":"JEE 2025"}'
//!   eduverse watch
//!
//! Every run that can reach the database starts from the remote copy. Edits
//! made without a remote stay in the local cache until `eduverse sync` pushes
//! them; any other online command replaces them with the remote copy.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use eduverse_cli::{CliConfig, parse_fields, render_record, render_status, render_summary};
use eduverse_storage::FileCache;
use eduverse_sync::{
    Connectivity, ContentEditor, HttpDocumentStore, MemoryDocumentStore, StoreAdapter, SyncEngine,
    probe_once, spawn_probe,
};
use eduverse_types::Collection;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, debug, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "eduverse")]
#[command(about = "Inspect, edit and watch the synced Eduverse dataset")]
struct Args {
    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for the local cache
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Realtime database URL
    #[arg(long)]
    remote: Option<String>,

    /// Do not contact the remote store
    #[arg(long)]
    offline: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record counts and sync status
    Show,
    /// Print every record of a collection, one JSON object per line
    List { collection: Collection },
    /// Add a record from a JSON object
    Add { collection: Collection, fields: String },
    /// Merge a JSON object into an existing record
    Update {
        collection: Collection,
        id: String,
        fields: String,
    },
    /// Delete a record
    Delete { collection: Collection, id: String },
    /// Push the local cache to the remote store
    Sync,
    /// Print every change until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = match &args.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };
    if let Some(dir) = &args.cache_dir {
        config.cache_dir = Some(dir.clone());
    }
    if let Some(url) = &args.remote {
        config.set_remote_url(url.clone());
    }

    let cache_dir = config.cache_dir();
    let cache = FileCache::open(cache_dir.clone())
        .with_context(|| format!("Failed to open cache at {}", cache_dir.display()))?;

    let store: Arc<dyn StoreAdapter> = match &config.remote {
        Some(remote) if !args.offline => {
            Arc::new(HttpDocumentStore::new(remote.clone()).context("Failed to create remote store")?)
        }
        _ => Arc::new(MemoryDocumentStore::new()),
    };
    let probe = config
        .probe_config()
        .filter(|_| !args.offline && config.remote.is_some());
    let mut online = match &probe {
        Some(probe) => {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_millis(probe.timeout_ms))
                .build()
                .context("Failed to create HTTP client")?;
            probe_once(&client, &probe.url).await
        }
        None => false,
    };
    if probe.is_none() {
        info!("No remote store in use; working offline");
    } else if !online {
        warn!("Remote store unreachable; edits stay in the local cache");
    }

    let connectivity = Connectivity::new(online);
    let engine = SyncEngine::with_config(
        config.sync.clone(),
        store,
        Arc::new(cache),
        connectivity.clone(),
    );
    debug!("Using {} with cache {}", engine.provider_name(), cache_dir.display());

    // The remote copy is authoritative at startup. `sync` is the one command
    // that pushes the local cache instead.
    if online && !matches!(args.command, Command::Sync) && !engine.pull().await {
        warn!("Could not read the remote store; working offline");
        online = false;
        connectivity.set_online(false);
        engine.handle_connectivity_change(false).await;
    }

    let editor = ContentEditor::new(engine.clone());
    match args.command {
        Command::Show => {
            println!("{}", render_summary(&engine.read(), &engine.status()));
        }
        Command::List { collection } => {
            for record in engine.read().records(collection) {
                println!("{}", render_record(record));
            }
        }
        Command::Add { collection, fields } => {
            let fields = parse_fields(&fields)?;
            let (record, written) = editor.add(collection, fields).await;
            report_write(written, online);
            println!("{}", record.id().unwrap_or_default());
        }
        Command::Update {
            collection,
            id,
            fields,
        } => {
            let fields = parse_fields(&fields)?;
            ensure_exists(&engine, collection, &id)?;
            let written = editor.update(collection, &id, fields).await;
            report_write(written, online);
        }
        Command::Delete { collection, id } => {
            ensure_exists(&engine, collection, &id)?;
            let written = editor.delete(collection, &id).await;
            report_write(written, online);
        }
        Command::Sync => {
            if !online {
                bail!("Remote store is not reachable");
            }
            if !engine.resync().await {
                bail!("Failed to push local data to {}", engine.provider_name());
            }
            println!("{}", render_status(&engine.status()));
        }
        Command::Watch => {
            let probe_task = match probe {
                Some(probe) => Some(spawn_probe(connectivity, probe)?),
                None => None,
            };
            engine.start()?;
            let subscription = engine.subscribe(|dataset, status| {
                println!("{}\n", render_summary(dataset, status));
            });

            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
            info!("Shutting down");

            subscription.unsubscribe();
            engine.dispose();
            if let Some(task) = probe_task {
                task.abort();
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn ensure_exists(engine: &SyncEngine, collection: Collection, id: &str) -> Result<()> {
    if engine.read().find_record(collection, id).is_none() {
        bail!("No {} with id {}", collection.id_prefix(), id);
    }
    Ok(())
}

fn report_write(written: bool, online: bool) {
    if !written {
        warn!("Saved locally; the remote store was not updated");
    } else if !online {
        info!("Saved locally; run `eduverse sync` once the remote store is reachable");
    }
}
