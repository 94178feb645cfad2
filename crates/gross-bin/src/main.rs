//! `gross` entrypoint: replays a directive script through a dictation session.
use anyhow::{Context, Result, bail};
use clap::Parser;
use core_actions::Session;
use core_config::{MemoryStore, PreferenceStore, TomlFileStore, load_or_default};
use core_events::{EVENT_CHANNEL_CAP, Event, EventSourceRegistry, TickEventSource};
use core_text::Buffer;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

mod runtime;
mod script;

use runtime::{ReplayRuntime, TokioClock};
use script::ScriptSource;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "gross", version, about = "Replay dictation scripts through the gross-description automaton")]
struct Args {
    /// Directive script to replay.
    pub script: PathBuf,
    /// Saved draft used as the initial buffer.
    #[arg(long)]
    pub draft: Option<PathBuf>,
    /// Preferences file (overrides discovery of `gross.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Keep preference changes for this run only.
    #[arg(long)]
    pub no_save: bool,
    /// Interval between timer ticks.
    #[arg(long, default_value_t = 50)]
    pub tick_ms: u64,
}

fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = Path::new(".");
    let log_path = log_dir.join("gross.log");
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(log_dir, "gross.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .try_init()
    {
        Ok(_) => Some(guard),
        // Global subscriber already installed; dropping the guard shuts the writer down.
        Err(_) => None,
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

fn preference_store(args: &Args) -> Box<dyn PreferenceStore> {
    let file = match &args.config {
        Some(path) => TomlFileStore::new(path.clone()),
        None => TomlFileStore::discovered(),
    };
    info!(target: "runtime.startup", path = %file.path().display(), no_save = args.no_save, "preferences_source");
    if args.no_save {
        Box::new(MemoryStore::new(load_or_default(&file)))
    } else {
        Box::new(file)
    }
}

fn read_text(path: &Path, what: &str) -> Result<String> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {what} {}", path.display()))?;
    Ok(content.replace("\r\n", "\n"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = configure_logging();
    install_panic_hook();
    info!(target: "runtime", "startup");

    let args = Args::parse();
    let script = read_text(&args.script, "script")?;
    let draft = match &args.draft {
        Some(path) => read_text(path, "draft")?,
        None => String::new(),
    };
    let session = Session::new(
        Buffer::new(&draft),
        preference_store(&args),
        Box::new(TokioClock),
    );
    info!(
        target: "runtime.startup",
        script_lines = script.lines().count(),
        draft_chars = draft.chars().count(),
        tick_ms = args.tick_ms,
        "bootstrap_complete"
    );

    let (tx, rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);
    let mut registry = EventSourceRegistry::new();
    registry.register(ScriptSource::new(script));
    registry.register(TickEventSource::new(Duration::from_millis(args.tick_ms.max(1))));
    let source_handles = registry.spawn_all(&tx);

    let stdout = std::io::stdout();
    let mut runtime = ReplayRuntime::new(session, tx, rx, source_handles, stdout.lock());
    let summary = match runtime.run().await {
        Ok(summary) => summary,
        Err(e) => {
            error!(target: "runtime", error = %e, "replay_failed");
            return Err(e);
        }
    };
    runtime.write_final()?;
    info!(target: "runtime", "shutdown");

    if summary.errors > 0 {
        bail!("{} script line(s) rejected", summary.errors);
    }
    Ok(())
}
