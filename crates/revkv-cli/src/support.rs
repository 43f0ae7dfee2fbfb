use crate::config::Config;
use revkv_core::{Engine, EngineError};
use revkv_store::JsonlStore;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;

pub fn load_config_or_exit(path: Option<&Path>) -> Config {
    Config::load(path).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    })
}

/// Install the stderr subscriber; `RUST_LOG` wins over the config filter.
pub fn init_logging(config_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(config_filter).unwrap_or_else(|e| {
            eprintln!("error: invalid log_filter `{config_filter}`: {e}");
            process::exit(1);
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub fn store_path(store: Option<PathBuf>, config: &Config) -> PathBuf {
    store.unwrap_or_else(|| config.store.clone())
}

/// Engine over the JSONL store named by `--store` or the config.
pub fn open_engine(store: Option<PathBuf>, config: &Config) -> (Engine<JsonlStore>, PathBuf) {
    let path = store_path(store, config);
    debug!(store = %path.display(), "opening jsonl store");
    (Engine::new(JsonlStore::new(&path)), path)
}

pub fn or_exit<T>(result: Result<T, EngineError>) -> T {
    result.unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    })
}

pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("error: failed to render json: {e}");
            process::exit(1);
        }
    }
}
