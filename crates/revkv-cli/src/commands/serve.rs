use crate::config::{Config, parse_bind};
use crate::support::store_path;
use revkv_core::Engine;
use revkv_http::http::{HttpServerConfig, ROUTES, serve_commands};
use revkv_store::{JsonlStore, MemoryStore, VersionStore};
use std::path::PathBuf;
use std::process;

pub fn run(config: &Config, bind: Option<String>, store: Option<PathBuf>, memory: bool) {
    let bind = bind.unwrap_or_else(|| config.bind.clone());
    let bind_addr = parse_bind(&bind).unwrap_or_else(|e| {
        eprintln!("error: invalid --bind address: {e}");
        process::exit(1);
    });
    let server = HttpServerConfig { bind: bind_addr };

    println!("revkv serve");
    println!("  bind: {bind_addr}");
    if memory {
        println!("  store: memory");
        print_routes();
        serve(server, &Engine::new(MemoryStore::new()));
    } else {
        let path = store_path(store, config);
        println!("  store: {}", path.display());
        print_routes();
        serve(server, &Engine::new(JsonlStore::new(path)));
    }
}

fn print_routes() {
    println!("  routes:");
    for route in ROUTES {
        println!("    GET {route}");
    }
}

fn serve<S: VersionStore>(server: HttpServerConfig, engine: &Engine<S>) {
    if let Err(e) = serve_commands(server, engine) {
        eprintln!("error: command API failed: {e}");
        process::exit(1);
    }
}
