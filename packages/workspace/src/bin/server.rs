use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use xmlwright_common::RealFileSystem;
use xmlwright_editor::{EditorConfig, EditorService, InMemoryEngine};
use xmlwright_workspace::{build_router, AppState, LogIndexer, SaveHooks, SessionStore};

const SESSION_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let mut port: u16 = 8080;
    let mut accounts_root = std::env::current_dir().context("no working directory")?;
    let mut assets_dir: Option<PathBuf> = None;
    let mut dtd_urls: Vec<String> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                if i + 1 < args.len() {
                    port = args[i + 1].parse().context("invalid port number")?;
                    i += 2;
                } else {
                    eprintln!("--port requires a value");
                    std::process::exit(1);
                }
            }
            "--assets-dir" => {
                if i + 1 < args.len() {
                    assets_dir = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    eprintln!("--assets-dir requires a value");
                    std::process::exit(1);
                }
            }
            "--dtd-url" => {
                if i + 1 < args.len() {
                    dtd_urls.push(args[i + 1].clone());
                    i += 2;
                } else {
                    eprintln!("--dtd-url requires a value");
                    std::process::exit(1);
                }
            }
            "--help" | "-h" => {
                println!("Usage: xmlwright-server [OPTIONS] [ACCOUNTS_ROOT]");
                println!();
                println!("Options:");
                println!("  -p, --port <PORT>       HTTP port to listen on (default: 8080)");
                println!("  --assets-dir <DIR>      Directory with front-end assets to serve");
                println!("  --dtd-url <URL>         DTD offered in the new-file prompt (repeatable)");
                println!("  -h, --help              Show this help message");
                println!();
                println!("Arguments:");
                println!("  [ACCOUNTS_ROOT]         Directory holding per-account roots (default: current dir)");
                std::process::exit(0);
            }
            arg if !arg.starts_with('-') => {
                accounts_root = PathBuf::from(arg);
                i += 1;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                std::process::exit(1);
            }
        }
    }

    tracing::info!(root = %accounts_root.display(), port, "starting xmlwright server");
    // The real XML tooling backend is wired in by the embedder; standalone
    // runs get the in-memory engine, enough to drive the front end.
    tracing::warn!("no tooling backend configured, using the in-memory engine");

    let fs = Arc::new(RealFileSystem);
    let engine = Arc::new(InMemoryEngine::new(fs.clone()));
    let service = EditorService::new(engine, fs, EditorConfig::new(dtd_urls));

    let sessions = Arc::new(SessionStore::new());
    let state = Arc::new(AppState {
        service,
        sessions: sessions.clone(),
        hooks: SaveHooks::new(Arc::new(LogIndexer)),
        accounts_root,
    });

    // Session sweep: reclaims expired sessions and their clipboard files.
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(60 * 60));
        loop {
            tick.tick().await;
            let purged = sessions.purge_expired(SESSION_MAX_AGE);
            if purged > 0 {
                tracing::info!(purged, "expired sessions dropped");
            }
        }
    });

    let mut app = build_router(state).layer(CorsLayer::permissive());
    if let Some(assets) = assets_dir {
        app = app.fallback_service(ServeDir::new(assets).append_index_html_on_directories(true));
    }

    let addr = format!("127.0.0.1:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("can't bind {addr}"))?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await.context("server exited")?;

    Ok(())
}
