//! The REST API server binary.

use std::{env, net::SocketAddr, path::PathBuf};

use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tower_http::services::{ServeDir, ServeFile};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use backend::{AppState, build_router, graceful_shutdown};

/// The REST API server for Centsible.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// Directory holding the built frontend assets.
    #[arg(long, default_value = "frontend/dist")]
    static_dir: PathBuf,

    /// The socket address to serve the API from.
    #[arg(long, default_value = "127.0.0.1:3000")]
    address: SocketAddr,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let jwt_secret =
        env::var("JWT_SECRET").expect("The environment variable 'JWT_SECRET' must be set");

    let connection = Connection::open(&args.db_path).expect("Could not open the database file.");
    let state = AppState::new(connection, &jwt_secret).expect("Could not initialize the database.");

    // Unknown paths fall through to the frontend's index.html so that the
    // single-page app can handle its own routes after a full page load.
    let index = args.static_dir.join("index.html");
    let static_files = ServeDir::new(&args.static_dir).fallback(ServeFile::new(index));
    let router = build_router(state).fallback_service(static_files);

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    tracing::info!("HTTP server listening on {}", args.address);

    axum_server::bind(args.address)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .expect("The server stopped unexpectedly.");
}
