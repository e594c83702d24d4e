//! Watch-party session coordinator.
//!
//! Keeps rooms of viewers in sync: playback control, playlists, chat,
//! screen-share signaling.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin kotatsu-server
//! cargo run --bin kotatsu-server -- --host 0.0.0.0 --port 3000
//! ```

use clap::Parser;

use kotatsu_server::{config::Config, runner::run_server};
use kotatsu_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "kotatsu-server")]
#[command(about = "Synchronized watch-party session coordinator", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    let config = Config::from_env();

    if let Err(e) = run_server(config, args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
