use clap::Parser;
use log::info;
use server::config::{ServerConfig, Timings};
use server::network::Server;
use std::time::Duration;

/// Main-method of the application.
/// Parses command-line arguments, then runs the server loop until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server IP address to bind to
        #[clap(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Server port to listen on
        #[clap(short, long, default_value = "5000")]
        port: u16,
        /// Maximum number of online sessions
        #[clap(long, default_value = "256")]
        max_sessions: usize,
        /// Seconds of silence before a session expires
        #[clap(long, default_value = "60")]
        session_timeout: u64,
        /// Seconds the defender has to deploy
        #[clap(long, default_value = "300")]
        setup_secs: u64,
        /// Seconds the attacker has after deployment
        #[clap(long, default_value = "180")]
        attack_secs: u64,
        /// Seconds a round summary stays up before the next round
        #[clap(long, default_value = "4")]
        round_display_secs: u64,
        /// Seconds between the last strategy-4 reveal and its scoring
        #[clap(long, default_value = "3")]
        reveal_pause_secs: u64,
        /// Seconds before a finished game returns to the lobby
        #[clap(long, default_value = "180")]
        reset_secs: u64,
    }

    env_logger::init();
    let args = Args::parse();

    let config = ServerConfig {
        address: format!("{}:{}", args.host, args.port),
        max_sessions: args.max_sessions,
        session_timeout: Duration::from_secs(args.session_timeout),
        timings: Timings {
            setup: Duration::from_secs(args.setup_secs),
            attack: Duration::from_secs(args.attack_secs),
            round_display: Duration::from_secs(args.round_display_secs),
            reveal_pause: Duration::from_secs(args.reveal_pause_secs),
            game_over_reset: Duration::from_secs(args.reset_secs),
        },
    };

    let mut server = Server::new(config).await?;

    // Handle shutdown gracefully
    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
