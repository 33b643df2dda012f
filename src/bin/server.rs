//! Combined backend binary.
//!
//! Serves the async HTTP surface, the live websocket surface, and the
//! in-process reconciler loop from one process. The async variant's
//! sweeps can also be driven externally through the cron endpoints.

use clap::Parser;
use skateduel::server::Server;

#[derive(Parser)]
#[command(name = "server", about = "S.K.A.T.E. duel backend")]
struct Args {
    /// Seconds between in-process reconciler ticks.
    #[arg(long, default_value_t = 10)]
    reconcile_interval: u64,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    skateduel::log();
    skateduel::kys();
    Server::run(std::time::Duration::from_secs(args.reconcile_interval))
        .await
        .unwrap();
}
