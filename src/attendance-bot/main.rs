use std::{path::PathBuf, sync::Arc};

use attend::{
    Fetcher, SystemClock,
    cli::SessionArgs,
    notify::{self, AlertSink, Notifier},
};

#[derive(clap::Parser)]
struct Args {
    #[command(flatten)]
    session: SessionArgs,
    /// Webhook receiving alerts; alerts are only logged without one.
    #[arg(long, env = "CHAMP_WEBHOOK", hide_env_values = true)]
    webhook: Option<String>,
    /// Unix socket serving `GET /check`.
    #[arg(long, env = "CHAMP_SOCKET", value_name = "path", default_value = "champ-attendance.sock")]
    socket: PathBuf,
    /// Seconds between scheduled checks.
    #[arg(long, env = "CHAMP_INTERVAL", default_value_t = 3600)]
    interval: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use axum::serve;
    use clap::Parser;
    use tokio::net::UnixListener;

    pretty_env_logger::init_timed();

    let args = Args::parse();
    let fetcher = Fetcher::new(args.session.into_session()?, SystemClock);
    let notifier = Arc::new(Notifier::new(fetcher, AlertSink::new(args.webhook)?));

    let period = core::time::Duration::from_secs(args.interval.max(1));
    let ticker = Arc::clone(&notifier);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            ticker.on_tick().await;
        }
    });

    if let Err(err) = std::fs::remove_file(&args.socket) {
        if err.kind() != std::io::ErrorKind::NotFound {
            return Err(err.into());
        }
    }
    let listener = UnixListener::bind(&args.socket)?;
    let socket = args.socket.display();
    tracing::info!(target: "bot", "\x1b[32mlistening\x1b[0m on {socket}, every {period:?}");

    serve(listener, notify::router(notifier))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!(target: "bot", "shutting down");
        })
        .await?;

    Ok(())
}
