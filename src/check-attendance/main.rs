use std::{collections::BTreeMap, path::PathBuf};

use attend::{Fetcher, SystemClock, check_attendance, cli::SessionArgs, decision::date_key};

/// One-shot check: prints whether today is attended, exits non-zero only
/// when that cannot be determined.
#[derive(clap::Parser)]
struct Args {
    #[command(flatten)]
    session: SessionArgs,
    /// Also print every attended date.
    #[arg(long)]
    json: bool,
    /// Save the weekly list served by the JSON endpoint as week_<date>.html.
    #[arg(long, value_name = "dir")]
    dump_week: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use clap::Parser;

    pretty_env_logger::init_timed();

    let args = Args::parse();
    let mut fetcher = Fetcher::new(args.session.into_session()?, SystemClock);

    let attendance = check_attendance(&mut fetcher).await.inspect_err(|e| {
        tracing::error!(target: "main", "\x1b[31m🚨 {e}\x1b[0m");
    })?;

    println!("{}", attendance.message());

    if args.json {
        let dates = attendance
            .map
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect::<BTreeMap<_, _>>();
        println!("{}", serde_json::to_string_pretty(&dates)?);
    }

    if let Some(dir) = args.dump_week {
        match attendance.weekly {
            Some(ref html) => {
                std::fs::create_dir_all(&dir)?;
                let path = dir.join(format!("week_{}.html", date_key(attendance.date)));
                std::fs::write(&path, html)?;
                tracing::info!(target: "main", "weekly list written to {}", path.display());
            }
            None => tracing::warn!(target: "main", "no weekly list to save"),
        }
    }

    Ok(())
}
