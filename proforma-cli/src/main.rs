use std::io::Write;

use clap::Parser;
use tracing::debug;

use proforma_cli::{app, cli::Cli, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.logging_options())?;

    debug!(backend = %cli.backend, db = %cli.db, "starting");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    app::run(cli, &mut out).await?;
    out.flush()?;

    Ok(())
}
