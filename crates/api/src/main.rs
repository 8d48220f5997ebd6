//! DealDesk - sales pipeline board
//!
//! Loads the configured tenant's board and prints it, either as a plain
//! column summary or as JSON (`--json`).

#![allow(clippy::print_stdout)]

use anyhow::Context;
use dealdesk_infra::{config, init_tracing};
use dealdesk_lib::{load_board, tenant_from_env, AppContext, BoardSnapshot};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; real environment variables still apply
    let dotenv = dotenvy::dotenv();

    let config = config::load().context("failed to load configuration")?;
    init_tracing(&config.logging).context("failed to initialise tracing")?;
    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(err) => warn!(error = %err, "no .env file loaded"),
    }

    let tenant = tenant_from_env().context("failed to resolve tenant")?;
    let ctx = AppContext::new_with_config(config, tenant)
        .await
        .context("failed to initialise application context")?;

    let snapshot = load_board(&ctx).await.context("failed to load board")?;

    if std::env::args().skip(1).any(|arg| arg == "--json") {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_summary(&snapshot);
    }
    Ok(())
}

fn print_summary(snapshot: &BoardSnapshot) {
    for column in &snapshot.view.columns {
        println!(
            "{:<24} {:>4} deals  {:>14}",
            column.stage.name,
            column.opportunities.len(),
            column.total_value.round_dp(2)
        );
    }
    println!("{:<24} {:>4} deals  {:>14}", "(total)", "", snapshot.view.total_value.round_dp(2));
    for warning in &snapshot.integrity_warnings {
        println!("warning: {warning}");
    }
    for notice in &snapshot.notices {
        println!("{}: {}", notice.level, notice.message);
    }
}
