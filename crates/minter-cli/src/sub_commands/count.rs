use std::sync::Arc;

use anyhow::Result;
use minter::Dapp;

pub async fn count(dapp: &Arc<Dapp>) -> Result<()> {
    let screen = dapp.start().await;

    let Some(panel) = dapp.panel() else {
        println!("{screen}");
        return Ok(());
    };

    let total = dapp.settings().total_supply;
    let remaining = panel.load().await;
    println!(
        "{} of {} minted, {} left",
        total.saturating_sub(remaining),
        total,
        remaining
    );

    Ok(())
}
