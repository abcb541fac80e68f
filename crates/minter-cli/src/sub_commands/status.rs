use std::sync::Arc;

use anyhow::Result;
use minter::Dapp;

pub async fn status(dapp: &Arc<Dapp>) -> Result<()> {
    let screen = dapp.start().await;

    println!("Connection: {}", dapp.connection().status());
    println!("{screen}");

    Ok(())
}
