use std::sync::Arc;

use anyhow::Result;
use minter::{ConnectionStatus, Dapp};

pub async fn connect(dapp: &Arc<Dapp>) -> Result<()> {
    dapp.start().await;

    if dapp.connection().status() != ConnectionStatus::Unauthorized {
        println!("Nothing to connect, wallet is {}", dapp.connection().status());
        return Ok(());
    }

    let screen = dapp.connect().await;
    println!("{screen}");

    Ok(())
}
