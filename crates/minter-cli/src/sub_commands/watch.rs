use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use minter::{Dapp, Screen};

/// Print the screen on every change until interrupted
pub async fn watch(dapp: &Arc<Dapp>) -> Result<()> {
    let mut last = dapp.start().await;
    println!("{last}");

    let mut connection = dapp.connection().watch();

    loop {
        let mut panel_state = dapp.panel().map(|panel| panel.watch());

        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(Duration::from_secs(1)) => {}
            changed = connection.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            Some(Ok(())) = async {
                match panel_state.as_mut() {
                    Some(state) => Some(state.changed().await),
                    None => None,
                }
            } => {}
        }

        // Reconciliation runs in the background after a status change
        tokio::task::yield_now().await;

        let screen = dapp.screen();
        if screen != last {
            println!("{screen}");
            last = screen;
        }
    }

    dapp.shutdown();
    if let Screen::Mint(state) = last {
        tracing::debug!("Stopped watching with {:?} left", state.remaining);
    }

    Ok(())
}
