use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use minter::{Dapp, MintResult, Screen};

#[derive(Args)]
pub struct MintSubCommand {
    /// Number of items to mint, one transaction each
    #[arg(short, long, default_value = "1")]
    amount: u32,
}

pub async fn mint(dapp: &Arc<Dapp>, sub_command_args: &MintSubCommand) -> Result<()> {
    let mut screen = dapp.start().await;
    if screen == Screen::Connect {
        screen = dapp.connect().await;
    }

    let Screen::Mint(state) = screen else {
        println!("{screen}");
        return Ok(());
    };

    if !state.can_mint() {
        println!("{}", Screen::Mint(state));
        return Ok(());
    }

    for _ in 0..sub_command_args.amount {
        println!("Minting...");
        match dapp.mint().await {
            MintResult::Minted(token_id) => {
                let link = dapp
                    .panel()
                    .and_then(|panel| panel.state().last_minted_url)
                    .map(|url| url.to_string())
                    .unwrap_or_default();
                println!("Minted token {token_id} {link}");
            }
            MintResult::NoIdentifier => {
                println!("Mint failed");
                break;
            }
        }
    }

    println!("{}", dapp.screen());

    Ok(())
}
