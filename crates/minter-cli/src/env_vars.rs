//! Environment overrides of the config file

use std::env;
use std::str::FromStr;

use anyhow::{anyhow, Result};

use crate::config::{Backend, Settings};

pub const ENV_BACKEND: &str = "MINTER_BACKEND";
// Network
pub const ENV_CHAIN_ID: &str = "MINTER_CHAIN_ID";
pub const ENV_RPC_URL: &str = "MINTER_RPC_URL";
pub const ENV_POLL_INTERVAL_MS: &str = "MINTER_POLL_INTERVAL_MS";
// Contract
pub const ENV_CONTRACT_ADDRESS: &str = "MINTER_CONTRACT_ADDRESS";
pub const ENV_TOTAL_SUPPLY: &str = "MINTER_TOTAL_SUPPLY";
// Viewer
pub const ENV_VIEWER_BASE: &str = "MINTER_VIEWER_BASE";

impl Settings {
    pub fn from_env(mut self) -> Result<Self> {
        if let Ok(backend) = env::var(ENV_BACKEND) {
            self.backend = Backend::from_str(&backend).map_err(|err| anyhow!(err))?;
        }

        if let Ok(chain_id) = env::var(ENV_CHAIN_ID) {
            self.network.chain_id = chain_id.parse()?;
        }
        if let Ok(rpc_url) = env::var(ENV_RPC_URL) {
            self.network.rpc_url = rpc_url;
        }
        if let Ok(interval) = env::var(ENV_POLL_INTERVAL_MS) {
            self.network.poll_interval_ms = interval.parse()?;
        }

        if let Ok(address) = env::var(ENV_CONTRACT_ADDRESS) {
            self.contract.address = address.parse()?;
        }
        if let Ok(supply) = env::var(ENV_TOTAL_SUPPLY) {
            self.contract.total_supply = supply.parse()?;
        }

        if let Ok(base) = env::var(ENV_VIEWER_BASE) {
            self.viewer.base = base;
        }

        Ok(self)
    }
}
