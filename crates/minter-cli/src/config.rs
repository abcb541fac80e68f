use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, File};
use minter::{Address, ChainId};
use minter_common::alloy::primitives::address;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_DIR: &str = ".minter-cli";

/// Rinkeby, where the collection was deployed
pub const DEFAULT_CHAIN_ID: ChainId = ChainId::new(4);
pub const DEFAULT_CONTRACT_ADDRESS: Address = address!("6b83553fbf4d05ee24d3815bf2b2ebc4c28f8f0d");
pub const DEFAULT_TOTAL_SUPPLY: u64 = 50;
pub const DEFAULT_VIEWER_BASE: &str = "https://testnets.opensea.io/assets";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    JsonRpc,
    FakeWallet,
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jsonrpc" => Ok(Backend::JsonRpc),
            "fakewallet" => Ok(Backend::FakeWallet),
            _ => Err(format!("Unknown wallet backend: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub chain_id: ChainId,
    pub rpc_url: String,
    pub poll_interval_ms: u64,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            rpc_url: "http://127.0.0.1:8545".to_string(),
            poll_interval_ms: 4_000,
        }
    }
}

impl Network {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub address: Address,
    pub total_supply: u64,
}

impl Default for Contract {
    fn default() -> Self {
        Self {
            address: DEFAULT_CONTRACT_ADDRESS,
            total_supply: DEFAULT_TOTAL_SUPPLY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewer {
    pub base: String,
}

impl Default for Viewer {
    fn default() -> Self {
        Self {
            base: DEFAULT_VIEWER_BASE.to_string(),
        }
    }
}

/// Starting state of the in-memory wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FakeWallet {
    pub authorized: bool,
    pub minted: u64,
}

impl Default for FakeWallet {
    fn default() -> Self {
        Self {
            authorized: true,
            minted: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub contract: Contract,
    #[serde(default)]
    pub viewer: Viewer,
    #[serde(default)]
    pub fake_wallet: FakeWallet,
}

impl Settings {
    /// Defaults overridden by the config file, if there is one
    pub fn new<P>(config_file_name: Option<P>) -> Result<Self, ConfigError>
    where
        P: Into<PathBuf>,
    {
        let default_settings = Self::default();

        let (config_file, required) = match config_file_name {
            Some(value) => (value.into(), true),
            None => match home::home_dir() {
                Some(home_dir) => (home_dir.join(DEFAULT_CONFIG_DIR).join("config.toml"), false),
                None => {
                    tracing::debug!("No home directory, using default settings");
                    return Ok(default_settings);
                }
            },
        };

        let config: Config = Config::builder()
            // use defaults
            .add_source(Config::try_from(&default_settings)?)
            // override with file contents
            .add_source(File::from(config_file).required(required))
            .build()?;

        config.try_deserialize()
    }
}
