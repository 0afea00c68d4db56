use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use k256::ecdsa::SigningKey;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub mod access;
pub mod actions;
pub mod address;
pub mod clock;
pub mod eip712;
pub mod error;
pub mod events;
pub mod forest;
pub mod ledger;
pub mod replay;
pub mod request;

pub use actions::{ActionKind, RewardParams, SigninParams, StealParams, TurntableParams};
pub use address::Address;
pub use clock::{Clock, FixedClock, SystemClock};
pub use eip712::Domain;
pub use error::{CodecError, ForestError};
pub use events::ForestEvent;
pub use forest::MintForest;
pub use request::{ActionRequest, SignedAction};

pub const DEFAULT_DOMAIN_NAME: &str = "www.mintchain.io";
pub const DEFAULT_DOMAIN_VERSION: &str = "1";

#[derive(Debug, Error)]
pub enum MintForestError {
    #[error("config file exists: {0}")]
    ConfigExists(String),
    #[error("config not found: {0}")]
    ConfigNotFound(String),
    #[error("unknown config key: {0}")]
    UnknownConfigKey(String),
    #[error("unknown network: {0} (pass --chain-id)")]
    UnknownNetwork(String),
    #[error("ledger state exists: {0}")]
    StateExists(String),
    #[error("ledger state not found: {0} (run `mintforest ledger init`)")]
    StateNotFound(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    pub network: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
    pub domain_name: String,
    pub domain_version: String,
    pub key_path: PathBuf,
    pub state_path: PathBuf,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            network: "localhost".to_string(),
            chain_id: 31337,
            verifying_contract: Address::ZERO,
            domain_name: DEFAULT_DOMAIN_NAME.to_string(),
            domain_version: DEFAULT_DOMAIN_VERSION.to_string(),
            key_path: default_key_path(),
            state_path: default_state_path(),
        }
    }
}

impl ForestConfig {
    pub fn domain(&self) -> Domain {
        Domain {
            name: self.domain_name.clone(),
            version: self.domain_version.clone(),
            chain_id: self.chain_id,
            verifying_contract: self.verifying_contract,
        }
    }
}

pub fn write_config_file(path: &Path, cfg: &ForestConfig, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(MintForestError::ConfigExists(path.display().to_string()).into());
    }
    let toml_string = toml::to_string_pretty(cfg)?;
    write_file(path, toml_string.as_bytes())
}

pub fn save_default_config(cfg: &ForestConfig) -> Result<()> {
    let path = default_config_file_path();
    write_config_file(&path, cfg, true)
}

pub fn read_config_file() -> Result<ForestConfig> {
    let path = default_config_file_path();
    if !path.exists() {
        return Err(MintForestError::ConfigNotFound(path.display().to_string()).into());
    }
    let bytes = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ForestConfig = toml::from_str(std::str::from_utf8(&bytes).context("utf8 config")?)
        .with_context(|| format!("parse TOML at {}", path.display()))?;
    Ok(cfg)
}

pub fn load_config_with_overrides(
    key_path: Option<PathBuf>,
    state_path: Option<PathBuf>,
) -> Result<ForestConfig> {
    let mut cfg = read_config_file().unwrap_or_default();
    if let Some(kp) = key_path.as_deref().map(expand_tilde) {
        cfg.key_path = kp;
    }
    if let Some(sp) = state_path.as_deref().map(expand_tilde) {
        cfg.state_path = sp;
    } else if let Ok(env_state) = std::env::var("MINTFOREST_STATE") {
        if !env_state.trim().is_empty() {
            cfg.state_path = expand_tilde(Path::new(&env_state));
        }
    }
    Ok(cfg)
}

/// The configured signing key. `PRIVATE_KEY` wins over the key file.
pub fn load_signing_key(cfg: &ForestConfig) -> Result<SigningKey> {
    if let Ok(env_key) = std::env::var("PRIVATE_KEY") {
        if !env_key.trim().is_empty() {
            debug!("using signing key from PRIVATE_KEY");
            return eip712::signing_key_from_hex(&env_key).context("parse PRIVATE_KEY");
        }
    }
    let raw = fs::read_to_string(&cfg.key_path)
        .with_context(|| format!("read signing key at {}", cfg.key_path.display()))?;
    eip712::signing_key_from_hex(&raw)
        .with_context(|| format!("parse signing key at {}", cfg.key_path.display()))
}

pub fn write_state_file(path: &Path, forest: &MintForest, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(MintForestError::StateExists(path.display().to_string()).into());
    }
    save_state_file(path, forest)
}

/// Persist `forest`, replacing any previous snapshot in one rename.
pub fn save_state_file(path: &Path, forest: &MintForest) -> Result<()> {
    let json = serde_json::to_vec_pretty(forest)?;
    let tmp = path.with_extension("json.tmp");
    write_file(&tmp, &json)?;
    fs::rename(&tmp, path)
        .with_context(|| format!("move {} to {}", tmp.display(), path.display()))?;
    info!(path = %path.display(), "ledger state saved");
    Ok(())
}

pub fn read_state_file(path: &Path) -> Result<MintForest> {
    if !path.exists() {
        return Err(MintForestError::StateNotFound(path.display().to_string()).into());
    }
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse ledger state at {}", path.display()))
}

pub fn read_request_file(path: &Path) -> Result<ActionRequest> {
    let bytes = if path == Path::new("-") {
        let mut buf = Vec::new();
        std::io::Read::read_to_end(&mut std::io::stdin(), &mut buf).context("read stdin")?;
        buf
    } else {
        fs::read(path).with_context(|| format!("read {}", path.display()))?
    };
    serde_json::from_slice(&bytes)
        .with_context(|| format!("parse action request {}", path.display()))
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
    }
    let mut file =
        fs::File::create(path).with_context(|| format!("create file {}", path.display()))?;
    file.write_all(bytes)
        .with_context(|| format!("write file {}", path.display()))?;
    Ok(())
}

pub fn get_config_value(cfg: &ForestConfig, key: &str) -> Result<String> {
    match key {
        "network" => Ok(cfg.network.clone()),
        "chain_id" => Ok(cfg.chain_id.to_string()),
        "verifying_contract" => Ok(cfg.verifying_contract.to_string()),
        "domain_name" => Ok(cfg.domain_name.clone()),
        "domain_version" => Ok(cfg.domain_version.clone()),
        "key_path" => Ok(cfg.key_path.display().to_string()),
        "state_path" => Ok(cfg.state_path.display().to_string()),
        _ => Err(MintForestError::UnknownConfigKey(key.to_string()).into()),
    }
}

pub fn set_config_value(cfg: &mut ForestConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "network" => {
            let chain_id = default_network_chain_id(value)
                .ok_or_else(|| MintForestError::UnknownNetwork(value.to_string()))?;
            cfg.network = value.to_string();
            cfg.chain_id = chain_id;
        }
        "chain_id" => {
            cfg.chain_id = value
                .parse()
                .map_err(|e| anyhow!("invalid chain_id {value}: {e}"))?
        }
        "verifying_contract" => cfg.verifying_contract = value.parse()?,
        "domain_name" => cfg.domain_name = value.to_string(),
        "domain_version" => cfg.domain_version = value.to_string(),
        "key_path" => cfg.key_path = expand_tilde(Path::new(value)),
        "state_path" => cfg.state_path = expand_tilde(Path::new(value)),
        _ => return Err(MintForestError::UnknownConfigKey(key.to_string()).into()),
    }
    Ok(())
}

pub fn default_config_file_path() -> PathBuf {
    xdg_config_home().join("mintforest").join("config.toml")
}

pub fn xdg_config_home() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        let trimmed = xdg.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    let home = dirs_next::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".config")
}

pub fn default_key_path() -> PathBuf {
    xdg_config_home().join("mintforest").join("signer.key")
}

pub fn default_state_path() -> PathBuf {
    xdg_config_home().join("mintforest").join("ledger.json")
}

pub fn default_network_chain_id(network: &str) -> Option<u64> {
    match network {
        "localhost" | "local" | "hardhat" => Some(31337),
        "mint-mainnet" => Some(185),
        "mint-sepolia" => Some(1687),
        _ => None,
    }
}

pub fn expand_tilde(path: &Path) -> PathBuf {
    let p = path.to_string_lossy();
    if let Some(stripped) = p.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_networks_have_chain_ids() {
        assert_eq!(default_network_chain_id("mint-mainnet"), Some(185));
        assert_eq!(default_network_chain_id("mint-sepolia"), Some(1687));
        assert_eq!(default_network_chain_id("localhost"), Some(31337));
        assert_eq!(default_network_chain_id("ropsten"), None);
    }

    #[test]
    fn setting_network_updates_chain_id() {
        let mut cfg = ForestConfig::default();
        set_config_value(&mut cfg, "network", "mint-sepolia").unwrap();
        assert_eq!(cfg.chain_id, 1687);
        assert_eq!(get_config_value(&cfg, "network").unwrap(), "mint-sepolia");
        assert!(set_config_value(&mut cfg, "network", "ropsten").is_err());
        assert_eq!(cfg.network, "mint-sepolia");
    }

    #[test]
    fn config_toml_round_trip() {
        let mut cfg = ForestConfig::default();
        cfg.verifying_contract = "0x5fbdb2315678afecb367f032d93f642f64180aa3".parse().unwrap();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("verifying_contract = \"0x5FbDB2315678afecb367f032d93F642f64180aa3\""));
        let back: ForestConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.domain(), cfg.domain());
    }

    #[test]
    fn unknown_key_is_an_error() {
        let cfg = ForestConfig::default();
        let err = get_config_value(&cfg, "rpc_url").unwrap_err();
        assert!(err.to_string().contains("unknown config key"));
    }
}
