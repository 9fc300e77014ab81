use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use ton_jetton_ico::provider::ConfirmationPolicy;
use ton_jetton_ico::provider::toncenter::{TonCenterClient, TonCenterConfig};
use ton_jetton_ico::wallet::{WalletSender, WalletVersion, derive_from_mnemonic, parse_secret_key};
use tycho_types::boc::Boc;
use tycho_types::models::{StdAddr, StdAddrFormat};
use tycho_types::prelude::*;
use tycho_util::serde_helpers::load_json_from_file;

/// Client settings which can be loaded from a JSON file.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub toncenter: TonCenterConfig,
    pub confirmation: ConfirmationPolicy,
}

#[derive(clap::Args)]
pub struct NetworkArgs {
    /// Path to a JSON file with client settings.
    #[clap(long)]
    config: Option<PathBuf>,

    /// TON Center API v2 endpoint.
    #[clap(long, env = "TONCENTER_URL")]
    toncenter_url: Option<String>,

    #[clap(long, env = "TONCENTER_API_KEY", hide_env_values = true)]
    toncenter_api_key: Option<String>,
}

impl NetworkArgs {
    pub fn load_config(&self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => load_json_from_file::<ClientConfig, _>(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => ClientConfig::default(),
        };

        if let Some(url) = &self.toncenter_url {
            config.toncenter.endpoint = url.clone();
        }
        if let Some(api_key) = &self.toncenter_api_key {
            config.toncenter.api_key = Some(api_key.clone());
        }

        Ok(config)
    }
}

#[derive(clap::Args)]
pub struct WalletArgs {
    /// Address of the wallet used to send messages.
    #[clap(long, env = "WALLET_ADDRESS", value_parser = parse_address)]
    wallet_address: StdAddr,

    /// Hex-encoded wallet secret key.
    #[clap(
        long,
        env = "WALLET_SECRET_KEY",
        hide_env_values = true,
        conflicts_with = "wallet_mnemonic"
    )]
    wallet_secret_key: Option<String>,

    /// 24-word wallet mnemonic.
    #[clap(long, env = "WALLET_MNEMONIC", hide_env_values = true)]
    wallet_mnemonic: Option<String>,

    #[clap(long, env = "WALLET_VERSION", value_enum, default_value_t)]
    wallet_version: WalletVersion,

    /// Wallet code BOC, required only when the wallet is not deployed yet.
    #[clap(long, env = "WALLET_CODE")]
    wallet_code: Option<PathBuf>,
}

impl WalletArgs {
    pub fn build(&self, client: TonCenterClient) -> Result<WalletSender<TonCenterClient>> {
        let keys = match (&self.wallet_secret_key, &self.wallet_mnemonic) {
            (Some(secret), _) => parse_secret_key(secret)?,
            (None, Some(phrase)) => derive_from_mnemonic(phrase)?,
            (None, None) => anyhow::bail!("either a wallet secret key or a mnemonic is required"),
        };

        let mut wallet = WalletSender::new(
            client,
            self.wallet_address.clone(),
            self.wallet_version,
            keys,
        );
        if let Some(path) = &self.wallet_code {
            wallet = wallet.with_code(load_code(path)?);
        }
        Ok(wallet)
    }
}

pub fn parse_address(s: &str) -> Result<StdAddr> {
    let (address, _) = StdAddr::from_str_ext(s, StdAddrFormat::any())
        .with_context(|| format!("invalid address: {s}"))?;
    Ok(address)
}

/// Loads a code cell from a binary or base64-encoded BOC file.
pub fn load_code(path: &Path) -> Result<Cell> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    if let Ok(cell) = Boc::decode(&data) {
        return Ok(cell);
    }

    let text = std::str::from_utf8(&data).context("code is neither a binary nor a base64 BOC")?;
    Boc::decode_base64(text.trim())
        .with_context(|| format!("failed to decode BOC from {}", path.display()))
}

pub fn block_on<F: Future<Output = Result<()>>>(f: F) -> Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?
        .block_on(f)
}
