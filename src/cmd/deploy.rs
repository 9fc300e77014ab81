use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ton_jetton_ico::contract::{
    ContentType, JettonMinterIco, JettonMinterIcoConfig, jetton_content_to_cell,
};
use ton_jetton_ico::controller::{format_ton, parse_ton_amount};
use ton_jetton_ico::provider::toncenter::TonCenterClient;
use ton_jetton_ico::provider::{ContractProvider, DeployConfirmation, wait_for_deploy};
use tycho_types::models::StdAddr;
use tycho_types::num::Tokens;

use super::common::{NetworkArgs, WalletArgs, block_on, load_code, parse_address};

/// Deploy a new ICO minter.
#[derive(Parser)]
pub struct Cmd {
    #[clap(flatten)]
    network: NetworkArgs,

    #[clap(flatten)]
    wallet: WalletArgs,

    /// Minter admin address.
    #[clap(long, env = "JETTON_ADMIN", value_parser = parse_address)]
    admin: StdAddr,

    /// Off-chain content URI.
    #[clap(long, env = "JETTON_CONTENT_URI", default_value = "")]
    content_uri: String,

    /// Initial paused flag, non-zero pauses the ICO.
    #[clap(long, env = "JETTON_STATE", default_value_t = 0)]
    state: u8,

    #[clap(long, env = "JETTON_PRICE", default_value_t = 1_000_000_000)]
    price: u64,

    #[clap(long, env = "JETTON_CAP", default_value_t = 1_000_000_000)]
    cap: u64,

    /// ICO start unix timestamp.
    #[clap(long, env = "JETTON_ICO_START_DATE", default_value_t = 0)]
    ico_start_date: u32,

    /// ICO end unix timestamp.
    #[clap(long, env = "JETTON_ICO_END_DATE", default_value_t = 0)]
    ico_end_date: u32,

    /// Path to the compiled minter code BOC.
    #[clap(long, env = "JETTON_MINTER_CODE")]
    minter_code: PathBuf,

    /// Path to the compiled jetton wallet code BOC.
    #[clap(long, env = "JETTON_WALLET_CODE")]
    wallet_code: PathBuf,

    /// TON amount attached to the deploy message.
    #[clap(long, default_value = "0.05", value_parser = parse_ton_amount)]
    value: Tokens,

    #[clap(long, default_value_t = 0, allow_negative_numbers = true)]
    workchain: i8,
}

impl Cmd {
    pub fn run(self) -> Result<()> {
        block_on(self.run_impl())
    }

    #[allow(clippy::print_stdout)]
    async fn run_impl(self) -> Result<()> {
        let config = self.network.load_config()?;
        let client = TonCenterClient::new(&config.toncenter)?;
        let wallet = self.wallet.build(client.clone())?;

        let minter_config = JettonMinterIcoConfig {
            admin: self.admin,
            content: jetton_content_to_cell(ContentType::Offchain, &self.content_uri)?,
            wallet_code: load_code(&self.wallet_code)?,
            state: self.state != 0,
            price: self.price,
            cap: self.cap,
            ico_start_date: self.ico_start_date,
            ico_end_date: self.ico_end_date,
        };
        let minter_code = load_code(&self.minter_code)?;
        let minter =
            JettonMinterIco::create_from_config(&minter_config, minter_code, self.workchain)?
                .with_random_query_ids();

        println!("Minter address: {}", minter.address);
        if client
            .is_contract_deployed(&minter.address)
            .await
            .context("failed to check minter state")?
        {
            println!("Minter is already deployed");
            return Ok(());
        }

        minter
            .send_deploy(&wallet, self.value)
            .await
            .context("failed to send deploy message")?;

        if let DeployConfirmation::TimedOut { attempts } =
            wait_for_deploy(&client, &minter.address, &config.confirmation).await
        {
            anyhow::bail!(
                "failed to get indication of deployment from API after {attempts} attempts, \
                check {} manually",
                minter.address
            );
        }

        let supply = minter.get_total_supply(&client).await?;
        println!("Minter deployed, total supply: {}", format_ton(&supply));
        Ok(())
    }
}
