use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use ton_jetton_ico::controller::{ConsoleUi, Controller};
use ton_jetton_ico::provider::toncenter::TonCenterClient;

use super::common::{NetworkArgs, WalletArgs, block_on, load_code};

/// Manage a deployed ICO minter interactively.
#[derive(Parser)]
pub struct Cmd {
    #[clap(flatten)]
    network: NetworkArgs,

    #[clap(flatten)]
    wallet: WalletArgs,

    /// Path to the current minter code BOC, used to check the selected contract.
    #[clap(long, env = "JETTON_MINTER_CODE")]
    minter_code: Option<PathBuf>,
}

impl Cmd {
    pub fn run(self) -> Result<()> {
        block_on(self.run_impl())
    }

    async fn run_impl(self) -> Result<()> {
        let config = self.network.load_config()?;
        let expected_code = self.minter_code.as_deref().map(load_code).transpose()?;

        let client = TonCenterClient::new(&config.toncenter)?;
        let wallet = self.wallet.build(client.clone())?;

        let mut controller = Controller::connect(
            &client,
            &wallet,
            ConsoleUi::new(),
            config.confirmation,
            expected_code.as_ref(),
        )
        .await?;

        controller.run().await
    }
}
