use std::time::{Duration, UNIX_EPOCH};

use anyhow::{Context, Result};
use num_bigint::BigUint;
use tycho_types::num::Tokens;
use tycho_types::prelude::*;

pub use self::prompt::{
    ConsoleUi, Ui, format_ton, parse_ton_amount, prompt_address, prompt_amount, prompt_bool,
    prompt_url,
};
use crate::contract::{
    ContentType, IcoExitCode, JettonMinterIco, JettonMinterIcoInterface, jetton_content_to_cell,
};
use crate::provider::{
    Confirmation, ConfirmationPolicy, ContractProvider, ContractStatus, Sender, TransactionInfo,
    wait_for_transaction,
};

pub mod prompt;

const FAILED_TRANSACTION_MESSAGE: &str = "Failed to get indication of transaction completion from API!\nCheck result manually, or try again\n";

const YES_NO: [&str; 2] = ["yes", "no"];

/// Forward amount attached to the minted jettons.
const MINT_FORWARD_AMOUNT: Tokens = Tokens::new(50_000_000);
/// Total TON amount passed along with the mint request.
const MINT_TOTAL_AMOUNT: Tokens = Tokens::new(100_000_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Buy,
    Mint,
    ChangeAdmin,
    ChangeContent,
    ChangeState,
    Withdrawal,
    Info,
    Quit,
}

impl Action {
    pub const ADMIN_ACTIONS: [Self; 6] = [
        Self::Buy,
        Self::Mint,
        Self::ChangeAdmin,
        Self::ChangeContent,
        Self::ChangeState,
        Self::Withdrawal,
    ];
    pub const USER_ACTIONS: [Self; 2] = [Self::Info, Self::Quit];

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Buy => "Buy",
            Self::Mint => "Mint",
            Self::ChangeAdmin => "Change admin",
            Self::ChangeContent => "Change content",
            Self::ChangeState => "Change state",
            Self::Withdrawal => "Withdrawal",
            Self::Info => "Info",
            Self::Quit => "Quit",
        }
    }
}

/// Interactive admin session over a single minter.
pub struct Controller<'a, P, S, U> {
    provider: &'a P,
    sender: &'a S,
    ui: U,
    minter: JettonMinterIco,
    policy: ConfirmationPolicy,
}

impl<'a, P, S, U> Controller<'a, P, S, U>
where
    P: ContractProvider,
    S: Sender,
    U: Ui,
{
    /// Asks for the minter address until an active contract is selected.
    pub async fn connect(
        provider: &'a P,
        sender: &'a S,
        mut ui: U,
        policy: ConfirmationPolicy,
        expected_code: Option<&Cell>,
    ) -> Result<Self> {
        let address = loop {
            let address = prompt_address(&mut ui, "Please enter ICO address:", None).await?;

            let state = provider
                .get_contract_state(&address)
                .await
                .context("failed to get contract state")?;
            if state.status != ContractStatus::Active {
                ui.write("This contract is not active!\nPlease use another address, or deploy it first");
                continue;
            }

            let warning = match (expected_code, &state.code) {
                (Some(expected), Some(code)) if code.repr_hash() == expected.repr_hash() => None,
                (Some(_), _) => Some("Contract code differs from the current contract version!\n"),
                (None, Some(code)) if !JettonMinterIcoInterface::detect(code.as_ref()) => {
                    Some("Contract code does not declare the ICO getters!\n")
                }
                (None, _) => None,
            };

            if let Some(warning) = warning {
                ui.write(warning);
                let use_anyway = ui.choose("Use address anyway", &["Yes", "No"]).await?;
                if use_anyway != 0 {
                    continue;
                }
            }

            break address;
        };

        tracing::info!(%address, "minter selected");
        Ok(Self {
            provider,
            sender,
            ui,
            minter: JettonMinterIco::create_from_address(address).with_random_query_ids(),
            policy,
        })
    }

    pub fn minter(&self) -> &JettonMinterIco {
        &self.minter
    }

    pub fn into_ui(self) -> U {
        self.ui
    }

    pub async fn is_admin(&self) -> Result<bool> {
        let Some(sender) = self.sender.address() else {
            return Ok(true);
        };
        let admin = self.minter.get_admin_address(self.provider).await?;
        Ok(admin.as_ref() == Some(sender))
    }

    /// Runs the action loop until the operator quits.
    pub async fn run(&mut self) -> Result<()> {
        let actions = if self.is_admin().await? {
            self.ui.write("Current wallet is ICO admin!\n");
            [Action::ADMIN_ACTIONS.as_slice(), Action::USER_ACTIONS.as_slice()].concat()
        } else {
            self.ui
                .write("Current wallet is not admin!\nAvailable actions restricted\n");
            Action::USER_ACTIONS.to_vec()
        };
        let names = actions.iter().map(Action::name).collect::<Vec<_>>();

        loop {
            let idx = self.ui.choose("Pick action:", &names).await?;
            let action = actions.get(idx).copied().context("invalid action index")?;
            if action == Action::Quit {
                break;
            }

            tracing::debug!(action = action.name(), "performing action");
            if let Err(e) = self.perform(action).await {
                tracing::error!(action = action.name(), "action failed: {e:?}");
                self.ui.write(&format!("Action failed: {e:#}\n"));
            }
        }

        Ok(())
    }

    pub async fn perform(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Buy => self.buy().await,
            Action::Mint => self.mint().await,
            Action::ChangeAdmin => self.change_admin().await,
            Action::ChangeContent => self.change_content().await,
            Action::ChangeState => self.change_state().await,
            Action::Withdrawal => self.withdraw().await,
            Action::Info => self.info().await,
            Action::Quit => Ok(()),
        }
    }

    async fn info(&mut self) -> Result<()> {
        let data = self.minter.get_jetton_data(self.provider).await?;

        self.ui.write("Jetton info:\n");
        match &data.admin_address {
            Some(admin) => self.ui.write(&format!("Admin: {admin}")),
            None => self.ui.write("Admin: none"),
        }
        self.ui
            .write(&format!("Total supply: {}", format_ton(&data.total_supply)));
        self.ui.write(&format!("Mintable: {}", data.mintable));

        if self.ui.choose("Display content?", &["Yes", "No"]).await? == 0 {
            match data.parse_content() {
                Ok(content) => self.ui.write(&format!("Content:\n{content}")),
                Err(e) => self.ui.write(&format!("Failed to parse content: {e:#}")),
            }
        }

        if self.ui.choose("Display ICO info?", &["Yes", "No"]).await? == 0 {
            let ico = self.minter.get_ico_data(self.provider).await?;
            self.ui.write("ICO info:\n");
            self.ui.write(&format!("Paused: {}", ico.paused));
            self.ui.write(&format!("Price: {}", ico.price));
            self.ui.write(&format!("Cap: {}", ico.cap));
            self.ui
                .write(&format!("Start date: {}", format_timestamp(ico.start_date)));
            self.ui
                .write(&format!("End date: {}", format_timestamp(ico.end_date)));
        }

        Ok(())
    }

    async fn change_admin(&mut self) -> Result<()> {
        let current = self.minter.get_admin_address(self.provider).await?;

        let new_admin = loop {
            let new_admin =
                prompt_address(&mut self.ui, "Please specify new admin address:", None).await?;
            if current.as_ref() == Some(&new_admin) {
                self.ui.write(
                    "Address specified matched current admin address!\nPlease pick another one.\n",
                );
                continue;
            }

            self.ui.write(&format!(
                "New admin address is going to be: {new_admin}\nKindly double check it!\n"
            ));
            if prompt_bool(&mut self.ui, "Is it ok?(yes/no)", YES_NO).await? {
                break new_admin;
            }
        };

        let prev_lt = self.last_lt().await?;
        self.minter
            .send_change_admin(self.sender, &new_admin)
            .await?;

        if self.confirm(prev_lt).await {
            let admin_after = self.minter.get_admin_address(self.provider).await?;
            if admin_after.as_ref() == Some(&new_admin) {
                self.ui.write("Admin changed successfully");
            } else {
                self.ui
                    .write("Admin address hasn't changed!\nSomething went wrong!\n");
            }
        }
        Ok(())
    }

    async fn change_content(&mut self) -> Result<()> {
        let current = self.minter.get_content(self.provider).await?;

        let (uri, content) = loop {
            let uri = prompt_url(&mut self.ui, "Please specify new content:").await?;
            let content = jetton_content_to_cell(ContentType::Offchain, &uri)?;
            if content.repr_hash() == current.repr_hash() {
                self.ui
                    .write("URI specified matched current content!\nPlease pick another one.\n");
                continue;
            }

            self.ui.write(&format!(
                "New content is going to be: {uri}\nKindly double check it!\n"
            ));
            if prompt_bool(&mut self.ui, "Is it ok?(yes/no)", YES_NO).await? {
                break (uri, content);
            }
        };

        let prev_lt = self.last_lt().await?;
        self.minter
            .send_change_content(self.sender, content.clone())
            .await?;

        if self.confirm(prev_lt).await {
            let content_after = self.minter.get_content(self.provider).await?;
            if content_after.repr_hash() == content.repr_hash() {
                tracing::info!(%uri, "content changed");
                self.ui.write("Content changed successfully");
            } else {
                self.ui.write("Content hasn't changed!\nSomething went wrong!\n");
            }
        }
        Ok(())
    }

    async fn change_state(&mut self) -> Result<()> {
        let current = self.minter.get_ico_state(self.provider).await?;

        let paused = loop {
            let paused = prompt_bool(
                &mut self.ui,
                "Please specify new state, yes - pause, no - resume:",
                YES_NO,
            )
            .await?;
            if paused == current {
                self.ui.write(
                    "ICO state specified matched current state!\nPlease pick another one.\n",
                );
                continue;
            }

            self.ui.write(&format!(
                "New ICO state is going to be: {}\nKindly double check it!\n",
                if paused { "paused" } else { "active" }
            ));
            if prompt_bool(&mut self.ui, "Is it ok?(yes/no)", YES_NO).await? {
                break paused;
            }
        };

        let prev_lt = self.last_lt().await?;
        self.minter.send_change_state(self.sender, paused).await?;

        if self.confirm(prev_lt).await {
            let state_after = self.minter.get_ico_state(self.provider).await?;
            if state_after == paused {
                self.ui.write("ICO state changed successfully");
            } else {
                self.ui.write("ICO state hasn't changed!\nSomething went wrong!\n");
            }
        }
        Ok(())
    }

    async fn mint(&mut self) -> Result<()> {
        let fallback = match self.sender.address() {
            Some(address) => Some(address.clone()),
            None => self.minter.get_admin_address(self.provider).await?,
        };

        let (to, amount) = loop {
            let to = prompt_address(
                &mut self.ui,
                "Please specify address to mint to",
                fallback.as_ref(),
            )
            .await?;
            let amount =
                prompt_amount(&mut self.ui, "Please provide mint amount in decimal form:").await?;

            self.ui.write(&format!(
                "Mint {} tokens to {to}\n",
                format_ton(&tokens_to_uint(amount))
            ));
            if prompt_bool(&mut self.ui, "Is it ok?(yes/no)", YES_NO).await? {
                break (to, amount);
            }
        };

        let supply_before = self.minter.get_total_supply(self.provider).await?;
        let prev_lt = self.last_lt().await?;

        self.minter
            .send_mint(
                self.sender,
                &to,
                amount,
                MINT_FORWARD_AMOUNT,
                MINT_TOTAL_AMOUNT,
            )
            .await?;

        if self.confirm(prev_lt).await {
            let supply_after = self.minter.get_total_supply(self.provider).await?;
            if supply_after == supply_before + tokens_to_uint(amount) {
                self.ui.write(&format!(
                    "Mint successfull!\nCurrent supply: {}",
                    format_ton(&supply_after)
                ));
            } else {
                self.ui.write("Mint failed!");
            }
        }
        Ok(())
    }

    async fn buy(&mut self) -> Result<()> {
        let amount = loop {
            let amount =
                prompt_amount(&mut self.ui, "Please provide TON amount in decimal form:").await?;
            self.ui.write(&format!(
                "Buying on {}\n",
                format_ton(&tokens_to_uint(amount))
            ));

            match self.minter.get_jetton_amount(self.provider, amount).await {
                Ok(estimate) => self.ui.write(&format!(
                    "Expected to receive: {}\n",
                    format_ton(&estimate)
                )),
                Err(e) => tracing::warn!("failed to estimate jetton amount: {e}"),
            }

            if prompt_bool(&mut self.ui, "Is it ok?(yes/no)", YES_NO).await? {
                break amount;
            }
        };

        let supply_before = self.minter.get_total_supply(self.provider).await?;
        let prev_lt = self.last_lt().await?;

        self.minter.send_buy(self.sender, amount).await?;

        if self.confirm(prev_lt).await {
            let supply_after = self.minter.get_total_supply(self.provider).await?;
            if supply_after > supply_before {
                self.ui.write(&format!(
                    "Buying successfull!\nYou have received: {}",
                    format_ton(&(supply_after - supply_before))
                ));
            } else {
                self.ui.write("Buying failed!");
            }
        }
        Ok(())
    }

    async fn withdraw(&mut self) -> Result<()> {
        let confirmed = prompt_bool(
            &mut self.ui,
            "Is it ok to withdraw TON from ICO on the admin wallet?(yes/no)",
            YES_NO,
        )
        .await?;
        if !confirmed {
            self.ui.write("Withdrawal cancelled");
            return Ok(());
        }

        let state = self.provider.get_contract_state(&self.minter.address).await?;
        let Some(last) = state.last_transaction else {
            anyhow::bail!("last transaction can't be null on deployed contract");
        };
        let balance_before = state.balance;

        self.minter.send_withdraw(self.sender).await?;

        if self.confirm(last.lt).await {
            let balance_after = self
                .provider
                .get_contract_state(&self.minter.address)
                .await?
                .balance;

            if balance_after < balance_before {
                let received = tokens_to_uint(balance_before) - tokens_to_uint(balance_after);
                self.ui.write(&format!(
                    "Withdrawal successfull!\nYou have received: {}",
                    format_ton(&received)
                ));
            } else {
                self.ui.write("Withdrawal failed!");
            }
        }
        Ok(())
    }

    async fn last_lt(&self) -> Result<u64> {
        match self
            .provider
            .get_last_transaction(&self.minter.address)
            .await?
        {
            Some(last) => Ok(last.lt),
            None => anyhow::bail!("last transaction can't be null on deployed contract"),
        }
    }

    /// Waits for the next minter transaction and reports the outcome.
    async fn confirm(&mut self, prev_lt: u64) -> bool {
        let confirmation =
            wait_for_transaction(self.provider, &self.minter.address, prev_lt, &self.policy).await;

        match confirmation {
            Confirmation::Confirmed(tx) => {
                if tx.aborted {
                    self.ui.write(&describe_aborted(&tx));
                }
                true
            }
            Confirmation::TimedOut { .. } => {
                self.ui.write(FAILED_TRANSACTION_MESSAGE);
                false
            }
        }
    }
}

fn describe_aborted(tx: &TransactionInfo) -> String {
    match tx.exit_code {
        Some(code) => match IcoExitCode::from_code(code) {
            Some(known) => format!("Transaction aborted with exit code {known}"),
            None => format!("Transaction aborted with exit code {code}"),
        },
        None => "Transaction aborted, compute phase skipped".to_owned(),
    }
}

fn tokens_to_uint(tokens: Tokens) -> BigUint {
    BigUint::from(tokens.into_inner())
}

fn format_timestamp(timestamp: u32) -> String {
    if timestamp == 0 {
        return "not set".to_owned();
    }
    let time = UNIX_EPOCH + Duration::from_secs(timestamp as u64);
    format!("{timestamp} ({})", humantime::format_rfc3339_seconds(time))
}
