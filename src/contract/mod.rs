use num_bigint::BigUint;
use tycho_types::models::{StateInit, StdAddr};
use tycho_types::num::Tokens;
use tycho_types::prelude::*;

pub use self::interface::{JettonMinterIcoInterface, parse_contract_getters};
pub use self::models::*;
use crate::provider::{ContractProvider, InternalMessage, ProviderError, Sender, send_mode};
use crate::util::tonlib_helpers::StackItem;

pub mod interface;
pub mod models;

/// Client-side handle of a deployed (or about to be deployed) minter.
#[derive(Debug, Clone)]
pub struct JettonMinterIco {
    pub address: StdAddr,
    pub init: Option<StateInit>,
    random_query_ids: bool,
}

impl JettonMinterIco {
    pub const MINT_FEE: Tokens = Tokens::new(100_000_000);
    pub const DISCOVERY_VALUE: Tokens = Tokens::new(100_000_000);
    pub const CHANGE_ADMIN_VALUE: Tokens = Tokens::new(100_000_000);
    pub const CHANGE_CONTENT_VALUE: Tokens = Tokens::new(100_000_000);
    pub const CHANGE_STATE_VALUE: Tokens = Tokens::new(200_000_000);
    pub const WITHDRAW_VALUE: Tokens = Tokens::new(100_000_000);

    pub fn create_from_address(address: StdAddr) -> Self {
        Self {
            address,
            init: None,
            random_query_ids: false,
        }
    }

    pub fn create_from_config(
        config: &JettonMinterIcoConfig,
        code: Cell,
        workchain: i8,
    ) -> Result<Self, ContractError> {
        let init = StateInit {
            code: Some(code),
            data: Some(config.to_cell()?),
            ..Default::default()
        };
        let hash = *CellBuilder::build_from(&init)?.repr_hash();

        Ok(Self {
            address: StdAddr::new(workchain, hash),
            init: Some(init),
            random_query_ids: false,
        })
    }

    /// Use a random query id for each message instead of zero.
    pub fn with_random_query_ids(mut self) -> Self {
        self.random_query_ids = true;
        self
    }

    fn query_id(&self) -> u64 {
        if self.random_query_ids {
            rand::random()
        } else {
            0
        }
    }

    // === Message bodies ===

    fn begin_message(op: u32, query_id: u64) -> Result<CellBuilder, tycho_types::error::Error> {
        let mut b = CellBuilder::new();
        b.store_u32(op)?;
        b.store_u64(query_id)?;
        Ok(b)
    }

    pub fn mint_message(
        query_id: u64,
        to: &StdAddr,
        jetton_amount: Tokens,
        forward_ton_amount: Tokens,
        total_ton_amount: Tokens,
    ) -> Result<Cell, tycho_types::error::Error> {
        let context = Cell::empty_context();
        let mut b = Self::begin_message(op::MINT, query_id)?;
        to.store_into(&mut b, context)?;
        jetton_amount.store_into(&mut b, context)?;
        forward_ton_amount.store_into(&mut b, context)?;
        total_ton_amount.store_into(&mut b, context)?;
        b.build()
    }

    pub fn discovery_message(
        query_id: u64,
        owner: &StdAddr,
        include_address: bool,
    ) -> Result<Cell, tycho_types::error::Error> {
        let mut b = Self::begin_message(op::PROVIDE_WALLET_ADDRESS, query_id)?;
        owner.store_into(&mut b, Cell::empty_context())?;
        b.store_bit(include_address)?;
        b.build()
    }

    pub fn change_admin_message(
        query_id: u64,
        new_admin: &StdAddr,
    ) -> Result<Cell, tycho_types::error::Error> {
        let mut b = Self::begin_message(op::CHANGE_ADMIN, query_id)?;
        new_admin.store_into(&mut b, Cell::empty_context())?;
        b.build()
    }

    pub fn change_content_message(
        query_id: u64,
        content: Cell,
    ) -> Result<Cell, tycho_types::error::Error> {
        let mut b = Self::begin_message(op::CHANGE_CONTENT, query_id)?;
        b.store_reference(content)?;
        b.build()
    }

    pub fn change_state_message(
        query_id: u64,
        paused: bool,
    ) -> Result<Cell, tycho_types::error::Error> {
        let mut b = Self::begin_message(op::CHANGE_STATE, query_id)?;
        b.store_bit(paused)?;
        b.build()
    }

    pub fn withdraw_message(query_id: u64) -> Result<Cell, tycho_types::error::Error> {
        Self::begin_message(op::WITHDRAW, query_id)?.build()
    }

    pub fn buy_message(query_id: u64) -> Result<Cell, tycho_types::error::Error> {
        Self::begin_message(op::BUY, query_id)?.build()
    }

    // === Senders ===

    async fn send_internal<S: Sender>(
        &self,
        via: &S,
        value: Tokens,
        body: Cell,
    ) -> Result<(), ContractError> {
        via.send(InternalMessage {
            to: self.address.clone(),
            value,
            bounce: true,
            send_mode: send_mode::PAY_GAS_SEPARATELY,
            body,
            state_init: None,
        })
        .await?;
        Ok(())
    }

    pub async fn send_deploy<S: Sender>(&self, via: &S, value: Tokens) -> Result<(), ContractError> {
        let Some(init) = self.init.clone() else {
            return Err(ContractError::NoStateInit);
        };

        tracing::info!(address = %self.address, %value, "deploying minter");
        via.send(InternalMessage {
            to: self.address.clone(),
            value,
            bounce: false,
            send_mode: send_mode::PAY_GAS_SEPARATELY,
            body: Cell::empty_cell(),
            state_init: Some(init),
        })
        .await?;
        Ok(())
    }

    pub async fn send_mint<S: Sender>(
        &self,
        via: &S,
        to: &StdAddr,
        jetton_amount: Tokens,
        forward_ton_amount: Tokens,
        total_ton_amount: Tokens,
    ) -> Result<(), ContractError> {
        let body = Self::mint_message(
            self.query_id(),
            to,
            jetton_amount,
            forward_ton_amount,
            total_ton_amount,
        )?;
        let value = total_ton_amount
            .checked_add(Self::MINT_FEE)
            .ok_or(tycho_types::error::Error::IntOverflow)?;
        self.send_internal(via, value, body).await
    }

    pub async fn send_discovery<S: Sender>(
        &self,
        via: &S,
        owner: &StdAddr,
        include_address: bool,
        value: Option<Tokens>,
    ) -> Result<(), ContractError> {
        let body = Self::discovery_message(self.query_id(), owner, include_address)?;
        let value = value.unwrap_or(Self::DISCOVERY_VALUE);
        self.send_internal(via, value, body).await
    }

    pub async fn send_change_admin<S: Sender>(
        &self,
        via: &S,
        new_admin: &StdAddr,
    ) -> Result<(), ContractError> {
        let body = Self::change_admin_message(self.query_id(), new_admin)?;
        self.send_internal(via, Self::CHANGE_ADMIN_VALUE, body).await
    }

    pub async fn send_change_content<S: Sender>(
        &self,
        via: &S,
        content: Cell,
    ) -> Result<(), ContractError> {
        let body = Self::change_content_message(self.query_id(), content)?;
        self.send_internal(via, Self::CHANGE_CONTENT_VALUE, body).await
    }

    pub async fn send_change_state<S: Sender>(
        &self,
        via: &S,
        paused: bool,
    ) -> Result<(), ContractError> {
        let body = Self::change_state_message(self.query_id(), paused)?;
        self.send_internal(via, Self::CHANGE_STATE_VALUE, body).await
    }

    pub async fn send_withdraw<S: Sender>(&self, via: &S) -> Result<(), ContractError> {
        let body = Self::withdraw_message(self.query_id())?;
        self.send_internal(via, Self::WITHDRAW_VALUE, body).await
    }

    pub async fn send_buy<S: Sender>(&self, via: &S, value: Tokens) -> Result<(), ContractError> {
        let body = Self::buy_message(self.query_id())?;
        self.send_internal(via, value, body).await
    }

    // === Getters ===

    pub async fn run_getter<P, R>(
        &self,
        provider: &P,
        method: &'static str,
        args: Vec<StackItem>,
    ) -> Result<R, ContractError>
    where
        P: ContractProvider,
        R: FromStack,
    {
        let output = provider.run_get_method(&self.address, method, args).await?;
        if output.exit_code != 0 && output.exit_code != 1 {
            return Err(ContractError::GetMethodFailed {
                method,
                exit_code: output.exit_code,
            });
        }

        if let Some(required) = R::field_count_hint() {
            if output.stack.len() < required {
                return Err(ContractError::FailedToParse {
                    method,
                    error: anyhow::anyhow!("too few stack items"),
                });
            }
        }

        R::from_stack(output.stack).map_err(|error| ContractError::FailedToParse { method, error })
    }

    pub async fn get_jetton_data<P: ContractProvider>(
        &self,
        provider: &P,
    ) -> Result<JettonData, ContractError> {
        self.run_getter(provider, "get_jetton_data", Vec::new()).await
    }

    pub async fn get_total_supply<P: ContractProvider>(
        &self,
        provider: &P,
    ) -> Result<BigUint, ContractError> {
        Ok(self.get_jetton_data(provider).await?.total_supply)
    }

    pub async fn get_admin_address<P: ContractProvider>(
        &self,
        provider: &P,
    ) -> Result<Option<StdAddr>, ContractError> {
        Ok(self.get_jetton_data(provider).await?.admin_address)
    }

    pub async fn get_content<P: ContractProvider>(
        &self,
        provider: &P,
    ) -> Result<Cell, ContractError> {
        Ok(self.get_jetton_data(provider).await?.content)
    }

    pub async fn get_ico_data<P: ContractProvider>(
        &self,
        provider: &P,
    ) -> Result<IcoData, ContractError> {
        self.run_getter(provider, "get_ico_data", Vec::new()).await
    }

    pub async fn get_ico_state<P: ContractProvider>(
        &self,
        provider: &P,
    ) -> Result<bool, ContractError> {
        Ok(self.get_ico_data(provider).await?.paused)
    }

    pub async fn get_ico_price<P: ContractProvider>(
        &self,
        provider: &P,
    ) -> Result<BigUint, ContractError> {
        Ok(self.get_ico_data(provider).await?.price)
    }

    pub async fn get_ico_cap<P: ContractProvider>(
        &self,
        provider: &P,
    ) -> Result<BigUint, ContractError> {
        Ok(self.get_ico_data(provider).await?.cap)
    }

    pub async fn get_ico_start_date<P: ContractProvider>(
        &self,
        provider: &P,
    ) -> Result<u32, ContractError> {
        Ok(self.get_ico_data(provider).await?.start_date)
    }

    pub async fn get_ico_end_date<P: ContractProvider>(
        &self,
        provider: &P,
    ) -> Result<u32, ContractError> {
        Ok(self.get_ico_data(provider).await?.end_date)
    }

    pub async fn get_wallet_address<P: ContractProvider>(
        &self,
        provider: &P,
        owner: &StdAddr,
    ) -> Result<StdAddr, ContractError> {
        let args = vec![StackItem::address(owner)?];
        let output: GetWalletAddressOutput = self
            .run_getter(provider, "get_wallet_address", args)
            .await?;
        Ok(output.address)
    }

    /// Jetton amount the contract would give for `value` nanotons.
    pub async fn get_jetton_amount<P: ContractProvider>(
        &self,
        provider: &P,
        value: Tokens,
    ) -> Result<BigUint, ContractError> {
        let args = vec![StackItem::int(value.into_inner())];
        let output: GetJettonAmountOutput = self
            .run_getter(provider, "get_jetton_amount", args)
            .await?;
        Ok(output.amount)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("invalid cell data: {0}")]
    InvalidData(#[from] tycho_types::error::Error),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("get-method `{method}` failed with exit code {exit_code}")]
    GetMethodFailed { method: &'static str, exit_code: i32 },
    #[error("failed to parse `{method}` output: {error}")]
    FailedToParse {
        method: &'static str,
        error: anyhow::Error,
    },
    #[error("contract state init is unknown")]
    NoStateInit,
}
