use std::future::Future;

use tycho_types::models::{ComputePhase, StateInit, StdAddr, Transaction, TxInfo};
use tycho_types::num::Tokens;
use tycho_types::prelude::*;

pub use self::confirm::{
    Confirmation, ConfirmationPolicy, DeployConfirmation, wait_for_deploy, wait_for_transaction,
};
pub use crate::util::tonlib_helpers::StackItem;

pub mod confirm;
pub mod toncenter;

/// Read access to the chain and submission of external messages.
pub trait ContractProvider: Send + Sync {
    fn get_contract_state(
        &self,
        address: &StdAddr,
    ) -> impl Future<Output = Result<ContractState, ProviderError>> + Send;

    /// Returns up to `limit` latest transactions, newest first.
    fn get_transactions(
        &self,
        address: &StdAddr,
        limit: u8,
    ) -> impl Future<Output = Result<Vec<TransactionInfo>, ProviderError>> + Send;

    fn run_get_method(
        &self,
        address: &StdAddr,
        method: &str,
        args: Vec<StackItem>,
    ) -> impl Future<Output = Result<GetMethodOutput, ProviderError>> + Send;

    /// Submits a serialized external message.
    fn send_message(&self, message: Cell) -> impl Future<Output = Result<(), ProviderError>> + Send;

    fn is_contract_deployed(
        &self,
        address: &StdAddr,
    ) -> impl Future<Output = Result<bool, ProviderError>> + Send {
        async move {
            let state = self.get_contract_state(address).await?;
            Ok(state.status == ContractStatus::Active)
        }
    }

    fn get_last_transaction(
        &self,
        address: &StdAddr,
    ) -> impl Future<Output = Result<Option<TransactionId>, ProviderError>> + Send {
        async move {
            let state = self.get_contract_state(address).await?;
            Ok(state.last_transaction)
        }
    }
}

/// Something that can deliver internal messages on behalf of an account.
pub trait Sender: Send + Sync {
    /// Sender address, if known.
    fn address(&self) -> Option<&StdAddr>;

    fn send(
        &self,
        message: InternalMessage,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send;
}

pub mod send_mode {
    pub const PAY_GAS_SEPARATELY: u8 = 1;
    pub const IGNORE_ERRORS: u8 = 2;
}

#[derive(Debug, Clone)]
pub struct InternalMessage {
    pub to: StdAddr,
    pub value: Tokens,
    pub bounce: bool,
    pub send_mode: u8,
    pub body: Cell,
    pub state_init: Option<StateInit>,
}

impl InternalMessage {
    /// Serializes the message as `int_msg_info` with zeroed fees and timings,
    /// the way wallets expect it inside a signed request.
    pub fn build_cell(&self) -> Result<Cell, tycho_types::error::Error> {
        let context = Cell::empty_context();

        let mut b = CellBuilder::new();
        // int_msg_info$0 ihr_disabled:Bool bounce:Bool bounced:Bool
        b.store_bit_zero()?;
        b.store_bit_one()?;
        b.store_bit(self.bounce)?;
        b.store_bit_zero()?;
        // src:addr_none
        b.store_zeros(2)?;
        self.to.store_into(&mut b, context)?;
        self.value.store_into(&mut b, context)?;
        // extra currencies, ihr_fee, fwd_fee
        b.store_bit_zero()?;
        Tokens::ZERO.store_into(&mut b, context)?;
        Tokens::ZERO.store_into(&mut b, context)?;
        // created_lt, created_at
        b.store_u64(0)?;
        b.store_u32(0)?;

        match &self.state_init {
            Some(state_init) => {
                // just$1 (right$1 ^StateInit)
                b.store_bit_one()?;
                b.store_bit_one()?;
                b.store_reference(CellBuilder::build_from(state_init)?)?;
            }
            None => b.store_bit_zero()?,
        }

        // right$1 ^body
        b.store_bit_one()?;
        b.store_reference(self.body.clone())?;

        b.build()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractStatus {
    Uninit,
    Active,
    Frozen,
}

impl std::fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Uninit => "uninit",
            Self::Active => "active",
            Self::Frozen => "frozen",
        })
    }
}

#[derive(Debug, Clone)]
pub struct ContractState {
    pub status: ContractStatus,
    pub balance: Tokens,
    pub code: Option<Cell>,
    pub data: Option<Cell>,
    pub last_transaction: Option<TransactionId>,
}

impl ContractState {
    pub fn uninit() -> Self {
        Self {
            status: ContractStatus::Uninit,
            balance: Tokens::ZERO,
            code: None,
            data: None,
            last_transaction: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionId {
    pub lt: u64,
    pub hash: HashBytes,
}

/// Short transaction summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionInfo {
    pub id: TransactionId,
    pub utime: u32,
    pub aborted: bool,
    /// Compute phase exit code, `None` when the phase was skipped.
    pub exit_code: Option<i32>,
}

impl TransactionInfo {
    pub fn from_cell(cell: &Cell) -> Result<Self, tycho_types::error::Error> {
        let tx = cell.parse::<Transaction>()?;

        let (aborted, compute_phase) = match tx.load_info()? {
            TxInfo::Ordinary(info) => (info.aborted, info.compute_phase),
            TxInfo::TickTock(info) => (info.aborted, info.compute_phase),
        };
        let exit_code = match compute_phase {
            ComputePhase::Executed(phase) => Some(phase.exit_code),
            ComputePhase::Skipped(_) => None,
        };

        Ok(Self {
            id: TransactionId {
                lt: tx.lt,
                hash: *cell.repr_hash(),
            },
            utime: tx.now,
            aborted,
            exit_code,
        })
    }
}

#[derive(Debug, Clone)]
pub struct GetMethodOutput {
    pub exit_code: i32,
    pub gas_used: u64,
    pub stack: Vec<StackItem>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("invalid cell data: {0}")]
    InvalidData(#[from] tycho_types::error::Error),
    #[error("invalid boc: {0}")]
    InvalidBoc(#[from] tycho_types::boc::de::Error),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("api error {code}: {message}")]
    Api { code: i32, message: String },
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
    #[error("message rejected: {0}")]
    Rejected(String),
    #[error("signer error: {0}")]
    Signer(String),
}
