use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use num_bigint::BigUint;
use ton_jetton_ico::contract::{
    IcoExitCode, JettonMinterIco, JettonMinterIcoConfig, MIN_TONS_FOR_STORAGE, MinterStorage, op,
};
use ton_jetton_ico::provider::{
    ContractProvider, ContractState, ContractStatus, GetMethodOutput, InternalMessage,
    ProviderError, Sender, StackItem, TransactionId, TransactionInfo,
};
use tycho_types::models::StdAddr;
use tycho_types::num::Tokens;
use tycho_types::prelude::*;

use super::{NOW, minter_code};

/// Exit code of the standard jetton minter for unauthorized admin calls.
pub const UNAUTHORIZED: i32 = 73;
const UNKNOWN_OP: i32 = 0xffff;

/// In-memory chain with a single emulated ICO minter.
#[derive(Clone, Default)]
pub struct Chain {
    inner: Arc<Mutex<ChainState>>,
}

#[derive(Default)]
struct ChainState {
    now: u32,
    lt: u64,
    balances: HashMap<StdAddr, u128>,
    minter: Option<Minter>,
    jettons: HashMap<StdAddr, BigUint>,
    drop_messages: bool,
}

struct Minter {
    address: StdAddr,
    code: Cell,
    storage: MinterStorage,
    balance: u128,
    transactions: Vec<TransactionInfo>,
}

impl Chain {
    pub fn new() -> Self {
        let chain = Self::default();
        chain.inner.lock().unwrap().now = NOW;
        chain
    }

    pub fn set_now(&self, now: u32) {
        self.inner.lock().unwrap().now = now;
    }

    /// Makes the chain silently drop all incoming messages.
    pub fn set_drop_messages(&self, drop: bool) {
        self.inner.lock().unwrap().drop_messages = drop;
    }

    pub fn wallet(&self, address: StdAddr, balance: u128) -> SandboxWallet {
        self.inner
            .lock()
            .unwrap()
            .balances
            .insert(address.clone(), balance);
        SandboxWallet {
            chain: self.clone(),
            address,
        }
    }

    pub fn balance(&self, address: &StdAddr) -> u128 {
        let state = self.inner.lock().unwrap();
        match &state.minter {
            Some(minter) if &minter.address == address => minter.balance,
            _ => state.balances.get(address).copied().unwrap_or_default(),
        }
    }

    pub fn minter_storage_paused(&self) -> Option<bool> {
        let state = self.inner.lock().unwrap();
        state.minter.as_ref().map(|m| m.storage.paused)
    }

    /// Jetton balance of the wallet derived for `owner`.
    pub fn jetton_balance(&self, owner: &StdAddr) -> BigUint {
        let state = self.inner.lock().unwrap();
        let Some(minter) = &state.minter else {
            return BigUint::ZERO;
        };
        let wallet = derive_wallet(&minter.address, owner);
        state.jettons.get(&wallet).cloned().unwrap_or_default()
    }

    pub fn last_transaction(&self) -> Option<TransactionInfo> {
        let state = self.inner.lock().unwrap();
        state
            .minter
            .as_ref()
            .and_then(|m| m.transactions.last().cloned())
    }

    /// Forgets the minter transaction history while keeping it active.
    pub fn clear_history(&self) {
        let mut state = self.inner.lock().unwrap();
        if let Some(minter) = &mut state.minter {
            minter.transactions.clear();
        }
    }

    /// Deploys the minter directly, without an incoming message.
    pub fn deploy(&self, config: &JettonMinterIcoConfig, balance: u128) -> JettonMinterIco {
        let minter = JettonMinterIco::create_from_config(config, minter_code(), 0).unwrap();
        let mut state = self.inner.lock().unwrap();
        state.minter = Some(Minter {
            address: minter.address.clone(),
            code: minter_code(),
            storage: config.to_storage(),
            balance,
            transactions: Vec::new(),
        });
        state.record(0);
        minter
    }

    fn deliver(&self, from: &StdAddr, message: InternalMessage) -> Result<(), ProviderError> {
        let mut state = self.inner.lock().unwrap();

        let value = message.value.into_inner();
        let sender_balance = state.balances.entry(from.clone()).or_default();
        if *sender_balance < value {
            return Err(ProviderError::Rejected("not enough balance".to_owned()));
        }
        *sender_balance -= value;

        if state.drop_messages {
            return Ok(());
        }

        let is_minter = matches!(&state.minter, Some(m) if m.address == message.to);
        if !is_minter {
            match message.state_init {
                Some(init) => state.deploy_from_init(&message.to, init, value)?,
                None => *state.balances.entry(message.to.clone()).or_default() += value,
            }
            return Ok(());
        }

        match state.execute(from, &message) {
            Ok(()) => state.record(0),
            Err(exit_code) => {
                // Bounced
                *state.balances.entry(from.clone()).or_default() += value;
                state.record(exit_code);
            }
        }
        Ok(())
    }
}

impl ChainState {
    fn record(&mut self, exit_code: i32) {
        self.lt += 1000;
        let lt = self.lt;
        let now = self.now;
        if let Some(minter) = &mut self.minter {
            minter.transactions.push(TransactionInfo {
                id: TransactionId {
                    lt,
                    hash: HashBytes([(lt % 251) as u8; 32]),
                },
                utime: now,
                aborted: exit_code != 0,
                exit_code: Some(exit_code),
            });
        }
    }

    fn deploy_from_init(
        &mut self,
        to: &StdAddr,
        init: tycho_types::models::StateInit,
        value: u128,
    ) -> Result<(), ProviderError> {
        let hash = *CellBuilder::build_from(&init)?.repr_hash();
        if hash != to.address {
            return Err(ProviderError::Rejected("state init mismatch".to_owned()));
        }
        let (Some(code), Some(data)) = (init.code, init.data) else {
            return Err(ProviderError::Rejected("incomplete state init".to_owned()));
        };

        self.minter = Some(Minter {
            address: to.clone(),
            code,
            storage: data.parse::<MinterStorage>()?,
            balance: value,
            transactions: Vec::new(),
        });
        self.record(0);
        Ok(())
    }

    fn execute(&mut self, from: &StdAddr, message: &InternalMessage) -> Result<(), i32> {
        let now = self.now;
        let value = message.value.into_inner();
        let Some(minter) = self.minter.as_mut() else {
            return Err(UNKNOWN_OP);
        };

        let mut body = message.body.as_slice().map_err(|_| UNKNOWN_OP)?;
        if body.is_data_empty() {
            minter.balance += value;
            return Ok(());
        }
        let op = body.load_u32().map_err(|_| UNKNOWN_OP)?;
        body.load_u64().map_err(|_| UNKNOWN_OP)?;

        let is_admin = &minter.storage.admin == from;
        let storage = &mut minter.storage;

        match op {
            op::MINT => {
                if !is_admin {
                    return Err(UNAUTHORIZED);
                }
                let to = StdAddr::load_from(&mut body).map_err(|_| UNKNOWN_OP)?;
                let amount = Tokens::load_from(&mut body).map_err(|_| UNKNOWN_OP)?;
                let _forward = Tokens::load_from(&mut body).map_err(|_| UNKNOWN_OP)?;
                let total = Tokens::load_from(&mut body).map_err(|_| UNKNOWN_OP)?;

                let supply = storage.total_supply.into_inner() + amount.into_inner();
                storage.total_supply = Tokens::new(supply);
                minter.balance += value.saturating_sub(total.into_inner());
                let wallet = derive_wallet(&minter.address, &to);
                *self.jettons.entry(wallet).or_default() += BigUint::from(amount.into_inner());
                *self.balances.entry(to).or_default() += total.into_inner();
            }
            op::CHANGE_ADMIN => {
                if !is_admin {
                    return Err(UNAUTHORIZED);
                }
                storage.admin = StdAddr::load_from(&mut body).map_err(|_| UNKNOWN_OP)?;
                minter.balance += value;
            }
            op::CHANGE_CONTENT => {
                if !is_admin {
                    return Err(UNAUTHORIZED);
                }
                storage.content = body.load_reference_cloned().map_err(|_| UNKNOWN_OP)?;
                minter.balance += value;
            }
            op::CHANGE_STATE => {
                if !is_admin {
                    return Err(IcoExitCode::UnauthorizedChangeState.code());
                }
                storage.paused = body.load_bit().map_err(|_| UNKNOWN_OP)?;
                minter.balance += value;
            }
            op::WITHDRAW => {
                if !is_admin {
                    return Err(IcoExitCode::UnauthorizedWithdraw.code());
                }
                let total = minter.balance + value;
                let reserve = MIN_TONS_FOR_STORAGE.into_inner();
                minter.balance = total.min(reserve);
                *self.balances.entry(from.clone()).or_default() += total.saturating_sub(reserve);
            }
            op::BUY => {
                if storage.paused {
                    return Err(IcoExitCode::Paused.code());
                }
                if now < storage.ico_start_date {
                    return Err(IcoExitCode::IcoClosed.code());
                }
                if storage.ico_end_date != 0 && now > storage.ico_end_date {
                    return Err(IcoExitCode::IcoExpired.code());
                }
                let reserve = MIN_TONS_FOR_STORAGE.into_inner();
                if value <= reserve {
                    return Err(IcoExitCode::MinAmount.code());
                }
                let amount = storage.price as u128 * (value - reserve);
                if storage.total_supply.into_inner() + amount > storage.cap as u128 {
                    return Err(IcoExitCode::CapExceeded.code());
                }

                storage.total_supply = Tokens::new(storage.total_supply.into_inner() + amount);
                minter.balance += value;
                let wallet = derive_wallet(&minter.address, from);
                *self.jettons.entry(wallet).or_default() += BigUint::from(amount);
            }
            _ => return Err(UNKNOWN_OP),
        }

        Ok(())
    }
}

pub fn derive_wallet(minter: &StdAddr, owner: &StdAddr) -> StdAddr {
    let mut b = CellBuilder::new();
    minter.store_into(&mut b, Cell::empty_context()).unwrap();
    owner.store_into(&mut b, Cell::empty_context()).unwrap();
    StdAddr::new(0, *b.build().unwrap().repr_hash())
}

fn bool_item(value: bool) -> StackItem {
    StackItem::int(if value { -1 } else { 0 })
}

impl ContractProvider for Chain {
    async fn get_contract_state(&self, address: &StdAddr) -> Result<ContractState, ProviderError> {
        let state = self.inner.lock().unwrap();
        if let Some(minter) = &state.minter {
            if &minter.address == address {
                return Ok(ContractState {
                    status: ContractStatus::Active,
                    balance: Tokens::new(minter.balance),
                    code: Some(minter.code.clone()),
                    data: Some(CellBuilder::build_from(&minter.storage)?),
                    last_transaction: minter.transactions.last().map(|tx| tx.id),
                });
            }
        }

        Ok(match state.balances.get(address) {
            Some(balance) => ContractState {
                balance: Tokens::new(*balance),
                ..ContractState::uninit()
            },
            None => ContractState::uninit(),
        })
    }

    async fn get_transactions(
        &self,
        address: &StdAddr,
        limit: u8,
    ) -> Result<Vec<TransactionInfo>, ProviderError> {
        let state = self.inner.lock().unwrap();
        Ok(match &state.minter {
            Some(minter) if &minter.address == address => minter
                .transactions
                .iter()
                .rev()
                .take(limit as usize)
                .cloned()
                .collect(),
            _ => Vec::new(),
        })
    }

    async fn run_get_method(
        &self,
        address: &StdAddr,
        method: &str,
        args: Vec<StackItem>,
    ) -> Result<GetMethodOutput, ProviderError> {
        let state = self.inner.lock().unwrap();
        let Some(minter) = state.minter.as_ref().filter(|m| &m.address == address) else {
            return Ok(GetMethodOutput {
                exit_code: -13,
                gas_used: 0,
                stack: Vec::new(),
            });
        };
        let storage = &minter.storage;

        let stack = match method {
            "get_jetton_data" => vec![
                StackItem::int(storage.total_supply.into_inner()),
                bool_item(true),
                StackItem::address(&storage.admin)?,
                StackItem::Cell(storage.content.clone()),
                StackItem::Cell(storage.wallet_code.clone()),
            ],
            "get_ico_data" => vec![
                bool_item(storage.paused),
                StackItem::int(storage.price),
                StackItem::int(storage.cap),
                StackItem::int(storage.ico_start_date),
                StackItem::int(storage.ico_end_date),
            ],
            "get_wallet_address" => {
                let Some(StackItem::Slice(owner)) = args.first() else {
                    return Ok(GetMethodOutput {
                        exit_code: 7,
                        gas_used: 0,
                        stack: Vec::new(),
                    });
                };
                let owner = owner.parse::<StdAddr>()?;
                vec![StackItem::address(&derive_wallet(&minter.address, &owner))?]
            }
            "get_jetton_amount" => {
                let Some(StackItem::Int(value)) = args.first() else {
                    return Ok(GetMethodOutput {
                        exit_code: 7,
                        gas_used: 0,
                        stack: Vec::new(),
                    });
                };
                let value = u128::try_from(value).unwrap_or_default();
                let amount =
                    storage.price as u128 * value.saturating_sub(MIN_TONS_FOR_STORAGE.into_inner());
                vec![StackItem::int(amount)]
            }
            _ => {
                return Ok(GetMethodOutput {
                    exit_code: 11,
                    gas_used: 0,
                    stack: Vec::new(),
                });
            }
        };

        Ok(GetMethodOutput {
            exit_code: 0,
            gas_used: 1000,
            stack,
        })
    }

    async fn send_message(&self, _: Cell) -> Result<(), ProviderError> {
        Err(ProviderError::Rejected(
            "external messages are not emulated".to_owned(),
        ))
    }
}

/// Wallet which delivers internal messages straight into the emulated chain.
#[derive(Clone)]
pub struct SandboxWallet {
    chain: Chain,
    address: StdAddr,
}

impl Sender for SandboxWallet {
    fn address(&self) -> Option<&StdAddr> {
        Some(&self.address)
    }

    async fn send(&self, message: InternalMessage) -> Result<(), ProviderError> {
        self.chain.deliver(&self.address, message)
    }
}

