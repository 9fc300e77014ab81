#![allow(dead_code)]

use std::time::Duration;

use ton_jetton_ico::contract::{ContentType, JettonMinterIcoConfig, jetton_content_to_cell};
use ton_jetton_ico::provider::ConfirmationPolicy;
use tycho_types::models::StdAddr;
use tycho_types::prelude::*;

pub use self::chain::{Chain, SandboxWallet, UNAUTHORIZED, derive_wallet};
pub use self::mock_api::MockTonCenter;
pub use self::ui::ScriptedUi;

pub mod chain;
pub mod mock_api;
pub mod ui;

pub const ONE_TON: u128 = 1_000_000_000;
pub const NOW: u32 = 1_700_000_000;

pub fn init_logger(name: &str) {
    tycho_util::test::init_logger(name, "debug");
}

pub fn addr(byte: u8) -> StdAddr {
    StdAddr::new(0, HashBytes([byte; 32]))
}

pub fn fast_policy() -> ConfirmationPolicy {
    ConfirmationPolicy {
        attempts: 3,
        interval: Duration::from_millis(1),
    }
}

pub fn minter_code() -> Cell {
    CellBuilder::build_from(0x1c0de1c0u32).unwrap()
}

pub fn wallet_code() -> Cell {
    CellBuilder::build_from(0x3a11e7u32).unwrap()
}

pub fn make_config(admin: &StdAddr) -> JettonMinterIcoConfig {
    JettonMinterIcoConfig {
        admin: admin.clone(),
        content: jetton_content_to_cell(ContentType::Offchain, "https://example.com/jetton.json")
            .unwrap(),
        wallet_code: wallet_code(),
        state: false,
        price: 2,
        cap: 10 * ONE_TON as u64,
        ico_start_date: NOW - 3600,
        ico_end_date: NOW + 3600,
    }
}

/// Builds an ordinary transaction cell with an executed compute phase.
pub fn build_transaction(
    account: &HashBytes,
    lt: u64,
    now: u32,
    aborted: bool,
    exit_code: i32,
) -> Result<Cell, tycho_types::error::Error> {
    let compute_details = {
        let mut b = CellBuilder::new();
        // gas_used and gas_limit
        b.store_small_uint(0, 3)?;
        b.store_small_uint(0, 3)?;
        // gas_credit
        b.store_bit_zero()?;
        // mode
        b.store_u8(0)?;
        b.store_u32(exit_code as u32)?;
        // exit_arg
        b.store_bit_zero()?;
        // vm_steps
        b.store_u32(0)?;
        b.store_u256(&HashBytes::ZERO)?;
        b.store_u256(&HashBytes::ZERO)?;
        b.build()?
    };

    let description = {
        let mut b = CellBuilder::new();
        // trans_ord
        b.store_small_uint(0b0000, 4)?;
        // credit_first, storage_ph, credit_ph
        b.store_zeros(3)?;
        // tr_phase_compute_vm
        b.store_bit_one()?;
        b.store_bit(exit_code == 0)?;
        // msg_state_used, account_activated
        b.store_zeros(2)?;
        // gas_fees
        b.store_small_uint(0, 4)?;
        b.store_reference(compute_details)?;
        // action
        b.store_bit_zero()?;
        b.store_bit(aborted)?;
        // bounce, destroyed
        b.store_zeros(2)?;
        b.build()?
    };

    let state_update = {
        let mut b = CellBuilder::new();
        b.store_u8(0x72)?;
        b.store_u256(&HashBytes::ZERO)?;
        b.store_u256(&HashBytes::ZERO)?;
        b.build()?
    };

    let messages = {
        let mut b = CellBuilder::new();
        // in_msg, out_msgs
        b.store_zeros(2)?;
        b.build()?
    };

    let mut b = CellBuilder::new();
    b.store_small_uint(0b0111, 4)?;
    b.store_u256(account)?;
    b.store_u64(lt)?;
    b.store_u256(&HashBytes::ZERO)?;
    b.store_u64(0)?;
    b.store_u32(now)?;
    // outmsg_cnt
    b.store_uint(0, 15)?;
    // orig_status, end_status: active
    b.store_small_uint(0b10, 2)?;
    b.store_small_uint(0b10, 2)?;
    b.store_reference(messages)?;
    // total_fees
    b.store_small_uint(0, 4)?;
    b.store_bit_zero()?;
    b.store_reference(state_update)?;
    b.store_reference(description)?;
    b.build()
}
