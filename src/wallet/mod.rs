use std::time::Duration;

use ed25519_dalek::{Signer, SigningKey};
use serde::{Deserialize, Serialize};
use tycho_types::models::{StateInit, StdAddr};
use tycho_types::num::Tokens;
use tycho_types::prelude::*;

pub use self::mnemonic::{derive_from_mnemonic, parse_secret_key};
use crate::provider::{
    ContractProvider, ContractState, ContractStatus, InternalMessage, ProviderError, Sender,
};
use crate::util::tonlib_helpers::StackParser;

pub mod mnemonic;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WalletVersion {
    #[value(name = "v3r2")]
    V3R2,
    #[default]
    #[value(name = "v4r2")]
    V4R2,
}

impl WalletVersion {
    pub const DEFAULT_WALLET_ID: u32 = 698983191;

    pub fn default_subwallet_id(workchain: i8) -> u32 {
        Self::DEFAULT_WALLET_ID.wrapping_add_signed(workchain as i32)
    }

    /// Initial state of a fresh wallet with the given code.
    pub fn state_init(
        &self,
        code: Cell,
        public_key: &HashBytes,
        subwallet_id: u32,
    ) -> Result<StateInit, tycho_types::error::Error> {
        // seqno:32 subwallet_id:32 public_key:256 (plugins:(HashmapE 256 ..) for v4)
        let mut b = CellBuilder::new();
        b.store_u32(0)?;
        b.store_u32(subwallet_id)?;
        b.store_u256(public_key)?;
        if *self == Self::V4R2 {
            b.store_bit_zero()?;
        }

        Ok(StateInit {
            code: Some(code),
            data: Some(b.build()?),
            ..Default::default()
        })
    }

    pub fn compute_address(
        &self,
        workchain: i8,
        code: Cell,
        public_key: &HashBytes,
        subwallet_id: u32,
    ) -> Result<StdAddr, tycho_types::error::Error> {
        let init = self.state_init(code, public_key, subwallet_id)?;
        let hash = *CellBuilder::build_from(&init)?.repr_hash();
        Ok(StdAddr::new(workchain, hash))
    }
}

/// Sends internal messages through a standard wallet contract.
pub struct WalletSender<P> {
    provider: P,
    address: StdAddr,
    version: WalletVersion,
    subwallet_id: u32,
    keys: SigningKey,
    ttl: Duration,
    code: Option<Cell>,
}

impl<P: ContractProvider> WalletSender<P> {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

    pub fn new(provider: P, address: StdAddr, version: WalletVersion, keys: SigningKey) -> Self {
        let subwallet_id = WalletVersion::default_subwallet_id(address.workchain);
        Self {
            provider,
            address,
            version,
            subwallet_id,
            keys,
            ttl: Self::DEFAULT_TTL,
            code: None,
        }
    }

    pub fn with_subwallet_id(mut self, subwallet_id: u32) -> Self {
        self.subwallet_id = subwallet_id;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Wallet code used to deploy the wallet with its first message.
    pub fn with_code(mut self, code: Cell) -> Self {
        self.code = Some(code);
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn public_key(&self) -> HashBytes {
        HashBytes(self.keys.verifying_key().to_bytes())
    }

    /// Reads the current wallet seqno, zero for a wallet which is not deployed yet.
    pub async fn get_seqno(&self) -> Result<u32, ProviderError> {
        let state = self.provider.get_contract_state(&self.address).await?;
        self.load_seqno(&state).await
    }

    async fn load_seqno(&self, state: &ContractState) -> Result<u32, ProviderError> {
        if state.status != ContractStatus::Active {
            tracing::warn!(address = %self.address, status = %state.status, "wallet is not active");
            return Ok(0);
        }

        let output = self
            .provider
            .run_get_method(&self.address, "seqno", Vec::new())
            .await?;
        if output.exit_code != 0 && output.exit_code != 1 {
            return Err(ProviderError::InvalidResponse(format!(
                "seqno getter failed with exit code {}",
                output.exit_code
            )));
        }

        StackParser::begin_from_bottom(output.stack)
            .pop_u32()
            .map_err(|e| ProviderError::InvalidResponse(format!("invalid seqno: {e}")))
    }

    /// State init attached to the first message of a wallet which is not deployed yet.
    fn deploy_state_init(&self) -> Result<StateInit, ProviderError> {
        let Some(code) = self.code.clone() else {
            return Err(ProviderError::Signer(format!(
                "wallet {} is not deployed and no wallet code was provided",
                self.address
            )));
        };

        let init = self
            .version
            .state_init(code, &self.public_key(), self.subwallet_id)?;
        let hash = *CellBuilder::build_from(&init)?.repr_hash();
        if hash != self.address.address {
            return Err(ProviderError::Signer(format!(
                "wallet code and keys do not match address {}",
                self.address
            )));
        }
        Ok(init)
    }

    fn valid_until(&self) -> u32 {
        let ttl = u32::try_from(self.ttl.as_secs()).unwrap_or(u32::MAX);
        tycho_util::time::now_sec().saturating_add(ttl)
    }

    /// Builds a signed external message with a single internal message inside.
    pub fn build_external_message(
        &self,
        message: &InternalMessage,
        seqno: u32,
        valid_until: u32,
        init: Option<&StateInit>,
    ) -> Result<Cell, tycho_types::error::Error> {
        let mut b = CellBuilder::new();
        b.store_u32(self.subwallet_id)?;
        b.store_u32(valid_until)?;
        b.store_u32(seqno)?;
        if self.version == WalletVersion::V4R2 {
            // Simple send op.
            b.store_u8(0)?;
        }
        b.store_u8(message.send_mode)?;
        b.store_reference(message.build_cell()?)?;
        let signing_message = b.build()?;

        let signature = self.keys.sign(&signing_message.repr_hash().0);

        let mut b = CellBuilder::new();
        b.store_raw(&signature.to_bytes(), 512)?;
        b.store_slice(signing_message.as_slice()?)?;
        let body = b.build()?;

        let mut b = CellBuilder::new();
        // ext_in_msg_info$10 src:addr_none
        b.store_small_uint(0b10, 2)?;
        b.store_zeros(2)?;
        self.address.store_into(&mut b, Cell::empty_context())?;
        // import_fee
        Tokens::ZERO.store_into(&mut b, Cell::empty_context())?;
        match init {
            // init:(just (right ^StateInit))
            Some(init) => {
                b.store_small_uint(0b11, 2)?;
                b.store_reference(CellBuilder::build_from(init)?)?;
            }
            None => b.store_bit_zero()?,
        }
        // body:right
        b.store_bit_one()?;
        b.store_reference(body)?;
        b.build()
    }
}

impl<P: ContractProvider> Sender for WalletSender<P> {
    fn address(&self) -> Option<&StdAddr> {
        Some(&self.address)
    }

    async fn send(&self, message: InternalMessage) -> Result<(), ProviderError> {
        let state = self.provider.get_contract_state(&self.address).await?;
        let seqno = self.load_seqno(&state).await?;
        let init = match state.status {
            ContractStatus::Active => None,
            ContractStatus::Uninit => Some(self.deploy_state_init()?),
            ContractStatus::Frozen => {
                return Err(ProviderError::Signer(format!(
                    "wallet {} is frozen",
                    self.address
                )));
            }
        };

        let external =
            self.build_external_message(&message, seqno, self.valid_until(), init.as_ref())?;

        tracing::info!(
            wallet = %self.address,
            to = %message.to,
            value = %message.value,
            seqno,
            deploy = init.is_some(),
            "sending internal message"
        );
        self.provider.send_message(external).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),
    #[error("invalid secret key: {0}")]
    InvalidSecretKey(String),
}
