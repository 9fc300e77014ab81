use std::sync::OnceLock;

use anyhow::Context;
use num_bigint::BigUint;
use sha2::Digest;
use tycho_types::error::Error;
use tycho_types::models::StdAddr;
use tycho_types::num::Tokens;
use tycho_types::prelude::*;
use tycho_util::FastHashMap;

use crate::util::tonlib_helpers::{StackItem, StackParser, build_bytes_rope, load_bytes_rope};

/// Inbound message opcodes.
pub mod op {
    pub const MINT: u32 = 0x4fda1e51;
    pub const PROVIDE_WALLET_ADDRESS: u32 = 0x2c76b973;
    pub const CHANGE_ADMIN: u32 = 0x4840664f;
    pub const CHANGE_CONTENT: u32 = 0x11067aba;
    pub const CHANGE_STATE: u32 = 0x58ca5361;
    pub const WITHDRAW: u32 = 0x46ed2e94;
    pub const BUY: u32 = 0x402eff0b;
}

/// Nanotons the contract always keeps on its balance.
pub const MIN_TONS_FOR_STORAGE: Tokens = Tokens::new(10_000_000);

pub const ONE_TON: u128 = 1_000_000_000;

/// Known rejection codes of the minter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum IcoExitCode {
    UnauthorizedChangeState = 77,
    UnauthorizedWithdraw = 78,
    MinAmount = 79,
    CapExceeded = 80,
    IcoClosed = 81,
    IcoExpired = 82,
    Paused = 83,
}

impl IcoExitCode {
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            77 => Self::UnauthorizedChangeState,
            78 => Self::UnauthorizedWithdraw,
            79 => Self::MinAmount,
            80 => Self::CapExceeded,
            81 => Self::IcoClosed,
            82 => Self::IcoExpired,
            83 => Self::Paused,
            _ => return None,
        })
    }

    pub const fn code(self) -> i32 {
        self as i32
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::UnauthorizedChangeState => "sender is not allowed to change the ICO state",
            Self::UnauthorizedWithdraw => "sender is not allowed to withdraw",
            Self::MinAmount => "amount is below the minimum",
            Self::CapExceeded => "purchase exceeds the supply cap",
            Self::IcoClosed => "ICO has not started yet",
            Self::IcoExpired => "ICO has already ended",
            Self::Paused => "ICO is paused",
        }
    }
}

impl std::fmt::Display for IcoExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code(), self.description())
    }
}

// === Config ===

#[derive(Debug, Clone)]
pub struct JettonMinterIcoConfig {
    pub admin: StdAddr,
    pub content: Cell,
    pub wallet_code: Cell,
    /// Initial paused flag.
    pub state: bool,
    pub price: u64,
    pub cap: u64,
    pub ico_start_date: u32,
    pub ico_end_date: u32,
}

impl JettonMinterIcoConfig {
    pub fn to_storage(&self) -> MinterStorage {
        MinterStorage {
            total_supply: Tokens::ZERO,
            paused: self.state,
            price: self.price,
            cap: self.cap,
            ico_start_date: self.ico_start_date,
            ico_end_date: self.ico_end_date,
            admin: self.admin.clone(),
            content: self.content.clone(),
            wallet_code: self.wallet_code.clone(),
        }
    }

    pub fn to_cell(&self) -> Result<Cell, Error> {
        CellBuilder::build_from(self.to_storage())
    }
}

/// Persistent data of the minter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinterStorage {
    pub total_supply: Tokens,
    pub paused: bool,
    pub price: u64,
    pub cap: u64,
    pub ico_start_date: u32,
    pub ico_end_date: u32,
    pub admin: StdAddr,
    pub content: Cell,
    pub wallet_code: Cell,
}

impl Store for MinterStorage {
    fn store_into(&self, builder: &mut CellBuilder, context: &dyn CellContext) -> Result<(), Error> {
        self.total_supply.store_into(builder, context)?;
        builder.store_bit(self.paused)?;
        builder.store_u64(self.price)?;
        builder.store_u64(self.cap)?;
        builder.store_u32(self.ico_start_date)?;
        builder.store_u32(self.ico_end_date)?;
        self.admin.store_into(builder, context)?;
        builder.store_reference(self.content.clone())?;
        builder.store_reference(self.wallet_code.clone())
    }
}

impl<'a> Load<'a> for MinterStorage {
    fn load_from(cs: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            total_supply: Tokens::load_from(cs)?,
            paused: cs.load_bit()?,
            price: cs.load_u64()?,
            cap: cs.load_u64()?,
            ico_start_date: cs.load_u32()?,
            ico_end_date: cs.load_u32()?,
            admin: StdAddr::load_from(cs)?,
            content: cs.load_reference_cloned()?,
            wallet_code: cs.load_reference_cloned()?,
        })
    }
}

// === Content ===

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ContentType {
    Onchain = 0x00,
    Offchain = 0x01,
}

/// Builds a content cell with a snake-encoded string after the type tag.
pub fn jetton_content_to_cell(ty: ContentType, uri: &str) -> Result<Cell, Error> {
    build_bytes_rope(Some(ty as u8), uri.as_bytes())
}

/// Decoded jetton metadata. Values are kept as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JettonContent {
    /// Key-value pairs in dictionary order.
    Onchain(Vec<(ContentKey, Vec<u8>)>),
    Offchain(Vec<u8>),
}

impl JettonContent {
    /// Raw value of an on-chain attribute.
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        let Self::Onchain(entries) = self else {
            return None;
        };
        let key = ContentKey::from_name(name);
        entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, value)| value.as_slice())
    }

    pub fn uri(&self) -> Option<&[u8]> {
        match self {
            Self::Offchain(uri) => Some(uri),
            Self::Onchain(_) => self.get("uri"),
        }
    }

    // Values are either snake strings (0x00) or chunked dictionaries (0x01),
    // optionally behind a reference.
    fn load_value(mut value: CellSlice<'_>) -> Result<Vec<u8>, Error> {
        if value.is_data_empty() {
            value = value.load_reference_as_slice()?;
        }

        match value.load_u8()? {
            0x00 => load_bytes_rope(value, false),
            0x01 => {
                let chunks = Dict::<u32, Cell>::load_from(&mut value)?;
                chunks.values().try_fold(Vec::new(), |mut data, chunk| -> Result<_, Error> {
                    data.extend(load_bytes_rope(chunk?.as_slice()?, false)?);
                    Ok(data)
                })
            }
            _ => Err(Error::InvalidTag),
        }
    }
}

impl<'a> Load<'a> for JettonContent {
    fn load_from(cs: &mut CellSlice<'a>) -> Result<Self, Error> {
        match cs.load_u8()? {
            tag if tag == ContentType::Onchain as u8 => {
                let dict = Dict::<HashBytes, CellSlice<'_>>::load_from(cs)?;
                let entries = dict
                    .iter()
                    .map(|item| {
                        let (key, value) = item?;
                        Ok((ContentKey(key), Self::load_value(value)?))
                    })
                    .collect::<Result<Vec<_>, Error>>()?;
                Ok(Self::Onchain(entries))
            }
            tag if tag == ContentType::Offchain as u8 => {
                load_bytes_rope(*cs, false).map(Self::Offchain)
            }
            _ => Err(Error::InvalidTag),
        }
    }
}

impl std::fmt::Display for JettonContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Offchain(uri) => write!(f, "uri: {}", String::from_utf8_lossy(uri)),
            Self::Onchain(entries) => {
                let mut lines = entries
                    .iter()
                    .map(|(key, value)| format!("{key}: {}", String::from_utf8_lossy(value)))
                    .collect::<Vec<_>>();
                lines.sort_unstable();
                f.write_str(&lines.join("\n"))
            }
        }
    }
}

/// Metadata dictionary key, `sha256` of the attribute name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentKey(pub HashBytes);

impl ContentKey {
    /// Attributes from the token metadata standard.
    pub const STANDARD: [&str; 9] = [
        "uri",
        "name",
        "description",
        "image",
        "image_data",
        "symbol",
        "decimals",
        "amount_style",
        "render_type",
    ];

    pub fn from_name(name: &str) -> Self {
        Self(HashBytes(sha2::Sha256::digest(name).into()))
    }

    /// Name of a standard attribute.
    pub fn name(&self) -> Option<&'static str> {
        static NAMES: OnceLock<FastHashMap<ContentKey, &'static str>> = OnceLock::new();
        NAMES
            .get_or_init(|| {
                Self::STANDARD
                    .into_iter()
                    .map(|name| (Self::from_name(name), name))
                    .collect()
            })
            .get(self)
            .copied()
    }
}

impl std::fmt::Display for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.0),
        }
    }
}

// === Getter output ===

pub trait FromStack: Sized {
    fn from_stack(stack: Vec<StackItem>) -> anyhow::Result<Self>;

    fn field_count_hint() -> Option<usize>;
}

#[derive(Debug, Clone)]
pub struct JettonData {
    pub total_supply: BigUint,
    pub mintable: bool,
    pub admin_address: Option<StdAddr>,
    pub content: Cell,
    pub wallet_code: Cell,
}

impl JettonData {
    pub fn parse_content(&self) -> anyhow::Result<JettonContent> {
        self.content
            .parse::<JettonContent>()
            .context("invalid jetton content")
    }
}

impl FromStack for JettonData {
    fn from_stack(stack: Vec<StackItem>) -> anyhow::Result<Self> {
        let mut parser = StackParser::begin_from_bottom(stack);
        Ok(Self {
            total_supply: parser.pop_uint()?,
            mintable: parser.pop_bool()?,
            admin_address: parser.pop_address_or_none()?,
            content: parser.pop_cell()?,
            wallet_code: parser.pop_cell()?,
        })
    }

    fn field_count_hint() -> Option<usize> {
        Some(5)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcoData {
    pub paused: bool,
    pub price: BigUint,
    pub cap: BigUint,
    pub start_date: u32,
    pub end_date: u32,
}

impl FromStack for IcoData {
    fn from_stack(stack: Vec<StackItem>) -> anyhow::Result<Self> {
        let mut parser = StackParser::begin_from_bottom(stack);
        Ok(Self {
            paused: parser.pop_bool()?,
            price: parser.pop_uint()?,
            cap: parser.pop_uint()?,
            start_date: parser.pop_u32()?,
            end_date: parser.pop_u32()?,
        })
    }

    fn field_count_hint() -> Option<usize> {
        Some(5)
    }
}

#[derive(Debug)]
pub struct GetWalletAddressOutput {
    pub address: StdAddr,
}

impl FromStack for GetWalletAddressOutput {
    fn from_stack(stack: Vec<StackItem>) -> anyhow::Result<Self> {
        let mut parser = StackParser::begin_from_bottom(stack);
        Ok(Self {
            address: parser.pop_address()?,
        })
    }

    fn field_count_hint() -> Option<usize> {
        Some(1)
    }
}

#[derive(Debug)]
pub struct GetJettonAmountOutput {
    pub amount: BigUint,
}

impl FromStack for GetJettonAmountOutput {
    fn from_stack(stack: Vec<StackItem>) -> anyhow::Result<Self> {
        let mut parser = StackParser::begin_from_bottom(stack);
        Ok(Self {
            amount: parser.pop_uint()?,
        })
    }

    fn field_count_hint() -> Option<usize> {
        Some(1)
    }
}
