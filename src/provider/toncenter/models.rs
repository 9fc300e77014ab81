use std::str::FromStr;

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use tycho_types::models::StdAddr;
use tycho_types::num::Tokens;
use tycho_types::prelude::*;
use tycho_util::serde_helpers::{BorrowedStr, string};

use crate::provider::{
    ContractState, ContractStatus, GetMethodOutput, ProviderError, StackItem, TransactionId,
    TransactionInfo,
};
use crate::util::serde_helpers;

// === Envelope ===

#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub error: Option<String>,
    pub code: Option<i32>,
}

impl<T> ApiResponse<T> {
    pub fn into_result(self) -> Result<T, ProviderError> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            (true, None) => Err(ProviderError::InvalidResponse(
                "missing `result` field".to_owned(),
            )),
            (false, _) => Err(ProviderError::Api {
                code: self.code.unwrap_or_default(),
                message: self.error.unwrap_or_default(),
            }),
        }
    }
}

// === Requests ===

#[derive(Debug, Serialize)]
pub struct RunGetMethodRequest<'a> {
    #[serde(with = "serde_helpers::tonlib_address")]
    pub address: &'a StdAddr,
    pub method: &'a str,
    pub stack: Vec<TonlibInputStackItem>,
}

#[derive(Debug, Serialize)]
pub struct SendBocRequest {
    pub boc: String,
}

// === Responses ===

#[derive(Debug, Deserialize)]
pub struct AddressInformationResponse {
    #[serde(with = "string")]
    pub balance: u128,
    #[serde(default, with = "serde_helpers::boc_or_empty")]
    pub code: Option<Cell>,
    #[serde(default, with = "serde_helpers::boc_or_empty")]
    pub data: Option<Cell>,
    pub last_transaction_id: TonlibTransactionId,
    pub state: TonlibAccountStatus,
}

impl From<AddressInformationResponse> for ContractState {
    fn from(value: AddressInformationResponse) -> Self {
        let status = match value.state {
            TonlibAccountStatus::Active => ContractStatus::Active,
            TonlibAccountStatus::Frozen => ContractStatus::Frozen,
            TonlibAccountStatus::Uninitialized => ContractStatus::Uninit,
        };

        // NOTE: Accounts without transactions have a zero lt.
        let last_transaction = (value.last_transaction_id.lt != 0).then_some(TransactionId {
            lt: value.last_transaction_id.lt,
            hash: value.last_transaction_id.hash,
        });

        Self {
            status,
            balance: Tokens::new(value.balance),
            code: value.code,
            data: value.data,
            last_transaction,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TonlibAccountStatus {
    Uninitialized,
    Frozen,
    Active,
}

#[derive(Debug, Deserialize)]
pub struct TonlibTransactionId {
    #[serde(with = "string")]
    pub lt: u64,
    #[serde(with = "serde_helpers::tonlib_hash")]
    pub hash: HashBytes,
}

#[derive(Debug, Deserialize)]
pub struct TonlibTransaction {
    pub utime: u32,
    pub data: String,
    pub transaction_id: TonlibTransactionId,
}

impl TryFrom<TonlibTransaction> for TransactionInfo {
    type Error = ProviderError;

    fn try_from(value: TonlibTransaction) -> Result<Self, Self::Error> {
        let cell = Boc::decode_base64(&value.data)?;
        let info = TransactionInfo::from_cell(&cell)?;
        if info.id.lt != value.transaction_id.lt {
            return Err(ProviderError::InvalidResponse(format!(
                "transaction lt mismatch: {} != {}",
                info.id.lt, value.transaction_id.lt
            )));
        }
        Ok(info)
    }
}

#[derive(Debug, Deserialize)]
pub struct RunGetMethodResponse {
    pub exit_code: i32,
    #[serde(default)]
    pub gas_used: u64,
    #[serde(default)]
    pub stack: Vec<TonlibOutputStackItem>,
}

impl From<RunGetMethodResponse> for GetMethodOutput {
    fn from(value: RunGetMethodResponse) -> Self {
        Self {
            exit_code: value.exit_code,
            gas_used: value.gas_used,
            stack: value.stack.into_iter().map(|item| item.0).collect(),
        }
    }
}

// === Input Stack Item ===

#[derive(Debug)]
pub enum TonlibInputStackItem {
    Num(BigInt),
    Cell(Cell),
    Slice(Cell),
}

impl TryFrom<StackItem> for TonlibInputStackItem {
    type Error = ProviderError;

    fn try_from(value: StackItem) -> Result<Self, Self::Error> {
        match value {
            StackItem::Int(int) => Ok(Self::Num(int)),
            StackItem::Cell(cell) => Ok(Self::Cell(cell)),
            StackItem::Slice(cell) => Ok(Self::Slice(cell)),
            item => Err(ProviderError::InvalidResponse(format!(
                "unsupported get-method argument: {}",
                item.type_name()
            ))),
        }
    }
}

impl Serialize for TonlibInputStackItem {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Num(int) => ("num", int.to_string()).serialize(serializer),
            Self::Cell(cell) => ("tvm.Cell", Boc::encode_base64(cell)).serialize(serializer),
            Self::Slice(cell) => ("tvm.Slice", Boc::encode_base64(cell)).serialize(serializer),
        }
    }
}

// === Output Stack Item ===

#[derive(Debug)]
#[repr(transparent)]
pub struct TonlibOutputStackItem(pub StackItem);

impl<'de> Deserialize<'de> for TonlibOutputStackItem {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        #[derive(Deserialize)]
        struct CellBytes {
            bytes: String,
        }

        let (BorrowedStr(ty), value) = <(BorrowedStr<'de>, serde_json::Value)>::deserialize(
            deserializer,
        )?;

        let item = match ty.as_ref() {
            "num" => {
                let BorrowedStr(value) = BorrowedStr::deserialize(&value).map_err(Error::custom)?;
                if value == "(null)" {
                    StackItem::Null
                } else {
                    StackItem::Int(parse_hex_int(&value).map_err(Error::custom)?)
                }
            }
            "cell" | "slice" => {
                let CellBytes { bytes } = CellBytes::deserialize(&value).map_err(Error::custom)?;
                let cell = Boc::decode_base64(bytes).map_err(Error::custom)?;
                if ty == "cell" {
                    StackItem::Cell(cell)
                } else {
                    StackItem::Slice(cell)
                }
            }
            "list" | "tuple" => {
                let items = Vec::<TonlibOutputStackItem>::deserialize(value).map_err(Error::custom)?;
                if items.is_empty() && ty == "list" {
                    StackItem::Null
                } else {
                    StackItem::Tuple(items.into_iter().map(|item| item.0).collect())
                }
            }
            ty => return Err(Error::custom(format!("unsupported stack item type: {ty}"))),
        };

        Ok(Self(item))
    }
}

fn parse_hex_int(value: &str) -> Result<BigInt, ProviderError> {
    let invalid = || ProviderError::InvalidResponse(format!("invalid stack int: {value}"));

    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };

    let int = match digits.strip_prefix("0x") {
        Some(hex) => BigInt::parse_bytes(hex.as_bytes(), 16).ok_or_else(invalid)?,
        None => BigInt::from_str(digits).map_err(|_e| invalid())?,
    };

    Ok(if negative { -int } else { int })
}
