use serde::de::Error;
use serde::{Deserialize, Deserializer, Serializer};
use tycho_util::serde_helpers::BorrowedStr;

pub mod tonlib_address {
    use tycho_types::models::{StdAddr, StdAddrFormat};

    use super::*;

    pub fn serialize<S: Serializer>(value: &StdAddr, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<StdAddr, D::Error> {
        let BorrowedStr(s) = BorrowedStr::deserialize(deserializer)?;
        StdAddr::from_str_ext(&s, StdAddrFormat::any())
            .map(|(addr, _)| addr)
            .map_err(Error::custom)
    }
}

pub mod tonlib_hash {
    use base64::prelude::{BASE64_STANDARD, Engine as _};
    use tycho_types::cell::HashBytes;

    use super::*;

    pub fn serialize<S: Serializer>(value: &HashBytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64_STANDARD.encode(value.0))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<HashBytes, D::Error> {
        let BorrowedStr(s) = BorrowedStr::deserialize(deserializer)?;
        let bytes = BASE64_STANDARD.decode(s.as_bytes()).map_err(Error::custom)?;
        match <[u8; 32]>::try_from(bytes.as_slice()) {
            Ok(hash) => Ok(HashBytes(hash)),
            Err(_) => Err(Error::invalid_length(bytes.len(), &"a 32-byte hash")),
        }
    }
}

pub mod boc_or_empty {
    use tycho_types::boc::Boc;
    use tycho_types::cell::Cell;

    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<Cell>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(cell) => serializer.serialize_str(&Boc::encode_base64(cell)),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Cell>, D::Error> {
        let BorrowedStr(s) = BorrowedStr::deserialize(deserializer)?;
        if s.is_empty() {
            return Ok(None);
        }
        Boc::decode_base64(s.as_bytes())
            .map(Some)
            .map_err(Error::custom)
    }
}
