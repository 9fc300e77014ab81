use std::sync::OnceLock;

use tycho_types::dict::RawKeys;
use tycho_types::error::Error;
use tycho_types::prelude::*;
use tycho_util::FastHashSet;

use crate::util::tonlib_helpers::compute_method_id;

macro_rules! define_contract_interface {
    ($ident:ident { $($name:ident),*$(,)? }) => {
        pub struct $ident;

        impl $ident {
            const METHOD_COUNT: usize = const {
                define_contract_interface!(@count { 0 } $($name)*)
            };

            $(pub fn $name() -> u64 {
                static ID: OnceLock<u64> = OnceLock::new();
                *ID.get_or_init(|| compute_method_id(stringify!($name)) as u64)
            })*

            pub fn method_names() -> [&'static str; Self::METHOD_COUNT] {
                [$(stringify!($name)),*]
            }

            pub fn check_support(getter_ids: &FastHashSet<u64>) -> bool {
                static IDS: OnceLock<[u64; $ident::METHOD_COUNT]> = OnceLock::new();
                let ids = IDS.get_or_init(|| [$(Self::$name()),*]);
                ids.iter().all(|id| getter_ids.contains(id))
            }

            /// Returns `true` if the code declares all getters of the interface.
            pub fn detect(code: &DynCell) -> bool {
                parse_contract_getters(code)
                    .is_ok_and(|getter_ids| Self::check_support(&getter_ids))
            }
        }
    };

    (@count { $expr:expr }) => { $expr };
    (@count { $expr:expr } $name:ident $($rest:ident)*) => {
        define_contract_interface!(@count { $expr + 1 } $($rest)*)
    }
}

define_contract_interface!(JettonMinterIcoInterface {
    get_jetton_data,
    get_wallet_address,
    get_ico_data,
    get_jetton_amount,
});

/// Getter ids declared by a code cell which starts with the standard
/// `SETCP0; DICTPUSHCONST` method selector.
pub fn parse_contract_getters(code: &DynCell) -> Result<FastHashSet<u64>, Error> {
    const SETCP0: u64 = 0xff00;
    const DICTPUSHCONST: u64 = 0b11110100101001;
    const METHOD_ID_BITS: u16 = 64;

    let mut cs = code.as_slice()?;
    if cs.load_uint(16)? != SETCP0 || cs.load_uint(14)? != DICTPUSHCONST {
        return Err(Error::InvalidTag);
    }

    let key_bits = cs.load_uint(10)? as u16;
    if key_bits >= 256 {
        return Err(Error::InvalidData);
    }
    // Wide keys keep the method id in their lowest bits.
    let skip_bits = key_bits.saturating_sub(METHOD_ID_BITS);

    let methods = Some(cs.load_reference_cloned()?);
    RawKeys::new(&methods, key_bits)
        .map(|key| {
            let key = key?;
            let mut key = key.as_data_slice();
            key.skip_first(skip_bits, 0)?;
            key.load_uint(key_bits - skip_bits)
        })
        .collect()
}
