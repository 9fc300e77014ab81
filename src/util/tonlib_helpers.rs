use anyhow::Result;
use num_bigint::{BigInt, BigUint};
use tycho_types::models::StdAddr;
use tycho_types::prelude::*;

pub fn compute_method_id(bytes: impl AsRef<[u8]>) -> i64 {
    tycho_types::crc::crc_16(bytes.as_ref()) as i64 | 0x10000
}

/// A single TVM stack value as exchanged with the node API.
#[derive(Debug, Clone)]
pub enum StackItem {
    Null,
    Int(BigInt),
    Cell(Cell),
    Slice(Cell),
    Tuple(Vec<StackItem>),
}

impl StackItem {
    pub fn int(value: impl Into<BigInt>) -> Self {
        Self::Int(value.into())
    }

    pub fn address(addr: &StdAddr) -> Result<Self, tycho_types::error::Error> {
        CellBuilder::build_from(addr).map(Self::Slice)
    }

    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Int(_) => "int",
            Self::Cell(_) => "cell",
            Self::Slice(_) => "slice",
            Self::Tuple(_) => "tuple",
        }
    }
}

pub struct StackParser {
    items: Vec<StackItem>,
    origin: StackParseOrigin,
}

impl StackParser {
    pub fn begin(mut items: Vec<StackItem>, origin: StackParseOrigin) -> Self {
        if origin == StackParseOrigin::Bottom {
            items.reverse();
        }
        Self { items, origin }
    }

    pub fn begin_from_bottom(items: Vec<StackItem>) -> Self {
        Self::begin(items, StackParseOrigin::Bottom)
    }

    pub fn begin_from_top(items: Vec<StackItem>) -> Self {
        Self::begin(items, StackParseOrigin::Top)
    }

    pub fn set_origin(&mut self, origin: StackParseOrigin) {
        if self.origin != origin {
            self.items.reverse();
            self.origin = origin;
        }
    }

    pub fn remaining(&self) -> usize {
        self.items.len()
    }

    pub fn pop_int(&mut self) -> Result<BigInt> {
        match self.pop_item()? {
            StackItem::Int(int) => Ok(int),
            // NOTE: Some getters return `null` instead of a zero.
            StackItem::Null => Ok(BigInt::ZERO),
            item => anyhow::bail!("expected int, got {}", item.type_name()),
        }
    }

    pub fn pop_uint(&mut self) -> Result<BigUint> {
        let (sign, int) = self.pop_int()?.into_parts();
        anyhow::ensure!(sign != num_bigint::Sign::Minus, "expected non-negative int");
        Ok(int)
    }

    pub fn pop_u32(&mut self) -> Result<u32> {
        let int = self.pop_uint()?;
        u32::try_from(&int).map_err(|_| anyhow::anyhow!("int {int} is out of u32 range"))
    }

    pub fn pop_bool(&mut self) -> Result<bool> {
        let int = self.pop_int()?;
        Ok(int.sign() != num_bigint::Sign::NoSign)
    }

    pub fn pop_cell(&mut self) -> Result<Cell> {
        match self.pop_item()? {
            StackItem::Cell(cell) | StackItem::Slice(cell) => Ok(cell),
            item => anyhow::bail!("expected cell or slice, got {}", item.type_name()),
        }
    }

    pub fn pop_address(&mut self) -> Result<StdAddr> {
        self.pop_cell()?.parse::<StdAddr>().map_err(Into::into)
    }

    pub fn pop_address_or_none(&mut self) -> Result<Option<StdAddr>> {
        let cell = self.pop_cell()?;
        let mut cs = cell.as_slice()?;
        if cs.get_small_uint(0, 2)? == 0b00 {
            Ok(None)
        } else {
            StdAddr::load_from(&mut cs).map(Some).map_err(Into::into)
        }
    }

    pub fn pop_item(&mut self) -> Result<StackItem> {
        match self.items.pop() {
            Some(item) => Ok(item),
            None => anyhow::bail!("not enough items on stack"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackParseOrigin {
    Bottom,
    Top,
}

pub fn load_bytes_rope(
    mut cs: CellSlice<'_>,
    strict: bool,
) -> Result<Vec<u8>, tycho_types::error::Error> {
    let mut result = Vec::new();
    let mut buffer = [0u8; 128];
    loop {
        let bytes = cs.load_raw(&mut buffer, cs.size_bits())?;
        result.extend_from_slice(bytes);

        match cs.size_refs() {
            0 => break,
            2.. if strict => return Err(tycho_types::error::Error::InvalidData),
            _ => cs = cs.load_reference_as_slice()?,
        }
    }
    Ok(result)
}

/// Max number of whole bytes in a single cell.
const ROPE_CHUNK_LEN: usize = 127;

/// Builds a snake-encoded byte string with an optional one-byte prefix.
///
/// The root cell holds the prefix and as many bytes as fit after it,
/// every continuation cell is a single reference of its parent.
pub fn build_bytes_rope(
    prefix: Option<u8>,
    data: &[u8],
) -> Result<Cell, tycho_types::error::Error> {
    let head_len = ROPE_CHUNK_LEN - prefix.is_some() as usize;
    let (head, tail) = data.split_at(data.len().min(head_len));

    let mut next = None::<Cell>;
    for chunk in tail.chunks(ROPE_CHUNK_LEN).rev() {
        let mut b = CellBuilder::new();
        b.store_raw(chunk, (chunk.len() * 8) as u16)?;
        if let Some(child) = next.take() {
            b.store_reference(child)?;
        }
        next = Some(b.build()?);
    }

    let mut b = CellBuilder::new();
    if let Some(prefix) = prefix {
        b.store_u8(prefix)?;
    }
    b.store_raw(head, (head.len() * 8) as u16)?;
    if let Some(child) = next {
        b.store_reference(child)?;
    }
    b.build()
}
