//! The packed entry layout.
//!
//! Each metric is represented by a single 64-bit entry holding three fields,
//! least-significant field first:
//!
//! ```ignore
//!     [type_id: TYPE_BITS][metric_id: ID_BITS][string_offset: INDEX_BITS]
//! ```
//!
//! The widths are a policy decision shared with the generated code; the only
//! hard requirement is that they sum to at most 64.

use crate::error::{Error, Result};

/// Width of the string table offset field.
pub const INDEX_BITS: u32 = 32;
/// Width of the metric id field.
pub const ID_BITS: u32 = 27;
/// Width of the type id field.
pub const TYPE_BITS: u32 = 5;
/// Total width of a packed entry.
pub const ENTRY_WIDTH: u32 = 64;

const _: () = assert!(INDEX_BITS + ID_BITS + TYPE_BITS <= ENTRY_WIDTH);

/// All 1s in the low `bits` bits.
const fn field_mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Largest value a `bits`-wide id field can hold, i.e. the allocation limit
/// of the registries feeding that field.
pub(crate) const fn field_limit(bits: u32) -> u32 {
    field_mask(bits) as u32
}

fn check_field(field: &'static str, value: u64, bits: u32) -> Result<u64> {
    if value > field_mask(bits) {
        return Err(Error::OutOfRange { field, value, bits });
    }
    Ok(value)
}

/// Packs a metric's id triple into one entry. Fails if any field exceeds its
/// declared width.
pub fn pack_entry(metric_id: u32, type_id: u32, string_offset: u32) -> Result<u64> {
    let type_id = check_field("type_id", type_id as u64, TYPE_BITS)?;
    let metric_id = check_field("metric_id", metric_id as u64, ID_BITS)?;
    let string_offset = check_field("string_offset", string_offset as u64, INDEX_BITS)?;

    Ok((type_id << (INDEX_BITS + ID_BITS)) | (metric_id << INDEX_BITS) | string_offset)
}

/// Inverse of [`pack_entry`]. Returns `(metric_id, type_id, string_offset)`.
pub fn unpack_entry(entry: u64) -> (u32, u32, u32) {
    let string_offset = (entry & field_mask(INDEX_BITS)) as u32;
    let metric_id = ((entry >> INDEX_BITS) & field_mask(ID_BITS)) as u32;
    let type_id = ((entry >> (INDEX_BITS + ID_BITS)) & field_mask(TYPE_BITS)) as u32;

    (metric_id, type_id, string_offset)
}
