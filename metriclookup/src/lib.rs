//! Compile-time lookup table construction for telemetry metrics.
//!
//! Given an ordered set of metric definitions, this crate assigns stable
//! small ids to metric types and metrics, interns category names and
//! fully-qualified metric names (`category.name`) into string tables, packs
//! each metric's `(metric_id, type_id, string_offset)` triple into a 64-bit
//! entry, and builds two perfect-hash lookups over the interned names:
//!
//! - category name -> string table offset
//! - fully-qualified metric name -> packed entry
//!
//! The perfect hash is only collision-free over the keys it was built from.
//! An unknown key may land in an occupied slot, so every hit has to be
//! verified by comparing the queried key against the string table bytes the
//! payload points at. [`LookupBundle::category_by_name`] and
//! [`LookupBundle::metric_by_name`] implement that discipline, and the
//! generated C++ emitted by [`render`] repeats it verbatim.

mod assembler;
mod bitpack;
mod emit;
mod error;
mod metric;
mod phf;
mod registry;
mod stringtable;

pub use crate::assembler::{LookupAssembler, LookupBundle};
pub use crate::bitpack::{pack_entry, unpack_entry, ENTRY_WIDTH, ID_BITS, INDEX_BITS, TYPE_BITS};
pub use crate::emit::{render, EmitterContext};
pub use crate::error::{Error, Result};
pub use crate::metric::{fq_name, CategoryDef, MetricDef};
pub use crate::phf::{Lookup, PerfectHashBuilder};
pub use crate::registry::{MetricIdAssigner, TypeRegistry};
pub use crate::stringtable::{StringTable, StringTableBuilder};
