//! Rendering of a finished [`LookupBundle`] into generated C++.
//!
//! The emitter is a deliberately thin boundary: [`EmitterContext`] is the
//! dictionary-shaped value handed to the template step, and [`render`] is
//! the single `context -> text` operation. The generated header is
//! self-contained; it embeds the same FNV-1a hash the builder used, the
//! string tables, the seed and slot arrays, and lookup functions that
//! perform the key-verification byte compare before reporting a hit.

use std::fmt::Write;

use crate::assembler::LookupBundle;
use crate::bitpack::{ENTRY_WIDTH, ID_BITS, INDEX_BITS, TYPE_BITS};
use crate::phf::{
    Lookup, AVALANCHE_MULTIPLIER_1, AVALANCHE_MULTIPLIER_2, FNV_OFFSET_BASIS, FNV_PRIME,
};

/// The context handed to the template step, one field per recognised key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmitterContext<'a> {
    /// `(category name, category string offset)` in input order.
    pub categories: &'a [(String, u32)],
    /// Fully-qualified metric name -> packed 64-bit entry, in input order.
    pub metric_id_mapping: &'a [(String, u64)],
    /// Type name -> type id, in first-seen order.
    pub metric_type_ids: &'a [(String, u32)],
    pub entry_width: u32,
    pub index_bits: u32,
    pub id_bits: u32,
    /// Emitted bytes of the category name table.
    pub category_string_table: &'a [u8],
    /// Emitted bytes of the metric name table.
    pub metric_string_table: &'a [u8],
    /// Rendered category-lookup code artifact.
    pub category_by_name_lookup: String,
    /// Rendered metric-lookup code artifact.
    pub metric_by_name_lookup: String,
}

impl<'a> EmitterContext<'a> {
    pub fn from_bundle(bundle: &'a LookupBundle) -> EmitterContext<'a> {
        EmitterContext {
            categories: &bundle.categories,
            metric_id_mapping: &bundle.metric_entries,
            metric_type_ids: &bundle.metric_type_ids,
            entry_width: ENTRY_WIDTH,
            index_bits: INDEX_BITS,
            id_bits: ID_BITS,
            category_string_table: bundle.category_strings.as_bytes(),
            metric_string_table: bundle.metric_strings.as_bytes(),
            category_by_name_lookup: render_lookup_fn(
                "CategoryByNameLookup",
                &bundle.category_lookup,
                "sCategoryStringTable",
                HitKind::Offset,
            ),
            metric_by_name_lookup: render_lookup_fn(
                "MetricByNameLookup",
                &bundle.metric_lookup,
                "sMetricStringTable",
                HitKind::PackedEntry,
            ),
        }
    }
}

/// Renders the whole generated header.
pub fn render(ctx: &EmitterContext<'_>) -> String {
    let mut out = String::new();

    writeln!(out, "// Generated by genlookup. DO NOT EDIT.").unwrap();
    writeln!(out).unwrap();
    writeln!(out, "#include <cstdint>").unwrap();
    writeln!(out, "#include <cstring>").unwrap();
    writeln!(out, "#include <optional>").unwrap();
    writeln!(out, "#include <string_view>").unwrap();
    writeln!(out).unwrap();

    writeln!(out, "// Packed entry layout, least-significant field first:").unwrap();
    writeln!(
        out,
        "//   [type_id: {}][metric_id: {}][string_offset: {}]",
        TYPE_BITS, ctx.id_bits, ctx.index_bits
    )
    .unwrap();
    writeln!(out, "constexpr uint32_t kEntryWidth = {};", ctx.entry_width).unwrap();
    writeln!(out, "constexpr uint32_t kIndexBits = {};", ctx.index_bits).unwrap();
    writeln!(out, "constexpr uint32_t kIdBits = {};", ctx.id_bits).unwrap();
    writeln!(out).unwrap();

    for (name, id) in ctx.metric_type_ids {
        writeln!(out, "constexpr uint32_t kMetricType_{} = {};", sanitize(name), id).unwrap();
    }
    if !ctx.metric_type_ids.is_empty() {
        writeln!(out).unwrap();
    }

    writeln!(out, "// Categories ({}):", ctx.categories.len()).unwrap();
    for (name, offset) in ctx.categories {
        writeln!(out, "//   {name} @ {offset}").unwrap();
    }
    writeln!(out, "// Metrics ({}):", ctx.metric_id_mapping.len()).unwrap();
    for (name, entry) in ctx.metric_id_mapping {
        writeln!(out, "//   {name} = {entry:#018x}").unwrap();
    }
    writeln!(out).unwrap();

    writeln!(
        out,
        "static uint32_t LookupHash(uint32_t aBasis, std::string_view aKey) {{"
    )
    .unwrap();
    writeln!(out, "  uint32_t hash = aBasis;").unwrap();
    writeln!(out, "  for (char c : aKey) {{").unwrap();
    writeln!(out, "    hash = (hash ^ uint8_t(c)) * {FNV_PRIME:#010x};").unwrap();
    writeln!(out, "  }}").unwrap();
    writeln!(out, "  // Finalizer; must match the table construction.").unwrap();
    writeln!(out, "  hash ^= hash >> 16;").unwrap();
    writeln!(out, "  hash *= {AVALANCHE_MULTIPLIER_1:#010x};").unwrap();
    writeln!(out, "  hash ^= hash >> 13;").unwrap();
    writeln!(out, "  hash *= {AVALANCHE_MULTIPLIER_2:#010x};").unwrap();
    writeln!(out, "  hash ^= hash >> 16;").unwrap();
    writeln!(out, "  return hash;").unwrap();
    writeln!(out, "}}").unwrap();
    writeln!(out).unwrap();

    writeln!(
        out,
        "static bool KeyMatchesAt(const char* aTable, size_t aTableLen,"
    )
    .unwrap();
    writeln!(
        out,
        "                         uint32_t aOffset, std::string_view aKey) {{"
    )
    .unwrap();
    writeln!(out, "  if (uint64_t(aOffset) + aKey.size() >= aTableLen) {{").unwrap();
    writeln!(out, "    return false;").unwrap();
    writeln!(out, "  }}").unwrap();
    writeln!(
        out,
        "  return memcmp(aTable + aOffset, aKey.data(), aKey.size()) == 0 &&"
    )
    .unwrap();
    writeln!(out, "         aTable[aOffset + aKey.size()] == '\\0';").unwrap();
    writeln!(out, "}}").unwrap();
    writeln!(out).unwrap();

    render_byte_table(&mut out, "sCategoryStringTable", ctx.category_string_table);
    writeln!(out).unwrap();
    render_byte_table(&mut out, "sMetricStringTable", ctx.metric_string_table);
    writeln!(out).unwrap();

    out.push_str(&ctx.category_by_name_lookup);
    writeln!(out).unwrap();
    out.push_str(&ctx.metric_by_name_lookup);

    out
}

/// What a lookup function returns on a verified hit.
enum HitKind {
    /// The payload is the string offset itself (category lookup).
    Offset,
    /// The payload is a packed entry carrying the offset in its low bits
    /// (metric lookup).
    PackedEntry,
}

fn render_lookup_fn(name: &str, lookup: &Lookup, table: &str, kind: HitKind) -> String {
    let mut out = String::new();

    let (ret, payload_ty) = match kind {
        HitKind::Offset => ("std::optional<uint32_t>", "uint32_t"),
        HitKind::PackedEntry => ("std::optional<uint64_t>", "uint64_t"),
    };

    writeln!(out, "{ret} {name}(std::string_view aKey) {{").unwrap();

    if lookup.is_empty() {
        writeln!(out, "  // No keys were defined for this lookup.").unwrap();
        writeln!(out, "  (void)aKey;").unwrap();
        writeln!(out, "  return std::nullopt;").unwrap();
        writeln!(out, "}}").unwrap();
        return out;
    }

    render_u32_array(&mut out, "kSeeds", lookup.seeds());
    if lookup.width_bits() <= 32 {
        let slots: Vec<u32> = lookup.slots().iter().map(|&s| s as u32).collect();
        render_u32_array(&mut out, "kSlots", &slots);
    } else {
        render_u64_array(&mut out, "kSlots", lookup.slots());
    }

    writeln!(out, "  constexpr uint32_t n = {};", lookup.len()).unwrap();
    writeln!(
        out,
        "  const uint32_t bucket = LookupHash({FNV_OFFSET_BASIS:#010x}, aKey) % n;"
    )
    .unwrap();
    writeln!(
        out,
        "  const uint32_t slot = LookupHash(kSeeds[bucket], aKey) % n;"
    )
    .unwrap();
    writeln!(out, "  const {payload_ty} payload = kSlots[slot];").unwrap();
    match kind {
        HitKind::Offset => {
            writeln!(out, "  const uint32_t offset = payload;").unwrap();
        }
        HitKind::PackedEntry => {
            writeln!(
                out,
                "  const uint32_t offset = uint32_t(payload & ((uint64_t(1) << kIndexBits) - 1));"
            )
            .unwrap();
        }
    }
    writeln!(
        out,
        "  if (!KeyMatchesAt({table}, sizeof({table}), offset, aKey)) {{"
    )
    .unwrap();
    writeln!(out, "    return std::nullopt;").unwrap();
    writeln!(out, "  }}").unwrap();
    writeln!(out, "  return payload;").unwrap();
    writeln!(out, "}}").unwrap();

    out
}

fn render_byte_table(out: &mut String, name: &str, bytes: &[u8]) {
    if bytes.is_empty() {
        // C arrays cannot be zero-length; a lone terminator keeps the
        // verification code well-defined.
        writeln!(out, "static const char {name}[] = {{0}};").unwrap();
        return;
    }

    writeln!(out, "static const char {name}[] = {{").unwrap();
    for chunk in bytes.chunks(12) {
        let line: Vec<String> = chunk.iter().map(|b| format!("0x{b:02x}")).collect();
        writeln!(out, "    {},", line.join(", ")).unwrap();
    }
    writeln!(out, "}};").unwrap();
}

fn render_u32_array(out: &mut String, name: &str, values: &[u32]) {
    writeln!(out, "  static const uint32_t {name}[] = {{").unwrap();
    for chunk in values.chunks(8) {
        let line: Vec<String> = chunk.iter().map(|v| format!("{v:#010x}")).collect();
        writeln!(out, "      {},", line.join(", ")).unwrap();
    }
    writeln!(out, "  }};").unwrap();
}

fn render_u64_array(out: &mut String, name: &str, values: &[u64]) {
    writeln!(out, "  static const uint64_t {name}[] = {{").unwrap();
    for chunk in values.chunks(4) {
        let line: Vec<String> = chunk.iter().map(|v| format!("{v:#018x}ULL")).collect();
        writeln!(out, "      {},", line.join(", ")).unwrap();
    }
    writeln!(out, "  }};").unwrap();
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
