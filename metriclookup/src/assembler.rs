//! Drives the registries, the bit packer and the perfect-hash builder, and
//! bundles the finished artifacts for the emitter.

use log::debug;

use crate::bitpack::{pack_entry, unpack_entry, ENTRY_WIDTH, INDEX_BITS};
use crate::error::Result;
use crate::metric::{fq_name, CategoryDef};
use crate::phf::{Lookup, PerfectHashBuilder};
use crate::registry::{MetricIdAssigner, TypeRegistry};
use crate::stringtable::{StringTable, StringTableBuilder};

/// One-shot assembly of the category and metric lookups. Owns the string
/// tables and registries for the duration of a run.
pub struct LookupAssembler {
    category_strings: StringTableBuilder,
    metric_strings: StringTableBuilder,
    types: TypeRegistry,
    ids: MetricIdAssigner,
}

impl Default for LookupAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl LookupAssembler {
    pub fn new() -> LookupAssembler {
        LookupAssembler {
            category_strings: StringTableBuilder::new(),
            metric_strings: StringTableBuilder::new(),
            types: TypeRegistry::new(),
            ids: MetricIdAssigner::new(),
        }
    }

    /// Runs the whole pipeline over `categories`, in input order. Any error
    /// is fatal and nothing is emitted.
    pub fn assemble(mut self, categories: &[CategoryDef]) -> Result<LookupBundle> {
        let mut category_pairs = Vec::with_capacity(categories.len());
        let mut category_view = Vec::with_capacity(categories.len());
        let mut metric_pairs = Vec::new();
        let mut metric_entries = Vec::new();

        for category in categories {
            let category_offset = self.category_strings.intern(&category.name)?;
            category_pairs.push((category.name.clone().into_bytes(), category_offset as u64));
            category_view.push((category.name.clone(), category_offset));

            for metric in &category.metrics {
                let metric_id = self.ids.next_id()?;
                let type_id = self.types.id_for(&metric.metric_type)?;

                let fq = fq_name(&category.name, &metric.name);
                let string_offset = self.metric_strings.intern(&fq)?;
                let entry = pack_entry(metric_id, type_id, string_offset)?;

                metric_pairs.push((fq.clone().into_bytes(), entry));
                metric_entries.push((fq, entry));
            }
        }

        debug!(
            "assembling lookups: {} categories, {} metrics, {} types",
            category_view.len(),
            metric_entries.len(),
            self.types.len()
        );

        // Category payloads are bare string offsets; metric payloads are
        // full packed entries.
        let category_lookup = PerfectHashBuilder::build(&category_pairs, INDEX_BITS)?;
        let metric_lookup = PerfectHashBuilder::build(&metric_pairs, ENTRY_WIDTH)?;

        let metric_type_ids = self
            .types
            .types()
            .map(|(name, id)| (name.to_string(), id))
            .collect();

        Ok(LookupBundle {
            category_strings: self.category_strings.emit(),
            metric_strings: self.metric_strings.emit(),
            category_lookup,
            metric_lookup,
            categories: category_view,
            metric_entries,
            metric_type_ids,
        })
    }
}

/// Everything the emitter needs, owned outright.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LookupBundle {
    pub category_strings: StringTable,
    pub metric_strings: StringTable,
    pub category_lookup: Lookup,
    pub metric_lookup: Lookup,
    /// `(category name, category string offset)` in input order.
    pub categories: Vec<(String, u32)>,
    /// `(fully-qualified metric name, packed entry)` in input order.
    pub metric_entries: Vec<(String, u64)>,
    /// `(type name, type id)` in first-seen order.
    pub metric_type_ids: Vec<(String, u32)>,
}

impl LookupBundle {
    /// The string offset of the category name, or `None` if `key` is not a
    /// known category. Hash false positives are rejected by comparing `key`
    /// against the interned bytes at the returned offset.
    pub fn category_by_name(&self, key: &[u8]) -> Option<u32> {
        let payload = self.category_lookup.lookup(key)?;
        let offset = payload as u32;

        self.category_strings
            .matches_at(offset, key)
            .then_some(offset)
    }

    /// The packed entry for the fully-qualified metric name, or `None` if
    /// `key` is not a known metric. Same verification discipline as
    /// [`Self::category_by_name`], using the offset carried in the entry.
    pub fn metric_by_name(&self, key: &[u8]) -> Option<u64> {
        let entry = self.metric_lookup.lookup(key)?;
        let (_, _, offset) = unpack_entry(entry);

        self.metric_strings.matches_at(offset, key).then_some(entry)
    }
}
