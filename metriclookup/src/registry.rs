//! Id allocation for metric types and metrics.
//!
//! Both registries hand out small integers starting at 1 and are bounded by
//! the bit widths of the packed entry layout. Ids are stable for the
//! lifetime of one run; the registries are owned by the assembler and
//! discarded afterwards.

use rustc_hash::FxHashMap;

use crate::bitpack::{field_limit, ID_BITS, TYPE_BITS};
use crate::error::{Error, Result};
use crate::metric::MetricDef;

/// Assigns ids to metric type names in first-seen order.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    ids: FxHashMap<String, u32>,
    order: Vec<String>,
}

impl TypeRegistry {
    pub fn new() -> TypeRegistry {
        Default::default()
    }

    /// The id for `type_name`, allocating one if this is the first time the
    /// name is seen.
    pub fn id_for(&mut self, type_name: &str) -> Result<u32> {
        if let Some(&id) = self.ids.get(type_name) {
            return Ok(id);
        }

        let limit = field_limit(TYPE_BITS);
        if self.order.len() as u32 >= limit {
            return Err(Error::TooManyTypes { limit });
        }

        let id = self.order.len() as u32 + 1;
        self.ids.insert(type_name.to_string(), id);
        self.order.push(type_name.to_string());

        Ok(id)
    }

    /// `(type name, id)` pairs in first-seen order.
    pub fn types(&self) -> impl Iterator<Item = (&str, u32)> {
        self.order
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i as u32 + 1))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Hands out consecutive metric ids in traversal order.
#[derive(Debug, Default)]
pub struct MetricIdAssigner {
    next: u32,
}

impl MetricIdAssigner {
    pub fn new() -> MetricIdAssigner {
        Default::default()
    }

    /// The next metric id. Ids are consecutive starting at 1.
    pub fn next_id(&mut self) -> Result<u32> {
        let limit = field_limit(ID_BITS);
        if self.next >= limit {
            return Err(Error::TooManyMetrics { limit });
        }

        self.next += 1;
        Ok(self.next)
    }

    /// Ids for a whole sequence of metrics, parallel to the input order.
    pub fn assign(&mut self, metrics: &[MetricDef]) -> Result<Vec<u32>> {
        metrics.iter().map(|_| self.next_id()).collect()
    }
}
