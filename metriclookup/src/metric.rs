//! The metric input model.
//!
//! Metric definitions are produced by an external parser and arrive as an
//! ordered mapping of categories to metrics. The records are never mutated;
//! everything downstream is derived from input order.

use serde::Deserialize;

/// A single metric definition.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct MetricDef {
    pub name: String,
    #[serde(rename = "type")]
    pub metric_type: String,
}

/// A category and its metrics, both in input order.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CategoryDef {
    pub name: String,
    pub metrics: Vec<MetricDef>,
}

/// The fully-qualified metric name used as the hash key.
pub fn fq_name(category: &str, name: &str) -> String {
    format!("{category}.{name}")
}
