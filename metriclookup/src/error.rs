use thiserror::Error;

/// Everything that can go wrong while assembling the lookup tables. All of
/// these are fatal; the pipeline never retries and never emits partial
/// output.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// A packed entry field does not fit in its declared bit width.
    #[error("{field} value {value} does not fit in {bits} bits")]
    OutOfRange {
        field: &'static str,
        value: u64,
        bits: u32,
    },

    /// A string table offset grew past what the entry layout can address.
    #[error("string table offset {offset} does not fit in the index field")]
    IndexOverflow { offset: u64 },

    /// The same key was handed to the perfect-hash builder twice.
    #[error("duplicate lookup key `{key}`")]
    DuplicateKey { key: String },

    /// A lookup payload does not fit in the declared payload width.
    #[error("payload {payload:#x} does not fit in {width_bits} bits")]
    PayloadTooWide { payload: u64, width_bits: u32 },

    /// The perfect-hash displacement search ran out of seeds for one
    /// bucket.
    #[error("no placement seed found for a bucket of {keys} keys")]
    SeedSearchExhausted { keys: usize },

    /// More distinct metric types than the type id field can represent.
    #[error("too many metric types (limit is {limit})")]
    TooManyTypes { limit: u32 },

    /// More metrics than the metric id field can represent.
    #[error("too many metrics (limit is {limit})")]
    TooManyMetrics { limit: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;
