//! Perfect-hash construction over a fixed key set.
//!
//! This is the hash-and-displace scheme: keys are grouped into `n` buckets
//! by a first-level FNV-1a hash, buckets are placed largest-first, and each
//! bucket gets the smallest seed under which a second-level FNV-1a hash
//! sends all of its keys to distinct free slots of an `n`-slot payload
//! table. Construction is deterministic, so identical input yields an
//! identical artifact.
//!
//! The hash function is 32-bit FNV-1a with the seed as the offset basis,
//! run through a xorshift-multiply finalizer before the modulo. FNV-1a is
//! used deliberately: the generated C++ has to evaluate the exact same
//! function at runtime, and FNV-1a is a handful of lines in either language.
//! The finalizer is not optional: FNV's multiplier is odd, so bit 0 of the
//! raw hash is the parity of the key bytes XOR the parity of the seed. A
//! bucket whose keys share byte parity would then land on same-parity slots
//! for every seed, and with an even slot count such buckets can never tile
//! the table.
//!
//! The function is perfect only over the construction keys. An unknown key
//! still hashes to some slot, so [`Lookup::lookup`] may return the payload
//! of a different key. Callers must verify a hit by comparing the queried
//! key against the string table bytes the payload points at; see
//! `StringTable::matches_at`.

use log::debug;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::error::{Error, Result};

/// Standard 32-bit FNV offset basis; seed of the first-level hash.
pub const FNV_OFFSET_BASIS: u32 = 0x811C_9DC5;
/// Standard 32-bit FNV prime.
pub const FNV_PRIME: u32 = 0x0100_0193;
/// Finalizer multipliers (murmur3's fmix32 constants). The generated C++
/// repeats them.
pub const AVALANCHE_MULTIPLIER_1: u32 = 0x85EB_CA6B;
pub const AVALANCHE_MULTIPLIER_2: u32 = 0xC2B2_AE35;

/// Seeds tried per bucket before construction gives up. With the finalizer
/// in place a bucket placement succeeds within a handful of seeds; hitting
/// this limit means the key set is pathological.
const SEED_SEARCH_LIMIT: u32 = 1 << 20;

/// 32-bit FNV-1a with an explicit basis.
fn fnv1a(basis: u32, key: &[u8]) -> u32 {
    key.iter()
        .fold(basis, |hash, &byte| (hash ^ byte as u32).wrapping_mul(FNV_PRIME))
}

/// Xorshift-multiply finalizer, mixing every input bit into bit 0 before
/// the caller reduces the hash modulo the slot count.
fn avalanche(mut hash: u32) -> u32 {
    hash ^= hash >> 16;
    hash = hash.wrapping_mul(AVALANCHE_MULTIPLIER_1);
    hash ^= hash >> 13;
    hash = hash.wrapping_mul(AVALANCHE_MULTIPLIER_2);
    hash ^= hash >> 16;
    hash
}

/// The hash both construction and the generated code use: finalized FNV-1a
/// with the seed as the basis. The per-bucket seeds reuse this function.
pub fn lookup_hash(seed: u32, key: &[u8]) -> u32 {
    avalanche(fnv1a(seed, key))
}

type Bucket = SmallVec<[usize; 4]>;

/// A finished lookup artifact: one seed per bucket, one payload per slot.
/// Both arrays have the same length as the construction key set, which is
/// exactly the serialised form the emitter renders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lookup {
    seeds: Vec<u32>,
    slots: Vec<u64>,
    width_bits: u32,
}

impl Lookup {
    /// Raw slot lookup. Returns the payload stored in the slot `key` hashes
    /// to; for keys outside the construction set this may be the payload of
    /// a different key. `None` only for an empty lookup.
    pub fn lookup(&self, key: &[u8]) -> Option<u64> {
        if self.slots.is_empty() {
            return None;
        }

        let n = self.slots.len() as u32;
        let bucket = lookup_hash(FNV_OFFSET_BASIS, key) % n;
        let slot = lookup_hash(self.seeds[bucket as usize], key) % n;

        Some(self.slots[slot as usize])
    }

    /// Per-bucket seeds, in bucket order.
    pub fn seeds(&self) -> &[u32] {
        &self.seeds
    }

    /// Per-slot payloads, in slot order.
    pub fn slots(&self) -> &[u64] {
        &self.slots
    }

    pub fn width_bits(&self) -> u32 {
        self.width_bits
    }

    /// Number of keys the lookup was built from.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

pub struct PerfectHashBuilder;

impl PerfectHashBuilder {
    /// Builds a lookup from `(key, payload)` pairs. Keys must be distinct
    /// and payloads must fit in `width_bits`.
    pub fn build(pairs: &[(Vec<u8>, u64)], width_bits: u32) -> Result<Lookup> {
        let mut seen = FxHashSet::default();
        for (key, payload) in pairs {
            if !seen.insert(key.as_slice()) {
                return Err(Error::DuplicateKey {
                    key: String::from_utf8_lossy(key).into_owned(),
                });
            }
            if width_bits < 64 && *payload >= 1u64 << width_bits {
                return Err(Error::PayloadTooWide {
                    payload: *payload,
                    width_bits,
                });
            }
        }

        let n = pairs.len();
        if n == 0 {
            return Ok(Lookup {
                seeds: Vec::new(),
                slots: Vec::new(),
                width_bits,
            });
        }

        // One bucket per key. Bucket assignment uses the fixed first-level
        // basis so lookups can recompute it without stored state.
        let mut buckets: Vec<Bucket> = vec![Bucket::new(); n];
        for (i, (key, _)) in pairs.iter().enumerate() {
            let bucket = lookup_hash(FNV_OFFSET_BASIS, key) as usize % n;
            buckets[bucket].push(i);
        }

        // Place the biggest buckets first while the slot table is still
        // mostly free. The sort is stable, so ties keep bucket order and
        // construction stays deterministic.
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by_key(|&b| std::cmp::Reverse(buckets[b].len()));

        let mut seeds = vec![0u32; n];
        let mut slots = vec![0u64; n];
        let mut occupied = vec![false; n];

        for &b in &order {
            let bucket = &buckets[b];
            if bucket.is_empty() {
                break;
            }

            seeds[b] = place_bucket(pairs, bucket, &mut slots, &mut occupied)?;
        }

        debug!(
            "perfect hash over {} keys, max bucket size {}",
            n,
            buckets.iter().map(|b| b.len()).max().unwrap_or(0)
        );

        Ok(Lookup {
            seeds,
            slots,
            width_bits,
        })
    }
}

/// Finds the smallest seed that maps every key of `bucket` to a distinct
/// free slot, claims those slots, and returns the seed. The search is
/// bounded; exhausting it is a fatal error rather than a hang.
fn place_bucket(
    pairs: &[(Vec<u8>, u64)],
    bucket: &Bucket,
    slots: &mut [u64],
    occupied: &mut [bool],
) -> Result<u32> {
    let n = slots.len() as u32;

    'search: for seed in 1..=SEED_SEARCH_LIMIT {
        let mut claimed: SmallVec<[u32; 4]> = SmallVec::new();
        for &i in bucket {
            let slot = lookup_hash(seed, &pairs[i].0) % n;
            if occupied[slot as usize] || claimed.contains(&slot) {
                continue 'search;
            }
            claimed.push(slot);
        }

        for (&i, &slot) in bucket.iter().zip(&claimed) {
            occupied[slot as usize] = true;
            slots[slot as usize] = pairs[i].1;
        }
        return Ok(seed);
    }

    Err(Error::SeedSearchExhausted { keys: bucket.len() })
}
