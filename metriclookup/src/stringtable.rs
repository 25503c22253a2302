//! An append-only string table with interning.
//!
//! Strings are stored back to back as their UTF-8 bytes followed by a NUL
//! terminator, so the emitted table can be indexed as an array of C strings
//! by the generated code. Interning the same string twice returns the offset
//! recorded on first insertion; offsets are 0-based and monotonically
//! non-decreasing across distinct strings.
//!
//! The table comes in two halves, a write-only [`StringTableBuilder`] and a
//! read-only [`StringTable`] frozen out of it. The read side carries the
//! verification primitive ([`StringTable::matches_at`]) that lookup callers
//! use to reject perfect-hash false positives.

use rustc_hash::FxHashMap;

use crate::bitpack::INDEX_BITS;
use crate::error::{Error, Result};

/// Terminator written after every interned string.
const TERMINATOR: u8 = 0;

/// Write-only side of the string table.
#[derive(Debug, Default)]
pub struct StringTableBuilder {
    data: Vec<u8>,
    index: FxHashMap<String, u32>,
}

impl StringTableBuilder {
    pub fn new() -> StringTableBuilder {
        Default::default()
    }

    /// Interns `s` and returns the offset at which it starts in the emitted
    /// table. Fails if the offset would not fit in the entry layout's index
    /// field.
    pub fn intern(&mut self, s: &str) -> Result<u32> {
        if let Some(&offset) = self.index.get(s) {
            return Ok(offset);
        }

        let offset = self.data.len() as u64;
        if offset > max_offset() {
            return Err(Error::IndexOverflow { offset });
        }
        let offset = offset as u32;

        self.index.insert(s.to_string(), offset);
        self.data.extend_from_slice(s.as_bytes());
        self.data.push(TERMINATOR);

        Ok(offset)
    }

    /// Number of bytes the emitted table will have.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Freezes the builder into the read-only table.
    pub fn emit(self) -> StringTable {
        StringTable { data: self.data }
    }
}

/// Read-only side of the string table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StringTable {
    data: Vec<u8>,
}

impl StringTable {
    /// The concatenated byte table.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The string starting at `offset`, without its terminator. `None` if
    /// `offset` is out of bounds or the bytes are not valid UTF-8.
    pub fn get(&self, offset: u32) -> Option<&str> {
        let start = offset as usize;
        let rest = self.data.get(start..)?;
        let len = rest.iter().position(|&b| b == TERMINATOR)?;
        std::str::from_utf8(&rest[..len]).ok()
    }

    /// True iff the bytes starting at `offset` spell exactly `key` followed
    /// by the terminator. This is what rejects hash false positives.
    pub fn matches_at(&self, offset: u32, key: &[u8]) -> bool {
        let start = offset as usize;
        let end = match start.checked_add(key.len()) {
            Some(end) => end,
            None => return false,
        };

        self.data.get(start..end) == Some(key) && self.data.get(end) == Some(&TERMINATOR)
    }
}

fn max_offset() -> u64 {
    if INDEX_BITS >= 64 {
        u64::MAX
    } else {
        (1u64 << INDEX_BITS) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_stable() {
        let mut builder = StringTableBuilder::new();

        let a = builder.intern("perf").unwrap();
        let b = builder.intern("ui").unwrap();
        let a_again = builder.intern("perf").unwrap();

        assert_eq!(a, 0);
        assert_eq!(b, "perf".len() as u32 + 1);
        assert_eq!(a, a_again);
        assert_eq!(builder.len(), "perf".len() + "ui".len() + 2);
    }

    #[test]
    fn emitted_table_contains_strings_at_offsets() {
        let strings = ["perf.page_load", "", "ui.click", "perf.page_load"];

        let mut builder = StringTableBuilder::new();
        let offsets: Vec<u32> = strings
            .iter()
            .map(|s| builder.intern(s).unwrap())
            .collect();
        let table = builder.emit();

        for (s, &offset) in strings.iter().zip(&offsets) {
            assert_eq!(table.get(offset), Some(*s));
            assert!(table.matches_at(offset, s.as_bytes()));
        }
    }

    #[test]
    fn matches_at_rejects_mismatches() {
        let mut builder = StringTableBuilder::new();
        let off = builder.intern("perf.a").unwrap();
        let table = builder.emit();

        assert!(table.matches_at(off, b"perf.a"));
        // Wrong key at the right offset.
        assert!(!table.matches_at(off, b"perf.z"));
        // Prefix of the stored key; the terminator check catches it.
        assert!(!table.matches_at(off, b"perf"));
        // Key that reads past the end of the table.
        assert!(!table.matches_at(off, b"perf.a.very.long"));
        // Offset pointing into the middle of a string.
        assert!(table.matches_at(off + 5, b"a"));
        assert!(!table.matches_at(u32::MAX, b"perf.a"));
    }

    #[test]
    fn empty_table() {
        let table = StringTableBuilder::new().emit();
        assert!(table.as_bytes().is_empty());
        assert_eq!(table.get(0), None);
        assert!(!table.matches_at(0, b"perf"));
    }
}
