//! Chained hash map over header names with a dense reverse index.
//!
//! Buckets hold the index of their first entry; entries chain through
//! `next`. The reverse index maps column index to entry index for O(1)
//! name lookups by column, and is rebuilt whenever the map is
//! reconstructed. Duplicate names are legal under the `Collect` policy;
//! lookups then walk the chain and report matches in column order.

use crate::dialect::HeaderDupMode;
use crate::error::{Error, ErrorCode};

use super::{Ctx, Field};

const DEFAULT_BUCKETS: usize = 16;

#[derive(Debug, Clone)]
pub(crate) struct HeaderEntry {
    pub name: Field,
    pub column_index: usize,
    pub next: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct HeaderMap {
    buckets: Vec<Option<usize>>,
    entries: Vec<HeaderEntry>,
    /// Column index to entry index.
    index_to_entry: Vec<Option<usize>>,
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325u64;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

fn bucket_count_for(names: usize) -> usize {
    names.next_power_of_two().max(DEFAULT_BUCKETS)
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from `(name, column)` pairs, applying the duplicate
    /// policy, then wire up the reverse index for `width` columns.
    pub fn build(
        ctx: &Ctx<'_>,
        names: &[(Field, usize)],
        dup_mode: HeaderDupMode,
        width: usize,
    ) -> Result<Self, Error> {
        let mut map = HeaderMap {
            buckets: vec![None; bucket_count_for(names.len())],
            entries: Vec::with_capacity(names.len()),
            index_to_entry: Vec::new(),
        };
        for &(name, col) in names {
            let bytes = ctx.resolve(name);
            match map.find_entry(ctx, bytes) {
                Some(existing) => match dup_mode {
                    HeaderDupMode::Error => {
                        return Err(Error::new(
                            ErrorCode::Invalid,
                            format!(
                                "duplicate header name \"{}\"",
                                String::from_utf8_lossy(bytes)
                            ),
                        )
                        .with_column(col));
                    }
                    HeaderDupMode::FirstWins => {}
                    HeaderDupMode::LastWins => {
                        map.entries[existing].column_index = col;
                    }
                    HeaderDupMode::Collect => map.push_entry(ctx, name, col),
                },
                None => map.push_entry(ctx, name, col),
            }
        }
        map.rebuild_reverse(width);
        Ok(map)
    }

    /// Rebuild a map from already-deduplicated entries. Used by the column
    /// mutations and by compaction, which adjust entries wholesale.
    pub fn from_entries(ctx: &Ctx<'_>, entries: Vec<HeaderEntry>, width: usize) -> Self {
        let mut map = HeaderMap {
            buckets: vec![None; bucket_count_for(entries.len())],
            entries,
            index_to_entry: Vec::new(),
        };
        map.rebuild_links(ctx);
        map.rebuild_reverse(width);
        map
    }

    pub fn entries(&self) -> &[HeaderEntry] {
        &self.entries
    }

    pub fn entry_for_column(&self, col: usize) -> Option<&HeaderEntry> {
        let idx = (*self.index_to_entry.get(col)?)?;
        self.entries.get(idx)
    }

    /// Smallest column index whose entry matches `name`.
    pub fn find_min_index(&self, ctx: &Ctx<'_>, name: &[u8]) -> Option<usize> {
        self.matching_indices(ctx, name).min()
    }

    /// Smallest matching column index strictly greater than `current`.
    pub fn find_next_index(&self, ctx: &Ctx<'_>, name: &[u8], current: usize) -> Option<usize> {
        self.matching_indices(ctx, name)
            .filter(|&col| col > current)
            .min()
    }

    pub fn contains(&self, ctx: &Ctx<'_>, name: &[u8]) -> bool {
        self.find_entry(ctx, name).is_some()
    }

    /// Entry index of the first chain hit for `name`.
    fn find_entry(&self, ctx: &Ctx<'_>, name: &[u8]) -> Option<usize> {
        if self.buckets.is_empty() {
            return None;
        }
        let bucket = (fnv1a(name) as usize) & (self.buckets.len() - 1);
        let mut cursor = self.buckets[bucket];
        while let Some(idx) = cursor {
            let entry = &self.entries[idx];
            if ctx.resolve(entry.name) == name {
                return Some(idx);
            }
            cursor = entry.next;
        }
        None
    }

    fn matching_indices<'m>(
        &'m self,
        ctx: &'m Ctx<'_>,
        name: &'m [u8],
    ) -> impl Iterator<Item = usize> + 'm {
        let bucket = if self.buckets.is_empty() {
            None
        } else {
            Some((fnv1a(name) as usize) & (self.buckets.len() - 1))
        };
        let mut cursor = bucket.and_then(|b| self.buckets[b]);
        std::iter::from_fn(move || {
            while let Some(idx) = cursor {
                let entry = &self.entries[idx];
                cursor = entry.next;
                if ctx.resolve(entry.name) == name {
                    return Some(entry.column_index);
                }
            }
            None
        })
    }

    /// Append an entry at the head of its bucket chain.
    fn push_entry(&mut self, ctx: &Ctx<'_>, name: Field, col: usize) {
        let bucket = (fnv1a(ctx.resolve(name)) as usize) & (self.buckets.len() - 1);
        let idx = self.entries.len();
        self.entries.push(HeaderEntry {
            name,
            column_index: col,
            next: self.buckets[bucket],
        });
        self.buckets[bucket] = Some(idx);
    }

    /// Recompute every bucket head and chain link from the entry list.
    fn rebuild_links(&mut self, ctx: &Ctx<'_>) {
        let count = bucket_count_for(self.entries.len());
        self.buckets.clear();
        self.buckets.resize(count, None);
        for idx in 0..self.entries.len() {
            let bytes = ctx.resolve(self.entries[idx].name);
            let bucket = (fnv1a(bytes) as usize) & (count - 1);
            self.entries[idx].next = self.buckets[bucket];
            self.buckets[bucket] = Some(idx);
        }
    }

    /// Recompute the column-to-entry array for `width` columns.
    pub fn rebuild_reverse(&mut self, width: usize) {
        let span = self
            .entries
            .iter()
            .map(|e| e.column_index + 1)
            .max()
            .unwrap_or(0)
            .max(width);
        self.index_to_entry.clear();
        self.index_to_entry.resize(span, None);
        for (idx, entry) in self.entries.iter().enumerate() {
            self.index_to_entry[entry.column_index] = Some(idx);
        }
    }

    /// Verify the reverse index agrees with the entry list.
    pub fn check_coherence(&self, _ctx: &Ctx<'_>) -> Result<(), Error> {
        for (idx, entry) in self.entries.iter().enumerate() {
            match self.index_to_entry.get(entry.column_index) {
                Some(&Some(mapped)) if mapped == idx => {}
                _ => {
                    return Err(Error::new(
                        ErrorCode::Invalid,
                        "header reverse index out of sync",
                    )
                    .with_column(entry.column_index));
                }
            }
        }
        for (col, slot) in self.index_to_entry.iter().enumerate() {
            if let Some(idx) = slot {
                if self.entries[*idx].column_index != col {
                    return Err(Error::new(
                        ErrorCode::Invalid,
                        "header reverse index points at the wrong column",
                    )
                    .with_column(col));
                }
            }
        }
        Ok(())
    }
}
