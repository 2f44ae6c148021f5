//! Pile interning.
//!
//! Although the space of possible piles is huge, only a few hundred distinct
//! piles usually show up in one game, so every distinct pile byte sequence is
//! assigned a stable 12-bit id. Canonical position keys are then short id
//! sequences instead of full card lists. Ids double as indices into the entry
//! table, which is the reverse lookup the unpacker needs.

use log::warn;

use super::SolverError;
use super::arena::MemBudget;

/// Bucket count for the id hash table (the largest 12-bit prime).
pub const NUM_BUCKETS: usize = 4093;
/// Ids are 12-bit codes, so at most 4096 distinct piles fit.
pub const MAX_PILE_IDS: usize = 4096;

pub type PileId = u16;

const NIL: u32 = u32::MAX;

struct Entry {
    bytes: Box<[u8]>,
    hash: u32,
    next: u32,
}

pub struct PileInterner {
    heads: Vec<u32>,
    entries: Vec<Entry>,
}

impl PileInterner {
    pub fn new() -> PileInterner {
        PileInterner {
            heads: vec![NIL; NUM_BUCKETS],
            entries: Vec::new(),
        }
    }

    /// Look up the id for a pile's byte sequence, assigning the next free id
    /// on first sight. `hash` must be the FNV-1a hash of `bytes`; equality is
    /// hash first, then an exact byte compare.
    pub fn intern(
        &mut self,
        bytes: &[u8],
        hash: u32,
        budget: &mut MemBudget,
    ) -> Result<PileId, SolverError> {
        let bucket = hash as usize % NUM_BUCKETS;

        let mut e = self.heads[bucket];
        while e != NIL {
            let entry = &self.entries[e as usize];
            if entry.hash == hash && *entry.bytes == *bytes {
                return Ok(e as PileId);
            }
            e = entry.next;
        }

        if self.entries.len() == MAX_PILE_IDS {
            warn!("ran out of pile ids");
            return Err(SolverError::PileOverflow);
        }
        budget.charge(bytes.len() + size_of::<Entry>())?;

        let id = self.entries.len() as u32;
        self.entries.push(Entry {
            bytes: bytes.into(),
            hash,
            next: self.heads[bucket],
        });
        self.heads[bucket] = id;
        Ok(id as PileId)
    }

    /// The pile bytes an id was assigned for.
    #[inline]
    pub fn pile_bytes(&self, id: PileId) -> &[u8] {
        &self.entries[id as usize].bytes
    }

    #[inline]
    pub fn pile_hash(&self, id: PileId) -> u32 {
        self.entries[id as usize].hash
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::fnv::fnv1a;

    fn budget() -> MemBudget {
        MemBudget::new(1 << 20)
    }

    #[test]
    fn test_equal_bytes_equal_ids() {
        let mut budget = budget();
        let mut interner = PileInterner::new();
        let a = interner.intern(b"abc", fnv1a(b"abc"), &mut budget).unwrap();
        let b = interner.intern(b"abd", fnv1a(b"abd"), &mut budget).unwrap();
        let a2 = interner.intern(b"abc", fnv1a(b"abc"), &mut budget).unwrap();
        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn test_reverse_lookup() {
        let mut budget = budget();
        let mut interner = PileInterner::new();
        let piles: [&[u8]; 4] = [b"", b"a", b"ab", b"xyz"];
        for &p in &piles {
            let id = interner.intern(p, fnv1a(p), &mut budget).unwrap();
            assert_eq!(interner.pile_bytes(id), p);
            assert_eq!(interner.pile_hash(id), fnv1a(p));
        }
    }

    #[test]
    fn test_hash_collisions_still_distinguish() {
        let mut budget = budget();
        let mut interner = PileInterner::new();
        // Force both piles into the same bucket with the same hash.
        let a = interner.intern(b"1234", 77, &mut budget).unwrap();
        let b = interner.intern(b"5678", 77, &mut budget).unwrap();
        assert_ne!(a, b);
        assert_eq!(interner.pile_bytes(a), b"1234");
        assert_eq!(interner.pile_bytes(b), b"5678");
    }

    #[test]
    fn test_id_space_overflow() {
        let mut budget = MemBudget::new(1 << 22);
        let mut interner = PileInterner::new();
        for i in 0..MAX_PILE_IDS as u32 {
            let bytes = (i as u16).to_le_bytes();
            let id = interner.intern(&bytes, fnv1a(&bytes), &mut budget).unwrap();
            assert_eq!(id as u32, i);
        }
        let overflow = interner.intern(b"straw", fnv1a(b"straw"), &mut budget);
        assert_eq!(overflow.unwrap_err(), SolverError::PileOverflow);
    }

    #[test]
    fn test_randomized_workload_matches_byte_equality() {
        use std::collections::HashMap;

        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut budget = MemBudget::new(4 << 20);
        let mut interner = PileInterner::new();
        let mut by_bytes: HashMap<Vec<u8>, PileId> = HashMap::new();

        // Random short card-byte strings, with plenty of repeats: the id
        // must agree with byte equality on every draw.
        for _ in 0..4000 {
            let len = rng.random_range(0..8usize);
            let bytes: Vec<u8> = (0..len).map(|_| rng.random_range(1u8..=52)).collect();
            let id = interner.intern(&bytes, fnv1a(&bytes), &mut budget).unwrap();
            match by_bytes.get(&bytes) {
                Some(&seen) => assert_eq!(id, seen, "bytes {bytes:?}"),
                None => {
                    by_bytes.insert(bytes.clone(), id);
                }
            }
            assert_eq!(interner.pile_bytes(id), &bytes[..]);
            assert_eq!(interner.pile_hash(id), fnv1a(&bytes));
        }
        assert_eq!(interner.len(), by_bytes.len());
    }

    #[test]
    fn test_budget_charged_only_on_miss() {
        let mut budget = budget();
        let mut interner = PileInterner::new();
        interner.intern(b"abc", fnv1a(b"abc"), &mut budget).unwrap();
        let after_first = budget.remaining();
        interner.intern(b"abc", fnv1a(b"abc"), &mut budget).unwrap();
        assert_eq!(budget.remaining(), after_first);
    }
}
