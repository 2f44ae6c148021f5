//! The live working position.
//!
//! The solver unpacks one position at a time into these arrays, generates and
//! applies moves against them, and packs the results back out. Pile hashes
//! are maintained incrementally: any pile touched by a move is rehashed and
//! its interned id invalidated until the next canonical sort.

use arrayvec::ArrayVec;

use crate::card::{Card, KING, NUM_SUITS};
use crate::layout::Layout;

use super::arena::MemBudget;
use super::fnv::{FNV1_32_INIT, fnv1a_cards};
use super::intern::{PileId, PileInterner};
use super::movegen::{Move, PileKind};
use super::{GameConfig, MAX_FREECELLS, MAX_WORK_PILES, SolverError};

pub(crate) type WorkPile = ArrayVec<Card, 52>;

/// Id slot value for a pile whose contents changed since the last sort.
pub(crate) const STALE_ID: PileId = PileId::MAX;

pub(crate) struct Tableau {
    pub nwpiles: usize,
    pub ntpiles: usize,
    pub piles: [WorkPile; MAX_WORK_PILES],
    pub hashes: [u32; MAX_WORK_PILES],
    pub ids: [PileId; MAX_WORK_PILES],
    /// Pile indices in canonical order, and the inverse mapping.
    pub perm: [u8; MAX_WORK_PILES],
    pub inv_perm: [u8; MAX_WORK_PILES],
    pub freecells: [Card; MAX_FREECELLS],
    pub foundations: [u8; NUM_SUITS],
}

impl Tableau {
    pub fn new(cfg: &GameConfig) -> Tableau {
        Tableau {
            nwpiles: cfg.nwpiles,
            ntpiles: cfg.ntpiles,
            piles: std::array::from_fn(|_| WorkPile::new()),
            hashes: [FNV1_32_INIT; MAX_WORK_PILES],
            ids: [STALE_ID; MAX_WORK_PILES],
            perm: [0; MAX_WORK_PILES],
            inv_perm: [0; MAX_WORK_PILES],
            freecells: [Card::EMPTY; MAX_FREECELLS],
            foundations: [0; NUM_SUITS],
        }
    }

    /// Load an initial layout and hash every pile.
    pub fn load(&mut self, layout: &Layout) {
        for pile in self.piles.iter_mut() {
            pile.clear();
        }
        for (w, pile) in layout.piles.iter().enumerate() {
            self.piles[w] = pile.clone();
        }
        self.freecells = [Card::EMPTY; MAX_FREECELLS];
        for (t, &card) in layout.freecells.iter().enumerate() {
            self.freecells[t] = card;
        }
        self.foundations = layout.foundations;
        for w in 0..self.nwpiles {
            self.hash_pile(w);
        }
    }

    /// Rehash a pile and invalidate its id; called after every pile change.
    #[inline]
    pub fn hash_pile(&mut self, w: usize) {
        self.hashes[w] = fnv1a_cards(&self.piles[w]);
        self.ids[w] = STALE_ID;
    }

    pub fn make_move(&mut self, m: &Move) {
        let from = m.from as usize;
        let to = m.to as usize;

        let card = match m.from_kind {
            PileKind::FreeCell => std::mem::replace(&mut self.freecells[from], Card::EMPTY),
            _ => {
                let card = self.piles[from].pop().unwrap_or(Card::EMPTY);
                self.hash_pile(from);
                card
            }
        };
        debug_assert_eq!(card, m.card);

        match m.to_kind {
            PileKind::FreeCell => self.freecells[to] = card,
            PileKind::Work => {
                self.piles[to].push(card);
                self.hash_pile(to);
            }
            PileKind::Foundation => self.foundations[to] += 1,
        }
    }

    pub fn undo_move(&mut self, m: &Move) {
        let from = m.from as usize;
        let to = m.to as usize;

        let card = match m.to_kind {
            PileKind::FreeCell => std::mem::replace(&mut self.freecells[to], Card::EMPTY),
            PileKind::Work => {
                let card = self.piles[to].pop().unwrap_or(Card::EMPTY);
                self.hash_pile(to);
                card
            }
            PileKind::Foundation => {
                let card = Card::new(self.foundations[to], to as u8);
                self.foundations[to] -= 1;
                card
            }
        };

        match m.from_kind {
            PileKind::FreeCell => self.freecells[from] = card,
            _ => {
                self.piles[from].push(card);
                self.hash_pile(from);
            }
        }
    }

    /// Canonicalize: give every changed pile an interned id, then order
    /// `perm` by id. The previous order survives almost intact between
    /// consecutive positions (a move only touches one or two piles), so a
    /// stable insertion pass is the right sort here.
    pub fn sort_piles(
        &mut self,
        interner: &mut PileInterner,
        descending: bool,
        budget: &mut MemBudget,
    ) -> Result<(), SolverError> {
        let n = self.nwpiles;

        for w in 0..n {
            if self.ids[w] == STALE_ID {
                let mut bytes = [0u8; 52];
                for (b, card) in bytes.iter_mut().zip(&self.piles[w]) {
                    *b = card.0;
                }
                self.ids[w] =
                    interner.intern(&bytes[..self.piles[w].len()], self.hashes[w], budget)?;
            }
        }

        let before = |a: PileId, b: PileId| if descending { a > b } else { a < b };

        for (i, slot) in self.perm.iter_mut().enumerate().take(n) {
            *slot = i as u8;
        }
        for i in 1..n {
            let p = self.perm[i];
            let mut j = i;
            while j > 0 && before(self.ids[p as usize], self.ids[self.perm[j - 1] as usize]) {
                self.perm[j] = self.perm[j - 1];
                j -= 1;
            }
            self.perm[j] = p;
        }
        for i in 0..n {
            self.inv_perm[self.perm[i] as usize] = i as u8;
        }
        Ok(())
    }

    /// Interned ids in canonical order; only valid right after `sort_piles`.
    pub fn sorted_ids(&self, out: &mut [PileId; MAX_WORK_PILES]) {
        for i in 0..self.nwpiles {
            out[i] = self.ids[self.perm[i] as usize];
        }
    }

    /// The 4-nibble foundation word identifying this position's cluster.
    #[inline]
    pub fn cluster(&self) -> u16 {
        self.foundations[0] as u16
            | (self.foundations[1] as u16) << 4
            | (self.foundations[2] as u16) << 8
            | (self.foundations[3] as u16) << 12
    }

    #[inline]
    pub fn is_won(&self) -> bool {
        self.foundations.iter().all(|&rank| rank == KING)
    }

    /// Total number of cards out; drives the queue-squash priority.
    #[inline]
    pub fn foundation_total(&self) -> i32 {
        self.foundations.iter().map(|&rank| rank as i32).sum()
    }

    #[inline]
    pub fn num_cards_in_freecells(&self) -> u8 {
        self.freecells[..self.ntpiles]
            .iter()
            .filter(|c| !c.is_empty())
            .count() as u8
    }
}
