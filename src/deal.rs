//! Microsoft-compatible board dealing.
//!
//! The shuffle must be bit-equal to the Windows implementations, so the
//! generator is the bare `seed * 214013 + 2531011` linear congruence. Which
//! bits of the state are drawn depends on the game number:
//!
//! - below 2^31: the high 15 bits
//! - 2^31 to 2^32: the high 15 bits with bit 15 forced on
//! - 2^32 and up: the high 16 bits, plus one (seeded with `game - 2^32`)
//!
//! Cards are dealt row-major across the piles. Freecell uses 8 piles (the
//! first four end up with 7 cards); Seahaven uses 10 piles of 5 and parks the
//! two leftover cards in free cells.

use crate::card::{CLUB, Card, DIAMOND, HEART, SPADE};
use crate::layout::{Layout, Pile};

const NUM_CARDS: usize = 52;

/// Deck codes use the Microsoft suit order (clubs first).
const MSDEAL_SUITS: [u8; 4] = [CLUB, DIAMOND, HEART, SPADE];

/// The Windows `rand()` linear congruential generator.
#[derive(Clone, Debug)]
pub struct MsRng {
    seed: u64,
}

impl MsRng {
    #[inline]
    pub fn new(seed: u32) -> MsRng {
        MsRng { seed: seed as u64 }
    }

    /// High 15 bits of the next state.
    #[inline]
    pub fn next15(&mut self) -> u32 {
        self.seed = self.seed.wrapping_mul(214013).wrapping_add(2531011);
        ((self.seed >> 16) & 0x7fff) as u32
    }

    /// High 16 bits of the next state.
    #[inline]
    pub fn next16(&mut self) -> u32 {
        self.seed = self.seed.wrapping_mul(214013).wrapping_add(2531011);
        ((self.seed >> 16) & 0xffff) as u32
    }
}

/// One draw of the shuffle for the given game number.
#[inline]
fn game_num_rand(rng: &mut MsRng, game_num: u64) -> u32 {
    if game_num < 1 << 32 {
        let ret = rng.next15();
        if game_num < 1 << 31 { ret } else { ret | 0x8000 }
    } else {
        rng.next16() + 1
    }
}

/// Convert a Microsoft deck code (0..52) into a card.
#[inline]
fn card_from_code(code: u8) -> Card {
    Card::new(code / 4 + 1, MSDEAL_SUITS[(code % 4) as usize])
}

/// Deal the layout for an MS game number onto `nwpiles` piles (8 for
/// Freecell, 10 for Seahaven).
pub fn deal_ms(game_num: u64, nwpiles: usize) -> Layout {
    let seed = if game_num < 1 << 32 {
        game_num as u32
    } else {
        (game_num - (1 << 32)) as u32
    };
    let mut rng = MsRng::new(seed);

    let mut deck = [0u8; NUM_CARDS];
    for (i, slot) in deck.iter_mut().enumerate() {
        *slot = i as u8;
    }

    let mut piles = vec![Pile::new(); nwpiles];
    let mut left = NUM_CARDS;
    for i in 0..NUM_CARDS {
        let j = game_num_rand(&mut rng, game_num) as usize % left;
        piles[i % nwpiles].push(card_from_code(deck[j]));
        left -= 1;
        deck[j] = deck[left];
        if nwpiles == 10 && i == 49 {
            break;
        }
    }

    // Leftover cards (Seahaven) go to free cells, drawn from the tail.
    let mut freecells = Vec::new();
    for _ in 0..4 {
        if left > 0 {
            left -= 1;
            freecells.push(card_from_code(deck[left]));
        }
    }

    Layout {
        piles,
        freecells,
        foundations: [0; 4],
    }
}
