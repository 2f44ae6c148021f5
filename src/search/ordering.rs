//! Move prioritization.
//!
//! Legal, pruned moves still differ wildly in usefulness, especially late in
//! the game when moves are plentiful and progress is not. Two passes adjust
//! each move's priority before positions are queued: one rewards freeing the
//! cards the foundations need next, one rewards moves that cannot be undone.

use crate::card::{ACE, Card, KING, NUM_SUITS};
use crate::params::NUM_X;

use super::GameConfig;
use super::movegen::{Move, PileKind, clamp_pri, is_suitable};
use super::tableau::Tableau;

/// How many pile slots the needed-card scan fills at most.
pub const NNEED: usize = 8;

#[inline]
fn bump(pri: &mut i8, delta: i32) {
    *pri = clamp_pri(*pri as i32 + delta);
}

/// Reward moves that dig toward the cards the foundations need next (the
/// needed card or the one just above it), and penalize moves that bury a
/// pile holding one. Weights are `x[0]`, `x[1]` and `x[2]`.
pub fn prioritize(tab: &Tableau, x: &[i32; NUM_X], moves: &mut [Move]) {
    // The four needed cards; full foundations need nothing.
    let mut need = [Card::EMPTY; NUM_SUITS];
    for (suit, slot) in need.iter_mut().enumerate() {
        let rank = tab.foundations[suit];
        if rank == 0 {
            *slot = Card::new(ACE, suit as u8);
        } else if rank != KING {
            *slot = Card::new(rank + 1, suit as u8);
        }
    }

    // Locate up to NNEED piles containing a needed card or its successor.
    let mut pile = [0usize; NNEED];
    let mut npile = 0;
    'scan: for w in 0..tab.nwpiles {
        for &card in &tab.piles[w] {
            let needed = need[card.suit() as usize];
            if !needed.is_empty()
                && (card.rank() == needed.rank() || card.rank() == needed.rank() + 1)
            {
                pile[npile] = w;
                npile += 1;
                if npile == NNEED {
                    break 'scan;
                }
            }
        }
    }
    let pile = &pile[..npile];

    for m in moves.iter_mut() {
        if m.card.is_empty() {
            continue;
        }
        if m.from_kind == PileKind::Work {
            let w = m.from as usize;
            for &p in pile {
                if p == w {
                    bump(&mut m.pri, x[0]);
                }
            }
            // Uncovering a needed card directly is worth extra.
            let len = tab.piles[w].len();
            if len > 1 {
                let below = tab.piles[w][len - 2];
                if need.contains(&below) && !below.is_empty() {
                    bump(&mut m.pri, x[1]);
                }
            }
        }
        if m.to_kind == PileKind::Work {
            for &p in pile {
                if p == m.to as usize {
                    bump(&mut m.pri, -x[2]);
                }
            }
        }
    }
}

/// Add `x[8]` to every move that cannot be taken back: foundation moves,
/// moves whose uncovered card cannot accept the moved card again, and
/// non-king moves that empty a pile in king-only mode. Irreversible moves
/// are first-time progress, so they are preferred.
pub fn mark_irreversible(cfg: &GameConfig, x: &[i32; NUM_X], moves: &mut [Move]) {
    for m in moves.iter_mut() {
        if m.card.is_empty() {
            continue;
        }
        let irreversible = if m.to_kind == PileKind::Foundation {
            true
        } else if m.from_kind == PileKind::Work {
            if !m.uncovered.is_empty() {
                m.card.rank() != m.uncovered.rank().wrapping_sub(1)
                    || !is_suitable(cfg, m.card, m.uncovered)
            } else {
                cfg.king_only && m.card.rank() != KING
            }
        } else {
            false
        };
        if irreversible {
            bump(&mut m.pri, x[8]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{CLUB, DIAMOND, HEART, SPADE};
    use crate::layout::Layout;

    fn x_for_test() -> [i32; NUM_X] {
        let mut x = [0; NUM_X];
        x[0] = 10;
        x[1] = 20;
        x[2] = 3;
        x[8] = 7;
        x
    }

    fn tableau(text: &str) -> Tableau {
        let mut tab = Tableau::new(&GameConfig::freecell());
        tab.load(&Layout::parse(text).unwrap());
        tab
    }

    #[test]
    fn test_prioritize_rewards_needed_piles() {
        // Every foundation is at 8, so the four 9s are needed. Pile 0
        // holds both the 9H and the TH (needed + 1).
        let tab = tableau(concat!(
            "Foundations: H-8 C-8 D-8 S-8\n",
            "9H TH QS\n",
            "9C TC QH\n",
            "KH JH JD\n",
            "KC QD JC 9S\n",
            "KD QC 9D\n",
            "KS JS TD TS\n",
        ));

        let from_needed = Move {
            card: Card::new(12, SPADE),
            from: 0,
            to: 2,
            from_kind: PileKind::Work,
            to_kind: PileKind::Work,
            uncovered: Card::new(10, HEART),
            dest: Card::EMPTY,
            pri: 0,
        };
        let onto_needed = Move {
            card: Card::new(9, SPADE),
            from: 3,
            to: 0,
            from_kind: PileKind::Work,
            to_kind: PileKind::Work,
            uncovered: Card::new(11, CLUB),
            dest: Card::new(12, SPADE),
            pri: 0,
        };
        let unrelated = Move {
            card: Card::new(11, DIAMOND),
            from: 2,
            to: 6,
            from_kind: PileKind::Work,
            to_kind: PileKind::Work,
            uncovered: Card::new(11, HEART),
            dest: Card::EMPTY,
            pri: 0,
        };
        let mut moves = [from_needed, onto_needed, unrelated];
        prioritize(&tab, &x_for_test(), &mut moves);

        // Pile 0 appears twice in the needed list (9H and its successor
        // TH), so x[0] lands twice; the TH under the QS is not itself
        // needed, so no x[1].
        assert_eq!(moves[0].pri, 20, "x[0] twice for pile 0");
        // Moving onto pile 0 buries the needed cards: -x[2] twice, but the
        // source pile 3 holds the needed 9S: +x[0].
        assert_eq!(moves[1].pri, 10 - 6);
        assert_eq!(moves[2].pri, 0);
    }

    #[test]
    fn test_prioritize_uncover_bonus() {
        // Spades need the 9S and it sits directly under the TS.
        let tab = tableau(concat!(
            "Foundations: H-8 C-8 D-8 S-8\n",
            "9S TS\n",
            "9C TC QH\n",
            "KH QS JH\n",
            "KC QD JC 9H\n",
            "KD QC JD 9D\n",
            "KS JS TD TH\n",
        ));
        let mut moves = [Move {
            card: Card::new(10, SPADE),
            from: 0,
            to: 2,
            from_kind: PileKind::Work,
            to_kind: PileKind::Work,
            uncovered: Card::new(9, SPADE),
            dest: Card::EMPTY,
            pri: 0,
        }];
        prioritize(&tab, &x_for_test(), &mut moves);
        // +x[0] for the source pile (9S and TS both match) twice, +x[1]
        // for exposing the 9S itself.
        assert_eq!(moves[0].pri, 10 + 10 + 20);
    }

    #[test]
    fn test_prioritize_skips_pruned_slots() {
        let tab = tableau(concat!(
            "Foundations: H-8 C-8 D-8 S-8\n",
            "9S TS\n",
            "9C TC QH\n",
            "KH QS JH\n",
            "KC QD JC 9H\n",
            "KD QC JD 9D\n",
            "KS JS TD TH\n",
        ));
        let mut moves = [Move {
            card: Card::EMPTY,
            from: 0,
            to: 3,
            from_kind: PileKind::Work,
            to_kind: PileKind::Work,
            uncovered: Card::EMPTY,
            dest: Card::EMPTY,
            pri: 0,
        }];
        prioritize(&tab, &x_for_test(), &mut moves);
        assert_eq!(moves[0].pri, 0);
    }

    #[test]
    fn test_mark_irreversible() {
        let cfg = GameConfig::freecell();
        let x = x_for_test();

        let foundation = Move {
            card: Card::new(9, HEART),
            from: 0,
            to: HEART as u8,
            from_kind: PileKind::Work,
            to_kind: PileKind::Foundation,
            uncovered: Card::EMPTY,
            dest: Card::EMPTY,
            pri: 0,
        };
        // 9H moved off the TS it could stack back onto: reversible.
        let reversible = Move {
            card: Card::new(9, HEART),
            from: 0,
            to: 2,
            from_kind: PileKind::Work,
            to_kind: PileKind::Work,
            uncovered: Card::new(10, SPADE),
            dest: Card::EMPTY,
            pri: 0,
        };
        // 9H moved off a TH: can't go back (same color), irreversible.
        let wrong_suit = Move {
            uncovered: Card::new(10, HEART),
            ..reversible
        };
        // 9H moved off a JS: can't go back (rank gap), irreversible.
        let wrong_rank = Move {
            uncovered: Card::new(11, SPADE),
            ..reversible
        };
        // Free-cell source: never irreversible here.
        let from_cell = Move {
            from_kind: PileKind::FreeCell,
            uncovered: Card::EMPTY,
            ..reversible
        };

        let mut moves = [foundation, reversible, wrong_suit, wrong_rank, from_cell];
        mark_irreversible(&cfg, &x, &mut moves);
        assert_eq!(moves[0].pri, 7);
        assert_eq!(moves[1].pri, 0);
        assert_eq!(moves[2].pri, 7);
        assert_eq!(moves[3].pri, 7);
        assert_eq!(moves[4].pri, 0);
    }

    #[test]
    fn test_mark_irreversible_king_only() {
        let mut cfg = GameConfig::freecell();
        cfg.king_only = true;
        let x = x_for_test();

        // Emptying a pile of its last card: only a king could return.
        let non_king = Move {
            card: Card::new(9, HEART),
            from: 0,
            to: 1,
            from_kind: PileKind::Work,
            to_kind: PileKind::Work,
            uncovered: Card::EMPTY,
            dest: Card::new(10, SPADE),
            pri: 0,
        };
        let king = Move {
            card: Card::new(KING, HEART),
            dest: Card::EMPTY,
            ..non_king
        };
        let mut moves = [non_king, king];
        mark_irreversible(&cfg, &x, &mut moves);
        assert_eq!(moves[0].pri, 7);
        assert_eq!(moves[1].pri, 0);
    }
}
