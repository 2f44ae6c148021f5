//! Move generation.
//!
//! Moves are enumerated in a fixed order so the search is reproducible:
//!
//! 1. work pile top -> foundation
//! 2. free cell -> foundation
//! 3. work pile top -> another work pile top
//! 4. work pile top -> an empty work pile
//! 5. free cell -> a work pile top
//! 6. free cell -> an empty work pile
//! 7. work pile top -> an empty free cell
//!
//! A foundation move found in phases 1-2 that passes the automove test is
//! returned alone with the auto flag set; the rest of the enumeration is
//! skipped because that move will be played unconditionally.

use std::fmt;

use arrayvec::ArrayVec;

use crate::card::{ACE, Card, KING};
use crate::params::NUM_X;

use super::GameConfig;
use super::tableau::Tableau;

/// Generous upper bound on the number of moves from one position.
pub const MAX_MOVES: usize = 128;

pub type MoveBuf = ArrayVec<Move, MAX_MOVES>;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum PileKind {
    Foundation,
    FreeCell,
    #[default]
    Work,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Move {
    /// The card being moved.
    pub card: Card,
    pub from: u8,
    pub to: u8,
    pub from_kind: PileKind,
    pub to_kind: PileKind,
    /// The card exposed underneath on the source pile, if any.
    pub uncovered: Card,
    /// The card being covered on the destination pile, if any.
    pub dest: Card,
    pub pri: i8,
}

impl fmt::Display for Move {
    /// Solution-trace form: `QH out`, `3S to temp`, `7D to 8C`,
    /// `7D to empty pile`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_kind {
            PileKind::Foundation => write!(f, "{} out", self.card),
            PileKind::FreeCell => write!(f, "{} to temp", self.card),
            PileKind::Work => {
                if self.dest.is_empty() {
                    write!(f, "{} to empty pile", self.card)
                } else {
                    write!(f, "{} to {}", self.card, self.dest)
                }
            }
        }
    }
}

#[inline]
pub(crate) fn clamp_pri(x: i32) -> i8 {
    x.clamp(i8::MIN as i32, i8::MAX as i32) as i8
}

/// Can `card` go on top of `on` in this variant? Freecell stacks alternating
/// colors, Seahaven the same suit; both are one xor-and-mask test on the
/// suit bits.
#[inline]
pub fn is_suitable(cfg: &GameConfig, card: Card, on: Card) -> bool {
    (card.0 ^ on.0) & cfg.suit_mask() == cfg.suit_val()
}

/// Whether `card` may start an empty work pile.
#[inline]
pub fn king_allowed(cfg: &GameConfig, card: Card) -> bool {
    !cfg.king_only || card.rank() == KING
}

/// An automove is a foundation move that can never hurt future play. Always
/// true in same-suit games and for aces and twos. Otherwise both opposite
/// color foundations must have reached rank - 1, or failing that, both must
/// have reached rank - 2 with the other same-color foundation at rank - 3
/// (Raymond's rule).
pub fn good_automove(tab: &Tableau, cfg: &GameConfig, suit: usize, rank: u8) -> bool {
    if cfg.same_suit || rank <= 2 {
        return true;
    }

    let first_opposite = 1 - (suit & 1);
    for other in (first_opposite..4).step_by(2) {
        if tab.foundations[other] < rank - 1 {
            for other in (first_opposite..4).step_by(2) {
                if tab.foundations[other] < rank - 2 {
                    return false;
                }
            }
            if tab.foundations[(suit + 2) & 3] < rank - 3 {
                return false;
            }
            return true;
        }
    }
    true
}

#[inline]
fn second_from_top(tab: &Tableau, w: usize) -> Card {
    let len = tab.piles[w].len();
    if len > 1 { tab.piles[w][len - 2] } else { Card::EMPTY }
}

/// Enumerate the legal moves from the live position into `out`.
///
/// Returns `(auto, numout)`: `auto` means `out` holds a single automove;
/// `numout` counts the non-auto foundation moves at the head of the buffer.
pub fn get_possible_moves(
    tab: &Tableau,
    cfg: &GameConfig,
    x: &[i32; NUM_X],
    out: &mut MoveBuf,
) -> (bool, usize) {
    out.clear();

    // Phases 1-2: moves to the foundations, work piles first.
    for w in 0..tab.nwpiles {
        let Some(&card) = tab.piles[w].last() else {
            continue;
        };
        let suit = card.suit() as usize;
        let founds = tab.foundations[suit];
        if (founds == 0 && card.rank() == ACE) || (founds != 0 && card.rank() == founds + 1) {
            out.push(Move {
                card,
                from: w as u8,
                to: suit as u8,
                from_kind: PileKind::Work,
                to_kind: PileKind::Foundation,
                uncovered: second_from_top(tab, w),
                dest: Card::EMPTY,
                pri: 0,
            });
            if good_automove(tab, cfg, suit, card.rank()) {
                let auto = out[out.len() - 1];
                out.clear();
                out.push(auto);
                return (true, 0);
            }
        }
    }

    for t in 0..tab.ntpiles {
        let card = tab.freecells[t];
        if card.is_empty() {
            continue;
        }
        let suit = card.suit() as usize;
        let founds = tab.foundations[suit];
        if (founds == 0 && card.rank() == ACE) || (founds != 0 && card.rank() == founds + 1) {
            out.push(Move {
                card,
                from: t as u8,
                to: suit as u8,
                from_kind: PileKind::FreeCell,
                to_kind: PileKind::Foundation,
                uncovered: Card::EMPTY,
                dest: Card::EMPTY,
                pri: 0,
            });
            if good_automove(tab, cfg, suit, card.rank()) {
                let auto = out[out.len() - 1];
                out.clear();
                out.push(auto);
                return (true, 0);
            }
        }
    }

    // No automove; everything so far stays an ordinary "out" candidate.
    let numout = out.len();

    let emptyw = (0..tab.nwpiles).find(|&w| tab.piles[w].is_empty());

    // Phase 3: work pile tops onto other work pile tops.
    for w in 0..tab.nwpiles {
        let Some(&card) = tab.piles[w].last() else {
            continue;
        };
        for dw in 0..tab.nwpiles {
            if dw == w {
                continue;
            }
            let Some(&dest) = tab.piles[dw].last() else {
                continue;
            };
            if card.rank() == dest.rank() - 1 && is_suitable(cfg, card, dest) {
                out.push(Move {
                    card,
                    from: w as u8,
                    to: dw as u8,
                    from_kind: PileKind::Work,
                    to_kind: PileKind::Work,
                    uncovered: second_from_top(tab, w),
                    dest,
                    pri: clamp_pri(x[4]),
                });
            }
        }
    }

    // Phase 4: non-singleton work pile tops onto the first empty work pile.
    if let Some(emptyw) = emptyw {
        for w in 0..tab.nwpiles {
            if w == emptyw || tab.piles[w].len() <= 1 {
                continue;
            }
            let card = tab.piles[w][tab.piles[w].len() - 1];
            if king_allowed(cfg, card) {
                out.push(Move {
                    card,
                    from: w as u8,
                    to: emptyw as u8,
                    from_kind: PileKind::Work,
                    to_kind: PileKind::Work,
                    uncovered: second_from_top(tab, w),
                    dest: Card::EMPTY,
                    pri: clamp_pri(x[3]),
                });
            }
        }
    }

    // Phase 5: free cells onto work pile tops.
    for t in 0..tab.ntpiles {
        let card = tab.freecells[t];
        if card.is_empty() {
            continue;
        }
        for dw in 0..tab.nwpiles {
            let Some(&dest) = tab.piles[dw].last() else {
                continue;
            };
            if card.rank() == dest.rank() - 1 && is_suitable(cfg, card, dest) {
                out.push(Move {
                    card,
                    from: t as u8,
                    to: dw as u8,
                    from_kind: PileKind::FreeCell,
                    to_kind: PileKind::Work,
                    uncovered: Card::EMPTY,
                    dest,
                    pri: clamp_pri(x[5]),
                });
            }
        }
    }

    // Phase 6: free cells onto the first empty work pile.
    if let Some(emptyw) = emptyw {
        for t in 0..tab.ntpiles {
            let card = tab.freecells[t];
            if !card.is_empty() && king_allowed(cfg, card) {
                out.push(Move {
                    card,
                    from: t as u8,
                    to: emptyw as u8,
                    from_kind: PileKind::FreeCell,
                    to_kind: PileKind::Work,
                    uncovered: Card::EMPTY,
                    dest: Card::EMPTY,
                    pri: clamp_pri(x[6]),
                });
            }
        }
    }

    // Phase 7: work pile tops into the first empty free cell.
    if let Some(cell) = (0..tab.ntpiles).find(|&t| tab.freecells[t].is_empty()) {
        for w in 0..tab.nwpiles {
            let Some(&card) = tab.piles[w].last() else {
                continue;
            };
            out.push(Move {
                card,
                from: w as u8,
                to: cell as u8,
                from_kind: PileKind::Work,
                to_kind: PileKind::FreeCell,
                uncovered: second_from_top(tab, w),
                dest: Card::EMPTY,
                pri: clamp_pri(x[7]),
            });
        }
    }

    (false, numout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{CLUB, DIAMOND, HEART, SPADE};
    use crate::layout::Layout;

    fn tableau(cfg: &GameConfig, text: &str) -> Tableau {
        let mut tab = Tableau::new(cfg);
        tab.load(&Layout::parse(text).unwrap());
        tab
    }

    fn x_for_test() -> [i32; NUM_X] {
        [0, 0, 0, 3, 4, 5, 6, 7, 0, 1, 1]
    }

    #[test]
    fn test_is_suitable() {
        let freecell = GameConfig::freecell();
        let seahaven = GameConfig::seahaven();
        let sixh = Card::new(6, HEART);
        let sixc = Card::new(6, CLUB);
        let sevens = Card::new(7, SPADE);
        let sevend = Card::new(7, DIAMOND);

        // Freecell: colors must differ.
        assert!(is_suitable(&freecell, sixh, sevens));
        assert!(is_suitable(&freecell, sixc, sevend));
        assert!(!is_suitable(&freecell, sixh, sevend));
        assert!(!is_suitable(&freecell, sixc, sevens));

        // Seahaven: suits must match.
        assert!(is_suitable(&seahaven, Card::new(6, SPADE), sevens));
        assert!(!is_suitable(&seahaven, sixh, sevens));
        assert!(!is_suitable(&seahaven, sixc, sevens));
    }

    #[test]
    fn test_automove_rule_table() {
        let cfg = GameConfig::freecell();
        let mut tab = tableau(
            &cfg,
            concat!(
                "Foundations: H-3 C-3 D-3 S-3\n",
                "4H 5H 6H 7H 8H 9H TH JH QH KH\n",
                "4C 5C 6C 7C 8C 9C TC JC QC KC\n",
                "4D 5D 6D 7D 8D 9D TD JD QD KD\n",
                "4S 5S 6S 7S 8S 9S TS JS QS KS\n",
            ),
        );
        // Both black foundations at rank - 1: the 4H goes out on its own.
        assert!(good_automove(&tab, &cfg, HEART as usize, 4));

        // One black behind at rank - 1 falls through to Raymond's rule:
        // both blacks at >= rank - 2 and the other red at >= rank - 3
        // still allows it.
        tab.foundations[CLUB as usize] = 2;
        assert!(good_automove(&tab, &cfg, HEART as usize, 4));

        // Other red below rank - 3: refused.
        tab.foundations[DIAMOND as usize] = 0;
        assert!(!good_automove(&tab, &cfg, HEART as usize, 4));

        // A black below rank - 2: refused even with the red one high.
        tab.foundations[DIAMOND as usize] = KING;
        tab.foundations[CLUB as usize] = 1;
        assert!(!good_automove(&tab, &cfg, HEART as usize, 4));

        // Aces and twos always go out.
        assert!(good_automove(&tab, &cfg, SPADE as usize, 2));

        // Same-suit games automove everything.
        let seahaven = GameConfig::seahaven();
        assert!(good_automove(&tab, &seahaven, HEART as usize, 9));
    }

    #[test]
    fn test_automove_short_circuits_enumeration() {
        let cfg = GameConfig::freecell();
        let tab = tableau(
            &cfg,
            concat!(
                "Foundations: H-Q C-K D-K S-K\n",
                "KH\n",
            ),
        );
        let mut out = MoveBuf::new();
        let (auto, _) = get_possible_moves(&tab, &cfg, &x_for_test(), &mut out);
        assert!(auto);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].card, Card::new(KING, HEART));
        assert_eq!(out[0].to_kind, PileKind::Foundation);
    }

    #[test]
    fn test_refused_automove_stays_a_candidate() {
        let cfg = GameConfig::freecell();
        // Diamonds never started, so 4H, 3C and 4S all fail Raymond's rule
        // but must still be offered as ordinary candidates.
        let tab = tableau(
            &cfg,
            concat!(
                "Foundations: H-3 C-2 D-0 S-3\n",
                "KH QH JH TH 9H 8H 7H 6H 5H 4H\n",
                "KC QC JC TC 9C 8C 7C 6C 5C 4C 3C\n",
                "AD 2D 3D 4D 5D 6D 7D 8D 9D TD JD QD KD\n",
                "KS QS JS TS 9S 8S 7S 6S 5S 4S\n",
            ),
        );
        let mut out = MoveBuf::new();
        let (auto, numout) = get_possible_moves(&tab, &cfg, &x_for_test(), &mut out);
        assert!(!auto);
        assert_eq!(numout, 3);
        assert!(
            out[..numout]
                .iter()
                .all(|m| m.to_kind == PileKind::Foundation)
        );
        assert!(out[..numout].iter().any(|m| m.card == Card::new(4, HEART)));
    }

    #[test]
    fn test_work_to_work_and_cell_moves() {
        let cfg = GameConfig::freecell();
        // All foundations at 8 and no 9 exposed: no foundation moves.
        let tab = tableau(
            &cfg,
            concat!(
                "Foundations: H-8 C-8 D-8 S-8\n",
                "9H TS\n",
                "9C TD\n",
                "KH QS JH TH\n",
                "KC QD 9S JC\n",
                "KD QC JD\n",
                "KS QH 9D JS TC\n",
            ),
        );
        let mut out = MoveBuf::new();
        let (auto, numout) = get_possible_moves(&tab, &cfg, &x_for_test(), &mut out);
        assert!(!auto);
        assert_eq!(numout, 0);

        // Piles 6 and 7 are empty; every pile has two or more cards, so
        // each of the six tops may start the first empty pile with x[3].
        let empty_moves: Vec<&Move> = out
            .iter()
            .filter(|m| m.to_kind == PileKind::Work && m.dest.is_empty())
            .collect();
        assert_eq!(empty_moves.len(), 6);
        assert!(empty_moves.iter().all(|m| m.to == 6 && m.pri == 3));

        // TS (black) stacks on JD (red), TH (red) on JC (black).
        assert!(out.iter().any(|m| m.card == Card::new(10, SPADE)
            && m.to_kind == PileKind::Work
            && m.dest == Card::new(11, DIAMOND)
            && m.pri == 4));
        assert!(out.iter().any(|m| m.card == Card::new(10, HEART)
            && m.dest == Card::new(11, CLUB)
            && m.pri == 4));
        // TS must not stack on the black JC.
        assert!(!out.iter().any(|m| m.card == Card::new(10, SPADE)
            && m.dest == Card::new(11, CLUB)));

        // All free cells are empty: every pile top can park in cell 0.
        let cell_moves: Vec<&Move> = out
            .iter()
            .filter(|m| m.to_kind == PileKind::FreeCell)
            .collect();
        assert_eq!(cell_moves.len(), 6);
        assert!(cell_moves.iter().all(|m| m.to == 0 && m.pri == 7));
    }

    #[test]
    fn test_seahaven_automoves_any_candidate() {
        let cfg = GameConfig::seahaven();
        let tab = tableau(
            &cfg,
            concat!(
                "Foundations: H-Q C-Q D-K S-Q\n",
                "KH\n",
                "KC\n",
                "KS\n",
            ),
        );
        let mut out = MoveBuf::new();
        let (auto, _) = get_possible_moves(&tab, &cfg, &x_for_test(), &mut out);
        assert!(auto, "same-suit mode automoves the exposed king");
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_king_only_empty_pile_moves() {
        let mut cfg = GameConfig::freecell();
        cfg.king_only = true;
        let tab = tableau(
            &cfg,
            concat!(
                "Foundations: H-J C-J D-J S-J\n",
                "QH KS\n",
                "QC KD\n",
                "QD KC QS KH\n",
                "\n",
                "\n",
                "\n",
                "\n",
                "\n",
            ),
        );
        let mut out = MoveBuf::new();
        let (auto, _) = get_possible_moves(&tab, &cfg, &x_for_test(), &mut out);
        assert!(!auto);
        let to_empty: Vec<&Move> = out
            .iter()
            .filter(|m| m.to_kind == PileKind::Work && m.dest.is_empty())
            .collect();
        // Only the three exposed kings qualify for the first empty pile.
        assert_eq!(to_empty.len(), 3);
        assert!(to_empty.iter().all(|m| m.card.rank() == KING && m.to == 3));
    }
}
