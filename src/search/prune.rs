//! Structural and redundancy pruning.
//!
//! Both prunes run over the freshly generated move set (never over an
//! automove). The Seahaven prune is a static unsolvability proof; the
//! redundancy prune walks the last few moves up the parent chain and drops
//! moves whose effect is provably reachable by a shorter chain.

use crate::card::Card;

use super::GameConfig;
use super::movegen::{Move, PileKind};
use super::tableau::Tableau;
use super::{PosId, Position};

/// How far up the parent chain the redundancy prune looks. Looking further
/// than 4 has not been observed to pay for itself.
pub const MAX_PREV_MOVE: usize = 4;

/// Seahaven king-only prune. If the destination pile would hold a same-suit
/// descending run of more than `ntpiles` cards on top of this move's card,
/// and a smaller card of that suit is buried in the pile, the pile can never
/// be dismantled: the run doesn't fit in the free cells and no other pile
/// may take it. Applies only in (same-suit AND king-only) mode.
pub fn prune_seahaven(tab: &Tableau, cfg: &GameConfig, m: &Move) -> bool {
    if !cfg.same_suit || !cfg.king_only || m.to_kind != PileKind::Work {
        return false;
    }
    let pile = &tab.piles[m.to as usize];
    let suit = m.card.suit();
    let next_rank = m.card.rank() + 1;

    // Length of the same-suit run that would sit on top of the moved card.
    let mut run = 0u8;
    for &card in pile.iter().rev() {
        if card.suit() == suit && card.rank() == next_rank + run {
            run += 1;
        }
    }
    if (run as usize) < cfg.ntpiles + 1 {
        return false;
    }

    pile.iter()
        .any(|&card| card.suit() == suit && card.rank() < m.card.rank())
}

#[inline]
fn card_moved(card: Card, moves: &[Move]) -> bool {
    moves.iter().any(|m| m.card == card)
}

#[inline]
fn card_is_dest(card: Card, moves: &[Move]) -> bool {
    moves.iter().any(|m| m.dest == card)
}

/// Redundant-move prune. `pos0` is the position the candidate `m` would be
/// played from. Returns true when `m` provably re-derives a position already
/// reachable by a shorter move chain.
pub fn prune_redundant(
    positions: &[Position],
    pos0: PosId,
    ntpiles: usize,
    m: &Move,
) -> bool {
    let start = &positions[pos0 as usize];
    if start.depth == 0 {
        return false;
    }

    // The simplest case: don't move the same card twice in a row.
    if start.mv.card == m.card {
        return true;
    }

    // Collect the last few moves, looking for the previous move of this
    // card. prev[0] is the most recent move.
    let mut prev = [start.mv; MAX_PREV_MOVE];
    let mut at = match start.parent {
        Some(p) if positions[p as usize].depth > 0 => p,
        _ => return false,
    };
    let mut found = None;
    for i in 1..MAX_PREV_MOVE {
        let mv = positions[at as usize].mv;
        prev[i] = mv;
        if mv.card == m.card {
            found = Some(i);
            break;
        }
        at = match positions[at as usize].parent {
            Some(p) if positions[p as usize].depth > 0 => p,
            _ => return false,
        };
    }
    // This card hasn't moved recently; assume the move isn't redundant.
    let Some(j) = found else {
        return false;
    };

    // Did the free cells ever fill up strictly after the earlier move?
    // Walk the same chain again to find out, ending on the position the
    // earlier move produced.
    let mut zero_cells = false;
    let mut after_prev = pos0;
    for _ in 0..j {
        zero_cells |= positions[after_prev as usize].ntemp as usize == ntpiles;
        after_prev = match positions[after_prev as usize].parent {
            Some(p) => p,
            None => return false,
        };
    }

    let earlier = prev[j];
    let between = &prev[..j];
    use PileKind::{FreeCell, Work};
    match (earlier.from_kind, earlier.to_kind, m.from_kind, m.to_kind) {
        // Cell -> work, ..., work -> cell: a round trip through the piles.
        // Redundant unless the cells filled up in between (the trip may have
        // freed the cell something else needed) or the card was stacked on.
        (FreeCell, Work, Work, FreeCell) => !zero_cells && !card_is_dest(m.card, between),

        // Work -> cell, ..., cell -> work, and work -> work, ..., work ->
        // work: an inverse only if the card lands back on what it uncovered,
        // and only if nothing in between moved or covered that card.
        (Work, FreeCell, FreeCell, Work) | (Work, Work, Work, Work) => {
            earlier.uncovered == m.dest
                && !card_moved(m.dest, between)
                && !card_is_dest(m.dest, between)
        }

        // Work -> work, ..., work -> cell: not an inverse, a shortcut. If a
        // free cell was open the whole time the card could have gone there
        // directly.
        (Work, Work, Work, FreeCell) => {
            positions[after_prev as usize].ntemp as usize != ntpiles && !zero_cells
        }

        // Cell -> work, ..., work -> work: the detour through the first
        // destination was pointless unless something touched it since.
        (FreeCell, Work, Work, Work) => {
            !card_moved(m.dest, between) && !card_is_dest(m.dest, between)
        }

        _ => false,
    }
}
