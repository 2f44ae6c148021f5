//! Text layout ingestion.
//!
//! A layout is a list of work-pile lines of whitespace-separated card tokens,
//! plus two optional prefixed lines (matched case-insensitively):
//!
//! ```text
//! Freecells: 2H 6H * -        (also "Freecell:" or "FC:")
//! Foundations: H-4 S-A        (also "Foundation:" or "Decks:")
//! ```
//!
//! `*` and `-` denote empty free cells. A foundation token names a suit and
//! the rank it has reached, `-` separated; a rank of `0` means nothing is out.

use std::fmt;

use arrayvec::ArrayVec;
use thiserror::Error;

use crate::card::{Card, KING, NUM_SUITS, rank_char, rank_from_char, suit_char, suit_from_char};

/// One work pile, bottom card first.
pub type Pile = ArrayVec<Card, 52>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("unrecognized card token {0:?}")]
    BadCard(String),
    #[error("unrecognized foundation token {0:?}")]
    BadFoundation(String),
    #[error("layout has more than {0} piles")]
    TooManyPiles(usize),
    #[error("layout has more than {0} free cells")]
    TooManyFreecells(usize),
    #[error("card {0} appears more than once")]
    DuplicateCard(Card),
    #[error("a pile holds more than 52 cards")]
    PileTooTall,
    #[error("layout covers {0} of 52 cards")]
    IncompleteDeck(usize),
}

#[derive(Clone, Debug, Default)]
pub struct Layout {
    pub piles: Vec<Pile>,
    pub freecells: Vec<Card>,
    pub foundations: [u8; NUM_SUITS],
}

/// Strip `prefix` (ASCII) from the front of `line`, ignoring case.
fn strip_prefix_ci<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let n = prefix.len();
    if line.len() >= n && line.as_bytes()[..n].eq_ignore_ascii_case(prefix.as_bytes()) {
        Some(&line[n..])
    } else {
        None
    }
}

impl Layout {
    /// Parse a layout from its text form.
    pub fn parse(input: &str) -> Result<Layout, LayoutError> {
        let mut layout = Layout::default();

        for line in input.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(rest) = ["freecells:", "freecell:", "fc:"]
                .iter()
                .find_map(|p| strip_prefix_ci(line, p))
            {
                for token in rest.split_whitespace() {
                    if token == "*" || token == "-" {
                        layout.freecells.push(Card::EMPTY);
                    } else {
                        let card = Card::parse(token)
                            .ok_or_else(|| LayoutError::BadCard(token.to_owned()))?;
                        layout.freecells.push(card);
                    }
                }
            } else if let Some(rest) = ["foundations:", "foundation:", "decks:"]
                .iter()
                .find_map(|p| strip_prefix_ci(line, p))
            {
                for token in rest.split_whitespace() {
                    let (suit, rank) = parse_foundation(token)
                        .ok_or_else(|| LayoutError::BadFoundation(token.to_owned()))?;
                    layout.foundations[suit as usize] = rank;
                }
            } else {
                let mut pile = Pile::new();
                for token in line.split_whitespace() {
                    let card =
                        Card::parse(token).ok_or_else(|| LayoutError::BadCard(token.to_owned()))?;
                    pile.try_push(card).map_err(|_| LayoutError::PileTooTall)?;
                }
                layout.piles.push(pile);
            }
        }

        layout.validate()?;
        Ok(layout)
    }

    /// Check that foundations, free cells and piles cover the 52-card deck
    /// exactly once.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let mut seen = [false; 64];
        let mut count = 0usize;

        let mut take = |card: Card| -> Result<(), LayoutError> {
            if seen[card.0 as usize] {
                return Err(LayoutError::DuplicateCard(card));
            }
            seen[card.0 as usize] = true;
            count += 1;
            Ok(())
        };

        for suit in 0..NUM_SUITS {
            for rank in 1..=self.foundations[suit].min(KING) {
                take(Card::new(rank, suit as u8))?;
            }
        }
        for &card in self.freecells.iter().filter(|c| !c.is_empty()) {
            take(card)?;
        }
        for pile in &self.piles {
            for &card in pile {
                take(card)?;
            }
        }

        if count != 52 {
            return Err(LayoutError::IncompleteDeck(count));
        }
        Ok(())
    }
}

fn parse_foundation(token: &str) -> Option<(u8, u8)> {
    match token.as_bytes() {
        [s, b'-', b'0'] => Some((suit_from_char(*s)?, 0)),
        [s, b'-', r] => Some((suit_from_char(*s)?, rank_from_char(*r)?)),
        _ => None,
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for pile in &self.piles {
            let mut first = true;
            for card in pile {
                if !first {
                    f.write_str(" ")?;
                }
                write!(f, "{card}")?;
                first = false;
            }
            f.write_str("\n")?;
        }
        if self.freecells.iter().any(|c| !c.is_empty()) {
            f.write_str("FC:")?;
            for card in &self.freecells {
                if card.is_empty() {
                    f.write_str(" -")?;
                } else {
                    write!(f, " {card}")?;
                }
            }
            f.write_str("\n")?;
        }
        if self.foundations.iter().any(|&r| r > 0) {
            f.write_str("Foundations:")?;
            for suit in 0..NUM_SUITS {
                let rank = self.foundations[suit];
                if rank > 0 {
                    write!(f, " {}-{}", suit_char(suit as u8), rank_char(rank))?;
                }
            }
            f.write_str("\n")?;
        }
        Ok(())
    }
}
