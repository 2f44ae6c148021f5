//! 32-bit FNV-1a hashing.
//!
//! Pile contents are short byte strings, and FNV-1a is cheap enough to rerun
//! on every pile touched by a move. See
//! <http://www.isthe.com/chongo/tech/comp/fnv/index.html>.

use crate::card::Card;

pub const FNV1_32_INIT: u32 = 0x811c_9dc5;
pub const FNV_32_PRIME: u32 = 0x0100_0193;

#[inline]
pub fn fnv1a_byte(hash: u32, byte: u8) -> u32 {
    (hash ^ byte as u32).wrapping_mul(FNV_32_PRIME)
}

/// Hash a buffer from scratch.
#[inline]
pub fn fnv1a(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV1_32_INIT, |h, &b| fnv1a_byte(h, b))
}

/// Hash a pile of cards from scratch.
#[inline]
pub fn fnv1a_cards(cards: &[Card]) -> u32 {
    cards.iter().fold(FNV1_32_INIT, |h, &c| fnv1a_byte(h, c.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        // Reference values from the FNV project page.
        assert_eq!(fnv1a(b""), 0x811c9dc5);
        assert_eq!(fnv1a(b"a"), 0xe40c292c);
        assert_eq!(fnv1a(b"foobar"), 0xbf9cf968);
    }

    #[test]
    fn test_cards_hash_like_bytes() {
        let cards = [Card(0x12), Card(0x07), Card(0x33)];
        assert_eq!(fnv1a_cards(&cards), fnv1a(&[0x12, 0x07, 0x33]));
    }
}
