use tracing::debug;

use crate::domain::{Deck, DEFAULT_DECK};

use super::DeckMap;

/// Cap the number of decks at `max_decks`, preserving document order.
///
/// The first `max_decks - 1` decks are kept as-is; every remaining deck's cards are
/// concatenated, in order, into a new `General` entry placed where the first overflowing deck
/// was. That entry is never merged with a pre-existing deck named `General`. A `max_decks` of
/// zero behaves like one. Card count is conserved.
pub fn limit_decks(decks: DeckMap, max_decks: usize) -> DeckMap {
    let max_decks = max_decks.max(1);
    if decks.len() <= max_decks {
        return decks;
    }

    let before = decks.len();
    let keep = max_decks - 1;
    let mut out = DeckMap::new();
    let mut overflow = Deck::new(DEFAULT_DECK);
    for (i, deck) in decks.into_iter().enumerate() {
        if i < keep {
            out.push_deck(deck);
        } else {
            overflow.cards.extend(deck.cards);
        }
    }
    out.push_deck(overflow);

    debug!(before, after = out.len(), "merged overflow decks");
    out
}
