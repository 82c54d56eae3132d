use serde::{Deserialize, Serialize};

use crate::domain::{Card, Deck};

mod limit;

pub use limit::limit_decks;

/// Insertion-ordered mapping from deck name to cards.
///
/// Iteration order is first-insertion order, which mirrors the document's top-to-bottom
/// structure. Lookups by name resolve to the first entry with that name; `push_deck` is the
/// only way to create a second entry with an existing name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeckMap {
    decks: Vec<Deck>,
}

impl DeckMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.decks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decks.is_empty()
    }

    pub fn total_cards(&self) -> usize {
        self.decks.iter().map(|d| d.cards.len()).sum()
    }

    pub fn names(&self) -> Vec<&str> {
        self.decks.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Deck> {
        self.decks.iter()
    }

    pub fn get(&self, name: &str) -> Option<&[Card]> {
        self.decks
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.cards.as_slice())
    }

    fn entry(&mut self, name: &str) -> &mut Deck {
        let pos = match self.decks.iter().position(|d| d.name == name) {
            Some(pos) => pos,
            None => {
                self.decks.push(Deck::new(name));
                self.decks.len() - 1
            }
        };
        &mut self.decks[pos]
    }

    /// Append a card to `deck`, creating the deck at the end of the order if unseen.
    pub fn push_card(&mut self, deck: &str, card: Card) {
        self.entry(deck).cards.push(card);
    }

    pub fn extend_deck(&mut self, deck: &str, cards: impl IntoIterator<Item = Card>) {
        self.entry(deck).cards.extend(cards);
    }

    /// Append `deck` as a new entry without merging into an existing one of the same name.
    pub fn push_deck(&mut self, deck: Deck) {
        self.decks.push(deck);
    }

    /// Fold one chunk's parse result into this accumulated mapping.
    ///
    /// New names are appended in `incoming`'s order; known names get their cards appended.
    /// The resulting order is the order in which names were first seen across all merges.
    pub fn merge(&mut self, incoming: DeckMap) {
        for deck in incoming.decks {
            self.extend_deck(&deck.name, deck.cards);
        }
    }
}

impl IntoIterator for DeckMap {
    type Item = Deck;
    type IntoIter = std::vec::IntoIter<Deck>;

    fn into_iter(self) -> Self::IntoIter {
        self.decks.into_iter()
    }
}

impl<'a> IntoIterator for &'a DeckMap {
    type Item = &'a Deck;
    type IntoIter = std::slice::Iter<'a, Deck>;

    fn into_iter(self) -> Self::IntoIter {
        self.decks.iter()
    }
}

impl FromIterator<Deck> for DeckMap {
    fn from_iter<T: IntoIterator<Item = Deck>>(iter: T) -> Self {
        Self {
            decks: iter.into_iter().collect(),
        }
    }
}
