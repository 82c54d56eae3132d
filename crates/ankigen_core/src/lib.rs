pub mod config;
pub mod decks;
pub mod domain;
pub mod error;
pub mod extract;
pub mod package;
pub mod parse;
pub mod progress;
pub mod segment;
