pub mod character;

pub use character::{Character, CharacterError, Reply};
