//! Natural-language suggestion generator port.

use crate::domain::error::CoachError;

pub trait SuggestionGenerator {
    /// Send `prompt` to the generator and return its raw reply text.
    fn complete(&self, prompt: &str) -> Result<String, CoachError>;
}
