//! Error types for input generation.

use std::result;

use read_fonts::ReadError;

/// Errors that can occur while deriving shaping input for a glyph.
///
/// A glyph that simply cannot be reached is not an error; resolution returns `None` for it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to parse font: {0}")]
    Parse(#[from] ReadError),

    #[error("lookup {lookup_index} substitutes glyph '{glyph}' but no feature or chaining rule activates it")]
    InconsistentRuleTable { lookup_index: u16, glyph: String },

    #[error("glyph '{glyph}' is a component of a substitution sequence but cannot be reached")]
    UnresolvedSequence { glyph: String },

    #[error("no glyph named '{0}' in font")]
    UnknownGlyph(String),
}

pub type Result<T> = result::Result<T, Error>;
