//! # hb-input
//!
//! Derive HarfBuzz input that makes a font render a given glyph.
//!
//! Glyphs with a character mapping are reached directly. Other glyphs (small caps,
//! ligatures, contextual alternates) are reached by walking the GSUB rules backwards: the
//! rule that produces the glyph tells which glyphs trigger it and which feature tag activates
//! it, and the triggering glyphs are resolved in turn until everything is plain text.
//!
//! Single substitutions and ligatures are followed; chaining contextual substitutions
//! supply context for lookups that no feature activates directly. Other lookup types are
//! not followed, so glyphs only they produce are reported as unreachable.
//!
//! ## Example
//!
//! ```no_run
//! use hb_input::{FontModel, InputGenerator};
//!
//! let data = std::fs::read("input.ttf").unwrap();
//! let font = FontModel::from_data(&data).unwrap();
//! for input in InputGenerator::new(&font).all_inputs().unwrap() {
//!     println!("{}", input.hb_shape_args().join(" "));
//! }
//! ```

mod cmap;
mod error;
mod font;
mod gsub;
mod resolver;
pub mod rules;
mod types;

pub use cmap::ReverseCmap;
pub use error::{Error, Result};
pub use font::FontModel;
pub use resolver::InputGenerator;
pub use rules::RuleTable;
pub use types::{BatchReport, GlyphInput, HbInput, InputOptions, PadPolicy};

/// Generate inputs for every reachable glyph of a font, in glyph order.
pub fn all_inputs(data: &[u8]) -> Result<Vec<HbInput>> {
    let font = FontModel::from_data(data)?;
    InputGenerator::new(&font).all_inputs()
}

/// Generate the input for one glyph, looked up by name.
///
/// Zero-width glyphs are padded the same way as in [`all_inputs`].
pub fn input_for_glyph(data: &[u8], name: &str) -> Result<Option<HbInput>> {
    let font = FontModel::from_data(data)?;
    let glyph = font
        .glyph_id(name)
        .ok_or_else(|| Error::UnknownGlyph(name.to_owned()))?;
    InputGenerator::new(&font).input_for_glyph(glyph, font.is_zero_width(glyph))
}
