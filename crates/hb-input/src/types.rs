//! Core types for input generation options and results.

use std::fmt::{self, Formatter, Result};

use read_fonts::types::{GlyphId16, Tag};

/// Input for a shaping engine: features to activate and the text to shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct HbInput {
    /// Feature tags in the order they were discovered, outermost glyph first.
    pub features: Vec<Tag>,
    pub text: String,
}

impl HbInput {
    pub fn new(features: Vec<Tag>, text: impl Into<String>) -> Self {
        Self {
            features,
            text: text.into(),
        }
    }

    /// Comma-separated feature list, as accepted by `hb-shape --features`.
    pub fn features_csv(&self) -> String {
        self.features
            .iter()
            .map(Tag::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Arguments for `hb-shape` (without the font path).
    pub fn hb_shape_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(2);
        if !self.features.is_empty() {
            args.push(format!("--features={}", self.features_csv()));
        }
        args.push(format!("--text={}", self.text));
        args
    }
}

impl fmt::Display for HbInput {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let features = if self.features.is_empty() {
            "-".to_string()
        } else {
            self.features_csv()
        };
        write!(f, "{features}\t{:?}", self.text)
    }
}

/// A resolved input together with the glyph it reaches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphInput {
    pub glyph: GlyphId16,
    pub name: String,
    pub input: HbInput,
}

impl fmt::Display for GlyphInput {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}\t{}", self.name, self.input)
    }
}

/// When to prefix text with spaces so that a zero-width glyph has something to attach to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PadPolicy {
    #[default]
    ZeroWidth,
    Never,
}

impl PadPolicy {
    pub fn applies(self, zero_width: bool) -> bool {
        matches!(self, Self::ZeroWidth) && zero_width
    }
}

/// Options controlling batch input generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputOptions {
    pub pad: PadPolicy,
    /// Log unreachable glyphs at warn level instead of debug
    pub warnings: bool,
}

impl InputOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pad(mut self, pad: PadPolicy) -> Self {
        self.pad = pad;
        self
    }

    pub fn with_no_pad_if(mut self, on: bool) -> Self {
        if on {
            self.pad = PadPolicy::Never;
        }
        self
    }

    pub fn with_warnings(mut self) -> Self {
        self.warnings = true;
        self
    }

    pub fn with_warnings_if(mut self, on: bool) -> Self {
        self.warnings |= on;
        self
    }
}

/// Result of generating inputs for every glyph of a font.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub inputs: Vec<GlyphInput>,
    pub unreachable: Vec<GlyphId16>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.inputs.len() + self.unreachable.len()
    }

    pub fn into_inputs(self) -> Vec<HbInput> {
        self.inputs.into_iter().map(|g| g.input).collect()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(
            f,
            "{} of {} glyphs reachable, {} unreachable",
            self.inputs.len(),
            self.total(),
            self.unreachable.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hb_shape_args() {
        let input = HbInput::new(vec![Tag::new(b"liga"), Tag::new(b"smcp")], "fi");
        assert_eq!(input.hb_shape_args(), vec!["--features=liga,smcp", "--text=fi"]);

        let plain = HbInput::new(Vec::new(), "  A");
        assert_eq!(plain.hb_shape_args(), vec!["--text=  A"]);
    }

    #[test]
    fn test_display() {
        let input = HbInput::new(vec![Tag::new(b"smcp")], "a");
        assert_eq!(input.to_string(), "smcp\t\"a\"");
        assert_eq!(HbInput::new(Vec::new(), "b").to_string(), "-\t\"b\"");
    }

    #[test]
    fn test_pad_policy() {
        assert!(PadPolicy::ZeroWidth.applies(true));
        assert!(!PadPolicy::ZeroWidth.applies(false));
        assert!(!PadPolicy::Never.applies(true));
    }

    #[test]
    fn test_options_builder() {
        let options = InputOptions::new().with_no_pad_if(true).with_warnings_if(false);
        assert_eq!(options.pad, PadPolicy::Never);
        assert!(!options.warnings);
        assert!(InputOptions::new().with_warnings().warnings);
    }

    #[test]
    fn test_report_summary() {
        let report = BatchReport {
            inputs: vec![GlyphInput {
                glyph: GlyphId16::new(1),
                name: "A".into(),
                input: HbInput::new(Vec::new(), "A"),
            }],
            unreachable: vec![GlyphId16::new(0)],
        };
        assert_eq!(report.to_string(), "1 of 2 glyphs reachable, 1 unreachable");
        assert_eq!(report.into_inputs(), vec![HbInput::new(Vec::new(), "A")]);
    }
}
