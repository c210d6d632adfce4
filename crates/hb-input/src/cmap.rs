//! Glyph to character lookup, inverted from the font's character map.

use std::collections::{BTreeMap, HashMap};

use read_fonts::types::GlyphId16;

/// Maps each glyph reachable from plain text to one character that produces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReverseCmap(HashMap<GlyphId16, char>);

impl ReverseCmap {
    /// Invert a code point to glyph mapping.
    ///
    /// When several code points map to the same glyph the lowest one is kept. Code points
    /// that are not Unicode scalar values (surrogates, out of range) are skipped.
    pub fn new(cmap: &BTreeMap<u32, GlyphId16>) -> Self {
        let mut reverse = HashMap::with_capacity(cmap.len());
        for (&cp, &gid) in cmap {
            if let Some(ch) = char::from_u32(cp) {
                reverse.entry(gid).or_insert(ch);
            }
        }
        Self(reverse)
    }

    pub fn get(&self, gid: GlyphId16) -> Option<char> {
        self.0.get(&gid).copied()
    }

    pub fn contains(&self, gid: GlyphId16) -> bool {
        self.0.contains_key(&gid)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmap(pairs: &[(u32, u16)]) -> BTreeMap<u32, GlyphId16> {
        pairs
            .iter()
            .map(|&(cp, gid)| (cp, GlyphId16::new(gid)))
            .collect()
    }

    #[test]
    fn test_reverse_simple() {
        let rev = ReverseCmap::new(&cmap(&[(0x41, 1), (0x42, 2)]));
        assert_eq!(rev.get(GlyphId16::new(1)), Some('A'));
        assert_eq!(rev.get(GlyphId16::new(2)), Some('B'));
        assert_eq!(rev.get(GlyphId16::new(3)), None);
        assert_eq!(rev.len(), 2);
    }

    #[test]
    fn test_duplicate_keeps_lowest_code_point() {
        // U+00C5 and U+212B (ANGSTROM SIGN) commonly share a glyph
        let rev = ReverseCmap::new(&cmap(&[(0x212B, 7), (0xC5, 7)]));
        assert_eq!(rev.get(GlyphId16::new(7)), Some('\u{C5}'));
        assert_eq!(rev.len(), 1);
    }

    #[test]
    fn test_skips_surrogates() {
        let rev = ReverseCmap::new(&cmap(&[(0xD800, 3), (0xDFFF, 4), (0x20, 5)]));
        assert!(!rev.contains(GlyphId16::new(3)));
        assert!(!rev.contains(GlyphId16::new(4)));
        assert_eq!(rev.get(GlyphId16::new(5)), Some(' '));
    }

    #[test]
    fn test_empty() {
        assert!(ReverseCmap::new(&BTreeMap::new()).is_empty());
    }
}
