//! Font data consumed by input generation.

use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Formatter};

use read_fonts::{
    FontRef, TableProvider,
    tables::cmap::{EncodingRecord, PlatformId},
    types::{GlyphId, GlyphId16},
};

use crate::{Result, rules::RuleTable};

/// The parts of a font that input generation reads: glyph order and names, advance widths,
/// the character map and the substitution rules.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct FontModel {
    names: Vec<String>,
    glyph_order: Vec<GlyphId16>,
    by_name: HashMap<String, GlyphId16>,
    advances: HashMap<GlyphId16, u16>,
    cmap: BTreeMap<u32, GlyphId16>,
    rules: Option<RuleTable>,
}

impl fmt::Debug for FontModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontModel")
            .field("num_glyphs", &self.glyph_order.len())
            .field("cmap_len", &self.cmap.len())
            .field("has_gsub", &self.rules.is_some())
            .finish_non_exhaustive()
    }
}

impl<'a> TryFrom<&FontRef<'a>> for FontModel {
    type Error = crate::Error;

    fn try_from(font: &FontRef<'a>) -> Result<Self> {
        Self::from_font(font)
    }
}

impl FontModel {
    /// Create a model whose glyph order is `glyph_names`, in order.
    pub fn new<I, S>(glyph_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = glyph_names.into_iter().map(Into::into).collect();
        let glyph_order = (0..names.len()).map(|gid| GlyphId16::new(gid as u16)).collect();
        let mut by_name = HashMap::with_capacity(names.len());
        for (gid, name) in names.iter().enumerate() {
            by_name.entry(name.clone()).or_insert(GlyphId16::new(gid as u16));
        }
        Self {
            names,
            glyph_order,
            by_name,
            ..Default::default()
        }
    }

    pub fn from_data(data: &[u8]) -> Result<Self> {
        Self::from_font(&FontRef::new(data)?)
    }

    pub fn from_font(font: &FontRef) -> Result<Self> {
        let num_glyphs = font.maxp()?.num_glyphs();
        let post = font.post().ok();
        let names = (0..num_glyphs).map(|gid| {
            post.as_ref()
                .and_then(|p| p.glyph_name(GlyphId16::new(gid)).map(|n| n.to_string()))
                .unwrap_or_else(|| format!("gid{gid}"))
        });

        let mut model = Self::new(names).with_cmap(largest_cmap(font));

        if let Ok(hmtx) = font.hmtx() {
            model = model.with_advances((0..num_glyphs).filter_map(|gid| {
                hmtx.advance(GlyphId::new(gid as u32))
                    .map(|adv| (GlyphId16::new(gid), adv))
            }));
        }

        if let Ok(gsub) = font.gsub() {
            model = model.with_rules(RuleTable::from_gsub(&gsub)?);
        }

        Ok(model)
    }

    pub fn with_advance(mut self, gid: GlyphId16, advance: u16) -> Self {
        self.advances.insert(gid, advance);
        self
    }

    pub fn with_advances(mut self, advances: impl IntoIterator<Item = (GlyphId16, u16)>) -> Self {
        self.advances.extend(advances);
        self
    }

    pub fn with_mapping(mut self, codepoint: u32, gid: GlyphId16) -> Self {
        self.cmap.insert(codepoint, gid);
        self
    }

    pub fn with_cmap(mut self, cmap: BTreeMap<u32, GlyphId16>) -> Self {
        self.cmap = cmap;
        self
    }

    pub fn with_rules(mut self, rules: RuleTable) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn glyph_order(&self) -> &[GlyphId16] {
        &self.glyph_order
    }

    pub fn num_glyphs(&self) -> usize {
        self.glyph_order.len()
    }

    /// Glyph name, or `gid<N>` for glyphs outside the glyph order.
    pub fn glyph_name(&self, gid: GlyphId16) -> String {
        self.names
            .get(gid.to_u16() as usize)
            .cloned()
            .unwrap_or_else(|| format!("gid{}", gid.to_u16()))
    }

    /// Look up a glyph by name, falling back to `gid<N>` notation.
    pub fn glyph_id(&self, name: &str) -> Option<GlyphId16> {
        self.by_name.get(name).copied().or_else(|| {
            name.strip_prefix("gid")
                .and_then(|n| n.parse::<u16>().ok())
                .filter(|&n| (n as usize) < self.glyph_order.len())
                .map(GlyphId16::new)
        })
    }

    /// Advance width, if the font records one for this glyph.
    pub fn advance(&self, gid: GlyphId16) -> Option<u16> {
        self.advances.get(&gid).copied()
    }

    pub fn is_zero_width(&self, gid: GlyphId16) -> bool {
        self.advance(gid) == Some(0)
    }

    pub fn cmap(&self) -> &BTreeMap<u32, GlyphId16> {
        &self.cmap
    }

    pub fn rules(&self) -> Option<&RuleTable> {
        self.rules.as_ref()
    }
}

/// The Unicode cmap subtable with the most mappings, or the largest of any encoding when the
/// font has no Unicode subtable.
fn largest_cmap(font: &FontRef) -> BTreeMap<u32, GlyphId16> {
    let Ok(cmap) = font.cmap() else {
        return BTreeMap::new();
    };

    let subtables: Vec<(bool, BTreeMap<u32, GlyphId16>)> = cmap
        .encoding_records()
        .iter()
        .filter_map(|r| r.subtable(cmap.offset_data()).ok().map(|st| (r, st)))
        .map(|(record, subtable)| {
            let mappings = subtable
                .iter()
                .map(|(cp, gid)| (cp, GlyphId16::new(gid.to_u32() as u16)))
                .collect();
            (is_unicode(record), mappings)
        })
        .collect();

    let has_unicode = subtables.iter().any(|(unicode, _)| *unicode);
    subtables
        .into_iter()
        .filter(|(unicode, _)| *unicode || !has_unicode)
        .map(|(_, mappings)| mappings)
        .reduce(|best, m| if m.len() > best.len() { m } else { best })
        .unwrap_or_default()
}

fn is_unicode(record: &EncodingRecord) -> bool {
    matches!(
        (record.platform_id(), record.encoding_id()),
        (PlatformId::Unicode, _) | (PlatformId::Windows, 1 | 10)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> FontModel {
        FontModel::new([".notdef", "A", "A.sc", "acutecomb"])
            .with_advances([(GlyphId16::new(1), 600), (GlyphId16::new(3), 0)])
            .with_mapping(0x41, GlyphId16::new(1))
    }

    #[test]
    fn test_glyph_order_follows_names() {
        let font = model();
        assert_eq!(font.num_glyphs(), 4);
        assert_eq!(font.glyph_order()[2], GlyphId16::new(2));
        assert_eq!(font.glyph_name(GlyphId16::new(2)), "A.sc");
        assert_eq!(font.glyph_name(GlyphId16::new(9)), "gid9");
    }

    #[test]
    fn test_glyph_id_by_name_and_gid_notation() {
        let font = model();
        assert_eq!(font.glyph_id("A.sc"), Some(GlyphId16::new(2)));
        assert_eq!(font.glyph_id("gid3"), Some(GlyphId16::new(3)));
        assert_eq!(font.glyph_id("gid4"), None);
        assert_eq!(font.glyph_id("missing"), None);
    }

    #[test]
    fn test_zero_width() {
        let font = model();
        assert!(font.is_zero_width(GlyphId16::new(3)));
        assert!(!font.is_zero_width(GlyphId16::new(1)));
        // no recorded advance is not zero width
        assert!(!font.is_zero_width(GlyphId16::new(2)));
    }

    #[test]
    fn test_no_rules_by_default() {
        assert!(model().rules().is_none());
    }
}
