//! In-memory model of the GSUB rules that input generation walks backwards.
//!
//! Only the shapes the resolver understands are modelled in detail: single substitution,
//! ligature substitution and coverage-based chaining context. Everything else is kept as
//! [`Subtable::Unsupported`] so that lookup indices stay aligned with the font.

use read_fonts::types::{GlyphId16, Tag};

/// The substitution rules of a font, in table order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTable {
    pub features: Vec<FeatureRecord>,
    pub lookups: Vec<Lookup>,
}

/// A feature tag and the lookups it activates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureRecord {
    pub tag: Tag,
    pub lookup_indices: Vec<u16>,
}

/// A lookup and its subtables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    /// GSUB lookup type, with extension lookups already unwrapped.
    pub lookup_type: u16,
    pub subtables: Vec<Subtable>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subtable {
    Single(SingleSubst),
    Ligature(LigatureSubst),
    ChainContext(ChainContextSubst),
    Unsupported { lookup_type: u16, format: u16 },
}

/// Lookup type 1: one glyph replaced by another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SingleSubst {
    /// `(input, output)` pairs in coverage order.
    pub mapping: Vec<(GlyphId16, GlyphId16)>,
}

/// Lookup type 4: a glyph sequence replaced by one ligature glyph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LigatureSubst {
    pub sets: Vec<LigatureSet>,
}

/// All ligatures starting with the same first component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LigatureSet {
    pub first: GlyphId16,
    pub ligatures: Vec<Ligature>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ligature {
    pub glyph: GlyphId16,
    /// Components after the first one.
    pub components: Vec<GlyphId16>,
}

/// Lookup type 6: nested lookups applied when backtrack/lookahead context matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainContextSubst {
    /// Glyph sets per backtrack position, nearest position first.
    pub backtrack: Vec<Vec<GlyphId16>>,
    pub lookahead: Vec<Vec<GlyphId16>>,
    /// Lookup indices named by the substitution records.
    pub lookup_indices: Vec<u16>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feature(mut self, tag: Tag, lookups: impl IntoIterator<Item = u16>) -> Self {
        self.features.push(FeatureRecord {
            tag,
            lookup_indices: lookups.into_iter().collect(),
        });
        self
    }

    pub fn with_lookup(mut self, lookup: Lookup) -> Self {
        self.lookups.push(lookup);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.lookups.is_empty()
    }

    /// Tag of the first feature (in table order) that activates `lookup_index`.
    pub fn feature_for_lookup(&self, lookup_index: u16) -> Option<Tag> {
        self.features
            .iter()
            .find(|f| f.lookup_indices.contains(&lookup_index))
            .map(|f| f.tag)
    }

    /// Chaining rules, in table order, that apply `lookup_index` as a nested lookup.
    pub fn chain_rules_for(&self, lookup_index: u16) -> impl Iterator<Item = &ChainContextSubst> {
        self.lookups
            .iter()
            .flat_map(|lookup| &lookup.subtables)
            .filter_map(|subtable| match subtable {
                Subtable::ChainContext(chain) => Some(chain),
                _ => None,
            })
            .filter(move |chain| chain.lookup_indices.contains(&lookup_index))
    }
}

impl Lookup {
    pub fn new(lookup_type: u16, subtables: Vec<Subtable>) -> Self {
        Self {
            lookup_type,
            subtables,
        }
    }

    pub fn single(subst: SingleSubst) -> Self {
        Self::new(1, vec![Subtable::Single(subst)])
    }

    pub fn ligature(subst: LigatureSubst) -> Self {
        Self::new(4, vec![Subtable::Ligature(subst)])
    }

    pub fn chain_context(subst: ChainContextSubst) -> Self {
        Self::new(6, vec![Subtable::ChainContext(subst)])
    }

    /// Formats of the subtables that the resolver does not follow.
    pub fn unsupported_formats(&self) -> Vec<u16> {
        self.subtables
            .iter()
            .filter_map(|subtable| match subtable {
                Subtable::Unsupported { format, .. } => Some(*format),
                _ => None,
            })
            .collect()
    }
}

impl SingleSubst {
    pub fn new(mapping: impl IntoIterator<Item = (GlyphId16, GlyphId16)>) -> Self {
        Self {
            mapping: mapping.into_iter().collect(),
        }
    }

    /// First input glyph that is replaced by `output`.
    pub fn input_for(&self, output: GlyphId16) -> Option<GlyphId16> {
        self.mapping
            .iter()
            .find(|&&(_, to)| to == output)
            .map(|&(from, _)| from)
    }
}

impl LigatureSubst {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a ligature, grouping it with earlier ligatures sharing its first component.
    pub fn with_ligature(mut self, components: &[GlyphId16], glyph: GlyphId16) -> Self {
        let Some((&first, rest)) = components.split_first() else {
            return self;
        };
        let ligature = Ligature {
            glyph,
            components: rest.to_vec(),
        };
        match self.sets.iter_mut().find(|set| set.first == first) {
            Some(set) => set.ligatures.push(ligature),
            None => self.sets.push(LigatureSet {
                first,
                ligatures: vec![ligature],
            }),
        }
        self
    }

    /// Full component sequence of the first ligature that produces `glyph`.
    pub fn components_for(&self, glyph: GlyphId16) -> Option<Vec<GlyphId16>> {
        self.sets.iter().find_map(|set| {
            set.ligatures
                .iter()
                .find(|lig| lig.glyph == glyph)
                .map(|lig| [&[set.first][..], &lig.components[..]].concat())
        })
    }
}

impl ChainContextSubst {
    pub fn new(lookup_indices: impl IntoIterator<Item = u16>) -> Self {
        Self {
            lookup_indices: lookup_indices.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn with_backtrack(mut self, glyphs: impl IntoIterator<Item = GlyphId16>) -> Self {
        self.backtrack.push(glyphs.into_iter().collect());
        self
    }

    pub fn with_lookahead(mut self, glyphs: impl IntoIterator<Item = GlyphId16>) -> Self {
        self.lookahead.push(glyphs.into_iter().collect());
        self
    }

    pub fn first_backtrack(&self) -> Option<GlyphId16> {
        self.backtrack.first().and_then(|set| set.first()).copied()
    }

    pub fn first_lookahead(&self) -> Option<GlyphId16> {
        self.lookahead.first().and_then(|set| set.first()).copied()
    }
}
