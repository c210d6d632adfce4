//! Reverse resolution of glyphs into shaping input.
//!
//! Starting from a glyph, the resolver looks for a character that maps to it directly. If
//! there is none it searches the substitution rules for one that produces the glyph and
//! recursively resolves whatever triggers that rule, collecting the feature tags needed to
//! activate each lookup along the way.

use log::{debug, info, warn};
use rayon::prelude::*;
use read_fonts::types::{GlyphId16, Tag};

use crate::{
    Error, Result,
    cmap::ReverseCmap,
    font::FontModel,
    rules::{RuleTable, Subtable},
    types::{BatchReport, GlyphInput, HbInput, InputOptions},
};

/// Longest chain of substitutions followed back from one glyph.
const MAX_DEPTH: usize = 256;

/// Derives shaping input for glyphs of one font.
///
/// The reverse character map is built once on construction; every resolution afterwards
/// only reads shared state, so a generator can be used from several threads.
#[derive(Debug, Clone)]
pub struct InputGenerator<'a> {
    font: &'a FontModel,
    reverse_cmap: ReverseCmap,
}

impl<'a> InputGenerator<'a> {
    pub fn new(font: &'a FontModel) -> Self {
        Self {
            font,
            reverse_cmap: ReverseCmap::new(font.cmap()),
        }
    }

    pub fn font(&self) -> &FontModel {
        self.font
    }

    /// Inputs for every reachable glyph, in glyph order, using default options.
    pub fn all_inputs(&self) -> Result<Vec<HbInput>> {
        self.glyph_inputs(&InputOptions::default())
            .map(BatchReport::into_inputs)
    }

    /// Resolve every glyph in glyph order.
    ///
    /// Unreachable glyphs are listed in the report rather than treated as errors. An
    /// inconsistent rule table aborts the whole batch.
    pub fn glyph_inputs(&self, options: &InputOptions) -> Result<BatchReport> {
        let results: Vec<_> = self
            .font
            .glyph_order()
            .par_iter()
            .map(|&glyph| {
                let pad = options.pad.applies(self.font.is_zero_width(glyph));
                self.input_for_glyph(glyph, pad).map(|input| (glyph, input))
            })
            .collect();

        let mut report = BatchReport::default();
        for result in results {
            match result? {
                (glyph, Some(input)) => report.inputs.push(GlyphInput {
                    glyph,
                    name: self.font.glyph_name(glyph),
                    input,
                }),
                (glyph, None) => {
                    let name = self.font.glyph_name(glyph);
                    if options.warnings {
                        warn!("not tested (unreachable?): {name}");
                    } else {
                        debug!("not tested (unreachable?): {name}");
                    }
                    report.unreachable.push(glyph);
                }
            }
        }
        info!("{report}");
        Ok(report)
    }

    /// Input that renders `glyph`, or `None` when no known mechanism reaches it.
    ///
    /// With `pad`, a direct hit is prefixed with two spaces.
    pub fn input_for_glyph(&self, glyph: GlyphId16, pad: bool) -> Result<Option<HbInput>> {
        self.resolve(glyph, &[], pad, &[])
    }

    /// Like [`Self::input_for_glyph`], looking the glyph up by name.
    pub fn input_for_name(&self, name: &str, pad: bool) -> Result<Option<HbInput>> {
        let glyph = self
            .font
            .glyph_id(name)
            .ok_or_else(|| Error::UnknownGlyph(name.to_owned()))?;
        self.input_for_glyph(glyph, pad)
    }

    /// `trail` holds the glyphs being resolved further up this recursion chain.
    fn resolve(
        &self,
        glyph: GlyphId16,
        features: &[Tag],
        pad: bool,
        trail: &[GlyphId16],
    ) -> Result<Option<HbInput>> {
        if let Some(ch) = self.reverse_cmap.get(glyph) {
            let text = if pad { format!("  {ch}") } else { ch.to_string() };
            return Ok(Some(HbInput::new(features.to_vec(), text)));
        }

        let Some(rules) = self.font.rules().filter(|r| !r.is_empty()) else {
            return Ok(None);
        };

        if trail.contains(&glyph) {
            debug!("substitution cycle through '{}'", self.font.glyph_name(glyph));
            return Ok(None);
        }
        if trail.len() >= MAX_DEPTH {
            debug!(
                "giving up on '{}' after {MAX_DEPTH} nested substitutions",
                self.font.glyph_name(glyph)
            );
            return Ok(None);
        }
        let trail = [trail, &[glyph][..]].concat();

        for (lookup_index, lookup) in rules.lookups.iter().enumerate() {
            for subtable in &lookup.subtables {
                match subtable {
                    Subtable::Single(single) => {
                        if let Some(input) = single.input_for(glyph) {
                            return self.input_with_context(
                                rules,
                                input,
                                lookup_index as u16,
                                features,
                                &trail,
                            );
                        }
                    }
                    Subtable::Ligature(ligature) => {
                        if let Some(components) = ligature.components_for(glyph) {
                            return self
                                .sequence_from_glyphs(&components, features, &trail)
                                .map(Some);
                        }
                    }
                    Subtable::ChainContext(_) | Subtable::Unsupported { .. } => {}
                }
            }
        }
        Ok(None)
    }

    /// Resolve `glyph` with `lookup_index` activated, either through a feature or through a
    /// chaining rule whose context can be spelled out.
    fn input_with_context(
        &self,
        rules: &RuleTable,
        glyph: GlyphId16,
        lookup_index: u16,
        features: &[Tag],
        trail: &[GlyphId16],
    ) -> Result<Option<HbInput>> {
        if let Some(tag) = rules.feature_for_lookup(lookup_index) {
            let features = [features, &[tag][..]].concat();
            return self.resolve(glyph, &features, false, trail);
        }

        for chain in rules.chain_rules_for(lookup_index) {
            let glyphs = if let Some(next) = chain.first_lookahead() {
                [glyph, next]
            } else if let Some(prev) = chain.first_backtrack() {
                [prev, glyph]
            } else {
                continue;
            };
            return self.sequence_from_glyphs(&glyphs, features, trail).map(Some);
        }

        Err(Error::InconsistentRuleTable {
            lookup_index,
            glyph: self.font.glyph_name(glyph),
        })
    }

    /// Resolve each glyph in turn, feeding the features collected so far into the next one.
    fn sequence_from_glyphs(
        &self,
        glyphs: &[GlyphId16],
        features: &[Tag],
        trail: &[GlyphId16],
    ) -> Result<HbInput> {
        glyphs.iter().try_fold(
            HbInput::new(features.to_vec(), String::new()),
            |acc, &glyph| {
                let next = self.resolve(glyph, &acc.features, false, trail)?.ok_or_else(|| {
                    Error::UnresolvedSequence {
                        glyph: self.font.glyph_name(glyph),
                    }
                })?;
                Ok(HbInput::new(next.features, acc.text + &next.text))
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{ChainContextSubst, LigatureSubst, Lookup, SingleSubst};

    fn gid(id: u16) -> GlyphId16 {
        GlyphId16::new(id)
    }

    fn tag(t: &[u8; 4]) -> Tag {
        Tag::new(t)
    }

    // .notdef A B C L X a a.alt acutecomb orphan
    fn base_font() -> FontModel {
        FontModel::new([
            ".notdef", "A", "B", "C", "L", "X", "a", "a.alt", "acutecomb", "orphan",
        ])
        .with_advances((0..10).map(|i| (gid(i), 500)))
        .with_advance(gid(8), 0)
        .with_mapping(0x41, gid(1))
        .with_mapping(0x43, gid(3))
        .with_mapping(0x58, gid(5))
        .with_mapping(0x61, gid(6))
        .with_mapping(0x301, gid(8))
    }

    #[test]
    fn test_direct_hit() {
        let font = base_font();
        let generator = InputGenerator::new(&font);
        assert_eq!(
            generator.input_for_glyph(gid(1), false).unwrap(),
            Some(HbInput::new(Vec::new(), "A"))
        );
        assert_eq!(
            generator.input_for_glyph(gid(1), true).unwrap(),
            Some(HbInput::new(Vec::new(), "  A"))
        );
    }

    #[test]
    fn test_no_gsub_is_unreachable() {
        let font = base_font();
        let generator = InputGenerator::new(&font);
        assert_eq!(generator.input_for_glyph(gid(9), false).unwrap(), None);
    }

    #[test]
    fn test_empty_lookup_list_is_unreachable() {
        let font = base_font().with_rules(RuleTable::new().with_feature(tag(b"liga"), [0]));
        let generator = InputGenerator::new(&font);
        assert_eq!(generator.input_for_glyph(gid(9), false).unwrap(), None);
    }

    #[test]
    fn test_single_substitution_through_feature() {
        let font = base_font().with_rules(
            RuleTable::new()
                .with_feature(tag(b"test"), [0])
                .with_lookup(Lookup::single(SingleSubst::new([(gid(6), gid(7))]))),
        );
        let generator = InputGenerator::new(&font);
        assert_eq!(
            generator.input_for_glyph(gid(7), false).unwrap(),
            Some(HbInput::new(vec![tag(b"test")], "a"))
        );
    }

    #[test]
    fn test_nested_single_substitutions_accumulate_features() {
        // A -> B under smcp, B -> L under ss01
        let font = base_font().with_rules(
            RuleTable::new()
                .with_feature(tag(b"smcp"), [0])
                .with_feature(tag(b"ss01"), [1])
                .with_lookup(Lookup::single(SingleSubst::new([(gid(1), gid(2))])))
                .with_lookup(Lookup::single(SingleSubst::new([(gid(2), gid(4))]))),
        );
        let generator = InputGenerator::new(&font);
        assert_eq!(
            generator.input_for_glyph(gid(4), false).unwrap(),
            Some(HbInput::new(vec![tag(b"ss01"), tag(b"smcp")], "A"))
        );
    }

    #[test]
    fn test_ligature() {
        let font = base_font().with_rules(
            RuleTable::new()
                .with_feature(tag(b"liga"), [0])
                .with_lookup(Lookup::ligature(
                    LigatureSubst::new().with_ligature(&[gid(1), gid(3)], gid(4)),
                )),
        );
        let generator = InputGenerator::new(&font);
        assert_eq!(
            generator.input_for_glyph(gid(4), false).unwrap(),
            Some(HbInput::new(Vec::new(), "AC"))
        );
    }

    #[test]
    fn test_ligature_threads_component_features() {
        // B is only reachable as smcp(A); ligature B+C -> L
        let font = base_font().with_rules(
            RuleTable::new()
                .with_feature(tag(b"smcp"), [0])
                .with_lookup(Lookup::single(SingleSubst::new([(gid(1), gid(2))])))
                .with_lookup(Lookup::ligature(
                    LigatureSubst::new().with_ligature(&[gid(2), gid(3)], gid(4)),
                )),
        );
        let generator = InputGenerator::new(&font);
        assert_eq!(
            generator.input_for_glyph(gid(4), false).unwrap(),
            Some(HbInput::new(vec![tag(b"smcp")], "AC"))
        );
    }

    #[test]
    fn test_chain_lookahead() {
        // lookup 0 (a -> a.alt) only applied by lookup 1 when followed by X
        let font = base_font().with_rules(
            RuleTable::new()
                .with_feature(tag(b"calt"), [1])
                .with_lookup(Lookup::single(SingleSubst::new([(gid(6), gid(7))])))
                .with_lookup(Lookup::chain_context(
                    ChainContextSubst::new([0]).with_lookahead([gid(5), gid(1)]),
                )),
        );
        let generator = InputGenerator::new(&font);
        assert_eq!(
            generator.input_for_glyph(gid(7), false).unwrap(),
            Some(HbInput::new(Vec::new(), "aX"))
        );
    }

    #[test]
    fn test_chain_backtrack() {
        let font = base_font().with_rules(
            RuleTable::new()
                .with_lookup(Lookup::single(SingleSubst::new([(gid(6), gid(7))])))
                .with_lookup(Lookup::chain_context(
                    ChainContextSubst::new([0]).with_backtrack([gid(3)]),
                )),
        );
        let generator = InputGenerator::new(&font);
        assert_eq!(
            generator.input_for_glyph(gid(7), false).unwrap(),
            Some(HbInput::new(Vec::new(), "Ca"))
        );
    }

    #[test]
    fn test_chain_without_context_is_skipped() {
        let font = base_font().with_rules(
            RuleTable::new()
                .with_lookup(Lookup::single(SingleSubst::new([(gid(6), gid(7))])))
                .with_lookup(Lookup::chain_context(ChainContextSubst::new([0])))
                .with_lookup(Lookup::chain_context(
                    ChainContextSubst::new([0]).with_lookahead([gid(1)]),
                )),
        );
        let generator = InputGenerator::new(&font);
        assert_eq!(
            generator.input_for_glyph(gid(7), false).unwrap(),
            Some(HbInput::new(Vec::new(), "aA"))
        );
    }

    #[test]
    fn test_inactive_lookup_is_inconsistent() {
        let font = base_font().with_rules(
            RuleTable::new()
                .with_feature(tag(b"liga"), [5])
                .with_lookup(Lookup::single(SingleSubst::new([(gid(6), gid(7))]))),
        );
        let generator = InputGenerator::new(&font);
        let err = generator.input_for_glyph(gid(7), false).unwrap_err();
        assert!(
            matches!(err, Error::InconsistentRuleTable { lookup_index: 0, ref glyph } if glyph == "a"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn test_unreachable_component_is_fatal() {
        // 'orphan' has no mapping and no rule produces it
        let font = base_font().with_rules(
            RuleTable::new().with_lookup(Lookup::ligature(
                LigatureSubst::new().with_ligature(&[gid(1), gid(9)], gid(4)),
            )),
        );
        let generator = InputGenerator::new(&font);
        let err = generator.input_for_glyph(gid(4), false).unwrap_err();
        assert!(
            matches!(err, Error::UnresolvedSequence { ref glyph } if glyph == "orphan"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn test_first_match_wins_without_backtracking() {
        // lookup 0 matches first but its trigger is unreachable; lookup 1 would work
        let font = base_font().with_rules(
            RuleTable::new()
                .with_feature(tag(b"ss01"), [0])
                .with_feature(tag(b"ss02"), [1])
                .with_lookup(Lookup::single(SingleSubst::new([(gid(9), gid(4))])))
                .with_lookup(Lookup::single(SingleSubst::new([(gid(1), gid(4))]))),
        );
        let generator = InputGenerator::new(&font);
        assert_eq!(generator.input_for_glyph(gid(4), false).unwrap(), None);
    }

    #[test]
    fn test_substitution_cycle_terminates() {
        let font = base_font().with_rules(
            RuleTable::new()
                .with_feature(tag(b"ss01"), [0])
                .with_lookup(Lookup::single(SingleSubst::new([
                    (gid(2), gid(4)),
                    (gid(4), gid(2)),
                ]))),
        );
        let generator = InputGenerator::new(&font);
        assert_eq!(generator.input_for_glyph(gid(4), false).unwrap(), None);
    }

    // g0 -> g1 -> ... -> g{n-1}, all in one lookup under 'test'
    fn substitution_chain(n: u16) -> FontModel {
        FontModel::new((0..n).map(|i| format!("g{i}")))
            .with_mapping(0x61, gid(0))
            .with_rules(
                RuleTable::new()
                    .with_feature(tag(b"test"), [0])
                    .with_lookup(Lookup::single(SingleSubst::new(
                        (1..n).map(|i| (gid(i - 1), gid(i))),
                    ))),
            )
    }

    #[test]
    fn test_long_substitution_chain_within_depth() {
        let font = substitution_chain(MAX_DEPTH as u16 + 1);
        let generator = InputGenerator::new(&font);
        let input = generator
            .input_for_glyph(gid(MAX_DEPTH as u16), false)
            .unwrap()
            .unwrap();
        assert_eq!(input.text, "a");
        assert_eq!(input.features, vec![tag(b"test"); MAX_DEPTH]);
    }

    #[test]
    fn test_deep_substitution_chain_is_unreachable() {
        let font = substitution_chain(10_000);
        let generator = InputGenerator::new(&font);
        assert_eq!(generator.input_for_glyph(gid(9_999), false).unwrap(), None);
        assert_eq!(
            generator.input_for_glyph(gid(MAX_DEPTH as u16 + 1), false).unwrap(),
            None
        );
        assert!(generator.input_for_glyph(gid(10), false).unwrap().is_some());
    }

    #[test]
    fn test_unsupported_lookup_is_unreachable() {
        let font = base_font().with_rules(RuleTable::new().with_lookup(Lookup::new(
            2,
            vec![Subtable::Unsupported {
                lookup_type: 2,
                format: 1,
            }],
        )));
        let generator = InputGenerator::new(&font);
        assert_eq!(generator.input_for_glyph(gid(9), false).unwrap(), None);
    }

    #[test]
    fn test_all_inputs_pads_zero_width() {
        let font = base_font();
        let inputs = InputGenerator::new(&font).all_inputs().unwrap();
        assert_eq!(
            inputs,
            vec![
                HbInput::new(Vec::new(), "A"),
                HbInput::new(Vec::new(), "C"),
                HbInput::new(Vec::new(), "X"),
                HbInput::new(Vec::new(), "a"),
                HbInput::new(Vec::new(), "  \u{301}"),
            ]
        );
    }

    #[test]
    fn test_glyph_inputs_reports_unreachable() {
        let font = base_font();
        let report = InputGenerator::new(&font)
            .glyph_inputs(&InputOptions::new().with_no_pad_if(true))
            .unwrap();
        assert_eq!(report.inputs.len(), 5);
        assert_eq!(report.inputs[4].name, "acutecomb");
        assert_eq!(report.inputs[4].input.text, "\u{301}");
        assert_eq!(report.unreachable, vec![gid(0), gid(2), gid(4), gid(7), gid(9)]);
    }

    #[test]
    fn test_input_for_name() {
        let font = base_font();
        let generator = InputGenerator::new(&font);
        assert_eq!(
            generator.input_for_name("X", false).unwrap(),
            Some(HbInput::new(Vec::new(), "X"))
        );
        assert!(matches!(
            generator.input_for_name("nope", false),
            Err(Error::UnknownGlyph(name)) if name == "nope"
        ));
    }
}
