//! GSUB (Glyph Substitution) table conversion into a [`RuleTable`].

use log::debug;
use read_fonts::{
    ReadError,
    tables::{
        gsub::{
            ChainedSequenceContext, Gsub, LigatureSubstFormat1, SequenceContext, SingleSubst,
            SubstitutionLookup, SubstitutionSubtables,
        },
        layout::CoverageTable,
    },
    types::GlyphId16,
};

use crate::{
    Result,
    rules::{
        ChainContextSubst, FeatureRecord, Ligature, LigatureSet, LigatureSubst, Lookup,
        RuleTable, SingleSubst as SingleRule, Subtable,
    },
};

impl RuleTable {
    /// Convert a parsed GSUB table, keeping lookup indices aligned with the font.
    pub fn from_gsub(gsub: &Gsub) -> Result<Self> {
        let feature_list = gsub.feature_list()?;
        let features = feature_list
            .feature_records()
            .iter()
            .map(|r| FeatureRecord {
                tag: r.feature_tag(),
                lookup_indices: r
                    .feature(feature_list.offset_data())
                    .map_err(|e| debug!("feature '{}' is unreadable: {e}", r.feature_tag()))
                    .into_iter()
                    .flat_map(|f| f.lookup_list_indices().iter().map(|i| i.get()))
                    .collect(),
            })
            .collect();

        let lookups = gsub
            .lookup_list()?
            .lookups()
            .iter()
            .enumerate()
            .map(|(idx, lookup)| match lookup {
                Ok(lookup) => {
                    let lookup = convert_lookup(&lookup);
                    let skipped = lookup.unsupported_formats();
                    if !skipped.is_empty() {
                        debug!(
                            "lookup {idx} of type {} is not followed (subtable formats {skipped:?})",
                            lookup.lookup_type
                        );
                    }
                    lookup
                }
                Err(e) => {
                    debug!("lookup {idx} is unreadable: {e}");
                    Lookup::new(0, Vec::new())
                }
            })
            .collect();

        Ok(Self { features, lookups })
    }
}

type ReadResult<T> = std::result::Result<T, ReadError>;

/// Drop a subtable that failed to parse, leaving a trace in the log.
fn readable<T>(lookup_type: u16, subtable: ReadResult<T>) -> Option<T> {
    subtable
        .map_err(|e| debug!("skipping unreadable subtable of lookup type {lookup_type}: {e}"))
        .ok()
}

fn convert_lookup(lookup: &SubstitutionLookup<'_>) -> Lookup {
    let subtables = match lookup.subtables() {
        Ok(subtables) => subtables,
        Err(e) => {
            debug!("lookup of type {} is unreadable: {e}", lookup.lookup_type());
            return Lookup::new(lookup.lookup_type(), Vec::new());
        }
    };
    match subtables {
        SubstitutionSubtables::Single(tables) => Lookup::new(
            1,
            tables
                .iter()
                .filter_map(|t| readable(1, t.and_then(|t| single(&t))))
                .map(Subtable::Single)
                .collect(),
        ),
        SubstitutionSubtables::Ligature(tables) => Lookup::new(
            4,
            tables
                .iter()
                .filter_map(|t| readable(4, t.and_then(|t| ligature(&t))))
                .map(Subtable::Ligature)
                .collect(),
        ),
        SubstitutionSubtables::ChainContextual(tables) => Lookup::new(
            6,
            tables
                .iter()
                .filter_map(|t| readable(6, t))
                .map(|t| chain_context(&t))
                .collect(),
        ),
        SubstitutionSubtables::Contextual(tables) => unsupported(
            5,
            tables.iter().filter_map(|t| readable(5, t)).map(|t| match t {
                SequenceContext::Format1(_) => 1,
                SequenceContext::Format2(_) => 2,
                SequenceContext::Format3(_) => 3,
            }),
        ),
        SubstitutionSubtables::Multiple(tables) => {
            unsupported(2, tables.iter().filter_map(|t| readable(2, t)).map(|_| 1))
        }
        SubstitutionSubtables::Alternate(tables) => {
            unsupported(3, tables.iter().filter_map(|t| readable(3, t)).map(|_| 1))
        }
        SubstitutionSubtables::Reverse(tables) => {
            unsupported(8, tables.iter().filter_map(|t| readable(8, t)).map(|_| 1))
        }
    }
}

fn unsupported(lookup_type: u16, formats: impl Iterator<Item = u16>) -> Lookup {
    Lookup::new(
        lookup_type,
        formats
            .map(|format| Subtable::Unsupported {
                lookup_type,
                format,
            })
            .collect(),
    )
}

fn single(subtable: &SingleSubst<'_>) -> ReadResult<SingleRule> {
    let mapping = match subtable {
        SingleSubst::Format1(fmt) => {
            let delta = fmt.delta_glyph_id() as i32;
            Coverage(fmt.coverage()?)
                .iter()
                .map(|gid| {
                    let to = (gid.to_u16() as i32 + delta).rem_euclid(0x10000) as u16;
                    (gid, GlyphId16::new(to))
                })
                .collect()
        }
        SingleSubst::Format2(fmt) => {
            let subs = fmt.substitute_glyph_ids();
            Coverage(fmt.coverage()?)
                .iter()
                .zip(subs.iter())
                .map(|(gid, new)| (gid, new.get()))
                .collect()
        }
    };
    Ok(SingleRule { mapping })
}

fn ligature(subtable: &LigatureSubstFormat1<'_>) -> ReadResult<LigatureSubst> {
    let sets = Coverage(subtable.coverage()?)
        .iter()
        .zip(subtable.ligature_sets().iter())
        .map(|(first, set)| {
            let ligatures = set?
                .ligatures()
                .iter()
                .map(|lig| {
                    let lig = lig?;
                    Ok(Ligature {
                        glyph: lig.ligature_glyph(),
                        components: lig.component_glyph_ids().iter().map(|g| g.get()).collect(),
                    })
                })
                .collect::<ReadResult<Vec<_>>>()?;
            Ok(LigatureSet { first, ligatures })
        })
        .collect::<ReadResult<Vec<_>>>()?;
    Ok(LigatureSubst { sets })
}

fn chain_context(subtable: &ChainedSequenceContext<'_>) -> Subtable {
    let ChainedSequenceContext::Format3(fmt) = subtable else {
        let format = match subtable {
            ChainedSequenceContext::Format1(_) => 1,
            _ => 2,
        };
        return Subtable::Unsupported {
            lookup_type: 6,
            format,
        };
    };
    Subtable::ChainContext(ChainContextSubst {
        backtrack: glyph_sets(fmt.backtrack_coverages().iter()),
        lookahead: glyph_sets(fmt.lookahead_coverages().iter()),
        lookup_indices: fmt
            .seq_lookup_records()
            .iter()
            .map(|r| r.lookup_list_index())
            .collect(),
    })
}

fn glyph_sets<'a>(
    coverages: impl Iterator<Item = ReadResult<CoverageTable<'a>>>,
) -> Vec<Vec<GlyphId16>> {
    coverages
        .filter_map(|c| readable(6, c))
        .map(|c| Coverage(c).iter().collect::<Vec<_>>())
        .collect()
}

struct Coverage<'a>(CoverageTable<'a>);

impl Coverage<'_> {
    fn iter(&self) -> impl Iterator<Item = GlyphId16> + '_ {
        match &self.0 {
            CoverageTable::Format1(f) => {
                Box::new(f.glyph_array().iter().map(|g| g.get()))
                    as Box<dyn Iterator<Item = GlyphId16>>
            }
            CoverageTable::Format2(f) => Box::new(f.range_records().iter().flat_map(|r| {
                let start = r.start_glyph_id().to_u16();
                let end = r.end_glyph_id().to_u16();
                (start..=end).map(GlyphId16::new)
            })),
        }
    }
}
