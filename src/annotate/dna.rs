//! DNA-level annotation tokens and their coordinate ranges.

use serde::{Deserialize, Serialize};

use crate::{
    annotate::Error,
    coords::{map_position, CdsPosition, CoordinateRange},
    reference::ReferenceProvider,
    repeats::find_repeat_unit,
    sequences::revcomp,
    transcript::{Strand, Transcript},
    variant::Variant,
};

/// DNA-level change token, always spelled on the transcript strand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DnaChange {
    Substitution {
        reference: String,
        alternative: String,
    },
    /// Insertion of whole repeat-unit copies; an intermediate result that the
    /// annotation step widens to a [`DnaChange::Repeat`] over the full run,
    /// or demotes if the run may not be described as a repeat.
    RepeatInsertion {
        unit: String,
        copies: usize,
    },
    /// Repeat-unit run with reference and alternative copy counts.
    Repeat {
        unit: String,
        ref_copies: usize,
        alt_copies: usize,
    },
    Duplication,
    Inversion,
    Insertion(String),
    Deletion,
    Delins(String),
    /// Symbolic or otherwise unannotatable allele.
    Unknown,
}

impl std::fmt::Display for DnaChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DnaChange::Substitution {
                reference,
                alternative,
            } => write!(f, "{}>{}", reference, alternative),
            DnaChange::RepeatInsertion { unit, copies } => write!(f, "{}[{}]", unit, copies),
            DnaChange::Repeat {
                unit,
                ref_copies,
                alt_copies,
            } => write!(f, "{}[{}];[{}]", unit, ref_copies, alt_copies),
            DnaChange::Duplication => write!(f, "dup"),
            DnaChange::Inversion => write!(f, "inv"),
            DnaChange::Insertion(seq) => write!(f, "ins{}", seq),
            DnaChange::Deletion => write!(f, "del"),
            DnaChange::Delins(seq) => write!(f, "delins{}", seq),
            DnaChange::Unknown => write!(f, "X"),
        }
    }
}

fn ordered_range(
    start: crate::coords::CsnCoordinate,
    end: crate::coords::CsnCoordinate,
    strand: Strand,
) -> CoordinateRange {
    match strand {
        Strand::Forward => CoordinateRange::new(start, end),
        Strand::Reverse => CoordinateRange::new(end, start),
    }
}

fn end_in_transcript(pos: CdsPosition, tx: &Transcript) -> Option<bool> {
    match pos {
        CdsPosition::Downstream(n) => Some(n <= tx.three_prime_len),
        CdsPosition::Upstream(n) => Some(n < tx.coding_start),
        // A coding coordinate decides on its own; the caller returns early.
        CdsPosition::Coding(_) => None,
    }
}

/// CSN coordinate range of a variant, in transcript orientation.
///
/// Multi-base deletions with both ends on the same side outside the
/// transcript yield `None`; a deletion spanning the entire transcript is
/// still reported with its two out-of-CDS ends.
pub fn csn_coordinates(
    variant: &Variant,
    tx: &Transcript,
) -> Result<Option<CoordinateRange>, Error> {
    if variant.is_substitution() {
        return Ok(Some(CoordinateRange::single(map_position(
            variant.pos,
            tx,
        )?)));
    }

    if variant.is_insertion() {
        let before = map_position(variant.pos - 1, tx)?;
        let after = map_position(variant.pos, tx)?;
        return Ok(Some(ordered_range(before, after, tx.strand)));
    }

    if variant.is_deletion() {
        let start = map_position(variant.pos, tx)?;
        if variant.reference.len() == 1 {
            return Ok(Some(CoordinateRange::single(start)));
        }
        let end = map_position(variant.pos + variant.reference.len() as i64 - 1, tx)?;

        let start_in = match end_in_transcript(start.pos, tx) {
            None => return Ok(Some(ordered_range(start, end, tx.strand))),
            Some(flag) => flag,
        };
        let end_in = match end_in_transcript(end.pos, tx) {
            None => return Ok(Some(ordered_range(start, end, tx.strand))),
            Some(flag) => flag,
        };
        if start_in || end_in {
            return Ok(Some(ordered_range(start, end, tx.strand)));
        }
        // Both ends outside: report only a deletion swallowing the whole
        // transcript, with the 5' overhang first in transcript orientation.
        let spans_whole = match tx.strand {
            Strand::Forward => {
                matches!(start.pos, CdsPosition::Upstream(_))
                    && matches!(end.pos, CdsPosition::Downstream(_))
            }
            Strand::Reverse => {
                matches!(start.pos, CdsPosition::Downstream(_))
                    && matches!(end.pos, CdsPosition::Upstream(_))
            }
        };
        if spans_whole {
            return Ok(Some(ordered_range(start, end, tx.strand)));
        }
        return Ok(None);
    }

    if variant.is_complex() {
        let start = map_position(variant.pos, tx)?;
        if variant.reference.len() == 1 {
            return Ok(Some(CoordinateRange::single(start)));
        }
        let end = map_position(variant.pos + variant.reference.len() as i64 - 1, tx)?;
        return Ok(Some(ordered_range(start, end, tx.strand)));
    }

    Ok(None)
}

/// Classify the DNA-level change of a variant against a transcript.
///
/// `range` is the variant's CSN coordinate range; `skip_repeats` suppresses
/// the repeat-unit description, which is disallowed for events crossing an
/// exon boundary and, in the CDS, for units whose length is not a multiple
/// of three.
pub fn make_dna_annotation(
    variant: &Variant,
    tx: &Transcript,
    provider: &dyn ReferenceProvider,
    range: &CoordinateRange,
    skip_repeats: bool,
) -> Result<DnaChange, Error> {
    if variant.is_symbolic() {
        return Ok(DnaChange::Unknown);
    }

    if variant.is_substitution() {
        return Ok(match tx.strand {
            Strand::Forward => DnaChange::Substitution {
                reference: variant.reference.clone(),
                alternative: variant.alternative.clone(),
            },
            Strand::Reverse => DnaChange::Substitution {
                reference: revcomp(&variant.reference),
                alternative: revcomp(&variant.alternative),
            },
        });
    }

    if variant.is_insertion() {
        let (unit, copies) = find_repeat_unit(&variant.alternative);
        if copies > 1 && !skip_repeats {
            let (cds_lo, cds_hi) = tx.cds_genomic_bounds();
            let in_coding = variant.pos - 1 >= cds_lo && variant.pos <= cds_hi;
            let fully_inside_exon =
                range.start.offset == 0 && range.end.map(|e| e.offset == 0).unwrap_or(true);
            let partly_inside_exon =
                range.start.offset == 0 || range.end.map(|e| e.offset == 0).unwrap_or(false);
            if !in_coding || (unit.len() % 3 == 0 && fully_inside_exon) || !partly_inside_exon {
                let unit = match tx.strand {
                    Strand::Forward => unit,
                    Strand::Reverse => revcomp(&unit),
                };
                return Ok(DnaChange::RepeatInsertion { unit, copies });
            }
        }

        let alt_len = variant.alternative.len() as i64;
        match tx.strand {
            Strand::Forward => {
                // Right-shifted on this strand, so only the preceding
                // sequence can hold a duplicated or inverted copy.
                if variant.pos - alt_len < 1 {
                    return Ok(DnaChange::Insertion(variant.alternative.clone()));
                }
                let before =
                    provider.fetch(&variant.chrom, variant.pos - alt_len, variant.pos - 1)?;
                if before == variant.alternative {
                    return Ok(DnaChange::Duplication);
                }
                if alt_len > 1 && before == revcomp(&variant.alternative) {
                    return Ok(DnaChange::Inversion);
                }
                Ok(DnaChange::Insertion(variant.alternative.clone()))
            }
            Strand::Reverse => {
                // Left-shifted on this strand; the copy, if any, follows.
                let after =
                    provider.fetch(&variant.chrom, variant.pos, variant.pos + alt_len - 1)?;
                if (after.len() as i64) < alt_len {
                    return Ok(DnaChange::Insertion(revcomp(&variant.alternative)));
                }
                if after == variant.alternative {
                    return Ok(DnaChange::Duplication);
                }
                if alt_len > 1 && after == revcomp(&variant.alternative) {
                    return Ok(DnaChange::Inversion);
                }
                Ok(DnaChange::Insertion(revcomp(&variant.alternative)))
            }
        }
    } else if variant.is_deletion() {
        Ok(DnaChange::Deletion)
    } else {
        Ok(match tx.strand {
            Strand::Forward => DnaChange::Delins(variant.alternative.clone()),
            Strand::Reverse => DnaChange::Delins(revcomp(&variant.alternative)),
        })
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{csn_coordinates, make_dna_annotation, DnaChange};
    use crate::{
        reference::InMemoryProvider,
        transcript::fixtures::{forward_two_exon, reverse_two_exon},
        variant::Variant,
    };

    fn flat_provider() -> InMemoryProvider {
        // 400 bases with a CAGCAG stretch at 120..=125 and its reverse
        // complement CTGCTG at 250..=255.
        let mut seq = "ACGT".repeat(100);
        seq.replace_range(119..125, "CAGCAG");
        seq.replace_range(249..255, "CTGCTG");
        InMemoryProvider::new().with_contig("1", &seq)
    }

    #[test]
    fn substitution_spelled_on_transcript_strand() -> Result<(), anyhow::Error> {
        let provider = flat_provider();
        let v = Variant::new("1", 110, "A", "G");

        let fwd = forward_two_exon();
        let range = csn_coordinates(&v, &fwd)?.expect("range");
        let dna = make_dna_annotation(&v, &fwd, &provider, &range, false)?;
        assert_eq!(dna.to_string(), "A>G");

        let rev = reverse_two_exon();
        let range = csn_coordinates(&v, &rev)?.expect("range");
        let dna = make_dna_annotation(&v, &rev, &provider, &range, false)?;
        assert_eq!(dna.to_string(), "T>C");
        Ok(())
    }

    #[test]
    fn insertion_after_matching_run_is_duplication() -> Result<(), anyhow::Error> {
        let provider = flat_provider();
        let tx = forward_two_exon();
        // CAG inserted right after the CAGCAG stretch ending at 125.
        let v = Variant::new("1", 125, "G", "GCAG");
        let range = csn_coordinates(&v, &tx)?.expect("range");
        let dna = make_dna_annotation(&v, &tx, &provider, &range, true)?;
        assert_eq!(dna, DnaChange::Duplication);
        Ok(())
    }

    #[test]
    fn inverted_copy_is_inversion() -> Result<(), anyhow::Error> {
        let provider = flat_provider();
        let tx = forward_two_exon();
        // CAGCAG inserted right after CTGCTG at 250..=255, which is its
        // reverse complement.
        let v = Variant::new("1", 255, "G", "GCAGCAG");
        let range = csn_coordinates(&v, &tx)?.expect("range");
        let dna = make_dna_annotation(&v, &tx, &provider, &range, true)?;
        assert_eq!(dna, DnaChange::Inversion);
        Ok(())
    }

    #[test]
    fn multi_copy_insertion_outside_cds_is_repeat() -> Result<(), anyhow::Error> {
        let provider = flat_provider();
        let tx = forward_two_exon();
        // ATAT inserted in the 5' UTR at position 60; two copies of AT.
        let v = Variant::new("1", 59, "T", "TATAT");
        let range = csn_coordinates(&v, &tx)?.expect("range");
        let dna = make_dna_annotation(&v, &tx, &provider, &range, false)?;
        assert_eq!(
            dna,
            DnaChange::RepeatInsertion {
                unit: "AT".to_string(),
                copies: 2
            }
        );
        Ok(())
    }

    #[test]
    fn non_triplet_repeat_in_cds_is_not_reported_as_repeat() -> Result<(), anyhow::Error> {
        let provider = flat_provider();
        let tx = forward_two_exon();
        // GTGT inserted mid-CDS at 110; the two-base unit may not be used.
        let v = Variant::new("1", 109, "C", "CGTGT");
        let range = csn_coordinates(&v, &tx)?.expect("range");
        let dna = make_dna_annotation(&v, &tx, &provider, &range, false)?;
        assert!(!matches!(dna, DnaChange::RepeatInsertion { .. }), "{:?}", dna);
        Ok(())
    }

    #[test]
    fn deletion_outside_transcript_has_no_range() -> Result<(), anyhow::Error> {
        let tx = forward_two_exon();
        // Multi-base deletion entirely upstream of the transcript.
        let v = Variant::new("1", 10, "ACGTA", "A");
        assert_eq!(csn_coordinates(&v, &tx)?, None);
        Ok(())
    }

    #[test]
    fn deletion_spanning_whole_transcript_keeps_both_ends() -> Result<(), anyhow::Error> {
        let tx = forward_two_exon();
        let v = Variant::new("1", 29, "A".repeat(341).as_str(), "A");
        let range = csn_coordinates(&v, &tx)?.expect("range");
        assert!(range.is_fully_outside_transcript());
        Ok(())
    }

    #[test]
    fn deletion_token_is_bare_del() -> Result<(), anyhow::Error> {
        let provider = flat_provider();
        let tx = forward_two_exon();
        let v = Variant::new("1", 110, "ACG", "A");
        let range = csn_coordinates(&v, &tx)?.expect("range");
        let dna = make_dna_annotation(&v, &tx, &provider, &range, false)?;
        assert_eq!(dna, DnaChange::Deletion);
        assert_eq!(dna.to_string(), "del");
        Ok(())
    }
}
