//! Assembly of the full CSN annotation of a variant against a transcript.

pub use crate::annotate::{
    dna::{csn_coordinates, make_dna_annotation, DnaChange},
    error::Error,
    protein::{annotate_protein, ProteinAnnotation, ProteinTriple},
};
use crate::{
    coords::{duplication_coordinates, map_position, CdsPosition, CoordinateRange},
    reference::ReferenceProvider,
    repeats::scan_for_repeat,
    sequences::revcomp,
    transcript::{Region, Strand, Transcript},
    variant::Variant,
};

pub mod dna;
pub mod protein;

mod error {
    /// Error type for annotation.
    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("reference sequence access failed")]
        Reference(#[from] crate::reference::Error),
        #[error(transparent)]
        Coords(#[from] crate::coords::Error),
        #[error("cannot express protein change for {label}: ref={protein} alt={mutated}")]
        UnresolvedProteinChange {
            label: String,
            protein: String,
            mutated: String,
        },
    }
}

/// A complete CSN annotation.
///
/// `range` holds the reported coordinate range; for repeat, duplication and
/// inversion tokens the range points at the repeated or copied region and
/// `insertion_site` retains the coordinates of the insertion point itself.
#[derive(Debug, Clone, PartialEq)]
pub struct CsnAnnotation {
    pub range: Option<CoordinateRange>,
    pub dna: DnaChange,
    pub protein: ProteinAnnotation,
    pub insertion_site: Option<CoordinateRange>,
}

impl std::fmt::Display for CsnAnnotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Some(range) = &self.range else {
            return Ok(());
        };
        // Variants lying entirely beyond the transcript ends cannot be
        // expressed against the coding sequence.
        if range.is_fully_outside_transcript() {
            return Ok(());
        }
        write!(f, "c.{}{}", range, self.dna)?;
        if !self.protein.token.is_empty() {
            write!(f, "_{}", self.protein.token)?;
        }
        Ok(())
    }
}

fn within_cds(pos: i64, tx: &Transcript) -> bool {
    let (lo, hi) = tx.cds_genomic_bounds();
    pos >= lo && pos <= hi
}

/// Annotate a variant against a transcript.
///
/// `prot` and `mutprot` are the translated reference and mutated protein
/// sequences; pass empty strings for non-coding transcripts, in which case
/// only the DNA-level token is produced. The variant is expected to be
/// normalized toward the transcript's 3' end already.
pub fn annotate(
    variant: &Variant,
    tx: &Transcript,
    provider: &dyn ReferenceProvider,
    prot: &str,
    mutprot: &str,
) -> Result<CsnAnnotation, Error> {
    let mut range = csn_coordinates(variant, tx)?;

    // Symbolic alleles (gVCF blocks, structural variant placeholders) get a
    // degenerate annotation at their coordinates.
    if variant.is_symbolic() {
        return Ok(CsnAnnotation {
            range,
            dna: DnaChange::Unknown,
            protein: ProteinAnnotation::none(),
            insertion_site: None,
        });
    }

    let location = tx.locate(variant);
    let (protein, skip_repeats) = if location.is_pure_exonic() {
        let cds_pos = range.and_then(|r| match r.start.pos {
            CdsPosition::Coding(n) => Some(n),
            _ => None,
        });
        (annotate_protein(variant, prot, mutprot, cds_pos)?, false)
    } else {
        // Repeats may still be described within a single intron or UTR, but
        // never across an exon boundary.
        let single_non_exonic = !location.crosses_boundary()
            && matches!(
                location.first,
                Region::FivePrimeUtr | Region::ThreePrimeUtr | Region::Intron(_)
            );
        (ProteinAnnotation::none(), !single_non_exonic)
    };

    let mut dna = match &range {
        Some(r) => make_dna_annotation(variant, tx, provider, r, skip_repeats)?,
        None => DnaChange::Unknown,
    };
    let mut insertion_site = None;

    // A repeat-unit insertion is re-anchored onto the full repeated run; if
    // the shifted run turns out to overlap the CDS with a non-triplet unit,
    // the repeat description is withdrawn. Only pure indels carry the repeat
    // token, so the scan always yields a run; the token is demoted to the
    // plain description otherwise.
    if let DnaChange::RepeatInsertion { .. } = &dna {
        match scan_for_repeat(variant, provider)? {
            None => {
                debug_assert!(false, "repeat token for a non-indel variant");
                dna = match &range {
                    Some(r) => make_dna_annotation(variant, tx, provider, r, true)?,
                    None => DnaChange::Unknown,
                };
            }
            Some(scan) => {
                let (shift, run_start, run_end) = match tx.strand {
                    Strand::Forward => {
                        let shift = &scan.left;
                        let start = shift.unit_pos;
                        let end = start + (shift.unit.len() * shift.ref_copies) as i64 - 1;
                        (shift, start, end)
                    }
                    Strand::Reverse => {
                        let shift = &scan.right;
                        let end = shift.unit_pos;
                        let start = end - ((shift.unit.len() * shift.ref_copies) as i64 - 1);
                        (shift, start, end)
                    }
                };
                let (first, second) = match tx.strand {
                    Strand::Forward => (run_start, run_end),
                    Strand::Reverse => (run_end, run_start),
                };
                let c1 = map_position(first, tx)?;
                let c2 = map_position(second, tx)?;
                let rejected = shift.unit.len() % 3 != 0
                    && (within_cds(run_start, tx) || within_cds(run_end, tx))
                    && (c1.offset == 0 || c2.offset == 0);
                if rejected {
                    dna = match &range {
                        Some(r) => make_dna_annotation(variant, tx, provider, r, true)?,
                        None => DnaChange::Unknown,
                    };
                } else {
                    insertion_site = range;
                    range = Some(CoordinateRange::new(c1, c2));
                    let unit = match tx.strand {
                        Strand::Forward => shift.unit.clone(),
                        Strand::Reverse => revcomp(&shift.unit),
                    };
                    dna = DnaChange::Repeat {
                        unit,
                        ref_copies: shift.ref_copies,
                        alt_copies: shift.alt_copies,
                    };
                }
            }
        }
    }

    // Duplications and inversions are reported at the copied span preceding
    // the insertion point, in transcript direction.
    match &dna {
        DnaChange::Duplication | DnaChange::Inversion => {
            insertion_site = range;
            range = Some(duplication_coordinates(variant, tx)?);
        }
        DnaChange::Repeat { .. } => {}
        _ => {
            insertion_site = None;
        }
    }

    Ok(CsnAnnotation {
        range,
        dna,
        protein,
        insertion_site,
    })
}
