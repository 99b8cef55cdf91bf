//! Mapping genomic positions to transcript-relative CSN coordinates.

use serde::{Deserialize, Serialize};

pub use crate::coords::error::Error;
use crate::{
    transcript::{Strand, Transcript},
    variant::Variant,
};

mod error {
    /// Error type for coordinate mapping.
    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("transcript {0} has no exons")]
        EmptyTranscript(String),
    }
}

/// Position along the coding sequence: a CDS-counted base, or a distance
/// before the CDS start (`-N`) or after the CDS end (`*N`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CdsPosition {
    Coding(i64),
    Upstream(i64),
    Downstream(i64),
}

impl std::fmt::Display for CdsPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CdsPosition::Coding(n) => write!(f, "{}", n),
            CdsPosition::Upstream(n) => write!(f, "-{}", n),
            CdsPosition::Downstream(n) => write!(f, "*{}", n),
        }
    }
}

/// A transcript-relative coordinate.
///
/// The intronic `offset` is non-zero exactly when the genomic position falls
/// strictly inside an intron; `overhang` counts bases beyond the annotated
/// transcript ends (already folded into the position value, retained so
/// callers can suppress annotations falling entirely outside the transcript).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsnCoordinate {
    pub pos: CdsPosition,
    pub offset: i64,
    pub overhang: i64,
}

impl std::fmt::Display for CsnCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pos)?;
        if self.offset > 0 {
            write!(f, "+{}", self.offset)?;
        } else if self.offset < 0 {
            write!(f, "{}", self.offset)?;
        }
        Ok(())
    }
}

/// A coordinate range; the end is omitted for single-base changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinateRange {
    pub start: CsnCoordinate,
    pub end: Option<CsnCoordinate>,
}

impl CoordinateRange {
    pub fn single(start: CsnCoordinate) -> Self {
        Self { start, end: None }
    }

    pub fn new(start: CsnCoordinate, end: CsnCoordinate) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    /// Whether both ends fall beyond the annotated transcript ends.
    pub fn is_fully_outside_transcript(&self) -> bool {
        self.start.overhang > 0 && self.end.map(|e| e.overhang > 0).unwrap_or(false)
    }
}

impl std::fmt::Display for CoordinateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.start)?;
        if let Some(end) = &self.end {
            if end.pos != self.start.pos || end.offset != self.start.offset {
                write!(f, "_{}", end)?;
            }
        }
        Ok(())
    }
}

/// Map a genomic position to its transcript-relative CSN coordinate.
///
/// Intronic positions are attributed to the nearer flanking exon boundary
/// (ties resolve toward the upstream, already-counted exon) and carry the
/// distance as a signed intronic offset.
pub fn map_position(pos: i64, tx: &Transcript) -> Result<CsnCoordinate, Error> {
    if tx.exons.is_empty() {
        return Err(Error::EmptyTranscript(tx.id.clone()));
    }
    Ok(map_unchecked(pos, tx))
}

/// Recursion worker for [`map_position`]; boundary anchors re-enter here and
/// always resolve on the exonic branch, bounding the depth by the exon count.
fn map_unchecked(pos: i64, tx: &Transcript) -> CsnCoordinate {
    if !tx.is_outside_cds(pos) {
        map_within_cds(pos, tx)
    } else {
        map_outside_cds(pos, tx)
    }
}

fn intron_anchor(
    pos: i64,
    tx: &Transcript,
    prev_boundary: i64,
    next_boundary: i64,
) -> CsnCoordinate {
    match tx.strand {
        Strand::Forward => {
            // Attribute to the nearer boundary; the midpoint itself counts
            // toward the upstream exon.
            if pos <= (next_boundary - prev_boundary) / 2 + prev_boundary {
                let anchor = map_unchecked(prev_boundary, tx);
                CsnCoordinate {
                    pos: anchor.pos,
                    offset: pos - prev_boundary,
                    overhang: anchor.overhang,
                }
            } else {
                let anchor = map_unchecked(next_boundary, tx);
                CsnCoordinate {
                    pos: anchor.pos,
                    offset: pos - next_boundary,
                    overhang: anchor.overhang,
                }
            }
        }
        Strand::Reverse => {
            if pos >= (prev_boundary - next_boundary + 1) / 2 + next_boundary {
                let anchor = map_unchecked(prev_boundary, tx);
                CsnCoordinate {
                    pos: anchor.pos,
                    offset: prev_boundary - pos,
                    overhang: anchor.overhang,
                }
            } else {
                let anchor = map_unchecked(next_boundary, tx);
                CsnCoordinate {
                    pos: anchor.pos,
                    offset: next_boundary - pos,
                    overhang: anchor.overhang,
                }
            }
        }
    }
}

fn map_within_cds(pos: i64, tx: &Transcript) -> CsnCoordinate {
    let mut sum = -tx.coding_start + 1;
    let mut prev_boundary: Option<i64> = None;
    for exon in &tx.exons {
        if let Some(prev) = prev_boundary {
            match tx.strand {
                Strand::Forward => {
                    if prev < pos && pos < exon.start + 1 {
                        return intron_anchor(pos, tx, prev, exon.start + 1);
                    }
                }
                Strand::Reverse => {
                    if exon.end < pos && pos < prev {
                        return intron_anchor(pos, tx, prev, exon.end);
                    }
                }
            }
        }
        if exon.contains(pos) {
            let coord = match tx.strand {
                Strand::Forward => sum + pos - exon.start,
                Strand::Reverse => sum + exon.end - pos + 1,
            };
            return CsnCoordinate {
                pos: CdsPosition::Coding(coord),
                offset: 0,
                overhang: 0,
            };
        }
        sum += exon.length();
        prev_boundary = Some(match tx.strand {
            Strand::Forward => exon.end,
            Strand::Reverse => exon.start + 1,
        });
    }
    // A position inside the CDS bounds must be covered by an exon or intron.
    log::error!(
        "position {} inside CDS of {} not covered by the exon model",
        pos,
        tx.id
    );
    CsnCoordinate {
        pos: CdsPosition::Coding(sum),
        offset: 0,
        overhang: 0,
    }
}

fn map_outside_cds(pos: i64, tx: &Transcript) -> CsnCoordinate {
    let mut sumpos: i64 = 0;
    let mut overhang: i64 = 0;
    let last = tx.exons.len() - 1;
    let mut prev_boundary: Option<i64> = None;

    for (i, exon) in tx.exons.iter().enumerate() {
        if let Some(prev) = prev_boundary {
            match tx.strand {
                Strand::Forward => {
                    if prev < pos && pos < exon.start + 1 {
                        return intron_anchor(pos, tx, prev, exon.start + 1);
                    }
                }
                Strand::Reverse => {
                    if exon.end < pos && pos < prev {
                        return intron_anchor(pos, tx, prev, exon.end);
                    }
                }
            }
        }

        let cs = tx.coding_start_genomic;
        let ce = tx.coding_end_genomic;
        match tx.strand {
            Strand::Forward => {
                if pos > ce {
                    if ce < exon.start + 1 && exon.end < pos {
                        sumpos += exon.length();
                        if i == last {
                            overhang += pos - exon.end;
                        }
                    } else if exon.contains(ce) && exon.end < pos {
                        sumpos += exon.end - ce + 1;
                        if i == last {
                            overhang += pos - exon.end;
                        }
                    } else if exon.contains(ce) && exon.contains(pos) {
                        sumpos += pos - ce;
                    } else if ce < exon.start + 1 && exon.contains(pos) {
                        sumpos += pos - exon.start - 1;
                    }
                }
                if pos < cs {
                    if pos < exon.start + 1 && exon.end < cs {
                        sumpos += exon.length();
                        if i == 0 {
                            overhang += exon.start + 1 - pos;
                        }
                    } else if pos < exon.start + 1 && exon.contains(cs) {
                        sumpos += cs - exon.start;
                        if i == 0 {
                            overhang += exon.start + 1 - pos;
                        }
                    } else if exon.contains(pos) && exon.contains(cs) {
                        sumpos += cs - pos;
                    } else if exon.contains(pos) && exon.end < cs {
                        sumpos += exon.end - pos;
                    }
                }
            }
            Strand::Reverse => {
                if pos < ce {
                    if pos < exon.start + 1 && exon.end < ce {
                        sumpos += exon.length();
                        if i == last {
                            overhang += exon.start + 1 - pos;
                        }
                    } else if pos < exon.start + 1 && exon.contains(ce) {
                        sumpos += ce - exon.start;
                        if i == last {
                            overhang += exon.start + 1 - pos;
                        }
                    } else if exon.contains(pos) && exon.contains(ce) {
                        sumpos += ce - pos;
                    } else if exon.contains(pos) && exon.end < ce {
                        sumpos += exon.end - pos;
                    }
                }
                if cs < pos {
                    if cs < exon.start + 1 && exon.end < pos {
                        sumpos += exon.length();
                        if i == 0 {
                            overhang += pos - exon.end;
                        }
                    } else if exon.contains(cs) && exon.end < pos {
                        sumpos += exon.end - cs + 1;
                        if i == 0 {
                            overhang += pos - exon.end;
                        }
                    } else if exon.contains(cs) && exon.contains(pos) {
                        sumpos += pos - cs;
                    } else if cs < exon.start + 1 && exon.contains(pos) {
                        sumpos += pos - exon.start - 1;
                    }
                }
            }
        }

        prev_boundary = Some(match tx.strand {
            Strand::Forward => exon.end,
            Strand::Reverse => exon.start + 1,
        });
    }

    let beyond_cds_end = match tx.strand {
        Strand::Forward => pos > tx.coding_end_genomic,
        Strand::Reverse => pos < tx.coding_end_genomic,
    };
    let pos = if beyond_cds_end {
        CdsPosition::Downstream(sumpos + overhang)
    } else {
        CdsPosition::Upstream(sumpos + overhang)
    };
    CsnCoordinate {
        pos,
        offset: 0,
        overhang,
    }
}

/// Inverse of [`map_position`] for exonic, zero-offset coding coordinates.
pub fn coding_to_genomic(coord: i64, tx: &Transcript) -> Option<i64> {
    if coord < 1 {
        return None;
    }
    let mut sum = -tx.coding_start + 1;
    for exon in &tx.exons {
        let len = exon.length();
        if coord > sum && coord <= sum + len {
            return Some(match tx.strand {
                Strand::Forward => exon.start + (coord - sum),
                Strand::Reverse => exon.end - (coord - sum) + 1,
            });
        }
        sum += len;
    }
    None
}

/// Coordinates of the duplicated span preceding (in transcript direction) an
/// insertion reported as a duplication or inversion.
pub fn duplication_coordinates(
    variant: &Variant,
    tx: &Transcript,
) -> Result<CoordinateRange, Error> {
    let alt_len = variant.alternative.len() as i64;
    match tx.strand {
        Strand::Forward => {
            let start = map_position(variant.pos - alt_len, tx)?;
            if alt_len == 1 {
                Ok(CoordinateRange::single(start))
            } else {
                let end = map_position(variant.pos - 1, tx)?;
                Ok(CoordinateRange::new(start, end))
            }
        }
        Strand::Reverse => {
            let start = map_position(variant.pos + alt_len - 1, tx)?;
            if alt_len == 1 {
                Ok(CoordinateRange::single(start))
            } else {
                let end = map_position(variant.pos, tx)?;
                Ok(CoordinateRange::new(start, end))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::{coding_to_genomic, map_position, CdsPosition};
    use crate::transcript::fixtures::{forward_two_exon, reverse_two_exon};

    #[rstest]
    #[case(100, "1")]
    #[case(150, "51")]
    #[case(201, "52")]
    #[case(300, "151")]
    fn forward_coding_positions(#[case] pos: i64, #[case] expected: &str) -> Result<(), anyhow::Error> {
        let tx = forward_two_exon();
        assert_eq!(map_position(pos, &tx)?.to_string(), expected);
        Ok(())
    }

    #[rstest]
    #[case(160, "51+10")]
    #[case(175, "51+25")] // midpoint resolves to the upstream exon
    #[case(176, "52-25")]
    #[case(190, "52-11")]
    fn forward_intronic_offsets(#[case] pos: i64, #[case] expected: &str) -> Result<(), anyhow::Error> {
        let tx = forward_two_exon();
        assert_eq!(map_position(pos, &tx)?.to_string(), expected);
        Ok(())
    }

    #[rstest]
    #[case(99, "-1")]
    #[case(51, "-49")]
    #[case(301, "*1")]
    #[case(350, "*50")]
    fn forward_utr_positions(#[case] pos: i64, #[case] expected: &str) -> Result<(), anyhow::Error> {
        let tx = forward_two_exon();
        assert_eq!(map_position(pos, &tx)?.to_string(), expected);
        Ok(())
    }

    #[test]
    fn forward_overhang_past_transcript_ends() -> Result<(), anyhow::Error> {
        let tx = forward_two_exon();
        let c = map_position(360, &tx)?;
        assert_eq!(c.pos, CdsPosition::Downstream(61));
        assert_eq!(c.overhang, 10);
        let c = map_position(40, &tx)?;
        assert_eq!(c.pos, CdsPosition::Upstream(61));
        assert_eq!(c.overhang, 11);
        Ok(())
    }

    #[rstest]
    #[case(300, "1")]
    #[case(201, "100")]
    #[case(150, "101")]
    #[case(100, "151")]
    fn reverse_coding_positions(#[case] pos: i64, #[case] expected: &str) -> Result<(), anyhow::Error> {
        let tx = reverse_two_exon();
        assert_eq!(map_position(pos, &tx)?.to_string(), expected);
        Ok(())
    }

    #[rstest]
    #[case(180, "100+21")]
    #[case(170, "101-20")]
    fn reverse_intronic_offsets(#[case] pos: i64, #[case] expected: &str) -> Result<(), anyhow::Error> {
        let tx = reverse_two_exon();
        assert_eq!(map_position(pos, &tx)?.to_string(), expected);
        Ok(())
    }

    #[rstest]
    #[case(301, "-1")]
    #[case(99, "*1")]
    #[case(51, "*49")]
    fn reverse_utr_positions(#[case] pos: i64, #[case] expected: &str) -> Result<(), anyhow::Error> {
        let tx = reverse_two_exon();
        assert_eq!(map_position(pos, &tx)?.to_string(), expected);
        Ok(())
    }

    #[test]
    fn monotonic_within_exon() -> Result<(), anyhow::Error> {
        let tx = forward_two_exon();
        let mut prev = 0;
        for pos in 100..=150 {
            match map_position(pos, &tx)?.pos {
                CdsPosition::Coding(n) => {
                    assert!(n > prev);
                    prev = n;
                }
                other => panic!("expected coding position, got {:?}", other),
            }
        }
        Ok(())
    }

    #[test]
    fn exonic_round_trip() -> Result<(), anyhow::Error> {
        for tx in [forward_two_exon(), reverse_two_exon()] {
            for pos in [100, 120, 150, 250, 300, 201] {
                let c = map_position(pos, &tx)?;
                if let CdsPosition::Coding(n) = c.pos {
                    assert_eq!(c.offset, 0);
                    assert_eq!(coding_to_genomic(n, &tx), Some(pos), "tx={}", tx.id);
                }
            }
        }
        Ok(())
    }

    #[test]
    fn empty_transcript_is_an_error() {
        let mut tx = forward_two_exon();
        tx.exons.clear();
        assert!(map_position(100, &tx).is_err());
    }
}
