//! Detection of tandem repeat context around insertions and deletions.

use serde::{Deserialize, Serialize};

use crate::{
    reference::{Error, ReferenceProvider},
    variant::Variant,
};

/// Decompose a sequence into its smallest tandemly repeated unit.
///
/// Returns `(unit, copies)`; a sequence that is not an exact tiling of a
/// shorter unit is its own unit with a single copy.
pub fn find_repeat_unit(seq: &str) -> (String, usize) {
    if seq.is_empty() {
        return (String::new(), 0);
    }
    if seq.len() == 1 {
        return (seq.to_string(), 1);
    }
    let len = seq.len();
    for unit_len in 1..=(len / 2) {
        if len % unit_len != 0 {
            continue;
        }
        let unit = &seq[..unit_len];
        if seq
            .as_bytes()
            .chunks(unit_len)
            .all(|chunk| chunk == unit.as_bytes())
        {
            return (unit.to_string(), len / unit_len);
        }
    }
    (seq.to_string(), 1)
}

/// The variant re-expressed against one end of the repeated region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatShift {
    /// Shifted genomic position of the indel itself.
    pub variant_pos: i64,
    /// Genomic position of the first base of the repeat region as spelled
    /// with this shift's rotation of the unit.
    pub unit_pos: i64,
    /// Copies of the unit present in the reference allele.
    pub ref_copies: usize,
    /// Copies of the unit present in the alternate allele.
    pub alt_copies: usize,
    /// Repeat unit, rotated to align with the shifted position.
    pub unit: String,
    pub trimmed_ref: String,
    pub trimmed_alt: String,
}

/// Full extent of the repeated region together with both alleles spelled out
/// over it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatSpan {
    pub start: i64,
    pub end: i64,
    pub reference: String,
    pub alternative: String,
}

/// Result of scanning the reference around an indel for tandem repeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatScan {
    pub left: RepeatShift,
    pub right: RepeatShift,
    pub span: RepeatSpan,
}

/// Scan the reference sequence flanking an insertion or deletion for copies
/// of the indel's repeat unit.
///
/// Returns `None` for variants that are not pure indels. The scan walks
/// outward in both directions, fetching the reference in growing chunks, and
/// additionally checks whether rotating the unit extends the repeated region
/// by a partial copy on either flank.
pub fn scan_for_repeat(
    variant: &Variant,
    provider: &dyn ReferenceProvider,
) -> Result<Option<RepeatScan>, Error> {
    if !(variant.is_insertion() || variant.is_deletion()) {
        return Ok(None);
    }
    let (rep0, pos_left, pos_right) = if variant.is_insertion() {
        (variant.alternative.as_str(), variant.pos - 1, variant.pos)
    } else {
        (
            variant.reference.as_str(),
            variant.pos - 1,
            variant.pos + variant.reference.len() as i64,
        )
    };
    let (rep, nrep) = find_repeat_unit(rep0);
    let lrep = rep.len() as i64;
    if lrep == 0 {
        return Ok(None);
    }

    // Leftward scan; `next_left` is the start of the next candidate window.
    let mut lseq = String::new();
    let mut n_left: usize = 0;
    let mut next_left = pos_left - lrep + 1;
    let mut left_ctx = String::new();
    // Genomic position of the first base held in `left_ctx`.
    let mut left_ctx_start = pos_left + 1;
    'left: while left_ctx_start > 1 {
        let chunk_start = (left_ctx_start - 40 * lrep).max(1);
        let chunk = provider.fetch(&variant.chrom, chunk_start, left_ctx_start - 1)?;
        left_ctx.insert_str(0, &chunk);
        left_ctx_start = chunk_start;
        while next_left >= left_ctx_start {
            let i = (next_left - left_ctx_start) as usize;
            let window = &left_ctx[i..i + rep.len()];
            if window == rep {
                next_left -= lrep;
                n_left += 1;
            } else {
                lseq = window.to_string();
                break 'left;
            }
        }
        // A window overlapping the contig start cannot be checked; the scan
        // stops with an empty flank.
        if next_left < 1 {
            break;
        }
    }

    // Rightward scan, mirrored. The fetch clamps at the contig end, so a
    // short chunk means the sequence is exhausted.
    let mut rseq = String::new();
    let mut n_right: usize = 0;
    let mut next_right = pos_right;
    let mut right_ctx = String::new();
    let right_ctx_start = pos_right;
    let mut right_ctx_end = pos_right - 1;
    'right: loop {
        let want_end = right_ctx_end + 40 * lrep;
        let chunk = provider.fetch(&variant.chrom, right_ctx_end + 1, want_end)?;
        let truncated = (chunk.len() as i64) < want_end - right_ctx_end;
        right_ctx_end += chunk.len() as i64;
        right_ctx.push_str(&chunk);
        while next_right + lrep - 1 <= right_ctx_end {
            let i = (next_right - right_ctx_start) as usize;
            let window = &right_ctx[i..i + rep.len()];
            if window == rep {
                next_right += lrep;
                n_right += 1;
            } else {
                rseq = window.to_string();
                break 'right;
            }
        }
        if truncated {
            break;
        }
    }

    // Rotating the unit may pick up a partial copy on either flank; when the
    // two partial copies jointly cover a full unit, that is one more copy.
    let mut left_pad = 0usize;
    let mut right_pad = 0usize;
    if rep.len() > 1 && lseq.len() == rep.len() && rseq.len() == rep.len() {
        for npad in 1..rep.len() {
            if rep[rep.len() - npad..] == lseq[lseq.len() - npad..] {
                left_pad = npad;
            }
            if rep[..npad] == rseq[..npad] {
                right_pad = npad;
            }
        }
    }
    let extra_rep = usize::from(left_pad + right_pad >= rep.len());

    let (nrep_ref, nrep_alt) = if variant.is_insertion() {
        (0, nrep)
    } else {
        (nrep, 0)
    };
    let ref_copies = n_left + n_right + extra_rep + nrep_ref;
    let alt_copies = n_left + n_right + extra_rep + nrep_alt;

    let left_unit = format!("{}{}", &rep[rep.len() - left_pad..], &rep[..rep.len() - left_pad]);
    let left = RepeatShift {
        variant_pos: next_left + lrep - left_pad as i64,
        unit_pos: next_left + lrep - left_pad as i64,
        ref_copies,
        alt_copies,
        unit: left_unit.clone(),
        trimmed_ref: left_unit.repeat(nrep_ref),
        trimmed_alt: left_unit.repeat(nrep_alt),
    };

    let right_unit = format!("{}{}", &rep[right_pad..], &rep[..right_pad]);
    let right = RepeatShift {
        variant_pos: next_right - lrep * nrep as i64 + right_pad as i64,
        unit_pos: next_left + lrep + right_pad as i64,
        ref_copies,
        alt_copies,
        unit: right_unit.clone(),
        trimmed_ref: right_unit.repeat(nrep_ref),
        trimmed_alt: right_unit.repeat(nrep_alt),
    };

    let left_slice_from = (next_left - left_ctx_start + lrep) as usize - left_pad;
    let right_slice_to = (next_right - right_ctx_start) as usize + right_pad;
    let flank_left = &left_ctx[left_slice_from.min(left_ctx.len())..];
    let flank_right = &right_ctx[..right_slice_to.min(right_ctx.len())];
    let span = RepeatSpan {
        start: left.variant_pos,
        end: next_right + lrep - 1 + right_pad as i64,
        reference: format!("{}{}{}", flank_left, variant.reference, flank_right),
        alternative: format!("{}{}{}", flank_left, variant.alternative, flank_right),
    };

    Ok(Some(RepeatScan { left, right, span }))
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::{find_repeat_unit, scan_for_repeat};
    use crate::{reference::InMemoryProvider, variant::Variant};

    #[rstest]
    #[case("", "", 0)]
    #[case("A", "A", 1)]
    #[case("CAG", "CAG", 1)]
    #[case("CAGCAG", "CAG", 2)]
    #[case("ATATATAT", "AT", 4)]
    #[case("AAAA", "A", 4)]
    #[case("CAGCAA", "CAGCAA", 1)]
    fn repeat_unit_decomposition(#[case] seq: &str, #[case] unit: &str, #[case] n: usize) {
        assert_eq!(find_repeat_unit(seq), (unit.to_string(), n));
    }

    #[test]
    fn repeat_unit_is_minimal() {
        // ACACAC tiles by AC (3 copies), never by ACAC.
        assert_eq!(find_repeat_unit("ACACAC"), ("AC".to_string(), 3));
    }

    #[test]
    fn substitution_is_not_scanned() -> Result<(), anyhow::Error> {
        let provider = InMemoryProvider::new().with_contig("1", "ACGTACGTACGT");
        let v = Variant::new("1", 5, "A", "G");
        assert!(scan_for_repeat(&v, &provider)?.is_none());
        Ok(())
    }

    #[test]
    fn insertion_in_triplet_run() -> Result<(), anyhow::Error> {
        //           123456789012345678
        let seq = "GGGGGCAGCAGCAGGGGGG";
        let provider = InMemoryProvider::new().with_contig("1", seq);
        // CAG inserted after the run of three CAG copies (pos 15). The G at
        // position 5 extends the run one base leftward under the rotated
        // unit, so the region reads as GCA x 3 from position 5.
        let v = Variant::new("1", 14, "G", "GCAG");
        let scan = scan_for_repeat(&v, &provider)?.expect("indel");
        assert_eq!(scan.left.unit, "GCA");
        assert_eq!(scan.left.ref_copies, 3);
        assert_eq!(scan.left.alt_copies, 4);
        assert_eq!(scan.left.unit_pos, 5);
        assert_eq!(scan.span.start, 5);
        Ok(())
    }

    #[test]
    fn deletion_of_one_unit() -> Result<(), anyhow::Error> {
        let seq = "GGGGGCAGCAGCAGGGGGG";
        let provider = InMemoryProvider::new().with_contig("1", seq);
        // One CAG of the three deleted; the rotation again pulls in the G
        // at position 5.
        let v = Variant::new("1", 5, "GCAG", "G");
        let scan = scan_for_repeat(&v, &provider)?.expect("indel");
        assert_eq!(scan.left.unit, "GCA");
        assert_eq!(scan.left.ref_copies, 3);
        assert_eq!(scan.left.alt_copies, 2);
        assert_eq!(scan.left.unit_pos, 5);
        assert_eq!(scan.span.reference, "GCAGCAGCAG");
        assert_eq!(scan.span.alternative, "GCAGCAG");
        Ok(())
    }

    #[test]
    fn rotation_extends_both_flanks() -> Result<(), anyhow::Error> {
        // CTATAT[AT]ATAC: as an AT deletion only two full copies flank the
        // gap on the left and one on the right, but the leftover T and A
        // jointly cover a rotated TA copy, so the region is C[TA]x(5;4)C.
        //           123456789012
        let seq = "CTATATATATAC";
        let provider = InMemoryProvider::new().with_contig("1", seq);
        let v = Variant::new("1", 6, "TAT", "T");
        let scan = scan_for_repeat(&v, &provider)?.expect("indel");
        assert_eq!(scan.left.ref_copies, 5);
        assert_eq!(scan.left.alt_copies, 4);
        assert_eq!(scan.left.unit, "TA");
        assert_eq!(scan.left.unit_pos, 2);
        assert_eq!(scan.right.unit, "TA");
        Ok(())
    }

    #[test]
    fn scan_stops_cleanly_at_contig_ends() -> Result<(), anyhow::Error> {
        // The run reaches both contig ends; flank windows cannot be read so
        // no rotation credit applies.
        let provider = InMemoryProvider::new().with_contig("1", "ATATATAT");
        let v = Variant::new("1", 2, "TAT", "T");
        let scan = scan_for_repeat(&v, &provider)?.expect("indel");
        assert_eq!(scan.left.unit, "AT");
        assert_eq!(scan.left.ref_copies, 4);
        assert_eq!(scan.left.alt_copies, 3);
        Ok(())
    }
}
