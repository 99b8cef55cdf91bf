//! Shifting indels to their transcript-dependent canonical position.

pub use crate::normalizer::error::Error;
use crate::{
    reference::ReferenceProvider,
    sequences::{trim_common_prefixes, trim_common_suffixes},
    transcript::Strand,
    variant::Variant,
};

mod error {
    /// Error type for variant normalization.
    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("reference sequence access failed")]
        Reference(#[from] crate::reference::Error),
    }
}

/// Shift a variant as far as possible in transcript direction: 3'-most on the
/// forward strand, 5'-most (genomically leftmost) on the reverse strand.
///
/// The alignment fetches a flanking window sized to the length change and
/// doubles it whenever the shift comes close to the window edge, so arbitrarily
/// long repeat runs are crossed in a bounded number of fetches.
pub fn normalize(
    variant: &Variant,
    provider: &dyn ReferenceProvider,
    strand: Strand,
) -> Result<Variant, Error> {
    if variant.reference == variant.alternative {
        return Ok(variant.clone());
    }
    let shifted = match strand {
        Strand::Forward => shift_right(variant, provider)?,
        Strand::Reverse => shift_left(variant, provider)?,
    };
    Ok(match &variant.id {
        Some(id) => shifted.with_id(id),
        None => shifted,
    })
}

fn pad_len(variant: &Variant) -> i64 {
    let delta = (variant.reference.len() as i64 - variant.alternative.len() as i64).abs();
    (1 + 5 * delta).max(100)
}

fn shift_right(variant: &Variant, provider: &dyn ReferenceProvider) -> Result<Variant, Error> {
    let max_rep = (variant.reference.len() as i64 - variant.alternative.len() as i64).abs();
    let ref_len = variant.reference.len() as i64;
    let mut pad = pad_len(variant);

    let (mut left, mut s1, mut s2);
    loop {
        let seq1 = provider.fetch(&variant.chrom, variant.pos, variant.pos + ref_len - 1 + pad)?;
        let seq2 = format!(
            "{}{}",
            variant.alternative,
            provider.fetch(
                &variant.chrom,
                variant.pos + ref_len,
                variant.pos + ref_len + pad - 1
            )?
        );
        let (l, a, b) = trim_common_prefixes(&seq1, &seq2);
        let (_, x, y) = trim_common_suffixes(&a, &b);
        left = l as i64;
        s1 = x;
        s2 = y;
        // Shifted close to the window edge: there may be more run to cross.
        if left < pad - (max_rep - 1) {
            break;
        }
        pad *= 2;
    }

    if (s1.is_empty() || s2.is_empty()) && variant.pos + left - 1 >= 1 {
        left -= 1;
        let base = provider.fetch(&variant.chrom, variant.pos + left, variant.pos + left)?;
        s1 = format!("{}{}", base, s1);
        s2 = format!("{}{}", base, s2);
    }
    Ok(Variant::new(&variant.chrom, variant.pos + left, &s1, &s2))
}

fn shift_left(variant: &Variant, provider: &dyn ReferenceProvider) -> Result<Variant, Error> {
    let max_rep = (variant.reference.len() as i64 - variant.alternative.len() as i64).abs();
    let ref_len = variant.reference.len() as i64;
    let mut pad = pad_len(variant);

    let (mut left, mut n, mut s1, mut s2);
    loop {
        let start = variant.pos - pad;
        let seq1 = provider.fetch(&variant.chrom, start, variant.pos + ref_len - 1)?;
        let s = provider.fetch(&variant.chrom, start, variant.pos - 1)?;
        n = s.len() as i64;
        let seq2 = format!("{}{}", s, variant.alternative);
        let (_, a, b) = trim_common_suffixes(&seq1, &seq2);
        let (l, x, y) = trim_common_prefixes(&a, &b);
        left = l as i64;
        s1 = x;
        s2 = y;
        // Shift reaching the window start means more run may lie upstream,
        // unless the window already hit the contig start.
        if left > max_rep - 1 || start < 1 {
            break;
        }
        pad *= 2;
    }

    // Re-anchor empty alleles on the preceding base, unless the shift has
    // reached the contig start and no such base exists.
    if (s1.is_empty() || s2.is_empty()) && variant.pos + left - 1 - n >= 1 {
        left -= 1;
        let anchor = variant.pos + left - n;
        let base = provider.fetch(&variant.chrom, anchor, anchor)?;
        s1 = format!("{}{}", base, s1);
        s2 = format!("{}{}", base, s2);
    }
    Ok(Variant::new(
        &variant.chrom,
        variant.pos + left - n,
        &s1,
        &s2,
    ))
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::normalize;
    use crate::{reference::InMemoryProvider, transcript::Strand, variant::Variant};

    fn provider() -> InMemoryProvider {
        //                       1234567890123
        InMemoryProvider::new().with_contig("1", "GGCAGCAGCAGTT")
    }

    #[test]
    fn substitution_is_unchanged() -> Result<(), anyhow::Error> {
        let v = Variant::new("1", 4, "A", "G");
        assert_eq!(normalize(&v, &provider(), Strand::Forward)?, v);
        assert_eq!(normalize(&v, &provider(), Strand::Reverse)?, v);
        Ok(())
    }

    #[test]
    fn identity_alleles_are_returned_as_is() -> Result<(), anyhow::Error> {
        let v = Variant::new("1", 4, "", "");
        assert_eq!(normalize(&v, &provider(), Strand::Forward)?, v);
        Ok(())
    }

    #[test]
    fn insertion_shifts_right_on_forward_strand() -> Result<(), anyhow::Error> {
        // CAG inserted before the first copy of the run.
        let v = Variant::new("1", 2, "G", "GCAG");
        let shifted = normalize(&v, &provider(), Strand::Forward)?;
        assert_eq!(shifted.pos, 12);
        assert_eq!(shifted.reference, "");
        assert_eq!(shifted.alternative, "CAG");
        Ok(())
    }

    #[test]
    fn insertion_shifts_left_on_reverse_strand() -> Result<(), anyhow::Error> {
        // CAG inserted after the last copy of the run; the leftmost
        // equivalent inserts GCA before the G at position 2.
        let v = Variant::new("1", 11, "G", "GCAG");
        let shifted = normalize(&v, &provider(), Strand::Reverse)?;
        assert_eq!(shifted.pos, 2);
        assert_eq!(shifted.reference, "");
        assert_eq!(shifted.alternative, "GCA");
        Ok(())
    }

    #[test]
    fn deletion_shifts_within_run() -> Result<(), anyhow::Error> {
        let v = Variant::new("1", 2, "GCAG", "G");
        let shifted = normalize(&v, &provider(), Strand::Forward)?;
        // Deletes the last copy of the run after right-shifting.
        assert_eq!(shifted.pos, 9);
        assert_eq!(shifted.reference, "CAG");
        assert_eq!(shifted.alternative, "");
        let back = normalize(&shifted, &provider(), Strand::Forward)?;
        assert_eq!(back, shifted);
        Ok(())
    }

    #[test]
    fn left_shift_stops_at_contig_start() -> Result<(), anyhow::Error> {
        // The whole contig is one run; the shift lands at position 1.
        let p = InMemoryProvider::new().with_contig("1", "ATATATAT");
        let v = Variant::new("1", 6, "T", "TAT");
        let shifted = normalize(&v, &p, Strand::Reverse)?;
        assert_eq!(shifted.pos, 1);
        assert_eq!(shifted.alternative, "AT");
        Ok(())
    }
}
