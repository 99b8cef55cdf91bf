//! Representation of a single variant call.

use serde::{Deserialize, Serialize};

use crate::sequences::{trim_common_prefixes, trim_common_suffixes};

/// A variant call against the reference genome.
///
/// Alleles are stored fully trimmed: the shared prefix and suffix of the VCF
/// ref/alt strings are removed on construction and `pos` is shifted
/// accordingly, so a pure insertion has an empty `reference` and a pure
/// deletion an empty `alternative`. Variants are immutable; normalization
/// produces a new `Variant`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub chrom: String,
    /// 1-based position of the first changed base (for insertions, the base
    /// after the insertion point).
    pub pos: i64,
    pub reference: String,
    pub alternative: String,
    /// Optional caller-supplied identifier, used in diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Base preceding the trimmed alleles, kept for VCF-style round-trips.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    padded_base: String,
}

impl Variant {
    /// Construct from VCF-style (possibly padded) alleles.
    pub fn new(chrom: &str, pos: i64, vcf_ref: &str, vcf_alt: &str) -> Self {
        let (shift, a, b) = trim_common_prefixes(vcf_ref, vcf_alt);
        let pos = pos + shift as i64;
        let (_, reference, alternative) = trim_common_suffixes(&a, &b);

        let padded_base = if (reference.is_empty() || alternative.is_empty()) && shift > 0 {
            vcf_ref[shift - 1..shift].to_string()
        } else {
            String::new()
        };

        Self {
            chrom: chrom.to_string(),
            pos,
            reference,
            alternative,
            id: None,
            padded_base,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Identifier for diagnostics, falling back to `chrom:pos`.
    pub fn label(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("{}:{}", self.chrom, self.pos))
    }

    pub fn is_substitution(&self) -> bool {
        self.reference.len() == 1 && self.alternative.len() == 1
    }

    pub fn is_insertion(&self) -> bool {
        self.reference.is_empty() && !self.alternative.is_empty()
    }

    pub fn is_deletion(&self) -> bool {
        !self.reference.is_empty() && self.alternative.is_empty()
    }

    /// Deletion-insertion of unequal-content spans.
    pub fn is_complex(&self) -> bool {
        !self.reference.is_empty() && !self.alternative.is_empty() && !self.is_substitution()
    }

    /// Whether the length delta is a multiple of 3.
    pub fn is_in_frame(&self) -> bool {
        (self.alternative.len() as i64 - self.reference.len() as i64).rem_euclid(3) == 0
    }

    /// Bracketed placeholder allele, e.g. `<NON_REF>` or a structural variant
    /// token. Such alleles short-circuit annotation to a degenerate result.
    pub fn is_symbolic(&self) -> bool {
        self.alternative.starts_with('<')
            && self.alternative.ends_with('>')
            && !self.alternative.contains(',')
    }

    /// Genomic span `(x, y)` covered by the variant; for insertions this is
    /// the two bases flanking the insertion point.
    pub fn span(&self) -> (i64, i64) {
        if self.is_insertion() {
            (self.pos - 1, self.pos)
        } else {
            (self.pos, self.pos + self.reference.len() as i64 - 1)
        }
    }

    /// Whether the variant overlaps the 1-based inclusive region
    /// `[start, end]`.
    pub fn overlaps(&self, start: i64, end: i64) -> bool {
        if self.is_insertion() {
            return self.pos - 1 >= start && self.pos <= end;
        }
        let own_start = self.pos;
        let own_end = self.pos + self.reference.len() as i64 - 1;
        if own_start == start {
            true
        } else if own_start > start {
            end >= own_start
        } else {
            own_end >= start
        }
    }

    /// VCF-style `(pos, ref, alt)` with the padding base restored.
    pub fn vcf_repr(&self) -> (i64, String, String) {
        if self.is_insertion() {
            (
                self.pos - 1,
                format!("{}{}", self.padded_base, self.reference),
                format!("{}{}", self.padded_base, self.alternative),
            )
        } else {
            (
                self.pos,
                format!("{}{}", self.padded_base, self.reference),
                format!("{}{}", self.padded_base, self.alternative),
            )
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::Variant;

    #[test]
    fn trims_padded_deletion() {
        let v = Variant::new("1", 100, "ATA", "A");
        assert_eq!(v.pos, 101);
        assert_eq!(v.reference, "TA");
        assert_eq!(v.alternative, "");
        assert!(v.is_deletion());
        // The padding base is restored but the position stays at the first
        // deleted base.
        assert_eq!(v.vcf_repr(), (101, "ATA".to_string(), "A".to_string()));
    }

    #[test]
    fn trims_padded_insertion() {
        let v = Variant::new("1", 100, "A", "ACAG");
        assert_eq!(v.pos, 101);
        assert_eq!(v.reference, "");
        assert_eq!(v.alternative, "CAG");
        assert!(v.is_insertion());
        assert!(v.is_in_frame());
        assert_eq!(v.vcf_repr(), (100, "A".to_string(), "ACAG".to_string()));
    }

    #[test]
    fn facets() {
        assert!(Variant::new("1", 5, "A", "G").is_substitution());
        assert!(Variant::new("1", 5, "AT", "GC").is_complex());
        // Length-preserving, so the frame is kept.
        assert!(Variant::new("1", 5, "AT", "GC").is_in_frame());
        assert!(!Variant::new("1", 5, "AT", "G").is_in_frame());
        assert!(Variant::new("1", 5, "A", "<DEL>").is_symbolic());
    }

    #[test]
    fn overlap_insertion_requires_both_flanks() {
        let v = Variant::new("1", 100, "A", "AC");
        // Trimmed to an insertion at pos 101; the region must cover both
        // flanking bases 100 and 101 to contain the insertion point.
        assert!(v.overlaps(100, 101));
        assert!(v.overlaps(90, 110));
        assert!(!v.overlaps(100, 100));
        assert!(!v.overlaps(101, 102));
        assert!(!v.overlaps(98, 99));
    }

    #[test]
    fn overlap_deletion() {
        let v = Variant::new("1", 100, "ATTT", "A");
        // Deletion of TTT at 101..=103.
        assert!(v.overlaps(103, 110));
        assert!(v.overlaps(90, 101));
        assert!(!v.overlaps(104, 110));
        assert!(!v.overlaps(90, 100));
    }
}
