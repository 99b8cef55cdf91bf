//! Transcript and exon models with splice-geometry predicates.

use serde::{Deserialize, Serialize};

use crate::variant::Variant;

/// Strand of a transcript relative to the reference genome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strand {
    Forward,
    Reverse,
}

/// An exon of a transcript.
///
/// `start` stores the genomic position of the base *before* the first exonic
/// base; `end` is the last exonic base. This convention is applied
/// consistently throughout the crate: the exonic bases of an exon are
/// `start + 1 ..= end` regardless of strand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exon {
    /// 1-based index within the transcript, in transcript order.
    pub index: u32,
    pub start: i64,
    pub end: i64,
}

impl Exon {
    pub fn length(&self) -> i64 {
        self.end - self.start
    }

    pub fn contains(&self, pos: i64) -> bool {
        self.start + 1 <= pos && pos <= self.end
    }
}

/// A transcript model; read-only input constructed by an external annotation
/// loader.
///
/// Exons are ordered in transcript order: ascending genomic coordinates on
/// the forward strand, descending on the reverse strand (each exon still has
/// `start < end` genomically).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub id: String,
    pub chrom: String,
    pub strand: Strand,
    pub exons: Vec<Exon>,
    /// Genomic position of the first base of the start codon.
    pub coding_start_genomic: i64,
    /// Genomic position of the last base of the stop codon.
    pub coding_end_genomic: i64,
    /// Transcript-relative offset of the CDS start (1-based).
    pub coding_start: i64,
    /// Length of the transcript 3' of the CDS end.
    pub three_prime_len: i64,
}

/// A transcript-relative region a genomic position falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    FivePrimeUtr,
    ThreePrimeUtr,
    /// Coding part of the exon with the given 1-based index.
    Exon(u32),
    /// Intron preceding the exon with the given 1-based index (transcript
    /// order), i.e. intron `n-1/n`.
    Intron(u32),
}

impl Region {
    pub fn is_exonic(&self) -> bool {
        matches!(self, Region::Exon(_))
    }

    pub fn is_intronic(&self) -> bool {
        matches!(self, Region::Intron(_))
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Region::FivePrimeUtr => write!(f, "5UTR"),
            Region::ThreePrimeUtr => write!(f, "3UTR"),
            Region::Exon(n) => write!(f, "Ex{}", n),
            Region::Intron(n) => write!(f, "In{}/{}", n - 1, n),
        }
    }
}

/// Location of a variant within a transcript, in transcript order. A span
/// crossing a region boundary carries both end regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub first: Region,
    pub second: Option<Region>,
}

impl Location {
    pub fn crosses_boundary(&self) -> bool {
        self.second.is_some()
    }

    /// Whether the variant lies entirely within the coding part of one exon.
    pub fn is_pure_exonic(&self) -> bool {
        self.second.is_none() && self.first.is_exonic()
    }

    pub fn is_pure_intronic(&self) -> bool {
        self.second.is_none() && self.first.is_intronic()
    }

    /// Whether either end touches coding exon sequence.
    pub fn mentions_exon(&self) -> bool {
        self.first.is_exonic() || self.second.map(|r| r.is_exonic()).unwrap_or(false)
    }

    /// The intron index when the variant is purely intronic.
    pub fn intron_index(&self) -> Option<u32> {
        match (self.first, self.second) {
            (Region::Intron(n), None) => Some(n),
            _ => None,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.first)?;
        if let Some(second) = &self.second {
            write!(f, "-{}", second)?;
        }
        Ok(())
    }
}

impl Transcript {
    /// Whether the genomic position lies outside the CDS span.
    pub fn is_outside_cds(&self, pos: i64) -> bool {
        self.is_outside_cds_5prime(pos) || self.is_outside_cds_3prime(pos)
    }

    /// Whether the position lies 5' of the CDS start.
    pub fn is_outside_cds_5prime(&self, pos: i64) -> bool {
        match self.strand {
            Strand::Forward => pos < self.coding_start_genomic,
            Strand::Reverse => pos > self.coding_start_genomic,
        }
    }

    /// Whether the position lies 3' of the CDS end.
    pub fn is_outside_cds_3prime(&self, pos: i64) -> bool {
        match self.strand {
            Strand::Forward => pos > self.coding_end_genomic,
            Strand::Reverse => pos < self.coding_end_genomic,
        }
    }

    /// Genomic CDS span as an ordered `(low, high)` pair.
    pub fn cds_genomic_bounds(&self) -> (i64, i64) {
        if self.coding_start_genomic <= self.coding_end_genomic {
            (self.coding_start_genomic, self.coding_end_genomic)
        } else {
            (self.coding_end_genomic, self.coding_start_genomic)
        }
    }

    /// Length of the intron preceding the exon with 1-based transcript-order
    /// index `downstream_index` (i.e. the intron `n-1/n`).
    pub fn intron_length(&self, downstream_index: u32) -> Option<i64> {
        if downstream_index < 2 || downstream_index as usize > self.exons.len() {
            return None;
        }
        let a = &self.exons[downstream_index as usize - 2];
        let b = &self.exons[downstream_index as usize - 1];
        Some(match self.strand {
            Strand::Forward => b.start - a.end,
            Strand::Reverse => a.start - b.end,
        })
    }

    /// Whether the variant overlaps an essential splice site (the donor or
    /// acceptor dinucleotide of any internal exon boundary).
    pub fn is_in_essential_splice_site(&self, variant: &Variant) -> bool {
        let last = self.exons.len() as u32;
        for exon in &self.exons {
            let is_first = exon.index == 1;
            let is_last = exon.index == last;
            match self.strand {
                Strand::Forward => {
                    if !is_last && variant.overlaps(exon.end + 1, exon.end + 2) {
                        return true;
                    }
                    if !is_first && variant.overlaps(exon.start - 1, exon.start) {
                        return true;
                    }
                }
                Strand::Reverse => {
                    if !is_last && variant.overlaps(exon.start - 1, exon.start) {
                        return true;
                    }
                    if !is_first && variant.overlaps(exon.end + 1, exon.end + 2) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Whether the variant overlaps the 5th intronic base after a donor site.
    /// Callers gate this on the intron being at least 9 bases long.
    pub fn is_in_donor_5th_base(&self, variant: &Variant) -> bool {
        let last = self.exons.len() as u32;
        for exon in &self.exons {
            if exon.index == last {
                continue;
            }
            let hit = match self.strand {
                Strand::Forward => variant.overlaps(exon.end + 5, exon.end + 5),
                Strand::Reverse => variant.overlaps(exon.start - 4, exon.start - 4),
            };
            if hit {
                return true;
            }
        }
        false
    }

    /// Whether the variant overlaps the configurable splice region: the last
    /// three exonic bases plus `range` intronic bases at a donor, and
    /// `range - 1` intronic plus the first three exonic bases at an acceptor.
    pub fn is_in_splicing_region(&self, variant: &Variant, range: i64) -> bool {
        let last = self.exons.len() as u32;
        for exon in &self.exons {
            let is_first = exon.index == 1;
            let is_last = exon.index == last;
            match self.strand {
                Strand::Forward => {
                    if !is_last && variant.overlaps(exon.end - 2, exon.end + range) {
                        return true;
                    }
                    if !is_first && variant.overlaps(exon.start - range + 1, exon.start + 3) {
                        return true;
                    }
                }
                Strand::Reverse => {
                    if !is_last && variant.overlaps(exon.start - range + 1, exon.start + 3) {
                        return true;
                    }
                    if !is_first && variant.overlaps(exon.end - 2, exon.end + range) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Whether the variant touches the first or last three exonic bases of an
    /// internal exon boundary.
    pub fn is_in_first_or_last_3_bases_of_exon(&self, variant: &Variant) -> bool {
        let last = self.exons.len() as u32;
        for exon in &self.exons {
            let is_first = exon.index == 1;
            let is_last = exon.index == last;
            match self.strand {
                Strand::Forward => {
                    if !is_first && variant.overlaps(exon.start + 1, exon.start + 3) {
                        return true;
                    }
                    if !is_last && variant.overlaps(exon.end - 2, exon.end) {
                        return true;
                    }
                }
                Strand::Reverse => {
                    if !is_first && variant.overlaps(exon.end - 2, exon.end) {
                        return true;
                    }
                    if !is_last && variant.overlaps(exon.start + 1, exon.start + 3) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Transcript-relative region of a single genomic position.
    pub fn region_of(&self, pos: i64) -> Region {
        if self.is_outside_cds_5prime(pos) {
            return Region::FivePrimeUtr;
        }
        if self.is_outside_cds_3prime(pos) {
            return Region::ThreePrimeUtr;
        }
        let mut prev_boundary: Option<i64> = None;
        for exon in &self.exons {
            if exon.contains(pos) {
                return Region::Exon(exon.index);
            }
            if let Some(prev) = prev_boundary {
                let in_intron = match self.strand {
                    Strand::Forward => prev < pos && pos < exon.start + 1,
                    Strand::Reverse => exon.end < pos && pos < prev,
                };
                if in_intron {
                    return Region::Intron(exon.index);
                }
            }
            prev_boundary = Some(match self.strand {
                Strand::Forward => exon.end,
                Strand::Reverse => exon.start + 1,
            });
        }
        // Positions inside the CDS are always covered by an exon or intron;
        // reaching this point means the transcript model is inconsistent.
        log::error!(
            "position {} not covered by exon model of transcript {}",
            pos,
            self.id
        );
        Region::Exon(self.exons.last().map(|e| e.index).unwrap_or(1))
    }

    /// Location of a variant, with both end regions reported in transcript
    /// order when the span crosses a region boundary.
    pub fn locate(&self, variant: &Variant) -> Location {
        let (x, y) = variant.span();
        let (first, second) = match self.strand {
            Strand::Forward => (self.region_of(x), self.region_of(y)),
            Strand::Reverse => (self.region_of(y), self.region_of(x)),
        };
        if first == second {
            Location {
                first,
                second: None,
            }
        } else {
            Location {
                first,
                second: Some(second),
            }
        }
    }
}


#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::fixtures::{forward_two_exon, reverse_two_exon};
    use super::Region;
    use crate::variant::Variant;

    #[test]
    fn outside_cds_predicates() {
        let tx = forward_two_exon();
        assert!(tx.is_outside_cds_5prime(99));
        assert!(!tx.is_outside_cds_5prime(100));
        assert!(tx.is_outside_cds_3prime(301));
        assert!(!tx.is_outside_cds(150));

        let tx = reverse_two_exon();
        assert!(tx.is_outside_cds_5prime(301));
        assert!(tx.is_outside_cds_3prime(99));
        assert!(!tx.is_outside_cds(250));
    }

    #[test]
    fn intron_length() {
        let tx = forward_two_exon();
        assert_eq!(tx.intron_length(2), Some(50));
        assert_eq!(tx.intron_length(1), None);
        let tx = reverse_two_exon();
        assert_eq!(tx.intron_length(2), Some(50));
    }

    #[test]
    fn essential_splice_site_windows() {
        let tx = forward_two_exon();
        // Donor dinucleotide after exon 1 is 151..=152.
        assert!(tx.is_in_essential_splice_site(&Variant::new("1", 151, "G", "A")));
        assert!(tx.is_in_essential_splice_site(&Variant::new("1", 152, "T", "C")));
        assert!(!tx.is_in_essential_splice_site(&Variant::new("1", 153, "A", "C")));
        // Acceptor dinucleotide before exon 2 is 199..=200.
        assert!(tx.is_in_essential_splice_site(&Variant::new("1", 199, "A", "C")));
        assert!(!tx.is_in_essential_splice_site(&Variant::new("1", 198, "A", "C")));
    }

    #[test]
    fn essential_splice_site_reverse() {
        let tx = reverse_two_exon();
        // Transcript-order donor follows exon 1, genomically at 199..=200.
        assert!(tx.is_in_essential_splice_site(&Variant::new("1", 200, "A", "C")));
        // Acceptor precedes exon 2, genomically at 151..=152.
        assert!(tx.is_in_essential_splice_site(&Variant::new("1", 151, "A", "C")));
    }

    #[test]
    fn donor_5th_base() {
        let tx = forward_two_exon();
        assert!(tx.is_in_donor_5th_base(&Variant::new("1", 155, "A", "C")));
        assert!(!tx.is_in_donor_5th_base(&Variant::new("1", 154, "A", "C")));

        let tx = reverse_two_exon();
        assert!(tx.is_in_donor_5th_base(&Variant::new("1", 196, "A", "C")));
    }

    #[test]
    fn regions_and_locations() {
        let tx = forward_two_exon();
        assert_eq!(tx.region_of(99), Region::FivePrimeUtr);
        assert_eq!(tx.region_of(120), Region::Exon(1));
        assert_eq!(tx.region_of(170), Region::Intron(2));
        assert_eq!(tx.region_of(250), Region::Exon(2));
        assert_eq!(tx.region_of(320), Region::ThreePrimeUtr);

        let loc = tx.locate(&Variant::new("1", 120, "A", "C"));
        assert!(loc.is_pure_exonic());
        assert_eq!(loc.to_string(), "Ex1");

        // Deletion spanning the donor site.
        let loc = tx.locate(&Variant::new("1", 148, "AAAAAA", "A"));
        assert!(loc.crosses_boundary());
        assert_eq!(loc.to_string(), "Ex1-In1/2");

        let loc = tx.locate(&Variant::new("1", 170, "A", "C"));
        assert_eq!(loc.intron_index(), Some(2));
    }

    #[test]
    fn locations_reverse_are_in_transcript_order() {
        let tx = reverse_two_exon();
        assert_eq!(tx.region_of(250), Region::Exon(1));
        assert_eq!(tx.region_of(120), Region::Exon(2));
        assert_eq!(tx.region_of(170), Region::Intron(2));

        // Genomically ascending span, reported transcript-first: the higher
        // genomic end (exon 1) comes first on the reverse strand.
        let loc = tx.locate(&Variant::new("1", 198, "AAAAA", "A"));
        assert_eq!(loc.first, Region::Exon(1));
        assert_eq!(loc.second, Some(Region::Intron(2)));
        assert_eq!(loc.to_string(), "Ex1-In1/2");
    }
}
