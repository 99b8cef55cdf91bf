//! Access to the genomic reference sequence.

pub use crate::reference::error::Error;

mod error {
    /// Error type for reference sequence lookups.
    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("unknown chromosome: {0}")]
        UnknownChromosome(String),
    }
}

/// Provider of genomic reference sequence.
///
/// Positions are 1-based inclusive. Implementations must upper-case returned
/// sequence, return an empty string when `end < start`, clamp requests to the
/// contig bounds, and fail with [`Error::UnknownChromosome`] when the
/// chromosome is unrecognized after alias normalization.
pub trait ReferenceProvider {
    /// Fetch the sub-sequence of `chrom` between `start` and `end`.
    fn fetch(&self, chrom: &str, start: i64, end: i64) -> Result<String, Error>;

    /// Length of the given contig, if known.
    fn contig_length(&self, chrom: &str) -> Option<i64>;
}

/// Resolve a chromosome name against the set of known contigs.
///
/// Tries the name as given, then with the `chr` prefix toggled, then the
/// mitochondrial aliases (`MT`/`chrMT` for `chrM`).
pub fn resolve_chrom<F>(chrom: &str, known: F) -> Option<String>
where
    F: Fn(&str) -> bool,
{
    if known(chrom) {
        return Some(chrom.to_string());
    }
    let toggled = if let Some(stripped) = chrom.strip_prefix("chr") {
        stripped.to_string()
    } else {
        format!("chr{}", chrom)
    };
    if known(&toggled) {
        return Some(toggled);
    }
    if chrom == "MT" || chrom == "chrMT" {
        let mito = "chrM";
        if known(mito) {
            return Some(mito.to_string());
        }
    }
    None
}

/// In-memory reference provider backed by a map of contig sequences.
///
/// Mainly used in tests and by embedding callers that already hold the
/// relevant sequence in memory.
#[derive(Debug, Default, Clone)]
pub struct InMemoryProvider {
    contigs: std::collections::HashMap<String, String>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a contig; the sequence is upper-cased on insertion.
    pub fn with_contig(mut self, name: &str, seq: &str) -> Self {
        self.contigs.insert(name.to_string(), seq.to_uppercase());
        self
    }
}

impl ReferenceProvider for InMemoryProvider {
    fn fetch(&self, chrom: &str, start: i64, end: i64) -> Result<String, Error> {
        let name = resolve_chrom(chrom, |c| self.contigs.contains_key(c))
            .ok_or_else(|| Error::UnknownChromosome(chrom.to_string()))?;
        let seq = &self.contigs[&name];

        if end < start {
            return Ok(String::new());
        }
        let start = start.max(1);
        let end = end.min(seq.len() as i64);
        if end < start {
            return Ok(String::new());
        }
        Ok(seq[(start - 1) as usize..end as usize].to_string())
    }

    fn contig_length(&self, chrom: &str) -> Option<i64> {
        let name = resolve_chrom(chrom, |c| self.contigs.contains_key(c))?;
        Some(self.contigs[&name].len() as i64)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{InMemoryProvider, ReferenceProvider};

    fn provider() -> InMemoryProvider {
        InMemoryProvider::new().with_contig("chr1", "acgtacgtgg")
    }

    #[test]
    fn fetch_upper_cases_and_clamps() -> Result<(), anyhow::Error> {
        let p = provider();
        assert_eq!(p.fetch("chr1", 1, 4)?, "ACGT");
        assert_eq!(p.fetch("chr1", -3, 2)?, "AC");
        assert_eq!(p.fetch("chr1", 9, 100)?, "GG");
        assert_eq!(p.fetch("chr1", 5, 4)?, "");
        Ok(())
    }

    #[test]
    fn chr_prefix_aliasing() -> Result<(), anyhow::Error> {
        let p = provider();
        assert_eq!(p.fetch("1", 1, 2)?, "AC");

        let q = InMemoryProvider::new().with_contig("chrM", "ACGT");
        assert_eq!(q.fetch("MT", 1, 2)?, "AC");
        assert_eq!(q.fetch("chrMT", 3, 4)?, "GT");
        Ok(())
    }

    #[test]
    fn unknown_chromosome_is_typed_failure() {
        let p = provider();
        assert!(p.fetch("chr2", 1, 2).is_err());
        assert!(p.contig_length("chr2").is_none());
    }
}
