//! Consequence classification: impact class codes and Sequence Ontology terms.

use serde::{Deserialize, Serialize};

use crate::{
    sequences::{trim_common_prefixes, trim_common_suffixes},
    transcript::{Location, Region, Transcript},
    variant::Variant,
};

/// Classification settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of intronic bases around a splice site reported as splice
    /// region by the class code (the SO terms always use 8).
    pub splice_site_range: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            splice_site_range: 8,
        }
    }
}

/// Impact class of a variant on a transcript.
///
/// Exactly one class is assigned per variant and transcript; the checks run
/// in a fixed priority order, so e.g. a deletion removing both the initiator
/// codon and downstream coding sequence is `Im`, not `InFrame`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassCode {
    /// Initiator codon disrupted.
    Im,
    FivePrimeUtr,
    ThreePrimeUtr,
    StopLoss,
    EssentialSpliceSite,
    SpliceDonor5thBase,
    SpliceRegion,
    Intronic,
    /// Change in the first or last three bases of an exon.
    ExonEdge,
    Synonymous,
    Frameshift,
    StopGain,
    Missense,
    InFrame,
    Unclassified,
}

impl std::fmt::Display for ClassCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ClassCode::Im => "IM",
            ClassCode::FivePrimeUtr => "5PU",
            ClassCode::ThreePrimeUtr => "3PU",
            ClassCode::StopLoss => "SL",
            ClassCode::EssentialSpliceSite => "ESS",
            ClassCode::SpliceDonor5thBase => "SS5",
            ClassCode::SpliceRegion => "SS",
            ClassCode::Intronic => "INT",
            ClassCode::ExonEdge => "EE",
            ClassCode::Synonymous => "SY",
            ClassCode::Frameshift => "FS",
            ClassCode::StopGain => "SG",
            ClassCode::Missense => "NSY",
            ClassCode::InFrame => "IF",
            ClassCode::Unclassified => "",
        };
        write!(f, "{}", s)
    }
}

enum Utr {
    FivePrime,
    ThreePrime,
}

/// Whether either end of the variant span falls outside the CDS, 5' taking
/// priority over 3'.
fn utr_overlap(tx: &Transcript, variant: &Variant) -> Option<Utr> {
    let (x, y) = variant.span();
    if tx.is_outside_cds_5prime(x) || tx.is_outside_cds_5prime(y) {
        return Some(Utr::FivePrime);
    }
    if tx.is_outside_cds_3prime(x) || tx.is_outside_cds_3prime(y) {
        return Some(Utr::ThreePrime);
    }
    None
}

/// Assign the impact class of a variant.
///
/// `protein` and `mutprotein` are the translated reference and mutated
/// protein sequences, with `X` as the terminator; `mutprotein` is `None` for
/// non-coding transcripts. `location` must be the variant's location on the
/// same transcript.
pub fn class_of(
    variant: &Variant,
    tx: &Transcript,
    protein: &str,
    mutprotein: Option<&str>,
    location: &Location,
    config: &Config,
) -> ClassCode {
    // A span reaching into a UTR is classified by the UTR end even when the
    // other end disrupts coding sequence.
    match utr_overlap(tx, variant) {
        Some(Utr::FivePrime) => {
            if location.mentions_exon() && (variant.is_deletion() || variant.is_complex()) {
                return ClassCode::Im;
            }
            return ClassCode::FivePrimeUtr;
        }
        Some(Utr::ThreePrime) => {
            if location.mentions_exon() && (variant.is_deletion() || variant.is_complex()) {
                return ClassCode::StopLoss;
            }
            return ClassCode::ThreePrimeUtr;
        }
        None => {}
    }

    if location.crosses_boundary() {
        return ClassCode::EssentialSpliceSite;
    }

    if let Some(n) = location.intron_index() {
        if tx.is_in_essential_splice_site(variant) {
            return ClassCode::EssentialSpliceSite;
        }
        // The 5th-base class only applies to introns long enough to carry a
        // distinct donor motif.
        if tx.intron_length(n).unwrap_or(0) >= 9 && tx.is_in_donor_5th_base(variant) {
            return ClassCode::SpliceDonor5thBase;
        }
        if tx.is_in_splicing_region(variant, config.splice_site_range) {
            return ClassCode::SpliceRegion;
        }
        return ClassCode::Intronic;
    }

    let pot_ss = tx.is_in_first_or_last_3_bases_of_exon(variant);

    let Some(mutprotein) = mutprotein else {
        return ClassCode::Intronic;
    };
    let prot_len = protein.len();
    let mutprot_len = mutprotein.len();

    if protein == mutprotein {
        if pot_ss {
            return ClassCode::ExonEdge;
        }
        return ClassCode::Synonymous;
    }

    if prot_len > 0 && mutprot_len > 0 && protein.as_bytes()[0] != mutprotein.as_bytes()[0] {
        return ClassCode::Im;
    }
    // Both ends overlap the transcript ends; nothing sensible to report.
    if mutprot_len == 0 && prot_len > 0 {
        return ClassCode::Unclassified;
    }

    let (_, protein, mutprotein) = trim_common_prefixes(protein, mutprotein);

    if protein.is_empty() {
        // The mutated protein extends past the reference protein without a
        // terminator change, so the reference CDS lacks a stop codon.
        log::error!(
            "CDS annotation does not end in a stop codon for {}",
            variant.label()
        );
        return ClassCode::StopLoss;
    }
    if protein.starts_with('X') && mutprotein.is_empty() {
        return ClassCode::StopLoss;
    }
    if protein.starts_with('X') && !mutprotein.starts_with('X') {
        return ClassCode::StopLoss;
    }
    // The shortest frameshift still reads through to Ter2, so a terminator
    // at the first changed residue is a stop gain.
    if mutprotein.starts_with('X') && !protein.starts_with('X') {
        return ClassCode::StopGain;
    }

    if !variant.is_in_frame() {
        return ClassCode::Frameshift;
    }

    let (_, protein, _) = trim_common_suffixes(&protein, &mutprotein);
    if prot_len == mutprot_len && protein.len() == 1 {
        if pot_ss {
            return ClassCode::ExonEdge;
        }
        return ClassCode::Missense;
    }
    if pot_ss {
        return ClassCode::ExonEdge;
    }
    ClassCode::InFrame
}

/// Sequence Ontology terms for a variant, joined with `|` when several
/// apply. Returns `.` when no protein comparison is possible.
pub fn so_terms(
    variant: &Variant,
    tx: &Transcript,
    protein: &str,
    mutprotein: Option<&str>,
    location: &Location,
) -> String {
    match utr_overlap(tx, variant) {
        Some(Utr::FivePrime) => {
            if location.mentions_exon() && (variant.is_deletion() || variant.is_complex()) {
                return "initiator_codon_variant".to_string();
            }
            return "5_prime_UTR_variant".to_string();
        }
        Some(Utr::ThreePrime) => {
            if location.mentions_exon() && (variant.is_deletion() || variant.is_complex()) {
                return "stop_lost".to_string();
            }
            return "3_prime_UTR_variant".to_string();
        }
        None => {}
    }

    if location.crosses_boundary() {
        match location.first {
            Region::Intron(_) => return "splice_acceptor_variant".to_string(),
            Region::Exon(_) => return "splice_donor_variant".to_string(),
            _ => {}
        }
    }

    if location.is_pure_intronic() {
        if is_in_splice_donor(tx, variant) {
            return "splice_donor_variant".to_string();
        }
        if is_in_splice_acceptor(tx, variant) {
            return "splice_acceptor_variant".to_string();
        }
        if let Some(n) = location.intron_index() {
            if tx.intron_length(n).unwrap_or(0) >= 9 && tx.is_in_donor_5th_base(variant) {
                return "splice_donor_5th_base_variant".to_string();
            }
        }
    }

    let mut out: Vec<&str> = Vec::new();

    // The SO splice region always uses the fixed 8-base window.
    if tx.is_in_splicing_region(variant, 8) {
        if location.is_pure_intronic() {
            return "intron_variant|splice_region_variant".to_string();
        }
        out.push("splice_region_variant");
    }
    if location.is_pure_intronic() {
        return "intron_variant".to_string();
    }

    if variant.is_in_frame() {
        if variant.is_deletion() {
            out.push("inframe_deletion");
        }
        if variant.is_insertion() {
            out.push("inframe_insertion");
        }
        if variant.is_complex() {
            out.push("inframe_indel");
        }
    } else {
        out.push("frameshift_variant");
        return out.join("|");
    }

    let Some(mutprotein) = mutprotein else {
        return ".".to_string();
    };
    if protein.is_empty() {
        return ".".to_string();
    }
    // An empty mutated protein with a non-empty reference one means the
    // start of the protein is deleted.
    if mutprotein.is_empty() {
        return "initiator_codon_variant".to_string();
    }

    if protein == mutprotein {
        out.push("synonymous_variant");
        return out.join("|");
    }
    if protein.as_bytes()[0] != mutprotein.as_bytes()[0] {
        out.push("initiator_codon_variant");
        return out.join("|");
    }
    if protein.len() == mutprotein.len() {
        out.push("missense_variant");
    }

    let (_, protein, mutprotein) = trim_common_prefixes(protein, mutprotein);
    if protein.is_empty() {
        return "3_prime_UTR_variant".to_string();
    }
    if protein.starts_with('X') && (mutprotein.is_empty() || !mutprotein.starts_with('X')) {
        out.push("stop_lost");
    }

    let (_, _, mutprotein) = trim_common_suffixes(&protein, &mutprotein);
    if mutprotein.contains('X') {
        out.push("stop_gained");
    }

    // A terminator change supersedes the residue substitution it implies.
    if out.iter().any(|t| *t == "stop_gained" || *t == "stop_lost") {
        out.retain(|t| *t != "missense_variant");
    }
    out.join("|")
}

fn is_in_splice_donor(tx: &Transcript, variant: &Variant) -> bool {
    let last = tx.exons.len() as u32;
    for exon in &tx.exons {
        if exon.index == last {
            continue;
        }
        let hit = match tx.strand {
            crate::transcript::Strand::Forward => variant.overlaps(exon.end + 1, exon.end + 2),
            crate::transcript::Strand::Reverse => variant.overlaps(exon.start - 1, exon.start),
        };
        if hit {
            return true;
        }
    }
    false
}

fn is_in_splice_acceptor(tx: &Transcript, variant: &Variant) -> bool {
    for exon in &tx.exons {
        if exon.index == 1 {
            continue;
        }
        let hit = match tx.strand {
            crate::transcript::Strand::Forward => variant.overlaps(exon.start - 1, exon.start),
            crate::transcript::Strand::Reverse => variant.overlaps(exon.end + 1, exon.end + 2),
        };
        if hit {
            return true;
        }
    }
    false
}
