//! Utility code for working with nucleotide and amino-acid sequences.

use std::collections::HashMap;

/// Trim the common prefix of two sequences, returning the number of trimmed
/// characters and the two remainders.
pub fn trim_common_prefixes(reference: &str, alternative: &str) -> (usize, String, String) {
    let r = reference.as_bytes();
    let a = alternative.as_bytes();

    let mut trim = 0;
    while trim < r.len() && trim < a.len() && r[trim] == a[trim] {
        trim += 1;
    }

    (
        trim,
        reference[trim..].to_string(),
        alternative[trim..].to_string(),
    )
}

/// Trim the common suffix of two sequences, returning the number of trimmed
/// characters and the two remainders.
pub fn trim_common_suffixes(reference: &str, alternative: &str) -> (usize, String, String) {
    let r = reference.as_bytes();
    let a = alternative.as_bytes();

    let mut trim = 0;
    while trim < r.len() && trim < a.len() && r[r.len() - 1 - trim] == a[a.len() - 1 - trim] {
        trim += 1;
    }

    (
        trim,
        reference[..(r.len() - trim)].to_string(),
        alternative[..(a.len() - trim)].to_string(),
    )
}

/// Reverse complementing shortcut.
pub fn revcomp(seq: &str) -> String {
    std::str::from_utf8(&bio::alphabets::dna::revcomp(seq.as_bytes()))
        .expect("invalid utf-8 encoding")
        .to_string()
}

/// How the translation terminator is rendered in three-letter output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminatorStyle {
    /// Render stops as a bare `X` placeholder.
    Bare,
    /// Render stops as the named `Ter` token.
    Ter,
}

lazy_static::lazy_static! {
    /// One-letter to three-letter amino-acid codes; the terminator is handled
    /// separately depending on [`TerminatorStyle`].
    static ref AA1_TO_AA3: HashMap<u8, &'static str> = {
        let mut m = HashMap::new();
        m.insert(b'I', "Ile");
        m.insert(b'M', "Met");
        m.insert(b'T', "Thr");
        m.insert(b'N', "Asn");
        m.insert(b'K', "Lys");
        m.insert(b'S', "Ser");
        m.insert(b'R', "Arg");
        m.insert(b'L', "Leu");
        m.insert(b'P', "Pro");
        m.insert(b'H', "His");
        m.insert(b'Q', "Gln");
        m.insert(b'V', "Val");
        m.insert(b'A', "Ala");
        m.insert(b'D', "Asp");
        m.insert(b'E', "Glu");
        m.insert(b'G', "Gly");
        m.insert(b'F', "Phe");
        m.insert(b'Y', "Tyr");
        m.insert(b'C', "Cys");
        m.insert(b'W', "Trp");
        m.insert(b'U', "Sel");
        m.insert(b'?', "?");
        m
    };
}

/// Convert a one-letter amino-acid sequence to three-letter codes.
///
/// Stops (`*`, `X`, `x`) render according to `style`; characters outside the
/// amino-acid alphabet render as `Xaa`.
pub fn aa_three_letter(aas: &str, style: TerminatorStyle) -> String {
    let mut ret = String::with_capacity(aas.len() * 3);
    for c in aas.bytes() {
        match c {
            b'*' | b'X' | b'x' => ret.push_str(match style {
                TerminatorStyle::Bare => "X",
                TerminatorStyle::Ter => "Ter",
            }),
            _ => ret.push_str(AA1_TO_AA3.get(&c).unwrap_or(&"Xaa")),
        }
    }
    ret
}
