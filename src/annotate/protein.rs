//! Protein-level annotation tokens.
//!
//! The rules here follow HGVS precedence: changes touching the initiator
//! methionine dominate everything, then new stops at the first changed
//! residue, stop losses, single substitutions, repeat-describable events,
//! frameshifts, and finally plain deletions, insertions and delins. The rule
//! order is load bearing; reordering changes which token a variant gets.
//!
//! Upstream scanning of alternative initiation sites is not attempted, so any
//! change disrupting Met1 is reported as `p.Met1?` or `p.?` rather than as a
//! 5' extension.

use crate::{
    annotate::Error,
    sequences::{aa_three_letter, TerminatorStyle},
    variant::Variant,
};

/// Protein change as a `(position, reference, alternative)` triple, with `.`
/// for inapplicable fields and `-` for empty allele spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProteinTriple {
    pub position: String,
    pub reference: String,
    pub alternative: String,
}

impl ProteinTriple {
    pub fn empty() -> Self {
        Self {
            position: ".".to_string(),
            reference: ".".to_string(),
            alternative: ".".to_string(),
        }
    }

    fn new(position: impl Into<String>, reference: impl Into<String>, alternative: impl Into<String>) -> Self {
        Self {
            position: position.into(),
            reference: reference.into(),
            alternative: alternative.into(),
        }
    }
}

/// Protein token (e.g. `p.Arg123LysfsTer34`) together with the change triple;
/// the token is empty when no protein annotation applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProteinAnnotation {
    pub token: String,
    pub change: ProteinTriple,
}

impl ProteinAnnotation {
    pub fn none() -> Self {
        Self {
            token: String::new(),
            change: ProteinTriple::empty(),
        }
    }
}

fn aa3(aa: u8) -> String {
    aa_three_letter(
        std::str::from_utf8(&[aa]).expect("single amino acid code"),
        TerminatorStyle::Ter,
    )
}

fn aa3_seq(aas: &str) -> String {
    aa_three_letter(aas, TerminatorStyle::Ter)
}

fn tiles(seq: &str, unit: &str) -> bool {
    seq.as_bytes()
        .chunks(unit.len())
        .all(|chunk| chunk == unit.as_bytes())
}

/// Count copies of `unit` immediately preceding 1-based `left_index` in
/// `prot`, returning the copy count and the 0-based start of the first copy.
fn preceding_copies(prot: &str, left_index: usize, unit: &str) -> (usize, i64) {
    let mut n = 0usize;
    let mut lower = left_index as i64 - unit.len() as i64 - 1;
    while lower >= 0 && &prot[lower as usize..lower as usize + unit.len()] == unit {
        n += 1;
        lower -= unit.len() as i64;
    }
    let first = left_index as i64 - (unit.len() * n) as i64 - 1;
    (n, first)
}

/// Compute the protein-level annotation of a coding variant.
///
/// `prot` and `mutprot` are the reference and mutated protein sequences in
/// one-letter code with `X` for stops; `cds_pos` is the coding coordinate of
/// the variant start and is only consulted for synonymous calls. A variant
/// outside the CDS, or a transcript without protein sequence, yields an empty
/// annotation.
pub fn annotate_protein(
    variant: &Variant,
    prot: &str,
    mutprot: &str,
    cds_pos: Option<i64>,
) -> Result<ProteinAnnotation, Error> {
    let Some(coord) = cds_pos else {
        return Ok(ProteinAnnotation::none());
    };
    if prot.is_empty() {
        return Ok(ProteinAnnotation::none());
    }
    let protcopy = prot;
    let mutprotcopy = mutprot;
    let pb = protcopy.as_bytes();

    // Loss of the initiator methionine, or a stop as the very first residue.
    if mutprot.is_empty() {
        return Ok(ProteinAnnotation {
            token: "p.Met1?".to_string(),
            change: ProteinTriple::new("1", &prot[..1], ""),
        });
    }
    let mb = mutprotcopy.as_bytes();
    if mb[0] == b'X' && pb[0] == b'M' {
        return Ok(ProteinAnnotation {
            token: "p.Met1?".to_string(),
            change: ProteinTriple::new("1", &prot[..1], "X"),
        });
    }
    if pb[0] == b'M' && mb[0] != b'M' {
        return Ok(ProteinAnnotation {
            token: "p.Met1?".to_string(),
            change: ProteinTriple::new("1", &prot[..1], ""),
        });
    }
    if mb[0] == b'X' && pb[0] != b'X' {
        return Ok(ProteinAnnotation {
            token: "p.?".to_string(),
            change: ProteinTriple::new("1", &prot[..1], "X"),
        });
    }

    // Synonymous change, reported at the codon of the DNA-level position.
    if prot == mutprot {
        let mut idx = (coord / 3) as usize;
        if coord % 3 > 0 {
            idx += 1;
        }
        if idx > prot.len() {
            log::warn!(
                "protein of length {} too short for coding position {} in {}",
                prot.len(),
                coord,
                variant.label()
            );
            idx = prot.len();
        }
        let idx = idx.max(1);
        return Ok(ProteinAnnotation {
            token: format!("p.{}{}=", aa3(pb[idx - 1]), idx),
            change: ProteinTriple::new(idx.to_string(), &prot[idx - 1..idx], &prot[idx - 1..idx]),
        });
    }

    let in_frame = variant.is_in_frame();

    // Trim the common prefix; `left_index` is the 1-based first difference.
    let mut shared = 0usize;
    while shared < prot.len() && shared < mutprot.len() && pb[shared] == mb[shared] {
        shared += 1;
    }
    let left = &prot[shared..];
    let mut_left = &mutprot[shared..];
    let left_index = shared + 1;

    // A stop at the first changed residue is nonsense whatever the DNA event.
    if !mut_left.is_empty()
        && mut_left.as_bytes()[0] == b'X'
        && !left.is_empty()
        && left.as_bytes()[0] != b'X'
    {
        return Ok(ProteinAnnotation {
            token: format!("p.{}{}Ter", aa3(left.as_bytes()[0]), left_index),
            change: ProteinTriple::new(left_index.to_string(), &left[..1], "X"),
        });
    }

    // Trim the common suffix of the remainders.
    let mut ilast = 0usize;
    while ilast < left.len()
        && ilast < mut_left.len()
        && left.as_bytes()[left.len() - 1 - ilast] == mut_left.as_bytes()[mut_left.len() - 1 - ilast]
    {
        ilast += 1;
    }
    let trim_ref = &left[..left.len() - ilast];
    let trim_alt = &mut_left[..mut_left.len() - ilast];
    let right_index = protcopy.len() - ilast;

    // Change starting at the very first residue.
    if left_index == 1 && !left.is_empty() && !mut_left.is_empty() {
        if pb[0] == b'M' {
            let position = if right_index != left_index {
                format!("1-{}", right_index)
            } else {
                "1".to_string()
            };
            let alternative = if trim_alt.is_empty() { "-" } else { trim_alt };
            return Ok(ProteinAnnotation {
                token: "p.?".to_string(),
                change: ProteinTriple::new(position, trim_ref, alternative),
            });
        }
        // Reference protein is incomplete and does not start with methionine.
        let position = if trim_ref.len() == 1 {
            "1".to_string()
        } else {
            format!("1-{}", trim_ref.len())
        };
        if mb[0] == b'M' {
            return Ok(ProteinAnnotation {
                token: format!("p.{}1{}", aa3(pb[0]), aa3(mb[0])),
                change: ProteinTriple::new(position, trim_ref, trim_alt),
            });
        }
        return Ok(ProteinAnnotation {
            token: "p.?".to_string(),
            change: ProteinTriple::new(position, trim_ref, trim_alt),
        });
    }

    // Stop lost: the original stop is the first changed residue, so the
    // protein is extended until the next downstream stop, if any is known.
    if !left.is_empty() && left.as_bytes()[0] == b'X' {
        if mut_left.is_empty() {
            return Ok(ProteinAnnotation {
                token: format!("p.Ter{}?ext*?", left_index),
                change: ProteinTriple::new(left_index.to_string(), "X", "?"),
            });
        }
        return Ok(match mut_left.find('X') {
            Some(next_stop) => ProteinAnnotation {
                token: format!(
                    "p.Ter{}{}extTer{}",
                    left_index,
                    aa3(mut_left.as_bytes()[0]),
                    next_stop
                ),
                change: ProteinTriple::new(
                    left_index.to_string(),
                    "X",
                    &mut_left[..=next_stop],
                ),
            },
            None => ProteinAnnotation {
                token: format!("p.Ter{}{}ext*?", left_index, aa3(mut_left.as_bytes()[0])),
                change: ProteinTriple::new(left_index.to_string(), "X", mut_left),
            },
        });
    }

    // Deletions or delins reaching the stop codon count as frameshift under
    // HGVS even when the DNA-level event is in frame.
    let couldbe_delstop = in_frame
        && right_index >= protcopy.len() - 1
        && left_index < protcopy.len()
        && !((trim_ref.len() == 1 && trim_alt.len() == 1)
            || (trim_ref.is_empty() && protcopy.len() > mutprotcopy.len()));

    // Single amino-acid substitution.
    if trim_ref.len() == 1 && trim_alt.len() == 1 {
        return Ok(ProteinAnnotation {
            token: format!("p.{}{}{}", aa3_seq(trim_ref), left_index, aa3_seq(trim_alt)),
            change: ProteinTriple::new(left_index.to_string(), trim_ref, trim_alt),
        });
    }

    // In-frame deletion, possibly describable as repeat-unit contraction.
    // Smaller units take precedence; a lone deleted copy with no copies left
    // is a plain deletion, not a repeat polymorphism.
    if right_index < protcopy.len() && trim_alt.is_empty() && in_frame {
        let mut repeat: Option<(usize, usize, usize, i64)> = None;
        for ssr_len in 1..=trim_ref.len() {
            if trim_ref.len() % ssr_len != 0 {
                continue;
            }
            let unit = &trim_ref[..ssr_len];
            if !tiles(trim_ref, unit) {
                continue;
            }
            let n_del = trim_ref.len() / ssr_len;
            let (n_ref, first) = preceding_copies(protcopy, left_index, unit);
            if n_ref + n_del >= 2 && !(n_del == 1 && n_ref == 0) {
                repeat = Some((ssr_len, n_del, n_ref, first));
                break;
            }
        }
        match repeat {
            None => {
                return Ok(if trim_ref.len() == 1 {
                    ProteinAnnotation {
                        token: format!("p.{}{}del", aa3(trim_ref.as_bytes()[0]), left_index),
                        change: ProteinTriple::new(left_index.to_string(), trim_ref, "-"),
                    }
                } else {
                    ProteinAnnotation {
                        token: format!(
                            "p.{}{}_{}{}del",
                            aa3(trim_ref.as_bytes()[0]),
                            left_index,
                            aa3(trim_ref.as_bytes()[trim_ref.len() - 1]),
                            right_index
                        ),
                        change: ProteinTriple::new(
                            format!("{}-{}", left_index, left_index + trim_ref.len() - 1),
                            trim_ref,
                            "-",
                        ),
                    }
                });
            }
            Some((ssr_len, n_del, n_ref, first)) => {
                let lowerlim = first as usize;
                let upperlim = lowerlim + ssr_len;
                let counts = format!("[{}];[{}]", n_ref + n_del, n_ref);
                let token = if ssr_len == 1 {
                    format!("p.{}{}{}", aa3(pb[lowerlim]), lowerlim + 1, counts)
                } else {
                    format!(
                        "p.{}{}_{}{}{}",
                        aa3(pb[lowerlim]),
                        lowerlim + 1,
                        aa3(pb[upperlim - 1]),
                        upperlim,
                        counts
                    )
                };
                let position = if ssr_len == 1 && n_ref > 0 && left_index == right_index {
                    left_index.to_string()
                } else {
                    format!("{}-{}", left_index, right_index)
                };
                return Ok(ProteinAnnotation {
                    token,
                    change: ProteinTriple::new(position, trim_ref, "-"),
                });
            }
        }
    }

    // In-frame insertion away from both protein ends: repeat expansion,
    // duplication, or plain insertion. HGVS requires at least one reference
    // copy of the unit for a repeat description.
    let xindex = trim_alt.find('X');
    if left_index > 1
        && right_index < protcopy.len()
        && trim_ref.is_empty()
        && !trim_alt.is_empty()
        && in_frame
    {
        let mut repeat: Option<(usize, usize, usize, i64)> = None;
        for ssr_len in 1..=trim_alt.len() {
            if trim_alt.len() % ssr_len != 0 {
                continue;
            }
            let unit = &trim_alt[..ssr_len];
            if !tiles(trim_alt, unit) {
                continue;
            }
            let n_ins = trim_alt.len() / ssr_len;
            let (n_ref, first) = preceding_copies(protcopy, left_index, unit);
            if n_ref > 0 {
                repeat = Some((ssr_len, n_ins, n_ref, first));
                break;
            }
        }
        let position = format!("{}-{}", left_index - 1, right_index + 1);
        if xindex.is_some() || repeat.is_none() {
            // Repeats with a stop in the unit are not allowed; the insertion
            // is spelled out, truncated at the first inserted stop.
            return Ok(match xindex {
                None => ProteinAnnotation {
                    token: format!(
                        "p.{}{}_{}{}ins{}",
                        aa3(pb[left_index - 2]),
                        left_index - 1,
                        aa3(pb[left_index - 1]),
                        left_index,
                        aa3_seq(trim_alt)
                    ),
                    change: ProteinTriple::new(position, "-", trim_alt),
                },
                Some(x) => ProteinAnnotation {
                    token: format!(
                        "p.{}{}_{}{}ins{}",
                        aa3(pb[left_index - 2]),
                        left_index - 1,
                        aa3(pb[right_index]),
                        right_index + 1,
                        aa3_seq(&trim_alt[..=x])
                    ),
                    change: ProteinTriple::new(position, "-", &trim_alt[..=x]),
                },
            });
        }
        let (ssr_len, n_ins, n_ref, first) = repeat.expect("checked above");
        let lowerlim = first as usize;
        let upperlim = lowerlim + ssr_len;
        let token = if n_ins == 1 && n_ref == 1 {
            if ssr_len == 1 {
                format!("p.{}{}dup", aa3(pb[lowerlim]), lowerlim + 1)
            } else {
                format!(
                    "p.{}{}_{}{}dup",
                    aa3(pb[lowerlim]),
                    lowerlim + 1,
                    aa3(pb[upperlim - 1]),
                    upperlim
                )
            }
        } else {
            let counts = format!("[{}];[{}]", n_ref, n_ref + n_ins);
            if ssr_len == 1 {
                format!("p.{}{}{}", aa3(pb[lowerlim]), lowerlim + 1, counts)
            } else {
                format!(
                    "p.{}{}_{}{}{}",
                    aa3(pb[lowerlim]),
                    lowerlim + 1,
                    aa3(pb[upperlim - 1]),
                    upperlim,
                    counts
                )
            }
        };
        return Ok(ProteinAnnotation {
            token,
            change: ProteinTriple::new(position, "-", trim_alt),
        });
    }

    // Frameshifts, including in-frame events that remove the stop codon.
    if !in_frame || couldbe_delstop {
        if mut_left.is_empty() {
            // Deletion running to the end of the protein.
            return Ok(if left.len() == 1 {
                ProteinAnnotation {
                    token: format!("p.{}{}del", aa3(left.as_bytes()[0]), left_index),
                    change: ProteinTriple::new(left_index.to_string(), left, "-"),
                }
            } else {
                ProteinAnnotation {
                    token: format!(
                        "p.{}{}_{}{}del",
                        aa3(left.as_bytes()[0]),
                        left_index,
                        aa3(left.as_bytes()[left.len() - 1]),
                        right_index
                    ),
                    change: ProteinTriple::new(
                        format!("{}-{}", left_index, right_index),
                        left,
                        "-",
                    ),
                }
            });
        }
        // A reference protein without a trailing stop can be strictly
        // extended by the shifted frame, leaving no reference residue at the
        // divergence point; such changes are reported against `?`.
        let first_ref = left.as_bytes().first().copied().unwrap_or(b'?');
        let ref_span = if left.is_empty() { "?" } else { &left[..1] };
        let first_alt = mut_left.as_bytes()[0];
        match mut_left.find('X') {
            Some(x) => {
                if x == 0 && left_index == 1 && pb[0] == b'M' {
                    return Ok(ProteinAnnotation {
                        token: "p.(Met1Ter)".to_string(),
                        change: ProteinTriple::new("1", "M", "X"),
                    });
                }
                // First changed residue is the last one: an extension.
                if left_index == protcopy.len() && x + 1 > left.len() {
                    return Ok(ProteinAnnotation {
                        token: format!(
                            "p.{}{}{}extTer{}",
                            aa3(first_ref),
                            protcopy.len(),
                            aa3(first_alt),
                            x + 1
                        ),
                        change: ProteinTriple::new(
                            left_index.to_string(),
                            &left[..1],
                            &mut_left[..=x],
                        ),
                    });
                }
                if x + 1 == left.len() && left.len() == 1 {
                    return Ok(ProteinAnnotation {
                        token: format!(
                            "p.{}{}{}extTer{}",
                            aa3(first_ref),
                            protcopy.len(),
                            aa3(first_alt),
                            x + 1
                        ),
                        change: ProteinTriple::new(
                            left_index.to_string(),
                            &left[..1],
                            &mut_left[..=x],
                        ),
                    });
                }
                if x == 0 && left.len() > 1 {
                    return Ok(ProteinAnnotation {
                        token: format!("p.{}{}Ter", aa3(first_ref), left_index),
                        change: ProteinTriple::new(
                            left_index.to_string(),
                            &left[..1],
                            &mut_left[..1],
                        ),
                    });
                }
                if left_index < protcopy.len() && x + 1 <= left.len() && trim_ref.is_empty() {
                    // Duplication takes precedence over a frameshift-spelled
                    // insertion when the preceding residues match.
                    let ta_len = trim_alt.len();
                    if ta_len > 0
                        && left_index > ta_len
                        && &protcopy[left_index - ta_len - 1..left_index - 1] == trim_alt
                    {
                        let low = left_index - ta_len;
                        let token = if ta_len == 1 {
                            format!("p.{}{}dup", aa3(pb[low - 1]), low)
                        } else {
                            format!(
                                "p.{}{}_{}{}dup",
                                aa3(pb[low - 1]),
                                low,
                                aa3(pb[left_index - 2]),
                                left_index - 1
                            )
                        };
                        return Ok(ProteinAnnotation {
                            token,
                            change: ProteinTriple::new(
                                format!("{}-{}", left_index - 1, right_index + 1),
                                "-",
                                trim_alt,
                            ),
                        });
                    }
                }
                return Ok(ProteinAnnotation {
                    token: format!(
                        "p.{}{}{}fsTer{}",
                        aa3(first_ref),
                        left_index,
                        aa3(first_alt),
                        x + 1
                    ),
                    change: ProteinTriple::new(left_index.to_string(), ref_span, &mut_left[..=x]),
                });
            }
            None => {
                // No downstream stop before the end of the transcript.
                return Ok(if left_index == protcopy.len() {
                    ProteinAnnotation {
                        token: format!("p.{}{}{}ext*?", aa3(first_ref), left_index, aa3(first_alt)),
                        change: ProteinTriple::new(left_index.to_string(), &left[..1], mut_left),
                    }
                } else {
                    ProteinAnnotation {
                        token: format!(
                            "p.({}{}{}fs*?)",
                            aa3(first_ref),
                            left_index,
                            aa3(first_alt)
                        ),
                        change: ProteinTriple::new(left_index.to_string(), ref_span, mut_left),
                    }
                });
            }
        }
    }

    // In-frame deletion touching a protein end.
    if trim_alt.is_empty() {
        return Ok(if trim_ref.len() == 1 {
            ProteinAnnotation {
                token: format!("p.{}{}del", aa3_seq(trim_ref), left_index),
                change: ProteinTriple::new(left_index.to_string(), trim_ref, "-"),
            }
        } else {
            ProteinAnnotation {
                token: format!(
                    "p.{}{}_{}{}del",
                    aa3(trim_ref.as_bytes()[0]),
                    left_index,
                    aa3(trim_ref.as_bytes()[trim_ref.len() - 1]),
                    right_index
                ),
                change: ProteinTriple::new(
                    format!("{}-{}", left_index, right_index),
                    trim_ref,
                    "-",
                ),
            }
        });
    }

    // In-frame insertion at a protein end.
    if left.is_empty() {
        if left_index == 1 {
            if trim_alt.as_bytes()[0] == b'M' {
                if pb[0] == b'M' {
                    // e.g. MA -> MRMA, an insertion between Met1 and residue 2.
                    return Ok(ProteinAnnotation {
                        token: format!(
                            "p.{}1_{}2ins{}{}",
                            aa3(pb[0]),
                            aa3(pb[1]),
                            aa3_seq(&trim_alt[1..]),
                            aa3(b'M')
                        ),
                        change: ProteinTriple::new("1-2", "M", format!("{}M", trim_alt)),
                    });
                }
                return Ok(ProteinAnnotation {
                    token: "p.?".to_string(),
                    change: ProteinTriple::new(
                        "1",
                        &protcopy[..1],
                        format!("{}{}", trim_alt, &protcopy[..1]),
                    ),
                });
            }
            return Ok(ProteinAnnotation {
                token: "p.?".to_string(),
                change: ProteinTriple::new("1", "-", trim_alt),
            });
        }
        if left_index == protcopy.len() {
            // Reference protein lacking a stop codon gains extra residues.
            return Ok(ProteinAnnotation {
                token: "p.?".to_string(),
                change: ProteinTriple::new(left_index.to_string(), "-", trim_alt),
            });
        }
    }

    // Remaining case: an in-frame delins not touching the stop codon. The
    // inserted sequence is truncated at the first inserted stop.
    if !trim_ref.is_empty() && !trim_alt.is_empty() {
        let shown_alt = match trim_alt.find('X') {
            Some(x) => &trim_alt[..=x],
            None => trim_alt,
        };
        let span = if trim_ref.len() == 1 {
            format!("{}{}", aa3_seq(trim_ref), left_index)
        } else {
            format!(
                "{}{}_{}{}",
                aa3(trim_ref.as_bytes()[0]),
                left_index,
                aa3(trim_ref.as_bytes()[trim_ref.len() - 1]),
                right_index
            )
        };
        let position = if left_index == right_index {
            left_index.to_string()
        } else {
            format!("{}-{}", left_index, right_index)
        };
        return Ok(ProteinAnnotation {
            token: format!("p.{}delins{}", span, aa3_seq(shown_alt)),
            change: ProteinTriple::new(position, trim_ref, shown_alt),
        });
    }

    log::error!(
        "cannot express protein change for {}: ref={} alt={}",
        variant.label(),
        protcopy,
        mutprotcopy
    );
    Err(Error::UnresolvedProteinChange {
        label: variant.label(),
        protein: protcopy.to_string(),
        mutated: mutprotcopy.to_string(),
    })
}
