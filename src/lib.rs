//! Clinical sequence nomenclature (CSN) annotation of genomic variants.
//!
//! Given a variant call (chromosome, 1-based position, ref/alt alleles), a
//! transcript model, and access to the genomic reference sequence, this crate
//! produces a transcript-relative DNA-level change description, a
//! protein-level change description, and a functional consequence
//! classification (clinical class code plus Sequence Ontology terms).
//!
//! Variant calling, read alignment, annotation-file loading, and HGVS string
//! parsing are out of scope; transcript models and translated protein
//! sequences are supplied by the caller.

pub mod annotate;
pub mod consequence;
pub mod coords;
pub mod normalizer;
pub mod reference;
pub mod repeats;
pub mod sequences;
pub mod transcript;
pub mod variant;
