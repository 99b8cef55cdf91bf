use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use csn::{
    coords::map_position,
    transcript::{Exon, Strand, Transcript},
};

/// Transcript with `n` exons of 120 exonic bases separated by 1000-base
/// introns, CDS from the 31st to the 30th-to-last transcript base.
fn many_exon_transcript(n: u32) -> Transcript {
    let mut exons = Vec::new();
    let mut start = 1000;
    for index in 1..=n {
        exons.push(Exon {
            index,
            start,
            end: start + 120,
        });
        start += 1120;
    }
    Transcript {
        id: "BENCH".to_string(),
        chrom: "1".to_string(),
        strand: Strand::Forward,
        coding_start_genomic: exons[0].start + 31,
        coding_end_genomic: exons[n as usize - 1].end - 30,
        coding_start: 31,
        three_prime_len: 30,
        exons,
    }
}

fn bench_map_position(c: &mut Criterion) {
    let tx = many_exon_transcript(50);
    let positions: Vec<i64> = (0..1000)
        .map(|i| 1001 + (i * 53) % (50 * 1120))
        .collect();

    c.bench_function("map_position/50_exons", |b| {
        b.iter(|| {
            for &pos in &positions {
                let _ = black_box(map_position(black_box(pos), &tx));
            }
        })
    });
}

criterion_group!(benches, bench_map_position);
criterion_main!(benches);
