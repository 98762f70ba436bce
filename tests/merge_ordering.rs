//! Global ordering guarantees of the record heap and the streaming merge.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use vcfstore_merge::genome::{ContigOffsets, Genome};
use vcfstore_merge::merge::{MergeCommand, MergeError, Positioned, RecordSource};
use vcfstore_merge::record_heap::{NodeType, RecordHeap};
use vcfstore_merge::vcf::VcfSource;

// =============================================================================
// Heap ordering
// =============================================================================

#[test]
fn test_heap_orders_by_start_then_sample() {
    let mut heap: RecordHeap<()> = RecordHeap::new().with_strict(true);
    for (start, sample) in [(5, 2), (5, 1), (3, 9)] {
        heap.insert(0, NodeType::Record, Arc::new(()), start, start, sample)
            .unwrap();
    }

    let order: Vec<_> = heap.drain().map(|n| (n.start_pos, n.sample_id)).collect();
    assert_eq!(order, [(3, 9), (5, 1), (5, 2)]);
}

#[test]
fn test_heap_pops_sorted_for_random_insertion_order() {
    let mut rng = SmallRng::seed_from_u64(1234);

    for round in 0..50 {
        let n = rng.gen_range(1..400);
        let mut keys: Vec<(u32, u32)> = (0..n)
            .map(|_| (rng.gen_range(0..50), rng.gen_range(0..1000)))
            .collect();
        keys.shuffle(&mut rng);

        let mut heap: RecordHeap<usize> = RecordHeap::new().with_strict(false);
        for (i, &(start, sample)) in keys.iter().enumerate() {
            heap.insert(i, NodeType::Record, Arc::new(i), start, start, sample)
                .unwrap();
        }

        let mut popped = Vec::with_capacity(n);
        while !heap.is_empty() {
            let top = heap.top();
            let key = (top.start_pos, top.sample_id);
            let node = heap.pop();
            assert_eq!((node.start_pos, node.sample_id), key);
            popped.push(key);
        }

        keys.sort_unstable();
        assert_eq!(popped, keys, "round {}", round);
    }
}

#[test]
fn test_heap_reuse_after_clear_matches_fresh_heap() {
    let inserts = [(10, 1), (2, 3), (10, 0), (7, 7)];
    let run = |heap: &mut RecordHeap<()>| {
        for &(start, sample) in &inserts {
            heap.insert(0, NodeType::Record, Arc::new(()), start, start, sample)
                .unwrap();
        }
        let order: Vec<_> = heap.drain().map(|n| (n.start_pos, n.sample_id)).collect();
        order
    };

    let mut fresh: RecordHeap<()> = RecordHeap::new().with_strict(true);
    let expected = run(&mut fresh);

    let mut reused: RecordHeap<()> = RecordHeap::new().with_strict(true);
    reused
        .insert(0, NodeType::Record, Arc::new(()), 0, 0, 1)
        .unwrap();
    reused
        .insert(0, NodeType::Anchor, Arc::new(()), 50, 60, 3)
        .unwrap();
    reused.clear();
    assert!(reused.is_empty());

    assert_eq!(run(&mut reused), expected);
}

// =============================================================================
// Streaming merge over many sources
// =============================================================================

#[derive(Debug)]
struct Rec {
    start: u32,
    end: u32,
}

impl Positioned for Rec {
    fn start_pos(&self) -> u32 {
        self.start
    }
    fn end_pos(&self) -> u32 {
        self.end
    }
}

struct SortedSource {
    sample_id: u32,
    records: std::vec::IntoIter<Rec>,
}

impl RecordSource for SortedSource {
    type Record = Rec;

    fn sample_id(&self) -> u32 {
        self.sample_id
    }

    fn next_record(&mut self) -> Result<Option<Rec>, MergeError> {
        Ok(self.records.next())
    }
}

#[test]
fn test_merge_random_sources_is_globally_ordered() {
    let mut rng = SmallRng::seed_from_u64(99);
    let n_samples = 25u32;
    let mut total = 0;

    let mut sample_ids: Vec<u32> = (0..n_samples).collect();
    sample_ids.shuffle(&mut rng);

    let mut sources: Vec<SortedSource> = sample_ids
        .iter()
        .map(|&sample_id| {
            let mut starts: Vec<u32> = (0..rng.gen_range(0..60))
                .map(|_| rng.gen_range(0..10_000))
                .collect();
            starts.sort_unstable();
            total += starts.len();
            let records: Vec<Rec> = starts
                .into_iter()
                .map(|s| Rec {
                    start: s,
                    end: s + rng.gen_range(0..3000),
                })
                .collect();
            SortedSource {
                sample_id,
                records: records.into_iter(),
            }
        })
        .collect();

    let cmd = MergeCommand::new().with_anchor_gap(500).with_strict(true);
    let events = cmd.collect(&mut sources).unwrap();

    let keys: Vec<(u32, u32)> = events.iter().map(|n| (n.start_pos, n.sample_id)).collect();
    assert!(keys.windows(2).all(|w| w[0] <= w[1]));

    let records = events
        .iter()
        .filter(|n| n.node_type == NodeType::Record)
        .count();
    assert_eq!(records, total);

    for anchor in events.iter().filter(|n| n.is_anchor()) {
        assert!(anchor.start_pos > anchor.record.start);
        assert!(anchor.start_pos <= anchor.record.end);
        assert_eq!((anchor.start_pos - anchor.record.start) % 500, 0);
        assert_eq!(anchor.end_pos, anchor.record.end);
    }
}

// =============================================================================
// End to end over VCF files
// =============================================================================

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn genome_offsets() -> ContigOffsets {
    let genome_file = write_temp("chr1\t10000\nchr2\t5000\n");
    Genome::from_file(genome_file.path())
        .unwrap()
        .contig_offsets()
        .unwrap()
}

#[test]
fn test_merge_vcf_files_in_genome_order() {
    let offsets = genome_offsets();
    let header = "##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\t";

    let a = write_temp(&format!(
        "{}NA1\nchr1\t100\ta1\tA\tC\t.\t.\t.\tGT\t0/1\n\
         chr1\t250\ta2\tN\t<DEL>\t.\t.\tEND=2800\tGT\t0/1\n\
         chr2\t1\ta3\tG\tT\t.\t.\t.\tGT\t1/1\n",
        header
    ));
    let b = write_temp(&format!(
        "{}NA2\nchr1\t100\tb1\tA\tC\t.\t.\t.\tGT\t0/1\n\
         chr1\t1250\tb2\tT\tA\t.\t.\t.\tGT\t0/1\n",
        header
    ));

    let mut sources = vec![
        VcfSource::from_path(a.path(), 0, &offsets).unwrap(),
        VcfSource::from_path(b.path(), 1, &offsets).unwrap(),
    ];
    assert_eq!(sources[0].sample_name(), "NA1");
    assert_eq!(sources[1].sample_name(), "NA2");

    let events = MergeCommand::new()
        .with_anchor_gap(1000)
        .with_strict(true)
        .collect(&mut sources)
        .unwrap();

    let summary: Vec<_> = events
        .iter()
        .map(|n| (n.start_pos, n.sample_id, n.node_type, n.record.id.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (99, 0, NodeType::Record, "a1"),
            (99, 1, NodeType::Record, "b1"),
            (249, 0, NodeType::Record, "a2"),
            (1249, 0, NodeType::Anchor, "a2"),
            (1249, 1, NodeType::Record, "b2"),
            (2249, 0, NodeType::Anchor, "a2"),
            (10000, 0, NodeType::Record, "a3"),
        ]
    );
}

#[test]
fn test_merge_rejects_out_of_genome_order_file() {
    let offsets = genome_offsets();
    let a = write_temp("chr2\t1\t.\tA\tC\nchr1\t1\t.\tA\tC\n");
    let mut sources = vec![VcfSource::from_path(a.path(), 0, &offsets).unwrap()];

    let err = MergeCommand::new().collect(&mut sources).unwrap_err();
    assert!(matches!(err, MergeError::Unsorted { sample_id: 0, .. }));
}
