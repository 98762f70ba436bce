//! Streaming k-way merge of per-sample record streams.
//!
//! # Algorithm
//!
//! 1. Seed the heap with the first record of every source
//! 2. Pop the minimum node and hand it to the caller
//! 3. If it was a record, queue an anchor when the record reaches
//!    `anchor_gap` bases past its start, then pull the next record from the
//!    same source
//! 4. If it was an anchor, queue the next anchor while still inside the record
//!
//! # Memory Complexity
//!
//! O(k) for k sources: one pending record per source plus at most one
//! anchor per long record in flight.
//!
//! # Requirements
//!
//! Every source MUST yield records in non-decreasing start order.

use crate::record_heap::{HeapError, Node, NodeType, RecordHeap};
use log::debug;
use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Default distance between anchors of a long record.
pub const DEFAULT_ANCHOR_GAP: u32 = 1000;

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Sample {sample_id}: parse error at line {line}: {message}")]
    Parse {
        sample_id: u32,
        line: usize,
        message: String,
    },

    #[error("Sample {sample_id} not sorted: start {start} comes after {previous}")]
    Unsorted {
        sample_id: u32,
        start: u32,
        previous: u32,
    },

    #[error("Sample {sample_id}: record end {end} is before start {start}")]
    InvalidSpan { sample_id: u32, start: u32, end: u32 },

    #[error("Contig '{0}' has no offset in the genome")]
    UnknownContig(String),

    #[error(transparent)]
    Heap(#[from] HeapError),
}

pub type Result<T> = std::result::Result<T, MergeError>;

/// A record with a zero-indexed inclusive span.
pub trait Positioned {
    fn start_pos(&self) -> u32;
    fn end_pos(&self) -> u32;
}

/// One sample's stream of records, sorted by start position.
pub trait RecordSource {
    type Record: Positioned;

    fn sample_id(&self) -> u32;

    /// Next record, or `None` once the stream is exhausted.
    fn next_record(&mut self) -> Result<Option<Self::Record>>;
}

/// Statistics from a merge run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeStats {
    pub records: usize,
    pub anchors: usize,
    pub max_pending: usize,
}

impl MergeStats {
    pub fn events(&self) -> usize {
        self.records + self.anchors
    }
}

/// Merge command configuration.
#[derive(Debug, Clone)]
pub struct MergeCommand {
    /// Distance between anchors; `None` disables anchors
    pub anchor_gap: Option<u32>,
    /// Override of the heap's pending-record discipline
    pub strict: Option<bool>,
}

impl Default for MergeCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl MergeCommand {
    pub fn new() -> Self {
        Self {
            anchor_gap: Some(DEFAULT_ANCHOR_GAP),
            strict: None,
        }
    }

    /// Set the anchor gap. Zero disables anchors.
    pub fn with_anchor_gap(mut self, gap: u32) -> Self {
        self.anchor_gap = (gap > 0).then_some(gap);
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    /// Merge `sources`, calling `emit` once per event in global order.
    ///
    /// `Node::source` is the index of the originating source in `sources`.
    pub fn run<Src, F>(&self, sources: &mut [Src], mut emit: F) -> Result<MergeStats>
    where
        Src: RecordSource,
        F: FnMut(&Node<Src::Record>) -> Result<()>,
    {
        let mut heap: RecordHeap<Src::Record> = RecordHeap::with_capacity(sources.len());
        if let Some(strict) = self.strict {
            heap = heap.with_strict(strict);
        }
        let mut last_start: Vec<Option<u32>> = vec![None; sources.len()];
        let mut stats = MergeStats::default();

        for idx in 0..sources.len() {
            refill(&mut heap, sources, idx, &mut last_start)?;
        }
        debug!(
            "Merging {} sources, {} with records",
            sources.len(),
            heap.len()
        );

        while let Some(node) = heap.try_pop() {
            stats.max_pending = stats.max_pending.max(heap.len() + 1);
            emit(&node)?;

            match node.node_type {
                NodeType::Record => {
                    stats.records += 1;
                    self.queue_anchor(&mut heap, &node)?;
                    refill(&mut heap, sources, node.source, &mut last_start)?;
                }
                NodeType::Anchor => {
                    stats.anchors += 1;
                    self.queue_anchor(&mut heap, &node)?;
                }
            }
        }

        debug!(
            "Merged {} records and {} anchors (max {} pending)",
            stats.records, stats.anchors, stats.max_pending
        );
        Ok(stats)
    }

    /// Merge `sources` into a vector of events.
    pub fn collect<Src: RecordSource>(
        &self,
        sources: &mut [Src],
    ) -> Result<Vec<Node<Src::Record>>> {
        let mut events = Vec::new();
        self.run(sources, |node| {
            events.push(node.clone());
            Ok(())
        })?;
        Ok(events)
    }

    fn queue_anchor<R>(&self, heap: &mut RecordHeap<R>, node: &Node<R>) -> Result<()> {
        let Some(gap) = self.anchor_gap else {
            return Ok(());
        };
        let next = u64::from(node.start_pos) + u64::from(gap);
        if next <= u64::from(node.end_pos) {
            heap.insert(
                node.source,
                NodeType::Anchor,
                Arc::clone(&node.record),
                next as u32,
                node.end_pos,
                node.sample_id,
            )?;
        }
        Ok(())
    }
}

/// Pull the next record of `sources[idx]` into the heap.
fn refill<Src: RecordSource>(
    heap: &mut RecordHeap<Src::Record>,
    sources: &mut [Src],
    idx: usize,
    last_start: &mut [Option<u32>],
) -> Result<()> {
    let source = &mut sources[idx];
    let Some(record) = source.next_record()? else {
        return Ok(());
    };

    let sample_id = source.sample_id();
    let (start, end) = (record.start_pos(), record.end_pos());
    if end < start {
        return Err(MergeError::InvalidSpan {
            sample_id,
            start,
            end,
        });
    }
    if let Some(previous) = last_start[idx] {
        if start < previous {
            return Err(MergeError::Unsorted {
                sample_id,
                start,
                previous,
            });
        }
    }
    last_start[idx] = Some(start);

    heap.insert(idx, NodeType::Record, Arc::new(record), start, end, sample_id)?;
    Ok(())
}
