//! Min-heap of pending records for a k-way merge across sample streams.
//!
//! Each sample stream contributes its next undelivered record (and any
//! anchors of records already delivered). Popping the minimum repeatedly
//! yields records in ascending start position, ties broken by sample id.
//!
//! # Ordering
//!
//! `(start_pos, sample_id)` ascending. Nodes equal on both come out in
//! insertion order. [`NodeType`] is not part of the key.

use crate::config;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeapError {
    #[error("Sample {sample_id} already has a pending record in the merge heap")]
    DuplicatePending { sample_id: u32 },
}

pub type Result<T> = std::result::Result<T, HeapError>;

/// What a heap node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// A decoded record, delivered at its own start position.
    Record,
    /// A later position inside a record that was already delivered.
    Anchor,
}

/// One pending merge event.
///
/// `source` identifies the stream to refill after this node is popped (for
/// example an index into the caller's list of readers). The heap never
/// dereferences it.
#[derive(Debug)]
pub struct Node<R, S = usize> {
    pub source: S,
    pub node_type: NodeType,
    pub record: Arc<R>,
    /// Zero-indexed; for an anchor, the anchor position.
    pub start_pos: u32,
    /// Zero-indexed inclusive end of the record.
    pub end_pos: u32,
    pub sample_id: u32,
}

impl<R, S: Clone> Clone for Node<R, S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            node_type: self.node_type,
            record: Arc::clone(&self.record),
            start_pos: self.start_pos,
            end_pos: self.end_pos,
            sample_id: self.sample_id,
        }
    }
}

impl<R, S> Node<R, S> {
    #[inline]
    pub fn is_anchor(&self) -> bool {
        self.node_type == NodeType::Anchor
    }

    #[inline]
    fn key(&self) -> (u32, u32) {
        (self.start_pos, self.sample_id)
    }
}

/// Wrapper for min-heap (BinaryHeap is max-heap by default).
struct HeapEntry<R, S> {
    node: Node<R, S>,
    seq: u64,
}

impl<R, S> Ord for HeapEntry<R, S> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap
        other
            .node
            .key()
            .cmp(&self.node.key())
            .then(other.seq.cmp(&self.seq))
    }
}

impl<R, S> PartialOrd for HeapEntry<R, S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<R, S> PartialEq for HeapEntry<R, S> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<R, S> Eq for HeapEntry<R, S> {}

/// Priority queue of [`Node`]s ordered by `(start_pos, sample_id)`.
///
/// In strict mode (the default, see [`config::set_strict_pending`]) at most
/// one `Record` node per sample may be resident; anchors are exempt since
/// they continue a record the stream has already handed over.
pub struct RecordHeap<R, S = usize> {
    heap: BinaryHeap<HeapEntry<R, S>>,
    pending: FxHashMap<u32, usize>,
    strict: bool,
    next_seq: u64,
}

impl<R, S> Default for RecordHeap<R, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, S> RecordHeap<R, S> {
    /// Create a heap using the process-wide pending-record discipline.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity),
            pending: FxHashMap::default(),
            strict: config::is_strict_pending(),
            next_seq: 0,
        }
    }

    /// Override the pending-record discipline for this heap.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Add a pending node.
    pub fn insert(
        &mut self,
        source: S,
        node_type: NodeType,
        record: Arc<R>,
        start_pos: u32,
        end_pos: u32,
        sample_id: u32,
    ) -> Result<()> {
        self.push(Node {
            source,
            node_type,
            record,
            start_pos,
            end_pos,
            sample_id,
        })
    }

    /// Add an already-built node.
    pub fn push(&mut self, node: Node<R, S>) -> Result<()> {
        if node.node_type == NodeType::Record {
            let count = self.pending.entry(node.sample_id).or_insert(0);
            if self.strict && *count > 0 {
                return Err(HeapError::DuplicatePending {
                    sample_id: node.sample_id,
                });
            }
            *count += 1;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(HeapEntry { node, seq });
        Ok(())
    }

    /// The minimum node.
    ///
    /// # Panics
    ///
    /// Panics if the heap is empty; check [`RecordHeap::is_empty`] first.
    pub fn top(&self) -> &Node<R, S> {
        match self.peek() {
            Some(node) => node,
            None => panic!("RecordHeap::top called on an empty heap"),
        }
    }

    /// Remove and return the minimum node.
    ///
    /// # Panics
    ///
    /// Panics if the heap is empty; check [`RecordHeap::is_empty`] first.
    pub fn pop(&mut self) -> Node<R, S> {
        match self.try_pop() {
            Some(node) => node,
            None => panic!("RecordHeap::pop called on an empty heap"),
        }
    }

    /// The minimum node, or `None` when empty.
    #[inline]
    pub fn peek(&self) -> Option<&Node<R, S>> {
        self.heap.peek().map(|e| &e.node)
    }

    /// Remove and return the minimum node, or `None` when empty.
    pub fn try_pop(&mut self) -> Option<Node<R, S>> {
        let node = self.heap.pop()?.node;
        if node.node_type == NodeType::Record {
            if let Some(count) = self.pending.get_mut(&node.sample_id) {
                *count -= 1;
                if *count == 0 {
                    self.pending.remove(&node.sample_id);
                }
            }
        }
        Some(node)
    }

    /// Whether `sample_id` has a record node resident.
    pub fn has_pending_record(&self, sample_id: u32) -> bool {
        self.pending.contains_key(&sample_id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drop every node and reset bookkeeping. The discipline setting is kept.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.pending.clear();
        self.next_seq = 0;
    }

    /// Pop every node in order.
    pub fn drain(&mut self) -> Drain<'_, R, S> {
        Drain { heap: self }
    }
}

/// Draining iterator returned by [`RecordHeap::drain`].
pub struct Drain<'a, R, S> {
    heap: &'a mut RecordHeap<R, S>,
}

impl<R, S> Iterator for Drain<'_, R, S> {
    type Item = Node<R, S>;

    fn next(&mut self) -> Option<Self::Item> {
        self.heap.try_pop()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.heap.len(), Some(self.heap.len()))
    }
}
