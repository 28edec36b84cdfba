//! Atomic access controller: per-slot word storage with no-tear guarantees.
//!
//! Every slot occupies whole 64-bit words. A read returns either a
//! fully-completed write or the initial fill, never a mix:
//!
//! - `FlatAtomic` within one word, and `Boxed` handles: one atomic
//!   load/store.
//! - `FlatAtomic` wider than one word: a per-slot sequence lock. A writer
//!   takes the sequence odd with a CAS (writers serialize here), stores
//!   the words, and publishes with an even release store. A reader retries
//!   until it sees the same even sequence on both sides of its copy.
//!   Retries are bounded by writer progress, never by reader count.
//! - `FlatNonAtomic`: relaxed per-word copies; tearing across words under
//!   concurrent writes is accepted, documented behavior.
//!
//! No errors are raised here; bounds and null-restriction checks live one
//! layer up.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use velt_types::LayoutKind;

/// Fixed-stride word storage for one container's slots.
#[derive(Debug)]
pub struct SlotBlock {
    kind: LayoutKind,
    words_per_slot: usize,
    words: Vec<AtomicU64>,
    /// One sequence counter per slot; empty unless the wide atomic path
    /// is in use.
    seqs: Vec<AtomicU32>,
}

impl SlotBlock {
    /// Allocate zeroed storage for `len` slots.
    pub fn new(kind: LayoutKind, words_per_slot: usize, len: usize) -> Self {
        let wide_atomic = matches!(kind, LayoutKind::FlatAtomic) && words_per_slot > 1;
        Self {
            kind,
            words_per_slot,
            words: (0..len * words_per_slot).map(|_| AtomicU64::new(0)).collect(),
            seqs: if wide_atomic {
                (0..len).map(|_| AtomicU32::new(0)).collect()
            } else {
                Vec::new()
            },
        }
    }

    /// Words one slot occupies. Zero for empty payloads.
    #[inline]
    pub fn words_per_slot(&self) -> usize {
        self.words_per_slot
    }

    /// Read one slot into `out`. `out.len()` must equal `words_per_slot`.
    pub fn read(&self, slot: usize, out: &mut [u64]) {
        debug_assert_eq!(out.len(), self.words_per_slot);
        if self.words_per_slot == 0 {
            return;
        }
        let base = slot * self.words_per_slot;
        match self.kind {
            LayoutKind::Boxed => out[0] = self.words[base].load(Ordering::Acquire),
            LayoutKind::FlatAtomic if self.words_per_slot == 1 => {
                out[0] = self.words[base].load(Ordering::Acquire);
            }
            LayoutKind::FlatAtomic => self.read_wide(slot, base, out),
            LayoutKind::FlatNonAtomic => {
                for (i, word) in out.iter_mut().enumerate() {
                    *word = self.words[base + i].load(Ordering::Relaxed);
                }
            }
        }
    }

    /// Write one slot from `src`. `src.len()` must equal `words_per_slot`.
    pub fn write(&self, slot: usize, src: &[u64]) {
        debug_assert_eq!(src.len(), self.words_per_slot);
        if self.words_per_slot == 0 {
            return;
        }
        let base = slot * self.words_per_slot;
        match self.kind {
            LayoutKind::Boxed => self.words[base].store(src[0], Ordering::Release),
            LayoutKind::FlatAtomic if self.words_per_slot == 1 => {
                self.words[base].store(src[0], Ordering::Release);
            }
            LayoutKind::FlatAtomic => self.write_wide(slot, base, src),
            LayoutKind::FlatNonAtomic => {
                for (i, word) in src.iter().enumerate() {
                    self.words[base + i].store(*word, Ordering::Relaxed);
                }
            }
        }
    }

    /// Seqlock read: retry until the sequence is even and unchanged across
    /// the word copy.
    fn read_wide(&self, slot: usize, base: usize, out: &mut [u64]) {
        let seq = &self.seqs[slot];
        loop {
            let before = seq.load(Ordering::Acquire);
            if before & 1 == 1 {
                std::hint::spin_loop();
                continue;
            }
            for (i, word) in out.iter_mut().enumerate() {
                *word = self.words[base + i].load(Ordering::Acquire);
            }
            if seq.load(Ordering::Acquire) == before {
                return;
            }
            std::hint::spin_loop();
        }
    }

    /// Seqlock write: take the sequence odd (serializing writers), store
    /// the words, publish with an even release store.
    fn write_wide(&self, slot: usize, base: usize, src: &[u64]) {
        let seq = &self.seqs[slot];
        let mut current = seq.load(Ordering::Relaxed);
        loop {
            if current & 1 == 1 {
                std::hint::spin_loop();
                current = seq.load(Ordering::Relaxed);
                continue;
            }
            match seq.compare_exchange_weak(
                current,
                current + 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
        for (i, word) in src.iter().enumerate() {
            self.words[base + i].store(*word, Ordering::Release);
        }
        seq.store(current + 2, Ordering::Release);
    }
}

#[cfg(test)]
mod tests;
