//! Bounded single-producer/single-consumer frame ring.
//!
//! Deliberately hand-rolled rather than wrapping a generic lock-free crate:
//! the consumer (the priority-75 audio writer) must never touch a mutex, so
//! `pop` is pure atomic load/store. The producer (the MP3 decoder thread, at
//! default priority) is allowed to block, and does so with a short sleep
//! backoff rather than a condvar — nothing on the consumer side ever needs
//! to wake it, it just needs to notice the tail has moved.

use crate::signal::StopFlag;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const BACKOFF: Duration = Duration::from_millis(1);

/// Fixed-capacity interleaved-PCM ring. Capacity is in frames; the backing
/// store holds `capacity_frames * channels` samples.
///
/// The backing store is `UnsafeCell`-wrapped rather than a plain
/// `Box<[i16]>` so the producer's and consumer's disjoint-region writes and
/// reads through `&self` are an explicit, sound interior-mutability story
/// instead of a raw pointer cast over an ordinary shared reference — the
/// head/tail protocol (not the type system) is what keeps the two sides'
/// index ranges disjoint at any instant.
pub struct RingBuffer {
    data: Box<[UnsafeCell<i16>]>,
    capacity_frames: usize,
    channels: usize,
    head: AtomicUsize,
    tail: AtomicUsize,
}

impl RingBuffer {
    pub fn new(capacity_frames: usize, channels: usize) -> Self {
        let capacity_frames = capacity_frames.next_power_of_two();
        let data = (0..capacity_frames * channels)
            .map(|_| UnsafeCell::new(0i16))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            data,
            capacity_frames,
            channels,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    fn mask(&self) -> usize {
        self.capacity_frames - 1
    }

    /// Frames currently available to the consumer.
    pub fn available_frames(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head - tail
    }

    fn free_frames(&self, head: usize, tail: usize) -> usize {
        self.capacity_frames - (head - tail)
    }

    /// Blocking producer-side push of exactly `frames.len() / channels`
    /// frames. Blocks while the ring is full, waking periodically to check
    /// `stop`. Returns the number of frames actually written — short only
    /// when `stop` was observed mid-wait.
    pub fn push(&self, frames: &[i16], stop: &StopFlag) -> usize {
        debug_assert_eq!(frames.len() % self.channels, 0);
        let total = frames.len() / self.channels;
        let mut written = 0;

        while written < total {
            let head = self.head.load(Ordering::Relaxed);
            let tail = self.tail.load(Ordering::Acquire);
            let free = self.free_frames(head, tail);
            if free == 0 {
                if stop.is_set() {
                    return written;
                }
                std::thread::sleep(BACKOFF);
                continue;
            }

            let to_write = (total - written).min(free);
            for i in 0..to_write {
                let src_frame = written + i;
                let dst_frame = (head + i) & self.mask();
                for ch in 0..self.channels {
                    // SAFETY: only the producer ever writes, and `free > 0`
                    // here guarantees this slot is outside the consumer's
                    // current `[tail, head)` window.
                    unsafe {
                        *self.data[dst_frame * self.channels + ch].get() =
                            frames[src_frame * self.channels + ch];
                    }
                }
            }
            written += to_write;
            self.head.store(head + to_write, Ordering::Release);
        }
        written
    }

    /// Non-blocking consumer-side pop of up to `out.len() / channels` frames.
    /// Returns the number of frames copied.
    pub fn pop(&self, out: &mut [i16]) -> usize {
        debug_assert_eq!(out.len() % self.channels, 0);
        let requested = out.len() / self.channels;

        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        let available = head - tail;
        let to_read = requested.min(available);

        for i in 0..to_read {
            let src_frame = (tail + i) & self.mask();
            for ch in 0..self.channels {
                // SAFETY: only the consumer ever reads, and `to_read <=
                // available` here guarantees this slot is inside the
                // producer-published `[tail, head)` window and will not be
                // overwritten until `tail` itself advances below.
                out[i * self.channels + ch] = unsafe { *self.data[src_frame * self.channels + ch].get() };
            }
        }
        self.tail.store(tail + to_read, Ordering::Release);
        to_read
    }
}

// SAFETY: `UnsafeCell<i16>` makes `data` (and so `RingBuffer`) `!Sync` by
// default; this impl is what lets the type cross the thread boundary at
// all. It's sound because exactly one producer thread calls `push`, one
// consumer thread calls `pop`, and the atomic head/tail pair with
// acquire/release ordering is the sole synchronization, matching the SPSC
// contract — the two sides' index ranges never overlap at a given instant.
unsafe impl Sync for RingBuffer {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn fifo_order_is_preserved_across_wraparound() {
        let ring = RingBuffer::new(4, 2); // capacity rounds to 4 frames
        let stop = StopFlag::new();

        let a: Vec<i16> = (0..6).collect(); // 3 frames
        assert_eq!(ring.push(&a, &stop), 3);

        let mut out = vec![0i16; 4]; // 2 frames
        assert_eq!(ring.pop(&mut out), 2);
        assert_eq!(out, &a[0..4]);

        let b: Vec<i16> = (100..106).collect(); // 3 more frames
        assert_eq!(ring.push(&b, &stop), 3);

        let mut rest = vec![0i16; 8]; // up to 4 frames available
        let n = ring.pop(&mut rest);
        assert_eq!(n, 4);
        assert_eq!(&rest[0..2], &a[4..6]);
        assert_eq!(&rest[2..8], &b[0..6]);
    }

    #[test]
    fn pop_is_non_blocking_when_empty() {
        let ring = RingBuffer::new(4, 2);
        let mut out = vec![0i16; 4];
        assert_eq!(ring.pop(&mut out), 0);
    }

    #[test]
    fn available_frames_tracks_head_minus_tail() {
        let ring = RingBuffer::new(8, 1);
        let stop = StopFlag::new();
        ring.push(&[1, 2, 3], &stop);
        assert_eq!(ring.available_frames(), 3);
        let mut out = [0i16; 2];
        ring.pop(&mut out);
        assert_eq!(ring.available_frames(), 1);
    }

    #[test]
    fn push_unblocks_when_stop_flag_is_set() {
        let ring = Arc::new(RingBuffer::new(2, 1));
        let stop = StopFlag::new();
        // fill the ring
        assert_eq!(ring.push(&[1, 2], &stop), 2);
        stop.set();
        // further push can't fit and must return early, not hang.
        let written = ring.push(&[3], &stop);
        assert_eq!(written, 0);
    }
}
