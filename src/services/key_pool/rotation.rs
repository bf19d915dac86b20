//! Round-robin rotation cursor
//!
//! The cursor is the only piece of shared selection state. Reading the
//! current position and advancing it happen in one atomic step, so two
//! concurrent selections can never observe the same stale value.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Shared round-robin position, always kept in `[0, len)`
#[derive(Debug)]
pub struct RotationCursor {
    position: AtomicUsize,
    len: usize,
}

impl RotationCursor {
    /// Create a cursor over `len` slots, starting at slot 0
    pub fn new(len: usize) -> Self {
        Self {
            position: AtomicUsize::new(0),
            len,
        }
    }

    /// Return the current slot and advance by one, wrapping at `len`
    pub fn advance(&self) -> usize {
        if self.len == 0 {
            return 0;
        }
        let len = self.len;
        // The closure always returns Some, so this never takes the Err arm.
        match self
            .position
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |pos| {
                Some((pos + 1) % len)
            }) {
            Ok(previous) | Err(previous) => previous,
        }
    }

    /// Slot the next call to [`advance`](Self::advance) will return
    pub fn peek(&self) -> usize {
        self.position.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[test]
    fn test_cursor_cycles_in_order() {
        let cursor = RotationCursor::new(3);
        assert_eq!(cursor.advance(), 0);
        assert_eq!(cursor.advance(), 1);
        assert_eq!(cursor.advance(), 2);
        assert_eq!(cursor.advance(), 0);
        assert_eq!(cursor.peek(), 1);
    }

    #[test]
    fn test_single_slot_always_zero() {
        let cursor = RotationCursor::new(1);
        for _ in 0..5 {
            assert_eq!(cursor.advance(), 0);
        }
    }

    #[test]
    fn test_concurrent_advances_cover_every_slot_evenly() {
        let cursor = Arc::new(RotationCursor::new(4));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cursor = Arc::clone(&cursor);
                std::thread::spawn(move || (0..100).map(|_| cursor.advance()).collect::<Vec<_>>())
            })
            .collect();

        let mut counts: HashMap<usize, usize> = HashMap::new();
        for handle in handles {
            for slot in handle.join().unwrap() {
                *counts.entry(slot).or_default() += 1;
            }
        }

        // 800 selections over 4 slots, none lost or duplicated
        assert_eq!(counts.len(), 4);
        assert!(counts.values().all(|&n| n == 200));
        assert_eq!(cursor.peek(), 0);
    }
}
