//! Reusable hit matrix buffers.
//!
//! Every 1600 ns tick works on its own [`HitMatrix`] value. The pool hands out
//! cleared buffers and takes them back once a tick frame has been consumed, so
//! the per-tick allocation goes away without a matrix ever being shared by two
//! ticks.

use tracing::trace;

use crate::matrix::HitMatrix;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Buffers created because the pool was empty
    pub allocated: usize,
    /// Buffers served from the pool
    pub reused: usize,
    /// Buffers dropped on release because the pool was full
    pub discarded: usize,
}

#[derive(Debug)]
pub struct MatrixPool {
    free: Vec<HitMatrix>,
    capacity: usize,
    stats: PoolStats,
}

impl MatrixPool {
    pub fn new(capacity: usize) -> Self {
        Self { free: Vec::with_capacity(capacity), capacity, stats: PoolStats::default() }
    }

    /// A cleared matrix, reused when one is available.
    pub fn acquire(&mut self) -> HitMatrix {
        match self.free.pop() {
            Some(matrix) => {
                self.stats.reused += 1;
                matrix
            }
            None => {
                self.stats.allocated += 1;
                trace!("allocating hit matrix #{}", self.stats.allocated);
                HitMatrix::new()
            }
        }
    }

    pub fn release(&mut self, mut matrix: HitMatrix) {
        if self.free.len() < self.capacity {
            matrix.clear();
            self.free.push(matrix);
        } else {
            self.stats.discarded += 1;
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.free.len()
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }
}

impl Default for MatrixPool {
    fn default() -> Self {
        Self::new(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_buffers_come_back_cleared() {
        let mut pool = MatrixPool::new(1);
        let mut m = pool.acquire();
        m.set(1, 4, 50).unwrap();
        pool.release(m);
        assert_eq!(pool.available(), 1);

        let again = pool.acquire();
        assert!(again.is_empty());
        assert_eq!(pool.stats(), PoolStats { allocated: 1, reused: 1, discarded: 0 });
    }

    #[test]
    fn full_pool_drops_extra_buffers() {
        let mut pool = MatrixPool::new(1);
        let a = pool.acquire();
        let b = pool.acquire();
        pool.release(a);
        pool.release(b);
        assert_eq!(pool.available(), 1);
        assert_eq!(pool.stats().discarded, 1);
        assert_eq!(pool.stats().allocated, 2);
    }
}
