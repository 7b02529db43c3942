//! Scratch-buffer pooling for the coefficient arrays used throughout ring
//! arithmetic.
//!
//! Every NTT butterfly pass, RNS base conversion, and key-switching digit
//! decomposition needs a `Vec<u64>` of length `N` to work in. Allocating and
//! freeing one per call is wasteful at the degree and modulus counts this
//! scheme runs at, so callers borrow buffers from a [`Pool`] and return them
//! via RAII when the [`PooledBuffer`] guard drops.

use parking_lot::Mutex;

/// A source of reusable `Vec<u64>` scratch buffers.
///
/// Implementations only need to guarantee that a buffer returned by
/// `acquire` has length `>= capacity` and that `release` makes it eligible
/// for a future `acquire` call; they are free to clear, resize, or drop it
/// instead.
pub trait Pool: Send + Sync {
    fn acquire(&self, capacity: usize) -> Vec<u64>;
    fn release(&self, buffer: Vec<u64>);
}

/// Default [`Pool`]: a single freelist of same-shaped buffers behind a
/// mutex. Buffers whose capacity doesn't fit the request are dropped rather
/// than resized, since this scheme's callers only ever request one of a
/// handful of fixed sizes (`N` per modulus) for the lifetime of a context.
pub struct VecPool {
    free: Mutex<Vec<Vec<u64>>>,
}

impl VecPool {
    pub fn new() -> Self {
        VecPool {
            free: Mutex::new(Vec::new()),
        }
    }
}

impl Default for VecPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Pool for VecPool {
    fn acquire(&self, capacity: usize) -> Vec<u64> {
        let mut free = self.free.lock();
        if let Some(pos) = free.iter().position(|buf| buf.capacity() >= capacity) {
            let mut buf = free.swap_remove(pos);
            buf.clear();
            buf.resize(capacity, 0);
            return buf;
        }
        vec![0u64; capacity]
    }

    fn release(&self, buffer: Vec<u64>) {
        let mut free = self.free.lock();
        free.push(buffer);
    }
}

/// RAII guard returned by [`PoolExt::checkout`]: releases its buffer back to
/// the pool on drop, including on panic-driven unwind.
pub struct PooledBuffer<'a> {
    pool: &'a dyn Pool,
    buffer: Option<Vec<u64>>,
}

impl<'a> PooledBuffer<'a> {
    pub fn new(pool: &'a dyn Pool, capacity: usize) -> Self {
        PooledBuffer {
            pool,
            buffer: Some(pool.acquire(capacity)),
        }
    }

    pub fn as_slice(&self) -> &[u64] {
        self.buffer.as_deref().expect("buffer present until drop")
    }

    pub fn as_mut_slice(&mut self) -> &mut [u64] {
        self.buffer.as_deref_mut().expect("buffer present until drop")
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        if let Some(buf) = self.buffer.take() {
            self.pool.release(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_released_buffer() {
        let pool = VecPool::new();
        {
            let mut guard = PooledBuffer::new(&pool, 16);
            guard.as_mut_slice()[0] = 42;
        }
        let guard = PooledBuffer::new(&pool, 16);
        assert_eq!(guard.as_slice().len(), 16);
        assert_eq!(pool.free.lock().len(), 0);
    }

    #[test]
    fn acquire_zero_fills_new_buffer() {
        let pool = VecPool::new();
        let guard = PooledBuffer::new(&pool, 8);
        assert_eq!(guard.as_slice(), &[0u64; 8]);
    }
}
