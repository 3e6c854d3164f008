/// Byte sink that the binary encoder and the hasher write into
///
/// `Target` plays the role of [`std::io::Write`] for in-memory encoding, with
/// the difference that every `push_XXX` method is infallible and total. The
/// returned `usize` is the number of bytes appended, used by callers only for
/// book-keeping, never as a signal of partial success.
///
/// All implementors must define these methods as infallible and total.
pub trait Target {
    /// Hints that at least `extra` more bytes are about to be pushed
    ///
    /// Sinks with a notion of capacity can use this to amortize
    /// re-allocation; for all others it is a no-op. It may be called with only
    /// partial information, and further calls should be expected.
    fn anticipate(&mut self, extra: usize);

    /// Returns a fresh, empty sink
    fn create() -> Self;

    /// Appends a single byte, returning `1`
    fn push_one(&mut self, b: u8) -> usize;

    /// Appends the bytes of a known-length array, returning `N`
    ///
    /// Indistinguishable in effect from calling `push_one` on every element in
    /// order.
    fn push_many<const N: usize>(&mut self, arr: [u8; N]) -> usize;

    /// Appends the bytes of a slice, returning its length
    ///
    /// For a slice borrowed from an array `arr` in local scope,
    /// `x.push_all(&arr)` must be equivalent to `x.push_many(arr)`.
    fn push_all(&mut self, buf: &[u8]) -> usize;
}

/// Sink that only counts the bytes pushed into it
///
/// Used to compute the exact length of a binary encoding without
/// allocating.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ByteCounter {
    count: usize,
}

impl ByteCounter {
    /// Total number of bytes pushed so far
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }
}

impl Target for ByteCounter {
    #[inline(always)]
    fn anticipate(&mut self, _: usize) {}

    #[inline]
    fn create() -> Self {
        Self::default()
    }

    #[inline(always)]
    fn push_one(&mut self, _: u8) -> usize {
        self.count += 1;
        1
    }

    #[inline(always)]
    fn push_many<const N: usize>(&mut self, _: [u8; N]) -> usize {
        self.count += N;
        N
    }

    #[inline(always)]
    fn push_all(&mut self, buf: &[u8]) -> usize {
        self.count += buf.len();
        buf.len()
    }
}

impl Target for Vec<u8> {
    #[inline]
    fn anticipate(&mut self, extra: usize) {
        self.reserve(extra)
    }

    #[inline]
    fn create() -> Self {
        Self::new()
    }

    #[inline]
    fn push_one(&mut self, b: u8) -> usize {
        self.push(b);
        1
    }

    #[inline]
    fn push_many<const N: usize>(&mut self, arr: [u8; N]) -> usize {
        self.extend_from_slice(&arr);
        N
    }

    #[inline]
    fn push_all(&mut self, buf: &[u8]) -> usize {
        self.extend_from_slice(buf);
        buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_fixture<T: Target>(dest: &mut T) -> usize {
        dest.push_one(0xcc) + dest.push_many([0x00, 0x01]) + dest.push_all(b"hi")
    }

    #[test]
    fn counter_agrees_with_vec() {
        let mut counter = ByteCounter::create();
        let mut buf = Vec::create();
        let n = push_fixture(&mut counter);
        assert_eq!(push_fixture(&mut buf), n);
        assert_eq!(counter.count(), buf.len());
        assert_eq!(buf, [0xcc, 0x00, 0x01, b'h', b'i']);
    }
}
