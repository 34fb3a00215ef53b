/// Fixed-capacity circular buffer with FIFO eviction.
///
/// Storage is allocated once at construction and never grows. Elements are
/// written in place; once the ring is full, every push overwrites the oldest
/// slot and advances `head`.
#[derive(Debug, Clone)]
pub struct BoundedRing<T> {
    buf: Vec<T>,
    cap: usize,
    /// Slot of the oldest element. Stays 0 until the first eviction.
    head: usize,
}

impl<T> BoundedRing<T> {
    pub fn new(cap: usize) -> Self {
        assert!(cap > 0, "ring capacity must be >= 1");
        Self {
            buf: Vec::with_capacity(cap),
            cap,
            head: 0,
        }
    }

    /// Append `value`, evicting and returning the oldest element if the ring is full.
    pub fn push_back_forced(&mut self, value: T) -> Option<T> {
        if self.buf.len() < self.cap {
            self.buf.push(value);
            return None;
        }
        let evicted = std::mem::replace(&mut self.buf[self.head], value);
        self.head = (self.head + 1) % self.cap;
        Some(evicted)
    }

    /// Oldest element.
    pub fn front(&self) -> Option<&T> {
        self.buf.get(self.head)
    }

    /// Newest element.
    pub fn back(&self) -> Option<&T> {
        if self.buf.is_empty() {
            return None;
        }
        self.buf.get((self.head + self.buf.len() - 1) % self.cap)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn full(&self) -> bool {
        self.buf.len() == self.cap
    }

    /// Held elements as `(older, newer)` contiguous halves; `newer` continues
    /// where `older` ends.
    pub fn as_slices(&self) -> (&[T], &[T]) {
        let (newer, older) = self.buf.split_at(self.head);
        (older, newer)
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let (older, newer) = self.as_slices();
        older.iter().chain(newer.iter())
    }

    /// Copy all held elements, oldest first, into `dst` and return how many were copied.
    ///
    /// `dst` must be at least `cap()` long.
    pub fn copy_into(&self, dst: &mut [T]) -> usize
    where
        T: Clone,
    {
        assert!(
            dst.len() >= self.cap,
            "destination length {} is less than ring capacity {}",
            dst.len(),
            self.cap
        );
        let (older, newer) = self.as_slices();
        dst[..older.len()].clone_from_slice(older);
        dst[older.len()..older.len() + newer.len()].clone_from_slice(newer);
        self.buf.len()
    }
}
