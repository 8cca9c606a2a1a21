/// A fixed-size ringbuffer
///
/// Once full, each push overwrites the oldest element.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    buffer: Vec<T>,
    ix: usize,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// **Panics** if `capacity` is zero
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "RingBuffer capacity must be nonzero");
        Self {
            buffer: Vec::<T>::with_capacity(capacity),
            ix: 0,
            capacity,
        }
    }

    /// Returns the buffer length
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert an element into the buffer, overwriting the oldest element, and return the write index
    pub fn push(&mut self, item: T) -> usize {
        let ix = self.ix;
        if ix >= self.len() {
            self.buffer.push(item);
        } else {
            self.buffer[ix] = item;
        }
        self.ix = (ix + 1) % self.capacity;
        ix
    }

    /// Get a slice view of the internal buffer, in storage order
    pub fn view(&self) -> &[T] {
        &self.buffer
    }

    /// Iterate over the elements from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        // Until the buffer wraps, `ix` equals the length and the first slice is empty
        let (newer, older) = self.buffer.split_at(self.ix.min(self.buffer.len()));
        older.iter().chain(newer.iter())
    }
}
