use crate::{
    error::BufferError,
    sample::{Sample, SAMPLE_SIZE},
};

/// Allocation granularity of [`FrameBuffer`].
pub const BUFFER_GROWTH_SIZE: usize = 4096;

/// Growable byte buffer holding a movie's controller data, with a read/write cursor.
///
/// Capacity only grows in whole [`BUFFER_GROWTH_SIZE`] chunks, so recording one
/// frame at a time reallocates rarely. Every access through the cursor is
/// checked against the capacity.
#[derive(Debug, Clone, Default)]
pub struct FrameBuffer {
    data: Vec<u8>,
    cursor: usize,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes currently allocated.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Offset of the cursor from the start of the buffer.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Moves the cursor. Positions past the capacity are allowed; accesses there fail.
    pub fn seek(&mut self, offset: usize) {
        self.cursor = offset;
    }

    /// Ensures at least `space_needed` bytes are allocated.
    pub fn reserve(&mut self, space_needed: usize) {
        if space_needed > self.data.len() {
            let alloc_chunks = space_needed.div_ceil(BUFFER_GROWTH_SIZE);
            self.data.resize(alloc_chunks * BUFFER_GROWTH_SIZE, 0);
        }
    }

    /// The first `len` bytes, or `None` if fewer are allocated.
    pub fn slice(&self, len: usize) -> Option<&[u8]> {
        self.data.get(..len)
    }

    pub fn slice_mut(&mut self, len: usize) -> Option<&mut [u8]> {
        self.data.get_mut(..len)
    }

    /// Replaces the start of the buffer with `src`, growing as needed.
    pub fn copy_from(&mut self, src: &[u8]) {
        self.reserve(src.len());
        self.data[..src.len()].copy_from_slice(src);
    }

    /// Reads the sample under the cursor and advances past it.
    pub fn read_sample(&mut self) -> Result<Sample, BufferError> {
        let bytes = self
            .data
            .get(self.cursor..self.cursor + SAMPLE_SIZE)
            .ok_or(self.overrun())?;
        let sample = Sample::from_le_bytes([bytes[0], bytes[1]]);
        self.cursor += SAMPLE_SIZE;
        Ok(sample)
    }

    /// Writes a sample at the cursor and advances past it.
    pub fn write_sample(&mut self, sample: Sample) -> Result<(), BufferError> {
        let overrun = self.overrun();
        let dst = self
            .data
            .get_mut(self.cursor..self.cursor + SAMPLE_SIZE)
            .ok_or(overrun)?;
        dst.copy_from_slice(&sample.to_le_bytes());
        self.cursor += SAMPLE_SIZE;
        Ok(())
    }

    /// Releases the allocation and rewinds the cursor.
    pub fn clear(&mut self) {
        self.data = Vec::new();
        self.cursor = 0;
    }

    fn overrun(&self) -> BufferError {
        BufferError {
            offset: self.cursor,
            capacity: self.data.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_rounds_to_chunk() {
        let mut buffer = FrameBuffer::new();
        buffer.reserve(1);
        assert_eq!(buffer.capacity(), BUFFER_GROWTH_SIZE);
        buffer.reserve(BUFFER_GROWTH_SIZE + 1);
        assert_eq!(buffer.capacity(), 2 * BUFFER_GROWTH_SIZE);
        buffer.reserve(3 * BUFFER_GROWTH_SIZE);
        assert_eq!(buffer.capacity(), 3 * BUFFER_GROWTH_SIZE);
    }

    #[test]
    fn test_reserve_within_capacity_is_noop() {
        let mut buffer = FrameBuffer::new();
        buffer.reserve(100);
        let ptr = buffer.slice(1).unwrap().as_ptr();
        buffer.reserve(BUFFER_GROWTH_SIZE);
        assert_eq!(buffer.capacity(), BUFFER_GROWTH_SIZE);
        assert_eq!(buffer.slice(1).unwrap().as_ptr(), ptr);
    }

    #[test]
    fn test_growth_preserves_data_and_cursor() {
        let mut buffer = FrameBuffer::new();
        buffer.reserve(4);
        buffer.write_sample(Sample::A).unwrap();
        buffer.write_sample(Sample::B | Sample::OLD_RESET).unwrap();
        buffer.reserve(BUFFER_GROWTH_SIZE * 2 + 7);
        assert_eq!(buffer.position(), 4);
        assert_eq!(buffer.slice(4).unwrap(), &[0x01, 0x00, 0x02, 0x08]);
    }

    #[test]
    fn test_cursor_is_bounds_checked() {
        let mut buffer = FrameBuffer::new();
        assert!(buffer.read_sample().is_err());
        buffer.reserve(2);
        buffer.seek(BUFFER_GROWTH_SIZE - 1);
        let err = buffer.write_sample(Sample::A).unwrap_err();
        assert_eq!(err.offset, BUFFER_GROWTH_SIZE - 1);
        assert_eq!(err.capacity, BUFFER_GROWTH_SIZE);
        // a failed access doesn't move the cursor
        assert_eq!(buffer.position(), BUFFER_GROWTH_SIZE - 1);
    }

    #[test]
    fn test_read_back() {
        let mut buffer = FrameBuffer::new();
        buffer.copy_from(&[0x10, 0x00, 0x00, 0x10]);
        assert_eq!(buffer.read_sample().unwrap(), Sample::RIGHT);
        assert_eq!(buffer.read_sample().unwrap(), Sample::LEFT_MOTION);
    }
}
