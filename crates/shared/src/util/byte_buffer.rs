// ByteBuffer - little-endian binary reader/writer
// Used for the packed navmesh resources

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// A growable byte buffer with an independent read cursor.
#[derive(Debug, Clone, Default)]
pub struct ByteBuffer {
    data: Vec<u8>,
    read_pos: usize,
}

impl ByteBuffer {
    /// Create a new empty ByteBuffer
    pub fn new() -> Self {
        ByteBuffer {
            data: Vec::new(),
            read_pos: 0,
        }
    }

    /// Create with a pre-allocated capacity
    pub fn with_capacity(capacity: usize) -> Self {
        ByteBuffer {
            data: Vec::with_capacity(capacity),
            read_pos: 0,
        }
    }

    /// Wrap existing bytes for reading
    pub fn from_bytes(data: Vec<u8>) -> Self {
        ByteBuffer { data, read_pos: 0 }
    }

    /// Get the current size of the buffer
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn read_pos(&self) -> usize {
        self.read_pos
    }

    /// Bytes left between the read cursor and the end
    pub fn remaining(&self) -> usize {
        self.data.len() - self.read_pos
    }

    pub fn contents(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    // ---- Write operations (append) ----

    pub fn write_u32(&mut self, val: u32) {
        let mut bytes = [0; 4];
        LittleEndian::write_u32(&mut bytes, val);
        self.data.extend_from_slice(&bytes);
    }

    pub fn write_i32(&mut self, val: i32) {
        let mut bytes = [0; 4];
        LittleEndian::write_i32(&mut bytes, val);
        self.data.extend_from_slice(&bytes);
    }

    pub fn write_f32(&mut self, val: f32) {
        let mut bytes = [0; 4];
        LittleEndian::write_f32(&mut bytes, val);
        self.data.extend_from_slice(&bytes);
    }

    // ---- Read operations ----

    fn cursor(&self, width: usize) -> Result<Cursor<&[u8]>, std::io::Error> {
        if self.read_pos + width > self.data.len() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "ByteBuffer read of {} bytes past end (rpos={}, size={})",
                    width,
                    self.read_pos,
                    self.data.len()
                ),
            ));
        }
        Ok(Cursor::new(&self.data[self.read_pos..]))
    }

    pub fn read_u32(&mut self) -> Result<u32, std::io::Error> {
        let val = self.cursor(4)?.read_u32::<LittleEndian>()?;
        self.read_pos += 4;
        Ok(val)
    }

    pub fn read_i32(&mut self) -> Result<i32, std::io::Error> {
        let val = self.cursor(4)?.read_i32::<LittleEndian>()?;
        self.read_pos += 4;
        Ok(val)
    }

    pub fn read_f32(&mut self) -> Result<f32, std::io::Error> {
        let val = self.cursor(4)?.read_f32::<LittleEndian>()?;
        self.read_pos += 4;
        Ok(val)
    }

    /// Move the read cursor to an absolute position (clamped to the end)
    pub fn set_read_pos(&mut self, pos: usize) {
        self.read_pos = pos.min(self.data.len());
    }

    /// Skip N bytes in the read position
    pub fn read_skip(&mut self, count: usize) {
        self.read_pos = (self.read_pos + count).min(self.data.len());
    }
}

impl std::fmt::Display for ByteBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ByteBuffer(size={}, rpos={})", self.size(), self.read_pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_mixed() {
        let mut buf = ByteBuffer::new();
        buf.write_i32(-7);
        buf.write_f32(0.5);
        buf.write_u32(65535);
        assert_eq!(buf.size(), 12);
        assert_eq!(buf.read_i32().unwrap(), -7);
        assert_eq!(buf.read_f32().unwrap(), 0.5);
        assert_eq!(buf.read_u32().unwrap(), 65535);
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn test_writes_are_little_endian() {
        let mut buf = ByteBuffer::new();
        buf.write_u32(0x0403_0201);
        buf.write_i32(-2);
        buf.write_f32(1.0);
        assert_eq!(
            buf.contents(),
            &[1, 2, 3, 4, 0xfe, 0xff, 0xff, 0xff, 0, 0, 0x80, 0x3f]
        );
    }

    #[test]
    fn test_read_past_end() {
        let mut buf = ByteBuffer::from_bytes(vec![1, 2, 3]);
        let err = buf.read_u32().unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
        assert_eq!(buf.read_pos(), 0);
    }

    #[test]
    fn test_skip_and_seek() {
        let mut buf = ByteBuffer::from_bytes(vec![0, 0, 0, 0, 9, 0, 0, 0]);
        buf.read_skip(4);
        assert_eq!(buf.read_u32().unwrap(), 9);
        buf.set_read_pos(100);
        assert_eq!(buf.remaining(), 0);
    }
}
