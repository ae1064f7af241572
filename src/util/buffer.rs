//! Buffer management for media data

use bytes::Bytes;

/// A reference-counted, immutable buffer for media data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buffer {
    data: Bytes,
}

impl Buffer {
    /// Create a new buffer from bytes
    pub fn new(data: Bytes) -> Self {
        Buffer { data }
    }

    /// Create a buffer from a vector
    pub fn from_vec(vec: Vec<u8>) -> Self {
        Buffer {
            data: Bytes::from(vec),
        }
    }

    /// Create a buffer by copying a slice (e.g. memory owned by a C library)
    pub fn copy_from_slice(slice: &[u8]) -> Self {
        Buffer {
            data: Bytes::copy_from_slice(slice),
        }
    }

    /// Create a buffer holding interleaved little-endian f32 samples
    pub fn from_f32_samples(samples: &[f32]) -> Self {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        Buffer::from_vec(bytes)
    }

    /// Create an empty buffer
    pub fn empty() -> Self {
        Buffer { data: Bytes::new() }
    }

    /// Get the length of the buffer
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get a slice of the buffer data
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Clone the bytes (cheap, reference counted)
    pub fn clone_bytes(&self) -> Bytes {
        self.data.clone()
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(vec: Vec<u8>) -> Self {
        Buffer::from_vec(vec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_creation() {
        let buf = Buffer::from_vec(vec![1, 2, 3, 4]);
        assert_eq!(buf.len(), 4);
        assert_eq!(buf.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_buffer_empty() {
        let buf = Buffer::empty();
        assert!(buf.is_empty());
    }

    #[test]
    fn test_buffer_from_f32() {
        let buf = Buffer::from_f32_samples(&[1.0, -0.5]);
        assert_eq!(buf.len(), 8);
        assert_eq!(&buf.as_slice()[0..4], &1.0f32.to_le_bytes());
        assert_eq!(&buf.as_slice()[4..8], &(-0.5f32).to_le_bytes());
    }
}
