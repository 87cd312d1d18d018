//! Fixed-capacity output buffers for embedders
//!
//! Embedders that hand in a caller-allocated buffer get the text plus a NUL
//! terminator, or the length they need to retry with. Nothing is written
//! when the buffer is too small.

/// Outcome of copying text into a caller buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferWrite {
    /// Text written; the value excludes the NUL terminator
    Written(usize),
    /// Buffer too small; `required` includes the NUL terminator
    Insufficient { required: usize },
}

impl BufferWrite {
    /// Bytes needed (or used) including the terminator
    pub fn required(&self) -> usize {
        match *self {
            BufferWrite::Written(len) => len + 1,
            BufferWrite::Insufficient { required } => required,
        }
    }

    /// Whether the copy happened
    pub fn is_written(&self) -> bool {
        matches!(self, BufferWrite::Written(_))
    }
}

/// Copy `text` and a NUL terminator into `buffer`
pub fn copy_to_buffer(text: &str, buffer: &mut [u8]) -> BufferWrite {
    let bytes = text.as_bytes();
    let required = bytes.len() + 1;
    if buffer.len() < required {
        return BufferWrite::Insufficient { required };
    }
    buffer[..bytes.len()].copy_from_slice(bytes);
    buffer[bytes.len()] = 0;
    BufferWrite::Written(bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fits() {
        let mut buf = [0xAAu8; 8];
        assert_eq!(copy_to_buffer("abc", &mut buf), BufferWrite::Written(3));
        assert_eq!(&buf[..4], b"abc\0");
        assert_eq!(buf[4], 0xAA);
    }

    #[test]
    fn test_exact_fit_needs_terminator() {
        let mut buf = [0xAAu8; 3];
        let result = copy_to_buffer("abc", &mut buf);
        assert_eq!(result, BufferWrite::Insufficient { required: 4 });
        assert_eq!(buf, [0xAA; 3]);
    }

    #[test]
    fn test_zero_capacity() {
        let mut buf: [u8; 0] = [];
        let result = copy_to_buffer("", &mut buf);
        assert_eq!(result.required(), 1);
        assert!(!result.is_written());
    }
}
