use std::{io, str::Utf8Error};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StringFieldError {
    #[error("UTF-8 validation of field failed")]
    Utf8Invalid(#[source] Utf8Error),
    #[error("Value is too long, max length is {max_len} bytes")]
    FieldTooLong { max_len: usize },
}

/// Error that may occur while decoding a `.vbm` header.
#[derive(Debug, Error)]
pub enum HeaderError {
    /// The data is too short or does not carry the VBM signature.
    #[error(".vbm: {0}")]
    WrongFormat(&'static str),
    /// The header is a VBM header, but of a version this crate doesn't read.
    #[error(".vbm: unsupported version {0}")]
    WrongVersion(u32),
    /// The underlying stream failed.
    #[error(".vbm: I/O error: {0}")]
    Io(#[source] io::Error),
}

impl From<io::Error> for HeaderError {
    fn from(value: io::Error) -> Self {
        match value.kind() {
            io::ErrorKind::UnexpectedEof => Self::WrongFormat("header is truncated"),
            _ => Self::Io(value),
        }
    }
}

/// Error raised by the bounds-checked frame buffer cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("frame buffer overrun: access at {offset} exceeds capacity {capacity}")]
pub struct BufferError {
    pub offset: usize,
    pub capacity: usize,
}
