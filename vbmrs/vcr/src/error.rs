use std::{error::Error, io};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use thiserror::Error;
use vbmrs_movie::error::{BufferError, HeaderError};

/// Numeric outcome of a movie operation, as reported to frontends and scripts.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
pub enum ResultCode {
    Success = 0,
    FileNotFound = 1,
    WrongFormat = 2,
    WrongVersion = 3,
    UnknownError = 4,
    NotFromAMovie = 5,
    NotFromThisMovie = 6,
    SnapshotInconsistent = 7,
}

/// Error that may occur during a movie operation.
#[derive(Debug, Error)]
pub enum VcrError {
    /// The movie file could not be opened or created.
    #[error("movie file not found: {0}")]
    FileNotFound(#[source] io::Error),
    /// The file or savestate data is malformed.
    #[error("wrong format: {0}")]
    WrongFormat(&'static str),
    /// The movie was written by an incompatible version of the format.
    #[error("unsupported movie version {0}")]
    WrongVersion(u32),
    /// No game is running, so there is nothing to record or play back.
    #[error("the emulator is not running a game")]
    NotEmulating,
    /// The operation needs an active movie.
    #[error("no movie is active")]
    Inactive,
    /// The movie file could only be opened read-only.
    #[error("the movie file is not writable")]
    Locked,
    /// A savestate was loaded while no movie is active.
    #[error("savestate was not made during a movie")]
    NotFromAMovie,
    /// A savestate belongs to a different movie.
    #[error("savestate belongs to a different movie")]
    NotFromThisMovie,
    /// A savestate's input history contradicts the movie's.
    #[error("savestate is inconsistent with the movie's input history")]
    SnapshotInconsistent,
    /// The emulator failed to load or save its part of the movie.
    #[error("emulator error: {0}")]
    Emulator(#[source] Box<dyn Error + Send + Sync>),
    /// The movie file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
    #[error(transparent)]
    Buffer(#[from] BufferError),
}

impl VcrError {
    pub fn code(&self) -> ResultCode {
        match self {
            VcrError::FileNotFound(_) => ResultCode::FileNotFound,
            VcrError::WrongFormat(_) => ResultCode::WrongFormat,
            VcrError::WrongVersion(_) => ResultCode::WrongVersion,
            VcrError::NotFromAMovie => ResultCode::NotFromAMovie,
            VcrError::NotFromThisMovie => ResultCode::NotFromThisMovie,
            VcrError::SnapshotInconsistent => ResultCode::SnapshotInconsistent,
            VcrError::NotEmulating
            | VcrError::Inactive
            | VcrError::Locked
            | VcrError::Emulator(_)
            | VcrError::Io(_)
            | VcrError::Buffer(_) => ResultCode::UnknownError,
        }
    }
}

impl From<io::Error> for VcrError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<HeaderError> for VcrError {
    fn from(value: HeaderError) -> Self {
        match value {
            HeaderError::WrongFormat(reason) => Self::WrongFormat(reason),
            HeaderError::WrongVersion(version) => Self::WrongVersion(version),
            HeaderError::Io(err) => Self::Io(err),
        }
    }
}

/// Collapses an operation's result into its [`ResultCode`].
pub fn result_code<T>(result: &Result<T, VcrError>) -> ResultCode {
    match result {
        Ok(_) => ResultCode::Success,
        Err(err) => err.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(u32::from(ResultCode::SnapshotInconsistent), 7);
        assert_eq!(ResultCode::try_from(3u32).unwrap(), ResultCode::WrongVersion);
        assert!(ResultCode::try_from(8u32).is_err());

        let err: VcrError = HeaderError::WrongVersion(2).into();
        assert_eq!(err.code(), ResultCode::WrongVersion);
        assert_eq!(result_code::<()>(&Err(VcrError::Locked)), ResultCode::UnknownError);
        assert_eq!(result_code(&Ok(())), ResultCode::Success);
    }
}
