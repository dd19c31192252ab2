use crate::geometry::GeometryError;
use std::io;
use thiserror::Error;

/// Category of a [`StreamError`], one per failure class of the stream contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    DeviceOpen,
    GeometryQuery,
    Read,
    OutOfRange,
    NotSupported,
    InvalidState,
}

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Cannot open device {path}: {source}")]
    DeviceOpen {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Geometry query failed for {path}: {source}")]
    GeometryQuery {
        path: String,
        #[source]
        source: GeometryError,
    },

    #[error("Read error at offset {offset}: {source}")]
    Read {
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("Short read at offset {offset}: expected {expected} bytes, got {actual}")]
    ShortRead {
        offset: u64,
        expected: usize,
        actual: usize,
    },

    #[error("Offset {target} is out of range (length: {length})")]
    OutOfRange { target: i128, length: u64 },

    #[error("{0} is not supported on a read-only stream")]
    NotSupported(&'static str),

    #[error("Stream is closed")]
    InvalidState,
}

impl StreamError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StreamError::DeviceOpen { .. } => ErrorKind::DeviceOpen,
            StreamError::GeometryQuery { .. } => ErrorKind::GeometryQuery,
            StreamError::Read { .. } | StreamError::ShortRead { .. } => ErrorKind::Read,
            StreamError::OutOfRange { .. } => ErrorKind::OutOfRange,
            StreamError::NotSupported(_) => ErrorKind::NotSupported,
            StreamError::InvalidState => ErrorKind::InvalidState,
        }
    }

    pub fn geometry_query(path: impl Into<String>, source: GeometryError) -> Self {
        StreamError::GeometryQuery {
            path: path.into(),
            source,
        }
    }
}

impl From<StreamError> for io::Error {
    fn from(err: StreamError) -> Self {
        let kind = match &err {
            StreamError::DeviceOpen { source, .. } | StreamError::Read { source, .. } => {
                source.kind()
            }
            StreamError::GeometryQuery { .. } => io::ErrorKind::Other,
            StreamError::ShortRead { .. } => io::ErrorKind::UnexpectedEof,
            StreamError::OutOfRange { .. } => io::ErrorKind::InvalidInput,
            StreamError::NotSupported(_) => io::ErrorKind::Unsupported,
            StreamError::InvalidState => io::ErrorKind::NotConnected,
        };
        io::Error::new(kind, err)
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_read_is_read_kind() {
        let err = StreamError::ShortRead {
            offset: 512,
            expected: 512,
            actual: 100,
        };
        assert_eq!(err.kind(), ErrorKind::Read);
        assert!(err.to_string().contains("expected 512 bytes, got 100"));
    }

    #[test]
    fn test_io_error_conversion_kinds() {
        let out_of_range: io::Error = StreamError::OutOfRange {
            target: -1,
            length: 1024,
        }
        .into();
        assert_eq!(out_of_range.kind(), io::ErrorKind::InvalidInput);

        let closed: io::Error = StreamError::InvalidState.into();
        assert_eq!(closed.kind(), io::ErrorKind::NotConnected);

        let write: io::Error = StreamError::NotSupported("write").into();
        assert_eq!(write.kind(), io::ErrorKind::Unsupported);
    }

    #[test]
    fn test_read_error_keeps_source_kind() {
        let err: io::Error = StreamError::Read {
            offset: 0,
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        }
        .into();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }
}
