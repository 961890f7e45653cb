//! Error types for the image cache

use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum CacheError {
    CreateDir(PathBuf, std::io::Error),
    Io(Box<std::io::Error>),
    Http(Box<reqwest::Error>),
    Status(reqwest::StatusCode),
    Download(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::CreateDir(path, err) => {
                write!(f, "Failed to create cache directory {:?}: {}", path, err)
            }
            CacheError::Io(err) => write!(f, "IO error: {}", err),
            CacheError::Http(err) => write!(f, "HTTP error: {}", err),
            CacheError::Status(status) => write!(f, "Server returned status {}", status),
            CacheError::Download(msg) => write!(f, "Download error: {}", msg),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::CreateDir(_, err) => Some(err),
            CacheError::Io(err) => Some(err.as_ref()),
            CacheError::Http(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Io(Box::new(err))
    }
}

impl From<reqwest::Error> for CacheError {
    fn from(err: reqwest::Error) -> Self {
        CacheError::Http(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_status_error_display() {
        let err = CacheError::Status(reqwest::StatusCode::NOT_FOUND);
        assert_eq!(format!("{}", err), "Server returned status 404 Not Found");
    }

    #[test]
    fn test_create_dir_error_has_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = CacheError::CreateDir(PathBuf::from("/ro/image-cache"), io);
        assert!(format!("{}", err).contains("image-cache"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_io_conversion() {
        let err: CacheError = std::io::Error::new(std::io::ErrorKind::Other, "disk full").into();
        assert!(matches!(err, CacheError::Io(_)));
        assert_eq!(format!("{}", err), "IO error: disk full");
    }

    #[test]
    fn test_error_is_debug() {
        let err = CacheError::Download("test".to_string());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("Download"));
    }
}
