//! Error type shared by the encoder, the compositor and the file helpers.

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can stop a QR code from being produced.
///
/// Every variant is terminal for the request that raised it: nothing is
/// written to disk once one of these is returned.
#[derive(Error, Debug)]
pub enum Error {
    /// The input cannot be carried by any segment mode (currently: it is empty).
    #[error("data cannot be encoded: {0}")]
    UnencodableData(&'static str),

    /// Even a version 40 symbol at the requested level is too small.
    #[error("data too large: {bits} bits needed, at most {capacity} bits available")]
    DataTooLarge { bits: usize, capacity: usize },

    /// The logo is missing, unreadable, or not a decodable image.
    #[error("logo could not be read{}: {reason}", display_path(.path))]
    LogoSourceUnreadable {
        path: Option<PathBuf>,
        reason: String,
    },

    /// The compositor was handed a matrix with no modules.
    #[error("cannot render an empty matrix")]
    EmptyMatrix,

    /// The output image could not be produced at the destination.
    #[error("could not write {}: {reason}", .path.display())]
    OutputWriteFailure { path: PathBuf, reason: String },
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!(" from {}", p.display()),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = Error::DataTooLarge { bits: 10212, capacity: 10208 };
        assert_eq!(err.to_string(), "data too large: 10212 bits needed, at most 10208 bits available");

        let err = Error::LogoSourceUnreadable {
            path: Some(PathBuf::from("logo.png")),
            reason: "not found".into(),
        };
        assert_eq!(err.to_string(), "logo could not be read from logo.png: not found");

        let err = Error::LogoSourceUnreadable { path: None, reason: "bad header".into() };
        assert_eq!(err.to_string(), "logo could not be read: bad header");
    }
}
