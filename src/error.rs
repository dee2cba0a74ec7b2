use std::path::PathBuf;

use thiserror::Error;

/// Recoverable failures raised by the viewer core.
///
/// Every component that can produce one of these also owns the fallback for
/// it, so none of them ever reaches the frame loop as a hard failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewerError {
    /// An asset, shader entry point or skybox face could not be located.
    #[error("{what} not found (searched: {})", join_paths(.searched))]
    NotFound { what: String, searched: Vec<PathBuf> },

    /// A skybox face is not square or differs in size from the first face.
    #[error(
        "skybox face {face} is {}x{}, expected {}x{}",
        .actual.0, .actual.1, .expected.0, .expected.1
    )]
    SizeMismatch {
        face: usize,
        actual: (u32, u32),
        expected: (u32, u32),
    },

    /// Bytes were found but could not be decoded.
    #[error("failed to decode {}: {reason}", .path.display())]
    DecodeFailure { path: PathBuf, reason: String },

    /// A pipeline could not be built for the requested shader pair.
    #[error("failed to build pipeline {key}: {reason}")]
    CompileFailure { key: String, reason: String },
}

impl ViewerError {
    pub fn not_found(what: impl Into<String>, searched: Vec<PathBuf>) -> Self {
        Self::NotFound {
            what: what.into(),
            searched,
        }
    }

    pub fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::DecodeFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns true for [`ViewerError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "nothing".to_string();
    }
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_mismatch_names_face_and_dimensions() {
        let err = ViewerError::SizeMismatch {
            face: 3,
            actual: (32, 32),
            expected: (64, 64),
        };
        assert_eq!(err.to_string(), "skybox face 3 is 32x32, expected 64x64");
    }

    #[test]
    fn not_found_lists_searched_paths() {
        let err = ViewerError::not_found(
            "mesh cube",
            vec![PathBuf::from("a/cube.obj"), PathBuf::from("cube.obj")],
        );
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "mesh cube not found (searched: a/cube.obj, cube.obj)"
        );
    }
}
