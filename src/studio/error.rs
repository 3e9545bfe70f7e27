use crate::studio::catalog::PartKind;
use thiserror::Error;

/// Failures while reading or validating the product catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("unknown product type '{0}'")]
    UnknownProduct(String),
    #[error("unknown model '{model}' for product '{product}'")]
    UnknownModel { product: String, model: String },
    #[error("model '{model}' declares no parts")]
    NoParts { model: String },
    #[error("model '{model}', part {part:?}: {reason}")]
    InvalidPart {
        model: String,
        part: PartKind,
        reason: String,
    },
}

/// Everything that can go wrong while bringing the 3D model up.
///
/// All variants collapse into the same recovery path: log the failure and
/// substitute the procedural fallback mesh so the session stays usable.
#[derive(Debug, Error)]
pub enum LoadFailure {
    #[error("no model path configured")]
    MissingPath,
    #[error("asset load failed for '{path}': {reason}")]
    Asset { path: String, reason: String },
    #[error("mesh node '{node}' for part {part:?} not found in asset")]
    NodeNotFound { node: String, part: PartKind },
}
