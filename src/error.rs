use std::sync::Arc;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while building, combining or (de)serializing targeting models.
///
/// None of these are transient: they point at malformed input that has to be fixed upstream.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// A criterion was built with a bad operator/operand combination.
    #[error("invalid targeting criterion: {0}")]
    InvalidCriterion(String),

    /// Document discriminator does not name any registered type.
    #[error("unknown record type {0:?}")]
    UnknownType(String),

    /// A polymorphic document carries no `_metadata.cls` discriminator.
    #[error("document has no type discriminator")]
    MissingDiscriminator,

    /// A concrete type was asked to read a document written by another type.
    #[error("expected {expected} document, found {found}")]
    UnexpectedType {
        /// Type doing the reconstruction.
        expected: &'static str,
        /// Discriminator found in the document.
        found: String,
    },

    /// An identity-critical field is absent from the document.
    #[error("{type_name} document is missing {field:?}")]
    MissingField {
        /// Type doing the reconstruction.
        type_name: &'static str,
        /// Name of the absent field.
        field: &'static str,
    },

    /// A document field has the wrong shape.
    #[error("malformed {type_name} document")]
    MalformedDocument {
        /// Type doing the reconstruction.
        type_name: &'static str,
        /// Underlying decoding error.
        // serde_json::Error is not clonable, so we're wrapping it in an Arc.
        #[source]
        source: Arc<serde_json::Error>,
    },

    /// `remove_target` did not find the target in the top-level AND.
    #[error("target not found in top-level AND")]
    TargetNotFound,

    /// The same id appeared twice in a flat record collection.
    #[error("duplicate record id {0:?}")]
    DuplicateId(String),

    /// These records are unreachable from any root because their parents form a cycle.
    #[error("parent references form a cycle through {0:?}")]
    Cycle(Vec<String>),

    /// A tree document breaks the parent/child depth relation or nests a container.
    #[error("invalid node tree: {0}")]
    InvalidTree(String),

    /// Tree construction went deeper than the configured bound.
    #[error("tree depth exceeds limit of {0}")]
    DepthLimitExceeded(usize),

    /// The target source failed to deliver records.
    #[error("target source failed: {0}")]
    Source(Arc<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub(crate) fn malformed(type_name: &'static str, source: serde_json::Error) -> Self {
        Error::MalformedDocument {
            type_name,
            source: Arc::new(source),
        }
    }
}
