use archivault_types::{EntityId, ResourceType, TypeError};

/// Errors from vault and trash operations.
///
/// Every failing operation leaves the input snapshot untouched; the error
/// only describes why no new snapshot was produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VaultError {
    /// A referenced id is absent from the index it was expected in.
    #[error("entity not found: {0}")]
    NotFound(EntityId),

    /// The parent/child type pair is not an allowed relationship.
    #[error("{child} cannot be placed under {parent}")]
    InvalidChildType {
        parent: ResourceType,
        child: ResourceType,
    },

    /// A reorder did not supply exactly the current set of children.
    #[error("reorder of {parent} expected {expected} children, got {actual}")]
    LengthMismatch {
        parent: EntityId,
        expected: usize,
        actual: usize,
    },

    /// A batch referenced ids that do not exist; nothing was applied.
    #[error("batch failed for {} unknown ids", invalid_ids.len())]
    PartialFailure { invalid_ids: Vec<EntityId> },

    /// A trash record has lost its entity payload.
    #[error("corrupted trash record: {0}")]
    CorruptedRecord(EntityId),

    /// The edge would make an entity its own ancestor.
    #[error("placing {child} under {parent} would create a cycle")]
    CycleDetected { parent: EntityId, child: EntityId },

    /// The id is already live (or already owned, for ownership edges).
    #[error("duplicate entity id: {0}")]
    DuplicateId(EntityId),

    /// The id is currently in the trash.
    #[error("entity is in the trash: {0}")]
    Trashed(EntityId),

    /// The document root cannot be soft-deleted.
    #[error("the document root cannot be trashed: {0}")]
    RootProtected(EntityId),

    /// A numeric property was not finite, positive (and whole where required).
    #[error("invalid {field} for {id}: {value}")]
    InvalidDimension {
        id: EntityId,
        field: &'static str,
        value: f64,
    },

    /// The wire document could not be normalized.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Result alias for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;
