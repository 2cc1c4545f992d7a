/// Errors from constructing foundation types.
#[derive(Debug, thiserror::Error)]
pub enum TypeError {
    /// Object keys must contain at least one character.
    #[error("object key must not be empty")]
    EmptyObjectKey,

    /// Bucket identifiers must contain at least one character.
    #[error("bucket id must not be empty")]
    EmptyBucketId,
}
