use bridge_history_db::DatabaseError;

/// An error occurring while loading or persisting the store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The snapshot could not be read or written.
    #[error(transparent)]
    Database(#[from] DatabaseError),
    /// The snapshot payload is not valid JSON for its schema version.
    #[error("invalid snapshot payload: {0}")]
    Serde(#[from] serde_json::Error),
    /// The snapshot was written by a newer schema.
    #[error("unsupported snapshot version {found}, latest supported is {supported}")]
    UnsupportedVersion {
        /// The version found in the snapshot.
        found: u64,
        /// The latest supported version.
        supported: u64,
    },
}
