//! Error types for the workspace facade

use gws_artifact::ArtifactId;
use gws_intent::MutationError;
use std::path::PathBuf;

/// Facade error
#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    /// Store has not finished loading
    #[error("workspace is still loading")]
    NotHydrated,

    /// Unknown artifact id
    #[error("artifact {0} not found")]
    NotFound(ArtifactId),

    /// Intent does not apply to the artifact
    #[error("mutation rejected: {0}")]
    Mutation(#[from] MutationError),

    /// Undo log has nothing invertible for the artifact
    #[error("nothing to undo for artifact {0}")]
    NothingToUndo(ArtifactId),

    /// Relationship from an artifact to itself
    #[error("cannot relate artifact {0} to itself")]
    SelfLink(ArtifactId),

    /// No built-in template with that name
    #[error("unknown template '{0}'")]
    UnknownTemplate(String),

    /// Config file could not be read
    #[error("cannot read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config text is not valid TOML for [`SystemConfig`](crate::SystemConfig)
    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}
