pub mod artifact;

pub use artifact::{ArtifactCache, ArtifactKind, ArtifactMeta, CacheStatus};
