//! SourceStager and ArtifactCompiler.

mod artifact;
mod compiler;
mod stager;

pub use artifact::{ArtifactSet, ContractArtifact};
pub use compiler::ArtifactCompiler;
pub use stager::{SourceStager, StagedSources};
