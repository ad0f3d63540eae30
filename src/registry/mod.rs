//! Agent directory: descriptors, similarity ranking, and the shared store.

pub mod descriptor;
pub mod similarity;
pub mod store;

pub use descriptor::{AgentCapability, AgentCategory, AgentDescriptor, RegisterAgent};
pub use similarity::{CosineIndex, SimilarityIndex};
pub use store::{RegistryStore, ScoredAgent};
