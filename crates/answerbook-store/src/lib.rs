//! Artifact loading: label catalog (JSON) and reference embeddings (Parquet).

mod catalog;
mod embeddings;
mod error;

pub use catalog::load_catalog;
pub use embeddings::{ReferenceEmbeddings, read_parquet};
pub use error::StoreError;
