pub mod catalog;
pub mod embeddings;
pub mod recommendations;
pub mod similarity;
pub mod vector_math;

pub use catalog::{InMemoryCatalog, PgTitleCatalog, TitleCatalog};
pub use embeddings::{EmbeddingStore, InMemoryStore, JsonFileStore, PgEmbeddingStore};
pub use recommendations::RecommendationSettings;
pub use similarity::SimilarityEngine;
