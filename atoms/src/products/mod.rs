// Re-export model types, the derivation pipeline and the upsert flow
pub mod http;
pub mod list_state;
pub mod model;
pub mod pipeline;
pub mod store;
pub mod upsert;

pub use list_state::ListState;
pub use model::{ImageRef, Product, ProductDraft, ProductRecord, UpsertProductRequest};
pub use pipeline::{derive, Derived, PageQuery, SortKey, PAGE_SIZE};
pub use store::{DynamoProductStore, ProductRepository};
pub use upsert::UpsertSequencer;
pub use http::*;
