pub mod model;
pub mod service;

pub use model::Category;
pub use service::*;
