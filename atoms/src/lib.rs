// Domain logic for the bloomcart storefront backend.
// Modules take AWS clients as arguments or go through the repository
// traits; nothing in here owns global state.

pub mod cart;
pub mod categories;
pub mod error;
pub mod info_cards;
pub mod media;
pub mod products;
pub mod time;

pub use error::{StoreError, UploadError, UpsertError};
