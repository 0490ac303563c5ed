// Re-export model types, the batch sequencer and the store seam
pub mod http;
pub mod model;
pub mod store;
pub mod sync;

pub use model::{CardEntryPayload, InfoCard, SyncCardsRequest};
pub use store::{DynamoInfoCardStore, InfoCardRepository};
pub use sync::{CardEntry, CardRow, CardSource, CardSyncSequencer};
pub use http::*;
