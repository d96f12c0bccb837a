pub mod chat;
pub mod conversation;
pub mod markdown;
pub mod store;
pub mod upload;

pub use store::{AppState, AppStore, StateChange};
