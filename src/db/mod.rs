mod repository;
mod schema;
mod store;

pub use schema::{Collection, CURRENT_VERSION, DEFAULT_STORE_NAME};
pub use store::{LocalStore, StoreState};
