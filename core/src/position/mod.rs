mod store;

pub use store::{PositionStore, SavedPosition};
