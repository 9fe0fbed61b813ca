pub mod scanner;
pub mod store;
pub mod track;

pub use scanner::MediaScanner;
pub use store::TrackStore;
pub use track::{track_id, Track};
