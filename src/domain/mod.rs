pub mod item;
pub mod source;

pub use item::{Image, Item};
pub use source::{FeedEndpoint, Source};
