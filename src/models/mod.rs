mod recency;
mod record;

pub use recency::filter_by_recency;
pub use record::{Joke, Photo, Record};
