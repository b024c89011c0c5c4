// Core primitives shared across services

pub mod slug;
pub mod time;

pub use slug::slugify;
pub use time::{current_time_millis, from_millis};
