pub mod hub;

pub use hub::{ConnectionId, StreamHub, Subscription};
