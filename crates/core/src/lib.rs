//! Now-playing track selection
//!
//! Turns a stream of media-notification events from many concurrent sessions
//! into a single de-duplicated "now playing" feed:
//! - `registry`: notification key to session handle bookkeeping
//! - `selector`: which session wins, track identity, dedup and artwork rules
//! - `tracker`: the two glued together behind one mutation point
//! - `service`: an actor serialising platform callbacks into the tracker

pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod selector;
pub mod service;
pub mod tracker;
pub mod traits;

#[cfg(test)]
mod testing;

pub use config::*;
pub use error::*;
pub use models::*;
pub use registry::SessionRegistry;
pub use selector::{select_initial, NowPlayingSelector, SelectorState};
pub use service::{pump, NowPlayingHandle, NowPlayingService, ServiceCommand};
pub use tracker::NowPlayingTracker;
pub use traits::*;
