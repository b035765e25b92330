//! Data models for the dinner picker.
//!
//! Field names follow the JSON contract shared by the backend and every client
//! (camelCase on the wire).

mod group;
mod proposal;
mod session;
pub mod timestamp;

pub use group::*;
pub use proposal::*;
pub use session::*;
