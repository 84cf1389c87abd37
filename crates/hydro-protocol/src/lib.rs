//! Wire types shared between the Hydro server and its clients.

pub mod paths;
pub mod types;

pub use paths::*;
pub use types::*;
