pub use handle::*;

pub mod config;
pub mod sessions;
pub mod stream;
pub mod torrents;
pub mod utils;

mod handle;
