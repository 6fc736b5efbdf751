//! Data models

pub mod record;
pub mod verdict;
pub mod summary;

pub use record::*;
pub use verdict::*;
pub use summary::*;
