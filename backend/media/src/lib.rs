//! `wird-media`: what gets delivered.
//!
//! - [`cursor`]: rotating read position over the Qur'an corpus
//! - [`batch`]: splitting resolved pages into transport-sized media groups
//! - [`resolver`]: content files on disk
//! - [`dhikr`] and [`captions`]: message texts

pub mod batch;
pub mod captions;
pub mod cursor;
pub mod dhikr;
pub mod resolver;

pub use batch::{batch, MediaBatches};
pub use cursor::{next_range, CorpusRange};
pub use dhikr::random_dhikr;
pub use resolver::FsContentResolver;
