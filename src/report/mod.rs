//! Report module - terminal summaries for training, batch scoring and bundles

pub mod inspect;
pub mod predictions;
pub mod summary;

pub use inspect::*;
pub use predictions::*;
pub use summary::*;
