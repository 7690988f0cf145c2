//! Azure Files (file share) operations
//!
//! There is no file share crate in the Azure SDK line this project builds
//! on, so the collaborator speaks the Azure Files REST API directly.

pub mod manager;
pub mod store;

pub use manager::{split_ranges, ShareManager, MAX_RANGE_BYTES};
pub use store::FileShareStore;
#[cfg(test)]
pub use store::MockFileShareStore;
