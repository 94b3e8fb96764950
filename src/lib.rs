//! Bucket enumeration, sorted object listing and whole-object byte/CSV
//! transfer over Google Cloud Storage or S3.
//!
//! Every operation borrows a caller-owned [`adapters::Object`] for the
//! duration of the call.

pub mod adapters;
pub mod client;
pub mod listing;
pub mod model;
pub mod transfer;
pub mod util;

pub use model::error::StorageError;
pub use model::object::{
    BucketDescriptor, ListingRequest, ObjectDescriptor, SortMode, Table, DEFAULT_LIST_TIMEOUT,
};
