//! Foundation types for Arbor.
//!
//! This crate provides the identifier and value types shared by every other
//! Arbor crate: the object store, the revision and tree walkers, and the
//! index codec all agree on these definitions.
//!
//! # Key Types
//!
//! - [`ObjectId`] : 160-bit SHA-1 content hash identifying an immutable object
//! - [`ObjectIdMap`] : map keyed by [`ObjectId`], bucketed on the first digest byte
//! - [`ObjectType`] : commit, tree, blob, or tag
//! - [`FileMode`] : raw git file mode carried by tree and index entries
//! - [`ProgressMonitor`] : pollable progress and cancellation hook

pub mod error;
pub mod id_map;
pub mod kind;
pub mod mode;
pub mod object;
pub mod progress;

pub use error::TypeError;
pub use id_map::ObjectIdMap;
pub use kind::ObjectType;
pub use mode::FileMode;
pub use object::{ObjectId, OBJECT_ID_LENGTH, OBJECT_ID_STRING_LENGTH};
pub use progress::{CancelFlag, NullProgressMonitor, ProgressMonitor};
