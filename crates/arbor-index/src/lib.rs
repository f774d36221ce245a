//! Git index (dircache) support for Arbor.
//!
//! The index records the staged state of the working tree: one entry per
//! path and merge stage, each carrying the blob id, the file mode, and the
//! stat data used to notice edits without rereading files. It is stored in
//! git's version 2 `index` format, so repositories stay interoperable.
//!
//! # Key Types
//!
//! - [`DirCacheEntry`] -- One staged path, with its binary record codec
//! - [`DirCache`] -- The sorted entry set and the index file format
//! - [`DirCacheBuilder`] -- Assembles a `DirCache` from unsorted entries
//! - [`FileStat`] -- Working tree stat data for dirty checks
//! - [`Checkout`] -- Plans a tree switch and detects conflicting local changes

pub mod checkout;
pub mod dircache;
pub mod entry;
pub mod error;

pub use checkout::{Checkout, CheckoutPlan, CheckoutUpdate};
pub use dircache::{DirCache, DirCacheBuilder};
pub use entry::{record_len, DirCacheEntry, EntryTime, FileStat, Stage, ENTRY_HEADER_LEN};
pub use error::{IndexError, IndexResult};
