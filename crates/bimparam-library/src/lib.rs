// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # bimparam library
//!
//! Versioned store of parametric templates.
//!
//! Every template identity keeps an append-only version history. Reads
//! return shared handles (`Arc`) to immutable versions, so a reader never
//! observes a half-written template. The whole store serializes to a
//! self-describing JSON snapshot.
//!
//! ```rust,ignore
//! use bimparam_library::LibraryStore;
//!
//! let store = LibraryStore::new();
//! let reference = store.put(template)?;
//! let latest = store.get(reference.id.as_str())?;
//! let json = store.to_json()?;
//! ```

mod error;
mod identity;
mod snapshot;
mod store;

pub use error::{LibraryError, Result};
pub use identity::Reconciliation;
pub use snapshot::{SNAPSHOT_FORMAT, SNAPSHOT_VERSION};
pub use store::{CategoryCursor, LibraryStore};
