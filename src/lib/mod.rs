//! Central env store management library.
//!
//! This library keeps one canonical copy of each project's `.env` files in a
//! central home-directory store and exposes them to project checkouts through
//! symlinks, so tools that expect a local `.env` still find one while the
//! secrets live in a single place.
//!
//! # Features
//!
//! - **Passthrough parsing**: `KEY=VALUE` lines are tokenized, everything
//!   else is preserved verbatim
//! - **Safe linking**: existing regular files are never clobbered by a
//!   symlink
//! - **Idempotent migration**: re-running a migration only repairs symlinks
//! - **Optional tracing**: detailed logging when the `tracing` feature is
//!   enabled
//!
//! # Example
//!
//! ```rust,no_run
//! use envlink::store::StoreRoot;
//! use envlink::sync;
//!
//! let root = StoreRoot::from_home().unwrap();
//! let env_dir = root.project_dir("myproject").unwrap();
//! let project_root = std::env::current_dir().unwrap();
//!
//! for action in sync::migrate(&project_root, &env_dir).unwrap() {
//!     println!("{action}");
//! }
//! ```

pub mod link;
pub mod parse;
pub mod store;
pub mod sync;
