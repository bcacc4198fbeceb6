//! Page module for the records built during a crawl
//!
//! # Components
//!
//! - `PageKind`: internal / external / URN variant, with the internal path as payload
//! - `Page`: the per-identity record filled in by the fetcher and extractor
//! - `Registry`: the identity-keyed map that decides create-or-append

mod kind;
mod record;
mod registry;

// Re-export main types
pub use kind::{KindTag, PageKind};
pub use record::{FetchTarget, Page};
pub use registry::{Registry, Resolution};
