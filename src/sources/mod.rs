//! Source module implementations.
//!
//! Each module provides a struct implementing [`crate::source::SourceModule`]
//! that retrieves results from one external source through its own
//! fallback chain.

pub mod duckduckgo;
pub mod google;
pub mod reddit;
pub mod wikipedia;

pub use duckduckgo::DuckDuckGoModule;
pub use google::GoogleModule;
pub use reddit::RedditModule;
pub use wikipedia::WikipediaModule;
