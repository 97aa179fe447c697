//! Core domain model: the post catalog, the filter pipeline, and the
//! gallery lightbox. Everything here is pure and synchronous; I/O and
//! rendering live in the outer layers.

pub mod catalog;
pub mod error;
pub mod gallery;
pub mod posts;
pub mod types;
