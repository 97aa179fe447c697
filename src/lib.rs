//! brezza: a calm, self-hosted server for a personal site.
//!
//! Content lives on disk: a JSON post index, per-post HTML fragments named
//! by slug and language, and a JSON gallery index. The server loads it all
//! into memory and renders pages through a pure filter/sort/paginate/search
//! pipeline; nothing is persisted beyond reader preferences in cookies.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
pub mod util;
