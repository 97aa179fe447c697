//! Application services between the domain and HTTP.

pub mod contact;
pub mod error;
pub mod feed;
