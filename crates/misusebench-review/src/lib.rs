//! MisuseBench Review - review-site upload transport
//!
//! This crate provides the transport contract for publishing detector
//! findings to a review site, its blocking HTTP implementation, and the
//! markdown rendering of heterogeneous finding data.

mod client;
mod error;
pub mod markdown;
mod site;

pub use client::HttpReviewSite;
pub use error::TransportError;
pub use markdown::{as_markdown, as_markdown_map};
pub use site::{upload_url, Credentials, ReviewSite};
