//! Hit tracking and novelty classification for the drugwatch scraper.
//!
//! This crate is deliberately free of HTTP and database dependencies. Storage
//! backends implement [`store::RecordStore`]; the engine ([`batch`],
//! [`classify`], [`compact`]) only talks to that trait.

pub mod announce;
pub mod batch;
pub mod classify;
pub mod compact;
pub mod error;
pub mod memory;
pub mod model;
pub mod registry;
pub mod scan;
pub mod store;

pub use error::{Error, Result};

#[cfg(test)]
mod tests;
