//! Core types and algorithms for bug history processing.
//!
//! A bug's history is a [`Timeline`](timeline::Timeline) of time-bounded
//! [`Version`](version::Version)s. Freshly extracted history is rebased onto
//! previously persisted history, then a single forward pass derives
//! status-transition metrics for every version.
//!
//! This crate is deliberately free of database dependencies. Storage
//! backends implement the traits in [`store`].

pub mod derive;
pub mod error;
pub mod observe;
pub mod pipeline;
pub mod rebase;
pub mod store;
pub mod taxonomy;
pub mod timeline;
pub mod version;

pub use error::{Error, Result};
