// src/lib.rs

//! debcheck
//!
//! Installability analysis for local Debian packages: given a `.deb` and a
//! catalog of installed and available packages, decide whether the package
//! can be installed and which other packages it pulls in.
//!
//! # Architecture
//!
//! - Database-first: the catalog and the staging area live in SQLite
//! - `PackageDatabase`: the one seam between the resolver and a catalog
//! - Staging: needed packages are marked, checked, and discarded on failure

pub mod db;
mod error;
pub mod packages;
pub mod repository;
pub mod resolver;
pub mod version;

pub use error::{Error, Result};
