// src/packages/mod.rs

//! Package metadata for installability analysis
//!
//! A `Candidate` is built once from a control stanza (read from a .deb or a
//! plain control file) and is read-only afterwards. A `SourcePackage` read
//! from a .dsc turns into a candidate carrying its build relations.

pub mod candidate;
pub mod control;
pub mod deb;
pub mod relations;
pub mod source;

pub use candidate::{Candidate, PackageRef};
pub use relations::{Alternative, OrGroup, parse_relations};
pub use source::SourcePackage;
