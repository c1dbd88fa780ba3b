//! Department-based access control
//!
//! Maps each document department to the roles allowed to read it and
//! carries per-role capability flags.

pub mod policy;

pub use policy::{AccessPolicy, RoleProfile};
