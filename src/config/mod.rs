//! # Configuration Module
//!
//! Window layout sizes, parcel format constants and budget defaults live in one
//! place. Several of them are interdependent (the row footprint formula, the
//! minimum capacity, the budget floor) and the compile-time assertions in
//! [`constants`] keep them consistent.

pub mod constants;
pub use constants::*;
