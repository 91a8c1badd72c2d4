//! Test utilities shared by the unit and scenario tests

pub mod fixtures;

pub use fixtures::*;
