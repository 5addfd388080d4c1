//! Core trait abstractions.

pub mod completion;
pub mod store;
