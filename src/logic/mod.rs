//! Core logic: model artifact, inference and feature assembly.
//!
//! Nothing in here knows about HTTP.

pub mod features;
pub mod model;
