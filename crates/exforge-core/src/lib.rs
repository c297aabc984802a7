//! exforge-core: Exercise definitions, rubric scoring, and the attempt engine.
//!
//! This crate defines the data model, the rubric and frontend contracts, the
//! state machine that drives one attempt, and the self-tests derived from an
//! exercise's reference inputs.

pub mod catalog;
pub mod engine;
pub mod error;
pub mod model;
pub mod parser;
pub mod report;
pub mod results;
pub mod rubric;
pub mod scoring;
pub mod selftest;
pub mod traits;
pub mod validation;
