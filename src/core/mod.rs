//! Core engine module - platform-agnostic ranking logic.
//!
//! - [`candidate`] - the result shape every provider emits
//! - [`fuzzy`] - subsequence scorer
//! - [`weighting`] - category tiers and sort order
//! - [`ranking`] - dedup passes, weighting, sorting and truncation

pub mod candidate;
pub mod fuzzy;
pub mod ranking;
pub mod weighting;

pub use candidate::{Action, Candidate, Category};
