//! CLI module for the golden image tools
//!
//! `compare` runs a comparison between two local trees; `labels` and
//! `config` inspect what a run produced and which settings it used.

pub mod compare;
pub mod config;
pub mod error;
pub mod labels;
pub mod output;
pub mod progress;
