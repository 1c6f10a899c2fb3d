//! Rental schedule acquisition.
//!
//! Drives the schedule application in a browser, downloads one export per
//! requested date and turns each export into [`export::ParsedRecord`]s.

pub mod acquire;
pub mod cli;
pub mod config;
pub mod dates;
pub mod diagnostics;
pub mod error;
pub mod export;
pub mod renderer;
pub mod rest;
pub mod schedule;
pub mod scratch;
