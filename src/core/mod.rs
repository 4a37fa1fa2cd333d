//! Core library components.
//!
//! Key lifecycle, file encryption and example generation. Nothing in here
//! touches the terminal; interactive input arrives through [`prompt`].

pub mod backend;
pub mod config;
pub mod constants;
pub mod example;
pub mod key;
pub mod listing;
pub mod manager;
pub mod project;
pub mod prompt;
pub mod provider;
