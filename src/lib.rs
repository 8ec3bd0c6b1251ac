// src/lib.rs

//! fach-watch Library
//!
//! Watches the Fac-Habitat student-housing site for new availability.
//! The core (key derivation, diffing, state, daily gate) lives in
//! `pipeline` and `storage`; scraping and email delivery are `services`.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
