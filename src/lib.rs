// src/lib.rs

//! ebay2parcel Library
//!
//! Copies tracking numbers of eBay purchases into the Parcel delivery tracker.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
