// src/lib.rs

//! postmill: harvests high-engagement feed posts and turns them into
//! scheduled content batches.

pub mod browser;
pub mod context;
pub mod error;
pub mod gateway;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
