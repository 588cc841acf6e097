// src/models/mod.rs

pub mod portfolio;
pub mod user;
