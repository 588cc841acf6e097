// src/utils/mod.rs

pub mod api_key;
pub mod auth;
pub mod hash;
pub mod jwt;
