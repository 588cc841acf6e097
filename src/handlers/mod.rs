// src/handlers/mod.rs

pub mod auth;
pub mod health;
pub mod portfolio;
