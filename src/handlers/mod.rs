// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod event;
pub mod profile;
pub mod stats;
pub mod ticket;
