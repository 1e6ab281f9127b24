// src/models/mod.rs

pub mod event;
pub mod ticket;
pub mod user;
