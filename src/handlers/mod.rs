// src/handlers/mod.rs

pub mod admin;
pub mod attempts;
pub mod company;
pub mod health;
pub mod tracks;
