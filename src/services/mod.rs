// src/services/mod.rs

pub mod analytics;
pub mod attempts;
pub mod bank;
pub mod catalog;
pub mod company;
pub mod events;
pub mod grading;
