// src/models/mod.rs

pub mod attempt;
pub mod question;
pub mod test_definition;
pub mod track;
