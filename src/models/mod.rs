//! Data models for backend records.

pub mod dragon;

pub use dragon::Dragon;
