pub mod config;
pub mod error;
pub mod hsds;
pub mod memory;
pub mod source;
