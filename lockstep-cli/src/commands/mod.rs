pub mod config;
pub mod diff;
pub mod verify;
pub mod write;
