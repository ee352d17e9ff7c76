pub mod brain;
pub mod completion;
pub mod config;
pub mod gateway;
pub mod memory;
pub mod persona;
pub mod sessions;
pub mod signals;
pub mod types;
