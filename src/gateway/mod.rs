pub mod auth;
pub mod protocol;
mod server;

pub use server::{AppState, run};
