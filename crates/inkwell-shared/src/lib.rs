//! # Inkwell Shared
//!
//! Wire types and form rules shared by the server and its clients.
//! Kept free of server dependencies so it can be compiled for WASM.

pub mod dto;
pub mod forms;
pub mod response;

pub use response::ErrorResponse;
