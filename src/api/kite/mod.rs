//! Zerodha Kite Connect v3 integration.

pub mod client;
pub mod mapper;
pub mod types;

pub use client::KiteClient;
