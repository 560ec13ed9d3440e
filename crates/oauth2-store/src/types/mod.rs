//! Domain types persisted by the stores.

pub mod client;
pub mod token;

pub use client::Client;
pub use token::Token;
