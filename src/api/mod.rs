pub mod auth;
pub mod error;
pub mod extract;
pub mod rest;

pub use rest::router;
