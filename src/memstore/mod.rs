//! The `Membank` record store handle.

mod admin;
pub mod lifecycle;
mod mutation;
mod query;
mod snapshot;

pub use lifecycle::Membank;
