//! PostgreSQL storage via SeaORM.

mod connections;
pub mod entity;
mod postgres_store;

pub use connections::{DatabaseConfig, connect};
pub use postgres_store::PostgresStore;

#[cfg(test)]
mod tests;
