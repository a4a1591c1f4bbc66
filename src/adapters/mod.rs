//! Concrete implementations of the external-collaborator ports

mod memory;
mod postgres;

pub use memory::{InMemoryAuditLog, InMemoryLedger, InMemoryRoster, RosterAsset};
pub use postgres::PostgresAuditLog;
