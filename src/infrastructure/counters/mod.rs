//! Counting backends for the rate limiter

mod memory_counter_store;
mod memory_ledger;
mod postgres_counter_store;
mod postgres_ledger;

pub use memory_counter_store::InMemoryCounterStore;
pub use memory_ledger::InMemoryLedger;
pub use postgres_counter_store::PostgresCounterStore;
pub use postgres_ledger::PostgresLedger;
