mod memory_login_attempt_repository;
mod memory_violation_sink;
mod postgres_login_attempt_repository;
mod postgres_violation_sink;
mod query_builder;

pub use memory_login_attempt_repository::InMemoryLoginAttemptRepository;
pub use memory_violation_sink::InMemoryViolationSink;
pub use postgres_login_attempt_repository::PostgresLoginAttemptRepository;
pub use postgres_violation_sink::PostgresViolationSink;
pub use query_builder::QueryBuilder;
