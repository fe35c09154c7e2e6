mod clock;
mod counter_store;
mod login_attempt_repository;
mod rate_limit_ledger;
mod upload_store;
mod violation_sink;

pub use clock::Clock;
pub use counter_store::{CounterStore, CounterStoreError};
pub use login_attempt_repository::{AttemptRepositoryError, LoginAttemptRepository};
pub use rate_limit_ledger::{LedgerError, RateLimitLedger};
pub use upload_store::{StorageError, StoredUpload, UploadStore};
pub use violation_sink::{ViolationSink, ViolationSinkError};

#[cfg(test)]
pub use clock::MockClock;
#[cfg(test)]
pub use counter_store::MockCounterStore;
#[cfg(test)]
pub use login_attempt_repository::MockLoginAttemptRepository;
#[cfg(test)]
pub use rate_limit_ledger::MockRateLimitLedger;
#[cfg(test)]
pub use upload_store::MockUploadStore;
#[cfg(test)]
pub use violation_sink::MockViolationSink;
