mod counter_window;
mod login_attempt;
mod violation_record;

pub use counter_window::CounterWindow;
pub use login_attempt::LoginAttempt;
pub use violation_record::ViolationRecord;
