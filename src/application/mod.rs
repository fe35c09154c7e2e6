pub mod brute_force;
pub mod ports;
pub mod rate_limiting;
pub mod upload_gate;
