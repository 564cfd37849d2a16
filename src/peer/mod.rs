pub mod candidates;
pub mod connection;
pub mod session;
pub mod types;
