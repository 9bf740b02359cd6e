pub mod client;
pub mod coordinator;
