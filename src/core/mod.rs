pub mod apps;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod health;
pub mod keys;
pub mod marathon;
pub mod registry;
pub mod tasks;
pub mod transport;
