/// Confidant - chat-companion conversation backend
///
/// Core library providing character role-play rooms, bounded
/// conversation memory, response regeneration, and restorable
/// transcript snapshots over an LLM provider.

pub mod config;
pub mod core;
pub mod database;
pub mod server;


pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
