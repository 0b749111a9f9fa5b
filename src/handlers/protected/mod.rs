// handlers/protected/mod.rs - routes behind JWT authentication
pub mod dispatch;
pub mod security_level;

pub use dispatch::{command_post, CommandRequest};
