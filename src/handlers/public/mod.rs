// handlers/public/mod.rs - routes that need no authentication
pub mod system;

pub use system::{health, root};
