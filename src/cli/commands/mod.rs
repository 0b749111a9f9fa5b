pub mod access;
pub mod level;
pub mod token;
