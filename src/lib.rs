pub mod config;
pub mod connector;
pub mod entity;
pub mod services;
pub mod ticker;

#[cfg(test)]
mod test_logger;

// Re-export commonly used items
pub use config::*;
pub use connector::*;
pub use entity::*;
pub use services::*;
pub use ticker::*;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
