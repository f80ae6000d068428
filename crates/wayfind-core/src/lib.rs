pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::WayfindConfig;
pub use error::{Result, WayfindError};
pub use events::{EventBus, SessionEvent};
pub use types::*;
