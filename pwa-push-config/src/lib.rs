// Settings loading for pwa-push

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use env::{DEFAULT_PREFIX, EnvLoader};
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use settings::{PushSettings, SettingsLoader};
pub use validation::{ConfigValidator, Validate};
