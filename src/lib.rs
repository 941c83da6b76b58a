pub mod config;
pub mod error;
pub mod event_bus;
pub mod instance;
pub mod l10n;
pub mod options;
pub mod panic_handler;
pub mod replay;
pub mod settings;
pub mod shell;
pub mod sidebar;
pub mod text_layer;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{ShellError, ShellResult};
pub use instance::{InstanceConfig, InstanceManager, Signature};
pub use shell::{Host, ShellEffect, ViewerShell};
