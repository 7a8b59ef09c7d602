//! Window-system agnostic core of the chatlay overlay shell.
//!
//! The runtime crate plugs a real windowing system, settings store and URL
//! prompt into the traits defined here and feeds window events into
//! [`OverlayController::handle`].

pub mod config;
pub mod error;
pub mod overlay;
pub mod prompt;
pub mod settings;

pub use config::*;
pub use error::*;
pub use overlay::*;
pub use prompt::*;
pub use settings::*;
