pub mod behavior;
pub mod controller;
pub mod window;

pub use behavior::{Injection, PageBehavior};
pub use controller::{Flow, OverlayController, OverlayEvent};
pub use window::*;
