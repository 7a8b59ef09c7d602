use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, overlay::behavior::Injection};

/// Presentation mode of the overlay window.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum OverlayMode {
    /// Frameless, transparent, always on top, click-through.
    #[default]
    Locked,
    /// Framed, opaque, normal stacking, interactive.
    Unlocked,
}

impl OverlayMode {
    pub fn flipped(self) -> Self {
        match self {
            OverlayMode::Locked => OverlayMode::Unlocked,
            OverlayMode::Unlocked => OverlayMode::Locked,
        }
    }

    pub fn is_locked(self) -> bool {
        self == OverlayMode::Locked
    }
}

impl fmt::Display for OverlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlayMode::Locked => f.write_str("locked"),
            OverlayMode::Unlocked => f.write_str("unlocked"),
        }
    }
}

/// Outer frame of a window in physical pixels.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A zero-sized window cannot be shown, so such bounds count as absent.
    pub fn is_usable(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(100, 100, 400, 600)
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}@({}, {})", self.width, self.height, self.x, self.y)
    }
}

/// Everything the windowing system needs to build one overlay window.
///
/// Frame, transparency and stacking are derived from the mode because the
/// windowing system cannot change them on a live window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSpec {
    pub mode: OverlayMode,
    pub bounds: Bounds,
    pub url: String,
    pub visible: bool,
}

impl WindowSpec {
    pub fn new(mode: OverlayMode, bounds: Bounds, url: impl Into<String>) -> Self {
        Self {
            mode,
            bounds,
            url: url.into(),
            visible: true,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn frame(&self) -> bool {
        !self.mode.is_locked()
    }

    pub fn transparent(&self) -> bool {
        self.mode.is_locked()
    }

    pub fn always_on_top(&self) -> bool {
        self.mode.is_locked()
    }

    pub fn skip_taskbar(&self) -> bool {
        self.mode.is_locked()
    }

    pub fn resizable(&self) -> bool {
        true
    }
}

/// The windowing primitives the overlay controller drives.
///
/// Implementations report readiness, close requests and destruction back to
/// the controller as [`OverlayEvent`](crate::OverlayEvent)s; none of these
/// methods may block waiting for a page to load.
pub trait WindowSystem {
    type Handle: Clone + PartialEq + fmt::Debug;

    fn create(&mut self, spec: &WindowSpec) -> Result<Self::Handle, Error>;

    /// Current outer bounds, read from the live window.
    fn bounds(&self, window: &Self::Handle) -> Result<Bounds, Error>;

    /// URL the window is currently showing.
    fn current_url(&self, window: &Self::Handle) -> Result<String, Error>;

    fn show(&mut self, window: &Self::Handle) -> Result<(), Error>;

    fn focus(&mut self, window: &Self::Handle) -> Result<(), Error>;

    fn set_ignore_mouse_events(&mut self, window: &Self::Handle, ignore: bool)
    -> Result<(), Error>;

    fn inject(&mut self, window: &Self::Handle, injection: &Injection) -> Result<(), Error>;

    /// Intercept `accelerator` on behalf of `window` only.
    fn bind_hotkey(&mut self, window: &Self::Handle, accelerator: &str) -> Result<(), Error>;

    fn unbind_hotkey(&mut self, window: &Self::Handle) -> Result<(), Error>;

    fn destroy(&mut self, window: &Self::Handle) -> Result<(), Error>;
}
