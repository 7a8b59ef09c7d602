//! The overlay state machine.
//!
//! A live window can never change its frame or transparency, so every mode
//! toggle builds a hidden replacement, waits for its page to load, and only
//! then hands everything over and destroys the old window. There is always at
//! least one window, so the process never sees "all windows closed" mid-toggle.

use std::mem;

use tracing::{debug, info, warn};

use crate::{
    AppConfig, Bounds, Error, OverlayMode, PageBehavior, Settings, SettingsStore, WindowSpec,
    WindowSystem,
};

/// Something that happened to one of the overlay windows, or a request from
/// outside the windows (tray, shutdown).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayEvent<H> {
    /// A page finished loading. The first load of a replacement window is its
    /// ready signal.
    PageLoaded(H),
    /// The user asked to close the window; it stays open until the controller
    /// destroys it.
    CloseRequested(H),
    /// The window is gone, whoever destroyed it.
    Destroyed(H),
    /// The toggle hotkey fired on behalf of this window.
    HotkeyPressed(H),
    /// The replacement window did not report ready in time.
    TransitionTimedOut(H),
    ToggleRequested,
    QuitRequested,
}

/// Whether the event pump should keep running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

#[derive(Debug)]
struct Transition<H> {
    window: H,
    mode: OverlayMode,
}

pub struct OverlayController<W: WindowSystem, S> {
    windows: W,
    settings: Settings<S>,
    config: AppConfig,
    behavior: PageBehavior,
    mode: OverlayMode,
    current: Option<W::Handle>,
    pending: Option<Transition<W::Handle>>,
    toggle_queued: bool,
    close_handlers: Vec<W::Handle>,
    hotkey_bindings: Vec<W::Handle>,
    started: bool,
    finished: bool,
}

impl<W: WindowSystem, S: SettingsStore> OverlayController<W, S> {
    pub fn new(windows: W, settings: Settings<S>, config: AppConfig) -> Self {
        let behavior = PageBehavior::new(config.scroll_poll_interval());
        Self {
            windows,
            settings,
            config,
            behavior,
            mode: OverlayMode::Locked,
            current: None,
            pending: None,
            toggle_queued: false,
            close_handlers: Vec::new(),
            hotkey_bindings: Vec::new(),
            started: false,
            finished: false,
        }
    }

    /// Mode of the live window. A pending toggle does not change it.
    pub fn mode(&self) -> OverlayMode {
        self.mode
    }

    pub fn current(&self) -> Option<&W::Handle> {
        self.current.as_ref()
    }

    pub fn is_transitioning(&self) -> bool {
        self.pending.is_some()
    }

    /// Replacement window still waiting for its first page load.
    pub fn pending_window(&self) -> Option<&W::Handle> {
        self.pending.as_ref().map(|t| &t.window)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn windows(&self) -> &W {
        &self.windows
    }

    pub fn windows_mut(&mut self) -> &mut W {
        &mut self.windows
    }

    pub fn settings(&self) -> &Settings<S> {
        &self.settings
    }

    /// Create the first, locked overlay window.
    ///
    /// Bounds come from `initial_bounds`, then the previous session, then the
    /// configured default.
    pub fn start(&mut self, url: &str, initial_bounds: Option<Bounds>) -> Result<(), Error> {
        if self.started {
            return Err(Error::AlreadyStarted);
        }

        let bounds = initial_bounds
            .filter(Bounds::is_usable)
            .or_else(|| self.settings.window_bounds())
            .unwrap_or(self.config.default_bounds);

        let spec = WindowSpec::new(OverlayMode::Locked, bounds, url);
        let window = self.windows.create(&spec)?;

        // Click-through before the page loads, so the window never takes input.
        if let Err(e) = self.windows.set_ignore_mouse_events(&window, true) {
            self.discard(&window);
            return Err(e);
        }

        self.close_handlers.push(window.clone());
        if let Err(e) = self.bind_hotkey(&window) {
            self.discard(&window);
            return Err(e);
        }

        info!("Overlay started {} at {} loading {}", OverlayMode::Locked, bounds, url);
        self.mode = OverlayMode::Locked;
        self.current = Some(window);
        self.started = true;
        Ok(())
    }

    /// Begin switching the live window to the other mode.
    ///
    /// Returns once the hidden replacement exists; the switch completes when
    /// that window reports [`OverlayEvent::PageLoaded`]. A request made while
    /// a switch is in flight is queued.
    pub fn toggle(&mut self) -> Result<(), Error> {
        let current = self.current.clone().ok_or(Error::NoLiveWindow)?;

        if self.pending.is_some() {
            self.toggle_queued = !self.toggle_queued;
            debug!("Toggle in flight, queued follow-up: {}", self.toggle_queued);
            return Ok(());
        }

        // Read from the window itself; the user may have moved or resized it.
        let bounds = self.windows.bounds(&current)?;
        let url = self.windows.current_url(&current)?;
        let target = self.mode.flipped();

        let spec = WindowSpec::new(target, bounds, url).hidden();
        let window = self.windows.create(&spec).inspect_err(|e| {
            warn!("Toggle to {} aborted, keeping {} window: {}", target, self.mode, e);
        })?;

        debug!("Created {:?} for {} at {}", window, target, bounds);
        self.pending = Some(Transition {
            window,
            mode: target,
        });
        Ok(())
    }

    pub fn handle(&mut self, event: OverlayEvent<W::Handle>) -> Result<Flow, Error> {
        match event {
            OverlayEvent::PageLoaded(window) => {
                if self.is_pending(&window) {
                    self.complete_transition()?;
                } else if self.is_current(&window) {
                    self.inject(&window, self.mode)?;
                } else {
                    debug!("Ignoring page load of retired window {:?}", window);
                }
                Ok(Flow::Continue)
            }
            OverlayEvent::CloseRequested(window) => {
                if self.is_current(&window) {
                    self.close_current(&window);
                    return Ok(Flow::Exit);
                }
                if self.is_pending(&window) {
                    self.abort_transition();
                }
                Ok(Flow::Continue)
            }
            OverlayEvent::Destroyed(window) => {
                if self.is_current(&window) {
                    warn!("Overlay window {:?} was destroyed externally", window);
                    self.forget(&window);
                    self.current = None;
                    if let Some(transition) = self.pending.take() {
                        self.discard(&transition.window);
                    }
                    self.finished = true;
                    return Ok(Flow::Exit);
                }
                if self.is_pending(&window) {
                    warn!("Replacement window {:?} vanished, toggle aborted", window);
                    self.forget(&window);
                    self.pending = None;
                    self.toggle_queued = false;
                }
                Ok(Flow::Continue)
            }
            OverlayEvent::HotkeyPressed(window) => {
                if self.is_current(&window) && self.hotkey_bindings.contains(&window) {
                    self.toggle()?;
                } else {
                    warn!("Ignoring hotkey from stale binding on {:?}", window);
                }
                Ok(Flow::Continue)
            }
            OverlayEvent::TransitionTimedOut(window) => {
                if self.is_pending(&window) {
                    warn!("Replacement {:?} never became ready, toggle aborted", window);
                    self.abort_transition();
                }
                Ok(Flow::Continue)
            }
            OverlayEvent::ToggleRequested => {
                self.toggle()?;
                Ok(Flow::Continue)
            }
            OverlayEvent::QuitRequested => Ok(Flow::Exit),
        }
    }

    /// Release hotkeys, drop any half-built replacement and persist the bounds
    /// of the live window. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Some(transition) = self.pending.take() {
            self.discard(&transition.window);
        }
        self.toggle_queued = false;

        for window in mem::take(&mut self.hotkey_bindings) {
            if let Err(e) = self.windows.unbind_hotkey(&window) {
                warn!("Failed to unbind hotkey from {:?}: {}", window, e);
            }
        }

        if let Some(current) = self.current.clone() {
            self.persist_bounds(&current);
        }

        if !self.finished {
            info!("Overlay shut down");
        }
        self.finished = true;
    }

    fn complete_transition(&mut self) -> Result<(), Error> {
        let Some(transition) = self.pending.take() else {
            return Ok(());
        };
        let new = transition.window;

        let Some(old) = self.current.clone() else {
            self.discard(&new);
            return Err(Error::NoLiveWindow);
        };

        if let Err(e) = self.present(&new, transition.mode) {
            warn!("Replacement {:?} failed before handover: {}", new, e);
            self.discard(&new);
            self.toggle_queued = false;
            return Err(e);
        }

        self.close_handlers.push(new.clone());
        if let Err(e) = self.bind_hotkey(&new) {
            warn!("Replacement {:?} could not take the hotkey: {}", new, e);
            self.discard(&new);
            self.toggle_queued = false;
            return Err(e);
        }

        self.current = Some(new.clone());
        self.mode = transition.mode;

        // The old window's close handler would persist stale bounds.
        self.close_handlers.retain(|w| w != &old);
        self.unbind_hotkey(&old);
        if let Err(e) = self.windows.destroy(&old) {
            warn!("Failed to destroy retired window {:?}: {}", old, e);
        }

        info!("Overlay is now {} ({:?})", self.mode, new);

        if mem::take(&mut self.toggle_queued) {
            debug!("Running queued toggle");
            self.toggle()?;
        }
        Ok(())
    }

    fn present(&mut self, window: &W::Handle, mode: OverlayMode) -> Result<(), Error> {
        self.windows.show(window)?;
        match mode {
            OverlayMode::Locked => self.windows.set_ignore_mouse_events(window, true)?,
            OverlayMode::Unlocked => {
                self.windows.set_ignore_mouse_events(window, false)?;
                self.windows.focus(window)?;
            }
        }
        self.inject(window, mode)
    }

    fn inject(&mut self, window: &W::Handle, mode: OverlayMode) -> Result<(), Error> {
        let injection = self.behavior.for_mode(mode);
        self.windows.inject(window, &injection)
    }

    fn abort_transition(&mut self) {
        if let Some(transition) = self.pending.take() {
            info!("Toggle to {} cancelled", transition.mode);
            self.discard(&transition.window);
        }
        self.toggle_queued = false;
    }

    fn close_current(&mut self, window: &W::Handle) {
        if self.close_handlers.contains(window) {
            self.persist_bounds(window);
        }

        if let Some(transition) = self.pending.take() {
            self.discard(&transition.window);
        }
        self.toggle_queued = false;

        self.discard(window);
        self.current = None;
        self.finished = true;
        info!("Overlay closed");
    }

    fn persist_bounds(&self, window: &W::Handle) {
        let bounds = match self.windows.bounds(window) {
            Ok(bounds) => bounds,
            Err(e) => {
                warn!("Could not read bounds of {:?}: {}", window, e);
                return;
            }
        };

        match self.settings.save_bounds(bounds) {
            Ok(()) => debug!("Persisted bounds {}", bounds),
            Err(e) => warn!("Failed to persist bounds {}: {}", bounds, e),
        }
    }

    fn bind_hotkey(&mut self, window: &W::Handle) -> Result<(), Error> {
        self.windows
            .bind_hotkey(window, &self.config.toggle_hotkey)?;
        self.hotkey_bindings.push(window.clone());
        Ok(())
    }

    fn unbind_hotkey(&mut self, window: &W::Handle) {
        if !self.hotkey_bindings.contains(window) {
            return;
        }
        self.hotkey_bindings.retain(|w| w != window);
        if let Err(e) = self.windows.unbind_hotkey(window) {
            warn!("Failed to unbind hotkey from {:?}: {}", window, e);
        }
    }

    /// Drop every handler of `window` and destroy it.
    fn discard(&mut self, window: &W::Handle) {
        self.close_handlers.retain(|w| w != window);
        self.unbind_hotkey(window);
        if let Err(e) = self.windows.destroy(window) {
            warn!("Failed to destroy {:?}: {}", window, e);
        }
    }

    /// Drop every handler of a window that no longer exists.
    fn forget(&mut self, window: &W::Handle) {
        self.close_handlers.retain(|w| w != window);
        self.hotkey_bindings.retain(|w| w != window);
    }

    fn is_current(&self, window: &W::Handle) -> bool {
        self.current.as_ref() == Some(window)
    }

    fn is_pending(&self, window: &W::Handle) -> bool {
        self.pending.as_ref().map(|t| &t.window) == Some(window)
    }
}
