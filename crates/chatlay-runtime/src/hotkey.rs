//! Focus-scoped routing of the toggle shortcut.
//!
//! [`HotkeyState`] decides which OS registrations are needed; [`HotkeyRouter`]
//! carries them out. Registering a shortcut waits on the main thread, so the
//! router's state is only ever locked from the event pump and the focus worker,
//! never from a window callback.

use std::sync::Mutex;
use std::sync::mpsc::{Sender, channel};
use std::thread;

use chatlay_core::{Error, HotkeyScope};
use tauri::{AppHandle, Manager, Runtime};
use tauri_plugin_global_shortcut::{GlobalShortcutExt, Shortcut};
use tracing::{debug, warn};

pub fn parse_shortcut(accelerator: &str) -> Result<Shortcut, Error> {
    accelerator
        .trim()
        .parse::<Shortcut>()
        .map_err(|e| Error::Config(format!("Invalid hotkey {:?}: {}", accelerator, e)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    Register(Shortcut),
    Unregister(Shortcut),
}

/// Who owns the shortcut, which window has focus, and what is registered.
#[derive(Debug)]
pub struct HotkeyState {
    scope: HotkeyScope,
    owner: Option<String>,
    shortcut: Option<Shortcut>,
    focused: Option<String>,
    registered: Option<Shortcut>,
}

impl HotkeyState {
    pub fn new(scope: HotkeyScope) -> Self {
        Self {
            scope,
            owner: None,
            shortcut: None,
            focused: None,
            registered: None,
        }
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn registered(&self) -> Option<Shortcut> {
        self.registered
    }

    /// Hand the shortcut to `label`; the previous owner loses it.
    pub fn bind(&mut self, label: &str, shortcut: Shortcut) -> Vec<HotkeyAction> {
        self.owner = Some(label.to_string());
        self.shortcut = Some(shortcut);
        self.sync()
    }

    /// Release the shortcut if `label` still owns it.
    pub fn unbind(&mut self, label: &str) -> Vec<HotkeyAction> {
        if self.owner.as_deref() != Some(label) {
            return Vec::new();
        }
        self.owner = None;
        self.shortcut = None;
        self.sync()
    }

    pub fn focus_changed(&mut self, label: &str, focused: bool) -> Vec<HotkeyAction> {
        if focused {
            self.focused = Some(label.to_string());
        } else if self.focused.as_deref() == Some(label) {
            self.focused = None;
        }
        self.sync()
    }

    /// Put owner and shortcut back after a failed bind.
    pub fn restore(&mut self, owner: Option<String>, shortcut: Option<Shortcut>) -> Vec<HotkeyAction> {
        self.owner = owner;
        self.shortcut = shortcut;
        self.sync()
    }

    /// Record that the OS refused the last registration.
    pub fn registration_failed(&mut self) {
        self.registered = None;
    }

    fn wanted(&self) -> Option<Shortcut> {
        let owner = self.owner.as_deref()?;
        match self.scope {
            HotkeyScope::Global => self.shortcut,
            HotkeyScope::Window if self.focused.as_deref() == Some(owner) => self.shortcut,
            HotkeyScope::Window => None,
        }
    }

    fn sync(&mut self) -> Vec<HotkeyAction> {
        let wanted = self.wanted();
        if wanted == self.registered {
            return Vec::new();
        }

        let mut actions = Vec::new();
        if let Some(old) = self.registered.take() {
            actions.push(HotkeyAction::Unregister(old));
        }
        if let Some(new) = wanted {
            actions.push(HotkeyAction::Register(new));
            self.registered = Some(new);
        }
        actions
    }
}

/// Routes the toggle shortcut to the one window that currently owns it.
///
/// `owner` mirrors the state's owner so the shortcut handler, which may run on
/// the main thread, can read it without touching `state`.
pub struct HotkeyRouter {
    state: Mutex<HotkeyState>,
    owner: Mutex<Option<String>>,
    focus: Mutex<Option<Sender<(String, bool)>>>,
}

impl HotkeyRouter {
    pub fn new(scope: HotkeyScope) -> Self {
        Self {
            state: Mutex::new(HotkeyState::new(scope)),
            owner: Mutex::new(None),
            focus: Mutex::new(None),
        }
    }

    /// Window the next shortcut press belongs to.
    pub fn owner(&self) -> Option<String> {
        self.owner.lock().ok().and_then(|owner| owner.clone())
    }

    /// Start the thread that applies focus changes in the order they happen.
    pub fn spawn_focus_worker<R: Runtime>(&self, app: AppHandle<R>) -> Result<(), Error> {
        let (sender, receiver) = channel::<(String, bool)>();

        thread::Builder::new()
            .name("chatlay-focus".into())
            .spawn(move || {
                for (label, focused) in receiver {
                    app.state::<HotkeyRouter>()
                        .apply_focus(&app, &label, focused);
                }
                debug!("Focus worker stopped");
            })?;

        if let Ok(mut focus) = self.focus.lock() {
            *focus = Some(sender);
        }
        Ok(())
    }

    /// Queue a focus change; safe to call from window callbacks.
    pub fn focus_changed(&self, label: &str, focused: bool) {
        let Ok(focus) = self.focus.lock() else {
            return;
        };
        if let Some(sender) = focus.as_ref() {
            let _ = sender.send((label.to_string(), focused));
        }
    }

    pub fn bind<R: Runtime>(
        &self,
        app: &AppHandle<R>,
        label: &str,
        accelerator: &str,
    ) -> Result<(), Error> {
        let shortcut = parse_shortcut(accelerator)?;
        let mut state = self.lock()?;

        let previous_owner = state.owner.clone();
        let previous_shortcut = state.shortcut;

        let actions = state.bind(label, shortcut);
        if let Err(e) = self.apply(app, &mut state, actions) {
            // A failed registration leaves the previous owner in charge.
            let actions = state.restore(previous_owner, previous_shortcut);
            if let Err(e) = self.apply(app, &mut state, actions) {
                warn!("Failed to restore hotkey: {}", e);
            }
            return Err(e);
        }
        Ok(())
    }

    pub fn unbind<R: Runtime>(&self, app: &AppHandle<R>, label: &str) -> Result<(), Error> {
        let mut state = self.lock()?;
        let actions = state.unbind(label);
        self.apply(app, &mut state, actions)
    }

    fn apply_focus<R: Runtime>(&self, app: &AppHandle<R>, label: &str, focused: bool) {
        let Ok(mut state) = self.lock() else {
            return;
        };
        let actions = state.focus_changed(label, focused);
        if let Err(e) = self.apply(app, &mut state, actions) {
            warn!("Failed to register hotkey for {}: {}", label, e);
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HotkeyState>, Error> {
        self.state
            .lock()
            .map_err(|e| Error::WindowOperation(e.to_string()))
    }

    fn apply<R: Runtime>(
        &self,
        app: &AppHandle<R>,
        state: &mut HotkeyState,
        actions: Vec<HotkeyAction>,
    ) -> Result<(), Error> {
        let mut result = Ok(());
        for action in actions {
            match action {
                HotkeyAction::Unregister(shortcut) => {
                    if let Err(e) = app.global_shortcut().unregister(shortcut) {
                        warn!("Failed to unregister hotkey: {}", e);
                    }
                }
                HotkeyAction::Register(shortcut) => {
                    if let Err(e) = app.global_shortcut().register(shortcut) {
                        state.registration_failed();
                        result = Err(Error::WindowOperation(format!(
                            "Failed to register hotkey: {}",
                            e
                        )));
                    }
                }
            }
        }

        if let Ok(mut owner) = self.owner.lock() {
            *owner = state.owner.clone();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f10() -> Shortcut {
        parse_shortcut("F10").unwrap()
    }

    fn focused(scope: HotkeyScope, label: &str) -> HotkeyState {
        let mut state = HotkeyState::new(scope);
        state.focus_changed(label, true);
        state
    }

    #[test]
    fn default_hotkey_parses() {
        assert!(parse_shortcut("F10").is_ok());
        assert!(parse_shortcut(" CommandOrControl+Shift+L ").is_ok());
    }

    #[test]
    fn garbage_hotkey_is_a_config_error() {
        assert!(matches!(parse_shortcut("Shift+Banana"), Err(Error::Config(_))));
    }

    #[test]
    fn router_starts_unowned() {
        assert_eq!(HotkeyRouter::new(HotkeyScope::Window).owner(), None);
    }

    #[test]
    fn focused_owner_registers() {
        let mut state = focused(HotkeyScope::Window, "overlay-1");
        assert_eq!(
            state.bind("overlay-1", f10()),
            vec![HotkeyAction::Register(f10())]
        );
        assert_eq!(state.registered(), Some(f10()));
    }

    #[test]
    fn unfocused_owner_waits_for_focus() {
        let mut state = HotkeyState::new(HotkeyScope::Window);
        assert!(state.bind("overlay-1", f10()).is_empty());
        assert_eq!(state.owner(), Some("overlay-1"));

        assert_eq!(
            state.focus_changed("overlay-1", true),
            vec![HotkeyAction::Register(f10())]
        );
    }

    #[test]
    fn handover_then_unbinding_old_keeps_registration() {
        let mut state = focused(HotkeyScope::Window, "overlay-1");
        state.bind("overlay-1", f10());

        // The replacement takes focus and the shortcut, then the old window
        // lets go.
        let mut actions = state.focus_changed("overlay-2", true);
        actions.extend(state.bind("overlay-2", f10()));
        assert_eq!(
            actions,
            vec![
                HotkeyAction::Unregister(f10()),
                HotkeyAction::Register(f10())
            ]
        );

        assert!(state.unbind("overlay-1").is_empty());
        assert_eq!(state.owner(), Some("overlay-2"));
        assert_eq!(state.registered(), Some(f10()));
    }

    #[test]
    fn unbind_by_non_owner_does_nothing() {
        let mut state = focused(HotkeyScope::Window, "overlay-2");
        state.bind("overlay-2", f10());

        assert!(state.unbind("overlay-7").is_empty());
        assert_eq!(state.owner(), Some("overlay-2"));
        assert_eq!(state.registered(), Some(f10()));
    }

    #[test]
    fn unbind_by_owner_releases() {
        let mut state = focused(HotkeyScope::Window, "overlay-1");
        state.bind("overlay-1", f10());

        assert_eq!(
            state.unbind("overlay-1"),
            vec![HotkeyAction::Unregister(f10())]
        );
        assert_eq!(state.owner(), None);
        assert_eq!(state.registered(), None);
    }

    #[test]
    fn losing_focus_releases_the_shortcut() {
        let mut state = focused(HotkeyScope::Window, "overlay-1");
        state.bind("overlay-1", f10());

        assert_eq!(
            state.focus_changed("overlay-1", false),
            vec![HotkeyAction::Unregister(f10())]
        );
        assert_eq!(state.owner(), Some("overlay-1"));

        // A stale focus-out from some other window changes nothing.
        state.focus_changed("overlay-1", true);
        assert!(state.focus_changed("prompt", false).is_empty());
        assert_eq!(state.registered(), Some(f10()));
    }

    #[test]
    fn global_scope_ignores_focus() {
        let mut state = HotkeyState::new(HotkeyScope::Global);
        assert_eq!(
            state.bind("overlay-1", f10()),
            vec![HotkeyAction::Register(f10())]
        );
        assert!(state.focus_changed("overlay-1", false).is_empty());
        assert!(state.focus_changed("overlay-1", true).is_empty());

        // Moving to the replacement keeps the one registration.
        assert!(state.bind("overlay-2", f10()).is_empty());
        assert!(state.unbind("overlay-1").is_empty());
        assert_eq!(state.registered(), Some(f10()));
    }

    #[test]
    fn failed_registration_is_retried_on_next_focus() {
        let mut state = focused(HotkeyScope::Window, "overlay-1");
        state.bind("overlay-1", f10());
        state.registration_failed();

        state.focus_changed("overlay-1", false);
        assert_eq!(
            state.focus_changed("overlay-1", true),
            vec![HotkeyAction::Register(f10())]
        );
    }

    #[test]
    fn restore_hands_back_to_previous_owner() {
        let mut state = HotkeyState::new(HotkeyScope::Global);
        state.bind("overlay-1", f10());
        state.bind("overlay-2", f10());
        state.registration_failed();

        assert_eq!(
            state.restore(Some("overlay-1".into()), Some(f10())),
            vec![HotkeyAction::Register(f10())]
        );
        assert_eq!(state.owner(), Some("overlay-1"));
    }
}
