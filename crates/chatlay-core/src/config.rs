//! Application configuration.
//!
//! Read once at startup from `config.json` in the platform config directory,
//! then overridden field by field from `CHATLAY_*` environment variables.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{Bounds, DEFAULT_CHAT_URL, Error, overlay::behavior::MIN_POLL_INTERVAL};

pub const CONFIG_FILE: &str = "config.json";
pub const DEFAULT_TOGGLE_HOTKEY: &str = "F10";

/// Shortest wait for a replacement window before the toggle is abandoned.
pub const MIN_TRANSITION_TIMEOUT: Duration = Duration::from_millis(1000);

/// Whether the toggle hotkey fires only while the overlay has focus.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum HotkeyScope {
    #[default]
    Window,
    Global,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub default_url: String,
    pub toggle_hotkey: String,
    pub hotkey_scope: HotkeyScope,
    pub default_bounds: Bounds,
    /// Takes precedence over the bounds persisted by the previous session.
    pub initial_bounds: Option<Bounds>,
    pub scroll_poll_ms: u64,
    /// How long a hidden replacement may take to load before it is dropped.
    pub transition_timeout_ms: u64,
    pub skip_prompt: bool,
    pub store_file: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_url: DEFAULT_CHAT_URL.to_string(),
            toggle_hotkey: DEFAULT_TOGGLE_HOTKEY.to_string(),
            hotkey_scope: HotkeyScope::Window,
            default_bounds: Bounds::default(),
            initial_bounds: None,
            scroll_poll_ms: 500,
            transition_timeout_ms: 10_000,
            skip_prompt: false,
            store_file: "settings.json".to_string(),
        }
    }
}

impl AppConfig {
    /// Directory holding `config.json`, if the platform has one.
    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("io", "chatlay", "chatlay").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Load from the default location and the process environment.
    ///
    /// Never fails: anything unreadable is logged and replaced by defaults.
    pub fn load() -> Self {
        let mut config = match Self::config_dir() {
            Some(dir) => Self::load_file_or_default(&dir.join(CONFIG_FILE)),
            None => {
                warn!("No config directory on this platform, using defaults");
                Self::default()
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn load_file_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match Self::from_file(path) {
            Ok(config) => {
                info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                warn!("Ignoring config at {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !is_accelerator(&self.toggle_hotkey) {
            return Err(Error::Config(format!(
                "toggleHotkey {:?} is not a valid accelerator",
                self.toggle_hotkey
            )));
        }
        if !self.default_bounds.is_usable() {
            return Err(Error::Config(format!(
                "defaultBounds {} has no area",
                self.default_bounds
            )));
        }
        if let Some(bounds) = self.initial_bounds {
            if !bounds.is_usable() {
                return Err(Error::Config(format!("initialBounds {} has no area", bounds)));
            }
        }
        if self.store_file.trim().is_empty() {
            return Err(Error::Config("storeFile must not be empty".into()));
        }
        Ok(())
    }

    /// Apply `CHATLAY_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("CHATLAY_URL").filter(|v| !v.trim().is_empty()) {
            self.default_url = url.trim().to_string();
        }

        if let Some(hotkey) = lookup("CHATLAY_HOTKEY") {
            if is_accelerator(&hotkey) {
                self.toggle_hotkey = hotkey.trim().to_string();
            } else {
                warn!("Ignoring CHATLAY_HOTKEY={:?}", hotkey);
            }
        }

        if let Some(scope) = lookup("CHATLAY_HOTKEY_SCOPE") {
            match scope.trim().to_ascii_lowercase().as_str() {
                "window" => self.hotkey_scope = HotkeyScope::Window,
                "global" => self.hotkey_scope = HotkeyScope::Global,
                other => warn!("Ignoring CHATLAY_HOTKEY_SCOPE={:?}", other),
            }
        }

        if let Some(poll) = lookup("CHATLAY_POLL_MS") {
            match poll.trim().parse::<u64>() {
                Ok(ms) => self.scroll_poll_ms = ms,
                Err(_) => warn!("Ignoring CHATLAY_POLL_MS={:?}", poll),
            }
        }

        if let Some(skip) = lookup("CHATLAY_SKIP_PROMPT") {
            match skip.trim() {
                "1" | "true" => self.skip_prompt = true,
                "0" | "false" => self.skip_prompt = false,
                other => warn!("Ignoring CHATLAY_SKIP_PROMPT={:?}", other),
            }
        }
    }

    pub fn scroll_poll_interval(&self) -> Duration {
        Duration::from_millis(self.scroll_poll_ms).max(MIN_POLL_INTERVAL)
    }

    pub fn transition_timeout(&self) -> Duration {
        Duration::from_millis(self.transition_timeout_ms).max(MIN_TRANSITION_TIMEOUT)
    }
}

const MODIFIERS: &[&str] = &[
    "SHIFT",
    "CONTROL",
    "CTRL",
    "ALT",
    "OPTION",
    "SUPER",
    "META",
    "CMD",
    "COMMAND",
    "COMMANDORCONTROL",
    "COMMANDORCTRL",
    "CMDORCTRL",
    "CMDORCONTROL",
];

const NAMED_KEYS: &[&str] = &[
    "BACKQUOTE", "`", "BACKSLASH", "\\", "BRACKETLEFT", "[", "BRACKETRIGHT", "]", "COMMA", ",",
    "EQUAL", "=", "MINUS", "-", "PERIOD", ".", "QUOTE", "'", "SEMICOLON", ";", "SLASH", "/",
    "BACKSPACE", "CAPSLOCK", "ENTER", "SPACE", "TAB", "DELETE", "END", "HOME", "INSERT",
    "PAGEDOWN", "PAGEUP", "PRINTSCREEN", "SCROLLLOCK", "PAUSE", "NUMLOCK", "ESCAPE", "ESC",
    "UP", "DOWN", "LEFT", "RIGHT", "ARROWUP", "ARROWDOWN", "ARROWLEFT", "ARROWRIGHT",
    "NUMPADADD", "NUMADD", "NUMPADPLUS", "NUMPLUS", "NUMPADDECIMAL", "NUMDECIMAL",
    "NUMPADDIVIDE", "NUMDIVIDE", "NUMPADENTER", "NUMENTER", "NUMPADEQUAL", "NUMEQUAL",
    "NUMPADMULTIPLY", "NUMMULTIPLY", "NUMPADSUBTRACT", "NUMSUBTRACT",
    "AUDIOVOLUMEDOWN", "VOLUMEDOWN", "AUDIOVOLUMEUP", "VOLUMEUP", "AUDIOVOLUMEMUTE", "VOLUMEMUTE",
    "MEDIAPLAY", "MEDIAPAUSE", "MEDIAPLAYPAUSE", "MEDIASTOP", "MEDIATRACKNEXT",
    "MEDIATRACKPREV", "MEDIATRACKPREVIOUS",
];

/// Whether `accelerator` reads as `Modifier+...+Key` with exactly one key.
///
/// Follows the grammar the global shortcut plugin parses: case-insensitive
/// modifier names, letters, digits, `F1`..`F24`, numpad keys and the usual
/// named keys.
pub fn is_accelerator(accelerator: &str) -> bool {
    let tokens: Vec<String> = accelerator
        .trim()
        .split('+')
        .map(|token| token.trim().to_ascii_uppercase())
        .collect();

    let Some((key, modifiers)) = tokens.split_last() else {
        return false;
    };
    modifiers.iter().all(|m| MODIFIERS.contains(&m.as_str())) && is_key(key)
}

fn is_key(key: &str) -> bool {
    if NAMED_KEYS.contains(&key) {
        return true;
    }

    let single = |s: &str| {
        let mut chars = s.chars();
        matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_alphanumeric())
    };
    let numbered = |prefix: &str, range: std::ops::RangeInclusive<u8>| {
        key.strip_prefix(prefix)
            .and_then(|n| n.parse::<u8>().ok())
            .is_some_and(|n| range.contains(&n))
    };

    single(key)
        || key.strip_prefix("KEY").is_some_and(|k| single(k) && !k.chars().all(|c| c.is_ascii_digit()))
        || numbered("DIGIT", 0..=9)
        || numbered("NUMPAD", 0..=9)
        || numbered("NUM", 0..=9)
        || numbered("F", 1..=24)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.default_url, DEFAULT_CHAT_URL);
        assert_eq!(config.toggle_hotkey, "F10");
        assert_eq!(config.default_bounds, Bounds::new(100, 100, 400, 600));
    }

    #[test]
    fn file_fields_are_camel_case() {
        let config = AppConfig::from_json(
            r#"{
                "toggleHotkey": "CommandOrControl+Shift+L",
                "hotkeyScope": "global",
                "initialBounds": { "x": 5, "y": 6, "width": 300, "height": 200 },
                "scrollPollMs": 250
            }"#,
        )
        .unwrap();

        assert_eq!(config.toggle_hotkey, "CommandOrControl+Shift+L");
        assert_eq!(config.hotkey_scope, HotkeyScope::Global);
        assert_eq!(config.initial_bounds, Some(Bounds::new(5, 6, 300, 200)));
        assert_eq!(config.scroll_poll_interval(), Duration::from_millis(250));
    }

    #[test]
    fn invalid_file_is_rejected() {
        assert!(matches!(
            AppConfig::from_json(r#"{ "toggleHotkey": " " }"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            AppConfig::from_json(r#"{ "defaultBounds": { "x": 0, "y": 0, "width": 0, "height": 1 } }"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(AppConfig::from_json("[1, 2"), Err(Error::Json(_))));
    }

    #[test]
    fn environment_overrides_file() {
        let mut config = AppConfig::default();
        config.apply_overrides(env(&[
            ("CHATLAY_URL", " https://example.com/chat "),
            ("CHATLAY_HOTKEY", "F9"),
            ("CHATLAY_HOTKEY_SCOPE", "Global"),
            ("CHATLAY_POLL_MS", "1000"),
            ("CHATLAY_SKIP_PROMPT", "1"),
        ]));

        assert_eq!(config.default_url, "https://example.com/chat");
        assert_eq!(config.toggle_hotkey, "F9");
        assert_eq!(config.hotkey_scope, HotkeyScope::Global);
        assert_eq!(config.scroll_poll_ms, 1000);
        assert!(config.skip_prompt);
    }

    #[test]
    fn bad_overrides_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides(env(&[
            ("CHATLAY_URL", "   "),
            ("CHATLAY_HOTKEY_SCOPE", "everywhere"),
            ("CHATLAY_POLL_MS", "soon"),
            ("CHATLAY_SKIP_PROMPT", "maybe"),
        ]));

        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn garbage_hotkey_override_keeps_default() {
        let mut config = AppConfig::default();
        config.apply_overrides(env(&[("CHATLAY_HOTKEY", "Shift+Banana")]));
        assert_eq!(config.toggle_hotkey, DEFAULT_TOGGLE_HOTKEY);

        config.apply_overrides(env(&[("CHATLAY_HOTKEY", "Ctrl+Shift")]));
        assert_eq!(config.toggle_hotkey, DEFAULT_TOGGLE_HOTKEY);
    }

    #[test]
    fn garbage_hotkey_in_file_is_rejected() {
        assert!(matches!(
            AppConfig::from_json(r#"{ "toggleHotkey": "Hyper+F10" }"#),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn accelerator_grammar() {
        for ok in [
            "F10",
            "f24",
            "CommandOrControl+Shift+L",
            "ctrl+alt+KeyK",
            "Alt+Digit3",
            "Shift+ArrowUp",
            "Super+Space",
            "Ctrl+Numpad7",
            "Alt+`",
        ] {
            assert!(is_accelerator(ok), "{ok} should parse");
        }
        for bad in ["", "+", "Shift+", "Shift+Banana", "F25", "Ctrl+Shift", "A+B", "KeyAB"] {
            assert!(!is_accelerator(bad), "{bad} should not parse");
        }
    }

    #[test]
    fn transition_timeout_is_clamped() {
        assert_eq!(
            AppConfig::default().transition_timeout(),
            Duration::from_secs(10)
        );
        let config = AppConfig {
            transition_timeout_ms: 5,
            ..AppConfig::default()
        };
        assert_eq!(config.transition_timeout(), MIN_TRANSITION_TIMEOUT);
    }

    #[test]
    fn poll_interval_is_clamped() {
        let config = AppConfig {
            scroll_poll_ms: 0,
            ..AppConfig::default()
        };
        assert_eq!(config.scroll_poll_interval(), MIN_POLL_INTERVAL);
    }
}
