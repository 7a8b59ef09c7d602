//! Page behavior injected into the chat page once it has loaded.
//!
//! Locked windows hide every scrollbar and follow the newest content; unlocked
//! windows get their scrollbars back and scroll only when the user does.

use std::time::Duration;

use crate::overlay::OverlayMode;

const SCRIPT_TEMPLATE: &str = include_str!("../../assets/page_behavior.js");

const HIDE_SCROLLBARS_CSS: &str = "\
html, body, * { scrollbar-width: none !important; -ms-overflow-style: none !important; }
::-webkit-scrollbar, *::-webkit-scrollbar { display: none !important; width: 0 !important; height: 0 !important; background: transparent !important; }";

const SHOW_SCROLLBARS_CSS: &str = "\
html, body, * { scrollbar-width: auto !important; -ms-overflow-style: auto !important; }";

/// Shortest polling period the content watcher accepts.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// What to run inside the page for one mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
    pub mode: OverlayMode,
    pub css: &'static str,
    pub auto_scroll: bool,
    pub script: String,
}

/// Builds the per-mode [`Injection`].
#[derive(Debug, Clone, Copy)]
pub struct PageBehavior {
    poll_interval: Duration,
}

impl PageBehavior {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn for_mode(&self, mode: OverlayMode) -> Injection {
        let (css, auto_scroll) = match mode {
            OverlayMode::Locked => (HIDE_SCROLLBARS_CSS, true),
            OverlayMode::Unlocked => (SHOW_SCROLLBARS_CSS, false),
        };

        Injection {
            mode,
            css,
            auto_scroll,
            script: render_script(css, auto_scroll, self.poll_interval),
        }
    }
}

impl Default for PageBehavior {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

fn render_script(css: &str, auto_scroll: bool, poll_interval: Duration) -> String {
    // A &str always serializes to a valid JS string literal.
    let css_literal = serde_json::Value::from(css).to_string();

    SCRIPT_TEMPLATE
        .replace("__CHATLAY_CSS__", &css_literal)
        .replace("__CHATLAY_AUTO_SCROLL__", if auto_scroll { "true" } else { "false" })
        .replace("__CHATLAY_POLL_MS__", &poll_interval.as_millis().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_hides_scrollbars_and_follows_content() {
        let injection = PageBehavior::new(Duration::from_millis(750)).for_mode(OverlayMode::Locked);

        assert!(injection.auto_scroll);
        assert!(injection.css.contains("scrollbar-width: none"));
        assert!(injection.css.contains("::-webkit-scrollbar"));
        assert!(injection.script.contains("var autoScroll = true;"));
        assert!(injection.script.contains("var pollMs = 750;"));
        assert!(injection.script.contains("new MutationObserver(followBottom)"));
        assert!(injection.script.contains("behavior: \"smooth\""));
    }

    #[test]
    fn locked_watcher_deregisters_on_unload() {
        let script = PageBehavior::default().for_mode(OverlayMode::Locked).script;

        assert!(script.contains("window.addEventListener(\"pagehide\", handle.stop)"));
        assert!(script.contains("window.addEventListener(\"beforeunload\", handle.stop)"));
        assert!(script.contains("window.clearInterval(timer)"));
        assert!(script.contains("observer.disconnect()"));
    }

    #[test]
    fn unlocked_restores_scrollbars_without_auto_scroll() {
        let injection = PageBehavior::default().for_mode(OverlayMode::Unlocked);

        assert!(!injection.auto_scroll);
        assert!(injection.css.contains("scrollbar-width: auto"));
        assert!(!injection.css.contains("display: none"));
        assert!(injection.script.contains("var autoScroll = false;"));
        // An earlier watcher on the same document is always stopped first.
        assert!(injection.script.contains("previous.stop()"));
    }

    #[test]
    fn template_placeholders_are_all_filled() {
        for mode in [OverlayMode::Locked, OverlayMode::Unlocked] {
            let script = PageBehavior::default().for_mode(mode).script;
            assert!(!script.contains("__CHATLAY_"), "unfilled placeholder for {mode}");
        }
    }

    #[test]
    fn css_is_embedded_as_a_string_literal() {
        let script = PageBehavior::default().for_mode(OverlayMode::Locked).script;
        let expected = format!("var css = {};", serde_json::Value::from(HIDE_SCROLLBARS_CSS));
        assert!(script.contains(&expected));
    }

    #[test]
    fn poll_interval_has_a_floor() {
        let behavior = PageBehavior::new(Duration::from_millis(1));
        assert_eq!(behavior.poll_interval(), MIN_POLL_INTERVAL);
        assert!(behavior.for_mode(OverlayMode::Locked).script.contains("var pollMs = 50;"));
    }
}
