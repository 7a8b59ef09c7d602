/// Chat page used whenever the user supplies none.
pub const DEFAULT_CHAT_URL: &str = "https://multichat.livepush.io/mcSprPsAwsSs0D2XU";

/// How the URL prompt was answered.
///
/// A failure of the prompt mechanism itself is an `Err`, never an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOutcome {
    Submitted(String),
    Cancelled,
}

impl PromptOutcome {
    /// The URL to load: the submitted text, or `default` when the prompt was
    /// cancelled or left blank.
    pub fn resolve(self, default: &str) -> String {
        match self {
            PromptOutcome::Submitted(input) => resolve_url(Some(&input), default),
            PromptOutcome::Cancelled => resolve_url(None, default),
        }
    }
}

/// Trims `input` and falls back to `default` when nothing usable is left.
///
/// Bare hosts such as `example.com/chat` are given an `https://` scheme.
pub fn resolve_url(input: Option<&str>, default: &str) -> String {
    let Some(input) = input.map(str::trim).filter(|s| !s.is_empty()) else {
        return default.to_string();
    };

    if has_scheme(input) {
        input.to_string()
    } else {
        format!("https://{}", input)
    }
}

fn has_scheme(url: &str) -> bool {
    match url.split_once("://") {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => url.starts_with("about:") || url.starts_with("data:"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_input_falls_back_to_default() {
        assert_eq!(resolve_url(Some(""), DEFAULT_CHAT_URL), DEFAULT_CHAT_URL);
        assert_eq!(resolve_url(Some(" \t\n "), DEFAULT_CHAT_URL), DEFAULT_CHAT_URL);
        assert_eq!(resolve_url(None, DEFAULT_CHAT_URL), DEFAULT_CHAT_URL);
    }

    #[test]
    fn cancelled_prompt_uses_default() {
        assert_eq!(
            PromptOutcome::Cancelled.resolve(DEFAULT_CHAT_URL),
            DEFAULT_CHAT_URL
        );
    }

    #[test]
    fn submitted_url_is_trimmed() {
        let outcome = PromptOutcome::Submitted("  https://example.com/chat \n".into());
        assert_eq!(outcome.resolve(DEFAULT_CHAT_URL), "https://example.com/chat");
    }

    #[test]
    fn bare_host_gets_https() {
        assert_eq!(
            resolve_url(Some("example.com/chat"), DEFAULT_CHAT_URL),
            "https://example.com/chat"
        );
        assert_eq!(
            resolve_url(Some("http://localhost:8080"), DEFAULT_CHAT_URL),
            "http://localhost:8080"
        );
        assert_eq!(
            resolve_url(Some("example.com/?next=https://x"), DEFAULT_CHAT_URL),
            "https://example.com/?next=https://x"
        );
    }
}
