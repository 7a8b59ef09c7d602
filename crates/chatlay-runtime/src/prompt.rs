//! One-shot modal prompt asking for the chat URL.
//!
//! The page (`ui/prompt.html`) answers by navigating to
//! `chatlay-prompt://submit?url=…` or `chatlay-prompt://cancel`; the navigation
//! is intercepted and never actually happens.

use std::sync::{Arc, Mutex};

use chatlay_core::{Error, PromptOutcome};
use tauri::{AppHandle, Runtime, Url, WebviewUrl, WebviewWindowBuilder, WindowEvent};
use tokio::sync::oneshot;
use tracing::{debug, info};

pub const PROMPT_LABEL: &str = "prompt";
pub const PROMPT_SCHEME: &str = "chatlay-prompt";

type Reply = Arc<Mutex<Option<oneshot::Sender<PromptOutcome>>>>;

/// Show the prompt pre-filled with `prefill` and wait for the answer.
///
/// Closing the window counts as cancelling. An `Err` means the prompt could
/// not be shown at all.
pub async fn ask_url<R: Runtime>(app: &AppHandle<R>, prefill: &str) -> Result<PromptOutcome, Error> {
    let (sender, receiver) = oneshot::channel();
    let reply: Reply = Arc::new(Mutex::new(Some(sender)));

    let on_navigation = reply.clone();
    let prefill_script = format!(
        "window.__CHATLAY_PREFILL__ = {};",
        serde_json::Value::from(prefill)
    );

    let window = WebviewWindowBuilder::new(app, PROMPT_LABEL, WebviewUrl::App("prompt.html".into()))
        .title("Chatlay")
        .inner_size(460.0, 150.0)
        .resizable(false)
        .minimizable(false)
        .maximizable(false)
        .center()
        .always_on_top(true)
        .focused(true)
        .initialization_script(&prefill_script)
        .on_navigation(move |url| match parse_navigation(url) {
            Some(outcome) => {
                answer(&on_navigation, outcome);
                false
            }
            None => true,
        })
        .build()
        .map_err(|e| Error::Prompt(e.to_string()))?;

    let on_close = reply.clone();
    window.on_window_event(move |event| {
        if matches!(event, WindowEvent::CloseRequested { .. } | WindowEvent::Destroyed) {
            answer(&on_close, PromptOutcome::Cancelled);
        }
    });

    let outcome = receiver
        .await
        .map_err(|_| Error::Prompt("prompt went away without answering".to_string()))?;

    if let Err(e) = window.destroy() {
        debug!("Prompt window already gone: {}", e);
    }

    match &outcome {
        PromptOutcome::Submitted(url) => info!("Prompt answered with {:?}", url),
        PromptOutcome::Cancelled => info!("Prompt cancelled"),
    }
    Ok(outcome)
}

/// Only the first answer counts.
fn answer(reply: &Reply, outcome: PromptOutcome) {
    let Ok(mut slot) = reply.lock() else {
        return;
    };
    if let Some(sender) = slot.take() {
        let _ = sender.send(outcome);
    }
}

/// Decode an answer navigation; `None` for any ordinary URL.
pub fn parse_navigation(url: &Url) -> Option<PromptOutcome> {
    if url.scheme() != PROMPT_SCHEME {
        return None;
    }

    match url.host_str() {
        Some("submit") => {
            let value = url
                .query_pairs()
                .find(|(key, _)| key == "url")
                .map(|(_, value)| value.into_owned())
                .unwrap_or_default();
            Some(PromptOutcome::Submitted(value))
        }
        _ => Some(PromptOutcome::Cancelled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        s.parse().unwrap()
    }

    #[test]
    fn submit_carries_decoded_url() {
        assert_eq!(
            parse_navigation(&url(
                "chatlay-prompt://submit?url=https%3A%2F%2Fexample.com%2Fchat%3Froom%3D1"
            )),
            Some(PromptOutcome::Submitted("https://example.com/chat?room=1".into()))
        );
    }

    #[test]
    fn empty_submit_is_still_an_answer() {
        assert_eq!(
            parse_navigation(&url("chatlay-prompt://submit?url=")),
            Some(PromptOutcome::Submitted(String::new()))
        );
        assert_eq!(
            parse_navigation(&url("chatlay-prompt://submit")),
            Some(PromptOutcome::Submitted(String::new()))
        );
    }

    #[test]
    fn cancel_and_unknown_actions_cancel() {
        assert_eq!(
            parse_navigation(&url("chatlay-prompt://cancel")),
            Some(PromptOutcome::Cancelled)
        );
        assert_eq!(
            parse_navigation(&url("chatlay-prompt://whatever")),
            Some(PromptOutcome::Cancelled)
        );
    }

    #[test]
    fn ordinary_navigation_passes_through() {
        assert_eq!(parse_navigation(&url("https://example.com/chat")), None);
        assert_eq!(parse_navigation(&url("tauri://localhost/prompt.html")), None);
    }
}
