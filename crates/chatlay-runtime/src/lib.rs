mod hotkey;
mod platform;
mod prompt;
mod store;
mod tray;
mod window_system;

use std::sync::atomic::{AtomicBool, Ordering};

use std::time::Duration;

use chatlay_core::{
    AppConfig, DEFAULT_TOGGLE_HOTKEY, Error, Flow, OverlayController, Settings, resolve_url,
};
use tauri::{AppHandle, Manager, RunEvent, Runtime, Wry, plugin::TauriPlugin};
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};
use tauri_plugin_global_shortcut::ShortcutState;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use hotkey::{HotkeyRouter, parse_shortcut};
use window_system::TauriWindows;

/// Overlay events as seen by the runtime; windows are identified by label.
pub type OverlayEvent = chatlay_core::OverlayEvent<String>;
pub type EventSender = UnboundedSender<OverlayEvent>;

/// Managed state: the way into the overlay event pump.
pub struct OverlayChannel(pub EventSender);

/// Managed state tracking whether the process is allowed to exit.
///
/// Tauri exits as soon as the last window closes, which would happen between
/// the prompt closing and the overlay opening.
#[derive(Default)]
pub struct Lifecycle {
    running: AtomicBool,
    released: AtomicBool,
}

impl Lifecycle {
    fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }

    fn may_exit(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

pub fn send_event<R: Runtime>(app: &AppHandle<R>, event: OverlayEvent) {
    if let Err(e) = app.state::<OverlayChannel>().0.send(event) {
        warn!("Overlay event pump is gone, dropping {:?}", e.0);
    }
}

/// Quit from outside the overlay windows. Before the overlay is up there is
/// nothing to persist, so the process exits right away.
pub fn request_exit<R: Runtime>(app: &AppHandle<R>) {
    let lifecycle = app.state::<Lifecycle>();
    if lifecycle.running.load(Ordering::SeqCst) {
        send_event(app, OverlayEvent::QuitRequested);
    } else {
        lifecycle.release();
        app.exit(0);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("chatlay_core=info,chatlay_runtime=info"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn shortcut_plugin() -> TauriPlugin<Wry> {
    tauri_plugin_global_shortcut::Builder::new()
        .with_handler(|app, _shortcut, event| {
            if event.state != ShortcutState::Pressed {
                return;
            }
            if let Some(owner) = app.state::<HotkeyRouter>().owner() {
                send_event(app, OverlayEvent::HotkeyPressed(owner));
            }
        })
        .build()
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    init_logging();

    let config = AppConfig::load();
    let (events, receiver) = unbounded_channel();

    let app = tauri::Builder::default()
        .plugin(shortcut_plugin())
        .plugin(tauri_plugin_store::Builder::new().build())
        .plugin(tauri_plugin_dialog::init())
        .manage(OverlayChannel(events.clone()))
        .manage(HotkeyRouter::new(config.hotkey_scope))
        .manage(Lifecycle::default())
        .setup(move |app| {
            tray::setup_tray(app)?;
            app.state::<HotkeyRouter>()
                .spawn_focus_worker(app.handle().clone())?;

            let app_handle = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                run_session(app_handle, config, events, receiver).await;
            });

            Ok(())
        })
        .build(tauri::generate_context!())
        .expect("error building chatlay");

    app.run(|app, event| {
        if let RunEvent::ExitRequested { code: None, api, .. } = event {
            if !app.state::<Lifecycle>().may_exit() {
                api.prevent_exit();
            }
        }
    });
}

/// Prompt for the URL, start the overlay and drive it until it closes.
async fn run_session(
    app: AppHandle,
    config: AppConfig,
    events: EventSender,
    mut receiver: UnboundedReceiver<OverlayEvent>,
) {
    let settings = Settings::new(store::open(&app, &config.store_file));
    let persisted = settings.load();
    let prefill = persisted
        .last_chat_url
        .unwrap_or_else(|| config.default_url.clone());

    let url = if config.skip_prompt {
        resolve_url(Some(&prefill), &config.default_url)
    } else {
        match prompt::ask_url(&app, &prefill).await {
            Ok(outcome) => outcome.resolve(&config.default_url),
            Err(e) => return fatal(&app, &e),
        }
    };

    if let Err(e) = settings.save_url(&url) {
        warn!("Failed to remember chat URL: {}", e);
    }

    let mut config = config;
    if let Err(e) = parse_shortcut(&config.toggle_hotkey) {
        warn!("{}, falling back to {}", e, DEFAULT_TOGGLE_HOTKEY);
        config.toggle_hotkey = DEFAULT_TOGGLE_HOTKEY.to_string();
    }

    let initial_bounds = config.initial_bounds;
    let timeout = config.transition_timeout();
    let windows = TauriWindows::new(app.clone(), events.clone());
    let mut controller = OverlayController::new(windows, settings, config);

    if let Err(e) = controller.start(&url, initial_bounds) {
        return fatal(&app, &e);
    }
    app.state::<Lifecycle>().running.store(true, Ordering::SeqCst);

    while let Some(event) = receiver.recv().await {
        let pending_before = controller.pending_window().cloned();

        match controller.handle(event) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Exit) => break,
            Err(e) => warn!("Overlay event failed: {}", e),
        }

        if let Some(window) = controller.pending_window() {
            if pending_before.as_ref() != Some(window) {
                arm_transition_timeout(&events, window.clone(), timeout);
            }
        }
    }

    controller.shutdown();
    info!("Exiting");

    let lifecycle = app.state::<Lifecycle>();
    lifecycle.running.store(false, Ordering::SeqCst);
    lifecycle.release();
    app.exit(0);
}

/// Abandon the replacement `window` if it has not loaded after `timeout`.
fn arm_transition_timeout(events: &EventSender, window: String, timeout: Duration) {
    let events = events.clone();
    tauri::async_runtime::spawn(async move {
        tokio::time::sleep(timeout).await;
        let _ = events.send(OverlayEvent::TransitionTimedOut(window));
    });
}

fn fatal(app: &AppHandle, e: &Error) {
    error!("Fatal: {}", e);

    let _ = app
        .dialog()
        .message(e.to_string())
        .title("Chatlay")
        .kind(MessageDialogKind::Error)
        .blocking_show();

    app.state::<Lifecycle>().release();
    app.exit(1);
}
