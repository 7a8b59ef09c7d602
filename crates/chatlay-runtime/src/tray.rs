use tauri::{
    App, AppHandle, Runtime,
    image::Image,
    menu::{MenuBuilder, MenuItemBuilder, PredefinedMenuItem},
    tray::{TrayIconBuilder, TrayIconEvent},
};

use crate::{OverlayEvent, request_exit, send_event};

const TRAY_ICON: &[u8] = include_bytes!("../icons/32x32.png");

pub fn setup_tray(app: &App) -> Result<(), Box<dyn std::error::Error>> {
    let toggle = MenuItemBuilder::with_id("toggle", "Lock / Unlock Overlay").build(app)?;
    let separator = PredefinedMenuItem::separator(app)?;
    let quit = MenuItemBuilder::with_id("quit", "Quit Chatlay").build(app)?;

    let menu = MenuBuilder::new(app)
        .item(&toggle)
        .item(&separator)
        .item(&quit)
        .build()?;

    let icon = Image::from_bytes(TRAY_ICON)?;

    let _tray = TrayIconBuilder::new()
        .icon(icon)
        .menu(&menu)
        .tooltip("Chatlay")
        .on_menu_event(|app, event| {
            handle_menu_event(app, event.id.as_ref());
        })
        .on_tray_icon_event(|tray, event| {
            // Double-click is the quickest way out of a click-through overlay.
            if let TrayIconEvent::DoubleClick { .. } = event {
                send_event(tray.app_handle(), OverlayEvent::ToggleRequested);
            }
        })
        .build(app)?;

    Ok(())
}

fn handle_menu_event<R: Runtime>(app: &AppHandle<R>, id: &str) {
    match id {
        "toggle" => send_event(app, OverlayEvent::ToggleRequested),
        "quit" => request_exit(app),
        _ => {}
    }
}
