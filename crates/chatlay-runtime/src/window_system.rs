//! [`WindowSystem`] backed by Tauri webview windows.
//!
//! Every window callback is turned into an [`OverlayEvent`] and pushed onto the
//! overlay channel; the controller only ever runs on the event pump task.

use chatlay_core::{Bounds, Error, Injection, WindowSpec, WindowSystem};
use tauri::{
    AppHandle, Manager, PhysicalPosition, PhysicalSize, Runtime, Url, WebviewUrl, WebviewWindow,
    WebviewWindowBuilder, WindowEvent, webview::PageLoadEvent, window::Color,
};
use tracing::debug;

use crate::{EventSender, OverlayEvent, hotkey::HotkeyRouter, platform::configure_overlay};

pub struct TauriWindows<R: Runtime> {
    app: AppHandle<R>,
    events: EventSender,
    next_id: u32,
}

impl<R: Runtime> TauriWindows<R> {
    pub fn new(app: AppHandle<R>, events: EventSender) -> Self {
        Self {
            app,
            events,
            next_id: 0,
        }
    }

    fn window(&self, label: &str) -> Result<WebviewWindow<R>, Error> {
        self.app
            .get_webview_window(label)
            .ok_or_else(|| Error::WindowNotFound(label.to_string()))
    }

    fn router(&self) -> tauri::State<'_, HotkeyRouter> {
        self.app.state::<HotkeyRouter>()
    }

    fn watch_window_events(&self, window: &WebviewWindow<R>) {
        let app = self.app.clone();
        let events = self.events.clone();
        let label = window.label().to_string();

        window.on_window_event(move |event| match event {
            WindowEvent::CloseRequested { api, .. } => {
                // Bounds are read before the window goes away, so the
                // controller does the actual close.
                api.prevent_close();
                let _ = events.send(OverlayEvent::CloseRequested(label.clone()));
            }
            WindowEvent::Focused(focused) => {
                app.state::<HotkeyRouter>().focus_changed(&label, *focused);
            }
            WindowEvent::Destroyed => {
                let _ = events.send(OverlayEvent::Destroyed(label.clone()));
            }
            _ => {}
        });
    }
}

fn op_error(e: tauri::Error) -> Error {
    Error::WindowOperation(e.to_string())
}

impl<R: Runtime> WindowSystem for TauriWindows<R> {
    type Handle = String;

    fn create(&mut self, spec: &WindowSpec) -> Result<String, Error> {
        self.next_id += 1;
        let label = format!("overlay-{}", self.next_id);

        let url: Url = spec
            .url
            .parse()
            .map_err(|e| Error::WindowCreation(format!("Invalid URL {}: {}", spec.url, e)))?;

        let events = self.events.clone();
        let mut builder = WebviewWindowBuilder::new(&self.app, &label, WebviewUrl::External(url))
            .title("Chatlay")
            .inner_size(spec.bounds.width as f64, spec.bounds.height as f64)
            .decorations(spec.frame())
            .transparent(spec.transparent())
            .always_on_top(spec.always_on_top())
            .skip_taskbar(spec.skip_taskbar())
            .resizable(spec.resizable())
            .shadow(spec.frame())
            .focused(!spec.mode.is_locked())
            // Shown only once it sits at its final bounds.
            .visible(false)
            .on_page_load(move |window, payload| {
                if matches!(payload.event(), PageLoadEvent::Finished) {
                    let _ = events.send(OverlayEvent::PageLoaded(window.label().to_string()));
                }
            });

        if spec.transparent() {
            builder = builder.background_color(Color(0, 0, 0, 0));
        }

        let window = builder
            .build()
            .map_err(|e| Error::WindowCreation(e.to_string()))?;

        let prepared = apply_outer_bounds(&window, spec.bounds)
            .map_err(op_error)
            .and_then(|_| configure_overlay(&window, spec.mode))
            .and_then(|_| {
                if spec.mode.is_locked() {
                    window.set_ignore_cursor_events(true).map_err(op_error)?;
                }
                if spec.visible {
                    window.show().map_err(op_error)?;
                }
                Ok(())
            });

        if let Err(e) = prepared {
            let _ = window.destroy();
            return Err(Error::WindowCreation(format!("{}: {}", label, e)));
        }

        self.watch_window_events(&window);
        debug!("Created {} ({}) at {}", label, spec.mode, spec.bounds);
        Ok(label)
    }

    fn bounds(&self, window: &String) -> Result<Bounds, Error> {
        let window = self.window(window)?;
        let position = window.outer_position().map_err(op_error)?;
        let size = window.outer_size().map_err(op_error)?;
        Ok(Bounds::new(position.x, position.y, size.width, size.height))
    }

    fn current_url(&self, window: &String) -> Result<String, Error> {
        let url = self.window(window)?.url().map_err(op_error)?;
        Ok(url.to_string())
    }

    fn show(&mut self, window: &String) -> Result<(), Error> {
        self.window(window)?.show().map_err(op_error)
    }

    fn focus(&mut self, window: &String) -> Result<(), Error> {
        self.window(window)?.set_focus().map_err(op_error)
    }

    fn set_ignore_mouse_events(&mut self, window: &String, ignore: bool) -> Result<(), Error> {
        self.window(window)?
            .set_ignore_cursor_events(ignore)
            .map_err(op_error)
    }

    fn inject(&mut self, window: &String, injection: &Injection) -> Result<(), Error> {
        debug!("Injecting {} page behavior into {}", injection.mode, window);
        self.window(window)?
            .eval(&injection.script)
            .map_err(op_error)
    }

    fn bind_hotkey(&mut self, window: &String, accelerator: &str) -> Result<(), Error> {
        self.window(window)?;
        self.router().bind(&self.app, window, accelerator)
    }

    fn unbind_hotkey(&mut self, window: &String) -> Result<(), Error> {
        self.router().unbind(&self.app, window)
    }

    fn destroy(&mut self, window: &String) -> Result<(), Error> {
        self.window(window)?.destroy().map_err(op_error)
    }
}

/// Place the window so its outer frame, decorations included, matches
/// `bounds` exactly.
fn apply_outer_bounds<R: Runtime>(window: &WebviewWindow<R>, bounds: Bounds) -> tauri::Result<()> {
    window.set_position(PhysicalPosition::new(bounds.x, bounds.y))?;
    window.set_size(PhysicalSize::new(bounds.width, bounds.height))?;

    let outer = window.outer_size()?;
    let inner = window.inner_size()?;
    let frame_width = outer.width.saturating_sub(inner.width);
    let frame_height = outer.height.saturating_sub(inner.height);

    if frame_width > 0 || frame_height > 0 {
        window.set_size(PhysicalSize::new(
            bounds.width.saturating_sub(frame_width).max(1),
            bounds.height.saturating_sub(frame_height).max(1),
        ))?;
    }
    Ok(())
}
