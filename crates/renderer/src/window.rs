use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use simulation::{DeviceLifecycle, Engine, OrbitCamera, RunState, Surface};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowBuilder;

use tracing::{error, info, warn};

use crate::backend::WgpuBackend;
use crate::types::RendererConfig;

/// Longest frame the simulation is advanced by in one step.
const MAX_FRAME_DELTA: f32 = 0.1;
/// Pixel scroll deltas are converted to wheel lines at this rate.
const PIXELS_PER_LINE: f32 = 40.0;
/// Pause between attempts to re-acquire a lost device.
const RESTORE_INTERVAL: Duration = Duration::from_millis(500);

/// Tracks a left-button drag and yields pointer deltas while it lasts.
#[derive(Debug, Default)]
struct DragState {
    position: Option<PhysicalPosition<f64>>,
    is_pressed: bool,
}

impl DragState {
    /// Records the new pointer position; returns the movement when dragging.
    fn handle_cursor_moved(&mut self, position: PhysicalPosition<f64>) -> Option<(f32, f32)> {
        let previous = self.position.replace(position);
        if !self.is_pressed {
            return None;
        }
        let previous = previous?;
        Some((
            (position.x - previous.x) as f32,
            (position.y - previous.y) as f32,
        ))
    }

    fn handle_button(&mut self, state: ElementState) {
        self.is_pressed = state == ElementState::Pressed;
    }
}

fn wheel_lines(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_LINE,
    }
}

/// Decides when the loop should try to bring a lost device back.
#[derive(Debug, Default)]
struct RestoreSchedule {
    next_attempt: Option<Instant>,
}

impl RestoreSchedule {
    /// Returns true when an attempt is due, and schedules the next one.
    fn due(&mut self, now: Instant) -> bool {
        match self.next_attempt {
            Some(at) if now < at => false,
            _ => {
                self.next_attempt = Some(now + RESTORE_INTERVAL);
                true
            }
        }
    }

    fn clear(&mut self) {
        self.next_attempt = None;
    }
}

/// Opens the window, drives the engine from the winit event loop and returns
/// when the window closes or the device cannot be recovered.
pub(crate) fn run_window(config: RendererConfig) -> Result<()> {
    let event_loop =
        EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let (width, height) = config.surface_size;
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(PhysicalSize::new(width.max(1), height.max(1)))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let size = window.inner_size();
    let backend = WgpuBackend::new(Arc::clone(&window), config.antialiasing, config.vsync);
    let mut engine = Engine::initialize(
        Some(Surface::new(backend, size.width.max(1), size.height.max(1))),
        config.simulation,
        config.engine.clone(),
    )
    .map_err(|err| anyhow!("failed to initialise renderer: {err}"))?;
    engine.subscribe(|event| info!(?event, "engine event"));
    engine.start()?;

    if let Some(profile) = engine.backend().adapter_profile() {
        if profile.is_software() {
            warn!(
                adapter = %profile.name,
                backend = ?profile.backend,
                "software rasterizer detected; consider --performance low"
            );
        }
    }

    let mut camera = OrbitCamera::new(engine.config().camera_sensitivity);
    let mut drag = DragState::default();
    let mut restore = RestoreSchedule::default();
    let mut last_frame = Instant::now();
    let mut result = Ok(());

    let run_result = event_loop.run(|event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);
        match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    engine.dispose();
                    elwt.exit();
                }
                WindowEvent::Resized(new_size) => {
                    engine.request_resize(new_size.width, new_size.height);
                }
                WindowEvent::ScaleFactorChanged {
                    mut inner_size_writer,
                    ..
                } => {
                    let _ = inner_size_writer.request_inner_size(window.inner_size());
                }
                WindowEvent::CursorMoved { position, .. } => {
                    if let Some((dx, dy)) = drag.handle_cursor_moved(position) {
                        camera.rotate_by_pixels(dx, dy);
                    }
                }
                WindowEvent::MouseInput {
                    state: button_state,
                    button: MouseButton::Left,
                    ..
                } => drag.handle_button(button_state),
                WindowEvent::MouseWheel { delta, .. } => camera.zoom_by_wheel(wheel_lines(delta)),
                WindowEvent::KeyboardInput { event, .. }
                    if event.state == ElementState::Pressed && !event.repeat =>
                {
                    match event.logical_key {
                        Key::Named(NamedKey::Escape) => {
                            engine.dispose();
                            elwt.exit();
                        }
                        Key::Named(NamedKey::Space) => match engine.run_state() {
                            RunState::Running => engine.stop(),
                            _ => {
                                if let Err(err) = engine.start() {
                                    warn!(error = %err, "cannot resume");
                                }
                            }
                        },
                        Key::Character(ref value) if value.eq_ignore_ascii_case("r") => {
                            let config = engine.reset_config();
                            camera.set_sensitivity(config.camera_sensitivity);
                        }
                        _ => {}
                    }
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let frame_time = now.duration_since(last_frame);
                    last_frame = now;
                    let delta = frame_time.as_secs_f32().min(MAX_FRAME_DELTA);

                    camera.set_sensitivity(engine.config().camera_sensitivity);
                    camera.update(delta);
                    engine.tick_timed(delta, camera.position(), frame_time);

                    if let Some(message) = engine.backend_mut().take_fatal_error() {
                        error!(%message, "rendering cannot continue");
                        result = Err(anyhow!(message));
                        engine.dispose();
                        elwt.exit();
                    }
                }
                _ => {}
            },
            Event::AboutToWait => match engine.device_state() {
                DeviceLifecycle::Active => {
                    restore.clear();
                    window.request_redraw();
                }
                DeviceLifecycle::Lost { .. } => {
                    if restore.due(Instant::now()) && engine.notify_device_restored().is_active() {
                        restore.clear();
                        last_frame = Instant::now();
                    }
                }
                DeviceLifecycle::Failed => {
                    result = Err(anyhow!("graphics device was lost and could not be restored"));
                    engine.dispose();
                    elwt.exit();
                }
            },
            _ => {}
        }
    });

    if let Err(err) = run_result {
        result = Err(anyhow!("window event loop error: {err}"));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_reports_deltas_only_while_pressed() {
        let mut drag = DragState::default();
        assert_eq!(drag.handle_cursor_moved(PhysicalPosition::new(10.0, 10.0)), None);

        drag.handle_button(ElementState::Pressed);
        assert_eq!(
            drag.handle_cursor_moved(PhysicalPosition::new(14.0, 7.0)),
            Some((4.0, -3.0))
        );

        drag.handle_button(ElementState::Released);
        assert_eq!(drag.handle_cursor_moved(PhysicalPosition::new(20.0, 20.0)), None);
    }

    #[test]
    fn pixel_scrolls_convert_to_lines() {
        assert_eq!(wheel_lines(MouseScrollDelta::LineDelta(0.0, 2.0)), 2.0);
        assert_eq!(
            wheel_lines(MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, -80.0))),
            -2.0
        );
    }

    #[test]
    fn restore_attempts_are_spaced() {
        let mut schedule = RestoreSchedule::default();
        let start = Instant::now();
        assert!(schedule.due(start));
        assert!(!schedule.due(start + Duration::from_millis(100)));
        assert!(schedule.due(start + RESTORE_INTERVAL));

        schedule.clear();
        assert!(schedule.due(start + Duration::from_millis(510)));
    }
}
