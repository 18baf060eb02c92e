//! The per-frame loop.
//!
//! A [`RenderLoop`] starts [`LoopState::Idle`], runs after
//! [`RenderLoop::start`] and ends for good after [`RenderLoop::stop`]. Each
//! tick advances the animation mixers by the time elapsed since the previous
//! tick, updates the orbit controls and renders exactly once. Outside of
//! [`LoopState::Running`] ticks and asset events are ignored.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use instant::Instant;
use winit::event::WindowEvent;

use crate::{
    render::Renderer,
    stage::{AssetEvent, Stage},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
}

/// Shared flag telling background work whether its results are still wanted.
#[derive(Clone, Debug)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn kill(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Monotonic clock measuring the time between consecutive reads.
#[derive(Debug, Default)]
pub struct Clock {
    last: Option<Instant>,
}

impl Clock {
    pub fn new() -> Self {
        Self { last: None }
    }

    /// Seconds since the previous call. The first call returns zero.
    pub fn get_delta(&mut self) -> f32 {
        let now = Instant::now();
        let delta = match self.last {
            Some(last) => now.duration_since(last).as_secs_f32(),
            None => 0.0,
        };
        self.last = Some(now);
        delta
    }
}

#[derive(Debug)]
pub struct RenderLoop<R: Renderer> {
    stage: Stage,
    renderer: R,
    clock: Clock,
    state: LoopState,
    liveness: Liveness,
}

impl<R: Renderer> RenderLoop<R> {
    pub fn new(stage: Stage, renderer: R) -> Self {
        Self {
            stage,
            renderer,
            clock: Clock::new(),
            state: LoopState::Idle,
            liveness: Liveness::new(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    fn is_running(&self) -> bool {
        self.state == LoopState::Running && self.liveness.is_alive()
    }

    /// Starts ticking. Has no effect once stopped.
    pub fn start(&mut self) {
        match self.state {
            LoopState::Idle => {
                self.clock = Clock::new();
                self.clock.get_delta();
                self.state = LoopState::Running;
                log::info!("Render loop started");
            }
            LoopState::Running => {}
            LoopState::Stopped => log::warn!("A stopped render loop cannot be restarted"),
        }
    }

    /// Same as [`RenderLoop::start`].
    pub fn animate(&mut self) {
        self.start();
    }

    /// Tears the loop down and tells pending loads to drop their results.
    pub fn stop(&mut self) {
        if self.state != LoopState::Stopped {
            self.state = LoopState::Stopped;
            self.liveness.kill();
            log::info!("Render loop stopped");
        }
    }

    /// Advances by the time since the previous tick and renders one frame.
    pub fn tick(&mut self) {
        if !self.is_running() {
            return;
        }
        let dt = self.clock.get_delta();
        self.advance(dt);
    }

    /// Advances by `dt` seconds and renders one frame.
    pub fn advance(&mut self, dt: f32) {
        if !self.is_running() {
            return;
        }
        self.stage.update_mixers(dt);
        let Stage {
            camera, controls, ..
        } = &mut self.stage;
        controls.update(camera);
        self.render();
    }

    fn render(&mut self) {
        if let Err(e) = self.renderer.render(&self.stage.scene, &self.stage.camera) {
            log::error!("Unable to render: {:#}", e);
        }
    }

    /// Follows a viewport resize and renders once right away.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 || self.state == LoopState::Stopped {
            return;
        }
        self.stage.camera.set_viewport(width, height);
        self.stage.controls.set_viewport_height(height);
        self.renderer.set_size(width, height);
        self.render();
    }

    pub fn handle_asset_event(&mut self, event: AssetEvent) {
        if !self.is_running() {
            log::debug!("Dropping {} event, render loop is not running", event.label());
            return;
        }
        self.stage.apply(event);
    }

    /// Forwards input to the orbit controls. Returns true if it was consumed.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        if self.state == LoopState::Stopped {
            return false;
        }
        self.stage.controls.handle_window_event(event)
    }
}
