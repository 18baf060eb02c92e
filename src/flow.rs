//! Application event loop.
//!
//! Wires winit to a [`RenderLoop`] driving the [`WgpuRenderer`]. Once the
//! window and the GPU are ready the loop is started and the three asset loads
//! (environment, scene, avatar) are spawned in the background. Their progress
//! and results travel back to the event loop as [`StageEvent`]s.
//!
//! # Lifecycle
//!
//! 1. `resumed` creates the window (the configured canvas on the web) and the renderer
//! 2. the render loop starts, then the loads are spawned
//! 3. every `RedrawRequested` ticks the loop once and requests the next frame
//! 4. `CloseRequested` stops the loop; loads still in flight drop their results

use std::{fmt::Debug, sync::Arc};

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    config::StageConfig,
    render::Renderer,
    render_loop::{Liveness, RenderLoop},
    renderer::WgpuRenderer,
    resources::{LoadEvent, load_gltf, load_hdr},
    stage::{AssetEvent, Stage},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

pub enum StageEvent {
    /// The renderer finished initializing asynchronously (web only).
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    Initialized(Box<WgpuRenderer>),
    Asset(AssetEvent),
    Exit,
}

impl Debug for StageEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(_) => f.write_str("Initialized"),
            Self::Asset(event) => f.debug_tuple("Asset").field(&event.label()).finish(),
            Self::Exit => f.write_str("Exit"),
        }
    }
}

/// Forwards the events of one load to the event loop while the render loop is alive.
struct Emitter<T> {
    proxy: EventLoopProxy<StageEvent>,
    liveness: Liveness,
    wrap: fn(LoadEvent<T>) -> AssetEvent,
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            proxy: self.proxy.clone(),
            liveness: self.liveness.clone(),
            wrap: self.wrap,
        }
    }
}

impl<T> Emitter<T> {
    fn emit(&self, event: LoadEvent<T>) {
        if !self.liveness.is_alive() {
            return;
        }
        if self.proxy.send_event(StageEvent::Asset((self.wrap)(event))).is_err() {
            log::debug!("Event loop closed before a load event could be delivered");
        }
    }

    fn progress(&self) -> impl FnMut(f32) + use<T> {
        let emitter = self.clone();
        move |fraction| emitter.emit(LoadEvent::InProgress(fraction))
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<StageEvent>,
    config: StageConfig,
    render_loop: Option<RenderLoop<WgpuRenderer>>,
    initializing: bool,
}

impl App {
    fn new(event_loop: &EventLoop<StageEvent>, config: StageConfig) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            config,
            render_loop: None,
            initializing: false,
        })
    }

    fn start(&mut self, renderer: WgpuRenderer) {
        let (width, height) = renderer.size();
        let stage = Stage::new(self.config.clone(), width, height);
        let mut render_loop = RenderLoop::new(stage, renderer);
        render_loop.animate();
        self.spawn_loads(render_loop.liveness());
        render_loop.renderer().window().request_redraw();
        self.render_loop = Some(render_loop);
    }

    fn spawn_loads(&self, liveness: Liveness) {
        let assets = self.config.assets.clone();
        log::info!(
            "Loading {}, {} and {} from {}",
            assets.environment,
            assets.scene,
            assets.avatar,
            assets.root
        );

        let emitter = Emitter {
            proxy: self.proxy.clone(),
            liveness: liveness.clone(),
            wrap: AssetEvent::Environment,
        };
        let (root, file) = (assets.root.clone(), assets.environment.clone());
        self.spawn(async move {
            let result = load_hdr(&root, &file, emitter.progress()).await;
            emitter.emit(result.into());
        });

        let emitter = Emitter {
            proxy: self.proxy.clone(),
            liveness: liveness.clone(),
            wrap: AssetEvent::Scene,
        };
        let (root, file) = (assets.root.clone(), assets.scene.clone());
        self.spawn(async move {
            let result = load_gltf(&root, &file, emitter.progress()).await;
            emitter.emit(result.into());
        });

        let emitter = Emitter {
            proxy: self.proxy.clone(),
            liveness,
            wrap: AssetEvent::Avatar,
        };
        let (root, file) = (assets.root, assets.avatar);
        self.spawn(async move {
            let result = load_gltf(&root, &file, emitter.progress()).await;
            emitter.emit(result.into());
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn spawn(&self, task: impl Future<Output = ()> + Send + 'static) {
        self.async_runtime.spawn(task);
    }

    #[cfg(target_arch = "wasm32")]
    fn spawn(&self, task: impl Future<Output = ()> + 'static) {
        wasm_bindgen_futures::spawn_local(task);
    }
}

impl ApplicationHandler<StageEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.render_loop.is_some() || self.initializing {
            return;
        }

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("masque viewer");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document
                .get_element_by_id(&self.config.canvas_id)
                .unwrap_throw();
            if let Some(gradient) = &self.config.renderer.background {
                let style = canvas.unchecked_ref::<web_sys::HtmlElement>().style();
                if let Err(e) = style.set_property("background", &gradient.to_css()) {
                    log::warn!("Unable to style the canvas: {:?}", e);
                }
            }
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Unable to create a window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let settings = self.config.renderer.clone();
        let shadow_map_size = self.config.lights.directional.shadow.map_size;
        let init_future = WgpuRenderer::new(window, settings, shadow_map_size);
        self.initializing = true;

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok(renderer) => self.start(renderer),
                Err(e) => {
                    log::error!("Unable to initialize the renderer: {:#}", e);
                    event_loop.exit();
                }
            }
            self.initializing = false;
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let event = match init_future.await {
                    Ok(renderer) => StageEvent::Initialized(Box::new(renderer)),
                    Err(e) => {
                        log::error!("Unable to initialize the renderer: {:#}", e);
                        StageEvent::Exit
                    }
                };
                if proxy.send_event(event).is_err() {
                    log::error!("Event loop closed during initialization");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: StageEvent) {
        match event {
            StageEvent::Initialized(renderer) => {
                // This is the message from our wasm `spawn_local`
                self.initializing = false;
                let size = renderer.window().inner_size();
                self.start(*renderer);
                if let Some(render_loop) = &mut self.render_loop {
                    render_loop.resize(size.width, size.height);
                }
            }
            StageEvent::Asset(event) => {
                if let Some(render_loop) = &mut self.render_loop {
                    render_loop.handle_asset_event(event);
                }
            }
            StageEvent::Exit => {
                if let Some(render_loop) = &mut self.render_loop {
                    render_loop.stop();
                }
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let render_loop = match &mut self.render_loop {
            Some(render_loop) => render_loop,
            None => return,
        };

        render_loop.handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                render_loop.stop();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => render_loop.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                render_loop.tick();
                if render_loop.state() == crate::render_loop::LoopState::Running {
                    render_loop.renderer().window().request_redraw();
                }
            }
            _ => {}
        }
    }
}

/// Opens the viewer and blocks until its window is closed.
pub fn run(config: StageConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    let event_loop: EventLoop<StageEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config)?;

    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), JsValue> {
    run(StageConfig::default()).map_err(|e| JsValue::from_str(&format!("{:#}", e)))
}
