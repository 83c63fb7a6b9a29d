//! Coin Hunt entry point
//!
//! Handles platform-specific initialization and wires the tracking engine,
//! the three.js scene host and the page to the game core.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::{JsFuture, spawn_local};
    use web_sys::{HtmlCanvasElement, MouseEvent};

    use coin_hunt::audio::{Cue, WebAudio, fetch_and_decode};
    use coin_hunt::camera::{Camera, CameraParameters, CameraPose, SurfaceRect, ndc_from_client};
    use coin_hunt::navigation::BrowserNavigator;
    use coin_hunt::persistence::LocalStorage;
    use coin_hunt::render_loop::SceneRenderer;
    use coin_hunt::scene::{AssetEvent, AssetKind, NodeKind, Scene};
    use coin_hunt::tracking::{RenderSurface, TrackingEngine, TrackingEvent};
    use coin_hunt::{Game, GameConfig, GameError};

    type WebGame = Game<LocalStorage, WebAudio>;

    // Bindings to the tracking SDK (global `OnirixSDK`) and the three.js host
    #[wasm_bindgen(inline_js = "
        let ox = null;
        let host = null;

        export function ox_init(token, mode) {
            ox = new OnirixSDK(token);
            return ox.init({ mode: OnirixSDK.TrackingMode[mode] });
        }

        export function ox_subscribe(onDetected, onLost, onPose, onResize) {
            ox.subscribe(OnirixSDK.Events.OnDetected, (id) => onDetected(id));
            ox.subscribe(OnirixSDK.Events.OnLost, (id) => onLost(id));
            ox.subscribe(OnirixSDK.Events.OnPose, (pose) => onPose(new Float32Array(pose)));
            ox.subscribe(OnirixSDK.Events.OnResize, () => onResize());
        }

        export function ox_fov() { return ox.getCameraParameters().fov; }
        export function ox_aspect() { return ox.getCameraParameters().aspect; }

        export function host_init(canvas) {
            const THREE = window.THREE;
            const renderer = new THREE.WebGLRenderer({ canvas, alpha: true, antialias: true });
            renderer.setClearColor(0x000000, 0);
            renderer.setSize(canvas.width, canvas.height);
            renderer.setPixelRatio(window.devicePixelRatio);
            renderer.outputEncoding = THREE.sRGBEncoding;
            const scene = new THREE.Scene();
            scene.add(new THREE.AmbientLight('#ffffff', 1));
            const light = new THREE.DirectionalLight('#ffffff', 1.5);
            light.position.set(0, 5, 5);
            scene.add(light);
            const camera = new THREE.PerspectiveCamera(60, 1, 0.1, 1000);
            camera.matrixAutoUpdate = false;
            host = { THREE, renderer, scene, camera, nodes: [null, null], envMap: null, feed: null };
        }

        export function host_surface_width() { return host.renderer.domElement.width; }
        export function host_surface_height() { return host.renderer.domElement.height; }

        export function host_load_model(url) {
            const loader = new window.THREE.GLTFLoader();
            return new Promise((resolve, reject) => loader.load(url, (gltf) => {
                gltf.scene.matrixAutoUpdate = false;
                host.nodes[0] = gltf.scene;
                resolve();
            }, undefined, reject));
        }

        export function host_load_env_map(url) {
            const THREE = host.THREE;
            return new Promise((resolve, reject) => new THREE.TextureLoader().load(url, (tex) => {
                tex.mapping = THREE.EquirectangularReflectionMapping;
                tex.encoding = THREE.sRGBEncoding;
                host.envMap = tex;
                resolve();
            }, undefined, reject));
        }

        export function host_make_text(label, r, g, b) {
            const THREE = host.THREE;
            return new Promise((resolve) => {
                const geometry = new THREE.TextGeometry(label, {
                    font: new THREE.Font(window.COIN_FONT),
                    height: 5,
                    curveSegments: 50,
                    bevelEnabled: true,
                });
                geometry.center();
                const material = new THREE.MeshStandardMaterial({
                    color: new THREE.Color(r, g, b),
                    envMap: host.envMap,
                    envMapIntensity: 1.5,
                    metalness: 1,
                    roughness: 0,
                });
                const mesh = new THREE.Mesh(geometry, material);
                mesh.matrixAutoUpdate = false;
                host.nodes[1] = mesh;
                resolve();
            });
        }

        export function host_sync_node(kind, visible, matrix, r, g, b) {
            const node = host.nodes[kind];
            if (!node) return;
            node.matrix.fromArray(matrix);
            node.matrixWorldNeedsUpdate = true;
            if (kind === 0) {
                node.traverse((child) => {
                    if (child.isMesh) {
                        child.material.color.setRGB(r, g, b);
                        child.material.emissiveIntensity = 0.5;
                    }
                });
            }
            if (visible && !node.parent) host.scene.add(node);
            if (!visible && node.parent) host.scene.remove(node);
        }

        export function host_render(cameraWorld, projection, feed) {
            if (feed && !host.feed) host.feed = new host.THREE.VideoTexture(ox.getCameraFeed());
            if (!feed) host.feed = null;
            host.scene.background = host.feed;
            host.camera.matrix.fromArray(cameraWorld);
            host.camera.matrixWorldNeedsUpdate = true;
            host.camera.projectionMatrix.fromArray(projection);
            host.camera.projectionMatrixInverse.copy(host.camera.projectionMatrix).invert();
            host.renderer.render(host.scene, host.camera);
        }

        export function host_resize(width, height) {
            host.renderer.setSize(width, height);
        }
    ")]
    extern "C" {
        fn ox_init(token: &str, mode: &str) -> js_sys::Promise;
        fn ox_subscribe(
            on_detected: &JsValue,
            on_lost: &JsValue,
            on_pose: &JsValue,
            on_resize: &JsValue,
        );
        fn ox_fov() -> f32;
        fn ox_aspect() -> f32;

        fn host_init(canvas: &HtmlCanvasElement);
        fn host_surface_width() -> u32;
        fn host_surface_height() -> u32;
        fn host_load_model(url: &str) -> js_sys::Promise;
        fn host_load_env_map(url: &str) -> js_sys::Promise;
        fn host_make_text(label: &str, r: f32, g: f32, b: f32) -> js_sys::Promise;
        fn host_sync_node(kind: u32, visible: bool, matrix: &[f32], r: f32, g: f32, b: f32);
        #[wasm_bindgen(catch)]
        fn host_render(camera_world: &[f32], projection: &[f32], feed: bool) -> Result<(), JsValue>;
        fn host_resize(width: u32, height: u32);
    }

    /// Engine queries answered by the SDK and the host canvas it handed out
    struct OxEngine;

    impl TrackingEngine for OxEngine {
        fn camera_parameters(&self) -> CameraParameters {
            CameraParameters {
                fov: ox_fov(),
                aspect: ox_aspect(),
            }
        }

        fn surface_size(&self) -> RenderSurface {
            RenderSurface {
                width: host_surface_width(),
                height: host_surface_height(),
            }
        }
    }

    /// Pushes scene state into three.js and draws
    struct ThreeRenderer;

    impl SceneRenderer for ThreeRenderer {
        fn render(&mut self, scene: &Scene, camera: &Camera) -> coin_hunt::Result<()> {
            for (index, kind) in [NodeKind::Coin, NodeKind::RewardText].into_iter().enumerate() {
                if let Some(node) = scene.node(kind) {
                    host_sync_node(
                        index as u32,
                        scene.contains(kind),
                        &node.transform.matrix().to_cols_array(),
                        node.color.x,
                        node.color.y,
                        node.color.z,
                    );
                }
            }
            host_render(
                &camera.world_matrix().to_cols_array(),
                &camera.projection_matrix().to_cols_array(),
                scene.background.is_some(),
            )
            .map_err(|e| GameError::Render(GameError::js_reason(&e)))
        }

        fn resize(&mut self, surface: RenderSurface) {
            host_resize(surface.width, surface.height);
        }
    }

    /// Target id is the last path segment (`/game/<id>`)
    fn target_id_from_location() -> Option<String> {
        let path = web_sys::window()?.location().pathname().ok()?;
        path.rsplit('/')
            .find(|segment| !segment.is_empty())
            .map(str::to_string)
    }

    /// Deployment config from `<script id="game-config" type="application/json">`
    fn load_config() -> GameConfig {
        let json = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id("game-config"))
            .and_then(|el| el.text_content());
        match json.map(|json| GameConfig::from_json(&json)) {
            Some(Ok(config)) => config,
            Some(Err(e)) => {
                log::warn!("Ignoring page config: {}", e);
                GameConfig::default()
            }
            None => GameConfig::default(),
        }
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            web_sys::console::warn_1(&"Logger already initialized".into());
        }

        log::info!("Coin Hunt starting...");

        let Some(target_id) = target_id_from_location() else {
            log::error!("No coin id in page location");
            return;
        };

        let game = match Game::new(load_config(), &target_id, LocalStorage::new(), WebAudio::new()) {
            Ok(game) => Rc::new(RefCell::new(game)),
            Err(e) => {
                log::error!("{}", e);
                return;
            }
        };

        if !game.borrow().check_identity(&mut BrowserNavigator) {
            return;
        }

        decode_sounds(&game);
        setup_start_button(game.clone());
        setup_settings_controls(game.clone());
        setup_focus_handlers(game);

        log::info!("Coin Hunt ready, waiting for start");
    }

    fn decode_sounds(game: &Rc<RefCell<WebGame>>) {
        let (ctx, assets) = {
            let g = game.borrow();
            (g.audio().backend().context(), g.config().assets.clone())
        };
        let Some(ctx) = ctx else {
            return;
        };
        for (cue, url) in [
            (Cue::Success, assets.success_sound),
            (Cue::Throw, assets.throw_sound),
        ] {
            let game = game.clone();
            let ctx = ctx.clone();
            spawn_local(async move {
                match fetch_and_decode(ctx, url).await {
                    Ok(buffer) => game.borrow_mut().on_sound_decoded(cue, buffer),
                    Err(e) => game.borrow_mut().on_sound_failed(cue, &e),
                }
            });
        }
    }

    fn setup_start_button(game: Rc<RefCell<WebGame>>) {
        let Some(btn) = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id("start"))
        else {
            log::warn!("No start button on page");
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
            start_session(game.clone());
        });
        let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_settings_controls(game: Rc<RefCell<WebGame>>) {
        let Some(window) = web_sys::window() else {
            return;
        };

        // Follow the OS accessibility preference on every load
        if let Ok(Some(query)) = window.match_media("(prefers-reduced-motion: reduce)") {
            game.borrow_mut().set_reduced_motion(query.matches());
        }

        let Some(btn) = window.document().and_then(|d| d.get_element_by_id("mute")) else {
            return;
        };
        let label = |muted: bool| if muted { "Unmute" } else { "Mute" };
        btn.set_text_content(Some(label(game.borrow().settings().muted)));

        let target = btn.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
            let mut g = game.borrow_mut();
            let muted = !g.settings().muted;
            g.set_muted(muted);
            target.set_text_content(Some(label(muted)));
            log::info!("Sound {}", if muted { "muted" } else { "on" });
        });
        let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn set_loading(visible: bool) {
        if let Some(el) = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id("loading"))
        {
            let _ = el.set_attribute("class", if visible { "" } else { "hidden" });
        }
    }

    fn start_session(game: Rc<RefCell<WebGame>>) {
        let (token, mode) = {
            let mut g = game.borrow_mut();
            if !g.request_start() {
                return;
            }
            // Start gesture unlocks audio
            g.audio().backend().resume();
            let tracking = &g.config().tracking;
            (tracking.token.clone(), tracking.mode.as_str())
        };
        set_loading(true);

        spawn_local(async move {
            let result = JsFuture::from(ox_init(&token, mode)).await;
            set_loading(false);

            let canvas = match result.map(|c| c.dyn_into::<HtmlCanvasElement>()) {
                Ok(Ok(canvas)) => canvas,
                Ok(Err(_)) => {
                    let err = GameError::TrackingInit("engine returned no canvas".into());
                    game.borrow_mut().session_failed(&err);
                    return;
                }
                Err(e) => {
                    let err = GameError::TrackingInit(GameError::js_reason(&e));
                    game.borrow_mut().session_failed(&err);
                    return;
                }
            };

            host_init(&canvas);
            load_assets(&game);
            game.borrow_mut()
                .session_started(OxEngine.surface_size(), &OxEngine);

            subscribe(game.clone());
            setup_tap_handler(&canvas, game.clone());
            request_animation_frame(game);
        });
    }

    fn load_assets(game: &Rc<RefCell<WebGame>>) {
        let (assets, label, color) = {
            let g = game.borrow();
            (
                g.config().assets.clone(),
                g.scene().reward_label.clone(),
                coin_hunt::consts::REWARD_COLOR,
            )
        };

        watch_asset(game.clone(), AssetKind::CoinModel, assets.coin_model.clone(), host_load_model(&assets.coin_model));

        // Reward text reflects the environment map, so it waits for it
        let game = game.clone();
        spawn_local(async move {
            let env = JsFuture::from(host_load_env_map(&assets.env_map)).await;
            let env_event = match env {
                Ok(_) => AssetEvent::Loaded(AssetKind::EnvironmentMap),
                Err(e) => AssetEvent::Failed(
                    AssetKind::EnvironmentMap,
                    GameError::asset(assets.env_map.as_str(), GameError::js_reason(&e)),
                ),
            };
            game.borrow_mut().on_asset(env_event);
            watch_asset(game, AssetKind::RewardText, label.clone(), host_make_text(&label, color.x, color.y, color.z));
        });
    }

    fn watch_asset(game: Rc<RefCell<WebGame>>, kind: AssetKind, name: String, promise: js_sys::Promise) {
        spawn_local(async move {
            let event = match JsFuture::from(promise).await {
                Ok(_) => AssetEvent::Loaded(kind),
                Err(e) => AssetEvent::Failed(kind, GameError::asset(name.as_str(), GameError::js_reason(&e))),
            };
            game.borrow_mut().on_asset(event);
        });
    }

    fn subscribe(game: Rc<RefCell<WebGame>>) {
        let dispatch = |game: Rc<RefCell<WebGame>>| {
            move |event: TrackingEvent| {
                game.borrow_mut()
                    .on_tracking_event(event, &OxEngine, &mut BrowserNavigator);
            }
        };

        let on_detected = {
            let mut send = dispatch(game.clone());
            Closure::<dyn FnMut(String)>::new(move |id: String| send(TrackingEvent::Detected(id)))
        };
        let on_lost = {
            let mut send = dispatch(game.clone());
            Closure::<dyn FnMut(String)>::new(move |id: String| send(TrackingEvent::Lost(id)))
        };
        let on_pose = {
            let mut send = dispatch(game.clone());
            Closure::<dyn FnMut(_)>::new(move |pose: js_sys::Float32Array| {
                match CameraPose::from_slice(&pose.to_vec()) {
                    Some(pose) => send(TrackingEvent::Pose(pose)),
                    None => log::warn!("Malformed pose ({} values)", pose.length()),
                }
            })
        };
        let on_resize = {
            let mut send = dispatch(game);
            Closure::<dyn FnMut()>::new(move || send(TrackingEvent::Resize))
        };

        ox_subscribe(
            on_detected.as_ref(),
            on_lost.as_ref(),
            on_pose.as_ref(),
            on_resize.as_ref(),
        );
        on_detected.forget();
        on_lost.forget();
        on_pose.forget();
        on_resize.forget();
    }

    fn setup_tap_handler(canvas: &HtmlCanvasElement, game: Rc<RefCell<WebGame>>) {
        let target = canvas.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
            let r = target.get_bounding_client_rect();
            let rect = SurfaceRect {
                left: r.left() as f32,
                top: r.top() as f32,
                width: r.width() as f32,
                height: r.height() as f32,
            };
            let ndc = ndc_from_client(event.client_x() as f32, event.client_y() as f32, &rect);
            if let Some(outcome) = game.borrow_mut().on_tap(ndc, &mut BrowserNavigator) {
                log::info!("Caught {} (total {})", outcome.target_id, outcome.total);
            }
        });
        let _ = canvas.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_focus_handlers(game: Rc<RefCell<WebGame>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(document) = window.document() else {
            return;
        };

        // Visibility change (tab switch, minimize)
        {
            let game = game.clone();
            let document_clone = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                let visible = document_clone.visibility_state() == web_sys::VisibilityState::Visible;
                game.borrow_mut().on_focus_changed(visible);
            });
            let _ = document.add_event_listener_with_callback(
                "visibilitychange",
                closure.as_ref().unchecked_ref(),
            );
            closure.forget();
        }

        for (name, focused) in [("blur", false), ("focus", true)] {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
                game.borrow_mut().on_focus_changed(focused);
            });
            let _ = window.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(game: Rc<RefCell<WebGame>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<WebGame>>, time: f64) {
        game.borrow_mut()
            .frame(time, &mut ThreeRenderer, &mut BrowserNavigator);

        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Coin Hunt (native) starting...");
    log::info!("Native mode plays a scripted headless catch - serve the web build for AR");

    if let Err(e) = headless::run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// One scripted session against in-memory stand-ins for the page
#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use coin_hunt::audio::{Cue, HeadlessAudio};
    use coin_hunt::camera::{CameraParameters, CameraPose};
    use coin_hunt::navigation::RecordingNavigator;
    use coin_hunt::persistence::{KeyValueStore, MemoryStore};
    use coin_hunt::render_loop::NullRenderer;
    use coin_hunt::scene::{AssetEvent, AssetKind};
    use coin_hunt::tracking::{RenderSurface, TrackingEngine, TrackingEvent};
    use coin_hunt::{Game, GameConfig, Result};
    use glam::{Mat4, Vec2, Vec3};

    struct ScriptedEngine;

    impl TrackingEngine for ScriptedEngine {
        fn camera_parameters(&self) -> CameraParameters {
            CameraParameters::default()
        }

        fn surface_size(&self) -> RenderSurface {
            RenderSurface {
                width: 1280,
                height: 720,
            }
        }
    }

    pub fn run() -> Result<()> {
        let target_id = std::env::args().nth(1).unwrap_or_else(|| "gold-coin".into());

        let mut store = MemoryStore::new();
        store.set("email", "player@example.com")?;

        let mut game = Game::new(GameConfig::default(), &target_id, store, HeadlessAudio::new())?;
        let mut nav = RecordingNavigator::default();
        let mut renderer = NullRenderer::default();
        let engine = ScriptedEngine;

        if !game.check_identity(&mut nav) {
            return Ok(());
        }
        for kind in [AssetKind::CoinModel, AssetKind::EnvironmentMap, AssetKind::RewardText] {
            game.on_asset(AssetEvent::Loaded(kind));
        }
        for cue in Cue::ALL {
            game.on_sound_decoded(cue, ());
        }

        game.request_start();
        game.session_started(engine.surface_size(), &engine);
        game.on_tracking_event(TrackingEvent::Detected(target_id.clone()), &engine, &mut nav);
        game.on_tracking_event(
            TrackingEvent::Pose(CameraPose(Mat4::from_translation(Vec3::new(0.0, 0.0, 3.0)))),
            &engine,
            &mut nav,
        );

        let mut time = 0.0;
        let mut step = |game: &mut Game<MemoryStore, HeadlessAudio>, nav: &mut RecordingNavigator| {
            time += 1000.0 / 60.0;
            game.frame(time, &mut renderer, nav);
        };
        step(&mut game, &mut nav);

        match game.on_tap(Vec2::ZERO, &mut nav) {
            Some(outcome) => log::info!(
                "Tap accepted: +{} (total {}, repeated: {})",
                outcome.awarded,
                outcome.total,
                outcome.repeated
            ),
            None => log::warn!("Tap missed the coin"),
        }

        let mut last_phase = game.phase();
        for _ in 0..(7 * 60) {
            step(&mut game, &mut nav);
            if game.phase() != last_phase {
                log::info!("{:?} -> {:?}", last_phase, game.phase());
                last_phase = game.phase();
            }
        }

        for route in &nav.routes {
            log::info!("Navigated to {}", route.path());
        }
        log::info!("Score: {} ({} fps)", game.score(), game.fps());
        Ok(())
    }
}
