//! The techno room: walls and lights, an animated model, typed neon text
//! and floating crystals, advanced once per frame by [`RoomState::tick`].

pub mod animation;
pub mod crystals;
pub mod environment;
pub mod frame;
pub mod model;
pub mod text;

use std::sync::Arc;

use cgmath::Vector3;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    assets::{request_font, request_model, AssetRequest},
    config::RoomConfig,
    gfx::{
        camera::{CameraController, CameraManager, OrbitCamera},
        geometry::text::GlyphSource,
        scene::Scene,
    },
};

use crystals::CrystalField;
use frame::{flicker, FrameClock, FrameTime};
use model::{ModelData, ModelInstance};
use text::TextRenderer;

pub const CAMERA_DISTANCE: f32 = 10.0;
pub const CAMERA_DAMPING: f32 = 0.05;

/// Everything the frame loop and the input handlers mutate
pub struct RoomState {
    pub scene: Scene,
    pub text: TextRenderer,
    pub crystals: CrystalField,
    pub model: Option<ModelInstance>,
    config: RoomConfig,
    clock: FrameClock,
    pending_model: Option<AssetRequest<ModelData>>,
    pending_font: Option<AssetRequest<Arc<dyn GlyphSource>>>,
}

impl RoomState {
    /// Builds the room and starts loading the model and the font in the background
    pub fn new(config: RoomConfig, aspect: f32) -> Self {
        let model = request_model(config.model_path());
        let font = request_font(config.font_path());
        let seed = config.crystal_seed;
        let mut state = match seed {
            Some(seed) => Self::with_rng(config, aspect, &mut StdRng::seed_from_u64(seed)),
            None => Self::with_rng(config, aspect, &mut rand::rng()),
        };
        state.pending_model = Some(model);
        state.pending_font = Some(font);
        state
    }

    /// Builds the room without any asset requests, drawing the crystal layout from `rng`
    pub fn with_rng(config: RoomConfig, aspect: f32, rng: &mut impl Rng) -> Self {
        let camera = OrbitCamera::new(CAMERA_DISTANCE, 0.0, 0.0, Vector3::new(0.0, 0.0, 0.0), aspect)
            .with_damping(CAMERA_DAMPING);
        let controller = CameraController::new(0.005, 1.0);
        let mut scene = Scene::new(CameraManager::new(camera, controller));

        environment::build_room(&mut scene, &config);
        scene.lights = environment::light_rig();
        for material in TextRenderer::materials() {
            scene.add_material(material);
        }
        let text = TextRenderer::new(&config.initial_text, config.room_size);
        let crystals = CrystalField::spawn(&mut scene, &config, rng);

        let stats = scene.get_statistics();
        log::info!(
            "Room ready: {} objects, {} materials, {} triangles",
            stats.object_count,
            stats.material_count,
            stats.total_triangles
        );

        Self {
            scene,
            text,
            crystals,
            model: None,
            config,
            clock: FrameClock::new(),
            pending_model: None,
            pending_font: None,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// True while the model or the font is still loading
    pub fn assets_pending(&self) -> bool {
        self.pending_model.as_ref().is_some_and(|r| r.is_pending())
            || self.pending_font.as_ref().is_some_and(|r| r.is_pending())
    }

    /// Advances the room by the time since the previous tick
    pub fn tick(&mut self) {
        let time = self.clock.tick();
        self.advance(time);
    }

    /// One frame step with explicit timing
    pub fn advance(&mut self, time: FrameTime) {
        self.poll_assets();

        if let Some(model) = self.model.as_mut() {
            model.update(&mut self.scene, time.delta);
        }
        self.scene.update();
        self.text.set_opacity(&mut self.scene, flicker(time.elapsed));
        self.crystals.update(&mut self.scene, time.elapsed);
    }

    fn poll_assets(&mut self) {
        if let Some(result) = self.pending_model.as_mut().and_then(|r| r.poll()) {
            self.pending_model = None;
            match result {
                Ok(data) => self.install_model(data),
                Err(e) => log::error!("Model load error: {}", e),
            }
        }
        if let Some(result) = self.pending_font.as_mut().and_then(|r| r.poll()) {
            self.pending_font = None;
            match result {
                Ok(font) => self.install_font(font),
                Err(e) => log::error!("Font load error: {}", e),
            }
        }
    }

    pub fn install_model(&mut self, data: ModelData) {
        self.model = Some(ModelInstance::install(&mut self.scene, data, self.config.room_size));
    }

    pub fn install_font(&mut self, font: Arc<dyn GlyphSource>) {
        self.text.set_font(font, &mut self.scene);
    }

    /// Appends the printable characters of a key press
    pub fn type_text(&mut self, text: &str) {
        for ch in text.chars().filter(|c| !c.is_control()) {
            self.text.push_char(ch, &mut self.scene);
        }
    }

    pub fn backspace(&mut self) {
        self.text.backspace(&mut self.scene);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::geometry::text::tests::BlockFont;
    use crate::room::model::tests::triangle;
    use std::{
        path::PathBuf,
        thread,
        time::{Duration, Instant},
    };

    fn config() -> RoomConfig {
        RoomConfig {
            asset_root: PathBuf::from("does/not/exist"),
            ..RoomConfig::default()
        }
    }

    fn room() -> RoomState {
        RoomState::with_rng(config(), 1.5, &mut StdRng::seed_from_u64(9))
    }

    fn opacity(state: &RoomState) -> Option<f32> {
        state
            .scene
            .material_manager
            .get_material(text::TEXT_MATERIAL)
            .map(|m| m.opacity)
    }

    #[test]
    fn test_room_contents() {
        let state = room();
        // six walls plus the crystals, no text before the font arrives
        assert_eq!(state.scene.object_count(), 26);
        assert_eq!(state.scene.lights.spots.len(), 4);
        assert!(state.model.is_none());
        assert!(!state.assets_pending());
    }

    #[test]
    fn test_advance_flickers_text_and_moves_crystals() {
        let mut state = room();
        let before = state.crystals.crystals()[0].rotation;
        state.advance(FrameTime {
            delta: 0.016,
            elapsed: 0.3,
        });
        assert_eq!(opacity(&state), Some(flicker(0.3)));
        let after = state.crystals.crystals()[0].rotation;
        assert!(after.1 >= before.1);
    }

    #[test]
    fn test_typing_before_and_after_font() {
        let mut state = room();
        state.type_text("!\u{8}\r");
        assert_eq!(state.text.text(), "Techno!");
        assert_eq!(state.scene.object_count(), 26);

        state.install_font(Arc::new(BlockFont));
        assert_eq!(state.scene.object_count(), 26 + 2 * 7);
        state.backspace();
        assert_eq!(state.text.text(), "Techno");
        assert_eq!(state.scene.object_count(), 26 + 2 * 6);
    }

    #[test]
    fn test_missing_assets_are_logged_and_skipped() {
        let mut state = RoomState::new(config(), 1.0);
        let deadline = Instant::now() + Duration::from_secs(10);
        while state.assets_pending() {
            assert!(Instant::now() < deadline, "asset requests never resolved");
            state.tick();
            thread::sleep(Duration::from_millis(5));
        }
        assert!(state.model.is_none());
        assert!(!state.text.has_font());
    }

    #[test]
    fn test_finished_loads_are_installed_on_tick() {
        let mut state = room();
        let font: Arc<dyn GlyphSource> = Arc::new(BlockFont);
        state.pending_model = Some(AssetRequest::resolved(PathBuf::from("tri.gltf"), Ok(triangle())));
        state.pending_font = Some(AssetRequest::resolved(PathBuf::from("block.otf"), Ok(font)));
        assert!(state.assets_pending());

        state.tick();
        assert!(!state.assets_pending());
        let model = state.model.as_ref().unwrap();
        assert_eq!(model.object_ids().count(), 1);
        assert!(state.text.has_font());
        // walls and crystals, the model triangle, glyph plus outline per letter of "Techno"
        assert_eq!(state.scene.object_count(), 26 + 1 + 2 * 6);

        // resolved requests are consumed, the next tick installs nothing new
        state.tick();
        assert_eq!(state.scene.object_count(), 26 + 1 + 2 * 6);
    }
}
