//! Typed neon text on the +X wall.
//!
//! Every change to the text throws away all glyph objects and builds the
//! row again from the first character.

use std::{f32::consts::FRAC_PI_2, sync::Arc};

use cgmath::Vector3;

use crate::gfx::{
    geometry::text::{glyph_geometry, GlyphSource, TextGeometryOptions},
    resources::{Material, Side},
    scene::{Object, Scene, Transform},
};

pub const TEXT_GROUP: &str = "text";
pub const TEXT_MATERIAL: &str = "text:main";
pub const OUTLINE_MATERIAL: &str = "text:outline";
const TEXT_COLOR: u32 = 0x2fa7e7;
const OUTLINE_COLOR: u32 = 0xff69b4;
const OUTLINE_SCALE: f32 = 1.04;
const CURSOR_START: f32 = -9.0;
const LETTER_SPACING: f32 = 0.6;

pub struct TextRenderer {
    text: String,
    font: Option<Arc<dyn GlyphSource>>,
    options: TextGeometryOptions,
    room_size: f32,
    /// z of each glyph from the last rebuild
    cursor_positions: Vec<f32>,
}

impl TextRenderer {
    pub fn new(text: &str, room_size: f32) -> Self {
        Self {
            text: text.to_string(),
            font: None,
            options: TextGeometryOptions::default(),
            room_size,
            cursor_positions: Vec::new(),
        }
    }

    /// Main glyph and outline materials, to be added to the scene once
    pub fn materials() -> [Material; 2] {
        [
            Material::unlit(TEXT_MATERIAL, TEXT_COLOR).with_transparency(1.0),
            Material::unlit(OUTLINE_MATERIAL, OUTLINE_COLOR).with_side(Side::Back),
        ]
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn cursor_positions(&self) -> &[f32] {
        &self.cursor_positions
    }

    /// Installs the font and immediately builds the current text
    pub fn set_font(&mut self, font: Arc<dyn GlyphSource>, scene: &mut Scene) {
        self.font = Some(font);
        self.rebuild(scene);
    }

    pub fn push_char(&mut self, ch: char, scene: &mut Scene) {
        self.text.push(ch);
        self.rebuild(scene);
    }

    /// Removes the last character; an empty text stays empty but is still rebuilt
    pub fn backspace(&mut self, scene: &mut Scene) {
        self.text.pop();
        self.rebuild(scene);
    }

    /// Rebuilds every glyph object. Does nothing until a font is loaded.
    pub fn rebuild(&mut self, scene: &mut Scene) {
        let Some(font) = self.font.clone() else {
            return;
        };
        let removed = scene.clear_group(TEXT_GROUP);
        self.cursor_positions.clear();

        let x = self.room_size / 2.0 - 0.2;
        let mut cursor = CURSOR_START;
        for ch in self.text.chars() {
            let geometry = glyph_geometry(font.as_ref(), ch, &self.options);
            let width = if geometry.is_empty() { 0.0 } else { geometry.bounds().size().x };

            let transform = Transform::from_translation(Vector3::new(x, -1.0, cursor)).with_rotation(0.0, -FRAC_PI_2, 0.0);
            let glyph = Object::from_geometry(&format!("glyph '{}'", ch), &geometry)
                .with_material(TEXT_MATERIAL)
                .with_transform(transform.to_matrix());
            let outline = Object::from_geometry(&format!("glyph '{}' outline", ch), &geometry)
                .with_material(OUTLINE_MATERIAL)
                .with_transform(transform.with_uniform_scale(OUTLINE_SCALE).to_matrix());
            scene.add_to_group(TEXT_GROUP, glyph);
            scene.add_to_group(TEXT_GROUP, outline);

            self.cursor_positions.push(cursor);
            cursor += width + LETTER_SPACING;
        }
        log::debug!(
            "Rebuilt text '{}': {} glyphs, replaced {} objects",
            self.text,
            self.cursor_positions.len(),
            removed
        );
    }

    /// Assigns the flicker intensity to the main glyph material
    pub fn set_opacity(&self, scene: &mut Scene, opacity: f32) {
        if let Some(material) = scene.material_manager.get_material_mut(TEXT_MATERIAL) {
            material.opacity = opacity;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::camera::{CameraController, CameraManager, OrbitCamera};
    use crate::gfx::geometry::text::tests::BlockFont;

    fn scene() -> Scene {
        let camera = OrbitCamera::new(10.0, 0.0, 0.0, Vector3::new(0.0, 0.0, 0.0), 1.0);
        let mut scene = Scene::new(CameraManager::new(camera, CameraController::new(0.005, 1.0)));
        for material in TextRenderer::materials() {
            scene.add_material(material);
        }
        scene
    }

    fn with_font(text: &str, scene: &mut Scene) -> TextRenderer {
        let mut renderer = TextRenderer::new(text, 20.0);
        renderer.set_font(Arc::new(BlockFont), scene);
        renderer
    }

    #[test]
    fn test_no_font_changes_text_only() {
        let mut scene = scene();
        let mut renderer = TextRenderer::new("Techno", 20.0);
        renderer.push_char('!', &mut scene);
        assert_eq!(renderer.text(), "Techno!");
        assert_eq!(scene.object_count(), 0);
        assert!(renderer.cursor_positions().is_empty());
    }

    #[test]
    fn test_font_load_builds_immediately() {
        let mut scene = scene();
        let renderer = with_font("Techno", &mut scene);
        assert_eq!(scene.group(TEXT_GROUP).len(), 12);
        assert_eq!(renderer.cursor_positions().len(), 6);
        assert_eq!(renderer.cursor_positions()[0], CURSOR_START);
    }

    #[test]
    fn test_append_then_backspace_restores() {
        let mut scene = scene();
        let mut renderer = with_font("Hi", &mut scene);
        let before = renderer.cursor_positions().to_vec();
        let objects_before = scene.object_count();

        renderer.push_char('X', &mut scene);
        assert_eq!(scene.object_count(), objects_before + 2);
        renderer.backspace(&mut scene);

        assert_eq!(renderer.text(), "Hi");
        assert_eq!(renderer.cursor_positions(), before.as_slice());
        assert_eq!(scene.object_count(), objects_before);
    }

    #[test]
    fn test_backspace_on_empty_text() {
        let mut scene = scene();
        let mut renderer = with_font("", &mut scene);
        renderer.backspace(&mut scene);
        assert_eq!(renderer.text(), "");
        assert_eq!(scene.object_count(), 0);
    }

    #[test]
    fn test_cursor_is_non_decreasing() {
        let mut scene = scene();
        let renderer = with_font("A B  O", &mut scene);
        let positions = renderer.cursor_positions();
        assert!(positions.windows(2).all(|w| w[1] >= w[0]));
        // block glyphs are 1.75 wide plus bevel, spaces only add the spacing
        assert!(positions[1] - positions[0] > 1.75 + LETTER_SPACING);
        assert!((positions[4] - positions[3] - LETTER_SPACING).abs() < 1e-5);
    }

    #[test]
    fn test_glyph_placement_and_outline() {
        let mut scene = scene();
        with_font("I", &mut scene);
        let ids = scene.group(TEXT_GROUP).to_vec();
        let glyph = scene.object(ids[0]).unwrap();
        let outline = scene.object(ids[1]).unwrap();

        assert_eq!(glyph.get_material_id(), Some(TEXT_MATERIAL));
        assert_eq!(outline.get_material_id(), Some(OUTLINE_MATERIAL));
        // rotated onto the +X wall: extrusion depth runs along -X
        let bounds = glyph.world_bounds();
        assert!(bounds.max.x <= 9.8 + 0.08 + 1e-4);
        assert!(bounds.min.z >= CURSOR_START - 0.2);
        assert!(outline.world_bounds().size().z > bounds.size().z);
    }

    #[test]
    fn test_flicker_reaches_main_material_only() {
        let mut scene = scene();
        let renderer = with_font("A", &mut scene);
        renderer.set_opacity(&mut scene, 0.55);
        assert_eq!(scene.material_manager.get_material(TEXT_MATERIAL).map(|m| m.opacity), Some(0.55));
        assert_eq!(scene.material_manager.get_material(OUTLINE_MATERIAL).map(|m| m.opacity), Some(1.0));
    }
}
