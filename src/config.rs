//! Runtime configuration for the room scene.
//!
//! All values have defaults matching the stock scene. A handful can be
//! overridden from the environment; there is no config file.

use std::path::{Path, PathBuf};

/// Crystal colors. See [`RoomConfig::crystal_palette_span`].
pub const CRYSTAL_PALETTE: [u32; 6] = [0x87ceeb, 0xffd700, 0x8a2be2, 0x00ff7f, 0xff4500, 0x1e90ff];

#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Edge length of the cubic room
    pub room_size: f32,
    pub asset_root: PathBuf,
    pub wall_texture: PathBuf,
    pub model: PathBuf,
    pub font: PathBuf,
    pub initial_text: String,
    pub crystal_count: usize,
    /// Number of palette entries the crystals cycle through.
    ///
    /// The stock scene cycles over two entries, which leaves four of the six
    /// palette colors unreachable.
    pub crystal_palette_span: usize,
    /// Seed for the crystal layout; `None` draws from the thread rng
    pub crystal_seed: Option<u64>,
    pub window_size: (u32, u32),
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            room_size: 20.0,
            asset_root: PathBuf::from("assets"),
            wall_texture: PathBuf::from("wall.png"),
            model: PathBuf::from("models/myModel.glb"),
            font: PathBuf::from("fonts/Mechline.otf"),
            initial_text: "Techno".to_string(),
            crystal_count: 20,
            crystal_palette_span: 2,
            crystal_seed: None,
            window_size: (1200, 800),
        }
    }
}

impl RoomConfig {
    pub const ASSETS_VAR: &'static str = "TECHNO_ROOM_ASSETS";
    pub const TEXT_VAR: &'static str = "TECHNO_ROOM_TEXT";
    pub const SEED_VAR: &'static str = "TECHNO_ROOM_SEED";

    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from any key lookup (the process environment in `from_env`)
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(root) = lookup(Self::ASSETS_VAR) {
            self.asset_root = PathBuf::from(root);
        }
        if let Some(text) = lookup(Self::TEXT_VAR) {
            self.initial_text = text;
        }
        if let Some(seed) = lookup(Self::SEED_VAR) {
            match seed.trim().parse::<u64>() {
                Ok(seed) => self.crystal_seed = Some(seed),
                Err(e) => log::warn!("Ignoring {}='{}': {}", Self::SEED_VAR, seed, e),
            }
        }
        self
    }

    pub fn resolve(&self, relative: &Path) -> PathBuf {
        self.asset_root.join(relative)
    }

    pub fn wall_texture_path(&self) -> PathBuf {
        self.resolve(&self.wall_texture)
    }

    pub fn model_path(&self) -> PathBuf {
        self.resolve(&self.model)
    }

    pub fn font_path(&self) -> PathBuf {
        self.resolve(&self.font)
    }

    pub fn crystal_color(&self, index: usize) -> u32 {
        let span = self.crystal_palette_span.clamp(1, CRYSTAL_PALETTE.len());
        CRYSTAL_PALETTE[index % span]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_overrides_apply() {
        let vars: HashMap<&str, &str> = [
            (RoomConfig::ASSETS_VAR, "/tmp/room"),
            (RoomConfig::TEXT_VAR, "Hi"),
            (RoomConfig::SEED_VAR, "42"),
        ]
        .into_iter()
        .collect();

        let config = RoomConfig::default().with_overrides(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.asset_root, PathBuf::from("/tmp/room"));
        assert_eq!(config.initial_text, "Hi");
        assert_eq!(config.crystal_seed, Some(42));
        assert_eq!(config.model_path(), PathBuf::from("/tmp/room/models/myModel.glb"));
    }

    #[test]
    fn test_bad_seed_is_ignored() {
        let config = RoomConfig::default().with_overrides(|k| {
            (k == RoomConfig::SEED_VAR).then(|| "not-a-number".to_string())
        });
        assert_eq!(config.crystal_seed, None);
    }

    #[test]
    fn test_palette_parity() {
        let config = RoomConfig::default();
        for i in 0..20 {
            let expected = if i % 2 == 0 { CRYSTAL_PALETTE[0] } else { CRYSTAL_PALETTE[1] };
            assert_eq!(config.crystal_color(i), expected);
        }
    }

    #[test]
    fn test_full_palette_span() {
        let config = RoomConfig {
            crystal_palette_span: CRYSTAL_PALETTE.len(),
            ..Default::default()
        };
        let used: Vec<u32> = (0..6).map(|i| config.crystal_color(i)).collect();
        assert_eq!(used, CRYSTAL_PALETTE.to_vec());
    }
}
