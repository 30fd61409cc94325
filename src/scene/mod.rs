//! Owned scene context
//!
//! Everything the renderer draws lives in [`Scene`]: the bubbles and their
//! shared material, the extruded text labels, and the matcap and
//! environment once they have loaded. Asset completions are folded in with
//! [`Scene::apply`], in whatever order they arrive.

pub mod bubbles;
pub mod clock;
pub mod frame;
pub mod material;
pub mod transform;

use glam::Vec3;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::assets::{AssetEvent, EnvironmentMap, MatcapImage, Typeface};
use crate::config::TextSettings;
use crate::geometry::{MeshData, SphereMesh, TextGeometryOptions, build_text_geometry};

pub use bubbles::{BUBBLE_COUNT, Bubble};
pub use clock::Clock;
pub use frame::FrameState;
pub use material::{MaterialId, MaterialTable, PhysicalMaterial};
pub use transform::Transform;

/// A line of extruded, centered text
#[derive(Debug, Clone)]
pub struct TextLabel {
    pub text: String,
    pub mesh: MeshData,
    pub transform: Transform,
}

pub struct Scene {
    pub bubbles: Vec<Bubble>,
    pub materials: MaterialTable,
    /// Material shared by every bubble, present once the bubbles exist
    pub bubble_material: Option<MaterialId>,
    pub labels: Vec<TextLabel>,
    pub matcap: Option<MatcapImage>,
    pub environment: Option<EnvironmentMap>,
    /// Geometry shared by every bubble
    pub bubble_mesh: SphereMesh,
    text: TextSettings,
    seed: u64,
}

impl Scene {
    /// Empty scene; bubbles and labels are built when the font arrives.
    ///
    /// Without a seed, a random one is drawn and logged so a layout can be
    /// reproduced.
    pub fn new(text: TextSettings, seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(rand::random::<u64>);
        log::info!("Bubble layout seed: {}", seed);

        Self {
            bubbles: Vec::new(),
            materials: MaterialTable::new(),
            bubble_material: None,
            labels: Vec::new(),
            matcap: None,
            environment: None,
            bubble_mesh: SphereMesh::bubble(),
            text,
            seed,
        }
    }

    /// Fold one asset completion into the scene. Failures are logged and
    /// leave the scene as it was.
    pub fn apply(&mut self, event: AssetEvent) {
        match event {
            AssetEvent::Font(typeface) => {
                log::info!("Font '{}' loaded", typeface.family_name);
                self.build_from_font(&typeface);
            }
            AssetEvent::Matcap(matcap) => {
                log::info!("Matcap loaded ({}x{})", matcap.width, matcap.height);
                self.matcap = Some(matcap);
            }
            AssetEvent::Environment(environment) => {
                log::info!(
                    "Environment map loaded ({}x{}, {} mips)",
                    environment.width(),
                    environment.height(),
                    environment.mip_level_count()
                );
                self.environment = Some(environment);
            }
            AssetEvent::Failed { kind, error } => {
                log::warn!("Failed to load {}: {}", kind, error);
            }
        }
    }

    /// Build the text labels and the bubbles. Runs once; a repeated font
    /// event is ignored.
    fn build_from_font(&mut self, typeface: &Typeface) {
        if self.bubble_material.is_some() {
            log::debug!("Scene already built, ignoring font");
            return;
        }

        let options = TextGeometryOptions::from(&self.text);
        for line in &self.text.lines {
            match build_text_geometry(typeface, &line.text, &options) {
                Ok(mesh) => self.labels.push(TextLabel {
                    text: line.text.clone(),
                    mesh,
                    transform: Transform::from_position(Vec3::new(0.0, line.offset_y, 0.0)),
                }),
                Err(error) => log::warn!("Skipping text '{}': {}", line.text, error),
            }
        }

        let material = self.materials.insert(PhysicalMaterial::bubble());
        self.bubble_material = Some(material);
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.bubbles = bubbles::spawn_bubbles(&mut rng, material);

        log::info!(
            "Scene built: {} labels, {} bubbles",
            self.labels.len(),
            self.bubbles.len()
        );
    }

    /// The material every bubble shares
    pub fn bubble_material(&self) -> Option<&PhysicalMaterial> {
        self.bubble_material.and_then(|id| self.materials.get(id))
    }

    pub fn bubble_material_mut(&mut self) -> Option<&mut PhysicalMaterial> {
        self.bubble_material.and_then(|id| self.materials.get_mut(id))
    }

    /// Resolve the material a bubble refers to
    pub fn material_of(&self, bubble: &Bubble) -> Option<&PhysicalMaterial> {
        self.materials.get(bubble.material)
    }

    pub fn is_built(&self) -> bool {
        self.bubble_material.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetError, AssetKind};
    use std::path::PathBuf;

    const FONT: &str = r#"{
        "familyName": "Box",
        "resolution": 1000,
        "boundingBox": { "xMin": 0, "xMax": 1000, "yMin": 0, "yMax": 1000 },
        "glyphs": {
            "?": { "ha": 1100, "o": "m 0 0 l 1000 0 l 1000 1000 l 0 1000 z" },
            " ": { "ha": 300 }
        }
    }"#;

    fn font_event() -> AssetEvent {
        AssetEvent::Font(Typeface::from_json(FONT).unwrap())
    }

    #[test]
    fn test_font_builds_labels_and_bubbles() {
        let mut scene = Scene::new(TextSettings::default(), Some(11));
        assert!(!scene.is_built());

        scene.apply(font_event());

        assert!(scene.is_built());
        assert_eq!(scene.bubbles.len(), BUBBLE_COUNT);
        assert_eq!(scene.labels.len(), 2);
        assert_eq!(scene.labels[0].transform.position.y, 0.0);
        assert_eq!(scene.labels[1].transform.position.y, -0.8);
        assert!(scene.labels.iter().all(|label| !label.mesh.is_empty()));
    }

    #[test]
    fn test_repeated_font_keeps_bubble_count() {
        let mut scene = Scene::new(TextSettings::default(), Some(11));
        scene.apply(font_event());
        scene.apply(font_event());
        assert_eq!(scene.bubbles.len(), BUBBLE_COUNT);
        assert_eq!(scene.labels.len(), 2);
        assert_eq!(scene.materials.len(), 1);
    }

    #[test]
    fn test_failure_leaves_scene_unchanged() {
        let mut scene = Scene::new(TextSettings::default(), Some(11));
        scene.apply(AssetEvent::Failed {
            kind: AssetKind::Environment,
            error: AssetError::EmptyImage(PathBuf::from("sky.hdr")),
        });
        assert!(!scene.is_built());
        assert!(scene.environment.is_none());
        assert!(scene.labels.is_empty());
    }

    #[test]
    fn test_environment_before_font() {
        let mut scene = Scene::new(TextSettings::default(), Some(11));
        let env = EnvironmentMap::from_linear_rgb(2, 1, &[1.0; 6]).unwrap();
        scene.apply(AssetEvent::Environment(env));
        assert!(scene.environment.is_some());
        assert!(scene.bubbles.is_empty());

        scene.apply(font_event());
        assert_eq!(scene.bubbles.len(), BUBBLE_COUNT);
    }

    #[test]
    fn test_shared_material_edit_visible_from_all_bubbles() {
        let mut scene = Scene::new(TextSettings::default(), Some(5));
        scene.apply(font_event());

        if let Some(material) = scene.bubble_material_mut() {
            material.roughness = 0.42;
        }
        for bubble in &scene.bubbles {
            assert_eq!(scene.material_of(bubble).map(|m| m.roughness), Some(0.42));
        }
    }
}
