//! Debug panel for live material tuning

use crate::config::PanelSettings;
use crate::scene::PhysicalMaterial;

/// Slider range and grouping for one material field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderRange {
    pub label: &'static str,
    pub group: &'static str,
    pub min: f32,
    pub max: f32,
    pub step: f64,
}

/// Material values exposed as sliders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialField {
    Roughness,
    Metalness,
    Iridescence,
    IridescenceIor,
    IridescenceThicknessMax,
    Transmission,
    Ior,
    Thickness,
}

pub const MATERIAL_PROPERTIES: &str = "Material Properties";
pub const IRIDESCENCE: &str = "Iridescence";
pub const TRANSMISSION: &str = "Transmission";

/// Groups in display order
pub const GROUPS: [&str; 3] = [MATERIAL_PROPERTIES, IRIDESCENCE, TRANSMISSION];

impl MaterialField {
    pub const ALL: [MaterialField; 8] = [
        MaterialField::Roughness,
        MaterialField::Metalness,
        MaterialField::Iridescence,
        MaterialField::IridescenceIor,
        MaterialField::IridescenceThicknessMax,
        MaterialField::Transmission,
        MaterialField::Ior,
        MaterialField::Thickness,
    ];

    pub fn range(self) -> SliderRange {
        let (label, group, min, max, step) = match self {
            MaterialField::Roughness => ("roughness", MATERIAL_PROPERTIES, 0.0, 1.0, 0.001),
            MaterialField::Metalness => ("metalness", MATERIAL_PROPERTIES, 0.0, 1.0, 0.001),
            MaterialField::Iridescence => ("iridescence", IRIDESCENCE, 0.0, 1.0, 0.0001),
            MaterialField::IridescenceIor => ("iridescenceIOR", IRIDESCENCE, 1.0, 2.333, 0.0001),
            MaterialField::IridescenceThicknessMax => {
                ("iridescenceThicknessRange", IRIDESCENCE, 1.0, 1000.0, 1.0)
            }
            MaterialField::Transmission => ("transmission", TRANSMISSION, 0.0, 1.0, 0.0001),
            MaterialField::Ior => ("ior", TRANSMISSION, 1.0, 10.0, 0.0001),
            MaterialField::Thickness => ("thickness", TRANSMISSION, 0.0, 1.0, 0.0001),
        };
        SliderRange {
            label,
            group,
            min,
            max,
            step,
        }
    }

    fn value_mut(self, material: &mut PhysicalMaterial) -> &mut f32 {
        match self {
            MaterialField::Roughness => &mut material.roughness,
            MaterialField::Metalness => &mut material.metalness,
            MaterialField::Iridescence => &mut material.iridescence,
            MaterialField::IridescenceIor => &mut material.iridescence_ior,
            MaterialField::IridescenceThicknessMax => &mut material.iridescence_thickness_range[1],
            MaterialField::Transmission => &mut material.transmission,
            MaterialField::Ior => &mut material.ior,
            MaterialField::Thickness => &mut material.thickness,
        }
    }

    pub fn get(self, material: &PhysicalMaterial) -> f32 {
        match self {
            MaterialField::Roughness => material.roughness,
            MaterialField::Metalness => material.metalness,
            MaterialField::Iridescence => material.iridescence,
            MaterialField::IridescenceIor => material.iridescence_ior,
            MaterialField::IridescenceThicknessMax => material.iridescence_thickness_range[1],
            MaterialField::Transmission => material.transmission,
            MaterialField::Ior => material.ior,
            MaterialField::Thickness => material.thickness,
        }
    }

    /// Write `value` clamped to the field's range; returns the stored value
    pub fn set(self, material: &mut PhysicalMaterial, value: f32) -> f32 {
        let range = self.range();
        let clamped = if value.is_nan() {
            range.min
        } else {
            value.clamp(range.min, range.max)
        };
        *self.value_mut(material) = clamped;
        clamped
    }
}

/// The "Play with the Bubbles" window
#[derive(Debug, Clone)]
pub struct ParameterPanel {
    settings: PanelSettings,
}

impl ParameterPanel {
    pub fn new(settings: PanelSettings) -> Self {
        Self { settings }
    }

    pub fn title(&self) -> &str {
        &self.settings.title
    }

    /// Draw the panel; nothing is shown until the bubble material exists.
    /// Returns true when a value changed this frame.
    pub fn show(&self, ctx: &egui::Context, material: Option<&mut PhysicalMaterial>) -> bool {
        let Some(material) = material else {
            return false;
        };

        let mut changed = false;
        egui::Window::new(self.settings.title.as_str())
            .default_pos([10.0, 10.0])
            .default_width(self.settings.width)
            .default_open(self.settings.start_open)
            .resizable(false)
            .show(ctx, |ui| {
                for group in GROUPS {
                    egui::CollapsingHeader::new(group)
                        .default_open(false)
                        .show(ui, |ui| {
                            for field in MaterialField::ALL
                                .into_iter()
                                .filter(|field| field.range().group == group)
                            {
                                changed |= Self::slider(ui, field, material);
                            }
                        });
                }
            });

        changed
    }

    fn slider(ui: &mut egui::Ui, field: MaterialField, material: &mut PhysicalMaterial) -> bool {
        let range = field.range();
        let mut value = field.get(material);
        let response = ui.add(
            egui::Slider::new(&mut value, range.min..=range.max)
                .text(range.label)
                .step_by(range.step),
        );
        if response.changed() {
            field.set(material, value);
            true
        } else {
            false
        }
    }
}

impl Default for ParameterPanel {
    fn default() -> Self {
        Self::new(PanelSettings::default())
    }
}
