//! Integration test harness for the bubble scene
//!
//! Uses headless rendering to test the full render pipeline without
//! requiring a display or window.

use glam::{Vec2, Vec3};

use bubble_scene::assets::{AssetEvent, EnvironmentMap, MatcapImage, Typeface};
use bubble_scene::config::SceneConfig;
use bubble_scene::panel::MaterialField;
use bubble_scene::render::{HeadlessRenderPipeline, Viewport};
use bubble_scene::scene::{frame, Bubble, FrameState, Transform, BUBBLE_COUNT};

const BOX_FONT: &str = r#"{
    "familyName": "Box",
    "resolution": 1000,
    "boundingBox": { "xMin": 0, "xMax": 1000, "yMin": -200, "yMax": 1000 },
    "underlineThickness": 50,
    "glyphs": {
        "?": { "ha": 1100, "o": "m 0 0 l 1000 0 l 1000 1000 l 0 1000 z" },
        " ": { "ha": 300 }
    }
}"#;

fn font_event() -> AssetEvent {
    AssetEvent::Font(Typeface::from_json(BOX_FONT).expect("fixture font parses"))
}

/// Bright sky over a dark ground
fn environment_event() -> AssetEvent {
    let mut data = Vec::new();
    for row in 0..4 {
        let value = if row < 2 { 1.0 } else { 0.05 };
        for _ in 0..8 {
            data.extend_from_slice(&[value, value * 0.9, value * 0.8]);
        }
    }
    AssetEvent::Environment(
        EnvironmentMap::from_linear_rgb(8, 4, &data).expect("fixture environment is valid"),
    )
}

fn matcap_event() -> AssetEvent {
    AssetEvent::Matcap(MatcapImage {
        width: 2,
        height: 2,
        pixels: [200u8, 40, 40, 255].repeat(4),
    })
}

/// Test harness for integration testing
pub struct TestHarness {
    pipeline: HeadlessRenderPipeline,
    state: FrameState,
    frames: Vec<Vec<u8>>,
}

/// Steps that can be executed in a test scenario
#[derive(Debug)]
pub enum TestStep {
    /// Render a frame and capture the pixels
    RenderFrame,
    /// Deliver an asset completion to the scene
    Apply(AssetEvent),
    /// Run the per-frame update at this elapsed time
    Advance(f64),
    /// Drag-rotate by a pointer delta, then settle the damping
    Rotate(f32, f32),
    /// Wheel steps, positive toward the target
    Zoom(f32),
    /// Edit a material field through the panel binding
    SetMaterial(MaterialField, f32),
    /// Replace the bubbles with one of this scale halfway between the camera
    /// and its target, or remove them all
    BubbleOnViewAxis(Option<f32>),
}

impl TestHarness {
    /// Create a new test harness with specified render dimensions
    pub async fn new(width: u32, height: u32) -> Option<Self> {
        let pipeline = HeadlessRenderPipeline::new(width, height).await?;
        let config = SceneConfig {
            seed: Some(7),
            ..SceneConfig::default()
        };
        let state = FrameState::new(&config, Viewport::new(width as f64, height as f64, 1.0));
        Some(Self {
            pipeline,
            state,
            frames: Vec::new(),
        })
    }

    /// Render a frame and return the pixel data
    pub fn render_frame(&mut self) -> &[u8] {
        let frame = self
            .pipeline
            .render_to_buffer(&self.state.scene, &self.state.camera);
        self.frames.push(frame);
        self.frames.last().map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Get all captured frames
    pub fn frames(&self) -> &[Vec<u8>] {
        &self.frames
    }

    pub fn size(&self) -> (u32, u32) {
        self.pipeline.size()
    }

    pub fn apply(&mut self, event: AssetEvent) {
        self.state.scene.apply(event);
    }

    pub fn bubble_on_view_axis(&mut self, scale: Option<f32>) {
        let Some(material) = self.state.scene.bubble_material else {
            return;
        };
        let camera = &self.state.camera;
        let position = camera.position.lerp(camera.target, 0.5);
        self.state.scene.bubbles = scale
            .map(|scale| Bubble {
                transform: Transform {
                    position,
                    rotation: Vec3::ZERO,
                    scale: Vec3::splat(scale),
                },
                material,
            })
            .into_iter()
            .collect();
    }

    fn step(&mut self, step: TestStep) -> Option<Vec<u8>> {
        match step {
            TestStep::RenderFrame => return Some(self.render_frame().to_vec()),
            TestStep::Apply(event) => self.apply(event),
            TestStep::Advance(elapsed) => frame::update(&mut self.state, elapsed),
            TestStep::Rotate(dx, dy) => {
                let height = self.size().1 as f32;
                self.state.controls.rotate(Vec2::new(dx, dy), height);
                for _ in 0..120 {
                    self.state.controls.update(&mut self.state.camera);
                }
            }
            TestStep::Zoom(steps) => {
                self.state.controls.zoom(steps);
                self.state.controls.update(&mut self.state.camera);
            }
            TestStep::SetMaterial(field, value) => {
                if let Some(material) = self.state.scene.bubble_material_mut() {
                    field.set(material, value);
                }
            }
            TestStep::BubbleOnViewAxis(scale) => self.bubble_on_view_axis(scale),
        }
        None
    }

    /// Run a sequence of test steps and return captured frames
    pub fn run_scenario(&mut self, steps: Vec<TestStep>) -> Vec<Vec<u8>> {
        steps.into_iter().filter_map(|step| self.step(step)).collect()
    }

    /// Get access to the underlying pipeline for advanced testing
    pub fn pipeline(&self) -> &HeadlessRenderPipeline {
        &self.pipeline
    }
}

/// Helper to compute the average color of a frame
pub fn average_color(pixels: &[u8]) -> (f64, f64, f64, f64) {
    if pixels.is_empty() || pixels.len() % 4 != 0 {
        return (0.0, 0.0, 0.0, 0.0);
    }

    let pixel_count = pixels.len() / 4;
    let mut sums = [0u64; 4];
    for chunk in pixels.chunks_exact(4) {
        for (sum, &channel) in sums.iter_mut().zip(chunk) {
            *sum += channel as u64;
        }
    }

    let n = pixel_count as f64;
    (
        sums[0] as f64 / n,
        sums[1] as f64 / n,
        sums[2] as f64 / n,
        sums[3] as f64 / n,
    )
}

/// Mean luminance of the square of `2 * half + 1` pixels at the frame center
pub fn center_luminance(pixels: &[u8], width: u32, height: u32, half: u32) -> f64 {
    let (cx, cy) = (width / 2, height / 2);
    let mut sum = 0.0;
    let mut count = 0usize;
    for y in cy.saturating_sub(half)..=(cy + half).min(height - 1) {
        for x in cx.saturating_sub(half)..=(cx + half).min(width - 1) {
            let i = ((y * width + x) * 4) as usize;
            if let Some(px) = pixels.get(i..i + 3) {
                sum += 0.2126 * px[0] as f64 + 0.7152 * px[1] as f64 + 0.0722 * px[2] as f64;
                count += 1;
            }
        }
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Helper to compute the fraction of pixels that differ
pub fn frame_diff_ratio(a: &[u8], b: &[u8], tolerance: u8) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }

    let differing = a
        .chunks_exact(4)
        .zip(b.chunks_exact(4))
        .filter(|(pa, pb)| {
            (0..3).any(|i| (pa[i] as i32 - pb[i] as i32).abs() > tolerance as i32)
        })
        .count();

    differing as f64 / (a.len() / 4) as f64
}

// ============================================================================
// Integration Tests
// ============================================================================

macro_rules! harness_or_skip {
    ($width:expr, $height:expr) => {
        match TestHarness::new($width, $height).await {
            Some(harness) => harness,
            None => {
                eprintln!("Skipping test: no GPU available");
                return;
            }
        }
    };
}

#[tokio::test]
async fn test_harness_creation() {
    // May fail on systems without GPU
    if let Some(h) = TestHarness::new(256, 256).await {
        assert_eq!(h.size(), (256, 256));
    }
}

#[tokio::test]
async fn test_empty_scene_is_black() {
    let mut harness = harness_or_skip!(128, 128);
    let frame = harness.render_frame();

    assert_eq!(frame.len(), 128 * 128 * 4, "Frame should be 128x128 RGBA");
    let (r, g, b, a) = average_color(frame);
    assert_eq!((r, g, b), (0.0, 0.0, 0.0));
    assert_eq!(a, 255.0);
}

#[tokio::test]
async fn test_environment_draws_background() {
    let mut harness = harness_or_skip!(128, 128);
    harness.apply(environment_event());

    let frame = harness.render_frame().to_vec();
    assert!(harness.pipeline().has_environment());
    let (r, _, _, _) = average_color(&frame);
    assert!(r > 10.0, "Background should be visible, average red {}", r);
}

#[tokio::test]
async fn test_font_builds_text_and_bubbles() {
    let mut harness = harness_or_skip!(256, 256);
    harness.apply(font_event());

    let frame = harness.render_frame().to_vec();
    assert_eq!(harness.pipeline().label_count(), 2);
    assert_eq!(harness.pipeline().bubble_count() as usize, BUBBLE_COUNT);

    // White placeholder matcap on a black clear
    assert!(frame.chunks_exact(4).any(|px| px[0] > 100));
}

#[tokio::test]
async fn test_matcap_tints_text() {
    let mut harness = harness_or_skip!(256, 256);
    let frames = harness.run_scenario(vec![
        TestStep::Apply(font_event()),
        TestStep::RenderFrame,
        TestStep::Apply(matcap_event()),
        TestStep::RenderFrame,
    ]);

    let (_, g_before, _, _) = average_color(&frames[0]);
    let (_, g_after, _, _) = average_color(&frames[1]);
    assert!(g_after < g_before, "Red matcap should darken the green channel");
}

#[tokio::test]
async fn test_orbit_changes_view() {
    let mut harness = harness_or_skip!(256, 256);
    let frames = harness.run_scenario(vec![
        TestStep::Apply(environment_event()),
        TestStep::Apply(font_event()),
        TestStep::RenderFrame,
        TestStep::Rotate(200.0, 0.0),
        TestStep::RenderFrame,
    ]);

    assert_ne!(frames[0], frames[1], "Camera orbit should change the rendered view");
}

#[tokio::test]
async fn test_zoom_changes_view() {
    let mut harness = harness_or_skip!(256, 256);
    let frames = harness.run_scenario(vec![
        TestStep::Apply(environment_event()),
        TestStep::Apply(font_event()),
        TestStep::RenderFrame,
        TestStep::Zoom(5.0),
        TestStep::RenderFrame,
    ]);

    assert_ne!(frames[0], frames[1], "Zoom should change the rendered view");
}

#[tokio::test]
async fn test_material_edit_changes_appearance() {
    let mut harness = harness_or_skip!(256, 256);
    let frames = harness.run_scenario(vec![
        TestStep::Apply(environment_event()),
        TestStep::Apply(font_event()),
        TestStep::RenderFrame,
        TestStep::SetMaterial(MaterialField::Metalness, 1.0),
        TestStep::RenderFrame,
    ]);

    assert!(
        frame_diff_ratio(&frames[0], &frames[1], 2) > 0.0,
        "Metalness should change the bubbles"
    );
}

#[tokio::test]
async fn test_drift_moves_bubbles() {
    let mut harness = harness_or_skip!(256, 256);
    let mut steps = vec![
        TestStep::Apply(environment_event()),
        TestStep::Apply(font_event()),
        TestStep::RenderFrame,
    ];
    // Hold the clock so every bubble keeps drifting the same way
    steps.extend((0..300).map(|_| TestStep::Advance(1.5)));
    steps.push(TestStep::RenderFrame);
    let frames = harness.run_scenario(steps);

    assert_eq!(frames.len(), 2);
    assert_ne!(frames[0], frames[1], "Drifted bubbles should render differently");
}

#[tokio::test]
async fn test_text_visible_through_transmissive_bubble() {
    let mut harness = harness_or_skip!(128, 128);
    let frames = harness.run_scenario(vec![
        TestStep::Apply(font_event()),
        TestStep::BubbleOnViewAxis(None),
        TestStep::RenderFrame,
        TestStep::BubbleOnViewAxis(Some(0.9)),
        TestStep::RenderFrame,
        TestStep::SetMaterial(MaterialField::Transmission, 0.0),
        TestStep::RenderFrame,
    ]);
    let (width, height) = harness.size();

    let behind = center_luminance(&frames[0], width, height, 2);
    let through = center_luminance(&frames[1], width, height, 2);
    let opaque = center_luminance(&frames[2], width, height, 2);

    assert!(behind > 100.0, "Text should sit at the frame center, luminance {}", behind);
    assert!(
        through > behind * 0.6,
        "Text should show through a transmission=1 bubble: {} behind, {} through",
        behind,
        through
    );
    assert!(
        opaque < behind * 0.3,
        "The bubble should cover the center once it stops transmitting: {}",
        opaque
    );
}

#[tokio::test]
async fn test_lit_scene_visible_through_bubble() {
    let mut harness = harness_or_skip!(128, 128);
    harness.apply(font_event());
    harness.apply(environment_event());
    harness.bubble_on_view_axis(Some(0.9));

    let frame = harness.render_frame().to_vec();
    let (width, height) = harness.size();
    assert!(center_luminance(&frame, width, height, 2) > 20.0);
}

#[tokio::test]
async fn test_oversized_assets_are_scaled_to_the_device_limit() {
    let mut harness = harness_or_skip!(64, 64);
    let wide = 16384u32;
    let environment = EnvironmentMap::from_linear_rgb(wide, 2, &vec![0.5f32; (wide * 2 * 3) as usize])
        .expect("wide environment is valid");
    harness.apply(AssetEvent::Environment(environment));
    harness.apply(AssetEvent::Matcap(MatcapImage {
        width: 9000,
        height: 1,
        pixels: [200u8, 40, 40, 255].repeat(9000),
    }));
    harness.apply(font_event());

    let frame = harness.render_frame().to_vec();
    assert!(harness.pipeline().has_environment());
    let (r, _, _, _) = average_color(&frame);
    assert!(r > 10.0, "Scaled environment should still draw, average red {}", r);
}

#[tokio::test]
async fn test_multiple_renders_deterministic() {
    let mut harness = harness_or_skip!(128, 128);
    harness.apply(environment_event());
    harness.apply(font_event());

    let frame1 = harness.render_frame().to_vec();
    let frame2 = harness.render_frame().to_vec();

    assert_eq!(
        frame1, frame2,
        "Rendering same state twice should be deterministic"
    );
    assert_eq!(harness.frames().len(), 2);
}

#[tokio::test]
async fn test_event_order_does_not_change_the_image() {
    let mut first = harness_or_skip!(128, 128);
    let mut second = harness_or_skip!(128, 128);

    first.apply(font_event());
    first.apply(matcap_event());
    first.apply(environment_event());

    second.apply(environment_event());
    second.apply(matcap_event());
    second.apply(font_event());

    let a = first.render_frame().to_vec();
    let b = second.render_frame().to_vec();
    assert_eq!(frame_diff_ratio(&a, &b, 1), 0.0);
}

#[tokio::test]
async fn test_capture_writes_png() {
    let mut harness = harness_or_skip!(64, 48);
    harness.apply(environment_event());

    let path = std::env::temp_dir().join("bubble_scene_capture_test.png");
    let TestHarness {
        pipeline, state, ..
    } = &mut harness;
    pipeline
        .capture(&path, &state.scene, &state.camera)
        .expect("capture should succeed");

    let decoded = image::open(&path).expect("PNG should decode");
    assert_eq!((decoded.width(), decoded.height()), (64, 48));
    let _ = std::fs::remove_file(path);
}

#[test]
fn test_frame_diff_utility() {
    let a = vec![255, 0, 0, 255, 0, 255, 0, 255]; // Red, Green pixels
    let b = a.clone();
    let c = vec![0, 0, 255, 255, 255, 255, 0, 255]; // Blue, Yellow pixels

    assert_eq!(frame_diff_ratio(&a, &b, 0), 0.0, "Identical frames");
    assert_eq!(frame_diff_ratio(&a, &c, 0), 1.0, "Completely different frames");
}

#[test]
fn test_average_color_utility() {
    let red = vec![255, 0, 0, 255, 255, 0, 0, 255];
    let (r, g, b, a) = average_color(&red);
    assert!((r - 255.0).abs() < 0.001);
    assert!(g.abs() < 0.001);
    assert!(b.abs() < 0.001);
    assert!((a - 255.0).abs() < 0.001);
}
