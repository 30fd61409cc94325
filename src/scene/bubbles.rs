//! Bubble placement and the per-frame drift

use glam::Vec3;
use rand::Rng;
use std::f32::consts::PI;

use super::material::MaterialId;
use super::transform::Transform;

/// Number of bubbles in the scene, fixed for the life of the process
pub const BUBBLE_COUNT: usize = 800;

/// Edge length of the cube bubbles are scattered in, centered on the origin
pub const BUBBLE_SPREAD: f32 = 30.0;

/// Peak per-frame displacement along Y and Z
pub const DRIFT_AMPLITUDE: f32 = 0.005;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bubble {
    pub transform: Transform,
    pub material: MaterialId,
}

/// Scatter [`BUBBLE_COUNT`] bubbles, all sharing `material`.
///
/// Positions are uniform in the spread cube, X and Y rotations uniform in
/// [0, π] and the uniform scale in [0, 1).
pub fn spawn_bubbles<R: Rng + ?Sized>(rng: &mut R, material: MaterialId) -> Vec<Bubble> {
    (0..BUBBLE_COUNT)
        .map(|_| {
            let position = Vec3::new(
                (rng.r#gen::<f32>() - 0.5) * BUBBLE_SPREAD,
                (rng.r#gen::<f32>() - 0.5) * BUBBLE_SPREAD,
                (rng.r#gen::<f32>() - 0.5) * BUBBLE_SPREAD,
            );
            let rotation = Vec3::new(rng.r#gen::<f32>() * PI, rng.r#gen::<f32>() * PI, 0.0);
            let scale = rng.r#gen::<f32>();

            Bubble {
                transform: Transform {
                    position,
                    rotation,
                    scale: Vec3::splat(scale),
                },
                material,
            }
        })
        .collect()
}

/// Y and Z increment applied to a bubble at `x` when `elapsed` seconds have
/// passed
pub fn drift_offset(elapsed: f64, x: f32) -> f32 {
    ((elapsed + x as f64).sin() * DRIFT_AMPLITUDE as f64) as f32
}

/// Advance every bubble by one frame. The increment accumulates onto the
/// previous position; X never changes.
pub fn animate(bubbles: &mut [Bubble], elapsed: f64) {
    for bubble in bubbles {
        let offset = drift_offset(elapsed, bubble.transform.position.x);
        bubble.transform.position.y += offset;
        bubble.transform.position.z += offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::material::{MaterialTable, PhysicalMaterial};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn bubbles(seed: u64) -> Vec<Bubble> {
        let mut table = MaterialTable::new();
        let id = table.insert(PhysicalMaterial::bubble());
        spawn_bubbles(&mut StdRng::seed_from_u64(seed), id)
    }

    #[test]
    fn test_spawn_ranges() {
        let bubbles = bubbles(1);
        assert_eq!(bubbles.len(), BUBBLE_COUNT);
        for bubble in &bubbles {
            let t = bubble.transform;
            assert!(t.position.abs().max_element() <= 15.0);
            assert!((0.0..=PI).contains(&t.rotation.x));
            assert!((0.0..=PI).contains(&t.rotation.y));
            assert_eq!(t.rotation.z, 0.0);
            assert!((0.0..1.0).contains(&t.scale.x));
            assert_eq!(t.scale.x, t.scale.y);
            assert_eq!(t.scale.x, t.scale.z);
        }
    }

    #[test]
    fn test_same_seed_same_bubbles() {
        assert_eq!(bubbles(7), bubbles(7));
        assert_ne!(bubbles(7), bubbles(8));
    }

    #[test]
    fn test_drift_offset_formula() {
        let offset = drift_offset(2.0, 0.5);
        assert!((offset - 2.5f32.sin() * 0.005).abs() < 1e-7);
        assert_eq!(drift_offset(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_animate_accumulates_on_y_and_z() {
        let mut bubbles = bubbles(3);
        let before = bubbles.clone();

        animate(&mut bubbles, 1.25);
        animate(&mut bubbles, 1.25);

        for (after, before) in bubbles.iter().zip(&before) {
            let p0 = before.transform.position;
            let p1 = after.transform.position;
            let step = drift_offset(1.25, p0.x);
            assert_eq!(p1.x, p0.x);
            assert!((p1.y - (p0.y + 2.0 * step)).abs() < 1e-5);
            assert!((p1.z - (p0.z + 2.0 * step)).abs() < 1e-5);
        }
    }
}
