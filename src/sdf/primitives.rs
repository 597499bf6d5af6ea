//! Analytical distance functions for the stratigraphy shapes and the brush.

use glam::{Vec2, Vec3};

/// Horizontal band between `top` and `bottom` (top > bottom). Negative
/// exactly when `bottom <= p.y <= top`.
#[inline]
pub fn sd_band(p: Vec3, top: f32, bottom: f32) -> f32 {
    (-(top - p.y)).max(-(p.y - bottom))
}

/// Vertical cylinder of `radius`, extending `depth` downward from `center`.
#[inline]
pub fn sd_cut(p: Vec3, center: Vec3, radius: f32, depth: f32) -> f32 {
    let radial = Vec2::new(p.x - center.x, p.z - center.z).length() - radius;
    let vertical = (p.y - center.y).max((center.y - depth) - p.y);
    radial.max(vertical)
}

/// Ellipsoid with per-axis `radii` at `center`.
///
/// Average-radius approximation: the offset is normalized by the radii and
/// the normalized distance rescaled by the mean radius. Not an exact
/// ellipsoid SDF; the error grows with eccentricity, which is acceptable
/// for the near-spherical deposits it is used for.
#[inline]
pub fn sd_ellipsoid(p: Vec3, center: Vec3, radii: Vec3) -> f32 {
    let n = ((p - center) / radii).length();
    let avg_radius = (radii.x + radii.y + radii.z) / 3.0;
    (n - 1.0) * avg_radius
}

/// Sphere of `radius` at `center`. This is the brush shape.
#[inline]
pub fn sd_sphere(p: Vec3, center: Vec3, radius: f32) -> f32 {
    (p - center).length() - radius
}

/// CSG union: min(a, b).
#[inline]
pub fn sd_union(a: f32, b: f32) -> f32 {
    a.min(b)
}

/// CSG intersection: max(a, b).
#[inline]
pub fn sd_intersect(a: f32, b: f32) -> f32 {
    a.max(b)
}

/// CSG subtraction: removes b from a.
#[inline]
pub fn sd_subtract(a: f32, b: f32) -> f32 {
    a.max(-b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn band_sign_convention() {
        // Inside the band [-1, 0] is negative, outside positive.
        assert!(sd_band(Vec3::new(0.0, -0.5, 0.0), 0.0, -1.0) < 0.0);
        assert!(sd_band(Vec3::new(0.0, 0.5, 0.0), 0.0, -1.0) > 0.0);
        assert!(sd_band(Vec3::new(0.0, -1.5, 0.0), 0.0, -1.0) > 0.0);
        // Exact distance to the nearest face.
        assert_relative_eq!(sd_band(Vec3::new(3.0, 0.25, -7.0), 0.0, -1.0), 0.25);
        assert_relative_eq!(sd_band(Vec3::new(0.0, -0.25, 0.0), 0.0, -1.0), -0.25);
    }

    #[test]
    fn cut_contains_its_axis() {
        let c = Vec3::ZERO;
        assert!(sd_cut(Vec3::new(0.0, -0.5, 0.0), c, 1.0, 1.0) < 0.0);
        // Outside radially.
        assert!(sd_cut(Vec3::new(1.5, -0.5, 0.0), c, 1.0, 1.0) > 0.0);
        // Above the top cap.
        assert!(sd_cut(Vec3::new(0.0, 0.5, 0.0), c, 1.0, 1.0) > 0.0);
        // Below the bottom cap.
        assert!(sd_cut(Vec3::new(0.0, -1.5, 0.0), c, 1.0, 1.0) > 0.0);
    }

    #[test]
    fn ellipsoid_matches_sphere_when_uniform() {
        let center = Vec3::new(1.0, 2.0, 3.0);
        let p = Vec3::new(2.5, 2.0, 3.0);
        assert_relative_eq!(
            sd_ellipsoid(p, center, Vec3::splat(1.0)),
            sd_sphere(p, center, 1.0),
            epsilon = 1e-6
        );
    }

    #[test]
    fn csg_ops() {
        assert_eq!(sd_union(-1.0, 2.0), -1.0);
        assert_eq!(sd_intersect(-1.0, 2.0), 2.0);
        assert_eq!(sd_subtract(-1.0, -2.0), 2.0);
    }
}
