//! 2D transformation matrices for the canvas' rotate/skew/scale operations.

/// An affine transformation matrix in the engine's bottom-up space.
///
/// The matrix is represented as [a, b, c, d, e, f] corresponding to:
/// ```text
/// | a  b  0 |
/// | c  d  0 |
/// | e  f  1 |
/// ```
///
/// Transforms chain with [`then`](Transform::then); operations apply in the
/// order they are chained. Rotating about a point is therefore
///
/// ```
/// use pdf_canvas::Transform;
///
/// let about = Transform::translate(-100.0, -50.0)
///     .then(Transform::rotate(std::f32::consts::FRAC_PI_2))
///     .then(Transform::translate(100.0, 50.0));
/// let (x, y) = about.apply(100.0, 50.0);
/// assert!((x - 100.0).abs() < 1e-4 && (y - 50.0).abs() < 1e-4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    /// Identity transform (no transformation)
    pub fn identity() -> Self {
        Transform::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Transform { a, b, c, d, e, f }
    }

    /// Create a translation transform
    pub fn translate(x: f32, y: f32) -> Self {
        Transform::new(1.0, 0.0, 0.0, 1.0, x, y)
    }

    /// Create a scaling transform
    pub fn scale(sx: f32, sy: f32) -> Self {
        Transform::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Create a counter-clockwise rotation transform (angle in radians)
    pub fn rotate(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Transform::new(cos, sin, -sin, cos, 0.0, 0.0)
    }

    /// Create a skew transform; `alpha` skews the x axis, `beta` the y axis
    /// (both in radians)
    pub fn skew(alpha: f32, beta: f32) -> Self {
        Transform::new(1.0, alpha.tan(), beta.tan(), 1.0, 0.0, 0.0)
    }

    /// Combine this transform with another (self * other)
    pub fn then(self, other: Transform) -> Self {
        Transform {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Wrap this transform so it operates about `(x, y)` instead of the origin
    pub fn about(self, x: f32, y: f32) -> Self {
        Transform::translate(-x, -y)
            .then(self)
            .then(Transform::translate(x, y))
    }

    /// Map a point through the transform
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    pub fn as_array(&self) -> [f32; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotating_about_a_point_keeps_it_fixed() {
        let t = Transform::rotate(0.7).about(30.0, 40.0);
        let (x, y) = t.apply(30.0, 40.0);
        assert!((x - 30.0).abs() < 1e-4);
        assert!((y - 40.0).abs() < 1e-4);
    }

    #[test]
    fn chained_transforms_apply_in_order() {
        let t = Transform::scale(2.0, 2.0).then(Transform::translate(10.0, 0.0));
        assert_eq!(t.apply(1.0, 1.0), (12.0, 2.0));
    }
}
