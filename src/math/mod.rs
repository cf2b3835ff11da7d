/// 2D point type.
pub type Point2 = nalgebra::Point2<f64>;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 2D vector type.
pub type Vector2 = nalgebra::Vector2<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// A triangle in physical 3D space.
pub type Triangle3 = [Point3; 3];

/// Snaps a coordinate to the integer database-unit grid.
///
/// Round-half-up (`floor(x + 0.5)`), matching the quantization used for
/// z levels and directed-edge keys throughout the generator.
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn snap(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}

/// Greatest common divisor of two non-negative integers.
#[must_use]
pub fn gcd(mut a: i64, mut b: i64) -> i64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}
