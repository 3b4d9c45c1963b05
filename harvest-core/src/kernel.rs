//! Gravitational effect of a right rectangular prism.
//!
//! Closed-form solutions summed over the eight prism corners (Nagy et al.,
//! 2000). Coordinates are x -> North, y -> East and z -> Down. Densities are
//! in kg/m³, gz is returned in mGal and the gravity gradient tensor
//! components in Eötvös.
//!
//! Observation points must not sit on a prism corner or edge.

use glam::DVec3;

use crate::mesh::Prism;

/// Gravitational constant in SI units.
pub const G: f64 = 0.000_000_000_066_73;
/// Conversion from m/s² to mGal.
pub const SI2MGAL: f64 = 100_000.0;
/// Conversion from 1/s² to Eötvös.
pub const SI2EOTVOS: f64 = 1_000_000_000.0;

/// `ln(x)`, or zero when `x` is vanishingly small.
#[inline]
fn safe_log(x: f64) -> f64 {
    if x.abs() < 1e-10 { 0.0 } else { x.ln() }
}

/// `atan2` folded onto the branch the prism formulas expect.
#[inline]
fn safe_atan2(y: f64, x: f64) -> f64 {
    if y == 0.0 {
        return 0.0;
    }
    let res = y.atan2(x);
    if y > 0.0 && x < 0.0 {
        res - std::f64::consts::PI
    } else if y < 0.0 && x < 0.0 {
        res + std::f64::consts::PI
    } else {
        res
    }
}

/// Sums `kernel(x, y, z, r)` over the corners of `prism` relative to
/// `point`, with alternating signs.
fn integrate(prism: &Prism, point: DVec3, kernel: impl Fn(f64, f64, f64, f64) -> f64) -> f64 {
    let xs = [prism.x2 - point.x, prism.x1 - point.x];
    let ys = [prism.y2 - point.y, prism.y1 - point.y];
    let zs = [prism.z2 - point.z, prism.z1 - point.z];
    let mut res = 0.0;
    for (k, &z) in zs.iter().enumerate() {
        for (j, &y) in ys.iter().enumerate() {
            for (i, &x) in xs.iter().enumerate() {
                let r = (x * x + y * y + z * z).sqrt();
                let sign = if (i + j + k) % 2 == 0 { 1.0 } else { -1.0 };
                res += sign * kernel(x, y, z, r);
            }
        }
    }
    res
}

fn evaluate(
    density: f64,
    prism: &Prism,
    points: &[DVec3],
    scale: f64,
    kernel: impl Fn(f64, f64, f64, f64) -> f64 + Copy,
) -> Vec<f64> {
    points
        .iter()
        .map(|&p| integrate(prism, p, kernel) * density * G * scale)
        .collect()
}

/// Vertical component of the gravitational attraction (mGal).
pub fn gz(density: f64, prism: &Prism, points: &[DVec3]) -> Vec<f64> {
    evaluate(density, prism, points, SI2MGAL, |x, y, z, r| {
        -(x * safe_log(y + r) + y * safe_log(x + r) - z * safe_atan2(x * y, z * r))
    })
}

/// xx component of the gravity gradient tensor (Eötvös).
pub fn gxx(density: f64, prism: &Prism, points: &[DVec3]) -> Vec<f64> {
    evaluate(density, prism, points, SI2EOTVOS, |x, y, z, r| {
        -safe_atan2(z * y, x * r)
    })
}

/// xy component of the gravity gradient tensor (Eötvös).
pub fn gxy(density: f64, prism: &Prism, points: &[DVec3]) -> Vec<f64> {
    evaluate(density, prism, points, SI2EOTVOS, |_, _, z, r| {
        safe_log(z + r)
    })
}

/// xz component of the gravity gradient tensor (Eötvös).
pub fn gxz(density: f64, prism: &Prism, points: &[DVec3]) -> Vec<f64> {
    evaluate(density, prism, points, SI2EOTVOS, |_, y, _, r| {
        safe_log(y + r)
    })
}

/// yy component of the gravity gradient tensor (Eötvös).
pub fn gyy(density: f64, prism: &Prism, points: &[DVec3]) -> Vec<f64> {
    evaluate(density, prism, points, SI2EOTVOS, |x, y, z, r| {
        -safe_atan2(z * x, y * r)
    })
}

/// yz component of the gravity gradient tensor (Eötvös).
pub fn gyz(density: f64, prism: &Prism, points: &[DVec3]) -> Vec<f64> {
    evaluate(density, prism, points, SI2EOTVOS, |x, _, _, r| {
        safe_log(x + r)
    })
}

/// zz component of the gravity gradient tensor (Eötvös).
pub fn gzz(density: f64, prism: &Prism, points: &[DVec3]) -> Vec<f64> {
    evaluate(density, prism, points, SI2EOTVOS, |x, y, z, r| {
        -safe_atan2(x * y, z * r)
    })
}
