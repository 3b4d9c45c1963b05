use glam::DVec3;
use rand::Rng;

/// Observation points of a potential-field survey.
///
/// Immutable once built: data modules share the same points for every
/// component measured at them.
#[derive(Clone, Debug, PartialEq)]
pub struct ObservationSet {
    pub points: Vec<DVec3>,
}

impl ObservationSet {
    pub fn from_points(points: Vec<DVec3>) -> Self {
        Self { points }
    }

    /// Regular grid over `area = [x1, x2, y1, y2]` at constant height `z`,
    /// with `shape = (nx, ny)` points. x varies fastest.
    pub fn regular_grid(area: [f64; 4], shape: (usize, usize), z: f64) -> Self {
        let [x1, x2, y1, y2] = area;
        let (nx, ny) = shape;
        let step = |lo: f64, hi: f64, n: usize| {
            if n > 1 { (hi - lo) / (n - 1) as f64 } else { 0.0 }
        };
        let (dx, dy) = (step(x1, x2, nx), step(y1, y2, ny));
        let points = (0..ny)
            .flat_map(|j| (0..nx).map(move |i| DVec3::new(x1 + i as f64 * dx, y1 + j as f64 * dy, z)))
            .collect();
        Self::from_points(points)
    }

    /// `count` points scattered uniformly over `area = [x1, x2, y1, y2]` at
    /// constant height `z`.
    pub fn random_in_square(count: usize, area: [f64; 4], z: f64, rng: &mut impl Rng) -> Self {
        let [x1, x2, y1, y2] = area;
        let points = (0..count)
            .map(|_| {
                let x = rng.random_range(x1..=x2);
                let y = rng.random_range(y1..=y2);
                DVec3::new(x, y, z)
            })
            .collect();
        Self::from_points(points)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Adds uniform noise in `[-amplitude, amplitude]` to every value.
pub fn contaminate(values: &mut [f64], amplitude: f64, rng: &mut impl Rng) {
    if amplitude <= 0.0 {
        return;
    }
    for v in values {
        *v += rng.random_range(-amplitude..=amplitude);
    }
}
