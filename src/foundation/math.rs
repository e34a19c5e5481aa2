/// 32-bit xorshift generator.
///
/// Each instance is owned by whoever seeded it; nothing in the crate shares one.
#[derive(Clone, Copy, Debug)]
pub struct Xorshift32(u32);

impl Xorshift32 {
    /// Seed `0` is mapped to `1` since xorshift never leaves the zero state.
    pub fn new(seed: u32) -> Self {
        Self(if seed == 0 { 1 } else { seed })
    }

    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }

    /// Uniform value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / 4_294_967_296.0
    }
}

pub(crate) fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

pub(crate) fn smoothstep(a: f64, b: f64, t: f64) -> f64 {
    lerp(a, b, t * t * (3.0 - 2.0 * t))
}

/// Polynomial smooth minimum with blend width `k` (`k > 0`).
pub(crate) fn smin(a: f64, b: f64, k: f64) -> f64 {
    let h = (k - (a - b).abs()).max(0.0);
    a.min(b) - h * h * 0.25 / k
}

/// Cubic hermite between `(0, p0, m0)` and `(1, p1, m1)`.
pub(crate) fn hermite(t: f64, p0: f64, m0: f64, p1: f64, m1: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    (2.0 * t3 - 3.0 * t2 + 1.0) * p0
        + (t3 - 2.0 * t2 + t) * m0
        + (-2.0 * t3 + 3.0 * t2) * p1
        + (t3 - t2) * m1
}
