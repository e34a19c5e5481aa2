//! Built-in fx library.
//!
//! Every function here is a pure function of its [`FxContext`]; integrators keep their running
//! position/velocity in the per-section [`crate::FxState`].

use std::f64::consts::TAU;

use crate::foundation::math::{Xorshift32, hermite, smin, smoothstep};
use crate::fx::definition::{FxContext, FxDefinition, FxParamDef};
use crate::fx::registry::FxRegistry;

/// Register every built-in fx under its canonical key.
pub fn register_builtins(reg: &mut FxRegistry) {
    reg.insert("add", add());
    reg.insert("clamp", clamp());
    reg.insert("spring", spring());
    reg.insert("exp", exp());
    reg.insert("gravity", gravity());
    reg.insert("noise", noise());
    reg.insert("sine", sine());
    reg.insert("pow", pow());
    reg.insert("lofi", lofi());
    reg.insert("repeat", repeat());
    reg.insert("hermitePatch", hermite_patch());
}

/// Position/velocity pair carried across samples by integrating fx.
#[derive(Clone, Copy, Debug)]
struct Integrator {
    pos: f64,
    vel: f64,
}

/// Sign with `sign(0) == 0`.
fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Velocity of the incoming signal at the section start, or zero unless `preserve` is set.
fn entry_velocity(ctx: &FxContext<'_>, preserve: bool) -> f64 {
    if !(ctx.init && preserve) {
        return 0.0;
    }
    let dt = ctx.delta_time;
    (ctx.value - ctx.get_value(ctx.time - dt)) / dt
}

pub fn add() -> FxDefinition {
    FxDefinition::new("Add", |ctx| ctx.value + ctx.params.f64("value"))
        .description("Offset the signal by a constant.")
        .param("value", FxParamDef::float("Value", 0.0))
}

pub fn clamp() -> FxDefinition {
    FxDefinition::new("Clamp", |ctx| {
        let min = ctx.params.f64("min");
        let max = ctx.params.f64("max");
        let smooth = ctx.params.f64("smooth");
        if smooth == 0.0 {
            return ctx.value.max(min).min(max);
        }
        -smin(-min, -smin(ctx.value, max, smooth), smooth)
    })
    .description("Limit the signal to a range, optionally with smooth knees.")
    .param("min", FxParamDef::float("Min", 0.0))
    .param("max", FxParamDef::float("Max", 1.0))
    .param("smooth", FxParamDef::float("Smooth", 0.0).min(0.0))
}

pub fn spring() -> FxDefinition {
    FxDefinition::new("Critically Damped Spring", |ctx| {
        let k = ctx.params.f64("factor");
        let ratio = ctx.params.f64("ratio");
        let dt = ctx.delta_time;
        let target = ctx.value;
        let vel = entry_velocity(ctx, ctx.params.bool("preserve"));

        let s = ctx.state.get_or_init(|| Integrator { pos: target, vel });
        s.vel += (-k * (s.pos - target) - 2.0 * s.vel * k.sqrt() * ratio) * dt;
        s.pos += s.vel * dt;
        s.pos
    })
    .description("Chase the signal with a damped spring. ratio = 1 is critical damping.")
    .param("factor", FxParamDef::float("Factor", 100.0).min(0.0))
    .param("ratio", FxParamDef::float("Damp Ratio", 1.0).min(0.0))
    .param("preserve", FxParamDef::boolean("Preserve Velocity", false))
}

pub fn exp() -> FxDefinition {
    FxDefinition::new("Exponential Smoothing", |ctx| {
        let k = (-ctx.delta_time * ctx.params.f64("factor")).exp();
        let target = ctx.value;
        let s = ctx.state.get_or_init(|| Integrator {
            pos: target,
            vel: 0.0,
        });
        s.pos = target + (s.pos - target) * k;
        s.pos
    })
    .description("First-order low-pass toward the signal.")
    .param("factor", FxParamDef::float("Factor", 10.0).min(0.0))
}

pub fn gravity() -> FxDefinition {
    FxDefinition::new("Gravity", |ctx| {
        let dt = ctx.delta_time;
        let g = ctx.params.f64("a");
        let e = ctx.params.f64("e");
        let target = ctx.value;
        let vel = entry_velocity(ctx, ctx.params.bool("preserve"));

        let s = ctx.state.get_or_init(|| Integrator { pos: target, vel });
        let a = sign(target - s.pos) * g;
        s.vel += a * dt;
        s.pos += s.vel * dt;
        // Bounce off the signal once the body passes through it.
        if sign(a) != sign(target - s.pos) {
            s.vel *= -e;
            s.pos = target + e * (target - s.pos);
        }
        s.pos
    })
    .description("Fall toward the signal and bounce off it.")
    .param("a", FxParamDef::float("Acceleration", 9.8).min(0.0))
    .param("e", FxParamDef::float("Restitution", 0.5).min(0.0))
    .param("preserve", FxParamDef::boolean("Preserve Velocity", false))
}

/// Upper bound on noise table slots.
const MAX_NOISE_RESO: f64 = 1024.0;

#[derive(Debug)]
struct NoiseState {
    rng: Xorshift32,
    table: Vec<f64>,
}

impl NoiseState {
    /// `reso` must be a whole number of slots.
    fn new(seed: u32, reso: f64) -> Self {
        let mut s = Self {
            rng: Xorshift32::new(seed),
            table: vec![0.0; reso.floor() as usize + 2],
        };
        // Both ends stay at zero so the pattern wraps seamlessly.
        let mut i = 1;
        while (i as f64) < reso {
            s.table[i] = s.rng.next_f64() * 2.0 - 1.0;
            i += 1;
        }
        s
    }
}

pub fn noise() -> FxDefinition {
    FxDefinition::new("Fractal Noise", |ctx| {
        let recursion = ctx.params.int("recursion");
        let freq = ctx.params.f64("freq");
        let reso = ctx.params.f64("reso").floor();
        let amp = ctx.params.f64("amp");
        let seed = ctx.params.int("seed").clamp(0, i64::from(u32::MAX)) as u32;
        let progress = ctx.progress;

        let s = ctx.state.get_or_init(|| NoiseState::new(seed, reso));
        let mut v = ctx.value;
        for i in 0..recursion {
            let octave = 2f64.powi(i as i32);
            let index = (progress * freq * reso * octave) % reso;
            let indexi = index.floor() as usize;
            let indexf = index - index.floor();
            let factor = 0.5f64.powi(i as i32 + 1);
            let a = s.table.get(indexi).copied().unwrap_or(0.0);
            let b = s.table.get(indexi + 1).copied().unwrap_or(0.0);
            v += amp * factor * smoothstep(a, b, indexf);
        }
        v
    })
    .description("Add seeded fractal value noise.")
    .param("recursion", FxParamDef::int("Recursion", 4).min(1.0).max(99.0))
    .param("freq", FxParamDef::float("Frequency", 5.0).min(0.0))
    .param(
        "reso",
        FxParamDef::float("Resolution", 8.0)
            .min(1.0)
            .max(MAX_NOISE_RESO),
    )
    .param("seed", FxParamDef::int("Seed", 1).min(0.0))
    .param("amp", FxParamDef::float("Amp", 0.2))
}

pub fn sine() -> FxDefinition {
    FxDefinition::new("Sinewave", |ctx| {
        let amp = ctx.params.f64("amp");
        let freq = ctx.params.f64("freq");
        let offset = ctx.params.f64("offset");
        ctx.value + amp * (TAU * (freq * ctx.elapsed + offset)).sin()
    })
    .description("Add a sine wave.")
    .param("amp", FxParamDef::float("Amp", 0.1))
    .param("freq", FxParamDef::float("Frequency", 5.0))
    .param("offset", FxParamDef::float("Offset", 0.0).min(0.0).max(1.0))
}

pub fn pow() -> FxDefinition {
    FxDefinition::new("Power", |ctx| {
        let p = ctx.params.f64("pow");
        let bias = ctx.params.f64("bias");
        let v = ctx.value - bias;
        let shaped = if ctx.params.bool("positive") {
            v.abs().powf(p)
        } else {
            sign(v) * v.abs().powf(p)
        };
        shaped + bias
    })
    .description("Raise the signal to a power around a bias point.")
    .param("pow", FxParamDef::float("Power", 2.0))
    .param("bias", FxParamDef::float("Bias", 0.0))
    .param("positive", FxParamDef::boolean("Force Positive", false))
}

pub fn lofi() -> FxDefinition {
    FxDefinition::new("Lo-Fi", |ctx| {
        let rate = ctx.params.f64("rate");
        if rate == 0.0 {
            return ctx.value;
        }
        let held = if ctx.params.bool("relative") {
            ctx.t0 + (ctx.elapsed * rate).floor() / rate
        } else {
            (ctx.time * rate).floor() / rate
        };
        ctx.get_value(held)
    })
    .description("Sample-and-hold the signal at a fixed rate.")
    .param("rate", FxParamDef::float("Frame Rate", 10.0).min(0.0))
    .param("relative", FxParamDef::boolean("Relative", false))
}

pub fn repeat() -> FxDefinition {
    FxDefinition::new("Repeat", |ctx| {
        let interval = ctx.params.f64("interval");
        if interval <= 0.0 || ctx.elapsed < interval {
            return ctx.value;
        }
        ctx.get_value(ctx.t0 + ctx.elapsed % interval)
    })
    .description("Loop the first interval of the section.")
    .param("interval", FxParamDef::float("Interval", 1.0).min(0.0))
}

#[derive(Clone, Copy, Debug)]
struct Patch {
    v0: f64,
    m0: f64,
    v1: f64,
    m1: f64,
}

impl Patch {
    fn measure(ctx: &FxContext<'_>) -> Self {
        let dt = ctx.delta_time;
        let v0 = ctx.get_value(ctx.t0);
        let v1 = ctx.get_value(ctx.t1);
        Self {
            v0,
            m0: (v0 - ctx.get_value(ctx.t0 - dt)) / dt * ctx.length,
            v1,
            m1: (ctx.get_value(ctx.t1 + dt) - v1) / dt * ctx.length,
        }
    }
}

pub fn hermite_patch() -> FxDefinition {
    FxDefinition::new("Hermite Patch", |ctx| {
        let cached = ctx.state.get_mut::<Patch>().copied();
        let p = match cached {
            Some(p) => p,
            None => {
                let p = Patch::measure(ctx);
                *ctx.state.get_or_init(|| p)
            }
        };
        hermite(ctx.progress, p.v0, p.m0, p.v1, p.m1)
    })
    .description("Replace the section with a hermite bridge matching both ends.")
}

#[cfg(test)]
#[path = "../../tests/unit/fx/builtin.rs"]
mod tests;
