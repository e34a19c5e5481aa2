use crate::fx::definition::{FxContext, FxDefinition, FxParams, FxState};

/// Buffer span covered by one fx section.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct SectionSpan {
    /// First index, `ceil(resolution * time)`.
    pub(crate) i0: usize,
    /// One past the last index, `floor(resolution * (time + length))`.
    pub(crate) i1: usize,
    pub(crate) time: f64,
    pub(crate) length: f64,
}

impl SectionSpan {
    /// Compute the span of `[time, time + length)`, clipped to a buffer of `len` samples.
    ///
    /// Returns `None` when the section covers no sample.
    pub(crate) fn new(time: f64, length: f64, resolution: f64, len: usize) -> Option<Self> {
        let i0 = (resolution * time).ceil().max(0.0) as usize;
        let i1 = ((resolution * (time + length)).floor().max(0.0) as usize).min(len);
        (i0 < i1).then_some(Self {
            i0,
            i1,
            time,
            length,
        })
    }
}

/// Run one section over `values` and return its output for `span.i0..span.i1`.
///
/// `lookup` must read the same committed buffer as `values`; the caller writes the output back
/// only after this returns.
pub(crate) fn run_section(
    def: &FxDefinition,
    params: &FxParams,
    span: SectionSpan,
    resolution: f64,
    values: &[f32],
    lookup: &dyn Fn(f64) -> f64,
) -> Vec<f32> {
    let mut state = FxState::default();
    let mut out = Vec::with_capacity(span.i1 - span.i0);
    let delta_time = 1.0 / resolution;

    for index in span.i0..span.i1 {
        let time = index as f64 / resolution;
        let elapsed = time - span.time;
        let mut ctx = FxContext {
            index,
            i0: span.i0,
            i1: span.i1,
            time,
            t0: span.time,
            t1: span.time + span.length,
            delta_time,
            value: f64::from(values[index]),
            progress: elapsed / span.length,
            elapsed,
            resolution,
            length: span.length,
            params,
            state: &mut state,
            init: index == span.i0,
            lookup,
        };
        out.push((def.func)(&mut ctx) as f32);
    }
    out
}
