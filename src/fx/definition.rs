use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Evaluation function of an fx definition.
pub type FxFunc = Arc<dyn Fn(&mut FxContext<'_>) -> f64 + Send + Sync>;

/// Declared type of an fx parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FxParamKind {
    Float,
    Int,
    Boolean,
}

/// A raw or resolved fx parameter value.
///
/// Serialized data stores plain JSON scalars; the parameter schema decides how they are read.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum FxParamValue {
    Boolean(bool),
    Int(i64),
    Float(f64),
}

impl FxParamValue {
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Boolean(b) => {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    pub fn as_bool(self) -> bool {
        match self {
            Self::Boolean(b) => b,
            Self::Int(i) => i != 0,
            Self::Float(f) => f != 0.0,
        }
    }
}

impl From<f64> for FxParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for FxParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for FxParamValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

/// Schema entry for one fx parameter.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct FxParamDef {
    /// Display name.
    pub name: String,
    pub kind: FxParamKind,
    pub default: FxParamValue,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl FxParamDef {
    pub fn float(name: impl Into<String>, default: f64) -> Self {
        Self {
            name: name.into(),
            kind: FxParamKind::Float,
            default: FxParamValue::Float(default),
            min: None,
            max: None,
        }
    }

    pub fn int(name: impl Into<String>, default: i64) -> Self {
        Self {
            name: name.into(),
            kind: FxParamKind::Int,
            default: FxParamValue::Int(default),
            min: None,
            max: None,
        }
    }

    pub fn boolean(name: impl Into<String>, default: bool) -> Self {
        Self {
            name: name.into(),
            kind: FxParamKind::Boolean,
            default: FxParamValue::Boolean(default),
            min: None,
            max: None,
        }
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    fn clamp(&self, mut v: f64) -> f64 {
        if let Some(min) = self.min {
            if v < min {
                v = min;
            }
        }
        if let Some(max) = self.max {
            if v > max {
                v = max;
            }
        }
        v
    }

    /// Resolve a raw stored value against this schema entry.
    ///
    /// Missing or NaN values fall back to the default; numbers are clamped to `[min, max]` and
    /// ints are rounded.
    pub fn resolve(&self, raw: Option<FxParamValue>) -> FxParamValue {
        match self.kind {
            FxParamKind::Boolean => {
                FxParamValue::Boolean(raw.unwrap_or(self.default).as_bool())
            }
            FxParamKind::Float => {
                let v = raw
                    .map(FxParamValue::as_f64)
                    .filter(|v| !v.is_nan())
                    .unwrap_or_else(|| self.default.as_f64());
                FxParamValue::Float(self.clamp(v))
            }
            FxParamKind::Int => {
                let v = raw
                    .map(FxParamValue::as_f64)
                    .filter(|v| !v.is_nan())
                    .unwrap_or_else(|| self.default.as_f64());
                FxParamValue::Int(self.clamp(v.round()) as i64)
            }
        }
    }
}

/// Parameters resolved against a definition's schema, as seen by fx functions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FxParams {
    values: BTreeMap<String, FxParamValue>,
}

impl FxParams {
    /// Numeric parameter, `0.0` when absent.
    pub fn f64(&self, key: &str) -> f64 {
        self.values.get(key).map_or(0.0, |v| v.as_f64())
    }

    pub fn int(&self, key: &str) -> i64 {
        self.values.get(key).map_or(0, |v| v.as_f64() as i64)
    }

    pub fn bool(&self, key: &str) -> bool {
        self.values.get(key).is_some_and(|v| v.as_bool())
    }

    pub fn get(&self, key: &str) -> Option<FxParamValue> {
        self.values.get(key).copied()
    }
}

/// An fx kind: parameter schema plus evaluation function.
#[derive(Clone)]
pub struct FxDefinition {
    /// Display name.
    pub name: String,
    pub description: Option<String>,
    /// Parameter schema keyed by parameter key.
    pub params: BTreeMap<String, FxParamDef>,
    pub func: FxFunc,
}

impl std::fmt::Debug for FxDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FxDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl FxDefinition {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(&mut FxContext<'_>) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            params: BTreeMap::new(),
            func: Arc::new(func),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn param(mut self, key: impl Into<String>, def: FxParamDef) -> Self {
        self.params.insert(key.into(), def);
        self
    }

    /// Default raw values for every declared parameter.
    pub fn default_params(&self) -> BTreeMap<String, FxParamValue> {
        self.params
            .iter()
            .map(|(k, d)| (k.clone(), d.default))
            .collect()
    }

    /// Resolve stored raw values into the parameters handed to [`FxDefinition::func`].
    ///
    /// Keys not declared in the schema are dropped.
    pub fn resolve_params(&self, raw: &BTreeMap<String, FxParamValue>) -> FxParams {
        let values = self
            .params
            .iter()
            .map(|(k, d)| (k.clone(), d.resolve(raw.get(k).copied())))
            .collect();
        FxParams { values }
    }
}

/// Opaque per-section scratch state.
///
/// A fresh state is created at the first sample of a section and dropped after its last sample,
/// so nothing leaks between sections or between precalc runs.
#[derive(Default)]
pub struct FxState {
    slot: Option<Box<dyn Any>>,
}

impl std::fmt::Debug for FxState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FxState")
            .field("initialized", &self.slot.is_some())
            .finish()
    }
}

impl FxState {
    /// Borrow the state as `T`, creating it with `init` if it is empty or holds another type.
    pub fn get_or_init<T: Any>(&mut self, init: impl FnOnce() -> T) -> &mut T {
        if !self.slot.as_ref().is_some_and(|s| s.is::<T>()) {
            self.slot = Some(Box::new(init()));
        }
        self.slot
            .as_mut()
            .and_then(|s| s.downcast_mut::<T>())
            .expect("fx state slot holds T after initialization")
    }

    pub fn get_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.slot.as_mut().and_then(|s| s.downcast_mut::<T>())
    }
}

/// Evaluation context for one sample of one fx section.
pub struct FxContext<'a> {
    /// Buffer index of this sample.
    pub index: usize,
    /// First buffer index of the section.
    pub i0: usize,
    /// One past the last buffer index of the section.
    pub i1: usize,
    /// Curve time of this sample.
    pub time: f64,
    /// Section start time.
    pub t0: f64,
    /// Section end time.
    pub t1: f64,
    /// `1 / resolution`.
    pub delta_time: f64,
    /// Signal at this sample after all earlier sections.
    pub value: f64,
    /// `elapsed / length`, in `[0, 1)`.
    pub progress: f64,
    /// `time - t0`.
    pub elapsed: f64,
    pub resolution: f64,
    /// Section length.
    pub length: f64,
    pub params: &'a FxParams,
    pub state: &'a mut FxState,
    /// `true` only on the first sample of the section.
    pub init: bool,
    pub(crate) lookup: &'a dyn Fn(f64) -> f64,
}

impl FxContext<'_> {
    /// Sample the curve at `time` as it was before this section ran.
    pub fn get_value(&self, time: f64) -> f64 {
        (self.lookup)(time)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/fx/definition.rs"]
mod tests;
