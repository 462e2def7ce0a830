//! Parameters: the typed, bounded, observable payload a node may carry.

use crate::value::{Dataspace, Unit, Value};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Get,
    Set,
    Bi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundingMode {
    Free,
    Clip,
    Wrap,
    Fold,
    Low,
    High,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Domain {
    Unbounded,
    Range(f64, f64),
    Enumerated(Vec<Value>),
}

impl Domain {
    fn range(&self) -> Option<(f64, f64)> {
        match self {
            Domain::Range(lo, hi) => Some((*lo, *hi)),
            _ => None,
        }
    }
}

fn bound_scalar(x: f64, lo: f64, hi: f64, mode: BoundingMode) -> f64 {
    if lo > hi {
        return x;
    }
    let span = hi - lo;
    match mode {
        BoundingMode::Free => x,
        BoundingMode::Clip => x.clamp(lo, hi),
        BoundingMode::Low => {
            if x < lo {
                lo
            } else {
                x
            }
        }
        BoundingMode::High => {
            if x > hi {
                hi
            } else {
                x
            }
        }
        BoundingMode::Wrap => {
            if span == 0.0 {
                lo
            } else {
                lo + (x - lo).rem_euclid(span)
            }
        }
        BoundingMode::Fold => {
            if span == 0.0 {
                return lo;
            }
            let period = 2.0 * span;
            let mut t = (x - lo).rem_euclid(period);
            if t > span {
                t = period - t;
            }
            lo + t
        }
    }
}

fn map_numeric(value: Value, f: &impl Fn(f64) -> f64) -> Value {
    match value {
        Value::Int(i) => Value::Int(f(i as f64).round() as i64),
        Value::Float(x) => Value::Float(f(x)),
        Value::Vec2f(v) => Value::Vec2f([f(v[0] as f64) as f32, f(v[1] as f64) as f32]),
        Value::Vec3f(v) => Value::Vec3f([f(v[0] as f64) as f32, f(v[1] as f64) as f32, f(v[2] as f64) as f32]),
        Value::Vec4f(v) => Value::Vec4f([
            f(v[0] as f64) as f32,
            f(v[1] as f64) as f32,
            f(v[2] as f64) as f32,
            f(v[3] as f64) as f32,
        ]),
        Value::List(items) => Value::List(items.into_iter().map(|v| map_numeric(v, f)).collect()),
        other => other,
    }
}

/// Applies bounding mode against `domain`, per numeric component. Non-numeric
/// values and enumerated domains pass through unchanged — enumeration
/// membership is a validity check for the caller, not something a bounding
/// mode can repair.
pub fn apply_bounding(value: Value, domain: &Domain, mode: BoundingMode) -> Value {
    match domain.range() {
        Some((lo, hi)) => map_numeric(value, &|x| bound_scalar(x, lo, hi, mode)),
        None => value,
    }
}

fn quantize_step(value: Value, step: f64) -> Value {
    if step <= 0.0 {
        return value;
    }
    map_numeric(value, &|x| (x / step).round() * step)
}

/// Suppresses callback/push notification for a run of identical writes.
#[derive(Debug, Clone, Default)]
pub struct RepetitionFilter {
    pub enabled: bool,
    last: Option<Value>,
}

impl RepetitionFilter {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, last: None }
    }

    /// Returns `true` if `value` should be suppressed as a repeat of the
    /// previously accepted value.
    fn observe(&mut self, value: &Value) -> bool {
        if !self.enabled {
            self.last = Some(value.clone());
            return false;
        }
        let is_repeat = self.last.as_ref() == Some(value);
        self.last = Some(value.clone());
        is_repeat
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_subscription_id() -> SubscriptionId {
    SubscriptionId(NEXT_SUBSCRIPTION.fetch_add(1, AtomicOrdering::Relaxed))
}

type ValueCallback = Box<dyn Fn(&Value) + Send>;

struct CallbackSlot {
    id: SubscriptionId,
    alive: bool,
    f: ValueCallback,
}

#[derive(Default)]
struct ValueCallbacks {
    slots: Vec<CallbackSlot>,
}

impl ValueCallbacks {
    fn add(&mut self, f: ValueCallback) -> SubscriptionId {
        let id = next_subscription_id();
        self.slots.push(CallbackSlot { id, alive: true, f });
        id
    }

    fn remove(&mut self, id: SubscriptionId) {
        if let Some(slot) = self.slots.iter_mut().find(|s| s.id == id) {
            slot.alive = false;
        }
    }

    /// Invokes every callback alive at the start of this pass. Slots added
    /// during the pass are not invoked until the next one; slots removed
    /// during the pass are marked dead immediately and swept afterward.
    fn fire(&mut self, value: &Value) {
        let len = self.slots.len();
        for slot in &self.slots[..len] {
            if slot.alive {
                (slot.f)(value);
            }
        }
        self.slots.retain(|s| s.alive);
    }
}

/// The typed payload a node may carry: current value, unit, domain, access
/// mode, bounding, repetition filter, step size, and value callbacks.
pub struct Parameter {
    value: Value,
    preferred_type: &'static str,
    unit: Option<Unit>,
    domain: Domain,
    access: AccessMode,
    bounding: BoundingMode,
    repetition_filter: RepetitionFilter,
    step: Option<f64>,
    callbacks: ValueCallbacks,
}

impl Parameter {
    pub fn new(initial: Value, access: AccessMode) -> Self {
        let preferred_type = initial.type_name();
        Self {
            value: initial,
            preferred_type,
            unit: None,
            domain: Domain::Unbounded,
            access,
            bounding: BoundingMode::Free,
            repetition_filter: RepetitionFilter::new(false),
            step: None,
            callbacks: ValueCallbacks::default(),
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn preferred_type(&self) -> &'static str {
        self.preferred_type
    }

    pub fn unit(&self) -> Option<Unit> {
        self.unit
    }

    pub fn set_unit(&mut self, unit: Option<Unit>) {
        self.unit = unit;
    }

    pub fn dataspace(&self) -> Option<Dataspace> {
        self.unit.map(|u| u.dataspace())
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn set_domain(&mut self, domain: Domain) {
        self.domain = domain;
    }

    pub fn access(&self) -> AccessMode {
        self.access
    }

    pub fn set_access(&mut self, access: AccessMode) {
        self.access = access;
    }

    pub fn bounding(&self) -> BoundingMode {
        self.bounding
    }

    pub fn set_bounding(&mut self, mode: BoundingMode) {
        self.bounding = mode;
    }

    pub fn set_repetition_filter(&mut self, enabled: bool) {
        self.repetition_filter.enabled = enabled;
    }

    pub fn repetition_filter_enabled(&self) -> bool {
        self.repetition_filter.enabled
    }

    pub fn step(&self) -> Option<f64> {
        self.step
    }

    pub fn set_step(&mut self, step: Option<f64>) {
        self.step = step;
    }

    pub fn on_value_changed(&mut self, f: impl Fn(&Value) + Send + 'static) -> SubscriptionId {
        self.callbacks.add(Box::new(f))
    }

    pub fn remove_value_callback(&mut self, id: SubscriptionId) {
        self.callbacks.remove(id);
    }

    /// Applies step quantization, bounding, then the repetition filter, in
    /// that order. Returns `true` if the write was accepted (value stored,
    /// callbacks fired); `false` if suppressed as a repeat.
    pub fn push_value(&mut self, incoming: Value) -> bool {
        let mut value = incoming;
        if let Some(step) = self.step {
            value = quantize_step(value, step);
        }
        value = apply_bounding(value, &self.domain, self.bounding);
        if self.repetition_filter.observe(&value) {
            return false;
        }
        self.value = value.clone();
        self.callbacks.fire(&value);
        true
    }
}
