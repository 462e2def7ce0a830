//! Tagged-variant value type and the unit/dataspace conversion lattice.
//!
//! A sum type with exhaustive matching, not a trait-object hierarchy: a
//! parameter's value is always one of a closed set of shapes, so matching
//! beats downcasting.

pub mod dataspace;

pub use dataspace::{convert, Dataspace, Unit, ValueWithUnit};

use std::fmt;

/// A tagged variant of primitive and compound values.
///
/// `Impulse` doubles as the explicit "empty" marker used when [`merge`]
/// pads a list out to a longer length — it already means "no data, just a
/// bang" in OSC, so it is the natural placeholder rather than a dedicated
/// variant.
#[derive(Debug, Clone)]
pub enum Value {
    Impulse,
    Int(i64),
    Float(f64),
    Bool(bool),
    Char(char),
    String(String),
    List(Vec<Value>),
    Vec2f([f32; 2]),
    Vec3f([f32; 3]),
    Vec4f([f32; 4]),
}

/// Discriminant used to order variants before content: equality and
/// ordering compare the variant tag first, then the payload.
fn rank(v: &Value) -> u8 {
    match v {
        Value::Impulse => 0,
        Value::Int(_) => 1,
        Value::Float(_) => 2,
        Value::Bool(_) => 3,
        Value::Char(_) => 4,
        Value::String(_) => 5,
        Value::List(_) => 6,
        Value::Vec2f(_) => 7,
        Value::Vec3f(_) => 8,
        Value::Vec4f(_) => 9,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}
impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        use Value::*;
        let (ra, rb) = (rank(self), rank(other));
        if ra != rb {
            return ra.cmp(&rb);
        }
        match (self, other) {
            (Impulse, Impulse) => Ordering::Equal,
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Bool(a), Bool(b)) => a.cmp(b),
            (Char(a), Char(b)) => a.cmp(b),
            (String(a), String(b)) => a.cmp(b),
            (List(a), List(b)) => a.cmp(b),
            (Vec2f(a), Vec2f(b)) => cmp_f32_slice(a, b),
            (Vec3f(a), Vec3f(b)) => cmp_f32_slice(a, b),
            (Vec4f(a), Vec4f(b)) => cmp_f32_slice(a, b),
            _ => unreachable!("rank() partitions variants"),
        }
    }
}

fn cmp_f32_slice(a: &[f32], b: &[f32]) -> std::cmp::Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let ord = x.total_cmp(y);
        if ord != std::cmp::Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Impulse => write!(f, "<impulse>"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Char(c) => write!(f, "{c}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Vec2f(v) => write!(f, "({}, {})", v[0], v[1]),
            Value::Vec3f(v) => write!(f, "({}, {}, {})", v[0], v[1], v[2]),
            Value::Vec4f(v) => write!(f, "({}, {}, {}, {})", v[0], v[1], v[2], v[3]),
        }
    }
}

impl Value {
    /// Type name, used for `Error::TypeMismatch` diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Impulse => "impulse",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Char(_) => "char",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Vec2f(_) => "vec2f",
            Value::Vec3f(_) => "vec3f",
            Value::Vec4f(_) => "vec4f",
        }
    }

    /// View this value as a flat list of scalar components for destination
    /// indexing: a `List` is used as-is, the fixed vector types flatten to
    /// floats, everything else is a single-element list (index `[]` is the
    /// only valid index into it).
    fn as_components(&self) -> Vec<Value> {
        match self {
            Value::List(items) => items.clone(),
            Value::Vec2f(v) => v.iter().map(|x| Value::Float(*x as f64)).collect(),
            Value::Vec3f(v) => v.iter().map(|x| Value::Float(*x as f64)).collect(),
            Value::Vec4f(v) => v.iter().map(|x| Value::Float(*x as f64)).collect(),
            other => vec![other.clone()],
        }
    }

    /// Rebuild a value of the same "shape" as `self` from a flattened
    /// component list, after a `merge` edited one or more positions.
    fn from_components(&self, components: Vec<Value>) -> Value {
        match self {
            Value::Vec2f(_) | Value::Vec3f(_) | Value::Vec4f(_) => {
                let mut floats: Vec<f32> = components
                    .iter()
                    .map(|v| match v {
                        Value::Float(f) => *f as f32,
                        Value::Int(i) => *i as f32,
                        _ => 0.0,
                    })
                    .collect();
                match self {
                    Value::Vec2f(_) => {
                        floats.resize(2, 0.0);
                        Value::Vec2f([floats[0], floats[1]])
                    }
                    Value::Vec3f(_) => {
                        floats.resize(3, 0.0);
                        Value::Vec3f([floats[0], floats[1], floats[2]])
                    }
                    Value::Vec4f(_) => {
                        floats.resize(4, 0.0);
                        Value::Vec4f([floats[0], floats[1], floats[2], floats[3]])
                    }
                    _ => unreachable!(),
                }
            }
            Value::List(_) => Value::List(components),
            _ => components.into_iter().next().unwrap_or(Value::Impulse),
        }
    }
}

/// Writes `partial` into the sub-component of `current` selected by
/// `index`. An empty index replaces the whole value. A length-mismatched
/// list extends to `max(len)`, padding unset positions with
/// [`Value::Impulse`] as an explicit empty marker; an index past the end
/// of the current list is treated the same way (extend-with-nulls).
pub fn merge(current: &Value, partial: Value, index: &[usize]) -> Value {
    match index {
        [] => partial,
        [first, rest @ ..] => {
            let mut components = current.as_components();
            if *first >= components.len() {
                components.resize(*first + 1, Value::Impulse);
            }
            components[*first] = merge(&components[*first], partial, rest);
            current.from_components(components)
        }
    }
}

#[cfg(test)]
mod tests;
