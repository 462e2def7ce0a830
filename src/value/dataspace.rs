//! Units and dataspaces.
//!
//! A dataspace groups units that convert among each other; conversion
//! always goes through the dataspace's neutral unit (source → neutral →
//! destination). Cross-dataspace conversion is defined as a no-op.

use super::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataspace {
    Distance,
    Angle,
    Gain,
    Color,
    Position,
    Orientation,
    Time,
    Speed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Distance(DistanceUnit),
    Angle(AngleUnit),
    Gain(GainUnit),
    Color(ColorUnit),
    Position(PositionUnit),
    Orientation(OrientationUnit),
    Time(TimeUnit),
    Speed(SpeedUnit),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DistanceUnit {
    Meter,
    Centimeter,
    Millimeter,
    Kilometer,
    Inch,
    Foot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AngleUnit {
    Radian,
    Degree,
    Turn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GainUnit {
    Linear,
    Decibel,
    Midi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorUnit {
    Rgb,
    Hsv,
    Hsl,
    Cmyk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionUnit {
    Cartesian,
    Polar,
    Spherical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrientationUnit {
    Quaternion,
    Euler,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Second,
    Millisecond,
    Minute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpeedUnit {
    MeterPerSecond,
    KilometerPerHour,
    Knot,
    MilePerHour,
}

impl Unit {
    pub fn dataspace(&self) -> Dataspace {
        match self {
            Unit::Distance(_) => Dataspace::Distance,
            Unit::Angle(_) => Dataspace::Angle,
            Unit::Gain(_) => Dataspace::Gain,
            Unit::Color(_) => Dataspace::Color,
            Unit::Position(_) => Dataspace::Position,
            Unit::Orientation(_) => Dataspace::Orientation,
            Unit::Time(_) => Dataspace::Time,
            Unit::Speed(_) => Dataspace::Speed,
        }
    }

    pub fn neutral(dataspace: Dataspace) -> Unit {
        match dataspace {
            Dataspace::Distance => Unit::Distance(DistanceUnit::Meter),
            Dataspace::Angle => Unit::Angle(AngleUnit::Radian),
            Dataspace::Gain => Unit::Gain(GainUnit::Linear),
            Dataspace::Color => Unit::Color(ColorUnit::Rgb),
            Dataspace::Position => Unit::Position(PositionUnit::Cartesian),
            Dataspace::Orientation => Unit::Orientation(OrientationUnit::Quaternion),
            Dataspace::Time => Unit::Time(TimeUnit::Second),
            Dataspace::Speed => Unit::Speed(SpeedUnit::MeterPerSecond),
        }
    }
}

/// A value tagged with an optional unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueWithUnit {
    pub value: Value,
    pub unit: Option<Unit>,
}

impl ValueWithUnit {
    pub fn new(value: Value, unit: Option<Unit>) -> Self {
        Self { value, unit }
    }

    pub fn untagged(value: Value) -> Self {
        Self { value, unit: None }
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Float(f) => Some(*f),
        Value::Int(i) => Some(*i as f64),
        _ => None,
    }
}

/// Scale factor to the dataspace's neutral unit. `None` for compound
/// (color/position/orientation) units, which use dedicated conversion
/// functions instead of a linear factor.
fn linear_factor_to_neutral(unit: Unit) -> Option<f64> {
    match unit {
        Unit::Distance(u) => Some(match u {
            DistanceUnit::Meter => 1.0,
            DistanceUnit::Centimeter => 0.01,
            DistanceUnit::Millimeter => 0.001,
            DistanceUnit::Kilometer => 1000.0,
            DistanceUnit::Inch => 0.0254,
            DistanceUnit::Foot => 0.3048,
        }),
        Unit::Angle(u) => Some(match u {
            AngleUnit::Radian => 1.0,
            AngleUnit::Degree => std::f64::consts::PI / 180.0,
            AngleUnit::Turn => std::f64::consts::TAU,
        }),
        Unit::Time(u) => Some(match u {
            TimeUnit::Second => 1.0,
            TimeUnit::Millisecond => 0.001,
            TimeUnit::Minute => 60.0,
        }),
        Unit::Speed(u) => Some(match u {
            SpeedUnit::MeterPerSecond => 1.0,
            SpeedUnit::KilometerPerHour => 1.0 / 3.6,
            SpeedUnit::Knot => 0.514_444,
            SpeedUnit::MilePerHour => 0.447_04,
        }),
        _ => None,
    }
}

fn convert_linear(value: &Value, src: Unit, dst: Unit) -> Value {
    let (Some(x), Some(src_factor), Some(dst_factor)) =
        (as_f64(value), linear_factor_to_neutral(src), linear_factor_to_neutral(dst))
    else {
        return value.clone();
    };
    Value::Float(x * src_factor / dst_factor)
}

fn convert_gain(value: &Value, src: GainUnit, dst: GainUnit) -> Value {
    let Some(x) = as_f64(value) else { return value.clone() };
    let linear = match src {
        GainUnit::Linear => x,
        GainUnit::Decibel => 10f64.powf(x / 20.0),
        GainUnit::Midi => (x / 127.0).powf(2.0),
    };
    let out = match dst {
        GainUnit::Linear => linear,
        GainUnit::Decibel => {
            if linear <= 0.0 {
                f64::NEG_INFINITY
            } else {
                20.0 * linear.log10()
            }
        }
        GainUnit::Midi => linear.sqrt() * 127.0,
    };
    Value::Float(out)
}

fn rgb_of(v: &Value) -> [f32; 3] {
    match v {
        Value::Vec3f(a) => *a,
        Value::List(items) if items.len() >= 3 => {
            let f = |i: usize| as_f64(&items[i]).unwrap_or(0.0) as f32;
            [f(0), f(1), f(2)]
        }
        _ => [0.0, 0.0, 0.0],
    }
}

fn rgb_to_hsv(rgb: [f32; 3]) -> [f32; 3] {
    let [r, g, b] = rgb;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let v = max;
    let s = if max == 0.0 { 0.0 } else { delta / max };
    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    [h / 360.0, s, v]
}

fn hsv_to_rgb(hsv: [f32; 3]) -> [f32; 3] {
    let [h, s, v] = hsv;
    let h = h.rem_euclid(1.0) * 360.0;
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0).rem_euclid(2.0) - 1.0).abs());
    let m = v - c;
    let (r1, g1, b1) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    [r1 + m, g1 + m, b1 + m]
}

fn rgb_to_hsl(rgb: [f32; 3]) -> [f32; 3] {
    let [r, g, b] = rgb;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    let delta = max - min;
    if delta == 0.0 {
        return [0.0, 0.0, l];
    }
    let s = delta / (1.0 - (2.0 * l - 1.0).abs());
    let h = if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    [h / 360.0, s, l]
}

fn hsl_to_rgb(hsl: [f32; 3]) -> [f32; 3] {
    let [h, s, l] = hsl;
    let h = h.rem_euclid(1.0) * 360.0;
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h / 60.0).rem_euclid(2.0) - 1.0).abs());
    let m = l - c / 2.0;
    let (r1, g1, b1) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    [r1 + m, g1 + m, b1 + m]
}

fn rgb_to_cmyk(rgb: [f32; 3]) -> [f32; 4] {
    let [r, g, b] = rgb;
    let k = 1.0 - r.max(g).max(b);
    if k >= 1.0 {
        return [0.0, 0.0, 0.0, 1.0];
    }
    let c = (1.0 - r - k) / (1.0 - k);
    let m = (1.0 - g - k) / (1.0 - k);
    let y = (1.0 - b - k) / (1.0 - k);
    [c, m, y, k]
}

fn cmyk_to_rgb(cmyk: [f32; 4]) -> [f32; 3] {
    let [c, m, y, k] = cmyk;
    [(1.0 - c) * (1.0 - k), (1.0 - m) * (1.0 - k), (1.0 - y) * (1.0 - k)]
}

fn color_to_rgb(value: &Value, unit: ColorUnit) -> [f32; 3] {
    match unit {
        ColorUnit::Rgb => rgb_of(value),
        ColorUnit::Hsv => hsv_to_rgb(rgb_of(value)),
        ColorUnit::Hsl => hsl_to_rgb(rgb_of(value)),
        ColorUnit::Cmyk => {
            let c = match value {
                Value::List(items) if items.len() >= 4 => {
                    let f = |i: usize| as_f64(&items[i]).unwrap_or(0.0) as f32;
                    [f(0), f(1), f(2), f(3)]
                }
                _ => [0.0, 0.0, 0.0, 1.0],
            };
            cmyk_to_rgb(c)
        }
    }
}

fn rgb_to_color(rgb: [f32; 3], unit: ColorUnit) -> Value {
    match unit {
        ColorUnit::Rgb => Value::Vec3f(rgb),
        ColorUnit::Hsv => Value::Vec3f(rgb_to_hsv(rgb)),
        ColorUnit::Hsl => Value::Vec3f(rgb_to_hsl(rgb)),
        ColorUnit::Cmyk => {
            let [c, m, y, k] = rgb_to_cmyk(rgb);
            Value::List(vec![Value::Float(c as f64), Value::Float(m as f64), Value::Float(y as f64), Value::Float(k as f64)])
        }
    }
}

fn convert_color(value: &Value, src: ColorUnit, dst: ColorUnit) -> Value {
    if src == dst {
        return value.clone();
    }
    rgb_to_color(color_to_rgb(value, src), dst)
}

fn cartesian_of(v: &Value) -> [f32; 3] {
    match v {
        Value::Vec3f(a) => *a,
        _ => [0.0, 0.0, 0.0],
    }
}

fn convert_position(value: &Value, src: PositionUnit, dst: PositionUnit) -> Value {
    if src == dst {
        return value.clone();
    }
    // Normalize to cartesian, then to the destination representation.
    let cart = match src {
        PositionUnit::Cartesian => cartesian_of(value),
        PositionUnit::Polar => {
            let [r, theta, z] = cartesian_of(value);
            [r * theta.cos(), r * theta.sin(), z]
        }
        PositionUnit::Spherical => {
            let [r, theta, phi] = cartesian_of(value);
            [
                r * phi.sin() * theta.cos(),
                r * phi.sin() * theta.sin(),
                r * phi.cos(),
            ]
        }
    };
    match dst {
        PositionUnit::Cartesian => Value::Vec3f(cart),
        PositionUnit::Polar => {
            let [x, y, z] = cart;
            Value::Vec3f([(x * x + y * y).sqrt(), y.atan2(x), z])
        }
        PositionUnit::Spherical => {
            let [x, y, z] = cart;
            let r = (x * x + y * y + z * z).sqrt();
            let phi = if r == 0.0 { 0.0 } else { (z / r).acos() };
            Value::Vec3f([r, y.atan2(x), phi])
        }
    }
}

fn convert_orientation(value: &Value, src: OrientationUnit, dst: OrientationUnit) -> Value {
    if src == dst {
        return value.clone();
    }
    match (src, dst) {
        (OrientationUnit::Euler, OrientationUnit::Quaternion) => {
            let [yaw, pitch, roll] = match value {
                Value::Vec3f(a) => *a,
                _ => [0.0, 0.0, 0.0],
            };
            let (cy, sy) = ((yaw * 0.5).cos(), (yaw * 0.5).sin());
            let (cp, sp) = ((pitch * 0.5).cos(), (pitch * 0.5).sin());
            let (cr, sr) = ((roll * 0.5).cos(), (roll * 0.5).sin());
            Value::Vec4f([
                sr * cp * cy - cr * sp * sy,
                cr * sp * cy + sr * cp * sy,
                cr * cp * sy - sr * sp * cy,
                cr * cp * cy + sr * sp * sy,
            ])
        }
        (OrientationUnit::Quaternion, OrientationUnit::Euler) => {
            let [x, y, z, w] = match value {
                Value::Vec4f(a) => *a,
                _ => [0.0, 0.0, 0.0, 1.0],
            };
            let roll = (2.0 * (w * x + y * z)).atan2(1.0 - 2.0 * (x * x + y * y));
            let sinp = 2.0 * (w * y - z * x);
            let pitch = if sinp.abs() >= 1.0 {
                std::f32::consts::FRAC_PI_2.copysign(sinp)
            } else {
                sinp.asin()
            };
            let yaw = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z));
            Value::Vec3f([yaw, pitch, roll])
        }
        _ => value.clone(),
    }
}

/// Converts `src` to the unit `dst`, or leaves it unchanged if the two
/// units belong to different dataspaces (or either side carries no unit
/// at all — tagging or untagging a value never rescales it).
pub fn convert(src: ValueWithUnit, dst: Option<Unit>) -> ValueWithUnit {
    match (src.unit, dst) {
        (Some(su), Some(du)) if su.dataspace() == du.dataspace() => {
            let value = match (su, du) {
                (Unit::Gain(s), Unit::Gain(d)) => convert_gain(&src.value, s, d),
                (Unit::Color(s), Unit::Color(d)) => convert_color(&src.value, s, d),
                (Unit::Position(s), Unit::Position(d)) => convert_position(&src.value, s, d),
                (Unit::Orientation(s), Unit::Orientation(d)) => convert_orientation(&src.value, s, d),
                _ => convert_linear(&src.value, su, du),
            };
            ValueWithUnit::new(value, Some(du))
        }
        (Some(_), Some(_)) => src, // different dataspace: unchanged
        (Some(_), None) => ValueWithUnit::new(src.value, None),
        (None, Some(du)) => ValueWithUnit::new(src.value, Some(du)),
        (None, None) => src,
    }
}

#[cfg(test)]
mod dataspace_tests {
    use super::*;

    #[test]
    fn cross_dataspace_is_noop() {
        let src = ValueWithUnit::new(Value::Float(5.0), Some(Unit::Distance(DistanceUnit::Centimeter)));
        let out = convert(src.clone(), Some(Unit::Color(ColorUnit::Rgb)));
        assert_eq!(out, src);
    }

    #[test]
    fn linear_conversion_round_trips_through_neutral() {
        let cm = ValueWithUnit::new(Value::Float(100.0), Some(Unit::Distance(DistanceUnit::Centimeter)));
        let direct = convert(cm.clone(), Some(Unit::Distance(DistanceUnit::Meter)));
        let via_neutral = convert(
            convert(cm, Some(Unit::neutral(Dataspace::Distance))),
            Some(Unit::Distance(DistanceUnit::Meter)),
        );
        assert_eq!(direct, via_neutral);
        assert!(matches!(direct.value, Value::Float(m) if (m - 1.0).abs() < 1e-9));
    }

    #[test]
    fn color_round_trip_within_tolerance() {
        let rgb = Value::Vec3f([0.2, 0.6, 0.9]);
        let src = ValueWithUnit::new(rgb.clone(), Some(Unit::Color(ColorUnit::Rgb)));
        let hsv = convert(src, Some(Unit::Color(ColorUnit::Hsv)));
        let back = convert(hsv, Some(Unit::Color(ColorUnit::Rgb)));
        match (&rgb, &back.value) {
            (Value::Vec3f(a), Value::Vec3f(b)) => {
                for i in 0..3 {
                    assert!((a[i] - b[i]).abs() < 1e-4, "{:?} != {:?}", a, b);
                }
            }
            _ => panic!("expected Vec3f"),
        }
    }
}
