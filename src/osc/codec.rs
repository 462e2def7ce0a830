//! Bidirectional OSC 1.0/1.1/extended encode/decode, built on `rosc`'s
//! wire-level (de)serializer. This module only translates between
//! `rosc::OscType`/`OscPacket` and our own [`crate::value::Value`]; the
//! byte-level framing (SLIP/length-prefix) lives in [`crate::net::framing`].

use crate::error::{Error, Result};
use crate::value::Value;
use rosc::{OscArray, OscBundle, OscMessage, OscPacket, OscTime, OscType};
use std::time::{SystemTime, UNIX_EPOCH};

/// One decoded OSC message together with its address, ready for tree
/// dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    pub address: String,
    pub value: Value,
}

/// Converts a single OSC argument into a [`Value`]. `Nil` and `Inf` both
/// collapse to [`Value::Impulse`] — our value model has one "no data, just
/// a signal" marker, not two.
fn osc_type_to_value(arg: OscType) -> Value {
    match arg {
        OscType::Int(i) => Value::Int(i as i64),
        OscType::Long(i) => Value::Int(i),
        OscType::Float(f) => Value::Float(f as f64),
        OscType::Double(d) => Value::Float(d),
        OscType::String(s) => Value::String(s),
        OscType::Blob(bytes) => Value::List(bytes.into_iter().map(|b| Value::Int(b as i64)).collect()),
        OscType::Bool(b) => Value::Bool(b),
        OscType::Char(c) => Value::Char(c),
        OscType::Nil | OscType::Inf => Value::Impulse,
        OscType::Color(c) => Value::Vec4f([c.red as f32 / 255.0, c.green as f32 / 255.0, c.blue as f32 / 255.0, c.alpha as f32 / 255.0]),
        OscType::Midi(m) => Value::List(vec![
            Value::Int(m.port as i64),
            Value::Int(m.status as i64),
            Value::Int(m.data1 as i64),
            Value::Int(m.data2 as i64),
        ]),
        OscType::Time(t) => Value::Int(((t.seconds as i64) << 32) | t.fractional as i64),
        OscType::Array(arr) => Value::List(arr.content.into_iter().map(osc_type_to_value).collect()),
    }
}

fn value_to_osc_type(value: &Value) -> OscType {
    match value {
        Value::Impulse => OscType::Nil,
        Value::Int(i) => match i32::try_from(*i) {
            Ok(small) => OscType::Int(small),
            Err(_) => OscType::Long(*i),
        },
        Value::Float(f) => OscType::Double(*f),
        Value::Bool(b) => OscType::Bool(*b),
        Value::Char(c) => OscType::Char(*c),
        Value::String(s) => OscType::String(s.clone()),
        Value::List(items) => OscType::Array(OscArray { content: items.iter().map(value_to_osc_type).collect() }),
        Value::Vec2f(v) => OscType::Array(OscArray { content: v.iter().map(|x| OscType::Float(*x)).collect() }),
        Value::Vec3f(v) => OscType::Array(OscArray { content: v.iter().map(|x| OscType::Float(*x)).collect() }),
        Value::Vec4f(v) => OscType::Array(OscArray { content: v.iter().map(|x| OscType::Float(*x)).collect() }),
    }
}

/// Flattens a [`Value`] into the top-level argument list of an OSC
/// message: a scalar becomes one argument, a `List`/`Vec*f` becomes one
/// argument per component, so peers that expect `/addr f f f` rather than
/// `/addr [f,f,f]` still interoperate.
fn value_to_args(value: &Value) -> Vec<OscType> {
    match value {
        Value::List(items) => items.iter().map(value_to_osc_type).collect(),
        Value::Vec2f(v) => v.iter().map(|x| OscType::Float(*x)).collect(),
        Value::Vec3f(v) => v.iter().map(|x| OscType::Float(*x)).collect(),
        Value::Vec4f(v) => v.iter().map(|x| OscType::Float(*x)).collect(),
        other => vec![value_to_osc_type(other)],
    }
}

fn args_to_value(args: Vec<OscType>) -> Value {
    let mut values: Vec<Value> = args.into_iter().map(osc_type_to_value).collect();
    match values.len() {
        1 => values.pop().unwrap(),
        _ => Value::List(values),
    }
}

pub fn encode_message(address: &str, value: &Value) -> Result<Vec<u8>> {
    let packet = OscPacket::Message(OscMessage { addr: address.to_string(), args: value_to_args(value) });
    rosc::encoder::encode(&packet).map_err(Error::from)
}

fn now_osc_time() -> OscTime {
    let since_epoch = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    OscTime::try_from(since_epoch).unwrap_or(OscTime { seconds: 0, fractional: 0 })
}

/// Encodes a `#bundle` containing one message per `(address, value)` pair,
/// stamped with the current NTP timetag.
pub fn encode_bundle(messages: &[(String, Value)]) -> Result<Vec<u8>> {
    let packet = OscPacket::Bundle(OscBundle {
        timetag: now_osc_time(),
        content: messages
            .iter()
            .map(|(addr, value)| OscPacket::Message(OscMessage { addr: addr.clone(), args: value_to_args(value) }))
            .collect(),
    });
    rosc::encoder::encode(&packet).map_err(Error::from)
}

/// Decodes one datagram/frame into a flat list of messages, recursing
/// through nested bundles in order.
pub fn decode_packet(bytes: &[u8]) -> Result<Vec<DecodedMessage>> {
    let (_, packet) = rosc::decoder::decode_udp(bytes).map_err(Error::from)?;
    let mut out = Vec::new();
    flatten_packet(packet, &mut out);
    Ok(out)
}

fn flatten_packet(packet: OscPacket, out: &mut Vec<DecodedMessage>) {
    match packet {
        OscPacket::Message(m) => out.push(DecodedMessage { address: m.addr, value: args_to_value(m.args) }),
        OscPacket::Bundle(b) => {
            for inner in b.content {
                flatten_packet(inner, out);
            }
        }
    }
}

fn align4(len: usize) -> usize {
    (len + 3) & !3
}

/// Reads a null-terminated, 4-byte-padded OSC string starting at `offset`.
fn read_osc_string(bytes: &[u8], offset: usize) -> Option<(String, usize)> {
    let null_pos = bytes[offset..].iter().position(|&b| b == 0)?;
    let content = &bytes[offset..offset + null_pos];
    let s = String::from_utf8(content.to_vec()).ok()?;
    let new_offset = offset + align4(null_pos + 1);
    if new_offset > bytes.len() {
        return None;
    }
    Some((s, new_offset))
}

fn read_bytes(bytes: &[u8], offset: usize, len: usize) -> Option<(&[u8], usize)> {
    let end = offset.checked_add(len)?;
    if end > bytes.len() {
        return None;
    }
    Some((&bytes[offset..end], end))
}

fn read_i32(bytes: &[u8], offset: usize) -> Option<(i32, usize)> {
    let (b, offset) = read_bytes(bytes, offset, 4)?;
    Some((i32::from_be_bytes(b.try_into().ok()?), offset))
}

fn read_f32(bytes: &[u8], offset: usize) -> Option<(f32, usize)> {
    let (b, offset) = read_bytes(bytes, offset, 4)?;
    Some((f32::from_be_bytes(b.try_into().ok()?), offset))
}

fn read_i64(bytes: &[u8], offset: usize) -> Option<(i64, usize)> {
    let (b, offset) = read_bytes(bytes, offset, 8)?;
    Some((i64::from_be_bytes(b.try_into().ok()?), offset))
}

fn read_f64(bytes: &[u8], offset: usize) -> Option<(f64, usize)> {
    let (b, offset) = read_bytes(bytes, offset, 8)?;
    Some((f64::from_be_bytes(b.try_into().ok()?), offset))
}

fn read_blob(bytes: &[u8], offset: usize) -> Option<(Vec<u8>, usize)> {
    let (len, offset) = read_i32(bytes, offset)?;
    let len = usize::try_from(len).ok()?;
    let (data, _) = read_bytes(bytes, offset, len)?;
    let data = data.to_vec();
    let new_offset = offset + align4(len);
    if new_offset > bytes.len() {
        return None;
    }
    Some((data, new_offset))
}

/// A hand-rolled, `rosc`-independent decode of a single (non-bundle) OSC
/// message, tolerant of type tags this codec doesn't recognize.
///
/// Parses the address and type-tag string manually, then decodes each
/// argument by tag. The first unrecognized tag is substituted with
/// [`Value::Impulse`] and decoding stops there — past an unknown tag its
/// wire size is unknowable, so there is no safe way to resync onto the
/// arguments that follow it. Returns `None` if the bytes don't even parse
/// as a well-formed address/type-tag pair, or if decoding a recognized
/// argument runs past the end of the buffer.
///
/// Returns the decoded message together with how many arguments were
/// substituted this way (0 means every tag was recognized).
pub fn decode_message_lenient(bytes: &[u8]) -> Option<(DecodedMessage, usize)> {
    let (address, offset) = read_osc_string(bytes, 0)?;
    let (type_tags, mut offset) = read_osc_string(bytes, offset)?;
    if !type_tags.starts_with(',') {
        return None;
    }
    let mut values = Vec::new();
    let mut substitutions = 0;
    for tag in type_tags[1..].chars() {
        match tag {
            'i' => {
                let (v, o) = read_i32(bytes, offset)?;
                values.push(Value::Int(v as i64));
                offset = o;
            }
            'f' => {
                let (v, o) = read_f32(bytes, offset)?;
                values.push(Value::Float(v as f64));
                offset = o;
            }
            'h' | 't' => {
                let (v, o) = read_i64(bytes, offset)?;
                values.push(Value::Int(v));
                offset = o;
            }
            'd' => {
                let (v, o) = read_f64(bytes, offset)?;
                values.push(Value::Float(v));
                offset = o;
            }
            'c' => {
                let (v, o) = read_i32(bytes, offset)?;
                values.push(Value::Char(char::from_u32(v as u32).unwrap_or('\u{FFFD}')));
                offset = o;
            }
            's' | 'S' => {
                let (s, o) = read_osc_string(bytes, offset)?;
                values.push(Value::String(s));
                offset = o;
            }
            'b' => {
                let (blob, o) = read_blob(bytes, offset)?;
                values.push(Value::List(blob.into_iter().map(|b| Value::Int(b as i64)).collect()));
                offset = o;
            }
            'r' => {
                let (v, o) = read_i32(bytes, offset)?;
                let rgba = v.to_be_bytes();
                values.push(Value::Vec4f([
                    rgba[0] as f32 / 255.0,
                    rgba[1] as f32 / 255.0,
                    rgba[2] as f32 / 255.0,
                    rgba[3] as f32 / 255.0,
                ]));
                offset = o;
            }
            'm' => {
                let (m, o) = read_bytes(bytes, offset, 4)?;
                values.push(Value::List(m.iter().map(|b| Value::Int(*b as i64)).collect()));
                offset = o;
            }
            'T' => values.push(Value::Bool(true)),
            'F' => values.push(Value::Bool(false)),
            'N' | 'I' => values.push(Value::Impulse),
            _ => {
                values.push(Value::Impulse);
                substitutions += 1;
                break;
            }
        }
    }
    let value = match values.len() {
        1 => values.pop().unwrap(),
        _ => Value::List(values),
    };
    Some((DecodedMessage { address, value }, substitutions))
}

#[cfg(test)]
mod codec_tests {
    use super::*;

    #[test]
    fn scalar_round_trips() {
        let encoded = encode_message("/foo", &Value::Int(42)).unwrap();
        let decoded = decode_packet(&encoded).unwrap();
        assert_eq!(decoded, vec![DecodedMessage { address: "/foo".into(), value: Value::Int(42) }]);
    }

    #[test]
    fn string_round_trips() {
        let encoded = encode_message("/name", &Value::String("hello".into())).unwrap();
        let decoded = decode_packet(&encoded).unwrap();
        assert_eq!(decoded[0].value, Value::String("hello".into()));
    }

    #[test]
    fn list_round_trips_as_multiple_args() {
        let value = Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        let encoded = encode_message("/triplet", &value).unwrap();
        let decoded = decode_packet(&encoded).unwrap();
        assert_eq!(decoded[0].value, value);
    }

    #[test]
    fn large_string_payload_round_trips() {
        let big = "x".repeat(1 << 15);
        let encoded = encode_message("/big", &Value::String(big.clone())).unwrap();
        let decoded = decode_packet(&encoded).unwrap();
        assert_eq!(decoded[0].value, Value::String(big));
    }

    #[test]
    fn bundle_preserves_message_order() {
        let messages = vec![("/a".to_string(), Value::Int(1)), ("/b".to_string(), Value::Int(2))];
        let encoded = encode_bundle(&messages).unwrap();
        let decoded = decode_packet(&encoded).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].address, "/a");
        assert_eq!(decoded[1].address, "/b");
    }

    #[test]
    fn impulse_round_trips_through_nil() {
        let encoded = encode_message("/bang", &Value::Impulse).unwrap();
        let decoded = decode_packet(&encoded).unwrap();
        assert_eq!(decoded[0].value, Value::Impulse);
    }

    /// Hand-builds a raw OSC message with a recognized `i` tag followed by
    /// an unrecognized `Z` tag, the way a packet from a peer with a newer
    /// type-tag vocabulary might look.
    fn raw_message_with_unknown_tag() -> Vec<u8> {
        let mut bytes = Vec::new();
        let address = b"/weird\0\0";
        bytes.extend_from_slice(address);
        bytes.extend_from_slice(b",iZ\0");
        bytes.extend_from_slice(&7i32.to_be_bytes());
        bytes
    }

    #[test]
    fn lenient_decode_substitutes_impulse_for_an_unknown_tag() {
        let raw = raw_message_with_unknown_tag();
        let (message, substitutions) = decode_message_lenient(&raw).unwrap();
        assert_eq!(message.address, "/weird");
        assert_eq!(message.value, Value::List(vec![Value::Int(7), Value::Impulse]));
        assert_eq!(substitutions, 1);
    }

    #[test]
    fn lenient_decode_reports_no_substitutions_for_a_well_formed_message() {
        let encoded = encode_message("/ok", &Value::Int(9)).unwrap();
        let (message, substitutions) = decode_message_lenient(&encoded).unwrap();
        assert_eq!(message.value, Value::Int(9));
        assert_eq!(substitutions, 0);
    }

    #[test]
    fn lenient_decode_gives_up_on_truncated_bytes() {
        assert!(decode_message_lenient(&[]).is_none());
    }
}
