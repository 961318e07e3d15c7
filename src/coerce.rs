//! Type-directed conversion of raw values into typed option values.
//!
//! Scalars follow permissive cast semantics: `"42"` becomes an integer,
//! `"TRUE"` a bool, a decoded `8080` a string when the option wants one.
//! Durations use humantime syntax (`10s`, `1h 30m`) and a unitless number
//! counts nanoseconds; byte sizes accept binary suffixes (`11KB` is
//! 11 × 1024). Each [`OptionType`] has exactly one conversion path in
//! [`coerce`].

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use strum::{Display, EnumString};

use crate::key::Key;
use crate::value::RawValue;

/// The closed set of destination types an option may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum OptionType {
    #[strum(serialize = "int")]
    Int,
    #[strum(serialize = "int8")]
    Int8,
    #[strum(serialize = "int16")]
    Int16,
    #[strum(serialize = "int32")]
    Int32,
    #[strum(serialize = "int64")]
    Int64,
    #[strum(serialize = "uint")]
    Uint,
    #[strum(serialize = "uint8")]
    Uint8,
    #[strum(serialize = "uint16")]
    Uint16,
    #[strum(serialize = "uint32")]
    Uint32,
    #[strum(serialize = "uint64")]
    Uint64,
    #[strum(serialize = "float32")]
    Float32,
    #[strum(serialize = "float64")]
    Float64,
    #[strum(serialize = "bool")]
    Bool,
    #[strum(serialize = "string")]
    String,
    #[strum(serialize = "string-list")]
    StringList,
    #[strum(serialize = "string-map")]
    StringMap,
    #[strum(serialize = "duration")]
    Duration,
    #[strum(serialize = "byte-size")]
    ByteSize,
}

impl OptionType {
    fn signed_range(self) -> Option<(i64, i64)> {
        match self {
            OptionType::Int => Some((isize::MIN as i64, isize::MAX as i64)),
            OptionType::Int8 => Some((i8::MIN.into(), i8::MAX.into())),
            OptionType::Int16 => Some((i16::MIN.into(), i16::MAX.into())),
            OptionType::Int32 => Some((i32::MIN.into(), i32::MAX.into())),
            OptionType::Int64 => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }

    fn unsigned_max(self) -> Option<u64> {
        match self {
            OptionType::Uint => Some(usize::MAX as u64),
            OptionType::Uint8 => Some(u8::MAX.into()),
            OptionType::Uint16 => Some(u16::MAX.into()),
            OptionType::Uint32 => Some(u32::MAX.into()),
            OptionType::Uint64 => Some(u64::MAX),
            _ => None,
        }
    }

    /// Whether flags for this type take repeated values.
    pub fn is_list(self) -> bool {
        matches!(self, OptionType::StringList | OptionType::StringMap)
    }
}

/// A typed option value.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    /// Any signed integer width, range-checked against the declared type.
    Int(i64),
    /// Any unsigned integer width, range-checked against the declared type.
    Uint(u64),
    Float(f64),
    Bool(bool),
    String(String),
    StringList(Vec<String>),
    StringMap(BTreeMap<String, String>),
    Duration(Duration),
    /// A byte count.
    ByteSize(u64),
}

impl OptionValue {
    /// Whether this value is a legal inhabitant of `ty`.
    pub fn conforms_to(&self, ty: OptionType) -> bool {
        match self {
            OptionValue::Int(i) => ty
                .signed_range()
                .is_some_and(|(min, max)| (min..=max).contains(i)),
            OptionValue::Uint(u) => ty.unsigned_max().is_some_and(|max| *u <= max),
            OptionValue::Float(x) => match ty {
                OptionType::Float64 => true,
                OptionType::Float32 => !x.is_finite() || x.abs() <= f32::MAX as f64,
                _ => false,
            },
            OptionValue::Bool(_) => ty == OptionType::Bool,
            OptionValue::String(_) => ty == OptionType::String,
            OptionValue::StringList(_) => ty == OptionType::StringList,
            OptionValue::StringMap(_) => ty == OptionType::StringMap,
            OptionValue::Duration(_) => ty == OptionType::Duration,
            OptionValue::ByteSize(_) => ty == OptionType::ByteSize,
        }
    }
}

/// Renders the value in a form [`coerce`] reads back to an equal value.
impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Int(i) => write!(f, "{i}"),
            OptionValue::Uint(u) => write!(f, "{u}"),
            OptionValue::Float(x) => write!(f, "{x}"),
            OptionValue::Bool(b) => write!(f, "{b}"),
            OptionValue::String(s) => write!(f, "{s}"),
            OptionValue::StringList(items) => write!(f, "{}", items.join(",")),
            OptionValue::StringMap(map) => {
                let pairs: Vec<String> = map.iter().map(|(k, v)| format!("{k}={v}")).collect();
                write!(f, "{}", pairs.join(","))
            }
            OptionValue::Duration(d) => write!(f, "{}", humantime::format_duration(*d)),
            OptionValue::ByteSize(n) => write!(f, "{n}"),
        }
    }
}

/// A raw value could not be converted into an option's declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct CoerceError {
    /// The option being set, when known.
    pub key: Option<Key>,
    /// The offending value, rendered.
    pub raw: String,
    pub ty: OptionType,
    pub reason: String,
}

impl CoerceError {
    fn new(raw: &RawValue, ty: OptionType, reason: impl Into<String>) -> Self {
        Self {
            key: None,
            raw: raw.to_string(),
            ty,
            reason: reason.into(),
        }
    }

    /// Attach the option key the value was destined for.
    pub fn for_key(mut self, key: &Key) -> Self {
        self.key = Some(key.clone());
        self
    }
}

impl fmt::Display for CoerceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(
                f,
                "cannot set {key}: cannot coerce {} to {}: {}",
                self.raw, self.ty, self.reason
            ),
            None => write!(f, "cannot coerce {} to {}: {}", self.raw, self.ty, self.reason),
        }
    }
}

impl std::error::Error for CoerceError {}

/// Convert `raw` into a value of type `ty`.
pub fn coerce(ty: OptionType, raw: &RawValue) -> Result<OptionValue, CoerceError> {
    let fail = |reason: &str| CoerceError::new(raw, ty, reason);

    match ty {
        OptionType::Int
        | OptionType::Int8
        | OptionType::Int16
        | OptionType::Int32
        | OptionType::Int64 => {
            let value = to_i64(raw).map_err(|r| fail(r.as_str()))?;
            let v = OptionValue::Int(value);
            if v.conforms_to(ty) {
                Ok(v)
            } else {
                Err(fail("out of range"))
            }
        }
        OptionType::Uint
        | OptionType::Uint8
        | OptionType::Uint16
        | OptionType::Uint32
        | OptionType::Uint64 => {
            let value = to_u64(raw).map_err(|r| fail(r.as_str()))?;
            let v = OptionValue::Uint(value);
            if v.conforms_to(ty) {
                Ok(v)
            } else {
                Err(fail("out of range"))
            }
        }
        OptionType::Float32 | OptionType::Float64 => {
            let value = to_f64(raw).map_err(|r| fail(r.as_str()))?;
            if ty == OptionType::Float32 {
                if value.is_finite() && value.abs() > f32::MAX as f64 {
                    return Err(fail("out of range"));
                }
                Ok(OptionValue::Float(value as f32 as f64))
            } else {
                Ok(OptionValue::Float(value))
            }
        }
        OptionType::Bool => to_bool(raw).map(OptionValue::Bool).map_err(|r| fail(r.as_str())),
        OptionType::String => match raw {
            RawValue::Null => Err(fail("null value")),
            other => other
                .as_scalar_string()
                .map(OptionValue::String)
                .ok_or_else(|| fail("expected a scalar")),
        },
        OptionType::StringList => to_string_list(raw)
            .map(OptionValue::StringList)
            .map_err(|r| fail(r.as_str())),
        OptionType::StringMap => to_string_map(raw)
            .map(OptionValue::StringMap)
            .map_err(|r| fail(r.as_str())),
        OptionType::Duration => to_duration(raw)
            .map(OptionValue::Duration)
            .map_err(|r| fail(r.as_str())),
        OptionType::ByteSize => match raw {
            RawValue::String(s) => parse_byte_size(s)
                .map(OptionValue::ByteSize)
                .map_err(|r| fail(r.as_str())),
            other => to_u64(other).map(OptionValue::ByteSize).map_err(|r| fail(r.as_str())),
        },
    }
}

fn integral(x: f64) -> Result<f64, String> {
    if x.is_finite() && x.fract() == 0.0 {
        Ok(x)
    } else {
        Err("not a whole number".to_string())
    }
}

fn to_i64(raw: &RawValue) -> Result<i64, String> {
    match raw {
        RawValue::Int(i) => Ok(*i),
        RawValue::Float(x) => {
            let x = integral(*x)?;
            if x < i64::MIN as f64 || x >= i64::MAX as f64 {
                return Err("out of range".to_string());
            }
            Ok(x as i64)
        }
        RawValue::Bool(b) => Ok(i64::from(*b)),
        RawValue::String(s) => s.trim().parse::<i64>().map_err(|e| e.to_string()),
        other => Err(format!("unexpected {}", other.kind())),
    }
}

fn to_u64(raw: &RawValue) -> Result<u64, String> {
    match raw {
        RawValue::Int(i) => u64::try_from(*i).map_err(|_| "negative value".to_string()),
        RawValue::Float(x) => {
            let x = integral(*x)?;
            if x < 0.0 {
                return Err("negative value".to_string());
            }
            if x >= u64::MAX as f64 {
                return Err("out of range".to_string());
            }
            Ok(x as u64)
        }
        RawValue::Bool(b) => Ok(u64::from(*b)),
        RawValue::String(s) => s.trim().parse::<u64>().map_err(|e| e.to_string()),
        other => Err(format!("unexpected {}", other.kind())),
    }
}

fn to_f64(raw: &RawValue) -> Result<f64, String> {
    match raw {
        RawValue::Int(i) => Ok(*i as f64),
        RawValue::Float(x) => Ok(*x),
        RawValue::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        RawValue::String(s) => s.trim().parse::<f64>().map_err(|e| e.to_string()),
        other => Err(format!("unexpected {}", other.kind())),
    }
}

fn to_bool(raw: &RawValue) -> Result<bool, String> {
    match raw {
        RawValue::Bool(b) => Ok(*b),
        RawValue::Int(i) => Ok(*i != 0),
        RawValue::Float(x) => Ok(*x != 0.0),
        RawValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" | "yes" | "y" | "on" => Ok(true),
            "false" | "f" | "0" | "no" | "n" | "off" => Ok(false),
            _ => Err("expected true or false".to_string()),
        },
        other => Err(format!("unexpected {}", other.kind())),
    }
}

fn to_string_list(raw: &RawValue) -> Result<Vec<String>, String> {
    match raw {
        RawValue::List(items) => items
            .iter()
            .map(|item| {
                item.as_scalar_string()
                    .ok_or_else(|| format!("list item is a {}", item.kind()))
            })
            .collect(),
        RawValue::String(s) => Ok(split_list(s)),
        RawValue::Map(_) | RawValue::Null => Err(format!("unexpected {}", raw.kind())),
        scalar => Ok(scalar.as_scalar_string().into_iter().collect()),
    }
}

fn split_list(s: &str) -> Vec<String> {
    if s.trim().is_empty() {
        return Vec::new();
    }
    s.split(',').map(|item| item.trim().to_string()).collect()
}

fn to_string_map(raw: &RawValue) -> Result<BTreeMap<String, String>, String> {
    match raw {
        RawValue::Map(map) => map
            .iter()
            .map(|(k, v)| {
                v.as_scalar_string()
                    .map(|v| (k.clone(), v))
                    .ok_or_else(|| format!("value for {k} is a {}", v.kind()))
            })
            .collect(),
        RawValue::String(s) => split_list(s)
            .into_iter()
            .map(|pair| match pair.split_once('=') {
                Some((k, v)) => Ok((k.trim().to_string(), v.trim().to_string())),
                None => Err(format!("expected key=value, got {pair:?}")),
            })
            .collect(),
        RawValue::List(items) => items
            .iter()
            .map(|item| {
                let pair = item
                    .as_scalar_string()
                    .ok_or_else(|| format!("list item is a {}", item.kind()))?;
                pair.split_once('=')
                    .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                    .ok_or_else(|| format!("expected key=value, got {pair:?}"))
            })
            .collect(),
        other => Err(format!("unexpected {}", other.kind())),
    }
}

fn to_duration(raw: &RawValue) -> Result<Duration, String> {
    match raw {
        RawValue::String(s) => {
            let s = s.trim();
            // Unitless numbers count nanoseconds.
            if let Ok(nanos) = s.parse::<u64>() {
                return Ok(Duration::from_nanos(nanos));
            }
            humantime::parse_duration(s).map_err(|e| e.to_string())
        }
        RawValue::Int(i) => u64::try_from(*i)
            .map(Duration::from_nanos)
            .map_err(|_| "negative duration".to_string()),
        RawValue::Float(x) => Duration::try_from_secs_f64(*x / 1e9).map_err(|e| e.to_string()),
        other => Err(format!("unexpected {}", other.kind())),
    }
}

/// Parse a byte quantity such as `"10240"`, `"11KB"`, `"1.5 GiB"`.
///
/// Suffixes are case-insensitive and all denote powers of 1024:
/// `K`/`KB`/`KiB`, `M`/`MB`/`MiB`, `G`, `T`, `P`. A fractional amount
/// is truncated to whole bytes after scaling.
pub fn parse_byte_size(input: &str) -> Result<u64, String> {
    let s = input.trim();
    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, suffix) = s.split_at(split);
    if number.is_empty() {
        return Err(format!("invalid byte size {input:?}"));
    }

    let shift = match suffix.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 0,
        "k" | "kb" | "kib" => 10,
        "m" | "mb" | "mib" => 20,
        "g" | "gb" | "gib" => 30,
        "t" | "tb" | "tib" => 40,
        "p" | "pb" | "pib" => 50,
        other => return Err(format!("unknown byte size suffix {other:?}")),
    };
    let multiplier = 1u64 << shift;

    if let Ok(whole) = number.parse::<u64>() {
        return whole
            .checked_mul(multiplier)
            .ok_or_else(|| format!("byte size {input:?} overflows"));
    }
    let amount: f64 = number
        .parse()
        .map_err(|_| format!("invalid byte size {input:?}"))?;
    let bytes = amount * multiplier as f64;
    if !bytes.is_finite() || bytes >= u64::MAX as f64 {
        return Err(format!("byte size {input:?} overflows"));
    }
    Ok(bytes as u64)
}

/// Conversion from a typed option value into a Rust type, used by
/// `Registry::get_as`.
pub trait FromOptionValue: Sized {
    fn from_option_value(value: &OptionValue) -> Option<Self>;
}

macro_rules! from_integer {
    ($($t:ty),*) => {
        $(
            impl FromOptionValue for $t {
                fn from_option_value(value: &OptionValue) -> Option<Self> {
                    match value {
                        OptionValue::Int(i) => <$t>::try_from(*i).ok(),
                        OptionValue::Uint(u) | OptionValue::ByteSize(u) => <$t>::try_from(*u).ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

from_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl FromOptionValue for f64 {
    fn from_option_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Float(x) => Some(*x),
            _ => None,
        }
    }
}

impl FromOptionValue for f32 {
    fn from_option_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Float(x) => Some(*x as f32),
            _ => None,
        }
    }
}

impl FromOptionValue for bool {
    fn from_option_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromOptionValue for String {
    fn from_option_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromOptionValue for Vec<String> {
    fn from_option_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::StringList(items) => Some(items.clone()),
            _ => None,
        }
    }
}

impl FromOptionValue for BTreeMap<String, String> {
    fn from_option_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::StringMap(map) => Some(map.clone()),
            _ => None,
        }
    }
}

impl FromOptionValue for Duration {
    fn from_option_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Duration(d) => Some(*d),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn s(v: &str) -> RawValue {
        RawValue::from(v)
    }

    #[test]
    fn string_to_int() {
        assert_eq!(coerce(OptionType::Int, &s("42")).unwrap(), OptionValue::Int(42));
        assert_eq!(coerce(OptionType::Int64, &s(" -7 ")).unwrap(), OptionValue::Int(-7));
    }

    #[test]
    fn integer_narrowing_is_range_checked() {
        assert_eq!(coerce(OptionType::Int8, &RawValue::Int(127)).unwrap(), OptionValue::Int(127));
        let err = coerce(OptionType::Int8, &RawValue::Int(128)).unwrap_err();
        assert_eq!(err.reason, "out of range");
        assert!(coerce(OptionType::Uint16, &RawValue::Int(-1)).is_err());
        assert_eq!(
            coerce(OptionType::Uint32, &RawValue::Float(8080.0)).unwrap(),
            OptionValue::Uint(8080)
        );
        assert!(coerce(OptionType::Int, &RawValue::Float(1.5)).is_err());
    }

    #[test]
    fn bool_strings_are_case_insensitive() {
        assert_eq!(coerce(OptionType::Bool, &s("TRUE")).unwrap(), OptionValue::Bool(true));
        assert_eq!(coerce(OptionType::Bool, &s("False")).unwrap(), OptionValue::Bool(false));
        assert_eq!(coerce(OptionType::Bool, &RawValue::Int(0)).unwrap(), OptionValue::Bool(false));
        assert!(coerce(OptionType::Bool, &s("maybe")).is_err());
    }

    #[test]
    fn decoded_numbers_coerce_to_string_and_float() {
        assert_eq!(
            coerce(OptionType::String, &RawValue::Int(8080)).unwrap(),
            OptionValue::String("8080".into())
        );
        assert_eq!(coerce(OptionType::Float64, &RawValue::Int(3)).unwrap(), OptionValue::Float(3.0));
        assert!(coerce(OptionType::String, &RawValue::List(vec![])).is_err());
    }

    #[test]
    fn durations() {
        assert_eq!(
            coerce(OptionType::Duration, &s("10s")).unwrap(),
            OptionValue::Duration(Duration::from_secs(10))
        );
        assert_eq!(
            coerce(OptionType::Duration, &s("5m")).unwrap(),
            OptionValue::Duration(Duration::from_secs(300))
        );
        assert!(coerce(OptionType::Duration, &s("soon")).is_err());
        assert!(coerce(OptionType::Duration, &RawValue::Int(-1)).is_err());
    }

    #[test]
    fn unitless_durations_are_nanoseconds() {
        assert_eq!(
            coerce(OptionType::Duration, &RawValue::Int(30)).unwrap(),
            OptionValue::Duration(Duration::from_nanos(30))
        );
        assert_eq!(
            coerce(OptionType::Duration, &s(" 1500 ")).unwrap(),
            OptionValue::Duration(Duration::from_nanos(1500))
        );
        assert_eq!(
            coerce(OptionType::Duration, &RawValue::Float(2e9)).unwrap(),
            OptionValue::Duration(Duration::from_secs(2))
        );
        assert_eq!(
            coerce(OptionType::Duration, &s("0")).unwrap(),
            OptionValue::Duration(Duration::ZERO)
        );
    }

    #[test]
    fn byte_sizes() {
        assert_eq!(parse_byte_size("10240").unwrap(), 10240);
        assert_eq!(parse_byte_size("11KB").unwrap(), 11 * 1024);
        assert_eq!(parse_byte_size("1GiB").unwrap(), 1 << 30);
        assert_eq!(parse_byte_size("1.5 kb").unwrap(), 1536);
        assert_eq!(parse_byte_size("2M").unwrap(), 2 << 20);
        assert!(parse_byte_size("KB").is_err());
        assert!(parse_byte_size("10 parsecs").is_err());
        assert!(parse_byte_size("99999999999PB").is_err());
        assert_eq!(
            coerce(OptionType::ByteSize, &RawValue::Int(512)).unwrap(),
            OptionValue::ByteSize(512)
        );
    }

    #[test]
    fn string_lists() {
        assert_eq!(
            coerce(OptionType::StringList, &s("a, b,c")).unwrap(),
            OptionValue::StringList(vec!["a".into(), "b".into(), "c".into()])
        );
        assert_eq!(
            coerce(OptionType::StringList, &RawValue::Int(7)).unwrap(),
            OptionValue::StringList(vec!["7".into()])
        );
        assert_eq!(
            coerce(OptionType::StringList, &RawValue::List(vec![s("x"), RawValue::Bool(true)])).unwrap(),
            OptionValue::StringList(vec!["x".into(), "true".into()])
        );
        assert_eq!(coerce(OptionType::StringList, &s("")).unwrap(), OptionValue::StringList(vec![]));
    }

    #[test]
    fn string_maps() {
        let expected: BTreeMap<String, String> =
            [("env".to_string(), "prod".to_string()), ("zone".to_string(), "b".to_string())].into();
        assert_eq!(
            coerce(OptionType::StringMap, &s("env=prod,zone=b")).unwrap(),
            OptionValue::StringMap(expected.clone())
        );
        let mut raw = indexmap::IndexMap::new();
        raw.insert("env".to_string(), s("prod"));
        raw.insert("zone".to_string(), s("b"));
        assert_eq!(
            coerce(OptionType::StringMap, &RawValue::Map(raw)).unwrap(),
            OptionValue::StringMap(expected)
        );
        assert!(coerce(OptionType::StringMap, &s("novalue")).is_err());
    }

    #[test]
    fn error_names_value_and_type() {
        let err = coerce(OptionType::Int, &s("abc"))
            .unwrap_err()
            .for_key(&Key::parse("Worker.Count"));
        let msg = err.to_string();
        assert!(msg.contains("Worker.Count"), "{msg}");
        assert!(msg.contains("\"abc\""), "{msg}");
        assert!(msg.contains("int"), "{msg}");
    }

    #[test]
    fn defaults_round_trip_through_their_string_form() {
        let cases = [
            (OptionType::Int, OptionValue::Int(-3)),
            (OptionType::Int8, OptionValue::Int(-128)),
            (OptionType::Int64, OptionValue::Int(i64::MAX)),
            (OptionType::Uint64, OptionValue::Uint(u64::MAX)),
            (OptionType::Uint8, OptionValue::Uint(255)),
            (OptionType::Float64, OptionValue::Float(0.1)),
            (OptionType::Float32, OptionValue::Float(0.1f32 as f64)),
            (OptionType::Bool, OptionValue::Bool(true)),
            (OptionType::String, OptionValue::String("localhost".into())),
            (
                OptionType::StringList,
                OptionValue::StringList(vec!["a".into(), "b".into()]),
            ),
            (
                OptionType::StringMap,
                OptionValue::StringMap([("k".to_string(), "v".to_string())].into()),
            ),
            (OptionType::Duration, OptionValue::Duration(Duration::from_millis(1500))),
            (OptionType::Duration, OptionValue::Duration(Duration::ZERO)),
            (OptionType::ByteSize, OptionValue::ByteSize(10240)),
        ];
        for (ty, default) in cases {
            let text = RawValue::String(default.to_string());
            assert_eq!(coerce(ty, &text).unwrap(), default, "{ty}");
        }
    }

    #[test]
    fn conforms_to_checks_tag_and_range() {
        assert!(OptionValue::Int(5).conforms_to(OptionType::Int32));
        assert!(!OptionValue::Int(5).conforms_to(OptionType::Uint32));
        assert!(!OptionValue::Int(300).conforms_to(OptionType::Int8));
        assert!(OptionValue::ByteSize(1).conforms_to(OptionType::ByteSize));
        assert!(!OptionValue::String("x".into()).conforms_to(OptionType::StringList));
    }

    #[test]
    fn type_names() {
        assert_eq!(OptionType::ByteSize.to_string(), "byte-size");
        assert_eq!("string-list".parse::<OptionType>().unwrap(), OptionType::StringList);
    }

    #[test]
    fn typed_read_back() {
        assert_eq!(u64::from_option_value(&OptionValue::ByteSize(11264)), Some(11264));
        assert_eq!(i32::from_option_value(&OptionValue::Int(7)), Some(7));
        assert_eq!(u8::from_option_value(&OptionValue::Int(-1)), None);
        assert_eq!(String::from_option_value(&OptionValue::Bool(true)), None);
    }
}
