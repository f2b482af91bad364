//! Deserializers for numbers that may arrive as strings in persisted documents.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumRepr {
    Num(f64),
    Str(String),
    Bool(bool),
}

fn to_f64<E: serde::de::Error>(repr: NumRepr) -> Result<f64, E> {
    match repr {
        NumRepr::Num(v) => Ok(v),
        NumRepr::Str(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| E::custom(format!("expected a number, got \"{s}\""))),
        NumRepr::Bool(b) => Ok(if b { 1.0 } else { 0.0 }),
    }
}

pub(crate) fn f64_lenient<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    to_f64(NumRepr::deserialize(deserializer)?)
}

pub(crate) fn opt_f64_lenient<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(repr) => to_f64(repr).map(Some),
    }
}

pub(crate) fn i64_lenient<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let v = to_f64(NumRepr::deserialize(deserializer)?)?;
    if !v.is_finite() {
        return Err(serde::de::Error::custom("zIndex must be finite"));
    }
    Ok(v.round() as i64)
}

pub(crate) fn u32_lenient<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let v = to_f64(NumRepr::deserialize(deserializer)?)?;
    if !v.is_finite() || v < 0.0 || v > f64::from(u32::MAX) {
        return Err(serde::de::Error::custom(format!(
            "expected a non-negative size, got {v}"
        )));
    }
    Ok(v.round() as u32)
}

/// Accepts `"900"` as well as `900`.
pub(crate) fn string_lenient<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match NumRepr::deserialize(deserializer)? {
        NumRepr::Str(s) => Ok(s),
        NumRepr::Num(v) if v.fract() == 0.0 => Ok(format!("{}", v as i64)),
        NumRepr::Num(v) => Ok(v.to_string()),
        NumRepr::Bool(b) => Ok(b.to_string()),
    }
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
