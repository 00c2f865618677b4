// Copyright 2024 The FlowGrid Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt::{Display, Error, Formatter};

use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// The kinds of scalar values the store can hold at a single path.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum PrimitiveKind {
    Bool,
    U32,
    S32,
    F32,
    String,
}

impl Display for PrimitiveKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        let name = match self {
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::U32 => "u32",
            PrimitiveKind::S32 => "s32",
            PrimitiveKind::F32 => "f32",
            PrimitiveKind::String => "string",
        };
        write!(f, "{name}")
    }
}

/// A closed sum over the scalar value kinds.
///
/// The JSON form is the plain scalar: `true`, `17`, `-4`, `0.5`, `"text"`.
/// Deserialization picks the kind from the scalar (unsigned integers become
/// `U32`, negative ones `S32`), so integer kinds are coerced by typed
/// consumers rather than trusted from the wire.
#[derive(Clone, PartialEq, Debug)]
pub enum Primitive {
    Bool(bool),
    U32(u32),
    S32(i32),
    F32(f32),
    String(String),
}

impl Primitive {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Primitive::Bool(_) => PrimitiveKind::Bool,
            Primitive::U32(_) => PrimitiveKind::U32,
            Primitive::S32(_) => PrimitiveKind::S32,
            Primitive::F32(_) => PrimitiveKind::F32,
            Primitive::String(_) => PrimitiveKind::String,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Primitive::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Unsigned view, coercing from `S32` when the value is non-negative.
    pub fn to_u32(&self) -> Option<u32> {
        match self {
            Primitive::U32(v) => Some(*v),
            Primitive::S32(v) => u32::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Signed view, coercing from `U32` when the value fits.
    pub fn to_s32(&self) -> Option<i32> {
        match self {
            Primitive::S32(v) => Some(*v),
            Primitive::U32(v) => i32::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn to_f32(&self) -> Option<f32> {
        match self {
            Primitive::F32(v) => Some(*v),
            Primitive::U32(v) => Some(*v as f32),
            Primitive::S32(v) => Some(*v as f32),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Primitive::String(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for Primitive {
    fn from(value: bool) -> Self {
        Primitive::Bool(value)
    }
}
impl From<u32> for Primitive {
    fn from(value: u32) -> Self {
        Primitive::U32(value)
    }
}
impl From<i32> for Primitive {
    fn from(value: i32) -> Self {
        Primitive::S32(value)
    }
}
impl From<f32> for Primitive {
    fn from(value: f32) -> Self {
        Primitive::F32(value)
    }
}
impl From<String> for Primitive {
    fn from(value: String) -> Self {
        Primitive::String(value)
    }
}
impl From<&str> for Primitive {
    fn from(value: &str) -> Self {
        Primitive::String(value.to_owned())
    }
}

impl Serialize for Primitive {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Primitive::Bool(v) => serializer.serialize_bool(*v),
            Primitive::U32(v) => serializer.serialize_u32(*v),
            Primitive::S32(v) => serializer.serialize_i32(*v),
            // Serialized as f64 so the f32 round-trips bit-exactly for all
            // finite values.
            Primitive::F32(v) => serializer.serialize_f64(f64::from(*v)),
            Primitive::String(v) => serializer.serialize_str(v),
        }
    }
}

struct PrimitiveVisitor;

impl Visitor<'_> for PrimitiveVisitor {
    type Value = Primitive;

    fn expecting(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "a JSON scalar (bool, number, or string)")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Primitive, E> {
        Ok(Primitive::Bool(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Primitive, E> {
        u32::try_from(v)
            .map(Primitive::U32)
            .map_err(|_| E::custom(format!("unsigned value out of range: {v}")))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Primitive, E> {
        if v >= 0 {
            return self.visit_u64(v as u64);
        }
        i32::try_from(v)
            .map(Primitive::S32)
            .map_err(|_| E::custom(format!("signed value out of range: {v}")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Primitive, E> {
        Ok(Primitive::F32(v as f32))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Primitive, E> {
        Ok(Primitive::String(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Primitive, E> {
        Ok(Primitive::String(v))
    }
}

impl<'de> Deserialize<'de> for Primitive {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PrimitiveVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(primitive: Primitive) -> Primitive {
        let json = serde_json::to_string(&primitive).unwrap();
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn test_json_round_trip() {
        assert_eq!(round_trip(Primitive::Bool(true)), Primitive::Bool(true));
        assert_eq!(round_trip(Primitive::U32(17)), Primitive::U32(17));
        assert_eq!(round_trip(Primitive::S32(-4)), Primitive::S32(-4));
        assert_eq!(
            round_trip(Primitive::String("dsp".into())),
            Primitive::String("dsp".into())
        );
        // f32 -> f64 -> f32 is exact for finite values.
        assert_eq!(round_trip(Primitive::F32(0.1)), Primitive::F32(0.1));
        assert_eq!(
            round_trip(Primitive::F32(f32::MIN_POSITIVE)),
            Primitive::F32(f32::MIN_POSITIVE)
        );
    }

    #[test]
    fn test_integer_coercion() {
        // A positive S32 deserializes as U32; typed consumers coerce back.
        assert_eq!(round_trip(Primitive::S32(4)), Primitive::U32(4));
        assert_eq!(Primitive::U32(4).to_s32(), Some(4));
        assert_eq!(Primitive::S32(-4).to_u32(), None);
        assert_eq!(Primitive::U32(u32::MAX).to_s32(), None);
    }
}
