//! Canonical JSON encoding for response bodies.
//!
//! Bodies are rendered compactly: no ASCII escaping of non-ASCII characters,
//! `,` and `:` separators without surrounding whitespace, UTF-8 output.
//! Non-finite floats are rejected. `serde_json` silently turns NaN and
//! infinities into `null`, so [`to_value`] walks the input with
//! a checking serializer before converting it.

use std::fmt;

use serde::ser::{self, Serialize};
use serde_json::Value;

use apiroute_core::{ApiError, ApiResult};

/// Renders a JSON value to its canonical compact byte form.
///
/// # Examples
///
/// ```
/// use apiroute_http::json::render;
///
/// let bytes = render(&serde_json::json!({"name": "café", "tags": [1, 2]})).unwrap();
/// assert_eq!(bytes, "{\"name\":\"café\",\"tags\":[1,2]}".as_bytes());
/// ```
pub fn render(value: &Value) -> ApiResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| ApiError::Serialization(e.to_string()))
}

/// Converts any serializable value into a [`Value`].
///
/// Fails with [`ApiError::Serialization`] on non-finite floats and on
/// anything JSON cannot represent (e.g. maps with non-string keys).
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> ApiResult<Value> {
    value
        .serialize(&mut FiniteGuard)
        .map_err(|e| ApiError::Serialization(e.0))?;
    serde_json::to_value(value).map_err(|e| ApiError::Serialization(e.to_string()))
}

/// Renders any serializable value straight to canonical bytes.
pub fn to_bytes<T: Serialize + ?Sized>(value: &T) -> ApiResult<Vec<u8>> {
    render(&to_value(value)?)
}

#[derive(Debug)]
struct NonFinite(String);

impl fmt::Display for NonFinite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for NonFinite {}

impl ser::Error for NonFinite {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self(msg.to_string())
    }
}

/// A serializer that produces nothing and fails on NaN or infinity.
struct FiniteGuard;

fn check_float(v: f64) -> Result<(), NonFinite> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(NonFinite(format!("Out of range float values are not JSON compliant: {v}")))
    }
}

macro_rules! accept {
    ($($method:ident($ty:ty)),* $(,)?) => {
        $(
            fn $method(self, _v: $ty) -> Result<(), NonFinite> {
                Ok(())
            }
        )*
    };
}

impl<'a> ser::Serializer for &'a mut FiniteGuard {
    type Ok = ();
    type Error = NonFinite;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    accept! {
        serialize_bool(bool),
        serialize_i8(i8),
        serialize_i16(i16),
        serialize_i32(i32),
        serialize_i64(i64),
        serialize_i128(i128),
        serialize_u8(u8),
        serialize_u16(u16),
        serialize_u32(u32),
        serialize_u64(u64),
        serialize_u128(u128),
        serialize_char(char),
        serialize_str(&str),
        serialize_bytes(&[u8]),
        serialize_unit_struct(&'static str),
    }

    fn serialize_f32(self, v: f32) -> Result<(), NonFinite> {
        check_float(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<(), NonFinite> {
        check_float(v)
    }

    fn serialize_none(self) -> Result<(), NonFinite> {
        Ok(())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<(), NonFinite> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), NonFinite> {
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
    ) -> Result<(), NonFinite> {
        Ok(())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), NonFinite> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Result<(), NonFinite> {
        value.serialize(self)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self, NonFinite> {
        Ok(self)
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self, NonFinite> {
        Ok(self)
    }

    fn serialize_tuple_struct(self, _name: &'static str, _len: usize) -> Result<Self, NonFinite> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self, NonFinite> {
        Ok(self)
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self, NonFinite> {
        Ok(self)
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self, NonFinite> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self, NonFinite> {
        Ok(self)
    }
}

impl ser::SerializeSeq for &mut FiniteGuard {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), NonFinite> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), NonFinite> {
        Ok(())
    }
}

impl ser::SerializeTuple for &mut FiniteGuard {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), NonFinite> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), NonFinite> {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for &mut FiniteGuard {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), NonFinite> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), NonFinite> {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for &mut FiniteGuard {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), NonFinite> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), NonFinite> {
        Ok(())
    }
}

impl ser::SerializeMap for &mut FiniteGuard {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), NonFinite> {
        key.serialize(&mut **self)
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), NonFinite> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), NonFinite> {
        Ok(())
    }
}

impl ser::SerializeStruct for &mut FiniteGuard {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> Result<(), NonFinite> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), NonFinite> {
        Ok(())
    }
}

impl ser::SerializeStructVariant for &mut FiniteGuard {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> Result<(), NonFinite> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), NonFinite> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde::Serialize;
    use serde_json::json;

    use super::*;

    #[derive(Serialize)]
    struct Reading {
        sensor: String,
        value: f64,
        history: Vec<f32>,
    }

    #[test]
    fn test_render_is_compact() {
        let bytes = render(&json!({"a": 1, "b": [true, null]})).unwrap();
        assert_eq!(bytes, br#"{"a":1,"b":[true,null]}"#);
    }

    #[test]
    fn test_render_keeps_non_ascii() {
        let bytes = render(&json!({"greeting": "héllo ✓"})).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, r#"{"greeting":"héllo ✓"}"#);
        assert!(!text.contains("\\u"));
    }

    #[test]
    fn test_render_preserves_key_order() {
        let bytes = render(&json!({"zeta": 1, "alpha": 2})).unwrap();
        assert_eq!(bytes, br#"{"zeta":1,"alpha":2}"#);
    }

    #[test]
    fn test_to_value_finite() {
        let reading = Reading {
            sensor: "t1".into(),
            value: 21.5,
            history: vec![20.0, 21.0],
        };
        let value = to_value(&reading).unwrap();
        assert_eq!(value["value"], json!(21.5));
        assert_eq!(value["history"], json!([20.0, 21.0]));
    }

    #[test]
    fn test_to_value_rejects_nan() {
        let reading = Reading {
            sensor: "t1".into(),
            value: f64::NAN,
            history: vec![],
        };
        let err = to_value(&reading).unwrap_err();
        assert!(matches!(err, ApiError::Serialization(_)));
        assert!(err.to_string().contains("not JSON compliant"));
    }

    #[test]
    fn test_to_value_rejects_nested_infinity() {
        let reading = Reading {
            sensor: "t1".into(),
            value: 1.0,
            history: vec![1.0, f32::INFINITY],
        };
        assert!(to_value(&reading).is_err());
        assert!(to_value(&Some(f64::NEG_INFINITY)).is_err());
    }

    #[test]
    fn test_to_value_rejects_non_string_keys() {
        let mut map = HashMap::new();
        map.insert((1, 2), "pair");
        assert!(matches!(to_value(&map), Err(ApiError::Serialization(_))));
    }

    #[test]
    fn test_to_bytes() {
        assert_eq!(to_bytes(&vec!["x", "y"]).unwrap(), br#"["x","y"]"#);
    }
}
