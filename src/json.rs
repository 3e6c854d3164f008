//! JSON codec
//!
//! Converts between values described by a [`Descriptor`] and
//! [`serde_json::Value`] documents.
//!
//! | Kind | Document |
//! |---|---|
//! | bool | `true`/`false` |
//! | integer | number without fraction (signed as `i64`, unsigned as `u64`) |
//! | float | number; non-finite values are rejected |
//! | string | string (content must be UTF-8) |
//! | array, list | array, in index order |
//! | dict | object, fields produced in the dict's iteration order |
//!
//! Decoding requires the document shape to match the target kind exactly.
//! Arrays and lists are first resized to the document's length and then filled
//! element by element. Dicts never gain keys: every field of the document must
//! name an existing key of the target, which is checked for all fields before
//! any of them is written.

use std::any::Any;

use serde_json::{Map, Number, Value};

use crate::descriptor::{
    ArrayInfo, BoolInfo, Descriptor, DictInfo, FloatInfo, IntValue, IntegerInfo, Kind, ListInfo,
    StringInfo, TypedRef,
};
use crate::dispatch::{dispatch, KindVisitor};
use crate::error::{Error, Result};
use crate::reflect::Reflect;

fn shape_of(doc: &Value) -> &'static str {
    match doc {
        Value::Null => "json null",
        Value::Bool(_) => "json boolean",
        Value::Number(_) => "json number",
        Value::String(_) => "json string",
        Value::Array(_) => "json array",
        Value::Object(_) => "json object",
    }
}

fn reject(expected: Kind, doc: &Value) -> Error {
    tracing::debug!(%expected, found = shape_of(doc), "json shape mismatch");
    Error::mismatch(expected, shape_of(doc))
}

/// Encodes the value at `value`, described by `descriptor`, as a JSON document
pub fn encode_json(value: &dyn Any, descriptor: Descriptor) -> Result<Value> {
    tracing::trace!(?descriptor, "encoding json document");
    encode_value(TypedRef::new(value, descriptor))
}

/// Decodes `doc` into the existing value at `value`, described by `descriptor`
///
/// On failure the target is left in whatever state decoding had reached.
pub fn decode_json(doc: &Value, value: &mut dyn Any, descriptor: Descriptor) -> Result<()> {
    tracing::trace!(?descriptor, "decoding json document");
    decode_value(doc, value, descriptor)
}

/// Encodes a reflected value as a JSON document
pub fn to_json<T: Reflect>(value: &T) -> Result<Value> {
    encode_json(value, T::descriptor())
}

/// Decodes a JSON document into `T::default()`
///
/// Dict-like targets only accept the keys present in the default value, so
/// decoding a non-empty object into an empty map fails with
/// [`Error::UnknownKey`].
pub fn from_json<T: Reflect + Default>(doc: &Value) -> Result<T> {
    let mut value = T::default();
    from_json_into(doc, &mut value)?;
    Ok(value)
}

/// Decodes a JSON document into an existing reflected value
pub fn from_json_into<T: Reflect>(doc: &Value, value: &mut T) -> Result<()> {
    decode_json(doc, value, T::descriptor())
}

/// Parses JSON text and decodes it into the value at `value`
pub fn decode_json_str(text: &str, value: &mut dyn Any, descriptor: Descriptor) -> Result<()> {
    let doc: Value = serde_json::from_str(text)?;
    decode_json(&doc, value, descriptor)
}

fn encode_value(item: TypedRef<'_>) -> Result<Value> {
    dispatch(item.descriptor, Encoder { value: item.value })
}

fn decode_value(doc: &Value, value: &mut dyn Any, descriptor: Descriptor) -> Result<()> {
    dispatch(descriptor, Decoder { value, doc })
}

struct Encoder<'a> {
    value: &'a dyn Any,
}

impl KindVisitor for Encoder<'_> {
    type Output = Result<Value>;

    fn visit_bool(self, info: &'static BoolInfo) -> Self::Output {
        Ok(Value::Bool(info.get(self.value)?))
    }

    fn visit_integer(self, info: &'static IntegerInfo) -> Self::Output {
        Ok(match info.load(self.value)? {
            IntValue::Signed(v) => Value::from(v),
            IntValue::Unsigned(v) => Value::from(v),
        })
    }

    fn visit_float(self, info: &'static FloatInfo) -> Self::Output {
        let x = info.get(self.value)?;
        Number::from_f64(x).map(Value::Number).ok_or_else(|| {
            Error::Unsupported(format!("non-finite float {x} has no JSON representation"))
        })
    }

    fn visit_string(self, info: &'static dyn StringInfo) -> Self::Output {
        let text = std::str::from_utf8(info.get(self.value)?)?;
        Ok(Value::String(text.to_owned()))
    }

    fn visit_array(self, info: &'static dyn ArrayInfo) -> Self::Output {
        let element = info.element();
        info.elements(self.value)?
            .map(|x| encode_value(TypedRef::new(x, element)))
            .collect::<Result<Vec<Value>>>()
            .map(Value::Array)
    }

    fn visit_list(self, info: &'static dyn ListInfo) -> Self::Output {
        (0..info.len(self.value)?)
            .map(|ix| encode_value(info.child(self.value, ix)?))
            .collect::<Result<Vec<Value>>>()
            .map(Value::Array)
    }

    fn visit_dict(self, info: &'static dyn DictInfo) -> Self::Output {
        let mut fields = Map::new();
        for (key, item) in info.entries(self.value)? {
            fields.insert(key.to_owned(), encode_value(item)?);
        }
        Ok(Value::Object(fields))
    }
}

struct Decoder<'a, 'd> {
    value: &'a mut dyn Any,
    doc: &'d Value,
}

impl<'d> Decoder<'_, 'd> {
    fn items(&self, expected: Kind) -> Result<&'d Vec<Value>> {
        self.doc.as_array().ok_or_else(|| reject(expected, self.doc))
    }
}

/// Converts a JSON number to an integer without loss, if it is integral
fn integral(n: &Number) -> Option<IntValue> {
    if let Some(i) = n.as_i64() {
        return Some(IntValue::Signed(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(IntValue::Unsigned(u));
    }
    // integral numbers written with a fraction or exponent, e.g. `3.0` or `1e3`
    let f = n.as_f64()?;
    if f.fract() != 0.0 || !f.is_finite() {
        return None;
    }
    if f >= -(2f64.powi(63)) && f < 2f64.powi(63) {
        Some(IntValue::Signed(f as i64))
    } else if f >= 0.0 && f < 2f64.powi(64) {
        Some(IntValue::Unsigned(f as u64))
    } else {
        None
    }
}

impl KindVisitor for Decoder<'_, '_> {
    type Output = Result<()>;

    fn visit_bool(self, info: &'static BoolInfo) -> Self::Output {
        let b = self.doc.as_bool().ok_or_else(|| reject(Kind::Bool, self.doc))?;
        info.set(self.value, b)
    }

    fn visit_integer(self, info: &'static IntegerInfo) -> Self::Output {
        let Value::Number(n) = self.doc else {
            return Err(reject(Kind::Integer, self.doc));
        };
        match integral(n) {
            Some(val) => info.store(self.value, val),
            None if n.as_f64().is_some_and(|f| f.fract() == 0.0) => {
                Err(Error::out_of_range(n.as_f64().unwrap_or_default() as i128, info.format()))
            }
            None => {
                tracing::debug!(%n, "fractional number for integer slot");
                Err(Error::mismatch(Kind::Integer, format!("fractional number {n}")))
            }
        }
    }

    fn visit_float(self, info: &'static FloatInfo) -> Self::Output {
        let x = self.doc.as_f64().ok_or_else(|| reject(Kind::Float, self.doc))?;
        info.set(self.value, x)
    }

    fn visit_string(self, info: &'static dyn StringInfo) -> Self::Output {
        let text = self.doc.as_str().ok_or_else(|| reject(Kind::String, self.doc))?;
        info.set(self.value, text.as_bytes())
    }

    fn visit_array(self, info: &'static dyn ArrayInfo) -> Self::Output {
        let items = self.items(Kind::Array)?;
        info.resize(self.value, items.len())?;
        let element = info.element();
        for (slot, item) in info.elements_mut(self.value)?.zip(items) {
            decode_value(item, slot, element)?;
        }
        Ok(())
    }

    fn visit_list(self, info: &'static dyn ListInfo) -> Self::Output {
        let items = self.items(Kind::List)?;
        info.resize(self.value, items.len())?;
        for (ix, item) in items.iter().enumerate() {
            let child = info.child_mut(self.value, ix)?;
            decode_value(item, child.value, child.descriptor)?;
        }
        Ok(())
    }

    fn visit_dict(self, info: &'static dyn DictInfo) -> Self::Output {
        let fields = self
            .doc
            .as_object()
            .ok_or_else(|| reject(Kind::Dict, self.doc))?;
        for key in fields.keys() {
            if info.get(self.value, key)?.is_none() {
                tracing::debug!(%key, dict = info.type_name(), "json field has no slot in target");
                return Err(Error::UnknownKey(key.clone()));
            }
        }
        for (key, item) in fields {
            let slot = info
                .get_mut(self.value, key)?
                .ok_or_else(|| Error::UnknownKey(key.clone()))?;
            decode_value(item, slot.value, slot.descriptor)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::float::Bf16;
    use crate::record;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;
    use std::collections::{BTreeMap, HashMap};

    record! {
        #[derive(Debug, Default, Clone, PartialEq)]
        struct Pair {
            a: i32,
            b: String,
        }
    }

    record! {
        #[derive(Debug, Default, Clone, PartialEq)]
        struct Nested {
            pair: Pair,
            weights: Vec<f32>,
            flags: [bool; 2],
            extra: (u8, i64),
        }
    }

    #[test]
    fn encode_record() {
        let p = Pair {
            a: -7,
            b: "hi".into(),
        };
        assert_eq!(to_json(&p).unwrap(), json!({"a": -7, "b": "hi"}));
    }

    #[test]
    fn decode_record() {
        let p: Pair = from_json(&json!({"a": -7, "b": "hi"})).unwrap();
        assert_eq!(
            p,
            Pair {
                a: -7,
                b: "hi".into()
            }
        );
    }

    #[test]
    fn partial_document_keeps_other_fields() {
        let mut p = Pair {
            a: 1,
            b: "keep".into(),
        };
        from_json_into(&json!({"a": 2}), &mut p).unwrap();
        assert_eq!(
            p,
            Pair {
                a: 2,
                b: "keep".into()
            }
        );
    }

    #[test]
    fn unknown_key_is_rejected_before_writing() {
        let mut p = Pair::default();
        let err = from_json_into(&json!({"a": 5, "c": 1}), &mut p).unwrap_err();
        assert!(matches!(err, Error::UnknownKey(ref k) if k == "c"), "{err:?}");
        assert_eq!(p, Pair::default());
    }

    #[test]
    fn array_is_resized_then_filled() {
        let mut v: Vec<u8> = vec![];
        from_json_into(&json!([1, 2, 3, 4, 5]), &mut v).unwrap();
        assert_eq!(v, [1, 2, 3, 4, 5]);
        from_json_into(&json!([9]), &mut v).unwrap();
        assert_eq!(v, [9]);
    }

    #[test]
    fn nested_round_trip() {
        let n = Nested {
            pair: Pair {
                a: 3,
                b: "x".into(),
            },
            weights: vec![0.5, -1.25],
            flags: [true, false],
            extra: (255, i64::MIN),
        };
        let doc = to_json(&n).unwrap();
        assert_eq!(
            doc,
            json!({
                "pair": {"a": 3, "b": "x"},
                "weights": [0.5, -1.25],
                "flags": [true, false],
                "extra": [255, i64::MIN],
            })
        );
        assert_eq!(from_json::<Nested>(&doc).unwrap(), n);
    }

    #[test]
    fn fixed_shapes_reject_other_lengths() {
        let mut n = Nested::default();
        let err = from_json_into(&json!({"flags": [true]}), &mut n).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { .. }), "{err:?}");
        let err = from_json_into(&json!({"extra": [1, 2, 3]}), &mut n).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { .. }), "{err:?}");
    }

    #[test]
    fn integer_validation() {
        let mut x = 0u8;
        assert!(matches!(
            from_json_into(&json!(256), &mut x),
            Err(Error::ValueOutOfRange { value: 256, .. })
        ));
        assert!(matches!(
            from_json_into(&json!(-1), &mut x),
            Err(Error::ValueOutOfRange { value: -1, .. })
        ));
        assert!(matches!(
            from_json_into(&json!(1.5), &mut x),
            Err(Error::SchemaMismatch { .. })
        ));
        from_json_into(&json!(3.0), &mut x).unwrap();
        assert_eq!(x, 3);
        assert!(matches!(
            from_json_into(&json!("3"), &mut x),
            Err(Error::SchemaMismatch { .. })
        ));
        assert!(matches!(
            from_json_into(&json!(1e30), &mut x),
            Err(Error::ValueOutOfRange { .. })
        ));
    }

    #[test]
    fn unsigned_64_round_trips() {
        let doc = to_json(&u64::MAX).unwrap();
        assert_eq!(doc, json!(u64::MAX));
        assert_eq!(from_json::<u64>(&doc).unwrap(), u64::MAX);
    }

    #[test]
    fn floats() {
        assert!(matches!(to_json(&f64::NAN), Err(Error::Unsupported(_))));
        assert!(matches!(
            to_json(&f32::INFINITY),
            Err(Error::Unsupported(_))
        ));
        // integral numbers are valid float documents
        assert_eq!(from_json::<f64>(&json!(2)).unwrap(), 2.0);
        assert_eq!(from_json::<Bf16>(&json!(1.0)).unwrap(), Bf16::ONE);
        assert_eq!(from_json::<f32>(&json!(0.1)).unwrap(), 0.1f32);
    }

    #[test]
    fn shape_mismatch() {
        assert!(matches!(
            from_json::<bool>(&json!(1)),
            Err(Error::SchemaMismatch { .. })
        ));
        assert!(matches!(
            from_json::<Vec<u8>>(&json!({"a": 1})),
            Err(Error::SchemaMismatch { .. })
        ));
        assert!(matches!(
            from_json::<Pair>(&json!([1, "x"])),
            Err(Error::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn maps_update_existing_keys_only() {
        let mut m = HashMap::from([("x".to_string(), 1i16), ("y".to_string(), 2)]);
        from_json_into(&json!({"y": -2}), &mut m).unwrap();
        assert_eq!(m["y"], -2);
        assert!(matches!(
            from_json_into(&json!({"z": 0}), &mut m),
            Err(Error::UnknownKey(_))
        ));
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn parse_errors_surface() {
        let mut p = Pair::default();
        let err = decode_json_str("{\"a\":", &mut p, Pair::descriptor()).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
        decode_json_str(r#"{"b":"ok"}"#, &mut p, Pair::descriptor()).unwrap();
        assert_eq!(p.b, "ok");
    }

    #[test]
    fn wrong_location() {
        let mut x = 0u8;
        assert!(matches!(
            decode_json(&json!(1), &mut x, i32::descriptor()),
            Err(Error::LocationMismatch { .. })
        ));
    }

    proptest! {
        #[test]
        fn round_trip_vectors(v in proptest::collection::vec(any::<i64>(), 0..32)) {
            let doc = to_json(&v).unwrap();
            prop_assert_eq!(from_json::<Vec<i64>>(&doc).unwrap(), v);
        }

        #[test]
        fn round_trip_records(a in any::<i32>(), b in ".{0,16}") {
            let p = Pair { a, b };
            let doc = to_json(&p).unwrap();
            prop_assert_eq!(from_json::<Pair>(&doc).unwrap(), p);
        }

        #[test]
        fn round_trip_finite_doubles(x in any::<f64>().prop_filter("finite", |x| x.is_finite())) {
            let doc = to_json(&x).unwrap();
            prop_assert_eq!(from_json::<f64>(&doc).unwrap().to_bits(), x.to_bits());
        }

        #[test]
        fn maps_encode_every_entry(m in proptest::collection::btree_map(".{0,8}", any::<u16>(), 0..8)) {
            let doc = to_json(&m).unwrap();
            let obj = doc.as_object().unwrap();
            prop_assert_eq!(obj.len(), m.len());
            let mut target: BTreeMap<String, u16> = m.keys().map(|k| (k.clone(), 0)).collect();
            from_json_into(&doc, &mut target).unwrap();
            prop_assert_eq!(target, m);
        }
    }
}
