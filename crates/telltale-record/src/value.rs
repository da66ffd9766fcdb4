//! Caller-supplied payload values and their normalization.
//!
//! Payloads attached to an [`Event`](crate::Event) are free-form: scalars,
//! lists, nested maps, [`EventItem`]s, or arbitrary host values the caller
//! happened to have at hand. Normalization turns a payload into plain JSON
//! and silently drops anything it cannot represent (opaque host values,
//! non-finite floats). It never fails.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Number, Value};

use crate::item::EventItem;

/// A keyed payload.
pub type Props = BTreeMap<String, Prop>;

/// A single payload value.
#[derive(Clone)]
pub enum Prop {
    /// Explicit null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer too large for `Int`.
    UInt(u64),
    /// Floating point number.
    Float(f64),
    /// Text.
    Text(String),
    /// Ordered collection.
    List(Vec<Prop>),
    /// Nested map.
    Map(Props),
    /// Structured commerce item.
    Item(EventItem),
    /// A host value with no generic representation. Dropped on normalization.
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl Prop {
    /// Wrap an arbitrary host value.
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Prop::Opaque(Arc::new(value))
    }

    /// Normalize into JSON, or `None` if the value cannot be represented.
    pub fn normalize(&self) -> Option<Value> {
        match self {
            Prop::Null => Some(Value::Null),
            Prop::Bool(b) => Some(Value::Bool(*b)),
            Prop::Int(i) => Some(Value::from(*i)),
            Prop::UInt(u) => Some(Value::from(*u)),
            Prop::Float(f) => Number::from_f64(*f).map(Value::Number),
            Prop::Text(s) => Some(Value::String(s.clone())),
            Prop::List(items) => Some(Value::Array(
                items.iter().filter_map(Prop::normalize).collect(),
            )),
            Prop::Map(map) => Some(Value::Object(normalize_props(map))),
            Prop::Item(item) => Some(Value::Object(item.to_generic_map())),
            Prop::Opaque(_) => None,
        }
    }

    /// Borrow the text, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Prop::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Normalize every entry of a payload, dropping entries that cannot be
/// represented.
pub fn normalize_props(props: &Props) -> Map<String, Value> {
    props
        .iter()
        .filter_map(|(key, value)| {
            let normalized = value.normalize();
            if normalized.is_none() {
                tracing::trace!(key = key.as_str(), "Dropping unrepresentable payload value");
            }
            normalized.map(|v| (key.clone(), v))
        })
        .collect()
}

/// Read a JSON object back into a payload.
pub fn props_from_map(map: &Map<String, Value>) -> Props {
    map.iter()
        .map(|(key, value)| (key.clone(), Prop::from(value.clone())))
        .collect()
}

impl fmt::Debug for Prop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prop::Null => write!(f, "Null"),
            Prop::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Prop::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Prop::UInt(u) => f.debug_tuple("UInt").field(u).finish(),
            Prop::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Prop::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Prop::List(items) => f.debug_tuple("List").field(items).finish(),
            Prop::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Prop::Item(item) => f.debug_tuple("Item").field(item).finish(),
            Prop::Opaque(_) => write!(f, "Opaque(..)"),
        }
    }
}

impl PartialEq for Prop {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Prop::Null, Prop::Null) => true,
            (Prop::Bool(a), Prop::Bool(b)) => a == b,
            (Prop::Int(a), Prop::Int(b)) => a == b,
            (Prop::UInt(a), Prop::UInt(b)) => a == b,
            (Prop::Float(a), Prop::Float(b)) => a == b,
            (Prop::Text(a), Prop::Text(b)) => a == b,
            (Prop::List(a), Prop::List(b)) => a == b,
            (Prop::Map(a), Prop::Map(b)) => a == b,
            (Prop::Item(a), Prop::Item(b)) => a == b,
            (Prop::Opaque(a), Prop::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Prop {
    fn from(value: bool) -> Self {
        Prop::Bool(value)
    }
}

impl From<i32> for Prop {
    fn from(value: i32) -> Self {
        Prop::Int(value.into())
    }
}

impl From<i64> for Prop {
    fn from(value: i64) -> Self {
        Prop::Int(value)
    }
}

impl From<u32> for Prop {
    fn from(value: u32) -> Self {
        Prop::Int(value.into())
    }
}

impl From<u64> for Prop {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(Prop::UInt(value), Prop::Int)
    }
}

impl From<usize> for Prop {
    fn from(value: usize) -> Self {
        Prop::from(value as u64)
    }
}

impl From<f32> for Prop {
    fn from(value: f32) -> Self {
        Prop::Float(value.into())
    }
}

impl From<f64> for Prop {
    fn from(value: f64) -> Self {
        Prop::Float(value)
    }
}

impl From<&str> for Prop {
    fn from(value: &str) -> Self {
        Prop::Text(value.to_string())
    }
}

impl From<String> for Prop {
    fn from(value: String) -> Self {
        Prop::Text(value)
    }
}

impl<T: Into<Prop>> From<Vec<T>> for Prop {
    fn from(values: Vec<T>) -> Self {
        Prop::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Prop>> From<Option<T>> for Prop {
    fn from(value: Option<T>) -> Self {
        value.map_or(Prop::Null, Into::into)
    }
}

impl From<Props> for Prop {
    fn from(map: Props) -> Self {
        Prop::Map(map)
    }
}

impl From<EventItem> for Prop {
    fn from(item: EventItem) -> Self {
        Prop::Item(item)
    }
}

impl From<Value> for Prop {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Prop::Null,
            Value::Bool(b) => Prop::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Prop::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Prop::UInt(u)
                } else {
                    n.as_f64().map_or(Prop::Null, Prop::Float)
                }
            }
            Value::String(s) => Prop::Text(s),
            Value::Array(items) => Prop::List(items.into_iter().map(Prop::from).collect()),
            Value::Object(map) => Prop::Map(props_from_map(&map)),
        }
    }
}

/// Build a [`Props`] map from `key => value` pairs.
///
/// ```
/// use telltale_record::{props, Prop};
///
/// let props = props! { "plan" => "pro", "seats" => 3 };
/// assert_eq!(props.get("seats"), Some(&Prop::Int(3)));
/// ```
#[macro_export]
macro_rules! props {
    () => {
        $crate::Props::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::Props::new();
        $(
            map.insert(::std::string::String::from($key), $crate::Prop::from($value));
        )+
        map
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Handle;

    #[test]
    fn test_scalars_normalize() {
        assert_eq!(Prop::from(true).normalize(), Some(json!(true)));
        assert_eq!(Prop::from(7).normalize(), Some(json!(7)));
        assert_eq!(Prop::from(1.5).normalize(), Some(json!(1.5)));
        assert_eq!(Prop::from("x").normalize(), Some(json!("x")));
        assert_eq!(Prop::Null.normalize(), Some(Value::Null));
    }

    #[test]
    fn test_unrepresentable_values_are_dropped() {
        let props = props! {
            "kept" => "yes",
            "handle" => Prop::opaque(Handle),
            "nan" => f64::NAN,
        };

        let map = normalize_props(&props);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("kept"), Some(&json!("yes")));
    }

    #[test]
    fn test_nested_collections_drop_only_bad_leaves() {
        let inner = props! { "ok" => 1, "bad" => Prop::opaque(Handle) };
        let props = props! {
            "list" => vec![Prop::from(1), Prop::opaque(Handle), Prop::from("two")],
            "nested" => inner,
        };

        let map = normalize_props(&props);
        assert_eq!(map.get("list"), Some(&json!([1, "two"])));
        assert_eq!(map.get("nested"), Some(&json!({ "ok": 1 })));
    }

    #[test]
    fn test_from_json_value() {
        let prop = Prop::from(json!({ "a": [1, 2.5, "x"], "b": null, "big": u64::MAX }));
        let map = match prop {
            Prop::Map(map) => map,
            other => panic!("expected map, got {other:?}"),
        };
        assert_eq!(
            map.get("a"),
            Some(&Prop::List(vec![Prop::Int(1), Prop::Float(2.5), Prop::from("x")]))
        );
        assert_eq!(map.get("b"), Some(&Prop::Null));
        assert_eq!(map.get("big"), Some(&Prop::UInt(u64::MAX)));
    }

    #[test]
    fn test_opaque_equality_is_identity() {
        let a = Prop::opaque(Handle);
        let b = a.clone();
        assert_eq!(a, b);
        assert_ne!(a, Prop::opaque(Handle));
    }
}
