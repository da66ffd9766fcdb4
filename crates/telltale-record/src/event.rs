//! Tracked events.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::RecordError;
use crate::glyph;
use crate::value::{Prop, Props, normalize_props, props_from_map};

/// One discrete, named occurrence.
///
/// An event with an empty `name` is the "empty" sentinel: it is well formed
/// but carries nothing to report, and serializes to an empty map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Event {
    /// Event name. Empty for the sentinel.
    pub name: String,
    /// Sub-classification or context.
    pub reason: Option<String>,
    /// Milliseconds since the Unix epoch; `0` means unset.
    pub time: i64,
    /// Opaque host platform tag.
    pub platform: Option<String>,
    /// Human-readable detail.
    pub msg: Option<String>,
    /// Short status glyph.
    pub sign: Option<String>,
    /// Structured payload.
    pub props: Option<Props>,
    /// Alternate payload, used only when `props` is absent.
    pub extra: Option<Props>,
}

impl Event {
    /// The empty sentinel.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create an event stamped with the current time and host platform.
    /// The sign defaults to the success glyph.
    pub fn create(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            time: crate::now_millis(),
            platform: Some(crate::host_platform()),
            sign: Some(glyph::EVENT.success.to_string()),
            ..Self::default()
        }
    }

    /// Check whether this is the empty sentinel.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    /// Set the reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Set the message.
    pub fn with_msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = Some(msg.into());
        self
    }

    /// Set the sign.
    pub fn with_sign(mut self, sign: impl Into<String>) -> Self {
        self.sign = Some(sign.into());
        self
    }

    /// Set the platform tag.
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Set the timestamp in milliseconds since the epoch.
    pub fn with_time(mut self, time: i64) -> Self {
        self.time = time;
        self
    }

    /// Set the payload.
    pub fn with_props(mut self, props: Props) -> Self {
        self.props = Some(props);
        self
    }

    /// Set the alternate payload.
    pub fn with_extra(mut self, extra: Props) -> Self {
        self.extra = Some(extra);
        self
    }

    /// Add a single payload entry.
    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<Prop>) -> Self {
        self.props
            .get_or_insert_with(Props::new)
            .insert(key.into(), value.into());
        self
    }

    /// The payload that will be serialized: `props`, else `extra`.
    pub fn payload(&self) -> Option<&Props> {
        self.props.as_ref().or(self.extra.as_ref())
    }

    /// Serialize into a flat map, omitting unset and empty fields.
    ///
    /// The sentinel produces an empty map.
    pub fn to_generic_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        if self.is_empty() {
            return map;
        }

        map.insert("name".to_string(), Value::String(self.name.clone()));
        insert_text(&mut map, "reason", &self.reason);
        if self.time != 0 {
            map.insert("time".to_string(), Value::from(self.time));
        }
        insert_text(&mut map, "platform", &self.platform);
        insert_text(&mut map, "msg", &self.msg);
        insert_text(&mut map, "sign", &self.sign);
        if let Some(payload) = self.payload() {
            map.insert("props".to_string(), Value::Object(normalize_props(payload)));
        }

        map
    }

    /// Parse from a generic map.
    ///
    /// Anything that is not a non-empty map with a non-empty string `name`
    /// yields the sentinel. Fields of an unexpected type are left unset.
    pub fn parse(source: &Value) -> Self {
        match Self::try_parse(source) {
            Ok(event) => event,
            Err(e) => {
                tracing::trace!(error = %e, "Falling back to empty event");
                Self::empty()
            }
        }
    }

    fn try_parse(source: &Value) -> Result<Self, RecordError> {
        let map = source
            .as_object()
            .filter(|m| !m.is_empty())
            .ok_or(RecordError::NotAMap)?;

        let name = match map.get("name") {
            Some(Value::String(name)) if !name.is_empty() => name.clone(),
            _ => return Err(RecordError::MissingField("name")),
        };

        Ok(Self {
            name,
            reason: read_text(map, "reason"),
            time: map.get("time").and_then(coerce_millis).unwrap_or(0),
            platform: read_text(map, "platform"),
            msg: read_text(map, "msg"),
            sign: read_text(map, "sign"),
            props: read_props(map, "props"),
            extra: read_props(map, "extra"),
        })
    }
}

impl TryFrom<&Value> for Event {
    type Error = RecordError;

    /// Strict counterpart of [`Event::parse`].
    fn try_from(source: &Value) -> Result<Self, Self::Error> {
        Self::try_parse(source)
    }
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_generic_map().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::parse(&value))
    }
}

pub(crate) fn insert_text(map: &mut Map<String, Value>, key: &str, value: &Option<String>) {
    if let Some(text) = value.as_deref().filter(|s| !s.is_empty()) {
        map.insert(key.to_string(), Value::String(text.to_string()));
    }
}

pub(crate) fn read_text(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key) {
        Some(Value::String(text)) if !text.is_empty() => Some(text.clone()),
        _ => None,
    }
}

fn read_props(map: &Map<String, Value>, key: &str) -> Option<Props> {
    map.get(key).and_then(Value::as_object).map(props_from_map)
}

fn coerce_millis(value: &Value) -> Option<i64> {
    let Value::Number(number) = value else {
        return None;
    };
    number
        .as_i64()
        .or_else(|| number.as_u64().map(|u| i64::try_from(u).unwrap_or(i64::MAX)))
        .or_else(|| number.as_f64().map(|f| f as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::EventItem;
    use crate::props;
    use serde_json::json;

    #[test]
    fn test_create_stamps_time_and_platform() {
        let map = Event::create("signup").to_generic_map();
        assert_eq!(map.get("name"), Some(&json!("signup")));
        assert!(map.get("time").and_then(Value::as_i64).unwrap() > 0);
        assert!(!map.get("platform").and_then(Value::as_str).unwrap().is_empty());
        assert_eq!(map.get("sign"), Some(&json!(glyph::EVENT.success)));
    }

    #[test]
    fn test_sentinel_serializes_to_nothing() {
        assert!(Event::empty().to_generic_map().is_empty());
        let sentinel = Event::empty().with_msg("ignored");
        assert!(sentinel.to_generic_map().is_empty());
    }

    #[test]
    fn test_empty_fields_are_omitted() {
        let map = Event::create("x").with_reason("").to_generic_map();
        assert!(!map.contains_key("reason"));
        assert!(!map.contains_key("msg"));
        assert!(!map.contains_key("props"));
    }

    #[test]
    fn test_extra_used_only_without_props() {
        let event = Event::create("x").with_extra(props! { "from" => "extra" });
        assert_eq!(event.to_generic_map()["props"], json!({ "from": "extra" }));

        let event = event.with_props(props! { "from" => "props" });
        assert_eq!(event.to_generic_map()["props"], json!({ "from": "props" }));
    }

    #[test]
    fn test_props_drop_unrepresentable_values() {
        struct Socket;
        let event = Event::create("x")
            .with_prop("ok", 1)
            .with_prop("socket", Prop::opaque(Socket))
            .with_prop("item", EventItem::new("sku", "Mug"));

        let props = &event.to_generic_map()["props"];
        assert_eq!(props["ok"], json!(1));
        assert!(props.get("socket").is_none());
        assert_eq!(props["item"]["item_id"], json!("sku"));
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        for source in [
            json!(null),
            json!([]),
            json!({}),
            json!({ "msg": "no name" }),
            json!({ "name": "" }),
            json!({ "name": 42 }),
        ] {
            let event = Event::parse(&source);
            assert!(event.is_empty(), "expected sentinel for {source}");
            assert!(event.to_generic_map().is_empty());
        }
    }

    #[test]
    fn test_parse_coerces_time() {
        assert_eq!(Event::parse(&json!({ "name": "a", "time": 5 })).time, 5);
        assert_eq!(Event::parse(&json!({ "name": "a", "time": 5.9 })).time, 5);
        assert_eq!(Event::parse(&json!({ "name": "a", "time": "5" })).time, 0);
    }

    #[test]
    fn test_parse_leaves_mistyped_fields_unset() {
        let event = Event::parse(&json!({ "name": "a", "msg": 3, "props": "nope" }));
        assert_eq!(event.name, "a");
        assert!(event.msg.is_none());
        assert!(event.props.is_none());
    }

    #[test]
    fn test_round_trip_keeps_name_and_msg() {
        let original = Event::create("checkout").with_msg("paid");
        let parsed = Event::parse(&Value::Object(original.to_generic_map()));

        assert_eq!(parsed.name, "checkout");
        assert_eq!(parsed.msg.as_deref(), Some("paid"));
        assert!(parsed.time > 0);
        assert!(parsed.platform.is_some());
    }

    #[test]
    fn test_try_from_reports_missing_name() {
        let err = Event::try_from(&json!({ "msg": "x" })).unwrap_err();
        assert!(matches!(err, RecordError::MissingField("name")));
    }

    #[test]
    fn test_serde_uses_generic_map() {
        let event = Event::create("a").with_time(10).with_platform("linux");
        let text = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&text).unwrap();
        assert_eq!(back.name, "a");
        assert_eq!(back.time, 10);

        let sentinel: Event = serde_json::from_str("{\"msg\":\"x\"}").unwrap();
        assert!(sentinel.is_empty());
    }
}
