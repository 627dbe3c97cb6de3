//! Event data extraction.
//!
//! A producer's structured export is stored verbatim. Otherwise the event's
//! serialized fields are enumerated through [`FieldCollector`], minus the
//! transport-plumbing fields in [`EXCLUDED_FIELDS`]. A field that fails to
//! serialize is dropped on its own; the rest of the record survives.

use std::fmt;

use serde::ser::{self, Impossible, Serialize};
use serde_json::{Map, Value};

use crate::event::DomainEvent;
use crate::metrics::StoreMetrics;

/// Fields describing how an event travelled, not what happened.
pub const EXCLUDED_FIELDS: [&str; 2] = ["connection", "queue"];

/// Produces the `event_data` map of a stored record.
#[derive(Debug, Clone, Copy)]
pub struct EventDataExtractor {
    excluded: &'static [&'static str],
}

impl Default for EventDataExtractor {
    fn default() -> Self {
        Self {
            excluded: &EXCLUDED_FIELDS,
        }
    }
}

impl EventDataExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extract(&self, event: &dyn DomainEvent) -> Map<String, Value> {
        if let Some(fields) = event.export_fields() {
            return fields;
        }

        if let Some(payload) = event.payload() {
            return payload
                .iter()
                .filter(|(key, _)| !self.is_excluded(key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
        }

        let mut collector = FieldCollector::new(self.excluded);
        if let Err(e) = event.serialize(&mut collector) {
            tracing::warn!(
                event_type = %event.event_type(),
                error = %e,
                "Event does not serialize as a record, storing collected fields only"
            );
        }

        for field in &collector.skipped {
            tracing::warn!(
                event_type = %event.event_type(),
                field = %field,
                "Skipped event field that failed to serialize"
            );
            StoreMetrics::record_skipped_field();
        }

        collector.fields
    }

    fn is_excluded(&self, key: &str) -> bool {
        self.excluded.contains(&key)
    }
}

/// Error raised while walking an event's serialized shape.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("event serializes as {0}, not a record")]
    NotARecord(&'static str),
    #[error("{0}")]
    Custom(String),
}

impl ser::Error for ExtractError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        ExtractError::Custom(msg.to_string())
    }
}

/// Serializer that collects the top-level fields of a struct or map.
///
/// Each field value is converted independently with `serde_json`, so one
/// unserializable field only costs that field.
pub struct FieldCollector {
    excluded: &'static [&'static str],
    pending_key: Option<String>,
    pub fields: Map<String, Value>,
    pub skipped: Vec<String>,
}

impl FieldCollector {
    pub fn new(excluded: &'static [&'static str]) -> Self {
        Self {
            excluded,
            pending_key: None,
            fields: Map::new(),
            skipped: Vec::new(),
        }
    }

    fn collect<T: ?Sized + Serialize>(&mut self, key: &str, value: &T) {
        if self.excluded.contains(&key) {
            return;
        }
        match serde_json::to_value(value) {
            Ok(value) => {
                self.fields.insert(key.to_string(), value);
            }
            Err(e) => {
                tracing::debug!(field = %key, error = %e, "Field serialization failed");
                self.skipped.push(key.to_string());
            }
        }
    }
}

macro_rules! reject {
    ($($method:ident($($ty:ty),*) as $what:literal;)*) => {
        $(
            fn $method(self, $(_: $ty),*) -> Result<(), ExtractError> {
                Err(ExtractError::NotARecord($what))
            }
        )*
    };
}

impl<'a> ser::Serializer for &'a mut FieldCollector {
    type Ok = ();
    type Error = ExtractError;

    type SerializeSeq = Impossible<(), ExtractError>;
    type SerializeTuple = Impossible<(), ExtractError>;
    type SerializeTupleStruct = Impossible<(), ExtractError>;
    type SerializeTupleVariant = Impossible<(), ExtractError>;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    reject! {
        serialize_bool(bool) as "a boolean";
        serialize_i8(i8) as "an integer";
        serialize_i16(i16) as "an integer";
        serialize_i32(i32) as "an integer";
        serialize_i64(i64) as "an integer";
        serialize_u8(u8) as "an integer";
        serialize_u16(u16) as "an integer";
        serialize_u32(u32) as "an integer";
        serialize_u64(u64) as "an integer";
        serialize_f32(f32) as "a float";
        serialize_f64(f64) as "a float";
        serialize_char(char) as "a character";
        serialize_str(&str) as "a string";
        serialize_bytes(&[u8]) as "bytes";
        serialize_unit_variant(&'static str, u32, &'static str) as "a unit variant";
    }

    fn serialize_none(self) -> Result<(), ExtractError> {
        Ok(())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<(), ExtractError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), ExtractError> {
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), ExtractError> {
        Ok(())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), ExtractError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Result<(), ExtractError> {
        value.serialize(self)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, ExtractError> {
        Err(ExtractError::NotARecord("a sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, ExtractError> {
        Err(ExtractError::NotARecord("a tuple"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, ExtractError> {
        Err(ExtractError::NotARecord("a tuple struct"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, ExtractError> {
        Err(ExtractError::NotARecord("a tuple variant"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, ExtractError> {
        Ok(self)
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, ExtractError> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, ExtractError> {
        Ok(self)
    }
}

impl<'a> ser::SerializeStruct for &'a mut FieldCollector {
    type Ok = ();
    type Error = ExtractError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), ExtractError> {
        self.collect(key, value);
        Ok(())
    }

    fn end(self) -> Result<(), ExtractError> {
        Ok(())
    }
}

impl<'a> ser::SerializeStructVariant for &'a mut FieldCollector {
    type Ok = ();
    type Error = ExtractError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), ExtractError> {
        self.collect(key, value);
        Ok(())
    }

    fn end(self) -> Result<(), ExtractError> {
        Ok(())
    }
}

impl<'a> ser::SerializeMap for &'a mut FieldCollector {
    type Ok = ();
    type Error = ExtractError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), ExtractError> {
        let key = match serde_json::to_value(key) {
            Ok(Value::String(s)) => s,
            Ok(other) => other.to_string(),
            Err(e) => return Err(ExtractError::Custom(e.to_string())),
        };
        self.pending_key = Some(key);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), ExtractError> {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| ExtractError::Custom("map value without key".to_string()))?;
        self.collect(&key, value);
        Ok(())
    }

    fn end(self) -> Result<(), ExtractError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CustomerRegistered, CustomerSnapshot, EmailQueued};
    use crate::event::{EventEnvelope, EventReferences};
    use serde::Serializer;
    use serde_json::json;

    #[derive(Debug, serde::Serialize)]
    struct PaymentReceived {
        connection: String,
        queue: String,
        amount: i64,
    }

    impl EventReferences for PaymentReceived {}

    impl DomainEvent for PaymentReceived {
        fn event_type(&self) -> &str {
            "PaymentReceived"
        }
    }

    #[test]
    fn test_plumbing_fields_excluded() {
        let event = PaymentReceived {
            connection: "redis".into(),
            queue: "default".into(),
            amount: 1200,
        };
        let data = EventDataExtractor::new().extract(&event);
        assert_eq!(Value::Object(data), json!({"amount": 1200}));
    }

    #[test]
    fn test_nested_values_kept_as_json() {
        let event = CustomerRegistered::new(
            CustomerSnapshot::new(9, "Ana", "ana@example.com").with_mobile("+100"),
            "web",
        )
        .on_queue("redis", "events");

        let data = EventDataExtractor::new().extract(&event);
        assert_eq!(data["customer"]["id"], json!(9));
        assert_eq!(data["customer"]["mobile"], json!("+100"));
        assert_eq!(data["source"], json!("web"));
        assert!(!data.contains_key("connection"));
        assert!(!data.contains_key("queue"));
    }

    #[test]
    fn test_structured_export_wins() {
        let event = EmailQueued::new("welcome", "ana@example.com", "Hi", "Welcome aboard");
        let data = EventDataExtractor::new().extract(&event);

        assert_eq!(Some(data), event.export_fields());
    }

    #[test]
    fn test_envelope_payload_filtered() {
        let payload = json!({"connection": "sync", "queue": "q", "amount": 5});
        let event = EventEnvelope::new("PaymentReceived", payload.as_object().cloned().unwrap());

        let data = EventDataExtractor::new().extract(&event);
        assert_eq!(Value::Object(data), json!({"amount": 5}));
    }

    #[derive(Debug)]
    struct Unserializable;

    impl serde::Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(ser::Error::custom("resource handle"))
        }
    }

    #[derive(Debug, serde::Serialize)]
    struct ReportGenerated {
        report_id: i64,
        handle: Unserializable,
        title: String,
    }

    impl EventReferences for ReportGenerated {}

    impl DomainEvent for ReportGenerated {
        fn event_type(&self) -> &str {
            "ReportGenerated"
        }
    }

    #[test]
    fn test_failing_field_skipped_rest_kept() {
        let event = ReportGenerated {
            report_id: 3,
            handle: Unserializable,
            title: "Monthly".into(),
        };
        let data = EventDataExtractor::new().extract(&event);

        assert_eq!(Value::Object(data), json!({"report_id": 3, "title": "Monthly"}));
    }

    #[test]
    fn test_collector_rejects_scalars() {
        let mut collector = FieldCollector::new(&EXCLUDED_FIELDS);
        assert!(matches!(
            42i64.serialize(&mut collector),
            Err(ExtractError::NotARecord(_))
        ));
        assert!(collector.fields.is_empty());
    }

    #[test]
    fn test_collector_accepts_maps() {
        let mut collector = FieldCollector::new(&EXCLUDED_FIELDS);
        let mut map = std::collections::BTreeMap::new();
        map.insert("queue", json!("q"));
        map.insert("total", json!(10));
        map.serialize(&mut collector).unwrap();

        assert_eq!(Value::Object(collector.fields), json!({"total": 10}));
    }
}
