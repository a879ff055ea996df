use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Latest known readings of one vehicle.
///
/// Field names follow the telemetry server's naming, both in live `sensor_data`
/// frames and in the REST vehicle listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// vehicle identifier
    #[serde(rename = "dispositivo_id", default, deserialize_with = "de::id")]
    pub vehicle_id: String,
    /// display name
    #[serde(rename = "nombre", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// status label, e.g. `activo`, `inactivo`, `mantenimiento`
    #[serde(rename = "estado", default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// speed reading
    #[serde(
        rename = "velocidad",
        default,
        deserialize_with = "de::reading",
        skip_serializing_if = "Option::is_none"
    )]
    pub speed: Option<f64>,
    /// temperature reading
    #[serde(
        rename = "temperatura",
        default,
        deserialize_with = "de::reading",
        skip_serializing_if = "Option::is_none"
    )]
    pub temperature: Option<f64>,
    /// fuel level reading
    #[serde(
        rename = "combustible",
        default,
        deserialize_with = "de::reading",
        skip_serializing_if = "Option::is_none"
    )]
    pub fuel: Option<f64>,
    /// latitude
    #[serde(
        rename = "latitud",
        default,
        deserialize_with = "de::reading",
        skip_serializing_if = "Option::is_none"
    )]
    pub latitude: Option<f64>,
    /// longitude
    #[serde(
        rename = "longitud",
        default,
        deserialize_with = "de::reading",
        skip_serializing_if = "Option::is_none"
    )]
    pub longitude: Option<f64>,
    /// time of the last update reported by the server
    #[serde(
        rename = "ultima_actualizacion",
        default,
        deserialize_with = "de::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
    /// fields this crate does not model, kept as received
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TelemetryRecord {
    /// Both coordinates, if the record has them.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}

/// Where an [`AlertEvent`] came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AlertSource {
    /// an `alert` frame or the REST alert listing
    #[default]
    Alert,
    /// a `sensor_data` frame forwarded to the alert handler
    SensorData,
}

/// A typed notification about one vehicle. Never stored by the manager.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    /// vehicle identifier
    #[serde(
        rename = "dispositivo_id",
        alias = "vehicleId",
        default,
        deserialize_with = "de::id"
    )]
    pub vehicle_id: String,
    /// alert category label, e.g. `alerta de temperatura`
    #[serde(rename = "tipo_alerta", alias = "alertType", default)]
    pub category: String,
    /// human readable text. The REST alert listing sends it as `nombre`, the push
    /// frames as `mensaje` or `message`.
    #[serde(rename = "mensaje", alias = "message", alias = "nombre", default)]
    pub message: String,
    /// when the alert was raised
    #[serde(
        rename = "fecha",
        alias = "timestamp",
        default,
        deserialize_with = "de::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
    /// origin of this event
    #[serde(skip)]
    pub source: AlertSource,
}

/// Category used when a sensor frame carries no alert category of its own.
pub const SENSOR_DATA_CATEGORY: &str = "sensor_data";

impl AlertEvent {
    /// Build the alert-handler view of a `sensor_data` frame.
    pub fn from_sensor_data(data: &SensorData) -> Self {
        let record = &data.record;
        let category = record
            .extra
            .get("tipo_alerta")
            .and_then(|v| v.as_str())
            .unwrap_or(SENSOR_DATA_CATEGORY)
            .to_string();

        Self {
            vehicle_id: data.vehicle_id.clone(),
            category,
            message: record.status.clone().unwrap_or_default(),
            timestamp: record.updated_at,
            source: AlertSource::SensorData,
        }
    }
}

/// Body of a `sensor_data` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorData {
    /// vehicle the readings belong to
    #[serde(rename = "vehicleId", deserialize_with = "de::id")]
    pub vehicle_id: String,
    /// full replacement record
    #[serde(rename = "data")]
    pub record: TelemetryRecord,
}

/// Lenient decoders for values the server sends in more than one shape.
mod de {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Number(serde_json::Number),
        Text(String),
    }

    /// identifiers arrive as strings or as bare numbers
    pub fn id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(match Option::<Scalar>::deserialize(d)? {
            Some(Scalar::Text(s)) => s,
            Some(Scalar::Number(n)) => n.to_string(),
            None => String::new(),
        })
    }

    /// readings arrive as numbers or numeric strings; anything else reads as absent
    pub fn reading<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        let value = Option::<serde_json::Value>::deserialize(d)?;
        Ok(match value {
            Some(serde_json::Value::Number(n)) => n.as_f64(),
            Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
        .filter(|f: &f64| f.is_finite()))
    }

    /// RFC 3339 strings or epoch milliseconds
    pub fn timestamp<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let value = Option::<serde_json::Value>::deserialize(d)?;
        Ok(match value {
            Some(serde_json::Value::String(s)) => DateTime::parse_from_rfc3339(&s)
                .ok()
                .map(|t| t.with_timezone(&Utc)),
            Some(serde_json::Value::Number(n)) => n
                .as_i64()
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_accepts_numeric_strings() {
        let record: TelemetryRecord = serde_json::from_value(json!({
            "dispositivo_id": 17,
            "velocidad": "42.5",
            "latitud": "-12.04",
            "longitud": -77.03,
            "combustible": "n/a",
        }))
        .unwrap();

        assert_eq!(record.vehicle_id, "17");
        assert_eq!(record.speed, Some(42.5));
        assert_eq!(record.coordinates(), Some((-12.04, -77.03)));
        assert_eq!(record.fuel, None);
    }

    #[test]
    fn test_record_keeps_unknown_fields() {
        let record: TelemetryRecord = serde_json::from_value(json!({
            "dispositivo_id": "V1",
            "placa": "ABC-123",
        }))
        .unwrap();

        assert_eq!(record.extra.get("placa"), Some(&json!("ABC-123")));
    }

    #[test]
    fn test_timestamp_formats() {
        let a: AlertEvent = serde_json::from_value(json!({
            "vehicleId": "V1",
            "tipo_alerta": "alerta de temperatura",
            "timestamp": 1_700_000_000_000i64,
        }))
        .unwrap();
        assert_eq!(a.timestamp.unwrap().timestamp(), 1_700_000_000);

        let b: AlertEvent = serde_json::from_value(json!({
            "dispositivo_id": "V1",
            "fecha": "2024-03-01T10:00:00Z",
        }))
        .unwrap();
        assert_eq!(b.timestamp.unwrap().to_rfc3339(), "2024-03-01T10:00:00+00:00");

        let c: AlertEvent = serde_json::from_value(json!({ "fecha": "yesterday" })).unwrap();
        assert_eq!(c.timestamp, None);
    }

    #[test]
    fn test_alert_from_sensor_data() {
        let data: SensorData = serde_json::from_value(json!({
            "vehicleId": "V2",
            "data": { "estado": "activo", "tipo_alerta": "alerta de combustible" },
        }))
        .unwrap();

        let alert = AlertEvent::from_sensor_data(&data);
        assert_eq!(alert.vehicle_id, "V2");
        assert_eq!(alert.category, "alerta de combustible");
        assert_eq!(alert.message, "activo");
        assert_eq!(alert.source, AlertSource::SensorData);

        let plain: SensorData =
            serde_json::from_value(json!({ "vehicleId": "V2", "data": {} })).unwrap();
        assert_eq!(
            AlertEvent::from_sensor_data(&plain).category,
            SENSOR_DATA_CATEGORY
        );
    }
}
