//! Telemetry server websocket frame types.

mod stream;
mod types;

pub use stream::{MessageStreamSink, MessageStreamSinkError, Outbound, TransportEvent};
pub use types::{AlertEvent, AlertSource, SensorData, TelemetryRecord, SENSOR_DATA_CATEGORY};

use enum_as_inner::EnumAsInner;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

/// Error when parse text data as frame
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)), module(error), context(suffix(false)))]
pub enum ParseMessageError {
    /// data is invalid json
    #[snafu(display("parse json failed: {source}"))]
    ParseJSONFailed {
        /// data for decode
        data: String,
        /// source error
        source: serde_json::Error,
    },

    /// data json is not an object
    #[snafu(display("parsed frame is not object: {json}"))]
    FrameNotObject {
        /// json string
        json: String,
    },

    /// data json has no type field
    #[snafu(display("frame has no type field: {json}"))]
    NoFrameType {
        /// json string
        json: String,
    },

    /// data json type field is not string
    #[snafu(display("frame has non-string type field: {json}"))]
    FrameTypeNotString {
        /// json string
        json: String,
    },

    /// data json is not valid typed frame
    #[snafu(display("parse to {type_name} frame failed: {source}"))]
    ParseJSONToTypedFrameFailed {
        /// type name
        type_name: String,
        /// source error
        source: serde_json::Error,
    },
}

/// Push frame sent by the telemetry server
#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum InboundFrame {
    /// Full replacement readings for one vehicle
    SensorData(SensorData),
    /// Alert notification
    Alert(AlertEvent),
    /// Any frame type this client does not handle, with its type tag
    Unrecognized(String),
}

impl InboundFrame {
    /// Decode a text frame
    pub fn decode(data: &str) -> Result<Self, ParseMessageError> {
        let mut value: serde_json::Value =
            serde_json::from_str(data).context(error::ParseJSONFailed { data })?;

        let obj = value
            .as_object_mut()
            .with_context(|| error::FrameNotObject { json: data })?;

        let kind = obj
            .remove("type")
            .with_context(|| error::NoFrameType { json: data })?;

        let kind = match kind {
            serde_json::Value::String(s) => s,
            _ => return error::FrameTypeNotString { json: data }.fail(),
        };

        match kind.as_str() {
            "sensor_data" => serde_json::from_value(value)
                .map(Self::SensorData)
                .context(error::ParseJSONToTypedFrameFailed { type_name: kind }),
            "alert" => serde_json::from_value(value)
                .map(Self::Alert)
                .context(error::ParseJSONToTypedFrameFailed { type_name: kind }),
            _ => Ok(Self::Unrecognized(kind)),
        }
    }

    /// get type name
    pub fn type_name(&self) -> &str {
        match self {
            Self::SensorData(_) => "sensor_data",
            Self::Alert(_) => "alert",
            Self::Unrecognized(kind) => kind,
        }
    }
}

/// Subscription directive, client -> server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Directive {
    /// Ask the server to push updates for a vehicle
    Subscribe {
        /// vehicle identifier
        #[serde(rename = "vehicleId")]
        vehicle_id: String,
    },
    /// Revoke interest in a vehicle
    Unsubscribe {
        /// vehicle identifier
        #[serde(rename = "vehicleId")]
        vehicle_id: String,
    },
}

impl Directive {
    /// subscribe directive for `vehicle_id`
    pub fn subscribe<S: Into<String>>(vehicle_id: S) -> Self {
        Self::Subscribe {
            vehicle_id: vehicle_id.into(),
        }
    }

    /// unsubscribe directive for `vehicle_id`
    pub fn unsubscribe<S: Into<String>>(vehicle_id: S) -> Self {
        Self::Unsubscribe {
            vehicle_id: vehicle_id.into(),
        }
    }

    /// the vehicle this directive is about
    pub fn vehicle_id(&self) -> &str {
        match self {
            Self::Subscribe { vehicle_id } | Self::Unsubscribe { vehicle_id } => vehicle_id,
        }
    }

    /// encode to a json text frame
    pub fn encode(&self) -> String {
        // a tagged enum of plain strings always serializes
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    mod decode {
        use super::super::*;
        use serde_json::json;

        #[test]
        fn test_frame_decode_sensor_data() {
            let data = json!({
                "type": "sensor_data",
                "vehicleId": "V1",
                "data": {
                    "velocidad": 40,
                    "estado": "activo",
                },
            })
            .to_string();

            let frame = InboundFrame::decode(&data).unwrap();

            if let InboundFrame::SensorData(sensor) = frame {
                assert_eq!(sensor.vehicle_id, "V1");
                assert_eq!(sensor.record.speed, Some(40.0));
                assert_eq!(sensor.record.status.as_deref(), Some("activo"));
            } else {
                panic!("decoded frame is not sensor data")
            }
        }

        #[test]
        fn test_frame_decode_numeric_vehicle_id() {
            let data = json!({
                "type": "sensor_data",
                "vehicleId": 7,
                "data": {},
            })
            .to_string();

            let sensor = InboundFrame::decode(&data)
                .unwrap()
                .into_sensor_data()
                .unwrap();
            assert_eq!(sensor.vehicle_id, "7");
        }

        #[test]
        fn test_frame_decode_alert() {
            let data = json!({
                "type": "alert",
                "vehicleId": "V2",
                "tipo_alerta": "alerta de exceso de velocidad",
                "mensaje": "120 km/h",
            })
            .to_string();

            let alert = InboundFrame::decode(&data).unwrap().into_alert().unwrap();
            assert_eq!(alert.vehicle_id, "V2");
            assert_eq!(alert.category, "alerta de exceso de velocidad");
            assert_eq!(alert.message, "120 km/h");
            assert_eq!(alert.source, AlertSource::Alert);
        }

        #[test]
        fn test_frame_decode_unrecognized() {
            let frame = InboundFrame::decode(r#"{"type":"pong"}"#).unwrap();
            assert_eq!(frame, InboundFrame::Unrecognized("pong".to_string()));
            assert_eq!(frame.type_name(), "pong");
        }

        #[test]
        fn test_frame_decode_failures() {
            assert!(matches!(
                InboundFrame::decode("not json"),
                Err(ParseMessageError::ParseJSONFailed { .. })
            ));
            assert!(matches!(
                InboundFrame::decode("[1, 2]"),
                Err(ParseMessageError::FrameNotObject { .. })
            ));
            assert!(matches!(
                InboundFrame::decode(r#"{"vehicleId":"V1"}"#),
                Err(ParseMessageError::NoFrameType { .. })
            ));
            assert!(matches!(
                InboundFrame::decode(r#"{"type":3}"#),
                Err(ParseMessageError::FrameTypeNotString { .. })
            ));
            assert!(matches!(
                InboundFrame::decode(r#"{"type":"sensor_data","vehicleId":"V1"}"#),
                Err(ParseMessageError::ParseJSONToTypedFrameFailed { .. })
            ));
        }
    }

    mod encode {
        use super::super::*;
        use serde_json::json;

        #[test]
        fn test_directive_encode() {
            let sub: serde_json::Value =
                serde_json::from_str(&Directive::subscribe("V1").encode()).unwrap();
            assert_eq!(sub, json!({"type": "subscribe", "vehicleId": "V1"}));

            let unsub: serde_json::Value =
                serde_json::from_str(&Directive::unsubscribe("V1").encode()).unwrap();
            assert_eq!(unsub, json!({"type": "unsubscribe", "vehicleId": "V1"}));
        }
    }
}
