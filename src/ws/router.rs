//! Classify inbound frames and decide where each one goes.

use crate::{
    store::TelemetryStore,
    ws::message::{AlertEvent, InboundFrame, TelemetryRecord},
};

/// Routing decision for one inbound frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Routed {
    /// record to write into the merge store
    pub update: Option<(String, TelemetryRecord)>,
    /// event to hand to the alert handler
    pub alert: Option<AlertEvent>,
}

impl Routed {
    /// true if the frame has no effect at all
    pub fn is_dropped(&self) -> bool {
        self.update.is_none() && self.alert.is_none()
    }

    /// Write the store half into `store`, returning the alert half.
    pub fn apply(self, store: &mut TelemetryStore) -> Option<AlertEvent> {
        if let Some((id, record)) = self.update {
            store.apply(id, record);
        }
        self.alert
    }
}

/// Decode a raw text frame and decide its dispatch.
///
/// `sensor_data` goes to the store and, as well, to the alert handler; `alert` goes
/// only to the handler. Unrecognized and malformed frames are dropped, the latter
/// with a warning.
pub fn route(raw: &str) -> Routed {
    let frame = match InboundFrame::decode(raw) {
        Ok(frame) => frame,
        Err(err) => {
            log::warn!("Drop malformed frame: {}", err);
            log::trace!("Malformed frame data: {}", raw);
            return Routed::default();
        }
    };

    log::trace!("Received {} frame", frame.type_name());

    match frame {
        InboundFrame::SensorData(mut data) => {
            // the frame id is the store key, the record must agree with it
            data.record.vehicle_id = data.vehicle_id.clone();
            let alert = AlertEvent::from_sensor_data(&data);
            Routed {
                update: Some((data.vehicle_id, data.record)),
                alert: Some(alert),
            }
        }
        InboundFrame::Alert(event) => Routed {
            update: None,
            alert: Some(event),
        },
        InboundFrame::Unrecognized(kind) => {
            log::trace!("Ignore unrecognized {} frame", kind);
            Routed::default()
        }
    }
}
