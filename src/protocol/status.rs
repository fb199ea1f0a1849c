use serde::Serialize;

use crate::error::ProtocolError;
use crate::model::message::Message;
use crate::model::status::DeviceStatus;
use crate::protocol::{device_key_from_topic, StatusProtocol, DEVICE_PATH_PREFIX};

const STATUS_UPDATE_ROOT: &str = "d2p/subdevice_status_update/";
const STATUS_RESPONSE_ROOT: &str = "d2p/subdevice_status_response/";
const STATUS_REQUEST_ROOT: &str = "p2d/subdevice_status_request/";
const LAST_WILL_TOPIC: &str = "lastwill";

#[derive(Serialize)]
struct StatusPayload {
    state: u8,
}

/// Default JSON rendition of the status protocol.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonStatusProtocol;

impl JsonStatusProtocol {
    fn make_status_message(
        topic_root: &str,
        device_key: &str,
        status: DeviceStatus,
    ) -> Result<Message, ProtocolError> {
        let topic = format!("{topic_root}{DEVICE_PATH_PREFIX}{device_key}");
        let payload = serde_json::to_vec(&StatusPayload {
            state: status.wire_code(),
        })?;
        Ok(Message::new(topic, payload))
    }
}

impl StatusProtocol for JsonStatusProtocol {
    fn inbound_topics_for_device(&self, device_key: &str) -> Vec<String> {
        vec![format!("{STATUS_REQUEST_ROOT}{DEVICE_PATH_PREFIX}{device_key}")]
    }

    fn extract_device_key_from_message(&self, message: &Message) -> Option<String> {
        device_key_from_topic(&message.topic)
    }

    fn is_device_status_request_message(&self, message: &Message) -> bool {
        message.topic.starts_with(STATUS_REQUEST_ROOT)
    }

    fn make_device_status_response_message(
        &self,
        device_key: &str,
        status: DeviceStatus,
    ) -> Result<Message, ProtocolError> {
        Self::make_status_message(STATUS_RESPONSE_ROOT, device_key, status)
    }

    fn make_device_status_update_message(
        &self,
        device_key: &str,
        status: DeviceStatus,
    ) -> Result<Message, ProtocolError> {
        Self::make_status_message(STATUS_UPDATE_ROOT, device_key, status)
    }

    fn make_last_will_message(&self, device_keys: &[String]) -> Result<Message, ProtocolError> {
        let payload = serde_json::to_vec(device_keys)?;
        Ok(Message::new(LAST_WILL_TOPIC, payload))
    }
}
