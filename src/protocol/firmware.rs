use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::model::message::Message;
use crate::model::status::FirmwareUpdateStatus;
use crate::protocol::{device_key_from_topic, FirmwareUpdateProtocol, DEVICE_PATH_PREFIX};

const INSTALL_ROOT: &str = "p2d/firmware_update_install/";
const ABORT_ROOT: &str = "p2d/firmware_update_abort/";
const UPDATE_STATUS_ROOT: &str = "d2p/firmware_update_status/";
const VERSION_UPDATE_ROOT: &str = "d2p/firmware_version_update/";

#[derive(Deserialize)]
struct InstallPayload {
    #[serde(rename = "fileName")]
    file_name: String,
}

#[derive(Serialize)]
struct UpdateStatusPayload<'a> {
    status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<u8>,
}

/// Default JSON rendition of the firmware update protocol. The firmware
/// version message carries the raw version string, not JSON.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonFirmwareUpdateProtocol;

impl FirmwareUpdateProtocol for JsonFirmwareUpdateProtocol {
    fn inbound_topics_for_device(&self, device_key: &str) -> Vec<String> {
        vec![
            format!("{INSTALL_ROOT}{DEVICE_PATH_PREFIX}{device_key}"),
            format!("{ABORT_ROOT}{DEVICE_PATH_PREFIX}{device_key}"),
        ]
    }

    fn extract_device_key_from_message(&self, message: &Message) -> Option<String> {
        device_key_from_topic(&message.topic)
    }

    fn is_firmware_install_message(&self, message: &Message) -> bool {
        message.topic.starts_with(INSTALL_ROOT)
    }

    fn is_firmware_abort_message(&self, message: &Message) -> bool {
        message.topic.starts_with(ABORT_ROOT)
    }

    fn parse_firmware_file_path(&self, message: &Message) -> Result<String, ProtocolError> {
        let payload: InstallPayload = serde_json::from_slice(&message.payload)?;
        Ok(payload.file_name)
    }

    fn make_update_status_message(
        &self,
        device_key: &str,
        status: &FirmwareUpdateStatus,
    ) -> Result<Message, ProtocolError> {
        let topic = format!("{UPDATE_STATUS_ROOT}{DEVICE_PATH_PREFIX}{device_key}");
        let payload = serde_json::to_vec(&UpdateStatusPayload {
            status: status.state_str(),
            error: status.error_code().map(|code| code.wire_code()),
        })?;
        Ok(Message::new(topic, payload))
    }

    fn make_version_message(
        &self,
        device_key: &str,
        version: &str,
    ) -> Result<Message, ProtocolError> {
        let topic = format!("{VERSION_UPDATE_ROOT}{DEVICE_PATH_PREFIX}{device_key}");
        Ok(Message::new(topic, version.as_bytes().to_vec()))
    }
}
