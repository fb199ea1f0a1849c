//! Bidirectional translators between typed domain values and gateway
//! topic/payload pairs.
//!
//! Implementations are stateless; a custom protocol can replace any of the
//! defaults as long as it keeps the topic grammar consistent between
//! `inbound_topics_for_device` and its classification predicates.

pub mod data;
pub mod firmware;
pub mod registration;
pub mod status;

use std::collections::HashMap;

use crate::error::ProtocolError;
use crate::model::command::{ActuatorCommand, ConfigurationCommand};
use crate::model::message::Message;
use crate::model::registration::{DeviceRegistrationRequest, DeviceRegistrationResponse};
use crate::model::status::{DeviceStatus, FirmwareUpdateStatus};
use crate::model::value::{ActuatorStatus, Alarm, ReadingValue, SensorReading};

pub use data::JsonDataProtocol;
pub use firmware::JsonFirmwareUpdateProtocol;
pub use registration::JsonRegistrationProtocol;
pub use status::JsonStatusProtocol;

pub(crate) const DEVICE_PATH_PREFIX: &str = "d/";
pub(crate) const REFERENCE_PATH_PREFIX: &str = "r/";
pub(crate) const CHANNEL_WILDCARD: &str = "#";

/// Device key of a device-scoped topic: the path segment following `d`.
pub(crate) fn device_key_from_topic(topic: &str) -> Option<String> {
    let mut segments = topic.split('/');
    while let Some(segment) = segments.next() {
        if segment == "d" {
            return segments.next().map(str::to_owned);
        }
    }
    None
}

/// Trailing path segment, used where a topic ends in a reference.
pub(crate) fn last_topic_segment(topic: &str) -> Option<String> {
    topic.rsplit('/').next().map(str::to_owned)
}

/// Translator for sensor readings, alarms, actuator and configuration
/// traffic.
pub trait DataProtocol: Send + Sync {
    fn inbound_topics_for_device(&self, device_key: &str) -> Vec<String>;
    fn extract_device_key_from_message(&self, message: &Message) -> Option<String>;

    fn is_actuator_set_message(&self, message: &Message) -> bool;
    fn is_actuator_get_message(&self, message: &Message) -> bool;
    fn is_configuration_set_message(&self, message: &Message) -> bool;
    fn is_configuration_get_message(&self, message: &Message) -> bool;

    fn parse_actuator_command(&self, message: &Message) -> Result<ActuatorCommand, ProtocolError>;
    fn parse_configuration_command(
        &self,
        message: &Message,
    ) -> Result<ConfigurationCommand, ProtocolError>;

    fn make_sensor_reading_message(
        &self,
        device_key: &str,
        reading: &SensorReading,
    ) -> Result<Message, ProtocolError>;
    fn make_alarm_message(&self, device_key: &str, alarm: &Alarm)
        -> Result<Message, ProtocolError>;
    fn make_actuator_status_message(
        &self,
        device_key: &str,
        status: &ActuatorStatus,
    ) -> Result<Message, ProtocolError>;
    fn make_configuration_message(
        &self,
        device_key: &str,
        configuration: &HashMap<String, ReadingValue>,
    ) -> Result<Message, ProtocolError>;
}

/// Translator for device status traffic and the module's last will.
pub trait StatusProtocol: Send + Sync {
    fn inbound_topics_for_device(&self, device_key: &str) -> Vec<String>;
    fn extract_device_key_from_message(&self, message: &Message) -> Option<String>;

    fn is_device_status_request_message(&self, message: &Message) -> bool;

    fn make_device_status_response_message(
        &self,
        device_key: &str,
        status: DeviceStatus,
    ) -> Result<Message, ProtocolError>;
    fn make_device_status_update_message(
        &self,
        device_key: &str,
        status: DeviceStatus,
    ) -> Result<Message, ProtocolError>;
    fn make_last_will_message(&self, device_keys: &[String]) -> Result<Message, ProtocolError>;
}

/// Translator for sub-device registration traffic.
pub trait RegistrationProtocol: Send + Sync {
    fn inbound_topics_for_device(&self, device_key: &str) -> Vec<String>;
    fn extract_device_key_from_message(&self, message: &Message) -> Option<String>;

    fn is_registration_response_message(&self, message: &Message) -> bool;

    fn make_registration_request_message(
        &self,
        request: &DeviceRegistrationRequest,
    ) -> Result<Message, ProtocolError>;
    fn parse_registration_response(
        &self,
        message: &Message,
    ) -> Result<DeviceRegistrationResponse, ProtocolError>;
}

/// Translator for firmware update traffic.
pub trait FirmwareUpdateProtocol: Send + Sync {
    fn inbound_topics_for_device(&self, device_key: &str) -> Vec<String>;
    fn extract_device_key_from_message(&self, message: &Message) -> Option<String>;

    fn is_firmware_install_message(&self, message: &Message) -> bool;
    fn is_firmware_abort_message(&self, message: &Message) -> bool;

    fn parse_firmware_file_path(&self, message: &Message) -> Result<String, ProtocolError>;
    fn make_update_status_message(
        &self,
        device_key: &str,
        status: &FirmwareUpdateStatus,
    ) -> Result<Message, ProtocolError>;
    fn make_version_message(
        &self,
        device_key: &str,
        version: &str,
    ) -> Result<Message, ProtocolError>;
}
