use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::error::ProtocolError;
use crate::model::command::{ActuatorCommand, ConfigurationCommand};
use crate::model::message::Message;
use crate::model::value::{ActuatorStatus, Alarm, ReadingValue, ScalarValue, SensorReading};
use crate::protocol::{
    device_key_from_topic, last_topic_segment, DataProtocol, CHANNEL_WILDCARD, DEVICE_PATH_PREFIX,
    REFERENCE_PATH_PREFIX,
};

const SENSOR_READING_ROOT: &str = "d2p/sensor_reading/";
const ALARM_ROOT: &str = "d2p/events/";
const ACTUATOR_STATUS_ROOT: &str = "d2p/actuator_status/";
const CONFIGURATION_STATUS_ROOT: &str = "d2p/configuration_get/";
const ACTUATOR_SET_ROOT: &str = "p2d/actuator_set/";
const ACTUATOR_GET_ROOT: &str = "p2d/actuator_get/";
const CONFIGURATION_SET_ROOT: &str = "p2d/configuration_set/";
const CONFIGURATION_GET_ROOT: &str = "p2d/configuration_get/";

#[derive(Serialize)]
struct ReadingPayload {
    data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    utc: Option<u64>,
}

#[derive(Serialize)]
struct AlarmPayload {
    data: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    utc: Option<u64>,
}

#[derive(Serialize)]
struct ActuatorStatusPayload<'a> {
    status: &'a str,
    value: String,
}

#[derive(Serialize)]
struct ConfigurationPayload {
    values: BTreeMap<String, String>,
}

/// Default JSON rendition of the data protocol.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonDataProtocol;

impl DataProtocol for JsonDataProtocol {
    fn inbound_topics_for_device(&self, device_key: &str) -> Vec<String> {
        vec![
            format!(
                "{ACTUATOR_SET_ROOT}{DEVICE_PATH_PREFIX}{device_key}/{REFERENCE_PATH_PREFIX}{CHANNEL_WILDCARD}"
            ),
            format!(
                "{ACTUATOR_GET_ROOT}{DEVICE_PATH_PREFIX}{device_key}/{REFERENCE_PATH_PREFIX}{CHANNEL_WILDCARD}"
            ),
            format!("{CONFIGURATION_SET_ROOT}{DEVICE_PATH_PREFIX}{device_key}"),
            format!("{CONFIGURATION_GET_ROOT}{DEVICE_PATH_PREFIX}{device_key}"),
        ]
    }

    fn extract_device_key_from_message(&self, message: &Message) -> Option<String> {
        device_key_from_topic(&message.topic)
    }

    fn is_actuator_set_message(&self, message: &Message) -> bool {
        message.topic.starts_with(ACTUATOR_SET_ROOT)
    }

    fn is_actuator_get_message(&self, message: &Message) -> bool {
        message.topic.starts_with(ACTUATOR_GET_ROOT)
    }

    fn is_configuration_set_message(&self, message: &Message) -> bool {
        message.topic.starts_with(CONFIGURATION_SET_ROOT)
    }

    fn is_configuration_get_message(&self, message: &Message) -> bool {
        message.topic.starts_with(CONFIGURATION_GET_ROOT)
    }

    fn parse_actuator_command(&self, message: &Message) -> Result<ActuatorCommand, ProtocolError> {
        let reference = last_topic_segment(&message.topic)
            .ok_or_else(|| ProtocolError::UnexpectedTopic(message.topic.clone()))?;
        if self.is_actuator_set_message(message) {
            let payload: serde_json::Value = serde_json::from_slice(&message.payload)?;
            let value = payload
                .get("value")
                .and_then(ReadingValue::from_json)
                .ok_or_else(|| ProtocolError::UnexpectedTopic(message.topic.clone()))?;
            Ok(ActuatorCommand::Set { reference, value })
        } else if self.is_actuator_get_message(message) {
            Ok(ActuatorCommand::Get { reference })
        } else {
            Err(ProtocolError::UnexpectedTopic(message.topic.clone()))
        }
    }

    fn parse_configuration_command(
        &self,
        message: &Message,
    ) -> Result<ConfigurationCommand, ProtocolError> {
        if self.is_configuration_get_message(message) {
            return Ok(ConfigurationCommand::Get);
        }
        if !self.is_configuration_set_message(message) {
            return Err(ProtocolError::UnexpectedTopic(message.topic.clone()));
        }
        let payload: serde_json::Value = serde_json::from_slice(&message.payload)?;
        let raw_values = payload
            .get("values")
            .and_then(serde_json::Value::as_object)
            .ok_or_else(|| ProtocolError::UnexpectedTopic(message.topic.clone()))?;

        // Decode into a fresh map; the comma-separated coercion below must
        // not observe its own output.
        let mut values = HashMap::with_capacity(raw_values.len());
        for (reference, raw) in raw_values {
            let value = match raw {
                serde_json::Value::String(text) => coerce_configuration_string(text),
                other => ReadingValue::from_json(other)
                    .ok_or_else(|| ProtocolError::UnexpectedTopic(message.topic.clone()))?,
            };
            values.insert(reference.clone(), value);
        }
        Ok(ConfigurationCommand::Set(values))
    }

    fn make_sensor_reading_message(
        &self,
        device_key: &str,
        reading: &SensorReading,
    ) -> Result<Message, ProtocolError> {
        let topic = format!(
            "{SENSOR_READING_ROOT}{DEVICE_PATH_PREFIX}{device_key}/{REFERENCE_PATH_PREFIX}{}",
            reading.reference
        );
        let payload = serde_json::to_vec(&ReadingPayload {
            data: reading.value.to_wire(),
            utc: reading.timestamp,
        })?;
        Ok(Message::new(topic, payload))
    }

    fn make_alarm_message(
        &self,
        device_key: &str,
        alarm: &Alarm,
    ) -> Result<Message, ProtocolError> {
        let topic = format!(
            "{ALARM_ROOT}{DEVICE_PATH_PREFIX}{device_key}/{REFERENCE_PATH_PREFIX}{}",
            alarm.reference
        );
        let payload = serde_json::to_vec(&AlarmPayload {
            data: alarm.active,
            utc: alarm.timestamp,
        })?;
        Ok(Message::new(topic, payload))
    }

    fn make_actuator_status_message(
        &self,
        device_key: &str,
        status: &ActuatorStatus,
    ) -> Result<Message, ProtocolError> {
        let topic = format!(
            "{ACTUATOR_STATUS_ROOT}{DEVICE_PATH_PREFIX}{device_key}/{REFERENCE_PATH_PREFIX}{}",
            status.reference
        );
        let payload = serde_json::to_vec(&ActuatorStatusPayload {
            status: status.state.as_str(),
            value: status.value.to_display(),
        })?;
        Ok(Message::new(topic, payload))
    }

    fn make_configuration_message(
        &self,
        device_key: &str,
        configuration: &HashMap<String, ReadingValue>,
    ) -> Result<Message, ProtocolError> {
        let topic = format!("{CONFIGURATION_STATUS_ROOT}{DEVICE_PATH_PREFIX}{device_key}");
        let values = configuration
            .iter()
            .map(|(reference, value)| {
                (reference.clone(), escape_configuration_value(&value.to_wire()))
            })
            .collect();
        let payload = serde_json::to_vec(&ConfigurationPayload { values })?;
        Ok(Message::new(topic, payload))
    }
}

/// Pre-JSON escaping applied to outbound configuration values: carriage
/// returns stripped, newlines flattened to a literal `\n`, embedded quotes
/// escaped.
fn escape_configuration_value(value: &str) -> String {
    value
        .replace('\r', "")
        .replace('\n', "\\n")
        .replace('"', "\\\"")
}

/// Comma-separated strings become tuples: an integer tuple when every
/// element parses as an integer, a float tuple when any element contains a
/// `.` and all parse as floats, a string tuple otherwise. Everything else
/// passes through as text.
fn coerce_configuration_string(text: &str) -> ReadingValue {
    if !text.contains(',') {
        return ReadingValue::Scalar(ScalarValue::Text(text.to_owned()));
    }
    let elements: Vec<&str> = text.split(',').collect();
    let scalars: Vec<ScalarValue> = if elements.iter().all(|e| e.parse::<i64>().is_ok()) {
        elements
            .iter()
            .filter_map(|e| e.parse::<i64>().ok().map(ScalarValue::Int))
            .collect()
    } else if elements.iter().any(|e| e.contains('.'))
        && elements.iter().all(|e| e.parse::<f64>().is_ok())
    {
        elements
            .iter()
            .filter_map(|e| e.parse::<f64>().ok().map(ScalarValue::Float))
            .collect()
    } else {
        elements
            .iter()
            .map(|e| ScalarValue::Text((*e).to_owned()))
            .collect()
    };
    match <[ScalarValue; 2]>::try_from(scalars.clone()) {
        Ok([a, b]) => ReadingValue::Pair(a, b),
        Err(_) => match <[ScalarValue; 3]>::try_from(scalars) {
            Ok([a, b, c]) => ReadingValue::Triple(a, b, c),
            // Tuples wider than three fields are not part of the model.
            Err(_) => ReadingValue::Scalar(ScalarValue::Text(text.to_owned())),
        },
    }
}
