use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;
use crate::model::message::Message;
use crate::model::registration::{
    DeviceRegistrationRequest, DeviceRegistrationResponse, DeviceRegistrationResponseResult,
};
use crate::model::template::{
    ActuatorTemplate, AlarmTemplate, ConfigurationTemplate, ReadingType, SensorTemplate,
};
use crate::protocol::{device_key_from_topic, RegistrationProtocol, DEVICE_PATH_PREFIX};

const REGISTRATION_REQUEST_TOPIC: &str = "d2p/register_subdevice_request/";
const REGISTRATION_RESPONSE_ROOT: &str = "p2d/register_subdevice_response/";

const SUPPORTS_FIRMWARE_UPDATE_KEY: &str = "supportsFirmwareUpdate";

#[derive(Serialize)]
struct UnitDto<'a> {
    #[serde(rename = "readingTypeName")]
    reading_type_name: &'a str,
    symbol: &'a str,
}

impl<'a> From<&'a ReadingType> for UnitDto<'a> {
    fn from(reading_type: &'a ReadingType) -> Self {
        Self {
            reading_type_name: reading_type.name(),
            symbol: reading_type.symbol(),
        }
    }
}

#[derive(Serialize)]
struct FeedDto<'a> {
    name: &'a str,
    reference: &'a str,
    unit: UnitDto<'a>,
    description: Option<&'a str>,
    minimum: Option<f64>,
    maximum: Option<f64>,
}

impl<'a> From<&'a SensorTemplate> for FeedDto<'a> {
    fn from(sensor: &'a SensorTemplate) -> Self {
        Self {
            name: sensor.name(),
            reference: sensor.reference(),
            unit: UnitDto::from(sensor.reading_type()),
            description: sensor.description(),
            minimum: sensor.minimum(),
            maximum: sensor.maximum(),
        }
    }
}

impl<'a> From<&'a ActuatorTemplate> for FeedDto<'a> {
    fn from(actuator: &'a ActuatorTemplate) -> Self {
        Self {
            name: actuator.name(),
            reference: actuator.reference(),
            unit: UnitDto::from(actuator.reading_type()),
            description: actuator.description(),
            minimum: actuator.minimum(),
            maximum: actuator.maximum(),
        }
    }
}

#[derive(Serialize)]
struct AlarmDto<'a> {
    name: &'a str,
    reference: &'a str,
    description: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigurationDto<'a> {
    name: &'a str,
    reference: &'a str,
    description: Option<&'a str>,
    default_value: Option<&'a str>,
    size: usize,
    labels: Option<&'a str>,
    minimum: Option<f64>,
    maximum: Option<f64>,
    data_type: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationRequestDto<'a> {
    name: &'a str,
    device_key: &'a str,
    default_binding: bool,
    sensors: Vec<FeedDto<'a>>,
    actuators: Vec<FeedDto<'a>>,
    alarms: Vec<AlarmDto<'a>>,
    configurations: Vec<ConfigurationDto<'a>>,
    type_parameters: &'a HashMap<String, Value>,
    connectivity_parameters: &'a HashMap<String, Value>,
    firmware_update_parameters: HashMap<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePayloadDto {
    device_key: String,
}

#[derive(Deserialize)]
struct ResponseDto {
    payload: ResponsePayloadDto,
    result: DeviceRegistrationResponseResult,
    #[serde(default)]
    description: String,
}

/// Default JSON rendition of the registration protocol.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonRegistrationProtocol;

impl RegistrationProtocol for JsonRegistrationProtocol {
    fn inbound_topics_for_device(&self, device_key: &str) -> Vec<String> {
        vec![format!(
            "{REGISTRATION_RESPONSE_ROOT}{DEVICE_PATH_PREFIX}{device_key}"
        )]
    }

    fn extract_device_key_from_message(&self, message: &Message) -> Option<String> {
        device_key_from_topic(&message.topic)
    }

    fn is_registration_response_message(&self, message: &Message) -> bool {
        message.topic.starts_with(REGISTRATION_RESPONSE_ROOT)
    }

    fn make_registration_request_message(
        &self,
        request: &DeviceRegistrationRequest,
    ) -> Result<Message, ProtocolError> {
        let template = &request.template;

        let mut firmware_update_parameters = template.firmware_update_parameters.clone();
        firmware_update_parameters
            .entry(SUPPORTS_FIRMWARE_UPDATE_KEY.to_owned())
            .or_insert_with(|| Value::Bool(template.supports_firmware_update));

        let dto = RegistrationRequestDto {
            name: &request.name,
            device_key: &request.key,
            default_binding: true,
            sensors: template.sensors.iter().map(FeedDto::from).collect(),
            actuators: template.actuators.iter().map(FeedDto::from).collect(),
            alarms: template
                .alarms
                .iter()
                .map(|alarm: &AlarmTemplate| AlarmDto {
                    name: alarm.name(),
                    reference: alarm.reference(),
                    description: alarm.description(),
                })
                .collect(),
            configurations: template
                .configurations
                .iter()
                .map(|configuration: &ConfigurationTemplate| ConfigurationDto {
                    name: configuration.name(),
                    reference: configuration.reference(),
                    description: configuration.description(),
                    default_value: configuration.default_value(),
                    size: configuration.size(),
                    labels: configuration.labels(),
                    minimum: configuration.minimum(),
                    maximum: configuration.maximum(),
                    data_type: configuration.data_type().as_str(),
                })
                .collect(),
            type_parameters: &template.type_parameters,
            connectivity_parameters: &template.connectivity_parameters,
            firmware_update_parameters,
        };

        let payload = serde_json::to_vec(&dto)?;
        Ok(Message::new(REGISTRATION_REQUEST_TOPIC, payload))
    }

    fn parse_registration_response(
        &self,
        message: &Message,
    ) -> Result<DeviceRegistrationResponse, ProtocolError> {
        let dto: ResponseDto = serde_json::from_slice(&message.payload)?;
        Ok(DeviceRegistrationResponse {
            key: dto.payload.device_key,
            result: dto.result,
            description: dto.description,
        })
    }
}
