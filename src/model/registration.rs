use serde::{Deserialize, Deserializer};

use crate::model::device::{Device, DeviceTemplate};

/// Registration request for one sub-device. Serialized by the registration
/// protocol; the default-binding flag is always sent as `true`.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceRegistrationRequest {
    pub name: String,
    pub key: String,
    pub template: DeviceTemplate,
}

impl DeviceRegistrationRequest {
    pub fn new(
        name: impl Into<String>,
        key: impl Into<String>,
        template: DeviceTemplate,
    ) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            template,
        }
    }
}

impl From<&Device> for DeviceRegistrationRequest {
    fn from(device: &Device) -> Self {
        Self::new(device.name.clone(), device.key.clone(), device.template.clone())
    }
}

/// Outcome reported by the platform for a registration request. Result
/// strings unknown to this module collapse to `ErrorUnknown`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceRegistrationResponseResult {
    Ok,
    ErrorGatewayNotFound,
    ErrorNotAGateway,
    ErrorKeyConflict,
    ErrorMaximumNumberOfDevicesExceeded,
    ErrorValidationError,
    ErrorInvalidDto,
    ErrorKeyMissing,
    ErrorSubdeviceManagementForbidden,
    ErrorUnknown,
}

impl DeviceRegistrationResponseResult {
    /// Parses a result string, collapsing anything unrecognized to
    /// `ErrorUnknown`.
    pub fn from_result_str(value: &str) -> Self {
        match value {
            "OK" => DeviceRegistrationResponseResult::Ok,
            "ERROR_GATEWAY_NOT_FOUND" => DeviceRegistrationResponseResult::ErrorGatewayNotFound,
            "ERROR_NOT_A_GATEWAY" => DeviceRegistrationResponseResult::ErrorNotAGateway,
            "ERROR_KEY_CONFLICT" => DeviceRegistrationResponseResult::ErrorKeyConflict,
            "ERROR_MAXIMUM_NUMBER_OF_DEVICES_EXCEEDED" => {
                DeviceRegistrationResponseResult::ErrorMaximumNumberOfDevicesExceeded
            }
            "ERROR_VALIDATION_ERROR" => DeviceRegistrationResponseResult::ErrorValidationError,
            "ERROR_INVALID_DTO" => DeviceRegistrationResponseResult::ErrorInvalidDto,
            "ERROR_KEY_MISSING" => DeviceRegistrationResponseResult::ErrorKeyMissing,
            "ERROR_SUBDEVICE_MANAGEMENT_FORBIDDEN" => {
                DeviceRegistrationResponseResult::ErrorSubdeviceManagementForbidden
            }
            _ => DeviceRegistrationResponseResult::ErrorUnknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceRegistrationResponseResult::Ok => "OK",
            DeviceRegistrationResponseResult::ErrorGatewayNotFound => "ERROR_GATEWAY_NOT_FOUND",
            DeviceRegistrationResponseResult::ErrorNotAGateway => "ERROR_NOT_A_GATEWAY",
            DeviceRegistrationResponseResult::ErrorKeyConflict => "ERROR_KEY_CONFLICT",
            DeviceRegistrationResponseResult::ErrorMaximumNumberOfDevicesExceeded => {
                "ERROR_MAXIMUM_NUMBER_OF_DEVICES_EXCEEDED"
            }
            DeviceRegistrationResponseResult::ErrorValidationError => "ERROR_VALIDATION_ERROR",
            DeviceRegistrationResponseResult::ErrorInvalidDto => "ERROR_INVALID_DTO",
            DeviceRegistrationResponseResult::ErrorKeyMissing => "ERROR_KEY_MISSING",
            DeviceRegistrationResponseResult::ErrorSubdeviceManagementForbidden => {
                "ERROR_SUBDEVICE_MANAGEMENT_FORBIDDEN"
            }
            DeviceRegistrationResponseResult::ErrorUnknown => "ERROR_UNKNOWN",
        }
    }

    pub fn is_ok(self) -> bool {
        self == DeviceRegistrationResponseResult::Ok
    }
}

impl<'de> Deserialize<'de> for DeviceRegistrationResponseResult {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Self::from_result_str(&value))
    }
}

/// Parsed registration response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceRegistrationResponse {
    pub key: String,
    pub result: DeviceRegistrationResponseResult,
    pub description: String,
}
