use std::collections::HashMap;

use serde_json::Value;

use crate::model::template::{
    ActuatorTemplate, AlarmTemplate, ConfigurationTemplate, SensorTemplate,
};

/// Everything the platform needs to know about one sub-device type:
/// its feeds, actuators, alarms, configuration options and firmware update
/// capability. Immutable once the device is created.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeviceTemplate {
    pub sensors: Vec<SensorTemplate>,
    pub actuators: Vec<ActuatorTemplate>,
    pub alarms: Vec<AlarmTemplate>,
    pub configurations: Vec<ConfigurationTemplate>,
    pub supports_firmware_update: bool,
    pub firmware_update_type: String,
    pub type_parameters: HashMap<String, Value>,
    pub connectivity_parameters: HashMap<String, Value>,
    pub firmware_update_parameters: HashMap<String, Value>,
}

/// A sub-device proxied to the platform under its own key.
#[derive(Clone, Debug, PartialEq)]
pub struct Device {
    pub name: String,
    pub key: String,
    pub template: DeviceTemplate,
}

impl Device {
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

    pub fn has_actuators(&self) -> bool {
        !self.template.actuators.is_empty()
    }

    pub fn has_configurations(&self) -> bool {
        !self.template.configurations.is_empty()
    }

    pub fn supports_firmware_update(&self) -> bool {
        self.template.supports_firmware_update
    }

    /// References of all declared actuators, in template order.
    pub fn actuator_references(&self) -> Vec<&str> {
        self.template
            .actuators
            .iter()
            .map(ActuatorTemplate::reference)
            .collect()
    }
}
