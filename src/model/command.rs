use std::collections::HashMap;

use crate::model::value::ReadingValue;

/// Inbound actuator command decoded from the gateway.
#[derive(Clone, Debug, PartialEq)]
pub enum ActuatorCommand {
    Set {
        reference: String,
        value: ReadingValue,
    },
    Get {
        reference: String,
    },
}

/// Inbound configuration command decoded from the gateway.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigurationCommand {
    Set(HashMap<String, ReadingValue>),
    Get,
}
