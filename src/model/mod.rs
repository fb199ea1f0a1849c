//! Typed domain entities exchanged between the module, its callbacks and the
//! gateway protocols.

pub mod command;
pub mod device;
pub mod message;
pub mod registration;
pub mod status;
pub mod template;
pub mod value;

pub use command::{ActuatorCommand, ConfigurationCommand};
pub use device::{Device, DeviceTemplate};
pub use message::Message;
pub use registration::{
    DeviceRegistrationRequest, DeviceRegistrationResponse, DeviceRegistrationResponseResult,
};
pub use status::{DeviceStatus, FirmwareUpdateErrorCode, FirmwareUpdateStatus};
pub use template::{
    ActuatorTemplate, AlarmTemplate, ConfigurationTemplate, DataType, ReadingType,
    ReadingTypeMeasurementUnit, ReadingTypeName, SensorTemplate,
};
pub use value::{ActuatorState, ActuatorStatus, Alarm, ReadingValue, ScalarValue, SensorReading};
