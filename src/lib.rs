//! Gateway module SDK: connect a fleet of locally attached sub-devices to a
//! WolkGateway installation over MQTT.
//!
//! The [`Wolk`] orchestrator owns the device registry and wires four JSON
//! protocols, an outbound message queue and an MQTT connectivity service
//! together. The host supplies callbacks for everything hardware-specific:
//! device status, actuation, configuration and firmware installation.

pub mod connectivity;
pub mod error;
pub mod handlers;
pub mod model;
pub mod persistence;
pub mod protocol;
mod wolk;

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub use crate::connectivity::{ConnectivityService, MqttConnectivityService};
pub use crate::error::{GatewayError, ProtocolError, TransportError};
pub use crate::handlers::{
    ActuationHandler, ActuatorStatusProvider, ConfigurationHandler, ConfigurationProvider,
    DeviceStatusProvider, FirmwareHandler,
};
pub use crate::model::{
    ActuatorState, ActuatorStatus, ActuatorTemplate, Alarm, AlarmTemplate, ConfigurationTemplate,
    DataType, Device, DeviceRegistrationRequest, DeviceRegistrationResponse,
    DeviceRegistrationResponseResult, DeviceStatus, DeviceTemplate, FirmwareUpdateErrorCode,
    FirmwareUpdateStatus, Message, ReadingType, ReadingTypeMeasurementUnit, ReadingTypeName,
    ReadingValue, ScalarValue, SensorReading, SensorTemplate,
};
pub use crate::persistence::{OutboundMessageDeque, OutboundMessageQueue};
pub use crate::wolk::{FirmwareUpdateCallback, Wolk, WolkBuilder};

/// Installs the global log subscriber at the given verbosity, optionally
/// writing to a file instead of stderr.
///
/// # Errors
///
/// Fails when the level string is not a valid filter, the log file cannot be
/// created, or a subscriber was already installed.
pub fn logging_config(level: &str, log_file: Option<&Path>) -> Result<(), GatewayError> {
    let level: LevelFilter = level
        .parse()
        .map_err(|_| GatewayError::Configuration(format!("unrecognized log level `{level}`")))?;

    let result = match log_file {
        Some(path) => {
            let file = File::create(path).map_err(|err| {
                GatewayError::Configuration(format!(
                    "unable to create log file {}: {err}",
                    path.display()
                ))
            })?;
            tracing_subscriber::registry()
                .with(level)
                .with(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
                .try_init()
        }
        None => tracing_subscriber::registry()
            .with(level)
            .with(fmt::layer())
            .try_init(),
    };
    result.map_err(|err| GatewayError::Configuration(format!("logging already configured: {err}")))
}
