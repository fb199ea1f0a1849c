//! Callback interfaces through which the module reaches the host device's
//! drivers.
//!
//! All callbacks run on whichever thread delivered the triggering event —
//! usually the transport worker — and are expected to be thread-safe and
//! non-blocking. Plain closures with the matching shape implement the
//! single-method traits directly.

use std::collections::HashMap;
use std::sync::Arc;

use crate::model::status::DeviceStatus;
use crate::model::value::{ActuatorState, ReadingValue};
use crate::wolk::FirmwareUpdateCallback;

/// Reports the current status of a device. Mandatory for every module.
pub trait DeviceStatusProvider: Send + Sync {
    fn device_status(&self, device_key: &str) -> DeviceStatus;
}

impl<F> DeviceStatusProvider for F
where
    F: Fn(&str) -> DeviceStatus + Send + Sync,
{
    fn device_status(&self, device_key: &str) -> DeviceStatus {
        self(device_key)
    }
}

/// Applies a new value to an actuator.
pub trait ActuationHandler: Send + Sync {
    fn handle_actuation(&self, device_key: &str, reference: &str, value: &ReadingValue);
}

impl<F> ActuationHandler for F
where
    F: Fn(&str, &str, &ReadingValue) + Send + Sync,
{
    fn handle_actuation(&self, device_key: &str, reference: &str, value: &ReadingValue) {
        self(device_key, reference, value)
    }
}

/// Reads the current state and value of an actuator. The value must match
/// the data type the actuator's template declared.
pub trait ActuatorStatusProvider: Send + Sync {
    fn actuator_status(&self, device_key: &str, reference: &str) -> (ActuatorState, ReadingValue);
}

impl<F> ActuatorStatusProvider for F
where
    F: Fn(&str, &str) -> (ActuatorState, ReadingValue) + Send + Sync,
{
    fn actuator_status(&self, device_key: &str, reference: &str) -> (ActuatorState, ReadingValue) {
        self(device_key, reference)
    }
}

/// Applies new configuration values. All entries are expected to take effect
/// together from the device's perspective.
pub trait ConfigurationHandler: Send + Sync {
    fn configure(&self, device_key: &str, values: &HashMap<String, ReadingValue>);
}

impl<F> ConfigurationHandler for F
where
    F: Fn(&str, &HashMap<String, ReadingValue>) + Send + Sync,
{
    fn configure(&self, device_key: &str, values: &HashMap<String, ReadingValue>) {
        self(device_key, values)
    }
}

/// Reads the current configuration of a device.
pub trait ConfigurationProvider: Send + Sync {
    fn configuration(&self, device_key: &str) -> HashMap<String, ReadingValue>;
}

impl<F> ConfigurationProvider for F
where
    F: Fn(&str) -> HashMap<String, ReadingValue> + Send + Sync,
{
    fn configuration(&self, device_key: &str) -> HashMap<String, ReadingValue> {
        self(device_key)
    }
}

/// Performs firmware installations on devices.
///
/// Installation is asynchronous from the module's point of view: the handler
/// reports the outcome through the [`FirmwareUpdateCallback`] it received in
/// [`attach`](FirmwareHandler::attach). The callback may be invoked from any
/// thread, including the one running `install_firmware`.
pub trait FirmwareHandler: Send + Sync {
    /// Called once while the module is being built; the handler must keep
    /// the callback for reporting installation outcomes.
    fn attach(&self, callback: FirmwareUpdateCallback);

    /// Starts installing the firmware file on the device.
    fn install_firmware(&self, device_key: &str, firmware_file_path: &str);

    /// Attempts to abort an installation in progress. Returns whether the
    /// abort was honored; when it was not, no status is reported.
    fn abort_installation(&self, device_key: &str) -> bool;

    /// Current firmware version of the device.
    fn firmware_version(&self, device_key: &str) -> String;
}

impl<H: FirmwareHandler + ?Sized> FirmwareHandler for Arc<H> {
    fn attach(&self, callback: FirmwareUpdateCallback) {
        (**self).attach(callback);
    }

    fn install_firmware(&self, device_key: &str, firmware_file_path: &str) {
        (**self).install_firmware(device_key, firmware_file_path);
    }

    fn abort_installation(&self, device_key: &str) -> bool {
        (**self).abort_installation(device_key)
    }

    fn firmware_version(&self, device_key: &str) -> String {
        (**self).firmware_version(device_key)
    }
}
