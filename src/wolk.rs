//! The module core: owns the device registry, routes inbound gateway
//! traffic to the host's callbacks and coordinates outbound publication
//! with local persistence.

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::connectivity::{ConnectivityService, MqttConnectivityService};
use crate::error::GatewayError;
use crate::handlers::{
    ActuationHandler, ActuatorStatusProvider, ConfigurationHandler, ConfigurationProvider,
    DeviceStatusProvider, FirmwareHandler,
};
use crate::model::command::{ActuatorCommand, ConfigurationCommand};
use crate::model::device::Device;
use crate::model::message::Message;
use crate::model::registration::DeviceRegistrationRequest;
use crate::model::status::{DeviceStatus, FirmwareUpdateStatus};
use crate::model::value::{ActuatorStatus, Alarm, ReadingValue, SensorReading};
use crate::persistence::{OutboundMessageDeque, OutboundMessageQueue};
use crate::protocol::{
    DataProtocol, FirmwareUpdateProtocol, JsonDataProtocol, JsonFirmwareUpdateProtocol,
    JsonRegistrationProtocol, JsonStatusProtocol, RegistrationProtocol, StatusProtocol,
};

/// Entry point of the module: registers sub-devices with the gateway,
/// publishes their telemetry and dispatches commands back to the host's
/// callbacks.
///
/// `Wolk` is a cheap handle; clones share the same state and every method is
/// callable from any thread. Lock ordering inside is registry, then queue,
/// then transport.
#[derive(Clone)]
pub struct Wolk {
    inner: Arc<WolkInner>,
}

impl Wolk {
    /// Starts building a module connected to the gateway at `host:port`.
    /// The module name becomes the MQTT client identifier; the device
    /// status provider is the one mandatory callback.
    pub fn builder(
        host: impl Into<String>,
        port: u16,
        module_name: impl Into<String>,
        device_status_provider: impl DeviceStatusProvider + 'static,
    ) -> WolkBuilder {
        WolkBuilder {
            host: host.into(),
            port,
            module_name: module_name.into(),
            device_status_provider: Box::new(device_status_provider),
            actuation_handler: None,
            actuator_status_provider: None,
            configuration_handler: None,
            configuration_provider: None,
            firmware_handler: None,
            data_protocol: None,
            status_protocol: None,
            registration_protocol: None,
            firmware_update_protocol: None,
            outbound_message_queue: None,
            connectivity_service: None,
        }
    }

    /// Adds a device to the registry and requests its registration with the
    /// platform.
    ///
    /// Devices with a key already in use, or declaring capabilities without
    /// the matching callbacks, are refused with a log entry. The request is
    /// published immediately when connected, stored otherwise.
    pub fn add_device(&self, device: Device) -> Result<(), GatewayError> {
        self.inner.add_device(device)
    }

    /// Removes a device, drops its subscriptions and updates the last will.
    pub fn remove_device(&self, device_key: &str) -> Result<(), GatewayError> {
        self.inner.remove_device(device_key)
    }

    /// Connects to the gateway and announces the current state of every
    /// registered device: its status, actuator statuses, configuration and
    /// firmware version, per declared capabilities. Idempotent.
    pub fn connect(&self) -> Result<(), GatewayError> {
        self.inner.connect()
    }

    /// Terminates the gateway connection. Stored messages survive for the
    /// next connect. Idempotent.
    pub fn disconnect(&self) {
        self.inner.connectivity.disconnect();
    }

    /// Serializes a sensor reading into storage. Use [`publish`](Self::publish)
    /// to send stored messages.
    ///
    /// Readings without a unix-milliseconds timestamp are treated as live by
    /// the platform and stamped on reception.
    pub fn add_sensor_reading(
        &self,
        device_key: &str,
        reference: &str,
        value: impl Into<ReadingValue>,
        timestamp: Option<u64>,
    ) -> Result<(), GatewayError> {
        let reading = SensorReading::new(reference, value, timestamp);
        let message = self
            .inner
            .data_protocol
            .make_sensor_reading_message(device_key, &reading)?;
        self.inner.store(message)
    }

    /// Serializes an alarm event into storage.
    pub fn add_alarm(
        &self,
        device_key: &str,
        reference: &str,
        active: bool,
        timestamp: Option<u64>,
    ) -> Result<(), GatewayError> {
        let alarm = Alarm::new(reference, active, timestamp);
        let message = self.inner.data_protocol.make_alarm_message(device_key, &alarm)?;
        self.inner.store(message)
    }

    /// Serializes a device status update into storage.
    pub fn add_device_status(
        &self,
        device_key: &str,
        status: DeviceStatus,
    ) -> Result<(), GatewayError> {
        let message = self
            .inner
            .status_protocol
            .make_device_status_update_message(device_key, status)?;
        self.inner.store(message)
    }

    /// Publishes the current status of one actuator, obtained from the
    /// actuator status provider. Falls back to storage when the transport
    /// rejects the message.
    pub fn publish_actuator_status(
        &self,
        device_key: &str,
        reference: &str,
    ) -> Result<(), GatewayError> {
        self.inner.publish_actuator_status(device_key, reference)
    }

    /// Publishes the device's current configuration, obtained from the
    /// configuration provider.
    pub fn publish_configuration(&self, device_key: &str) -> Result<(), GatewayError> {
        self.inner.publish_configuration(device_key)
    }

    /// Publishes the device's current status, obtained from the device
    /// status provider.
    pub fn publish_device_status(&self, device_key: &str) -> Result<(), GatewayError> {
        self.inner.publish_device_status(device_key)
    }

    /// Publishes stored messages in insertion order: all of them, or only
    /// those whose topic contains `device_key`. Draining stops at the first
    /// transport failure, leaving the failed message in place.
    pub fn publish(&self, device_key: Option<&str>) {
        self.inner.publish_stored(device_key);
    }

    /// Snapshot of the registered devices.
    pub fn devices(&self) -> Vec<Device> {
        self.inner.devices.lock().clone()
    }
}

/// Handle through which a [`FirmwareHandler`] reports installation
/// outcomes back to the module.
#[derive(Clone)]
pub struct FirmwareUpdateCallback {
    inner: Weak<WolkInner>,
}

impl FirmwareUpdateCallback {
    /// Reports a completed installation: publishes a COMPLETED status
    /// followed by the device's new firmware version.
    pub fn install_success(&self, device_key: &str) {
        if let Some(inner) = self.inner.upgrade() {
            inner.on_install_success(device_key);
        }
    }

    /// Reports a failed installation: publishes the given status verbatim.
    pub fn install_fail(&self, device_key: &str, status: FirmwareUpdateStatus) {
        if let Some(inner) = self.inner.upgrade() {
            inner.on_install_fail(device_key, status);
        }
    }
}

/// Builder for [`Wolk`]. Capability callbacks come in pairs: providing an
/// actuation handler without an actuator status provider (or a configuration
/// handler without its provider, and vice versa) fails at
/// [`build`](WolkBuilder::build).
pub struct WolkBuilder {
    host: String,
    port: u16,
    module_name: String,
    device_status_provider: Box<dyn DeviceStatusProvider>,
    actuation_handler: Option<Box<dyn ActuationHandler>>,
    actuator_status_provider: Option<Box<dyn ActuatorStatusProvider>>,
    configuration_handler: Option<Box<dyn ConfigurationHandler>>,
    configuration_provider: Option<Box<dyn ConfigurationProvider>>,
    firmware_handler: Option<Box<dyn FirmwareHandler>>,
    data_protocol: Option<Box<dyn DataProtocol>>,
    status_protocol: Option<Box<dyn StatusProtocol>>,
    registration_protocol: Option<Box<dyn RegistrationProtocol>>,
    firmware_update_protocol: Option<Box<dyn FirmwareUpdateProtocol>>,
    outbound_message_queue: Option<Box<dyn OutboundMessageQueue>>,
    connectivity_service: Option<Box<dyn ConnectivityService>>,
}

impl WolkBuilder {
    pub fn actuation_handler(mut self, handler: impl ActuationHandler + 'static) -> Self {
        self.actuation_handler = Some(Box::new(handler));
        self
    }

    pub fn actuator_status_provider(
        mut self,
        provider: impl ActuatorStatusProvider + 'static,
    ) -> Self {
        self.actuator_status_provider = Some(Box::new(provider));
        self
    }

    pub fn configuration_handler(mut self, handler: impl ConfigurationHandler + 'static) -> Self {
        self.configuration_handler = Some(Box::new(handler));
        self
    }

    pub fn configuration_provider(
        mut self,
        provider: impl ConfigurationProvider + 'static,
    ) -> Self {
        self.configuration_provider = Some(Box::new(provider));
        self
    }

    pub fn firmware_handler(mut self, handler: impl FirmwareHandler + 'static) -> Self {
        self.firmware_handler = Some(Box::new(handler));
        self
    }

    pub fn data_protocol(mut self, protocol: impl DataProtocol + 'static) -> Self {
        self.data_protocol = Some(Box::new(protocol));
        self
    }

    pub fn status_protocol(mut self, protocol: impl StatusProtocol + 'static) -> Self {
        self.status_protocol = Some(Box::new(protocol));
        self
    }

    pub fn registration_protocol(mut self, protocol: impl RegistrationProtocol + 'static) -> Self {
        self.registration_protocol = Some(Box::new(protocol));
        self
    }

    pub fn firmware_update_protocol(
        mut self,
        protocol: impl FirmwareUpdateProtocol + 'static,
    ) -> Self {
        self.firmware_update_protocol = Some(Box::new(protocol));
        self
    }

    pub fn outbound_message_queue(mut self, queue: impl OutboundMessageQueue + 'static) -> Self {
        self.outbound_message_queue = Some(Box::new(queue));
        self
    }

    pub fn connectivity_service(mut self, service: impl ConnectivityService + 'static) -> Self {
        self.connectivity_service = Some(Box::new(service));
        self
    }

    /// Validates capability pairing, instantiates defaults for missing
    /// components and wires the inbound listener and firmware callback.
    pub fn build(self) -> Result<Wolk, GatewayError> {
        if self.actuation_handler.is_some() != self.actuator_status_provider.is_some() {
            return Err(GatewayError::Configuration(
                "provide both an actuation handler and an actuator status provider \
                 to enable actuators on your devices"
                    .into(),
            ));
        }
        if self.configuration_handler.is_some() != self.configuration_provider.is_some() {
            return Err(GatewayError::Configuration(
                "provide both a configuration handler and a configuration provider \
                 to enable configuration options on your devices"
                    .into(),
            ));
        }

        let connectivity = self.connectivity_service.unwrap_or_else(|| {
            Box::new(MqttConnectivityService::new(
                self.host.clone(),
                self.port,
                self.module_name.clone(),
            ))
        });

        let inner = Arc::new(WolkInner {
            device_status_provider: self.device_status_provider,
            actuation_handler: self.actuation_handler,
            actuator_status_provider: self.actuator_status_provider,
            configuration_handler: self.configuration_handler,
            configuration_provider: self.configuration_provider,
            firmware_handler: self.firmware_handler,
            data_protocol: self.data_protocol.unwrap_or_else(|| Box::new(JsonDataProtocol)),
            status_protocol: self
                .status_protocol
                .unwrap_or_else(|| Box::new(JsonStatusProtocol)),
            registration_protocol: self
                .registration_protocol
                .unwrap_or_else(|| Box::new(JsonRegistrationProtocol)),
            firmware_update_protocol: self
                .firmware_update_protocol
                .unwrap_or_else(|| Box::new(JsonFirmwareUpdateProtocol)),
            queue: self
                .outbound_message_queue
                .unwrap_or_else(|| Box::new(OutboundMessageDeque::new())),
            connectivity,
            devices: Mutex::new(Vec::new()),
            installing: Mutex::new(HashSet::new()),
        });

        let lastwill = inner.status_protocol.make_last_will_message(&[])?;
        inner.connectivity.set_lastwill_message(lastwill);

        let router = Arc::downgrade(&inner);
        inner
            .connectivity
            .set_inbound_message_listener(Box::new(move |message| {
                if let Some(inner) = router.upgrade() {
                    inner.route_inbound_message(&message);
                }
            }));

        if let Some(handler) = inner.firmware_handler.as_ref() {
            handler.attach(FirmwareUpdateCallback {
                inner: Arc::downgrade(&inner),
            });
        }

        Ok(Wolk { inner })
    }
}

struct WolkInner {
    device_status_provider: Box<dyn DeviceStatusProvider>,
    actuation_handler: Option<Box<dyn ActuationHandler>>,
    actuator_status_provider: Option<Box<dyn ActuatorStatusProvider>>,
    configuration_handler: Option<Box<dyn ConfigurationHandler>>,
    configuration_provider: Option<Box<dyn ConfigurationProvider>>,
    firmware_handler: Option<Box<dyn FirmwareHandler>>,
    data_protocol: Box<dyn DataProtocol>,
    status_protocol: Box<dyn StatusProtocol>,
    registration_protocol: Box<dyn RegistrationProtocol>,
    firmware_update_protocol: Box<dyn FirmwareUpdateProtocol>,
    queue: Box<dyn OutboundMessageQueue>,
    connectivity: Box<dyn ConnectivityService>,
    devices: Mutex<Vec<Device>>,
    /// Keys with a firmware installation in flight.
    installing: Mutex<HashSet<String>>,
}

impl WolkInner {
    fn add_device(&self, device: Device) -> Result<(), GatewayError> {
        let keys = {
            let mut devices = self.devices.lock();
            if devices.iter().any(|existing| existing.key == device.key) {
                warn!(key = %device.key, "device key already in use, ignoring");
                return Ok(());
            }
            if device.has_actuators()
                && (self.actuation_handler.is_none() || self.actuator_status_provider.is_none())
            {
                error!(
                    key = %device.key,
                    "refusing device: it declares actuators but no actuation handler \
                     and actuator status provider were provided"
                );
                return Ok(());
            }
            if device.has_configurations()
                && (self.configuration_handler.is_none() || self.configuration_provider.is_none())
            {
                error!(
                    key = %device.key,
                    "refusing device: it declares configuration options but no \
                     configuration handler and provider were provided"
                );
                return Ok(());
            }
            if device.supports_firmware_update() && self.firmware_handler.is_none() {
                error!(
                    key = %device.key,
                    "refusing device: it declares firmware update support but no \
                     firmware handler was provided"
                );
                return Ok(());
            }
            devices.push(device.clone());
            devices.iter().map(|d| d.key.clone()).collect::<Vec<_>>()
        };

        let mut topics = self.data_protocol.inbound_topics_for_device(&device.key);
        topics.extend(
            self.registration_protocol
                .inbound_topics_for_device(&device.key),
        );
        topics.extend(self.status_protocol.inbound_topics_for_device(&device.key));
        topics.extend(
            self.firmware_update_protocol
                .inbound_topics_for_device(&device.key),
        );
        self.connectivity.add_subscription_topics(topics);

        let lastwill = self.status_protocol.make_last_will_message(&keys)?;
        self.connectivity.set_lastwill_message(lastwill);

        if self.connectivity.is_connected() {
            self.connectivity.reconnect()?;
        }

        info!(key = %device.key, name = %device.name, "device added");
        let request = DeviceRegistrationRequest::from(&device);
        let message = self
            .registration_protocol
            .make_registration_request_message(&request)?;
        self.publish_or_store(message)
    }

    fn remove_device(&self, device_key: &str) -> Result<(), GatewayError> {
        let keys = {
            let mut devices = self.devices.lock();
            let before = devices.len();
            devices.retain(|device| device.key != device_key);
            if devices.len() == before {
                debug!(key = %device_key, "device not present, nothing to remove");
                return Ok(());
            }
            devices.iter().map(|d| d.key.clone()).collect::<Vec<_>>()
        };

        self.connectivity.remove_topics_for_device(device_key);
        let lastwill = self.status_protocol.make_last_will_message(&keys)?;
        self.connectivity.set_lastwill_message(lastwill);

        if self.connectivity.is_connected() {
            self.connectivity.reconnect()?;
        }
        info!(key = %device_key, "device removed");
        Ok(())
    }

    fn connect(&self) -> Result<(), GatewayError> {
        if self.connectivity.is_connected() {
            return Ok(());
        }
        self.connectivity.connect()?;

        let devices: Vec<Device> = self.devices.lock().clone();
        for device in &devices {
            self.publish_device_status(&device.key)?;
            for reference in device.actuator_references() {
                self.publish_actuator_status(&device.key, reference)?;
            }
            if device.has_configurations() {
                self.publish_configuration(&device.key)?;
            }
            if device.supports_firmware_update() {
                self.publish_firmware_version(&device.key)?;
            }
        }
        Ok(())
    }

    fn publish_actuator_status(
        &self,
        device_key: &str,
        reference: &str,
    ) -> Result<(), GatewayError> {
        let provider = self.actuator_status_provider.as_ref().ok_or_else(|| {
            GatewayError::Configuration(
                "unable to publish actuator status: no actuator status provider was provided"
                    .into(),
            )
        })?;
        let (state, value) = provider.actuator_status(device_key, reference);
        let status = ActuatorStatus::new(reference, state, value);
        let message = self
            .data_protocol
            .make_actuator_status_message(device_key, &status)?;
        self.publish_or_store(message)
    }

    fn publish_configuration(&self, device_key: &str) -> Result<(), GatewayError> {
        let provider = self.configuration_provider.as_ref().ok_or_else(|| {
            GatewayError::Configuration(
                "unable to publish configuration: no configuration provider was provided".into(),
            )
        })?;
        let configuration = provider.configuration(device_key);
        let message = self
            .data_protocol
            .make_configuration_message(device_key, &configuration)?;
        self.publish_or_store(message)
    }

    fn publish_device_status(&self, device_key: &str) -> Result<(), GatewayError> {
        let status = self.device_status_provider.device_status(device_key);
        let message = self
            .status_protocol
            .make_device_status_update_message(device_key, status)?;
        self.publish_or_store(message)
    }

    fn publish_firmware_version(&self, device_key: &str) -> Result<(), GatewayError> {
        let handler = self.firmware_handler.as_ref().ok_or_else(|| {
            GatewayError::Configuration(
                "unable to publish firmware version: no firmware handler was provided".into(),
            )
        })?;
        let version = handler.firmware_version(device_key);
        let message = self
            .firmware_update_protocol
            .make_version_message(device_key, &version)?;
        self.publish_or_store(message)
    }

    fn publish_stored(&self, device_key: Option<&str>) {
        let pending = self.queue.messages_for_device(device_key.unwrap_or(""));
        if pending.is_empty() {
            debug!("no stored messages to publish");
            return;
        }
        for message in pending {
            if !self.connectivity.publish(&message) {
                error!(
                    topic = %message.topic,
                    "failed to publish stored message, leaving it in storage"
                );
                return;
            }
            self.queue.remove(&message);
            metrics::counter!("outbound_messages_published_total").increment(1);
        }
    }

    /// Publish when connected, fall back to storage; error only when both
    /// paths fail.
    fn publish_or_store(&self, message: Message) -> Result<(), GatewayError> {
        if self.connectivity.is_connected() {
            if self.connectivity.publish(&message) {
                metrics::counter!("outbound_messages_published_total").increment(1);
                return Ok(());
            }
            warn!(topic = %message.topic, "publish failed, storing message");
        }
        self.store(message)
    }

    fn store(&self, message: Message) -> Result<(), GatewayError> {
        let topic = message.topic.clone();
        if self.queue.put(message) {
            metrics::counter!("outbound_messages_stored_total").increment(1);
            Ok(())
        } else {
            Err(GatewayError::MessageNotStored(topic))
        }
    }

    fn route_inbound_message(&self, message: &Message) {
        debug!(topic = %message.topic, "routing inbound message");
        metrics::counter!("inbound_messages_total").increment(1);
        if self.data_protocol.is_actuator_set_message(message)
            || self.data_protocol.is_actuator_get_message(message)
        {
            self.handle_actuator_command(message);
        } else if self.data_protocol.is_configuration_set_message(message)
            || self.data_protocol.is_configuration_get_message(message)
        {
            self.handle_configuration_command(message);
        } else if self
            .registration_protocol
            .is_registration_response_message(message)
        {
            self.handle_registration_response(message);
        } else if self
            .status_protocol
            .is_device_status_request_message(message)
        {
            self.handle_device_status_request(message);
        } else if self
            .firmware_update_protocol
            .is_firmware_install_message(message)
        {
            self.handle_firmware_install(message);
        } else if self
            .firmware_update_protocol
            .is_firmware_abort_message(message)
        {
            self.handle_firmware_abort(message);
        } else {
            warn!(topic = %message.topic, "message on unexpected topic");
        }
    }

    fn handle_actuator_command(&self, message: &Message) {
        let Some(device_key) = self.data_protocol.extract_device_key_from_message(message) else {
            warn!(topic = %message.topic, "no device key in actuator command");
            return;
        };
        let command = match self.data_protocol.parse_actuator_command(message) {
            Ok(command) => command,
            Err(err) => {
                error!(topic = %message.topic, error = %err, "malformed actuator command");
                return;
            }
        };
        if self.actuation_handler.is_none() || self.actuator_status_provider.is_none() {
            warn!(
                key = %device_key,
                "actuator command received but no actuation callbacks were provided"
            );
            return;
        }
        let reference = match command {
            ActuatorCommand::Set { reference, value } => {
                if let Some(handler) = self.actuation_handler.as_ref() {
                    handler.handle_actuation(&device_key, &reference, &value);
                }
                reference
            }
            ActuatorCommand::Get { reference } => reference,
        };
        if let Err(err) = self.publish_actuator_status(&device_key, &reference) {
            error!(
                key = %device_key,
                reference = %reference,
                error = %err,
                "failed to publish actuator status"
            );
        }
    }

    fn handle_configuration_command(&self, message: &Message) {
        let Some(device_key) = self.data_protocol.extract_device_key_from_message(message) else {
            warn!(topic = %message.topic, "no device key in configuration command");
            return;
        };
        let command = match self.data_protocol.parse_configuration_command(message) {
            Ok(command) => command,
            Err(err) => {
                error!(topic = %message.topic, error = %err, "malformed configuration command");
                return;
            }
        };
        if self.configuration_handler.is_none() || self.configuration_provider.is_none() {
            warn!(
                key = %device_key,
                "configuration command received but no configuration callbacks were provided"
            );
            return;
        }
        if let ConfigurationCommand::Set(values) = command {
            if let Some(handler) = self.configuration_handler.as_ref() {
                handler.configure(&device_key, &values);
            }
        }
        if let Err(err) = self.publish_configuration(&device_key) {
            error!(key = %device_key, error = %err, "failed to publish configuration");
        }
    }

    fn handle_registration_response(&self, message: &Message) {
        let Some(device_key) = self
            .registration_protocol
            .extract_device_key_from_message(message)
        else {
            warn!(topic = %message.topic, "no device key in registration response");
            return;
        };
        let response = match self.registration_protocol.parse_registration_response(message) {
            Ok(response) => response,
            Err(err) => {
                error!(topic = %message.topic, error = %err, "malformed registration response");
                return;
            }
        };
        if !response.result.is_ok() {
            error!(
                key = %response.key,
                result = response.result.as_str(),
                description = %response.description,
                "device registration failed"
            );
            return;
        }
        info!(key = %response.key, "device registered");

        let device = self
            .devices
            .lock()
            .iter()
            .find(|device| device.key == device_key)
            .cloned();
        let Some(device) = device else {
            warn!(key = %device_key, "registration response for unknown device");
            return;
        };

        for reference in device.actuator_references() {
            if let Err(err) = self.publish_actuator_status(&device.key, reference) {
                error!(
                    key = %device.key,
                    reference = %reference,
                    error = %err,
                    "failed to publish actuator status"
                );
            }
        }
        if device.has_configurations() {
            if let Err(err) = self.publish_configuration(&device.key) {
                error!(key = %device.key, error = %err, "failed to publish configuration");
            }
        }
        if device.supports_firmware_update() {
            if let Err(err) = self.publish_firmware_version(&device.key) {
                error!(key = %device.key, error = %err, "failed to publish firmware version");
            }
        }
    }

    fn handle_device_status_request(&self, message: &Message) {
        let Some(device_key) = self.status_protocol.extract_device_key_from_message(message)
        else {
            warn!(topic = %message.topic, "no device key in status request");
            return;
        };
        let status = self.device_status_provider.device_status(&device_key);
        match self
            .status_protocol
            .make_device_status_response_message(&device_key, status)
        {
            Ok(response) => {
                if let Err(err) = self.publish_or_store(response) {
                    error!(key = %device_key, error = %err, "failed to publish device status");
                }
            }
            Err(err) => {
                error!(key = %device_key, error = %err, "failed to encode device status");
            }
        }
    }

    fn handle_firmware_install(&self, message: &Message) {
        let Some(device_key) = self
            .firmware_update_protocol
            .extract_device_key_from_message(message)
        else {
            warn!(topic = %message.topic, "no device key in firmware install command");
            return;
        };
        let Some(handler) = self.firmware_handler.as_ref() else {
            warn!(
                key = %device_key,
                "firmware install command received but no firmware handler was provided"
            );
            return;
        };
        let file_path = match self.firmware_update_protocol.parse_firmware_file_path(message) {
            Ok(path) => path,
            Err(err) => {
                error!(topic = %message.topic, error = %err, "malformed firmware install command");
                return;
            }
        };

        info!(key = %device_key, file = %file_path, "firmware installation requested");
        self.installing.lock().insert(device_key.clone());
        // The INSTALLATION status must reach the platform before the
        // installer has a chance to report an outcome.
        if let Err(err) =
            self.publish_firmware_status(&device_key, &FirmwareUpdateStatus::Installation)
        {
            error!(key = %device_key, error = %err, "failed to publish installation status");
        }
        handler.install_firmware(&device_key, &file_path);
    }

    fn handle_firmware_abort(&self, message: &Message) {
        let Some(device_key) = self
            .firmware_update_protocol
            .extract_device_key_from_message(message)
        else {
            warn!(topic = %message.topic, "no device key in firmware abort command");
            return;
        };
        let Some(handler) = self.firmware_handler.as_ref() else {
            warn!(
                key = %device_key,
                "firmware abort command received but no firmware handler was provided"
            );
            return;
        };
        if !self.installing.lock().contains(&device_key) {
            debug!(key = %device_key, "no firmware installation in progress, ignoring abort");
            return;
        }
        if handler.abort_installation(&device_key) {
            self.installing.lock().remove(&device_key);
            if let Err(err) =
                self.publish_firmware_status(&device_key, &FirmwareUpdateStatus::Aborted)
            {
                error!(key = %device_key, error = %err, "failed to publish aborted status");
            }
        } else {
            debug!(key = %device_key, "firmware abort not honored by installer");
        }
    }

    fn on_install_success(&self, device_key: &str) {
        info!(key = %device_key, "firmware installation completed");
        self.installing.lock().remove(device_key);
        if let Err(err) =
            self.publish_firmware_status(device_key, &FirmwareUpdateStatus::Completed)
        {
            error!(key = %device_key, error = %err, "failed to publish completed status");
        }
        if let Err(err) = self.publish_firmware_version(device_key) {
            error!(key = %device_key, error = %err, "failed to publish firmware version");
        }
    }

    fn on_install_fail(&self, device_key: &str, status: FirmwareUpdateStatus) {
        warn!(key = %device_key, status = status.state_str(), "firmware installation failed");
        self.installing.lock().remove(device_key);
        if let Err(err) = self.publish_firmware_status(device_key, &status) {
            error!(key = %device_key, error = %err, "failed to publish firmware status");
        }
    }

    fn publish_firmware_status(
        &self,
        device_key: &str,
        status: &FirmwareUpdateStatus,
    ) -> Result<(), GatewayError> {
        let message = self
            .firmware_update_protocol
            .make_update_status_message(device_key, status)?;
        self.publish_or_store(message)
    }
}
