//! Shared test utilities: a recording connectivity double, a scripted
//! firmware installer and device fixtures.

// Allow dead code since not all test files use all helpers
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use wolk_gateway_module::connectivity::InboundMessageListener;
use wolk_gateway_module::{
    ActuatorTemplate, AlarmTemplate, ConfigurationTemplate, ConnectivityService, DataType, Device,
    DeviceStatus, DeviceTemplate, FirmwareHandler, FirmwareUpdateCallback, Message,
    OutboundMessageDeque, ReadingTypeMeasurementUnit, ReadingTypeName, SensorTemplate,
    TransportError, Wolk, WolkBuilder,
};

/// Ordered record of cross-component events, used to assert sequencing.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

/// Connectivity double that records everything the module does with it and
/// lets tests inject inbound traffic.
///
/// Publishes are accepted (and recorded) regardless of the connected flag
/// unless `refuse_publish` is set, so queue-drain behavior can be tested in
/// isolation from connection state.
#[derive(Default)]
pub struct TestTransport {
    connected: AtomicBool,
    refuse_publish: AtomicBool,
    published: Mutex<Vec<Message>>,
    subscriptions: Mutex<Vec<String>>,
    lastwill: Mutex<Option<Message>>,
    listener: Mutex<Option<InboundMessageListener>>,
    reconnects: AtomicUsize,
    events: Mutex<Option<EventLog>>,
}

impl TestTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_event_log(log: EventLog) -> Arc<Self> {
        let transport = Self::default();
        *transport.events.lock() = Some(log);
        Arc::new(transport)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn set_refuse_publish(&self, refuse: bool) {
        self.refuse_publish.store(refuse, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<Message> {
        self.published.lock().clone()
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().clone()
    }

    pub fn lastwill(&self) -> Option<Message> {
        self.lastwill.lock().clone()
    }

    pub fn reconnect_count(&self) -> usize {
        self.reconnects.load(Ordering::SeqCst)
    }

    /// Delivers a message as if it arrived from the broker.
    pub fn inject(&self, message: Message) {
        let listener = self.listener.lock();
        let listener = listener.as_ref().expect("inbound listener not set");
        listener(message);
    }
}

impl ConnectivityService for TestTransport {
    fn set_inbound_message_listener(&self, listener: InboundMessageListener) {
        *self.listener.lock() = Some(listener);
    }

    fn set_lastwill_message(&self, message: Message) {
        *self.lastwill.lock() = Some(message);
    }

    fn add_subscription_topics(&self, topics: Vec<String>) {
        let mut stored = self.subscriptions.lock();
        for topic in topics {
            if !stored.contains(&topic) {
                stored.push(topic);
            }
        }
    }

    fn remove_topics_for_device(&self, device_key: &str) {
        self.subscriptions
            .lock()
            .retain(|topic| !topic.contains(device_key));
    }

    fn connect(&self) -> Result<(), TransportError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn reconnect(&self) -> Result<(), TransportError> {
        self.reconnects.fetch_add(1, Ordering::SeqCst);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn publish(&self, message: &Message) -> bool {
        if self.refuse_publish.load(Ordering::SeqCst) {
            return false;
        }
        if let Some(events) = self.events.lock().as_ref() {
            events.record(format!("publish {}", message.topic));
        }
        self.published.lock().push(message.clone());
        true
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Firmware handler double: records install requests and exposes the
/// callback the module attached so tests can script outcomes.
pub struct ScriptedInstaller {
    callback: Mutex<Option<FirmwareUpdateCallback>>,
    installs: Mutex<Vec<(String, String)>>,
    abort_honored: AtomicBool,
    version: Mutex<String>,
    events: Mutex<Option<EventLog>>,
}

impl ScriptedInstaller {
    pub fn new(version: &str) -> Arc<Self> {
        Arc::new(Self {
            callback: Mutex::new(None),
            installs: Mutex::new(Vec::new()),
            abort_honored: AtomicBool::new(false),
            version: Mutex::new(version.to_owned()),
            events: Mutex::new(None),
        })
    }

    pub fn with_event_log(version: &str, log: EventLog) -> Arc<Self> {
        let installer = Self::new(version);
        *installer.events.lock() = Some(log);
        installer
    }

    pub fn set_abort_honored(&self, honored: bool) {
        self.abort_honored.store(honored, Ordering::SeqCst);
    }

    pub fn set_version(&self, version: &str) {
        *self.version.lock() = version.to_owned();
    }

    pub fn installs(&self) -> Vec<(String, String)> {
        self.installs.lock().clone()
    }

    pub fn callback(&self) -> FirmwareUpdateCallback {
        self.callback.lock().clone().expect("callback not attached")
    }
}

impl FirmwareHandler for ScriptedInstaller {
    fn attach(&self, callback: FirmwareUpdateCallback) {
        *self.callback.lock() = Some(callback);
    }

    fn install_firmware(&self, device_key: &str, firmware_file_path: &str) {
        if let Some(events) = self.events.lock().as_ref() {
            events.record(format!("install {device_key}"));
        }
        self.installs
            .lock()
            .push((device_key.to_owned(), firmware_file_path.to_owned()));
    }

    fn abort_installation(&self, _device_key: &str) -> bool {
        self.abort_honored.load(Ordering::SeqCst)
    }

    fn firmware_version(&self, _device_key: &str) -> String {
        self.version.lock().clone()
    }
}

/// Device with a single temperature sensor.
pub fn sensor_only_device(key: &str) -> Device {
    let template = DeviceTemplate {
        sensors: vec![SensorTemplate::with_reading_type(
            "Temperature",
            "T",
            ReadingTypeName::Temperature,
            ReadingTypeMeasurementUnit::Celsius,
        )],
        ..DeviceTemplate::default()
    };
    Device::new("Test device", key, template)
}

/// Device with a sensor, a switch actuator, an alarm and two configuration
/// options.
pub fn full_device(key: &str) -> Device {
    let template = DeviceTemplate {
        sensors: vec![SensorTemplate::with_reading_type(
            "Temperature",
            "T",
            ReadingTypeName::Temperature,
            ReadingTypeMeasurementUnit::Celsius,
        )],
        actuators: vec![ActuatorTemplate::with_data_type(
            "Switch",
            "SW",
            DataType::Boolean,
        )],
        alarms: vec![AlarmTemplate::new("High Humidity", "HH")],
        configurations: vec![
            ConfigurationTemplate::new("Configuration_1", "configuration_1", DataType::String),
            ConfigurationTemplate::multi_value(
                "Configuration_2",
                "configuration_2",
                DataType::Numeric,
                3,
                "seconds,minutes,hours",
            )
            .expect("valid configuration template"),
        ],
        ..DeviceTemplate::default()
    };
    Device::new("Test device", key, template)
}

/// Sensor-only device that also supports firmware updates.
pub fn firmware_device(key: &str) -> Device {
    let mut device = sensor_only_device(key);
    device.template.supports_firmware_update = true;
    device.template.firmware_update_type = "DFU".to_owned();
    device
}

/// Builder preconfigured with a connected status provider and the given
/// transport double.
pub fn module_builder(transport: Arc<TestTransport>) -> WolkBuilder {
    Wolk::builder("localhost", 1883, "test_module", |_: &str| {
        DeviceStatus::Connected
    })
    .connectivity_service(transport)
}

/// Module with only the mandatory status provider, backed by the given
/// transport and a fresh shared queue.
pub fn basic_module(transport: Arc<TestTransport>) -> (Wolk, Arc<OutboundMessageDeque>) {
    let queue = Arc::new(OutboundMessageDeque::new());
    let wolk = module_builder(transport)
        .outbound_message_queue(Arc::clone(&queue))
        .build()
        .expect("build module");
    (wolk, queue)
}

/// Initialize tracing for tests (only once).
///
/// Defaults to `warn` level to reduce noise. Use `RUST_LOG=debug` for verbose output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string()))
        .with_test_writer()
        .try_init();
}
