mod config;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use parking_lot::Mutex;
use tracing::info;

use wolk_gateway_module::{
    ActuatorState, ActuatorTemplate, AlarmTemplate, ConfigurationTemplate, DataType, Device,
    DeviceStatus, DeviceTemplate, ReadingTypeMeasurementUnit, ReadingTypeName, ReadingValue,
    ScalarValue, SensorTemplate, Wolk,
};

use crate::config::ModuleConfig;

/// Demo module: registers one simulated device and periodically publishes
/// readings.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file with host, port and module_name
    #[clap(long, env, default_value = "configuration.json")]
    config: PathBuf,
    #[clap(long, env, default_value = "info")]
    log_level: String,
    /// Write logs to this file instead of stderr
    #[clap(long, env)]
    log_file: Option<PathBuf>,
}

const DEVICE_KEY: &str = "module_demo_device";
const PUBLISH_PERIOD: Duration = Duration::from_secs(5);

fn main() -> Result<()> {
    let cli = Cli::parse();
    wolk_gateway_module::logging_config(&cli.log_level, cli.log_file.as_deref())?;

    let config = ModuleConfig::from_file(&cli.config)?;
    info!(host = %config.host, port = config.port, "configuration loaded");

    // Simulated hardware state shared between the callbacks.
    let switch = Arc::new(Mutex::new(false));
    let configuration = Arc::new(Mutex::new(HashMap::from([
        (
            "configuration_1".to_owned(),
            ReadingValue::from("default_value"),
        ),
        ("configuration_2".to_owned(), ReadingValue::from((5i64, 12, 3))),
    ])));

    let template = DeviceTemplate {
        sensors: vec![SensorTemplate::with_reading_type(
            "Temperature",
            "T",
            ReadingTypeName::Temperature,
            ReadingTypeMeasurementUnit::Celsius,
        )
        .with_minimum(-20.0)
        .with_maximum(85.0)
        .with_description("Temperature sensor with range -20 to 85 Celsius")],
        actuators: vec![ActuatorTemplate::with_data_type("Switch", "SW", DataType::Boolean)
            .with_description("Light switch")],
        alarms: vec![AlarmTemplate::new("High Temperature", "HT")
            .with_description("Notify about high temperature detected")],
        configurations: vec![
            ConfigurationTemplate::new("Configuration_1", "configuration_1", DataType::String)
                .with_default_value("default_value"),
            ConfigurationTemplate::multi_value(
                "Configuration_2",
                "configuration_2",
                DataType::Numeric,
                3,
                "seconds,minutes,hours",
            )?,
        ],
        ..DeviceTemplate::default()
    };
    let device = Device::new("Demo device", DEVICE_KEY, template);

    let actuation_switch = Arc::clone(&switch);
    let actuation_handler = move |key: &str, reference: &str, value: &ReadingValue| {
        info!(%key, %reference, %value, "actuation received");
        if let ReadingValue::Scalar(ScalarValue::Bool(state)) = value {
            *actuation_switch.lock() = *state;
        }
    };
    let status_switch = Arc::clone(&switch);
    let actuator_status_provider = move |_key: &str, _reference: &str| {
        (ActuatorState::Ready, ReadingValue::from(*status_switch.lock()))
    };
    let handler_configuration = Arc::clone(&configuration);
    let configuration_handler = move |key: &str, values: &HashMap<String, ReadingValue>| {
        info!(%key, "configuration received");
        let mut current = handler_configuration.lock();
        for (reference, value) in values {
            current.insert(reference.clone(), value.clone());
        }
    };
    let provider_configuration = Arc::clone(&configuration);
    let configuration_provider = move |_key: &str| provider_configuration.lock().clone();

    let wolk = Wolk::builder(
        config.host,
        config.port,
        config.module_name,
        |_key: &str| DeviceStatus::Connected,
    )
    .actuation_handler(actuation_handler)
    .actuator_status_provider(actuator_status_provider)
    .configuration_handler(configuration_handler)
    .configuration_provider(configuration_provider)
    .build()?;

    wolk.add_device(device)?;
    wolk.connect()?;
    info!("connected, publishing readings every {PUBLISH_PERIOD:?}");

    let mut tick: i64 = 0;
    loop {
        let temperature = 20 + tick % 10;
        wolk.add_sensor_reading(DEVICE_KEY, "T", temperature, None)?;
        wolk.add_alarm(DEVICE_KEY, "HT", temperature > 27, None)?;
        wolk.publish(None);
        tick += 1;
        thread::sleep(PUBLISH_PERIOD);
    }
}
