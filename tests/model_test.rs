//! Value model and template validation tests.

use wolk_gateway_module::{
    ActuatorTemplate, ConfigurationTemplate, DataType, DeviceStatus, FirmwareUpdateErrorCode,
    FirmwareUpdateStatus, GatewayError, ReadingValue, SensorTemplate,
};

#[test]
fn test_configuration_template_requires_labels_for_multi_value() {
    let result = ConfigurationTemplate::multi_value("Interval", "ref", DataType::Numeric, 2, "");
    assert!(matches!(result, Err(GatewayError::Configuration(_))));
}

#[test]
fn test_configuration_template_rejects_size_out_of_range() {
    let result =
        ConfigurationTemplate::multi_value("Interval", "ref", DataType::Numeric, 4, "a,b,c,d");
    assert!(matches!(result, Err(GatewayError::Configuration(_))));

    let result =
        ConfigurationTemplate::multi_value("Interval", "ref", DataType::Numeric, 1, "only");
    assert!(matches!(result, Err(GatewayError::Configuration(_))));
}

#[test]
fn test_single_value_configuration_has_no_labels() {
    let template = ConfigurationTemplate::new("Level", "ref", DataType::String);
    assert_eq!(template.size(), 1);
    assert!(template.labels().is_none());
}

#[test]
fn test_multi_value_configuration_keeps_labels() {
    let template =
        ConfigurationTemplate::multi_value("Interval", "ref", DataType::Numeric, 3, "s,m,h")
            .expect("valid configuration template");
    assert_eq!(template.size(), 3);
    assert_eq!(template.labels(), Some("s,m,h"));
}

#[test]
fn test_custom_reading_type_requires_name_and_unit() {
    assert!(SensorTemplate::with_custom_reading_type("S", "ref", "", "W").is_err());
    assert!(SensorTemplate::with_custom_reading_type("S", "ref", "POWER", "").is_err());
    assert!(ActuatorTemplate::with_custom_reading_type("A", "ref", "", "").is_err());

    let sensor = SensorTemplate::with_custom_reading_type("S", "ref", "POWER", "W")
        .expect("valid custom reading type");
    assert_eq!(sensor.reading_type().name(), "POWER");
    assert_eq!(sensor.reading_type().symbol(), "W");
}

#[test]
fn test_generic_actuator_reading_types() {
    let numeric = ActuatorTemplate::with_data_type("Slider", "SL", DataType::Numeric);
    assert_eq!(numeric.reading_type().name(), "COUNT(ACTUATOR)");
    assert_eq!(numeric.reading_type().symbol(), "count");

    let boolean = ActuatorTemplate::with_data_type("Switch", "SW", DataType::Boolean);
    assert_eq!(boolean.reading_type().name(), "SWITCH(ACTUATOR)");
    assert_eq!(boolean.reading_type().symbol(), "");
}

#[test]
fn test_reading_value_wire_representations() {
    assert_eq!(ReadingValue::from(true).to_wire(), "true");
    assert_eq!(ReadingValue::from(true).to_display(), "True");
    assert_eq!(ReadingValue::from(8.13).to_wire(), "8.13");
    assert_eq!(ReadingValue::from(("a", "b", "c")).to_wire(), "a,b,c");
    assert_eq!(ReadingValue::from((1i64, 2)).to_display(), "1,2");
}

#[test]
fn test_device_status_wire_codes() {
    assert_eq!(DeviceStatus::Connected.wire_code(), 0);
    assert_eq!(DeviceStatus::Offline.wire_code(), 1);
    assert_eq!(DeviceStatus::Sleep.wire_code(), 2);
    assert_eq!(DeviceStatus::Service.wire_code(), 3);
    assert_eq!(DeviceStatus::from_wire_code(1), Some(DeviceStatus::Offline));
    assert_eq!(DeviceStatus::from_wire_code(9), None);
}

#[test]
fn test_firmware_error_code_only_on_error_state() {
    assert_eq!(FirmwareUpdateStatus::Installation.error_code(), None);
    assert_eq!(FirmwareUpdateStatus::Completed.error_code(), None);
    assert_eq!(FirmwareUpdateStatus::Aborted.error_code(), None);
    assert_eq!(
        FirmwareUpdateStatus::Error(FirmwareUpdateErrorCode::FileNotPresent).error_code(),
        Some(FirmwareUpdateErrorCode::FileNotPresent)
    );
}
