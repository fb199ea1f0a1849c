//! End-to-end module tests against the recording transport double.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use wolk_gateway_module::protocol::{
    DataProtocol, FirmwareUpdateProtocol, JsonDataProtocol, JsonFirmwareUpdateProtocol,
    JsonRegistrationProtocol, JsonStatusProtocol, RegistrationProtocol, StatusProtocol,
};
use wolk_gateway_module::{
    ActuatorState, DeviceStatus, FirmwareUpdateErrorCode, FirmwareUpdateStatus, GatewayError,
    Message, OutboundMessageDeque, OutboundMessageQueue, ReadingValue, ScalarValue, Wolk,
};

use common::{
    basic_module, firmware_device, full_device, init_tracing, module_builder, sensor_only_device,
    EventLog, ScriptedInstaller, TestTransport,
};

#[test]
fn test_add_device_stores_registration_request() {
    init_tracing();
    let transport = TestTransport::new();
    let (wolk, queue) = basic_module(Arc::clone(&transport));

    wolk.add_device(sensor_only_device("module_device_1"))
        .expect("add device");

    assert_eq!(queue.size(), 1);
    let message = queue.get().expect("stored registration request");
    assert_eq!(message.topic, "d2p/register_subdevice_request/");

    let payload: Value = serde_json::from_slice(&message.payload).expect("valid json");
    assert_eq!(payload["deviceKey"], "module_device_1");
    assert_eq!(payload["defaultBinding"], true);
    assert_eq!(payload["sensors"][0]["reference"], "T");
    assert_eq!(payload["sensors"][0]["unit"]["symbol"], "℃");
    assert_eq!(
        payload["firmwareUpdateParameters"]["supportsFirmwareUpdate"],
        false
    );
}

#[test]
fn test_stored_reading_is_drained_on_publish() {
    init_tracing();
    let transport = TestTransport::new();
    let (wolk, queue) = basic_module(Arc::clone(&transport));
    transport.set_connected(true);

    wolk.add_sensor_reading("module_device_1", "T", 23, Some(1_577_836_800_000))
        .expect("store reading");

    // Readings are never published synchronously.
    assert!(transport.published().is_empty());
    assert_eq!(queue.size(), 1);

    wolk.publish(None);

    let published = transport.published();
    assert_eq!(published.len(), 1);
    assert_eq!(
        published[0].topic,
        "d2p/sensor_reading/d/module_device_1/r/T"
    );
    assert_eq!(
        published[0].payload_str(),
        r#"{"data":"23","utc":1577836800000}"#
    );
    assert_eq!(queue.size(), 0);
}

#[test]
fn test_actuator_set_invokes_handler_then_publishes_status() {
    init_tracing();
    let transport = TestTransport::new();
    let actuations: Arc<Mutex<Vec<(String, String, ReadingValue)>>> =
        Arc::new(Mutex::new(Vec::new()));
    let switch = Arc::new(Mutex::new(false));

    let recorded = Arc::clone(&actuations);
    let handler_switch = Arc::clone(&switch);
    let provider_switch = Arc::clone(&switch);
    let wolk = module_builder(Arc::clone(&transport))
        .actuation_handler(move |key: &str, reference: &str, value: &ReadingValue| {
            recorded
                .lock()
                .push((key.to_owned(), reference.to_owned(), value.clone()));
            if let ReadingValue::Scalar(ScalarValue::Bool(state)) = value {
                *handler_switch.lock() = *state;
            }
        })
        .actuator_status_provider(move |_key: &str, _reference: &str| {
            (
                ActuatorState::Ready,
                ReadingValue::from(*provider_switch.lock()),
            )
        })
        .build()
        .expect("build module");
    transport.set_connected(true);

    transport.inject(Message::new(
        "p2d/actuator_set/d/module_device_1/r/SW",
        br#"{"value":true}"#.to_vec(),
    ));

    assert_eq!(
        actuations.lock().clone(),
        vec![(
            "module_device_1".to_owned(),
            "SW".to_owned(),
            ReadingValue::from(true),
        )]
    );
    let published = transport.published();
    assert_eq!(published.len(), 1);
    assert_eq!(
        published[0].topic,
        "d2p/actuator_status/d/module_device_1/r/SW"
    );
    assert_eq!(
        published[0].payload_str(),
        r#"{"status":"READY","value":"True"}"#
    );
}

#[test]
fn test_actuator_get_publishes_status_without_actuation() {
    let transport = TestTransport::new();
    let wolk = module_builder(Arc::clone(&transport))
        .actuation_handler(|_: &str, _: &str, _: &ReadingValue| {
            panic!("actuation handler must not run for a get command")
        })
        .actuator_status_provider(|_key: &str, _reference: &str| {
            (ActuatorState::Busy, ReadingValue::from(42i64))
        })
        .build()
        .expect("build module");
    transport.set_connected(true);

    transport.inject(Message::new(
        "p2d/actuator_get/d/module_device_1/r/SL",
        b"".to_vec(),
    ));

    let published = transport.published();
    assert_eq!(published.len(), 1);
    assert_eq!(
        published[0].payload_str(),
        r#"{"status":"BUSY","value":"42"}"#
    );
    drop(wolk);
}

#[test]
fn test_configuration_set_delivers_integer_tuple() {
    init_tracing();
    let transport = TestTransport::new();
    let configuration = Arc::new(Mutex::new(HashMap::from([(
        "configuration_2".to_owned(),
        ReadingValue::from((0i64, 0, 0)),
    )])));

    let handled = Arc::clone(&configuration);
    let provided = Arc::clone(&configuration);
    let wolk = module_builder(Arc::clone(&transport))
        .configuration_handler(move |_key: &str, values: &HashMap<String, ReadingValue>| {
            let mut current = handled.lock();
            for (reference, value) in values {
                current.insert(reference.clone(), value.clone());
            }
        })
        .configuration_provider(move |_key: &str| provided.lock().clone())
        .build()
        .expect("build module");
    transport.set_connected(true);

    transport.inject(Message::new(
        "p2d/configuration_set/d/module_device_1",
        br#"{"values":{"configuration_2":"5,12,3"}}"#.to_vec(),
    ));

    assert_eq!(
        configuration.lock()["configuration_2"],
        ReadingValue::from((5i64, 12, 3))
    );

    // The applied configuration is reported back immediately.
    let published = transport.published();
    assert_eq!(published.len(), 1);
    assert_eq!(
        published[0].topic,
        "d2p/configuration_get/d/module_device_1"
    );
    let payload: Value = serde_json::from_slice(&published[0].payload).expect("valid json");
    assert_eq!(payload["values"]["configuration_2"], "5,12,3");
    drop(wolk);
}

#[test]
fn test_firmware_install_publishes_installation_before_installer_runs() {
    init_tracing();
    let events = EventLog::default();
    let transport = TestTransport::with_event_log(events.clone());
    let installer = ScriptedInstaller::with_event_log("2.0.0", events.clone());

    let wolk = module_builder(Arc::clone(&transport))
        .firmware_handler(Arc::clone(&installer))
        .build()
        .expect("build module");
    transport.set_connected(true);

    transport.inject(Message::new(
        "p2d/firmware_update_install/d/module_device_1",
        br#"{"fileName":"/tmp/fw.bin"}"#.to_vec(),
    ));

    assert_eq!(
        installer.installs(),
        vec![("module_device_1".to_owned(), "/tmp/fw.bin".to_owned())]
    );
    assert_eq!(
        events.entries(),
        vec![
            "publish d2p/firmware_update_status/d/module_device_1".to_owned(),
            "install module_device_1".to_owned(),
        ]
    );
    assert_eq!(
        transport.published()[0].payload_str(),
        r#"{"status":"INSTALLATION"}"#
    );
    drop(wolk);
}

#[test]
fn test_install_success_publishes_completed_then_version() {
    init_tracing();
    let transport = TestTransport::new();
    let installer = ScriptedInstaller::new("2.0.0");

    let wolk = module_builder(Arc::clone(&transport))
        .firmware_handler(Arc::clone(&installer))
        .build()
        .expect("build module");
    transport.set_connected(true);

    transport.inject(Message::new(
        "p2d/firmware_update_install/d/module_device_1",
        br#"{"fileName":"/tmp/fw.bin"}"#.to_vec(),
    ));
    installer.callback().install_success("module_device_1");

    let published = transport.published();
    assert_eq!(published.len(), 3);
    assert_eq!(published[1].payload_str(), r#"{"status":"COMPLETED"}"#);
    assert_eq!(
        published[2].topic,
        "d2p/firmware_version_update/d/module_device_1"
    );
    assert_eq!(published[2].payload_str(), "2.0.0");
    drop(wolk);
}

#[test]
fn test_install_fail_publishes_status_verbatim() {
    let transport = TestTransport::new();
    let installer = ScriptedInstaller::new("2.0.0");

    let wolk = module_builder(Arc::clone(&transport))
        .firmware_handler(Arc::clone(&installer))
        .build()
        .expect("build module");
    transport.set_connected(true);

    transport.inject(Message::new(
        "p2d/firmware_update_install/d/module_device_1",
        br#"{"fileName":"/tmp/fw.bin"}"#.to_vec(),
    ));
    installer.callback().install_fail(
        "module_device_1",
        FirmwareUpdateStatus::Error(FirmwareUpdateErrorCode::InstallationFailed),
    );

    let published = transport.published();
    assert_eq!(published.len(), 2);
    assert_eq!(
        published[1].payload_str(),
        r#"{"status":"ERROR","error":3}"#
    );
    drop(wolk);
}

#[test]
fn test_abort_publishes_aborted_only_when_honored() {
    let transport = TestTransport::new();
    let installer = ScriptedInstaller::new("2.0.0");

    let wolk = module_builder(Arc::clone(&transport))
        .firmware_handler(Arc::clone(&installer))
        .build()
        .expect("build module");
    transport.set_connected(true);

    let install = Message::new(
        "p2d/firmware_update_install/d/module_device_1",
        br#"{"fileName":"/tmp/fw.bin"}"#.to_vec(),
    );
    let abort = Message::new("p2d/firmware_update_abort/d/module_device_1", b"".to_vec());

    // Abort without an installation in progress does nothing.
    transport.inject(abort.clone());
    assert!(transport.published().is_empty());

    transport.inject(install);
    // The installer refuses the abort: no status is sent.
    transport.inject(abort.clone());
    assert_eq!(transport.published().len(), 1);

    installer.set_abort_honored(true);
    transport.inject(abort);
    let published = transport.published();
    assert_eq!(published.len(), 2);
    assert_eq!(published[0].payload_str(), r#"{"status":"INSTALLATION"}"#);
    assert_eq!(published[1].payload_str(), r#"{"status":"ABORTED"}"#);
    drop(wolk);
}

#[test]
fn test_selective_drain_keeps_other_devices_stored() {
    init_tracing();
    let transport = TestTransport::new();
    let (wolk, queue) = basic_module(Arc::clone(&transport));
    transport.set_connected(false);

    wolk.add_sensor_reading("device_a", "T", 1, None).expect("store");
    wolk.add_sensor_reading("device_b", "T", 2, None).expect("store");
    wolk.add_sensor_reading("device_a", "H", 3, None).expect("store");

    wolk.publish(Some("device_a"));

    let published = transport.published();
    assert_eq!(
        published
            .iter()
            .map(|message| message.topic.as_str())
            .collect::<Vec<_>>(),
        vec![
            "d2p/sensor_reading/d/device_a/r/T",
            "d2p/sensor_reading/d/device_a/r/H",
        ]
    );
    assert_eq!(queue.size(), 1);
    let remaining = queue.get().expect("remaining message");
    assert!(remaining.topic.contains("device_b"));
}

#[test]
fn test_drain_stops_at_first_failure_and_keeps_message() {
    let transport = TestTransport::new();
    let (wolk, queue) = basic_module(Arc::clone(&transport));

    wolk.add_sensor_reading("device_a", "T", 1, None).expect("store");
    wolk.add_sensor_reading("device_a", "H", 2, None).expect("store");

    transport.set_refuse_publish(true);
    wolk.publish(None);
    assert_eq!(queue.size(), 2);

    transport.set_refuse_publish(false);
    wolk.publish(None);
    assert_eq!(queue.size(), 0);
    assert_eq!(transport.published().len(), 2);
}

#[test]
fn test_subscriptions_equal_union_of_protocol_topics() {
    let transport = TestTransport::new();
    let wolk = module_builder(Arc::clone(&transport))
        .actuation_handler(|_: &str, _: &str, _: &ReadingValue| {})
        .actuator_status_provider(|_: &str, _: &str| {
            (ActuatorState::Ready, ReadingValue::from(false))
        })
        .configuration_handler(|_: &str, _: &HashMap<String, ReadingValue>| {})
        .configuration_provider(|_: &str| HashMap::new())
        .build()
        .expect("build module");

    wolk.add_device(full_device("some_key")).expect("add device");

    let mut expected = JsonDataProtocol.inbound_topics_for_device("some_key");
    expected.extend(JsonRegistrationProtocol.inbound_topics_for_device("some_key"));
    expected.extend(JsonStatusProtocol.inbound_topics_for_device("some_key"));
    expected.extend(JsonFirmwareUpdateProtocol.inbound_topics_for_device("some_key"));
    assert_eq!(transport.subscriptions(), expected);
}

#[test]
fn test_last_will_tracks_registry() {
    let transport = TestTransport::new();
    let (wolk, _queue) = basic_module(Arc::clone(&transport));

    assert_eq!(
        transport.lastwill().expect("initial last will").payload_str(),
        "[]"
    );

    wolk.add_device(sensor_only_device("device_1")).expect("add");
    assert_eq!(
        transport.lastwill().expect("last will").payload_str(),
        r#"["device_1"]"#
    );

    wolk.add_device(sensor_only_device("device_2")).expect("add");
    assert_eq!(
        transport.lastwill().expect("last will").payload_str(),
        r#"["device_1","device_2"]"#
    );

    wolk.remove_device("device_1").expect("remove");
    assert_eq!(
        transport.lastwill().expect("last will").payload_str(),
        r#"["device_2"]"#
    );
    assert!(transport
        .subscriptions()
        .iter()
        .all(|topic| !topic.contains("device_1")));
}

#[test]
fn test_duplicate_device_key_is_ignored() {
    let transport = TestTransport::new();
    let (wolk, queue) = basic_module(Arc::clone(&transport));

    wolk.add_device(sensor_only_device("device_1")).expect("add");
    wolk.add_device(sensor_only_device("device_1")).expect("add");

    assert_eq!(wolk.devices().len(), 1);
    assert_eq!(queue.size(), 1);
}

#[test]
fn test_device_with_actuators_is_refused_without_callbacks() {
    let transport = TestTransport::new();
    let (wolk, queue) = basic_module(Arc::clone(&transport));

    wolk.add_device(full_device("device_1")).expect("refusal is a no-op");

    assert!(wolk.devices().is_empty());
    assert_eq!(queue.size(), 0);
    assert!(transport.subscriptions().is_empty());
}

#[test]
fn test_firmware_device_is_refused_without_handler() {
    let transport = TestTransport::new();
    let (wolk, _queue) = basic_module(Arc::clone(&transport));

    wolk.add_device(firmware_device("device_1")).expect("refusal is a no-op");

    assert!(wolk.devices().is_empty());
}

#[test]
fn test_builder_rejects_unpaired_actuation_callbacks() {
    let result = Wolk::builder("localhost", 1883, "module", |_: &str| DeviceStatus::Connected)
        .actuation_handler(|_: &str, _: &str, _: &ReadingValue| {})
        .build();
    assert!(matches!(result, Err(GatewayError::Configuration(_))));

    let result = Wolk::builder("localhost", 1883, "module", |_: &str| DeviceStatus::Connected)
        .configuration_provider(|_: &str| HashMap::new())
        .build();
    assert!(matches!(result, Err(GatewayError::Configuration(_))));
}

#[test]
fn test_publish_actuator_status_publishes_or_stores_exclusively() {
    let transport = TestTransport::new();
    let queue = Arc::new(OutboundMessageDeque::new());
    let wolk = module_builder(Arc::clone(&transport))
        .actuation_handler(|_: &str, _: &str, _: &ReadingValue| {})
        .actuator_status_provider(|_: &str, _: &str| {
            (ActuatorState::Ready, ReadingValue::from(false))
        })
        .outbound_message_queue(Arc::clone(&queue))
        .build()
        .expect("build module");

    // Disconnected: stored, not published.
    wolk.publish_actuator_status("device_1", "SW").expect("store");
    assert_eq!(queue.size(), 1);
    assert!(transport.published().is_empty());

    // Connected: published, not stored.
    transport.set_connected(true);
    wolk.publish_actuator_status("device_1", "SW").expect("publish");
    assert_eq!(queue.size(), 1);
    assert_eq!(transport.published().len(), 1);
}

#[test]
fn test_failed_publish_falls_back_to_storage() {
    let transport = TestTransport::new();
    let queue = Arc::new(OutboundMessageDeque::new());
    let wolk = module_builder(Arc::clone(&transport))
        .actuation_handler(|_: &str, _: &str, _: &ReadingValue| {})
        .actuator_status_provider(|_: &str, _: &str| {
            (ActuatorState::Error, ReadingValue::from(0i64))
        })
        .outbound_message_queue(Arc::clone(&queue))
        .build()
        .expect("build module");
    transport.set_connected(true);
    transport.set_refuse_publish(true);

    wolk.publish_actuator_status("device_1", "SW").expect("fallback");

    assert!(transport.published().is_empty());
    assert_eq!(queue.size(), 1);
}

#[test]
fn test_publish_configuration_accepts_empty_map() {
    let transport = TestTransport::new();
    let wolk = module_builder(Arc::clone(&transport))
        .configuration_handler(|_: &str, _: &HashMap<String, ReadingValue>| {})
        .configuration_provider(|_: &str| HashMap::new())
        .build()
        .expect("build module");
    transport.set_connected(true);

    wolk.publish_configuration("device_1").expect("publish");

    let published = transport.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].topic, "d2p/configuration_get/d/device_1");
    assert_eq!(published[0].payload_str(), r#"{"values":{}}"#);
}

#[test]
fn test_publish_actuator_status_without_provider_fails() {
    let transport = TestTransport::new();
    let (wolk, _queue) = basic_module(Arc::clone(&transport));

    let result = wolk.publish_actuator_status("device_1", "SW");
    assert!(matches!(result, Err(GatewayError::Configuration(_))));
}

#[test]
fn test_connect_announces_current_state() {
    init_tracing();
    let transport = TestTransport::new();
    let wolk = module_builder(Arc::clone(&transport))
        .actuation_handler(|_: &str, _: &str, _: &ReadingValue| {})
        .actuator_status_provider(|_: &str, _: &str| {
            (ActuatorState::Ready, ReadingValue::from(true))
        })
        .configuration_handler(|_: &str, _: &HashMap<String, ReadingValue>| {})
        .configuration_provider(|_: &str| {
            HashMap::from([("configuration_1".to_owned(), ReadingValue::from("v"))])
        })
        .build()
        .expect("build module");

    wolk.add_device(full_device("some_key")).expect("add device");
    wolk.connect().expect("connect");

    let topics: Vec<String> = transport
        .published()
        .iter()
        .map(|message| message.topic.clone())
        .collect();
    assert!(topics.contains(&"d2p/subdevice_status_update/d/some_key".to_owned()));
    assert!(topics.contains(&"d2p/actuator_status/d/some_key/r/SW".to_owned()));
    assert!(topics.contains(&"d2p/configuration_get/d/some_key".to_owned()));
}

#[test]
fn test_status_request_publishes_response() {
    let transport = TestTransport::new();
    let (wolk, _queue) = basic_module(Arc::clone(&transport));
    transport.set_connected(true);

    transport.inject(Message::new(
        "p2d/subdevice_status_request/d/some_key",
        b"".to_vec(),
    ));

    let published = transport.published();
    assert_eq!(published.len(), 1);
    assert_eq!(
        published[0].topic,
        "d2p/subdevice_status_response/d/some_key"
    );
    assert_eq!(published[0].payload_str(), r#"{"state":0}"#);
    drop(wolk);
}

#[test]
fn test_registration_response_triggers_capability_publication() {
    init_tracing();
    let transport = TestTransport::new();
    let wolk = module_builder(Arc::clone(&transport))
        .actuation_handler(|_: &str, _: &str, _: &ReadingValue| {})
        .actuator_status_provider(|_: &str, _: &str| {
            (ActuatorState::Ready, ReadingValue::from(true))
        })
        .configuration_handler(|_: &str, _: &HashMap<String, ReadingValue>| {})
        .configuration_provider(|_: &str| {
            HashMap::from([("configuration_1".to_owned(), ReadingValue::from("v"))])
        })
        .build()
        .expect("build module");

    wolk.add_device(full_device("some_key")).expect("add device");
    transport.set_connected(true);

    transport.inject(Message::new(
        "p2d/register_subdevice_response/d/some_key",
        serde_json::to_vec(&serde_json::json!({
            "payload": {"deviceKey": "some_key"},
            "result": "OK",
        }))
        .expect("encode response"),
    ));

    let topics: Vec<String> = transport
        .published()
        .iter()
        .map(|message| message.topic.clone())
        .collect();
    assert!(topics.contains(&"d2p/actuator_status/d/some_key/r/SW".to_owned()));
    assert!(topics.contains(&"d2p/configuration_get/d/some_key".to_owned()));
}

#[test]
fn test_failed_registration_response_publishes_nothing() {
    let transport = TestTransport::new();
    let wolk = module_builder(Arc::clone(&transport))
        .actuation_handler(|_: &str, _: &str, _: &ReadingValue| {})
        .actuator_status_provider(|_: &str, _: &str| {
            (ActuatorState::Ready, ReadingValue::from(true))
        })
        .build()
        .expect("build module");

    wolk.add_device(sensor_only_device("some_key")).expect("add device");
    transport.set_connected(true);

    transport.inject(Message::new(
        "p2d/register_subdevice_response/d/some_key",
        serde_json::to_vec(&serde_json::json!({
            "payload": {"deviceKey": "some_key"},
            "result": "ERROR_KEY_CONFLICT",
        }))
        .expect("encode response"),
    ));

    assert!(transport.published().is_empty());
}

#[test]
fn test_add_device_while_connected_reconnects_and_publishes_request() {
    let transport = TestTransport::new();
    let (wolk, queue) = basic_module(Arc::clone(&transport));
    transport.set_connected(true);

    wolk.add_device(sensor_only_device("device_1")).expect("add device");

    assert_eq!(transport.reconnect_count(), 1);
    assert_eq!(queue.size(), 0);
    let published = transport.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].topic, "d2p/register_subdevice_request/");
}

#[test]
fn test_unexpected_topic_is_ignored() {
    let transport = TestTransport::new();
    let (wolk, queue) = basic_module(Arc::clone(&transport));
    transport.set_connected(true);

    transport.inject(Message::new("p2d/unknown/d/some_key", b"{}".to_vec()));

    assert!(transport.published().is_empty());
    assert_eq!(queue.size(), 0);
    drop(wolk);
}

#[test]
fn test_alarm_and_device_status_are_stored() {
    let transport = TestTransport::new();
    let (wolk, queue) = basic_module(Arc::clone(&transport));

    wolk.add_alarm("device_1", "HH", true, Some(1_577_836_800_000))
        .expect("store alarm");
    wolk.add_device_status("device_1", DeviceStatus::Sleep)
        .expect("store status");

    let stored = queue.messages_for_device("device_1");
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].topic, "d2p/events/d/device_1/r/HH");
    assert_eq!(
        stored[0].payload_str(),
        r#"{"data":true,"utc":1577836800000}"#
    );
    assert_eq!(stored[1].topic, "d2p/subdevice_status_update/d/device_1");
    assert_eq!(stored[1].payload_str(), r#"{"state":2}"#);
}
