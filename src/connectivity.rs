//! Connectivity layer between the module and the gateway broker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use rumqttc::{
    Client, ConnectReturnCode, Event, LastWill, MqttOptions, Packet, QoS,
};
use tracing::{debug, error, info, warn};

use crate::error::TransportError;
use crate::model::message::Message;

/// How long `connect` waits for the broker's CONNACK.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Pause between event-loop retries after a connection error.
const RETRY_BACKOFF: Duration = Duration::from_secs(1);
const KEEP_ALIVE: Duration = Duration::from_secs(60);
const REQUEST_CHANNEL_CAPACITY: usize = 64;

/// Callback invoked for every message arriving from the gateway. Runs on the
/// transport's worker thread and must not block.
pub type InboundMessageListener = Box<dyn Fn(Message) + Send + Sync>;

/// Exchange of messages with the gateway broker.
///
/// Implementations own their network worker; all methods are callable from
/// any thread.
pub trait ConnectivityService: Send + Sync {
    fn set_inbound_message_listener(&self, listener: InboundMessageListener);

    /// Replaces the last-will message announced on the next connect.
    fn set_lastwill_message(&self, message: Message);

    /// Adds topics to subscribe to on every (re)connect.
    fn add_subscription_topics(&self, topics: Vec<String>);

    /// Forgets stored subscription topics that contain the device key.
    fn remove_topics_for_device(&self, device_key: &str);

    /// Establishes the connection, blocking until the broker acknowledges or
    /// the attempt times out. Idempotent.
    fn connect(&self) -> Result<(), TransportError>;

    /// Tears down any existing connection and connects again.
    fn reconnect(&self) -> Result<(), TransportError>;

    /// Terminates the connection. Idempotent.
    fn disconnect(&self);

    /// Publishes a message, returning whether the transport accepted it.
    fn publish(&self, message: &Message) -> bool;

    fn is_connected(&self) -> bool;
}

impl<C: ConnectivityService + ?Sized> ConnectivityService for Arc<C> {
    fn set_inbound_message_listener(&self, listener: InboundMessageListener) {
        (**self).set_inbound_message_listener(listener);
    }

    fn set_lastwill_message(&self, message: Message) {
        (**self).set_lastwill_message(message);
    }

    fn add_subscription_topics(&self, topics: Vec<String>) {
        (**self).add_subscription_topics(topics);
    }

    fn remove_topics_for_device(&self, device_key: &str) {
        (**self).remove_topics_for_device(device_key);
    }

    fn connect(&self) -> Result<(), TransportError> {
        (**self).connect()
    }

    fn reconnect(&self) -> Result<(), TransportError> {
        (**self).reconnect()
    }

    fn disconnect(&self) {
        (**self).disconnect();
    }

    fn publish(&self, message: &Message) -> bool {
        (**self).publish(message)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}

type ConnackSignal = (Mutex<Option<ConnectReturnCode>>, Condvar);

struct ActiveConnection {
    client: Client,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

/// Default MQTT-backed connectivity service.
///
/// Each `connect` builds a fresh client carrying the current last-will
/// message and spawns a worker thread that drains the network event loop,
/// dispatches inbound publishes to the listener and resubscribes the stored
/// topics at QoS 2 whenever the broker acknowledges a session.
pub struct MqttConnectivityService {
    host: String,
    port: u16,
    client_id: String,
    publish_qos: QoS,
    lastwill: Mutex<Message>,
    topics: Arc<Mutex<Vec<String>>>,
    listener: Arc<Mutex<Option<InboundMessageListener>>>,
    connected: Arc<AtomicBool>,
    active: Mutex<Option<ActiveConnection>>,
}

impl MqttConnectivityService {
    /// Prepares a service for connecting to the gateway. The client
    /// identifier doubles as the credential, the way the gateway broker
    /// authenticates modules.
    pub fn new(host: impl Into<String>, port: u16, client_id: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            client_id: client_id.into(),
            publish_qos: QoS::AtMostOnce,
            lastwill: Mutex::new(Message::new("lastwill", b"[]".to_vec())),
            topics: Arc::new(Mutex::new(Vec::new())),
            listener: Arc::new(Mutex::new(None)),
            connected: Arc::new(AtomicBool::new(false)),
            active: Mutex::new(None),
        }
    }

    pub fn publish_qos(mut self, qos: QoS) -> Self {
        self.publish_qos = qos;
        self
    }

    fn spawn_worker(
        &self,
        mut connection: rumqttc::Connection,
        client: Client,
        stop: Arc<AtomicBool>,
        connack: Arc<ConnackSignal>,
    ) -> JoinHandle<()> {
        let topics = Arc::clone(&self.topics);
        let listener = Arc::clone(&self.listener);
        let connected = Arc::clone(&self.connected);

        thread::spawn(move || {
            for event in connection.iter() {
                if stop.load(Ordering::SeqCst) {
                    break;
                }
                match event {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        if ack.code == ConnectReturnCode::Success {
                            connected.store(true, Ordering::SeqCst);
                            // Subscribing on CONNACK renews subscriptions
                            // after the event loop's own reconnects as well.
                            for topic in topics.lock().iter() {
                                if let Err(err) =
                                    client.try_subscribe(topic.clone(), QoS::ExactlyOnce)
                                {
                                    error!(%topic, error = ?err, "failed to subscribe");
                                }
                            }
                        }
                        let (code, condvar) = &*connack;
                        *code.lock() = Some(ack.code);
                        condvar.notify_all();
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let message =
                            Message::new(publish.topic.clone(), publish.payload.to_vec());
                        match listener.lock().as_ref() {
                            Some(listener) => listener(message),
                            None => warn!(
                                topic = %publish.topic,
                                "inbound message dropped: no listener set"
                            ),
                        }
                    }
                    Ok(Event::Incoming(Packet::Disconnect)) => {
                        connected.store(false, Ordering::SeqCst);
                    }
                    Ok(_) => {}
                    Err(err) => {
                        if stop.load(Ordering::SeqCst) {
                            break;
                        }
                        if connected.swap(false, Ordering::SeqCst) {
                            error!(error = ?err, "connection to gateway lost");
                        } else {
                            debug!(error = ?err, "gateway still unreachable");
                        }
                        thread::sleep(RETRY_BACKOFF);
                    }
                }
            }
            debug!("mqtt worker stopped");
        })
    }

    fn teardown(&self, mut active: ActiveConnection, publish_lastwill: bool) {
        if publish_lastwill {
            // The broker only delivers the last will on unexpected
            // disconnects; a deliberate one has to send it explicitly.
            let lastwill = self.lastwill.lock().clone();
            let _ = active.client.publish(
                lastwill.topic,
                self.publish_qos,
                false,
                lastwill.payload,
            );
        }
        active.stop.store(true, Ordering::SeqCst);
        let _ = active.client.disconnect();
        if let Some(worker) = active.worker.take() {
            let _ = worker.join();
        }
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl ConnectivityService for MqttConnectivityService {
    fn set_inbound_message_listener(&self, listener: InboundMessageListener) {
        *self.listener.lock() = Some(listener);
    }

    fn set_lastwill_message(&self, message: Message) {
        *self.lastwill.lock() = message;
    }

    fn add_subscription_topics(&self, topics: Vec<String>) {
        let mut stored = self.topics.lock();
        for topic in topics {
            if !stored.contains(&topic) {
                stored.push(topic);
            }
        }
    }

    fn remove_topics_for_device(&self, device_key: &str) {
        self.topics
            .lock()
            .retain(|topic| !topic.contains(device_key));
    }

    fn connect(&self) -> Result<(), TransportError> {
        if self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }

        let mut options =
            MqttOptions::new(self.client_id.clone(), self.host.clone(), self.port);
        options.set_keep_alive(KEEP_ALIVE);
        options.set_credentials(self.client_id.clone(), "");
        let lastwill = self.lastwill.lock().clone();
        options.set_last_will(LastWill::new(
            lastwill.topic,
            lastwill.payload,
            self.publish_qos,
            false,
        ));

        let (client, connection) = Client::new(options, REQUEST_CHANNEL_CAPACITY);
        let stop = Arc::new(AtomicBool::new(false));
        let connack: Arc<ConnackSignal> = Arc::new((Mutex::new(None), Condvar::new()));

        let worker = self.spawn_worker(
            connection,
            client.clone(),
            Arc::clone(&stop),
            Arc::clone(&connack),
        );
        let active = ActiveConnection {
            client,
            stop,
            worker: Some(worker),
        };

        let code = {
            let (code, condvar) = &*connack;
            let mut code = code.lock();
            while code.is_none() {
                if condvar.wait_for(&mut code, CONNECT_TIMEOUT).timed_out() {
                    break;
                }
            }
            *code
        };

        match code {
            Some(ConnectReturnCode::Success) => {
                info!(host = %self.host, port = self.port, "connected to gateway");
                *self.active.lock() = Some(active);
                Ok(())
            }
            Some(refusal) => {
                self.teardown(active, false);
                Err(match refusal {
                    ConnectReturnCode::RefusedProtocolVersion => {
                        TransportError::RefusedProtocolVersion
                    }
                    ConnectReturnCode::BadClientId => TransportError::RefusedClientId,
                    ConnectReturnCode::ServiceUnavailable => TransportError::ServerUnavailable,
                    ConnectReturnCode::BadUserNamePassword => TransportError::BadCredentials,
                    ConnectReturnCode::NotAuthorized => TransportError::NotAuthorized,
                    other => TransportError::Client(format!("unexpected CONNACK code {other:?}")),
                })
            }
            None => {
                self.teardown(active, false);
                Err(TransportError::Timeout)
            }
        }
    }

    fn reconnect(&self) -> Result<(), TransportError> {
        self.disconnect();
        self.connect()
    }

    fn disconnect(&self) {
        let active = self.active.lock().take();
        if let Some(active) = active {
            self.teardown(active, true);
        }
        self.connected.store(false, Ordering::SeqCst);
    }

    fn publish(&self, message: &Message) -> bool {
        if !self.connected.load(Ordering::SeqCst) {
            return false;
        }
        let active = self.active.lock();
        let Some(active) = active.as_ref() else {
            return false;
        };
        match active.client.publish(
            message.topic.clone(),
            self.publish_qos,
            false,
            message.payload.clone(),
        ) {
            Ok(()) => true,
            Err(err) => {
                error!(topic = %message.topic, error = ?err, "publish failed");
                false
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
