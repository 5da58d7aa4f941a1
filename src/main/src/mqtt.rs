use anyhow::{anyhow, Result};
use core::time::Duration;
use embedded_svc::mqtt::client::{EventPayload, QoS};
use esp_idf_svc::eventloop::{EspEventSerializer, EspSystemEventLoop};
use esp_idf_svc::hal::delay;
use esp_idf_svc::mqtt::client::{
    EspMqttClient, EspMqttConnection, EspMqttEvent, LwtConfiguration, MqttClientConfiguration,
    MqttProtocolVersion,
};
use log::*;
use std::sync::{Arc, Mutex};
use std::thread;

use control::homeassistant::{Identity, Inbound, Topics, OFFLINE, ONLINE};
use control::{should_announce, Level};

use crate::config::MqttConfig;
use crate::controller::ControlEvent;
use crate::event::esp_event;

/// Broker link state changes that need the client to act on them.
#[derive(Copy, Clone, Debug)]
pub enum LinkEvent {
    Connected,
    Heartbeat,
}

esp_event!(LinkEvent, c"MQTT-LINK-EVENT");

#[derive(Clone)]
pub struct Bus {
    client: Arc<Mutex<EspMqttClient<'static>>>,
    topics: Arc<Topics>,
    config: MqttConfig,
}

/// Inbound side of the connection. Events queue up until it is spawned, so
/// the loop handlers can be subscribed first without missing `Connected`.
pub struct Listener {
    connection: EspMqttConnection,
    topics: Arc<Topics>,
}

// How long the listener waits for room in the event loop queue
const POST_TIMEOUT_MS: u64 = 1000;

fn post<P>(sysloop: &EspSystemEventLoop, event: &P::Data<'_>)
where
    P: EspEventSerializer,
{
    let timeout = delay::TickType::new_millis(POST_TIMEOUT_MS).ticks();
    match sysloop.post::<P>(event, timeout) {
        Ok(true) => {}
        Ok(false) => warn!("Event loop queue full, dropped message"),
        Err(err) => error!("Failed to post event: {:?}", err),
    }
}

// Runs on the listener thread: turn each message into a loop event
fn on_event(event: EspMqttEvent<'_>, topics: &Topics, sysloop: &EspSystemEventLoop) {
    match event.payload() {
        EventPayload::Connected(_) => {
            info!("MQTT connected");
            post::<LinkEvent>(sysloop, &LinkEvent::Connected);
        }
        EventPayload::Disconnected => warn!("MQTT disconnected"),
        EventPayload::Received {
            topic: Some(topic),
            data,
            ..
        } => match topics.route(topic, data) {
            Inbound::Control(control) => post::<ControlEvent>(sysloop, &ControlEvent(control)),
            Inbound::Clock(now) => {
                if should_announce(&now) {
                    post::<LinkEvent>(sysloop, &LinkEvent::Heartbeat);
                }
            }
            Inbound::Rejected(err) => warn!("Discarding message on {}: {}", topic, err),
            Inbound::Unknown => info!("Received unexpected message, topic {}", topic),
        },
        EventPayload::Received { topic: None, .. } => {
            warn!("Discarding message without a topic");
        }
        EventPayload::Error(err) => error!("MQTT error: {:?}", err),
        other => debug!("MQTT event {:?}", other),
    }
}

impl Listener {
    pub fn spawn(self, sysloop: EspSystemEventLoop) -> Result<()> {
        let Listener {
            mut connection,
            topics,
        } = self;
        thread::Builder::new()
            .name("mqtt-listener".into())
            .stack_size(6144)
            .spawn(move || {
                while let Ok(event) = connection.next() {
                    on_event(event, &topics, &sysloop);
                }
                warn!("MQTT connection closed");
            })?;
        Ok(())
    }
}

impl Bus {
    pub fn connect(config: MqttConfig) -> Result<(Bus, Listener)> {
        let topics = Arc::new(Topics::new(config.name));

        let mqtt_config = MqttClientConfiguration {
            client_id: Some(config.name),
            username: config.username,
            password: config.password,
            protocol_version: Some(MqttProtocolVersion::V3_1_1),
            keep_alive_interval: Some(Duration::from_secs(30)),
            reconnect_timeout: Some(Duration::from_millis(250)),
            lwt: Some(LwtConfiguration {
                topic: &topics.availability,
                payload: OFFLINE.as_bytes(),
                qos: QoS::AtLeastOnce,
                retain: true,
            }),
            ..Default::default()
        };

        let (client, connection) = EspMqttClient::new(config.url, &mqtt_config)?;
        info!("MQTT client started for {}", config.url);

        let listener = Listener {
            connection,
            topics: topics.clone(),
        };
        let bus = Bus {
            client: Arc::new(Mutex::new(client)),
            topics,
            config,
        };
        Ok((bus, listener))
    }

    fn with_client<T>(&self, f: impl FnOnce(&mut EspMqttClient<'static>) -> Result<T>) -> Result<T> {
        let mut client = self
            .client
            .lock()
            .map_err(|_| anyhow!("MQTT client lock poisoned"))?;
        f(&mut client)
    }

    /// Subscribes to the inbound topics and announces the entities. Runs on
    /// every (re)connection.
    pub fn on_connected(&self) -> Result<()> {
        let identity = Identity {
            name: self.config.name,
            device_id: self.config.device_id,
            unique_id: self.config.unique_id,
        };
        let announcements = identity
            .announcements(&self.topics)
            .map_err(|err| anyhow!("Failed to build discovery payloads: {}", err))?;

        self.with_client(|client| {
            for topic in self.topics.subscriptions() {
                let id = client.subscribe(topic, QoS::AtMostOnce)?;
                info!("Subscribe sent for {}, msg_id={}", topic, id);
            }
            for announcement in &announcements {
                let id = client.enqueue(announcement.topic, QoS::AtLeastOnce, true, &announcement.payload)?;
                info!("Published {}, msg_id={}", announcement.topic, id);
            }
            Ok(())
        })
    }

    pub fn announce_online(&self) -> Result<()> {
        self.with_client(|client| {
            client.enqueue(&self.topics.availability, QoS::AtLeastOnce, true, ONLINE.as_bytes())?;
            Ok(())
        })
    }

    /// Echoes the applied level on the command topic, which Home Assistant
    /// also reads as the entity state.
    pub fn publish_level(&self, level: Level) -> Result<()> {
        let payload = level.to_string();
        self.with_client(|client| {
            let id = client.enqueue(&self.topics.level_command, QoS::AtLeastOnce, true, payload.as_bytes())?;
            info!(
                "Published relay level, msg_id={}, topic={}, payload={}",
                id, self.topics.level_command, payload
            );
            Ok(())
        })
    }
}
