//! Home Assistant MQTT topics and payloads for the limiter.
//!
//! The relay level is exposed as a `number` entity, curtailment and manual
//! control as two `switch` entities. Each entity uses its command topic as its
//! state topic, so the retained command doubles as the current state.

use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use serde::Serialize;
use time::PrimitiveDateTime;

use crate::{decode, DecodeError, Event, Level};

pub const POWER_TOPIC: &str = "homeassistant/Power";
pub const CURRENT_TIME_TOPIC: &str = "homeassistant/CurrentTime";

pub const ONLINE: &str = "online";
pub const OFFLINE: &str = "offline";

/// A message from the bus, already turned into something the device acts on.
#[derive(Debug, PartialEq)]
pub enum Inbound {
    Control(Event),
    Clock(PrimitiveDateTime),
    Rejected(DecodeError),
    Unknown,
}

/// `ON` anywhere in the payload switches on, anything else switches off.
pub fn parse_switch(payload: &[u8]) -> bool {
    payload.windows(2).any(|window| window == b"ON")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub level_command: String,
    pub level_config: String,
    pub availability: String,
    pub curtailment_command: String,
    pub curtailment_config: String,
    pub manual_command: String,
    pub manual_config: String,
}

impl Topics {
    pub fn new(name: &str) -> Self {
        Topics {
            level_command: format!("homeassistant/number/{name}/command"),
            level_config: format!("homeassistant/number/{name}/config"),
            availability: format!("homeassistant/number/{name}/availability"),
            curtailment_command: format!("homeassistant/switch/{name}/command"),
            curtailment_config: format!("homeassistant/switch/{name}/config"),
            manual_command: format!("homeassistant/switch/{name}-manual/command"),
            manual_config: format!("homeassistant/switch/{name}-manual/config"),
        }
    }

    pub fn subscriptions(&self) -> [&str; 5] {
        [
            CURRENT_TIME_TOPIC,
            self.level_command.as_str(),
            self.curtailment_command.as_str(),
            self.manual_command.as_str(),
            POWER_TOPIC,
        ]
    }

    pub fn route(&self, topic: &str, payload: &[u8]) -> Inbound {
        let result = if topic == POWER_TOPIC {
            decode(payload).map(|snapshot| Inbound::Control(Event::PowerUpdated(snapshot)))
        } else if topic == self.level_command {
            Level::parse(payload).map(|level| Inbound::Control(Event::CommandedLevelSet(level)))
        } else if topic == self.curtailment_command {
            Ok(Inbound::Control(Event::CurtailmentToggled(parse_switch(payload))))
        } else if topic == self.manual_command {
            Ok(Inbound::Control(Event::ManualControlToggled(parse_switch(payload))))
        } else if topic == CURRENT_TIME_TOPIC {
            crate::parse_current_time(payload).map(Inbound::Clock)
        } else {
            Ok(Inbound::Unknown)
        };

        result.unwrap_or_else(Inbound::Rejected)
    }
}

#[derive(Debug, Serialize)]
struct Device<'a> {
    identifiers: Vec<&'a str>,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct Availability<'a> {
    topic: &'a str,
    payload_available: &'a str,
    payload_not_available: &'a str,
}

#[derive(Debug, Serialize)]
struct EntityConfig<'a> {
    unique_id: String,
    device: Device<'a>,
    availability: Availability<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max: Option<u8>,
    retain: bool,
    command_topic: &'a str,
    state_topic: &'a str,
}

/// Identity the entities are announced under.
#[derive(Debug, Clone, Copy)]
pub struct Identity<'a> {
    pub name: &'a str,
    pub device_id: &'a str,
    pub unique_id: &'a str,
}

/// A retained message to publish on every (re)connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement<'a> {
    pub topic: &'a str,
    pub payload: Vec<u8>,
}

impl<'a> Identity<'a> {
    fn entity(
        &self,
        topics: &'a Topics,
        unique_id: String,
        command_topic: &'a str,
        range: Option<(Level, Level)>,
    ) -> EntityConfig<'a> {
        EntityConfig {
            unique_id,
            device: Device {
                identifiers: vec![self.device_id],
                name: self.name,
            },
            availability: Availability {
                topic: &topics.availability,
                payload_available: ONLINE,
                payload_not_available: OFFLINE,
            },
            min: range.map(|(min, _)| u8::from(min)),
            max: range.map(|(_, max)| u8::from(max)),
            retain: true,
            command_topic,
            state_topic: command_topic,
        }
    }

    /// Discovery configs for the three entities followed by the `online` marker.
    pub fn announcements(
        &self,
        topics: &'a Topics,
    ) -> Result<Vec<Announcement<'a>>, serde_json::Error> {
        let uid = self.unique_id;
        let level = self.entity(
            topics,
            format!("T_{uid}"),
            &topics.level_command,
            Some((Level::MAX_OUTPUT, Level::MAX_CURTAILMENT)),
        );
        let curtailment = self.entity(
            topics,
            format!("S_{uid}"),
            &topics.curtailment_command,
            None,
        );
        let manual = self.entity(
            topics,
            format!("S_{uid}-manual"),
            &topics.manual_command,
            None,
        );

        Ok(vec![
            Announcement {
                topic: &topics.level_config,
                payload: serde_json::to_vec(&level)?,
            },
            Announcement {
                topic: &topics.curtailment_config,
                payload: serde_json::to_vec(&curtailment)?,
            },
            Announcement {
                topic: &topics.manual_config,
                payload: serde_json::to_vec(&manual)?,
            },
            Announcement {
                topic: &topics.availability,
                payload: ONLINE.as_bytes().to_vec(),
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PowerSnapshot;
    use serde_json::{json, Value};
    use time::macros::datetime;

    fn topics() -> Topics {
        Topics::new("limiter")
    }

    #[test]
    fn test_topic_names() {
        let topics = topics();
        assert_eq!(topics.level_command, "homeassistant/number/limiter/command");
        assert_eq!(topics.availability, "homeassistant/number/limiter/availability");
        assert_eq!(topics.curtailment_command, "homeassistant/switch/limiter/command");
        assert_eq!(topics.manual_command, "homeassistant/switch/limiter-manual/command");
        assert_eq!(topics.manual_config, "homeassistant/switch/limiter-manual/config");
        assert!(topics.subscriptions().contains(&POWER_TOPIC));
    }

    #[test]
    fn test_parse_switch() {
        assert!(parse_switch(b"ON"));
        assert!(parse_switch(b"\"ON\""));
        assert!(!parse_switch(b"OFF"));
        assert!(!parse_switch(b"on"));
        assert!(!parse_switch(b""));
    }

    #[test]
    fn test_route_switches() {
        let topics = topics();
        assert_eq!(
            topics.route("homeassistant/switch/limiter/command", b"ON"),
            Inbound::Control(Event::CurtailmentToggled(true))
        );
        assert_eq!(
            topics.route("homeassistant/switch/limiter-manual/command", b"OFF"),
            Inbound::Control(Event::ManualControlToggled(false))
        );
    }

    #[test]
    fn test_route_level_command() {
        let topics = topics();
        assert_eq!(
            topics.route("homeassistant/number/limiter/command", b"7"),
            Inbound::Control(Event::CommandedLevelSet(Level::new(7).unwrap()))
        );
        assert_eq!(
            topics.route("homeassistant/number/limiter/command", b"16"),
            Inbound::Rejected(DecodeError::InvalidLevel)
        );
    }

    #[test]
    fn test_route_power() {
        let topics = topics();
        let payload = br#"{"powerValues": [{"name": "Solar", "units": "W", "value": 4200}]}"#;
        let expected = PowerSnapshot {
            solar_power_kw: 4.2,
            ..PowerSnapshot::default()
        };
        assert_eq!(
            topics.route(POWER_TOPIC, payload),
            Inbound::Control(Event::PowerUpdated(expected))
        );
        assert_eq!(
            topics.route(POWER_TOPIC, b"{}"),
            Inbound::Rejected(DecodeError::MalformedMessage)
        );
    }

    #[test]
    fn test_route_clock_and_unknown() {
        let topics = topics();
        assert_eq!(
            topics.route(CURRENT_TIME_TOPIC, b"2024.3.9 17:05:40"),
            Inbound::Clock(datetime!(2024-03-09 17:05:40))
        );
        assert_eq!(topics.route("homeassistant/switch/other/command", b"ON"), Inbound::Unknown);
    }

    #[test]
    fn test_announcements() {
        let topics = topics();
        let identity = Identity {
            name: "limiter",
            device_id: "envoy-relay",
            unique_id: "42",
        };
        let announcements = identity.announcements(&topics).unwrap();
        assert_eq!(announcements.len(), 4);

        let level: Value = serde_json::from_slice(&announcements[0].payload).unwrap();
        assert_eq!(announcements[0].topic, "homeassistant/number/limiter/config");
        assert_eq!(
            level,
            json!({
                "unique_id": "T_42",
                "device": {"identifiers": ["envoy-relay"], "name": "limiter"},
                "availability": {
                    "topic": "homeassistant/number/limiter/availability",
                    "payload_available": "online",
                    "payload_not_available": "offline"
                },
                "min": 0,
                "max": 15,
                "retain": true,
                "command_topic": "homeassistant/number/limiter/command",
                "state_topic": "homeassistant/number/limiter/command"
            })
        );

        let manual: Value = serde_json::from_slice(&announcements[2].payload).unwrap();
        assert_eq!(manual["unique_id"], "S_42-manual");
        assert_eq!(manual["command_topic"], "homeassistant/switch/limiter-manual/command");
        assert!(manual.get("min").is_none());

        assert_eq!(announcements[3].topic, topics.availability);
        assert_eq!(announcements[3].payload, b"online");
    }
}
