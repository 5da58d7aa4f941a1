use log::*;

use control::{Controller, Event, Level};

use crate::event::esp_event;
use crate::mqtt::Bus;
use crate::relay::RelayBank;

#[derive(Copy, Clone, Debug)]
pub struct ControlEvent(pub Event);

esp_event!(ControlEvent, c"CONTROL-EVENT");

/// Everything a level change drives: the relays and the echo on the bus.
pub struct Output<'d> {
    pub relays: RelayBank<'d>,
    pub bus: Bus,
}

impl Output<'_> {
    fn apply(&mut self, level: Level) {
        if let Err(err) = self.relays.apply(level) {
            error!("Failed to set relays to level {}: {:?}", level, err);
        }
        if let Err(err) = self.bus.publish_level(level) {
            error!("Failed to publish relay level {}: {:?}", level, err);
        }
    }
}

/// Runs inside the system event loop task, which delivers events one at a
/// time. That task is the only place the controller and the relays are
/// touched, and it never posts back into its own queue.
pub fn handle(controller: &mut Controller, output: &mut Output<'_>, event: Event) {
    if !matches!(event, Event::Tick) {
        debug!("Control event {:?}", event);
    }

    let Some(change) = controller.handle(event) else {
        return;
    };

    info!("Relay value changed from {} to {}", change.old, change.new);
    output.apply(change.new);
}
