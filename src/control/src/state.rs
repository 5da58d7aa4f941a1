use crate::{plan_with, CoreConfig, Level, PowerSnapshot};

/// Operator intent plus the level currently driving the output.
#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct ControlState {
    pub curtailment_enabled: bool,
    pub manual_control_enabled: bool,
    pub commanded_level: Level,
    pub applied_level: Level,
    pub previous_applied_level: Level,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Event {
    PowerUpdated(PowerSnapshot),
    CommandedLevelSet(Level),
    ManualControlToggled(bool),
    CurtailmentToggled(bool),
    Tick,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct LevelChanged {
    pub old: Level,
    pub new: Level,
}

/// Sole owner of the [`ControlState`]. Events are applied one at a time and
/// each one reports at most one level change.
#[derive(Debug, Clone)]
pub struct Controller {
    config: CoreConfig,
    state: ControlState,
    snapshot: Option<PowerSnapshot>,
    // A snapshot drives at most one planning decision
    snapshot_fresh: bool,
}

impl Controller {
    pub fn new(config: CoreConfig) -> Self {
        Controller {
            config,
            state: ControlState::default(),
            snapshot: None,
            snapshot_fresh: false,
        }
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    pub fn snapshot(&self) -> Option<&PowerSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn applied_level(&self) -> Level {
        self.state.applied_level
    }

    pub fn handle(&mut self, event: Event) -> Option<LevelChanged> {
        match event {
            Event::PowerUpdated(snapshot) => {
                self.snapshot = Some(snapshot);
                self.snapshot_fresh = true;
            }
            Event::CommandedLevelSet(level) => {
                self.state.commanded_level = level;
                if self.state.manual_control_enabled {
                    self.state.applied_level = level;
                }
            }
            Event::ManualControlToggled(enabled) => {
                let was_enabled = self.state.manual_control_enabled;
                self.state.manual_control_enabled = enabled;
                if enabled && !was_enabled {
                    self.state.applied_level = self.state.commanded_level;
                }
            }
            Event::CurtailmentToggled(enabled) => {
                self.state.curtailment_enabled = enabled;
            }
            Event::Tick => self.tick(),
        }

        self.take_change()
    }

    fn tick(&mut self) {
        if self.state.manual_control_enabled {
            // Operator owns the level
            return;
        }

        if !self.state.curtailment_enabled {
            self.state.applied_level = Level::MAX_OUTPUT;
            return;
        }

        if !self.snapshot_fresh {
            return;
        }
        if let Some(snapshot) = &self.snapshot {
            self.state.applied_level = plan_with(&self.config, snapshot, self.state.applied_level);
            self.snapshot_fresh = false;
        }
    }

    fn take_change(&mut self) -> Option<LevelChanged> {
        let old = self.state.previous_applied_level;
        let new = self.state.applied_level;
        if old == new {
            return None;
        }
        self.state.previous_applied_level = new;
        Some(LevelChanged { old, new })
    }
}

impl Default for Controller {
    fn default() -> Self {
        Controller::new(CoreConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(value: u8) -> Level {
        Level::new(value).unwrap()
    }

    // Full battery, 2 kW house load, 8 kW solar
    fn sunny() -> PowerSnapshot {
        PowerSnapshot {
            battery_level: 100.0,
            house_power_kw: 2.0,
            solar_power_kw: 8.0,
            battery_power_kw: -1.0,
            ..PowerSnapshot::default()
        }
    }

    #[test]
    fn test_initial_state() {
        let controller = Controller::default();
        assert_eq!(*controller.state(), ControlState::default());
        assert_eq!(controller.applied_level(), Level::MAX_OUTPUT);
        assert!(controller.snapshot().is_none());
    }

    #[test]
    fn test_power_update_alone_changes_nothing() {
        let mut controller = Controller::default();
        controller.handle(Event::CurtailmentToggled(true));
        assert_eq!(controller.handle(Event::PowerUpdated(sunny())), None);
        assert_eq!(controller.applied_level(), Level::MAX_OUTPUT);
        assert_eq!(controller.snapshot(), Some(&sunny()));
    }

    #[test]
    fn test_tick_plans_fresh_snapshot_once() {
        let mut controller = Controller::default();
        controller.handle(Event::CurtailmentToggled(true));
        controller.handle(Event::PowerUpdated(sunny()));

        let change = controller.handle(Event::Tick);
        assert_eq!(
            change,
            Some(LevelChanged {
                old: Level::MAX_OUTPUT,
                new: level(1)
            })
        );

        // Idempotent without new telemetry
        assert_eq!(controller.handle(Event::Tick), None);
        assert_eq!(controller.handle(Event::Tick), None);
        assert_eq!(controller.applied_level(), level(1));
    }

    #[test]
    fn test_stale_snapshot_is_not_replanned() {
        let mut controller = Controller::default();
        controller.handle(Event::CurtailmentToggled(true));
        controller.handle(Event::PowerUpdated(sunny()));
        controller.handle(Event::Tick);

        // Leaving and re-entering manual mode must not replay the consumed snapshot
        controller.handle(Event::ManualControlToggled(true));
        controller.handle(Event::ManualControlToggled(false));
        assert_eq!(controller.handle(Event::Tick), None);
        assert_eq!(controller.applied_level(), Level::MAX_OUTPUT);
    }

    #[test]
    fn test_curtailment_off_forces_full_output() {
        let mut controller = Controller::default();
        controller.handle(Event::CommandedLevelSet(level(9)));
        controller.handle(Event::ManualControlToggled(true));
        assert_eq!(controller.applied_level(), level(9));

        // Manual off with curtailment off: next tick releases the inverter
        assert_eq!(controller.handle(Event::ManualControlToggled(false)), None);
        let change = controller.handle(Event::Tick);
        assert_eq!(
            change,
            Some(LevelChanged {
                old: level(9),
                new: Level::MAX_OUTPUT
            })
        );
        assert_eq!(controller.handle(Event::Tick), None);
    }

    #[test]
    fn test_curtailment_off_ignores_telemetry() {
        let mut controller = Controller::default();
        controller.handle(Event::PowerUpdated(sunny()));
        assert_eq!(controller.handle(Event::Tick), None);
        assert_eq!(controller.applied_level(), Level::MAX_OUTPUT);
    }

    #[test]
    fn test_manual_toggle_adopts_commanded_level() {
        let mut controller = Controller::default();
        assert_eq!(controller.handle(Event::CommandedLevelSet(level(7))), None);
        assert_eq!(controller.state().commanded_level, level(7));

        let change = controller.handle(Event::ManualControlToggled(true));
        assert_eq!(
            change,
            Some(LevelChanged {
                old: Level::MAX_OUTPUT,
                new: level(7)
            })
        );
        assert_eq!(controller.handle(Event::ManualControlToggled(true)), None);
    }

    #[test]
    fn test_manual_commands_apply_immediately() {
        let mut controller = Controller::default();
        controller.handle(Event::ManualControlToggled(true));

        let change = controller.handle(Event::CommandedLevelSet(level(12)));
        assert_eq!(
            change,
            Some(LevelChanged {
                old: Level::MAX_OUTPUT,
                new: level(12)
            })
        );
        assert_eq!(controller.handle(Event::CommandedLevelSet(level(12))), None);
    }

    #[test]
    fn test_manual_mode_ignores_planner() {
        let mut controller = Controller::default();
        controller.handle(Event::CurtailmentToggled(true));
        controller.handle(Event::CommandedLevelSet(level(4)));
        controller.handle(Event::ManualControlToggled(true));
        controller.handle(Event::PowerUpdated(sunny()));

        assert_eq!(controller.handle(Event::Tick), None);
        assert_eq!(controller.applied_level(), level(4));
    }

    #[test]
    fn test_snapshot_received_in_manual_mode_is_planned_afterwards() {
        let mut controller = Controller::default();
        controller.handle(Event::CurtailmentToggled(true));
        controller.handle(Event::ManualControlToggled(true));
        controller.handle(Event::PowerUpdated(sunny()));
        controller.handle(Event::Tick);
        controller.handle(Event::ManualControlToggled(false));

        let change = controller.handle(Event::Tick);
        assert_eq!(change.map(|c| c.new), Some(level(1)));
    }

    #[test]
    fn test_commanded_level_outside_manual_mode_is_remembered() {
        let mut controller = Controller::default();
        controller.handle(Event::CommandedLevelSet(level(3)));
        assert_eq!(controller.applied_level(), Level::MAX_OUTPUT);
        assert_eq!(controller.state().commanded_level, level(3));
    }

    #[test]
    fn test_previous_level_tracks_applied_level() {
        let mut controller = Controller::default();
        controller.handle(Event::ManualControlToggled(true));
        controller.handle(Event::CommandedLevelSet(level(2)));
        controller.handle(Event::CommandedLevelSet(level(5)));
        let state = controller.state();
        assert_eq!(state.applied_level, level(5));
        assert_eq!(state.previous_applied_level, level(5));
    }
}
