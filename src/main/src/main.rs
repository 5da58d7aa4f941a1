use anyhow::Result;
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::{
        delay,
        gpio::AnyOutputPin,
        prelude::Peripherals,
        task::watchdog::{TWDTConfig, TWDTDriver},
    },
    nvs::EspDefaultNvsPartition,
    timer::EspTaskTimerService,
};
use log::*;

mod config;
mod controller;
mod event;
mod mqtt;
mod relay;
mod wifi;

use config::Config;
use control::{Controller, Event};
use controller::{ControlEvent, Output};
use mqtt::{Bus, LinkEvent};
use relay::RelayBank;
use wifi::Wifi;

// Main loop period, also how often the watchdog is fed
const LOOP_PERIOD_MS: u32 = 250;
// Main loop iterations between wifi link checks
const WIFI_CHECK_LOOPS: u32 = 8;

fn main() -> Result<()> {
    // It is necessary to call this function once. Otherwise some patches to the runtime
    // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
    esp_idf_svc::sys::link_patches();

    // Bind the log crate to the ESP Logging facilities
    esp_idf_svc::log::EspLogger::initialize_default();

    let peripherals = Peripherals::take()?;

    // Relays first so the inverter sees level 0 while we boot
    let relay_pins: [AnyOutputPin; 4] = [
        peripherals.pins.gpio2.into(),
        peripherals.pins.gpio3.into(),
        peripherals.pins.gpio4.into(),
        peripherals.pins.gpio5.into(),
    ];
    let relays = RelayBank::new(relay_pins)?;

    let config = Config::read();
    info!(
        "Loaded config: name {}, device id {}, broker {}",
        config.mqtt.name, config.mqtt.device_id, config.mqtt.url
    );

    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let mut wifi = Wifi::connect(peripherals.modem, sysloop.clone(), Some(nvs), &config.wifi)?;
    wifi.wait_for_connected(120)?;

    let (bus, listener) = Bus::connect(config.mqtt)?;

    let _control_handler = {
        let mut limiter = Controller::new(config.core);
        let mut output = Output {
            relays,
            bus: bus.clone(),
        };
        sysloop.subscribe::<ControlEvent, _>(move |event| {
            controller::handle(&mut limiter, &mut output, event.0);
        })?
    };

    let _link_handler = {
        let bus = bus.clone();
        sysloop.subscribe::<LinkEvent, _>(move |event| {
            let result = match event {
                LinkEvent::Connected => bus.on_connected(),
                LinkEvent::Heartbeat => bus.announce_online(),
            };
            if let Err(err) = result {
                error!("Failed to handle {:?}: {:?}", event, err);
            }
        })?
    };

    listener.spawn(sysloop.clone())?;

    let timer_service = EspTaskTimerService::new()?;
    let tick_timer = {
        // Avoid move of sysloop into closure
        let localloop = sysloop.clone();
        timer_service.timer(move || {
            // A skipped tick is picked up by the next one
            if let Err(err) = localloop.post::<ControlEvent>(&ControlEvent(Event::Tick), delay::NON_BLOCK) {
                warn!("Dropped control tick: {:?}", err);
            }
        })?
    };
    tick_timer.every(config.tick_interval)?;

    // Only watch the main loop once the blocking setup is behind us
    let watchdog_config = TWDTConfig {
        duration: config.watchdog_timeout,
        panic_on_trigger: false,
        ..Default::default()
    };
    let mut watchdog = TWDTDriver::new(peripherals.twdt, &watchdog_config)?;
    let mut watchdog_subscription = watchdog.watch_current_task()?;

    let mut loops: u32 = 0;
    loop {
        loops = loops.wrapping_add(1);
        if loops % WIFI_CHECK_LOOPS == 0 {
            if let Err(err) = wifi.ensure_connected() {
                error!("Wifi reconnect failed: {:?}", err);
            }
        }

        if let Err(err) = watchdog_subscription.feed() {
            error!("Error resetting the watchdog: {:?}", err);
        }

        delay::FreeRtos::delay_ms(LOOP_PERIOD_MS);
    }
}
