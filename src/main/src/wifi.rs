use anyhow::Result;
use esp_idf_svc::hal::{delay::FreeRtos, modem::WifiModemPeripheral, peripheral::Peripheral, reset};
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi},
};
use log::*;

use crate::config::WifiConfig;

// Reconnect attempts before giving up and restarting the device
const MAX_RETRIES: u32 = 5;

pub struct Wifi<'d> {
    esp_wifi: EspWifi<'d>,
    retries: u32,
}

impl<'d> Wifi<'d> {
    pub fn connect(
        modem: impl Peripheral<P = impl WifiModemPeripheral + 'd> + 'd,
        sysloop: EspSystemEventLoop,
        partition: Option<EspDefaultNvsPartition>,
        config: &WifiConfig,
    ) -> Result<Wifi<'d>> {
        let mut wifi = EspWifi::new(modem, sysloop, partition)?;

        let auth_method = if config.psk.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: config
                .ssid
                .try_into()
                .map_err(|_| anyhow::anyhow!("SSID {:?} is too long", config.ssid))?,
            password: config
                .psk
                .try_into()
                .map_err(|_| anyhow::anyhow!("Wifi PSK is too long"))?,
            auth_method,
            ..Default::default()
        }))?;

        info!("Connecting to wifi {}", config.ssid);
        wifi.start()?;
        wifi.connect()?;

        Ok(Wifi {
            esp_wifi: wifi,
            retries: 0,
        })
    }

    pub fn wait_for_connected(&self, attempts: u32) -> Result<bool> {
        for _ in 0..attempts {
            if self.esp_wifi.is_up()? {
                info!("Connected to wifi");
                return Ok(true);
            }
            FreeRtos::delay_ms(250);
        }
        warn!("Wifi is still down after {} checks", attempts);
        Ok(false)
    }

    /// Called from the main loop. Reconnects a dropped link and restarts the
    /// device once the retries are used up.
    pub fn ensure_connected(&mut self) -> Result<()> {
        if self.esp_wifi.is_connected()? {
            self.retries = 0;
            return Ok(());
        }

        if self.retries >= MAX_RETRIES {
            error!("Failed to reconnect after {} attempts, restarting", self.retries);
            reset::restart();
        }

        self.retries += 1;
        warn!("Wifi lost connection, reconnect attempt {}", self.retries);
        self.esp_wifi.connect()?;
        Ok(())
    }
}
