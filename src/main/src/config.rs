use core::time::Duration;

use control::CoreConfig;

#[toml_cfg::toml_config]
pub struct TomlConfig {
    #[default("")]
    wifi_ssid: &'static str,
    #[default("")]
    wifi_psk: &'static str,
    #[default("")]
    mqtt_url: &'static str,
    #[default("")]
    mqtt_username: &'static str,
    #[default("")]
    mqtt_password: &'static str,
    #[default("EnphaseLimiter")]
    name: &'static str,
    #[default("EnphaseRelay")]
    device_id: &'static str,
    #[default("0001")]
    unique_id: &'static str,
    #[default(250)]
    tick_interval_ms: u64,
    #[default(10)]
    watchdog_timeout: u64,
    #[default(5.0)]
    max_battery_charge_kw: f32,
    #[default(0.1)]
    min_possible_solar_kw: f32,
}

#[derive(Clone, Copy, Debug)]
pub struct WifiConfig {
    pub ssid: &'static str,
    pub psk: &'static str,
}

#[derive(Clone, Copy, Debug)]
pub struct MqttConfig {
    pub url: &'static str,
    pub username: Option<&'static str>,
    pub password: Option<&'static str>,
    pub name: &'static str,
    pub device_id: &'static str,
    pub unique_id: &'static str,
}

pub struct Config {
    pub wifi: WifiConfig,
    pub mqtt: MqttConfig,
    pub tick_interval: Duration,
    pub watchdog_timeout: Duration,
    pub core: CoreConfig,
}

impl Config {
    pub fn read() -> Self {
        Config::from(TOML_CONFIG)
    }
}

fn non_empty(value: &'static str) -> Option<&'static str> {
    (!value.is_empty()).then_some(value)
}

impl From<TomlConfig> for Config {
    fn from(config: TomlConfig) -> Self {
        Config {
            wifi: WifiConfig {
                ssid: config.wifi_ssid,
                psk: config.wifi_psk,
            },
            mqtt: MqttConfig {
                url: config.mqtt_url,
                username: non_empty(config.mqtt_username),
                password: non_empty(config.mqtt_password),
                name: config.name,
                device_id: config.device_id,
                unique_id: config.unique_id,
            },
            tick_interval: Duration::from_millis(config.tick_interval_ms),
            watchdog_timeout: Duration::from_secs(config.watchdog_timeout),
            core: CoreConfig {
                max_battery_charge_kw: config.max_battery_charge_kw,
                min_possible_solar_kw: config.min_possible_solar_kw,
            },
        }
    }
}
