#[toml_cfg::toml_config]
pub struct Config {
    #[default("")]
    wifi_ssid: &'static str,
    #[default("")]
    mqtt_url: &'static str,
}

fn main() {
    if !std::path::Path::new("cfg.toml").exists() {
        panic!("Copy `cfg.toml.example` to `cfg.toml` and fill in the Wi-Fi and MQTT settings");
    }

    if CONFIG.wifi_ssid.is_empty() || CONFIG.mqtt_url.is_empty() {
        panic!("`wifi_ssid` and `mqtt_url` must be set in `cfg.toml`");
    }

    embuild::espidf::sysenv::output();
}
