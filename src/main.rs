#[cfg(target_os = "espidf")]
use esp_idf_sys as _; // If using the `binstart` feature of `esp-idf-sys`, always keep this module imported

#[cfg(target_os = "espidf")]
esp_idf_sys::esp_app_desc!();

#[toml_cfg::toml_config]
pub struct Config {
    #[default(10)]
    serial_wait_secs: u32,
    #[default(5000)]
    start_delay_ms: u64,
    #[default(38000)]
    carrier_frequency_hz: u32,
}

#[cfg(target_os = "espidf")]
fn main() -> Result<(), nikon_ir_remote::errors::InitError> {
    firmware::run()
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!(
        "nikon-ir-remote is ESP32 firmware (serial wait {}s, start delay {}ms, carrier {}Hz); build it for an espidf target",
        CONFIG.serial_wait_secs, CONFIG.start_delay_ms, CONFIG.carrier_frequency_hz
    );
}

#[cfg(target_os = "espidf")]
mod firmware {
    use super::CONFIG;
    use esp_idf_sys::{self as sys, esp_chip_info_t, CHIP_FEATURE_BLE, CHIP_FEATURE_BT};
    use log::*;
    use nikon_ir_remote::errors::InitError;
    use nikon_ir_remote::global_settings::NVS_NAMESPACE;
    use nikon_ir_remote::peripherals::SystemPeripherals;
    use nikon_ir_remote::services::{ble, ir_led::IrLed, nvs::NvsSettings, timer::IdfAlarmService};
    use nikon_ir_remote::{Generator, GeneratorConfig, Remote};
    use std::sync::Arc;
    use std::time::Duration;

    pub fn run() -> Result<(), InitError> {
        sys::link_patches();
        esp_idf_hal::task::critical_section::link();
        esp_idf_svc::log::EspLogger::initialize_default();

        wait_for_serial(CONFIG.serial_wait_secs);
        info!("Nikon IR remote starting");
        log_chip_info();

        let peripherals = SystemPeripherals::take().ok_or(InitError::PeripheralsTaken)?;
        let ir_led = IrLed::configure(peripherals.ir_led)?;

        let generator = Generator::new(
            &IdfAlarmService::new()?,
            ir_led,
            GeneratorConfig {
                carrier_frequency_hz: CONFIG.carrier_frequency_hz,
                start_delay: Duration::from_millis(CONFIG.start_delay_ms),
            },
        )?;

        let settings = NvsSettings::take(NVS_NAMESPACE)?;
        let remote = Arc::new(Remote::new(generator, settings));
        let restored = remote.bring_up()?;
        info!(
            "bring-up done, trigger {}",
            if restored.enabled { "enabled" } else { "disabled" }
        );

        ble::serve(remote.clone())?;

        // Timers and the BLE host task run the remote from here on, this task only reports
        loop {
            std::thread::sleep(Duration::from_secs(3600));
            debug!("remote settings {:?}", remote.settings());
        }
    }

    fn wait_for_serial(seconds: u32) {
        for i in (0..=seconds).rev() {
            info!("Waiting to start in {i} seconds...");
            std::thread::sleep(Duration::from_secs(1));
        }
    }

    fn log_chip_info() {
        let mut chip_info = esp_chip_info_t::default();
        unsafe { sys::esp_chip_info(&mut chip_info) };

        info!(
            "ESP32 w/{} cores, WiFi{}{}, silicon revision {}",
            chip_info.cores,
            if chip_info.features & CHIP_FEATURE_BT != 0 { "/BT" } else { "" },
            if chip_info.features & CHIP_FEATURE_BLE != 0 { "/BLE" } else { "" },
            chip_info.revision
        );
    }
}
