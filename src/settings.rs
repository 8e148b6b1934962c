use crate::global_settings::{DEFAULT_DELAY_MS, DEFAULT_ENABLED, NVS_DELAY_MS_KEY, NVS_ENABLED_KEY};
use core::fmt::Debug;
use log::*;

/// Scalar key-value storage that survives a power cycle.
///
/// Values written with the setters only become durable after `commit`.
pub trait SettingsStore {
    type Error: Debug;

    fn get_u8(&mut self, key: &str) -> Result<Option<u8>, Self::Error>;
    fn set_u8(&mut self, key: &str, value: u8) -> Result<(), Self::Error>;
    fn get_u16(&mut self, key: &str) -> Result<Option<u16>, Self::Error>;
    fn set_u16(&mut self, key: &str, value: u16) -> Result<(), Self::Error>;
    fn commit(&mut self) -> Result<(), Self::Error>;
}

/// The two values a remote client can change.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RemoteSettings {
    pub enabled: bool,
    pub delay_ms: u16,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            enabled: DEFAULT_ENABLED,
            delay_ms: DEFAULT_DELAY_MS,
        }
    }
}

impl RemoteSettings {
    /// Reads saved settings; anything missing or unreadable keeps its default.
    pub fn load<S: SettingsStore>(store: &mut S) -> Self {
        let defaults = Self::default();

        let enabled = match store.get_u8(NVS_ENABLED_KEY) {
            Ok(Some(v)) => v != 0,
            Ok(None) => {
                warn!("{NVS_ENABLED_KEY} not found, using {}", defaults.enabled);
                defaults.enabled
            }
            Err(e) => {
                error!("reading {NVS_ENABLED_KEY} failed: {e:?}");
                defaults.enabled
            }
        };

        let delay_ms = match store.get_u16(NVS_DELAY_MS_KEY) {
            Ok(Some(v)) => v,
            Ok(None) => {
                warn!("{NVS_DELAY_MS_KEY} not found, using {}", defaults.delay_ms);
                defaults.delay_ms
            }
            Err(e) => {
                error!("reading {NVS_DELAY_MS_KEY} failed: {e:?}");
                defaults.delay_ms
            }
        };

        Self { enabled, delay_ms }
    }

    pub fn repeat_delay_us(&self) -> u64 {
        ms_to_us(self.delay_ms)
    }
}

pub fn ms_to_us(ms: u16) -> u64 {
    u64::from(ms) * 1_000
}

pub fn save_enabled<S: SettingsStore>(store: &mut S, enabled: bool) -> Result<(), S::Error> {
    store.set_u8(NVS_ENABLED_KEY, u8::from(enabled))?;
    store.commit()
}

pub fn save_delay_ms<S: SettingsStore>(store: &mut S, delay_ms: u16) -> Result<(), S::Error> {
    store.set_u16(NVS_DELAY_MS_KEY, delay_ms)?;
    store.commit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;

    #[test]
    fn empty_store_yields_defaults() {
        let mut store = MemoryStore::default();
        assert_eq!(
            RemoteSettings::load(&mut store),
            RemoteSettings {
                enabled: false,
                delay_ms: 10_000
            }
        );
    }

    #[test]
    fn saved_values_are_loaded() {
        let mut store = MemoryStore::default()
            .with_u8(NVS_ENABLED_KEY, 1)
            .with_u16(NVS_DELAY_MS_KEY, 2_500);
        let settings = RemoteSettings::load(&mut store);
        assert!(settings.enabled);
        assert_eq!(settings.delay_ms, 2_500);
        assert_eq!(settings.repeat_delay_us(), 2_500_000);
    }

    #[test]
    fn read_errors_fall_back_to_defaults() {
        let mut store = MemoryStore::default().with_u8(NVS_ENABLED_KEY, 1);
        store.fail_reads = true;
        assert_eq!(RemoteSettings::load(&mut store), RemoteSettings::default());
    }

    #[test]
    fn save_writes_then_commits() {
        let mut store = MemoryStore::default();
        save_enabled(&mut store, true).unwrap();
        save_delay_ms(&mut store, 750).unwrap();
        assert_eq!(store.u8(NVS_ENABLED_KEY), Some(1));
        assert_eq!(store.u16(NVS_DELAY_MS_KEY), Some(750));
        assert_eq!(store.commits, 2);
    }

    #[test]
    fn ms_to_us_covers_full_u16_range() {
        assert_eq!(ms_to_us(0), 0);
        assert_eq!(ms_to_us(u16::MAX), 65_535_000);
    }
}
