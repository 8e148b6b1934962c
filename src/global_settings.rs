// Carrier the receiver's band-pass detector is tuned to [Hz]
pub const CARRIER_FREQUENCY_HZ: u32 = 38_000;
// Time the carrier runs before the first pulse edge after a start [ms]
pub const START_DELAY_MS: u64 = 5_000;
// Subtracted from every fixed pulse width to absorb callback dispatch [us]
pub const LATENCY_CORRECTION_US: u32 = 10;

// Values used when the store has nothing saved yet
pub const DEFAULT_ENABLED: bool = false;
pub const DEFAULT_DELAY_MS: u16 = 10_000;

pub const NVS_NAMESPACE: &str = "nikon_ir_remote";
pub const NVS_ENABLED_KEY: &str = "nir_enabled";
pub const NVS_DELAY_MS_KEY: &str = "nir_delayms";
