use std::sync::Arc;

/// A single digital output the IR LED hangs off.
///
/// `set` is called from timer callback context, so implementations must not
/// block and have no error path.
pub trait OutputDriver: Send + Sync {
    fn set(&self, level: bool);
}

impl<T: OutputDriver + ?Sized> OutputDriver for Arc<T> {
    fn set(&self, level: bool) {
        (**self).set(level)
    }
}

/// Modulated LED level: carrier gated by the pulse envelope.
#[inline(always)]
pub fn combine(carrier_phase: bool, pulse_level: bool) -> bool {
    carrier_phase && pulse_level
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn led_only_lights_on_carrier_high_inside_a_pulse() {
        assert!(combine(true, true));
        assert!(!combine(true, false));
        assert!(!combine(false, true));
        assert!(!combine(false, false));
    }
}
