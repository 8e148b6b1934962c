use core::fmt::Debug;
use std::time::Duration;

/// A callback timer handed out by an [`AlarmService`].
///
/// Mirrors what the esp_timer service offers: one-shot, periodic, cancel.
/// Arming an already armed alarm replaces the previous schedule.
pub trait Alarm: Send + Sync {
    type Error: Debug;

    fn after(&self, duration: Duration) -> Result<(), Self::Error>;

    fn every(&self, period: Duration) -> Result<(), Self::Error>;

    /// Cancelling an alarm that is not armed is not an error.
    fn cancel(&self) -> Result<(), Self::Error>;

    /// Current time on the clock the alarm expires against.
    fn now(&self) -> Duration;
}

pub trait AlarmService {
    type Alarm: Alarm;

    fn alarm<F>(&self, callback: F) -> Result<Self::Alarm, <Self::Alarm as Alarm>::Error>
    where
        F: FnMut() + Send + 'static;
}
