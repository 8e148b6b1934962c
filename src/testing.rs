//! Host-side stand-ins for the timer service, LED pin, NVS and generator.

use crate::output::OutputDriver;
use crate::remote::Trigger;
use crate::settings::SettingsStore;
use crate::timer::{Alarm, AlarmService};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Schedule {
    Once(Duration),
    Every(Duration),
}

#[derive(Debug, Eq, PartialEq)]
pub struct MockError(pub &'static str);

type Callback = Box<dyn FnMut() + Send>;

/// Time shared by all alarms of one service. Firing an alarm moves it to
/// the alarm's expiry.
type Clock = Arc<Mutex<Duration>>;

#[derive(Default)]
struct AlarmInner {
    callback: Mutex<Option<Callback>>,
    // schedule and expiry
    armed: Mutex<Option<(Schedule, Duration)>>,
    clock: Clock,
    fail_arming: AtomicBool,
    fail_cancelling: AtomicBool,
}

/// Alarm that only fires when a test says so.
#[derive(Clone, Default)]
pub struct MockAlarm(Arc<AlarmInner>);

/// A firing taken off the alarm, its callback not run yet.
#[must_use]
pub struct Dispatched(MockAlarm);

impl Dispatched {
    pub fn run(self) {
        self.0.run_callback();
    }
}

impl MockAlarm {
    /// Runs the callback if the alarm is armed, like the timer expiring.
    pub fn fire(&self) -> bool {
        match self.dispatch() {
            Some(firing) => {
                firing.run();
                true
            }
            None => false,
        }
    }

    /// Expires the alarm without running its callback yet.
    pub fn dispatch(&self) -> Option<Dispatched> {
        let mut armed = self.0.armed.lock().unwrap();
        let (schedule, due) = (*armed)?;

        let mut clock = self.0.clock.lock().unwrap();
        *clock = (*clock).max(due);
        *armed = match schedule {
            Schedule::Once(_) => None,
            Schedule::Every(period) => Some((schedule, due + period)),
        };

        Some(Dispatched(self.clone()))
    }

    fn run_callback(&self) {
        // the callback may re-arm this alarm, so it must run unlocked
        let callback = self.0.callback.lock().unwrap().take();
        if let Some(mut callback) = callback {
            callback();
            *self.0.callback.lock().unwrap() = Some(callback);
        }
    }

    pub fn schedule(&self) -> Option<Schedule> {
        self.0.armed.lock().unwrap().map(|(schedule, _)| schedule)
    }

    pub fn fail_arming(&self, fail: bool) {
        self.0.fail_arming.store(fail, Ordering::SeqCst);
    }

    pub fn fail_cancelling(&self, fail: bool) {
        self.0.fail_cancelling.store(fail, Ordering::SeqCst);
    }

    fn arm(&self, schedule: Schedule, after: Duration) -> Result<(), MockError> {
        if self.0.fail_arming.load(Ordering::SeqCst) {
            return Err(MockError("arm refused"));
        }
        let due = self.now() + after;
        *self.0.armed.lock().unwrap() = Some((schedule, due));
        Ok(())
    }
}

impl Alarm for MockAlarm {
    type Error = MockError;

    fn after(&self, duration: Duration) -> Result<(), Self::Error> {
        self.arm(Schedule::Once(duration), duration)
    }

    fn every(&self, period: Duration) -> Result<(), Self::Error> {
        self.arm(Schedule::Every(period), period)
    }

    fn cancel(&self) -> Result<(), Self::Error> {
        if self.0.fail_cancelling.load(Ordering::SeqCst) {
            return Err(MockError("cancel refused"));
        }
        *self.0.armed.lock().unwrap() = None;
        Ok(())
    }

    fn now(&self) -> Duration {
        *self.0.clock.lock().unwrap()
    }
}

#[derive(Default)]
pub struct MockAlarmService {
    alarms: Mutex<Vec<MockAlarm>>,
    clock: Clock,
    fail_after: Mutex<Option<usize>>,
}

impl MockAlarmService {
    /// Alarms in creation order.
    pub fn alarm_at(&self, index: usize) -> MockAlarm {
        self.alarms.lock().unwrap()[index].clone()
    }

    /// Refuses to create more than `count` alarms.
    pub fn fail_creation_after(&self, count: usize) {
        *self.fail_after.lock().unwrap() = Some(count);
    }
}

impl AlarmService for MockAlarmService {
    type Alarm = MockAlarm;

    fn alarm<F>(&self, callback: F) -> Result<MockAlarm, MockError>
    where
        F: FnMut() + Send + 'static,
    {
        let mut alarms = self.alarms.lock().unwrap();
        if let Some(limit) = *self.fail_after.lock().unwrap() {
            if alarms.len() >= limit {
                return Err(MockError("no free timers"));
            }
        }

        let alarm = MockAlarm(Arc::new(AlarmInner {
            callback: Mutex::new(Some(Box::new(callback))),
            clock: self.clock.clone(),
            ..Default::default()
        }));
        alarms.push(alarm.clone());
        Ok(alarm)
    }
}

/// Remembers every level written to the LED.
#[derive(Default)]
pub struct RecordingOutput {
    levels: Mutex<Vec<bool>>,
}

impl RecordingOutput {
    pub fn last(&self) -> Option<bool> {
        self.levels.lock().unwrap().last().copied()
    }

    pub fn writes(&self) -> usize {
        self.levels.lock().unwrap().len()
    }
}

impl OutputDriver for RecordingOutput {
    fn set(&self, level: bool) {
        self.levels.lock().unwrap().push(level);
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Stored {
    U8(u8),
    U16(u16),
}

/// NVS stand-in. Commits can be made to fail.
#[derive(Default)]
pub struct MemoryStore {
    values: HashMap<String, Stored>,
    pub commits: usize,
    pub fail_reads: bool,
    pub fail_writes: bool,
}

impl MemoryStore {
    pub fn with_u8(mut self, key: &str, value: u8) -> Self {
        self.values.insert(key.to_owned(), Stored::U8(value));
        self
    }

    pub fn with_u16(mut self, key: &str, value: u16) -> Self {
        self.values.insert(key.to_owned(), Stored::U16(value));
        self
    }

    pub fn u8(&self, key: &str) -> Option<u8> {
        match self.values.get(key) {
            Some(Stored::U8(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn u16(&self, key: &str) -> Option<u16> {
        match self.values.get(key) {
            Some(Stored::U16(v)) => Some(*v),
            _ => None,
        }
    }
}

impl SettingsStore for MemoryStore {
    type Error = MockError;

    fn get_u8(&mut self, key: &str) -> Result<Option<u8>, MockError> {
        if self.fail_reads {
            return Err(MockError("read failed"));
        }
        Ok(self.u8(key))
    }

    fn set_u8(&mut self, key: &str, value: u8) -> Result<(), MockError> {
        if self.fail_writes {
            return Err(MockError("write failed"));
        }
        self.values.insert(key.to_owned(), Stored::U8(value));
        Ok(())
    }

    fn get_u16(&mut self, key: &str) -> Result<Option<u16>, MockError> {
        if self.fail_reads {
            return Err(MockError("read failed"));
        }
        Ok(self.u16(key))
    }

    fn set_u16(&mut self, key: &str, value: u16) -> Result<(), MockError> {
        if self.fail_writes {
            return Err(MockError("write failed"));
        }
        self.values.insert(key.to_owned(), Stored::U16(value));
        Ok(())
    }

    fn commit(&mut self) -> Result<(), MockError> {
        if self.fail_writes {
            return Err(MockError("commit failed"));
        }
        self.commits += 1;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Call {
    Start(u64),
    Stop,
    Reconfigure(u64),
}

/// Generator stand-in that records what it was asked to do.
#[derive(Default)]
pub struct RecordingTrigger {
    calls: Mutex<Vec<Call>>,
    failing: AtomicBool,
    attempts: AtomicUsize,
}

impl RecordingTrigger {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) -> Result<(), MockError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(MockError("timer service exhausted"));
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

impl Trigger for RecordingTrigger {
    type Error = MockError;

    fn start(&self, repeat_delay_us: u64) -> Result<(), MockError> {
        self.record(Call::Start(repeat_delay_us))
    }

    fn stop(&self) -> Result<(), MockError> {
        self.record(Call::Stop)
    }

    fn reconfigure(&self, repeat_delay_us: u64) -> Result<(), MockError> {
        self.record(Call::Reconfigure(repeat_delay_us))
    }
}
