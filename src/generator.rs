/*
 * Nikon IR Remote
 *
 * MIT license
 *
 * Copyright (c) 2021-2023 Michael Zill
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 *
 * Apache license, Version 2.0
 *
 * Copyright (c) 2021-2023 Michael Zill
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Pulse-train signal generator.
//!
//! Two timers drive the LED. The carrier timer fires periodically and flips
//! the carrier phase, the pulse timer is a one-shot that re-arms itself for
//! every step of the [`PulseTable`]. Each of them re-evaluates the LED level
//! as `carrier_phase && pulse_level` right after changing its input.
//!
//! Timer callbacks only ever touch atomics. Start, stop and reconfigure are
//! serialized by a control lock that the callbacks never take.

use crate::errors::{GeneratorError, TimerRole};
use crate::global_settings::{CARRIER_FREQUENCY_HZ, START_DELAY_MS};
use crate::output::{combine, OutputDriver};
use crate::pulse::{Level, PulseTable, Step, STEP_COUNT};
use crate::timer::{Alarm, AlarmService};
use core::cell::Cell;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use critical_section::Mutex as CsMutex;
use log::*;
use once_cell::sync::OnceCell;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct GeneratorConfig {
    pub carrier_frequency_hz: u32,
    /// Carrier only, before the first header edge after a start.
    pub start_delay: Duration,
}

impl GeneratorConfig {
    pub fn carrier_period(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.carrier_frequency_hz.max(1)))
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            carrier_frequency_hz: CARRIER_FREQUENCY_HZ,
            start_delay: Duration::from_millis(START_DELAY_MS),
        }
    }
}

/// Point-in-time copy of the generator state.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Snapshot {
    pub carrier_phase: bool,
    pub pulse_level: bool,
    /// Step the sequencer applies on its next firing.
    pub step_index: usize,
    /// Step most recently applied, `None` until the first firing after a start.
    pub applied_step: Option<usize>,
    pub running: bool,
}

#[derive(Default)]
struct GeneratorState {
    carrier_phase: AtomicBool,
    pulse_level: AtomicBool,
    step_index: AtomicUsize,
    applied: AtomicBool,
    running: AtomicBool,
    // callbacks currently executing past their `running` check
    in_flight: AtomicUsize,
}

impl GeneratorState {
    fn rewind(&self) {
        self.pulse_level.store(false, Ordering::SeqCst);
        self.step_index.store(0, Ordering::SeqCst);
        self.applied.store(false, Ordering::SeqCst);
    }

    /// Moves the cursor forward and returns the step to apply now.
    fn advance(&self) -> usize {
        let index = self.step_index.load(Ordering::SeqCst);
        self.step_index.store((index + 1) % STEP_COUNT, Ordering::SeqCst);
        self.applied.store(true, Ordering::SeqCst);
        index
    }

    fn snapshot(&self) -> Snapshot {
        let step_index = self.step_index.load(Ordering::SeqCst);
        Snapshot {
            carrier_phase: self.carrier_phase.load(Ordering::SeqCst),
            pulse_level: self.pulse_level.load(Ordering::SeqCst),
            step_index,
            applied_step: self
                .applied
                .load(Ordering::SeqCst)
                .then(|| (step_index + STEP_COUNT - 1) % STEP_COUNT),
            running: self.running.load(Ordering::SeqCst),
        }
    }
}

// Counts a callback as in flight for as long as it is alive.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Live pulse table. Only the repeat gap changes, and only between runs.
struct PulseSequencer {
    table: CsMutex<Cell<PulseTable>>,
}

impl PulseSequencer {
    fn new() -> Self {
        Self {
            table: CsMutex::new(Cell::new(PulseTable::default())),
        }
    }

    fn step(&self, index: usize) -> Step {
        self.table().step(index)
    }

    fn table(&self) -> PulseTable {
        critical_section::with(|cs| self.table.borrow(cs).get())
    }

    fn set_repeat_gap_us(&self, repeat_gap_us: u64) {
        critical_section::with(|cs| {
            let cell = self.table.borrow(cs);
            let mut table = cell.get();
            table.set_repeat_gap_us(repeat_gap_us);
            cell.set(table);
        });
    }
}

const PULSE_DISARMED: u64 = u64::MAX;

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

// Everything the timer callbacks can reach.
struct Shared<O, A> {
    state: GeneratorState,
    sequencer: PulseSequencer,
    output: O,
    pulse_timer: A,
    // clock reading the armed pulse firing is due at
    pulse_due_us: CsMutex<Cell<u64>>,
}

impl<O: OutputDriver, A: Alarm> Shared<O, A> {
    fn enter(&self) -> Option<InFlight<'_>> {
        self.state.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlight(&self.state.in_flight);

        self.state.running.load(Ordering::SeqCst).then_some(guard)
    }

    fn update_led(&self) {
        self.output.set(combine(
            self.state.carrier_phase.load(Ordering::SeqCst),
            self.state.pulse_level.load(Ordering::SeqCst),
        ));
    }

    fn pulse_due_us(&self) -> u64 {
        critical_section::with(|cs| self.pulse_due_us.borrow(cs).get())
    }

    fn set_pulse_due_us(&self, due_us: u64) {
        critical_section::with(|cs| self.pulse_due_us.borrow(cs).set(due_us));
    }

    fn arm_pulse(&self, hold: Duration) -> Result<(), A::Error> {
        // recorded first, the firing may run on the other core before `after` returns
        let due_us = micros(self.pulse_timer.now()).saturating_add(micros(hold));
        self.set_pulse_due_us(due_us);

        self.pulse_timer.after(hold).map_err(|e| {
            self.set_pulse_due_us(PULSE_DISARMED);
            e
        })
    }

    fn disarm_pulse(&self) -> Result<(), A::Error> {
        self.set_pulse_due_us(PULSE_DISARMED);
        self.pulse_timer.cancel()
    }

    fn on_carrier(&self) {
        let Some(_in_flight) = self.enter() else {
            return;
        };

        self.state.carrier_phase.fetch_xor(true, Ordering::SeqCst);
        self.update_led();
    }

    fn on_pulse(&self) {
        let Some(_in_flight) = self.enter() else {
            return;
        };

        // A firing already taken off the timer queue when the generator was
        // stopped runs late, possibly into the next run. It is not due there.
        if micros(self.pulse_timer.now()) < self.pulse_due_us() {
            debug!("dropping pulse firing of an earlier run");
            return;
        }

        let index = self.state.advance();
        let step = self.sequencer.step(index);

        self.state
            .pulse_level
            .store(step.level == Level::On, Ordering::SeqCst);
        self.update_led();

        if let Err(e) = self.arm_pulse(Duration::from_micros(step.hold_us)) {
            // The train can't be resumed mid-sequence, keep the LED dark
            // until the next start
            error!("pulse step {index}: failed to re-arm pulse timer: {e:?}");
            self.state.pulse_level.store(false, Ordering::SeqCst);
            self.update_led();
        }
    }
}

pub struct Generator<O, A> {
    shared: Arc<Shared<O, A>>,
    carrier_timer: A,
    config: GeneratorConfig,
    control: Mutex<()>,
}

impl<O, A> Generator<O, A>
where
    O: OutputDriver + 'static,
    A: Alarm + 'static,
{
    pub fn new<S>(
        service: &S,
        output: O,
        config: GeneratorConfig,
    ) -> Result<Self, GeneratorError<A::Error>>
    where
        S: AlarmService<Alarm = A>,
    {
        output.set(false);

        // Filled in once the state exists, callbacks do nothing until then
        let link: Arc<OnceCell<Weak<Shared<O, A>>>> = Arc::default();

        let carrier_link = link.clone();
        let carrier_timer = service
            .alarm(move || with_shared(&carrier_link, Shared::on_carrier))
            .map_err(|e| GeneratorError::Setup(TimerRole::Carrier, e))?;

        let pulse_link = link.clone();
        let pulse_timer = service
            .alarm(move || with_shared(&pulse_link, Shared::on_pulse))
            .map_err(|e| GeneratorError::Setup(TimerRole::Pulse, e))?;

        let shared = Arc::new(Shared {
            state: GeneratorState::default(),
            sequencer: PulseSequencer::new(),
            output,
            pulse_timer,
            pulse_due_us: CsMutex::new(Cell::new(PULSE_DISARMED)),
        });
        link.get_or_init(|| Arc::downgrade(&shared));

        info!(
            "generator ready, carrier period {:?}, start delay {:?}",
            config.carrier_period(),
            config.start_delay
        );

        Ok(Self {
            shared,
            carrier_timer,
            config,
            control: Mutex::new(()),
        })
    }

    /// Starts the trigger train with `repeat_delay_us` between trains.
    ///
    /// Already running generators are restarted from the header pulse.
    pub fn start(&self, repeat_delay_us: u64) -> Result<(), GeneratorError<A::Error>> {
        let _control = self.lock();
        self.start_locked(repeat_delay_us)
    }

    /// Stops both timers and turns the LED off. Stopping twice is harmless.
    pub fn stop(&self) -> Result<(), GeneratorError<A::Error>> {
        let _control = self.lock();
        self.stop_locked()
    }

    /// Changes the repeat gap; the train restarts at the header pulse.
    pub fn reconfigure(&self, repeat_delay_us: u64) -> Result<(), GeneratorError<A::Error>> {
        let _control = self.lock();
        self.stop_locked()?;
        self.start_locked(repeat_delay_us)
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.running.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.shared.state.snapshot()
    }

    pub fn table(&self) -> PulseTable {
        self.shared.sequencer.table()
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_locked(&self, repeat_delay_us: u64) -> Result<(), GeneratorError<A::Error>> {
        info!("start, repeat delay {repeat_delay_us}us");

        self.stop_locked()?;

        let state = &self.shared.state;
        self.shared.sequencer.set_repeat_gap_us(repeat_delay_us);
        state.rewind();
        state.running.store(true, Ordering::SeqCst);

        if let Err(e) = self.carrier_timer.every(self.config.carrier_period()) {
            self.abort_start();
            return Err(GeneratorError::Arm(TimerRole::Carrier, e));
        }

        if let Err(e) = self.shared.arm_pulse(self.config.start_delay) {
            self.abort_start();
            return Err(GeneratorError::Arm(TimerRole::Pulse, e));
        }

        Ok(())
    }

    fn stop_locked(&self) -> Result<(), GeneratorError<A::Error>> {
        let was_running = self.shared.state.running.swap(false, Ordering::SeqCst);
        self.quiesce();

        self.carrier_timer
            .cancel()
            .map_err(|e| GeneratorError::Cancel(TimerRole::Carrier, e))?;
        self.shared
            .disarm_pulse()
            .map_err(|e| GeneratorError::Cancel(TimerRole::Pulse, e))?;

        self.shared.output.set(false);

        if was_running {
            info!("stopped");
        }

        Ok(())
    }

    // Leaves both timers disarmed after a partially failed start.
    fn abort_start(&self) {
        self.shared.state.running.store(false, Ordering::SeqCst);
        self.quiesce();

        if let Err(e) = self.carrier_timer.cancel() {
            error!("failed to cancel carrier timer: {e:?}");
        }
        if let Err(e) = self.shared.disarm_pulse() {
            error!("failed to cancel pulse timer: {e:?}");
        }

        self.shared.output.set(false);
    }

    // Waits for callbacks that passed their `running` check before it was
    // cleared. The timer task outranks the control path, so this only spins
    // while a callback runs on the other core.
    fn quiesce(&self) {
        while self.shared.state.in_flight.load(Ordering::SeqCst) != 0 {
            core::hint::spin_loop();
        }
    }
}

fn with_shared<O, A>(link: &OnceCell<Weak<Shared<O, A>>>, f: fn(&Shared<O, A>)) {
    if let Some(shared) = link.get().and_then(Weak::upgrade) {
        f(&shared);
    }
}
