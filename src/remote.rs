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
use crate::generator::Generator;
use crate::errors::GeneratorError;
use crate::output::OutputDriver;
use crate::settings::{self, ms_to_us, RemoteSettings, SettingsStore};
use crate::timer::Alarm;
use core::fmt::Debug;
use log::*;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Whatever turns the trigger train on and off.
pub trait Trigger {
    type Error: Debug;

    fn start(&self, repeat_delay_us: u64) -> Result<(), Self::Error>;
    fn stop(&self) -> Result<(), Self::Error>;
    fn reconfigure(&self, repeat_delay_us: u64) -> Result<(), Self::Error>;
}

impl<O, A> Trigger for Generator<O, A>
where
    O: OutputDriver + 'static,
    A: Alarm + 'static,
{
    type Error = GeneratorError<A::Error>;

    fn start(&self, repeat_delay_us: u64) -> Result<(), Self::Error> {
        Generator::start(self, repeat_delay_us)
    }

    fn stop(&self) -> Result<(), Self::Error> {
        Generator::stop(self)
    }

    fn reconfigure(&self, repeat_delay_us: u64) -> Result<(), Self::Error> {
        Generator::reconfigure(self, repeat_delay_us)
    }
}

struct Inner<S> {
    store: S,
    settings: RemoteSettings,
}

/// Application state behind the control channel: the enabled flag and the
/// repeat delay, kept in sync with the trigger and the settings store.
pub struct Remote<T, S> {
    trigger: T,
    inner: Mutex<Inner<S>>,
}

impl<T: Trigger, S: SettingsStore> Remote<T, S> {
    pub fn new(trigger: T, store: S) -> Self {
        Self {
            trigger,
            inner: Mutex::new(Inner {
                store,
                settings: RemoteSettings::default(),
            }),
        }
    }

    /// Restores the saved settings and starts the trigger once if it was
    /// enabled before the power cycle.
    pub fn bring_up(&self) -> Result<RemoteSettings, T::Error> {
        let mut inner = self.lock();
        let saved = RemoteSettings::load(&mut inner.store);
        info!(
            "restored settings: enabled {}, delay {}ms",
            saved.enabled, saved.delay_ms
        );

        if saved.enabled {
            self.trigger.start(saved.repeat_delay_us())?;
        }
        inner.settings = saved;

        Ok(saved)
    }

    pub fn settings(&self) -> RemoteSettings {
        self.lock().settings
    }

    pub fn enabled(&self) -> bool {
        self.settings().enabled
    }

    pub fn delay_ms(&self) -> u16 {
        self.settings().delay_ms
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<(), T::Error> {
        let mut inner = self.lock();
        info!("set_enabled({}): {}", inner.settings.enabled, enabled);

        if inner.settings.enabled == enabled {
            return Ok(());
        }

        if enabled {
            self.trigger.start(ms_to_us(inner.settings.delay_ms))?;
        } else {
            self.trigger.stop()?;
        }
        inner.settings.enabled = enabled;

        if let Err(e) = settings::save_enabled(&mut inner.store, enabled) {
            warn!("failed to persist enabled flag: {e:?}");
        }

        Ok(())
    }

    pub fn set_delay_ms(&self, delay_ms: u16) -> Result<(), T::Error> {
        let mut inner = self.lock();
        info!("set_delay_ms({}): {}", inner.settings.delay_ms, delay_ms);

        if inner.settings.delay_ms == delay_ms {
            return Ok(());
        }

        if inner.settings.enabled {
            self.trigger.reconfigure(ms_to_us(delay_ms))?;
        }
        inner.settings.delay_ms = delay_ms;

        if let Err(e) = settings::save_delay_ms(&mut inner.store, delay_ms) {
            warn!("failed to persist delay: {e:?}");
        }

        Ok(())
    }

    pub fn trigger(&self) -> &T {
        &self.trigger
    }

    /// Runs `f` against the settings store, e.g. to inspect it.
    pub fn with_store<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.lock().store)
    }

    fn lock(&self) -> MutexGuard<'_, Inner<S>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
