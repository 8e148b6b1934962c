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

pub mod timer {
    use crate::timer::{Alarm, AlarmService};
    use esp_idf_svc::timer::*;
    use esp_idf_sys::EspError;
    use std::time::Duration;

    /// Hands out esp_timer backed alarms. Callbacks run in the esp_timer task.
    pub struct IdfAlarmService {
        service: EspTaskTimerService,
    }

    impl IdfAlarmService {
        pub fn new() -> Result<Self, EspError> {
            Ok(Self {
                service: EspTimerService::new()?,
            })
        }
    }

    impl AlarmService for IdfAlarmService {
        type Alarm = IdfAlarm;

        fn alarm<F>(&self, callback: F) -> Result<IdfAlarm, EspError>
        where
            F: FnMut() + Send + 'static,
        {
            Ok(IdfAlarm(self.service.timer(callback)?))
        }
    }

    pub struct IdfAlarm(EspTimer);

    // esp_timer_start_*/esp_timer_stop may be called from any task
    unsafe impl Sync for IdfAlarm {}

    impl Alarm for IdfAlarm {
        type Error = EspError;

        fn after(&self, duration: Duration) -> Result<(), EspError> {
            self.0.after(duration)
        }

        fn every(&self, period: Duration) -> Result<(), EspError> {
            self.0.every(period)
        }

        fn cancel(&self) -> Result<(), EspError> {
            self.0.cancel().map(|_| ())
        }

        fn now(&self) -> Duration {
            Duration::from_micros(unsafe { esp_idf_sys::esp_timer_get_time() } as u64)
        }
    }
}

pub mod ir_led {
    use crate::output::OutputDriver;
    use crate::peripherals::IrLedPeripherals;
    use esp_idf_hal::gpio::*;
    use esp_idf_sys::*;

    pub struct IrLed {
        _pin: PinDriver<'static, AnyOutputPin, Output>,
        gpio: gpio_num_t,
    }

    impl IrLed {
        /// Puts the LED pin in output mode, driven low.
        pub fn configure(peripherals: IrLedPeripherals) -> Result<Self, EspError> {
            let mut pin = PinDriver::output(peripherals.pin)?;
            pin.set_low()?;
            let gpio = pin.pin();

            Ok(IrLed { _pin: pin, gpio })
        }
    }

    // The driver is only kept to hold the pin configuration; levels are
    // written with gpio_set_level, which is safe from any context
    unsafe impl Sync for IrLed {}

    impl OutputDriver for IrLed {
        #[inline(always)]
        fn set(&self, level: bool) {
            unsafe {
                gpio_set_level(self.gpio, u32::from(level));
            }
        }
    }
}

pub mod nvs {
    use crate::settings::SettingsStore;
    use crate::utils::nvs_ext::NvsScalarExt;
    use esp_idf_svc::nvs::*;
    use esp_idf_sys::EspError;
    use log::*;

    /// Settings kept in a namespace of the default NVS partition.
    pub struct NvsSettings {
        nvs: EspDefaultNvs,
    }

    impl NvsSettings {
        pub fn take(namespace: &str) -> Result<Self, EspError> {
            let partition = EspDefaultNvsPartition::take()?;
            info!("opening nvs namespace {namespace}");
            Ok(Self {
                nvs: EspDefaultNvs::new(partition, namespace, true)?,
            })
        }
    }

    impl SettingsStore for NvsSettings {
        type Error = EspError;

        fn get_u8(&mut self, key: &str) -> Result<Option<u8>, EspError> {
            let mut value = 0;
            Ok(NvsScalarExt::get_u8(&self.nvs, key, &mut value)?.copied())
        }

        fn set_u8(&mut self, key: &str, value: u8) -> Result<(), EspError> {
            NvsScalarExt::set_u8(&self.nvs, key, value).map(|_| ())
        }

        fn get_u16(&mut self, key: &str) -> Result<Option<u16>, EspError> {
            let mut value = 0;
            Ok(NvsScalarExt::get_u16(&self.nvs, key, &mut value)?.copied())
        }

        fn set_u16(&mut self, key: &str, value: u16) -> Result<(), EspError> {
            NvsScalarExt::set_u16(&self.nvs, key, value).map(|_| ())
        }

        fn commit(&mut self) -> Result<(), EspError> {
            NvsScalarExt::commit(&self.nvs)
        }
    }
}

pub mod ble {
    use crate::control::{self, Access, Characteristic, DEVICE_NAME, SERVICE_UUID};
    use crate::remote::{Remote, Trigger};
    use crate::settings::SettingsStore;
    use esp32_nimble::utilities::BleUuid;
    use esp32_nimble::{BLEAdvertisementData, BLEDevice, BLEError, NimbleProperties};
    use log::*;
    use std::sync::Arc;

    /// Publishes the remote settings as a GATT service and advertises it.
    ///
    /// The NimBLE host runs in its own task. Advertising resumes whenever a
    /// client disconnects or a connection attempt fails.
    pub fn serve<T, S>(remote: Arc<Remote<T, S>>) -> Result<(), BLEError>
    where
        T: Trigger + Send + Sync + 'static,
        S: SettingsStore + Send + 'static,
    {
        let device = BLEDevice::take();
        let server = device.get_server();

        server.on_connect(|_server, desc| {
            info!("client {:?} connected", desc.address());
        });
        server.on_disconnect(|desc, reason| {
            info!("client {:?} disconnected: {reason:?}", desc.address());
        });

        let service = server.create_service(BleUuid::from_uuid128(SERVICE_UUID));

        for characteristic in Characteristic::ALL {
            let attribute = service.lock().create_characteristic(
                BleUuid::from_uuid128(characteristic.uuid()),
                NimbleProperties::READ | NimbleProperties::WRITE,
            );

            let reader = remote.clone();
            let writer = remote.clone();
            attribute
                .lock()
                .on_read(move |value, _desc| {
                    match control::access(&reader, characteristic, Access::Read) {
                        Ok(read) => {
                            value.set_value(&read);
                        }
                        Err(e) => error!("{characteristic:?}: {e}"),
                    }
                })
                .on_write(move |args| {
                    let written = Access::Write(args.recv_data());
                    if let Err(e) = control::access(&writer, characteristic, written) {
                        args.reject_with_error_code(e.code());
                    }
                });
        }

        let advertising = device.get_advertising();
        advertising.lock().set_data(
            BLEAdvertisementData::new()
                .name(DEVICE_NAME)
                .add_service_uuid(BleUuid::from_uuid128(SERVICE_UUID)),
        )?;
        advertising.lock().start()?;
        info!("advertising as {DEVICE_NAME}");

        Ok(())
    }
}
