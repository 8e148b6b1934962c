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
use esp_idf_svc::{handle::RawHandle, nvs::*};
use esp_idf_sys::*;
use std::ffi::CString;

/// Typed scalar access the stock NVS wrapper lacks.
pub trait NvsScalarExt {
    fn get_u8<'a>(&self, name: &str, out_val: &'a mut u8) -> Result<Option<&'a u8>, EspError>;
    fn set_u8(&self, name: &str, val: u8) -> Result<bool, EspError>;
    fn get_u16<'a>(&self, name: &str, out_val: &'a mut u16) -> Result<Option<&'a u16>, EspError>;
    fn set_u16(&self, name: &str, val: u16) -> Result<bool, EspError>;
    fn commit(&self) -> Result<(), EspError>;
}

fn c_key(name: &str) -> Result<CString, EspError> {
    CString::new(name).map_err(|_| EspError::from_infallible::<ESP_ERR_NVS_INVALID_NAME>())
}

impl<T: NvsPartitionId> NvsScalarExt for EspNvs<T> {
    fn get_u8<'a>(&self, name: &str, out_val: &'a mut u8) -> Result<Option<&'a u8>, EspError> {
        let c_key = c_key(name)?;

        match unsafe { nvs_get_u8(self.handle(), c_key.as_ptr(), out_val as *mut _) } {
            ESP_ERR_NVS_NOT_FOUND => Ok(None),
            err => {
                // bail on error
                esp!(err)?;

                Ok(Some(out_val))
            }
        }
    }

    fn set_u8(&self, name: &str, val: u8) -> Result<bool, EspError> {
        let c_key = c_key(name)?;

        esp!(unsafe { nvs_set_u8(self.handle(), c_key.as_ptr(), val) })?;

        Ok(true)
    }

    fn get_u16<'a>(&self, name: &str, out_val: &'a mut u16) -> Result<Option<&'a u16>, EspError> {
        let c_key = c_key(name)?;

        match unsafe { nvs_get_u16(self.handle(), c_key.as_ptr(), out_val as *mut _) } {
            ESP_ERR_NVS_NOT_FOUND => Ok(None),
            err => {
                // bail on error
                esp!(err)?;

                Ok(Some(out_val))
            }
        }
    }

    fn set_u16(&self, name: &str, val: u16) -> Result<bool, EspError> {
        let c_key = c_key(name)?;

        esp!(unsafe { nvs_set_u16(self.handle(), c_key.as_ptr(), val) })?;

        Ok(true)
    }

    fn commit(&self) -> Result<(), EspError> {
        esp!(unsafe { nvs_commit(self.handle()) })
    }
}
