use core::fmt;

#[cfg(target_os = "espidf")]
use esp32_nimble::BLEError;
#[cfg(target_os = "espidf")]
use esp_idf_sys::EspError;

/// Which of the two generator timers an error refers to.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TimerRole {
    Carrier,
    Pulse,
}

impl fmt::Display for TimerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Carrier => write!(f, "carrier timer"),
            Self::Pulse => write!(f, "pulse timer"),
        }
    }
}

#[derive(Debug)]
pub enum GeneratorError<E> {
    Setup(TimerRole, E),
    Arm(TimerRole, E),
    Cancel(TimerRole, E),
}

impl<E: fmt::Debug> fmt::Display for GeneratorError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup(role, e) => write!(f, "Failed to create {role}: {e:?}"),
            Self::Arm(role, e) => write!(f, "Failed to arm {role}: {e:?}"),
            Self::Cancel(role, e) => write!(f, "Failed to cancel {role}: {e:?}"),
        }
    }
}

impl<E: fmt::Debug> std::error::Error for GeneratorError<E> {}

#[cfg(target_os = "espidf")]
#[derive(Debug)]
#[allow(clippy::enum_variant_names)]
pub enum InitError {
    EspError(EspError),
    GeneratorError(GeneratorError<EspError>),
    BleError(BLEError),
    PeripheralsTaken,
}

#[cfg(target_os = "espidf")]
impl From<EspError> for InitError {
    fn from(e: EspError) -> Self {
        Self::EspError(e)
    }
}

#[cfg(target_os = "espidf")]
impl From<GeneratorError<EspError>> for InitError {
    fn from(e: GeneratorError<EspError>) -> Self {
        Self::GeneratorError(e)
    }
}

#[cfg(target_os = "espidf")]
impl From<BLEError> for InitError {
    fn from(e: BLEError) -> Self {
        Self::BleError(e)
    }
}
