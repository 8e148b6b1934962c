use esp_idf_hal::gpio::*;
use esp_idf_hal::peripherals::Peripherals;

pub struct SystemPeripherals {
    pub ir_led: IrLedPeripherals,
}

impl SystemPeripherals {
    pub fn take() -> Option<Self> {
        let peripherals = Peripherals::take()?;

        Some(SystemPeripherals {
            ir_led: IrLedPeripherals {
                pin: peripherals.pins.gpio1.into(),
            },
        })
    }
}

pub struct IrLedPeripherals {
    pub pin: AnyOutputPin,
}
