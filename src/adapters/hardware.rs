//! Hardware adapter: relay inputs, status LEDs and the bell output.
//!
//! [`HardwareAdapter`] owns every board-facing driver and implements the
//! [`RelayInputPort`] and [`IndicatorPort`] traits, so the
//! [`AppService`](crate::app::service::AppService) sees the board only
//! through ports.
//!
//! ```text
//!   AppService ──▶ RelayInputPort ──▶ HardwareAdapter ──▶ RelayInput ×2
//!              ──▶ IndicatorPort  ──▶                 ──▶ StatusLed ×5, BellDriver
//! ```

use embedded_hal::digital::{InputPin, OutputPin};

use crate::app::ports::{Indicator, IndicatorPort, RelayInputPort};
use crate::drivers::bell::BellDriver;
use crate::drivers::hw_init::RawGpio;
use crate::drivers::relay_input::RelayInput;
use crate::drivers::status_led::StatusLed;
use crate::pins;
use crate::relay::RelayId;

/// The five indicator LEDs.
pub struct IndicatorLeds<O: OutputPin> {
    pub run: StatusLed<O>,
    pub wlan: StatusLed<O>,
    pub relays: [StatusLed<O>; 2],
    pub bell: StatusLed<O>,
}

pub struct HardwareAdapter<I: InputPin, O: OutputPin> {
    inputs: [RelayInput<I>; 2],
    leds: IndicatorLeds<O>,
    bell: BellDriver<O>,
}

impl<I: InputPin, O: OutputPin> HardwareAdapter<I, O> {
    pub fn new(inputs: [RelayInput<I>; 2], leds: IndicatorLeds<O>, bell: BellDriver<O>) -> Self {
        Self { inputs, leds, bell }
    }

    /// Apply a new debounce window to both relay inputs.
    pub fn set_debounce_ms(&mut self, debounce_ms: u32) {
        for input in &mut self.inputs {
            input.set_debounce_ms(debounce_ms);
        }
    }

    pub fn indicator_lit(&self, indicator: Indicator) -> bool {
        self.led(indicator).is_lit()
    }

    pub fn bell_sounding(&self) -> bool {
        self.bell.is_sounding()
    }

    fn led(&self, indicator: Indicator) -> &StatusLed<O> {
        match indicator {
            Indicator::Run => &self.leds.run,
            Indicator::Wlan => &self.leds.wlan,
            Indicator::Relay(id) => &self.leds.relays[id.index()],
            Indicator::Bell => &self.leds.bell,
        }
    }

    fn led_mut(&mut self, indicator: Indicator) -> &mut StatusLed<O> {
        match indicator {
            Indicator::Run => &mut self.leds.run,
            Indicator::Wlan => &mut self.leds.wlan,
            Indicator::Relay(id) => &mut self.leds.relays[id.index()],
            Indicator::Bell => &mut self.leds.bell,
        }
    }
}

impl HardwareAdapter<RawGpio, RawGpio> {
    /// Wire the drivers to the GPIOs in [`pins`].  Requires
    /// [`init_peripherals`](crate::drivers::hw_init::init_peripherals) first.
    pub fn with_board_pins(debounce_ms: u32) -> Self {
        let input = |index: usize| {
            RelayInput::new(
                RawGpio::new(pins::RELAY_INPUT_GPIOS[index]),
                Some(index),
                pins::RELAY_INPUT_ACTIVE_HIGH,
                debounce_ms,
            )
        };
        let leds = IndicatorLeds {
            run: StatusLed::new(RawGpio::new(pins::RUN_LED_GPIO), "run"),
            wlan: StatusLed::new(RawGpio::new(pins::WLAN_LED_GPIO), "wlan"),
            relays: [
                StatusLed::new(RawGpio::new(pins::RELAY1_LED_GPIO), "relay 1"),
                StatusLed::new(RawGpio::new(pins::RELAY2_LED_GPIO), "relay 2"),
            ],
            bell: StatusLed::new(RawGpio::new(pins::BELL_LED_GPIO), "bell"),
        };
        Self::new(
            [input(0), input(1)],
            leds,
            BellDriver::new(RawGpio::new(pins::BELL_OUTPUT_GPIO)),
        )
    }
}

impl<I: InputPin, O: OutputPin> RelayInputPort for HardwareAdapter<I, O> {
    fn poll_press(&mut self, relay: RelayId, now_ms: u64) -> bool {
        // Inputs keep a wrapping u32 ms clock, same as the ISR latch.
        self.inputs[relay.index()].poll(now_ms as u32)
    }
}

impl<I: InputPin, O: OutputPin> IndicatorPort for HardwareAdapter<I, O> {
    fn set_indicator(&mut self, indicator: Indicator, on: bool) {
        self.led_mut(indicator).set(on);
    }

    fn set_bell_output(&mut self, on: bool) {
        self.bell.set(on);
    }

    fn all_off(&mut self) {
        self.leds.run.off();
        self.leds.wlan.off();
        for led in &mut self.leds.relays {
            led.off();
        }
        self.leds.bell.off();
        self.bell.set(false);
    }
}
