//! GPIO pin assignments for the Dooropener bridge board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Intercom relay inputs (dry contacts switching 3V3)
// ---------------------------------------------------------------------------

/// Relay 1 input from the intercom (door release output).
pub const RELAY1_INPUT_GPIO: i32 = 4;
/// Relay 2 input from the intercom (bell / light output).
pub const RELAY2_INPUT_GPIO: i32 = 5;
/// Relay inputs read HIGH while the intercom relay is closed.
/// Internal pull-downs keep the line LOW when the contact is open.
pub const RELAY_INPUT_ACTIVE_HIGH: bool = true;

// ---------------------------------------------------------------------------
// Status LEDs (active HIGH, 330 Ω series resistors)
// ---------------------------------------------------------------------------

/// Lit while the life check is in its running phase.
pub const RUN_LED_GPIO: i32 = 6;
/// Lit while the last connectivity probe succeeded.
pub const WLAN_LED_GPIO: i32 = 7;
/// Lit while relay 1 is holding its actor switch on.
pub const RELAY1_LED_GPIO: i32 = 15;
/// Lit while relay 2 is holding its actor switch on.
pub const RELAY2_LED_GPIO: i32 = 16;
/// Lit while the bell is sounding.
pub const BELL_LED_GPIO: i32 = 9;

// ---------------------------------------------------------------------------
// Bell output (MOSFET driving a 12 V gong)
// ---------------------------------------------------------------------------

pub const BELL_OUTPUT_GPIO: i32 = 8;

/// All push-pull outputs, in initialisation order.
pub const OUTPUT_GPIOS: [i32; 6] = [
    RUN_LED_GPIO,
    WLAN_LED_GPIO,
    RELAY1_LED_GPIO,
    RELAY2_LED_GPIO,
    BELL_LED_GPIO,
    BELL_OUTPUT_GPIO,
];

/// Relay input pins, indexed by relay slot.
pub const RELAY_INPUT_GPIOS: [i32; 2] = [RELAY1_INPUT_GPIO, RELAY2_INPUT_GPIO];
