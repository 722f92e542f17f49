//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements            | Connects to                  |
//! |-------------|-----------------------|------------------------------|
//! | `hardware`  | RelayInputPort        | relay input GPIOs + ISR latch|
//! |             | IndicatorPort         | LED and bell GPIOs           |
//! | `http`      | HttpClientPort        | `EspHttpConnection`          |
//! | `log_sink`  | EventSink             | Serial log output            |
//! | `nvs`       | ConfigPort            | NVS / in-memory store        |
//! |             | StoragePort           |                              |
//! | `system`    | SystemPort            | `esp_restart`                |
//! | `wifi`      | ConnectivityPort      | ESP-IDF WiFi STA             |
//! | `time`      | (free functions)      | ESP32 high-resolution timer  |
//! | `device_id` | (free functions)      | eFuse factory MAC            |

pub mod device_id;
pub mod hardware;
pub mod http;
pub mod log_sink;
pub mod nvs;
pub mod system;
pub mod time;
pub mod wifi;
