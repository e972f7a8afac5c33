//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter         | Implements         | Connects to                  |
//! |-----------------|--------------------|------------------------------|
//! | `collaborators` | EventSink          | Notifier + DisplayPort       |
//! | `log_sink`      | EventSink          | `log` facade                 |
//! |                 | Notifier           |                              |
//! |                 | DisplayPort        |                              |
//! | `replay`        | TransportPort      | JSON-lines capture file      |

pub mod collaborators;
pub mod log_sink;
pub mod replay;
