// caption-socket
//
// One logical event channel to the caption backend. A single actor task owns the
// transport and the connection state; handles talk to it over a command channel and
// observe it through a watch channel and a broadcast of state changes.

mod error;
mod manager;
mod retry;
mod state;
pub mod transport;

pub use error::{ConnectionError, TransportError};
pub use manager::{ConnectionConfig, ConnectionManager};
pub use retry::{RetryConfig, RetryPolicy};
pub use state::{ConnectionState, StateChange, StateTransition};
pub use transport::{Channel, Connector};
