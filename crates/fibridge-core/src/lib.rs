// fibridge-core: bridge runtime
//
// Glues the vendor API client to the outside world: a fixed-interval
// polling publisher pushing detail snapshots onto an MQTT topic, and an
// optional local HTTP service exposing a small user list.

pub mod error;
pub mod poller;
pub mod publish;
pub mod server;
pub mod users;

pub use error::BridgeError;
pub use poller::{InFlight, Poller};
pub use publish::{MqttPublisher, Publish};
pub use users::UserStore;
