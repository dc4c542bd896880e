use thiserror::Error;

/// Errors from the bridge runtime.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Vendor API failure (auth, validation, or transport).
    #[error(transparent)]
    Api(#[from] fibridge_api::Error),

    /// MQTT publish was rejected by the client.
    #[error("MQTT publish failed: {0}")]
    Publish(String),

    /// Broker URL could not be interpreted.
    #[error("Invalid broker URL '{url}': {reason}")]
    BrokerUrl { url: String, reason: String },

    /// Snapshot could not be serialized for publishing.
    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Binding or serving the local HTTP service failed.
    #[error("HTTP service error: {0}")]
    Serve(#[from] std::io::Error),
}
