//! Transport collaborator.

use crate::{error::TransportError, protocol::CoreMessage};

/// Accepts outgoing messages.
///
/// Messages carry their destination in [`CoreMessage::destination`]; the
/// sink is responsible for encrypting and delivering them, including looping
/// local messages back to this device.
pub trait ChannelSink {
    /// Hand over one outgoing message.
    fn post(&mut self, message: CoreMessage) -> Result<(), TransportError>;
}

/// Collects messages in posting order.
impl ChannelSink for Vec<CoreMessage> {
    fn post(&mut self, message: CoreMessage) -> Result<(), TransportError> {
        if message.destination().is_none() {
            return Err(TransportError::NoDestination);
        }
        self.push(message);
        Ok(())
    }
}
