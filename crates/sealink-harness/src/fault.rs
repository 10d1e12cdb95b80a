//! Message tampering for robustness scenarios.

use sealink_core::CoreMessage;
use sealink_encoding::{EncodedValue, Tag};

/// What to do to a targeted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Flip the last byte of the first signature input
    CorruptSignature,
    /// Remove the last byte of the first byte-string input
    TruncateBytes,
    /// Do not deliver the message
    Drop,
}

/// Applies a [`Fault`] to messages of one kind, a bounded number of times.
#[derive(Debug, Clone)]
pub struct FaultInjector {
    fault: Fault,
    message_kind: u16,
    remaining: usize,
}

impl FaultInjector {
    /// Apply `fault` to the next `times` messages of kind `message_kind`.
    pub fn new(fault: Fault, message_kind: u16, times: usize) -> Self {
        Self { fault, message_kind, remaining: times }
    }

    /// Number of injections left.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Tamper with `message` if it is targeted. Returns `false` if the
    /// message must be dropped.
    pub fn apply(&mut self, message: &mut CoreMessage) -> bool {
        if self.remaining == 0 || message.message_kind != self.message_kind {
            return true;
        }

        let applied = match self.fault {
            Fault::CorruptSignature => mutate_first(message, Tag::Signature, |payload| {
                if let Some(last) = payload.last_mut() {
                    *last ^= 0x01;
                }
            }),
            Fault::TruncateBytes => mutate_first(message, Tag::Bytes, |payload| {
                payload.pop();
            }),
            Fault::Drop => true,
        };

        if applied {
            self.remaining -= 1;
            tracing::debug!(fault = ?self.fault, kind = message.message_kind, "fault injected");
        }
        !(applied && self.fault == Fault::Drop)
    }
}

fn mutate_first(message: &mut CoreMessage, tag: Tag, mutate: impl FnOnce(&mut Vec<u8>)) -> bool {
    let Some(input) = message.encoded_inputs.iter_mut().find(|input| input.tag() == tag) else {
        return false;
    };
    let mut payload = input.payload().to_vec();
    mutate(&mut payload);
    *input = EncodedValue::new(tag, payload);
    true
}

#[cfg(test)]
mod tests {
    use std::time::UNIX_EPOCH;

    use sealink_core::{ChannelInfo, ProtocolId, protocol::Routing};
    use sealink_encoding::{Encode, Uid};

    use super::*;

    fn message(kind: u16, inputs: Vec<EncodedValue>) -> CoreMessage {
        CoreMessage {
            protocol_id: ProtocolId::ChannelCreationWithOwnedDevice,
            instance_id: Uid::from_bytes([1; 32]),
            message_kind: kind,
            encoded_inputs: inputs,
            routing: Routing::Received(ChannelInfo::AsymmetricChannel),
            timestamp: UNIX_EPOCH,
        }
    }

    #[test]
    fn truncates_only_targeted_kind_and_only_n_times() {
        let mut injector = FaultInjector::new(Fault::TruncateBytes, 3, 1);

        let mut other = message(4, vec![vec![1u8, 2, 3].encode()]);
        assert!(injector.apply(&mut other));
        assert_eq!(other.encoded_inputs[0].payload().len(), 3);

        let mut target = message(3, vec![true.encode(), vec![1u8, 2, 3].encode()]);
        assert!(injector.apply(&mut target));
        assert_eq!(target.encoded_inputs[1].payload().as_ref(), &[1, 2]);
        assert_eq!(injector.remaining(), 0);

        let mut again = message(3, vec![vec![1u8, 2, 3].encode()]);
        assert!(injector.apply(&mut again));
        assert_eq!(again.encoded_inputs[0].payload().len(), 3);
    }

    #[test]
    fn drop_discards_message() {
        let mut injector = FaultInjector::new(Fault::Drop, 1, 1);
        assert!(!injector.apply(&mut message(1, vec![])));
        assert!(injector.apply(&mut message(1, vec![])));
    }

    #[test]
    fn corrupt_without_signature_is_noop() {
        let mut injector = FaultInjector::new(Fault::CorruptSignature, 1, 1);
        let mut plain = message(1, vec![7i64.encode()]);
        assert!(injector.apply(&mut plain));
        assert_eq!(injector.remaining(), 1);
    }
}
