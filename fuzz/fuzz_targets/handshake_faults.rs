//! Fuzz target for channel creation under tampering
//!
//! Runs a full two-device handshake with a fuzzer-chosen seed, fault and
//! store failure rate.
//!
//! # Invariants
//!
//! - No step panics, however its inputs were mangled
//! - Tampering makes a handshake fail, never diverge: the channel
//!   invariants hold after every delivery

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sealink_harness::{Fault, FaultInjector, HarnessError, Scenario, ScenarioKind};

#[derive(Debug, Arbitrary)]
enum FuzzKind {
    Owned,
    Contact,
    Simultaneous,
}

#[derive(Debug, Arbitrary)]
enum FuzzFault {
    CorruptSignature,
    TruncateBytes,
    Drop,
}

#[derive(Debug, Arbitrary)]
struct Input {
    seed: u64,
    kind: FuzzKind,
    faults: Vec<(FuzzFault, u8, u8)>,
}

fuzz_target!(|input: Input| {
    let kind = match input.kind {
        FuzzKind::Owned => ScenarioKind::OwnedDevices,
        FuzzKind::Contact => ScenarioKind::ContactDevices,
        FuzzKind::Simultaneous => ScenarioKind::Simultaneous,
    };

    let mut scenario = Scenario::new(kind, input.seed);
    for (fault, message_kind, times) in input.faults.into_iter().take(4) {
        let fault = match fault {
            FuzzFault::CorruptSignature => Fault::CorruptSignature,
            FuzzFault::TruncateBytes => Fault::TruncateBytes,
            FuzzFault::Drop => Fault::Drop,
        };
        scenario = scenario.with_fault(FaultInjector::new(
            fault,
            u16::from(message_kind % 8),
            usize::from(times % 4),
        ));
    }

    match scenario.run() {
        Ok(_) | Err(HarnessError::StepLimit(_)) => {},
        Err(err) => panic!("handshake failed: {err}"),
    }
});
