//! Canned two-device scenarios.
//!
//! Every scenario builds two devices, "alice" with the smaller device uid
//! (so alice is in charge of the handshake) and "bob", starts a channel
//! creation and runs the network until it is quiet.

use sealink_core::{
    EnvRng, Environment, IdentityDetails,
    protocols::{ContactDevice, OwnedDevice},
};
use sealink_crypto::SigningKeyPair;
use tracing::info;

use crate::{
    device::{ContactStatus, SimDevice},
    error::{HarnessError, PartyId},
    fault::FaultInjector,
    invariants::InvariantRegistry,
    network::{Outcome, SimNetwork},
    sim_env::SimEnv,
};

/// Which handshake to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ScenarioKind {
    /// Two devices of one identity; alice starts
    OwnedDevices,
    /// Devices of two identities that trust each other; alice starts
    ContactDevices,
    /// Two devices of one identity; both start at once
    Simultaneous,
}

/// A reproducible scenario.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Handshake to run
    pub kind: ScenarioKind,
    /// Seed of the shared environment
    pub seed: u64,
    /// Delivery budget
    pub max_steps: usize,
    /// Probability that a store operation fails
    pub store_failure_rate: f64,
    /// Faults injected into routed messages
    pub faults: Vec<FaultInjector>,
    /// Check the standard invariants after every delivery
    pub check_invariants: bool,
}

/// A built but not yet started scenario.
pub struct Setup {
    /// The network
    pub network: SimNetwork,
    /// Device in charge
    pub alice: PartyId,
    /// Other device
    pub bob: PartyId,
}

impl Setup {
    /// Whether alice and bob both hold a confirmed channel with each other,
    /// with the same seed.
    pub fn established(&self) -> bool {
        let alice = &self.network.party(self.alice).device;
        let bob = &self.network.party(self.bob).device;
        match (alice.channel(&bob.as_remote()), bob.channel(&alice.as_remote())) {
            (Some(a), Some(b)) => a.confirmed && b.confirmed && a.seed == b.seed,
            _ => false,
        }
    }
}

/// Summary of a finished scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioReport {
    /// Deliveries made
    pub steps: usize,
    /// Both sides hold the same confirmed channel
    pub established: bool,
    /// Deliveries a step rejected
    pub rejected: usize,
    /// Deliveries no step accepted
    pub ignored: usize,
    /// Messages that never reached a manager
    pub dropped: usize,
    /// Deliveries requeued after a recoverable failure
    pub retries: usize,
}

impl Scenario {
    /// Scenario with default budget and no faults.
    pub fn new(kind: ScenarioKind, seed: u64) -> Self {
        Self {
            kind,
            seed,
            max_steps: 1_000,
            store_failure_rate: 0.0,
            faults: Vec::new(),
            check_invariants: true,
        }
    }

    /// Inject `injector` into routed messages.
    #[must_use]
    pub fn with_fault(mut self, injector: FaultInjector) -> Self {
        self.faults.push(injector);
        self
    }

    /// Fail store operations with probability `rate`.
    #[must_use]
    pub fn with_store_failure_rate(mut self, rate: f64) -> Self {
        self.store_failure_rate = rate;
        self
    }

    /// Build the two devices and their network.
    pub fn setup(&self) -> Result<Setup, HarnessError> {
        let env = SimEnv::with_seed(self.seed);

        let mut devices = [env.random_uid(), env.random_uid()];
        devices.sort();
        let [alice_device, bob_device] = devices;

        let alice_signer = SigningKeyPair::generate(&mut EnvRng(&env));
        let bob_signer = match self.kind {
            ScenarioKind::OwnedDevices | ScenarioKind::Simultaneous => alice_signer.clone(),
            ScenarioKind::ContactDevices => SigningKeyPair::generate(&mut EnvRng(&env)),
        };

        let mut alice = SimDevice::new(alice_signer, alice_device, IdentityDetails::named("alice"));
        let mut bob = SimDevice::new(bob_signer, bob_device, IdentityDetails::named("bob"));
        if self.kind == ScenarioKind::ContactDevices {
            let trusted = ContactStatus { trusted: true, active: true };
            alice.set_contact(bob.identity(), trusted);
            bob.set_contact(alice.identity(), trusted);
        }

        let mut network = SimNetwork::new(env).with_store_failure_rate(self.store_failure_rate);
        if self.check_invariants {
            network = network.with_invariants(InvariantRegistry::standard());
        }
        for fault in &self.faults {
            network.add_fault(fault.clone());
        }

        let alice = network.add_device(alice)?;
        let bob = network.add_device(bob)?;
        Ok(Setup { network, alice, bob })
    }

    /// Start the handshake on a built setup.
    pub fn start(&self, setup: &mut Setup) -> Result<(), HarnessError> {
        let Setup { network, alice, bob } = setup;
        match self.kind {
            ScenarioKind::OwnedDevices => {
                network.start_channel_creation::<OwnedDevice>(*alice, *bob)?;
            },
            ScenarioKind::ContactDevices => {
                network.start_channel_creation::<ContactDevice>(*alice, *bob)?;
            },
            ScenarioKind::Simultaneous => {
                network.start_channel_creation::<OwnedDevice>(*alice, *bob)?;
                network.start_channel_creation::<OwnedDevice>(*bob, *alice)?;
            },
        }
        Ok(())
    }

    /// Build, start and run to quiescence.
    pub fn run(&self) -> Result<ScenarioReport, HarnessError> {
        let mut setup = self.setup()?;
        self.start(&mut setup)?;
        let steps = setup.network.run_until_quiet(self.max_steps)?;

        let deliveries = setup.network.deliveries();
        let report = ScenarioReport {
            steps,
            established: setup.established(),
            rejected: deliveries.iter().filter(|d| matches!(d.outcome, Outcome::Rejected(_))).count(),
            ignored: deliveries.iter().filter(|d| matches!(d.outcome, Outcome::Ignored(_))).count(),
            dropped: setup.network.dropped().len(),
            retries: setup.network.retries(),
        };
        info!(kind = ?self.kind, seed = self.seed, ?report, "scenario finished");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::Fault;

    #[test]
    fn clean_run_report() {
        let report = Scenario::new(ScenarioKind::ContactDevices, 99).run().expect("runs");
        insta::assert_debug_snapshot!(report, @r"
        ScenarioReport {
            steps: 8,
            established: true,
            rejected: 0,
            ignored: 0,
            dropped: 0,
            retries: 0,
        }
        ");
    }

    #[test]
    fn alice_is_in_charge() {
        let scenario = Scenario::new(ScenarioKind::OwnedDevices, 3);
        let setup = scenario.setup().expect("setup");
        let alice = setup.network.party(setup.alice).device.device();
        let bob = setup.network.party(setup.bob).device.device();
        assert!(alice < bob);
    }

    #[test]
    fn dropped_ping_stops_handshake() {
        let report = Scenario::new(ScenarioKind::OwnedDevices, 5)
            .with_fault(FaultInjector::new(Fault::Drop, 1, 1))
            .run()
            .expect("runs");
        assert!(!report.established);
        assert_eq!(report.dropped, 1);
        assert_eq!(report.steps, 1);
    }

    #[test]
    fn store_failures_keep_step_checks() {
        let scenario = Scenario::new(ScenarioKind::Simultaneous, 260).with_store_failure_rate(0.3);
        assert!(scenario.check_invariants);

        let report = scenario.run().expect("invariants hold at every delivery");
        assert!(report.established);
        assert_eq!(report.dropped, 0);
    }
}
