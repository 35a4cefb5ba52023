//! Hardware-security-key binding: transport seam + derivation engine.

pub mod engine;
pub mod transport;

pub use engine::{DerivationOutcome, FailureKind, HskDerivationEngine, HskPhase};
pub use transport::{
    recommended_strategy, AssertionProof, AuthenticatorCapabilities, DerivationStrategy,
    HskTransport, ProofOfPossession,
};
