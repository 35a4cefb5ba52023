//! Defensive guards consumed by the transaction flow and presentation
//! layer: lookalike-address detection and timed clipboard clearing.

pub mod clipboard;
pub mod poisoning;

pub use clipboard::{ClipboardGuard, ClipboardPlatform, MockClipboard};
pub use poisoning::{AddressPoisoningDetector, PoisonVerdict};
