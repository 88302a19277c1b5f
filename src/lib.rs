//! rpsio provides access to an RP-series SIO GPIO bank through a
//! user-friendly pin interface. In addition to the push-pull and input modes
//! offered by the hardware, rpsio emulates open-drain and quasi-bidirectional
//! outputs by repurposing the output-enable register, and keeps a pin's
//! logical output value intact across mode changes.
//!
//! The library can be used in conjunction with a variety of platform-agnostic
//! drivers through its `embedded-hal` trait implementations, available behind
//! the optional `hal` feature.
//!
//! The register bank is accessed by memory-mapping `/dev/gpiomem0`. On a
//! typical up-to-date installation, any user that's a member of the `gpio`
//! group can access this device without superuser privileges.

#[macro_use]
mod macros;

pub mod gpio;
