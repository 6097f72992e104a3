//! hvswitch — control-plane proxy for programmable high-voltage switching
//! instruments.

pub mod channels;
pub mod device;
pub mod discovery;
pub mod error;
pub mod identity;
pub mod protocol;
pub mod sensor;
pub mod session;
pub mod settings;

pub use error::HvswitchError;
