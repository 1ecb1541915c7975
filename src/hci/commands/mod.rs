mod hci_control;
mod info_params;
mod le;

pub use info_params::*;
pub use le::*;
