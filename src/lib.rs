//! Host-side driver for the Bluetooth Low Energy Host Controller Interface.
//!
//! The crate speaks the binary protocols a BLE host needs to drive a local
//! controller: the HCI command/event layer ([`hci`]), the Attribute Protocol
//! PDUs ([`att`]), and the advertising-data payloads carried inside extended
//! advertising reports ([`adv`]). The physical transport (USB, UART, socket)
//! and its H4 framing are owned by the embedding application; the driver only
//! borrows a [`hci::Transport`] for sending and is fed complete event packets
//! through [`hci::Hci::handle_event`].

pub mod adv;
pub mod att;
pub mod hci;
pub mod utils;
pub mod uuid;
