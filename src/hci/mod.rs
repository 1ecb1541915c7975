pub mod buffer;
mod commands;
pub mod consts;
pub mod events;
pub mod le_states;
mod opcode;

use std::collections::BTreeMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::ensure;
use crate::hci::buffer::{ReceiveBuffer, SendBuffer};
use crate::hci::consts::{EventCode, Status};
use crate::hci::events::{Event, ExtendedAdvertisingReport, FromEvent, LeMetaEvent};
use crate::utils::DispatchExt;

pub use commands::*;
pub use opcode::{Opcode, OpcodeGroup};

/// Default deadline for a Command Complete to arrive.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_millis(2000);

/// Sending half of the byte transport that carries HCI packets.
///
/// The implementation delivers one fully framed command packet per call.
/// Incoming event packets travel the other way through [`Hci::handle_event`].
pub trait Transport: Send + Sync {
    fn send(&self, packet: &[u8]) -> Result<(), TransportError>;
}

impl<F: Fn(&[u8]) -> Result<(), TransportError> + Send + Sync> Transport for F {
    fn send(&self, packet: &[u8]) -> Result<(), TransportError> {
        self(packet)
    }
}

struct PendingCommand {
    opcode: Opcode,
    tx: oneshot::Sender<ReceiveBuffer>,
}

/// Driver for a Bluetooth controller behind an HCI transport.
///
/// At most one command is in flight at a time. Submitting a command installs
/// it in the pending slot, hands the packet to the transport, and suspends the
/// caller until the matching Command Complete arrives or the deadline expires.
/// Events that do not complete the pending command are fanned out to the
/// subscribers registered with [`Hci::register_event_handler`].
pub struct Hci {
    transport: Box<dyn Transport>,
    pending: Mutex<Option<PendingCommand>>,
    event_handlers: Mutex<BTreeMap<EventCode, Vec<UnboundedSender<Event>>>>,
    advertising_handlers: Mutex<Vec<UnboundedSender<ExtendedAdvertisingReport>>>,
    cmd_timeout: Duration,
}

impl Hci {

    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::with_command_timeout(transport, DEFAULT_COMMAND_TIMEOUT)
    }

    pub fn with_command_timeout(transport: impl Transport + 'static, cmd_timeout: Duration) -> Self {
        Hci {
            transport: Box::new(transport),
            pending: Mutex::new(None),
            event_handlers: Mutex::new(BTreeMap::new()),
            advertising_handlers: Mutex::new(Vec::new()),
            cmd_timeout,
        }
    }

    pub async fn call<T: FromEvent>(&self, cmd: Opcode) -> Result<T, Error> {
        self.call_with_args(cmd, |_| {}).await
    }

    pub async fn call_with_args<T: FromEvent>(&self, cmd: Opcode, packer: impl FnOnce(&mut SendBuffer)) -> Result<T, Error> {
        let mut buf = SendBuffer::default();
        buf.put_u16(cmd);
        // we'll update this later
        buf.put_u8(0u8);
        packer(&mut buf);
        let payload_len = u8::try_from(buf.len() - 3).map_err(|_| Error::PayloadTooLarge)?;
        buf.set_u8(2, payload_len);

        let rx = {
            let mut pending = self.pending.lock();
            ensure!(pending.is_none(), Error::Busy);
            let (tx, rx) = oneshot::channel();
            *pending = Some(PendingCommand { opcode: cmd, tx });
            rx
        };

        if let Err(err) = self.transport.send(buf.data()) {
            self.pending.lock().take();
            return Err(err.into());
        }

        let mut resp = match tokio::time::timeout(self.cmd_timeout, rx).await {
            Ok(Ok(resp)) => resp,
            // The slot only disappears without a completion when a timeout
            // already reclaimed it, so both arms resolve to a timeout.
            Ok(Err(_)) => return Err(Error::Timeout),
            Err(_) => {
                self.pending.lock().take();
                return Err(Error::Timeout);
            }
        };
        let status = Status::from(resp.u8()?);
        match status {
            Status::Success => {
                let result = T::unpack(&mut resp)?;
                resp.finish()?;
                Ok(result)
            }
            _ => Err(Error::Controller(status))
        }
    }

    /// Processes one complete event packet received from the transport.
    ///
    /// Framing problems are reported to the caller for logging; they never
    /// disturb the pending command.
    pub fn handle_event(&self, packet: &[u8]) -> Result<(), Error> {
        let event = Event::parse(packet)?;
        trace!("Received HCI event: {:?}", event.code);
        match event.code {
            EventCode::CommandComplete => {
                // ([Vol 4] Part E, Section 7.7.14).
                ensure!(event.data.remaining() >= 4, Error::BadEventPacketSize);
                let mut payload = event.data.clone();
                let _cmd_quota = payload.u8()?;
                let opcode = payload.u16().map(Opcode::from)?;
                let completed = {
                    let mut pending = self.pending.lock();
                    match pending.take() {
                        Some(cmd) if cmd.opcode == opcode => Some(cmd),
                        other => {
                            *pending = other;
                            None
                        }
                    }
                };
                match completed {
                    Some(cmd) => cmd.tx.send(payload)
                        .unwrap_or_else(|_| debug!("Command Complete receiver dropped")),
                    // Spontaneous or mismatched completions (e.g. NOP quota
                    // updates) go to the event stream instead.
                    None => {
                        debug!("Unmatched Command Complete for {:?}", opcode);
                        self.dispatch(event);
                    }
                }
            }
            EventCode::LeMeta => {
                // Advertising reports are decoded here; every other
                // sub-event passes through raw. Malformed reports surface
                // as the error the feeding loop logs.
                match LeMetaEvent::parse(&event)? {
                    Some(LeMetaEvent::ExtendedAdvertisingReports(reports)) => {
                        let mut handlers = self.advertising_handlers.lock();
                        let mut handled = false;
                        for report in reports {
                            handled |= handlers.dispatch(report);
                        }
                        if !handled {
                            debug!("No subscriber for extended advertising reports");
                        }
                    }
                    _ => self.dispatch(event),
                }
            }
            _ => self.dispatch(event),
        }
        Ok(())
    }

    /// Subscribes `handler` to every event code in `events`.
    ///
    /// Closed receivers are pruned on the next dispatch.
    pub fn register_event_handler(&self, events: impl IntoIterator<Item = EventCode>, handler: UnboundedSender<Event>) {
        let mut handlers = self.event_handlers.lock();
        for code in events {
            handlers.entry(code).or_default().push(handler.clone());
        }
    }

    /// Subscribes `handler` to decoded extended advertising reports.
    ///
    /// Closed receivers are pruned on the next dispatch.
    pub fn register_advertising_handler(&self, handler: UnboundedSender<ExtendedAdvertisingReport>) {
        self.advertising_handlers.lock().push(handler);
    }

    fn dispatch(&self, event: Event) {
        let code = event.code;
        let handled = self.event_handlers
            .lock()
            .get_mut(&code)
            .map_or(false, |handlers| handlers.dispatch(event));
        if !handled {
            debug!("Unhandled HCI event: {:?}", code);
        }
    }

}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TransportError {
    #[error("transport channel closed")]
    Closed,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("payload exceeds maximum size (255)")]
    PayloadTooLarge,
    #[error("HCI event has an invalid size")]
    BadEventPacketSize,
    #[error("unknown HCI event code: 0x{0:02X}")]
    UnknownEventCode(u8),
    #[error("another command is already pending")]
    Busy,
    #[error("no Command Complete within the configured deadline")]
    Timeout,
    #[error("invalid command parameters: {0}")]
    InvalidArguments(&'static str),
    #[error(transparent)]
    Controller(#[from] Status),
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::testing::{ok_complete, Loopback};
    use super::*;

    fn hci() -> (Arc<Hci>, Loopback) {
        let transport = Loopback::default();
        (Arc::new(Hci::new(transport.clone())), transport)
    }

    #[tokio::test]
    async fn reset_round_trip() {
        let (hci, transport) = hci();
        let pending = {
            let hci = hci.clone();
            tokio::spawn(async move { hci.reset().await })
        };
        tokio::task::yield_now().await;
        assert_eq!(transport.sent(), vec![vec![0x03, 0x0C, 0x00]]);
        hci.handle_event(&[0x0E, 0x04, 0x01, 0x03, 0x0C, 0x00]).unwrap();
        pending.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn second_command_is_rejected_while_pending() {
        let (hci, _transport) = hci();
        let first = {
            let hci = hci.clone();
            tokio::spawn(async move { hci.reset().await })
        };
        tokio::task::yield_now().await;
        assert!(matches!(hci.read_bd_addr().await, Err(Error::Busy)));
        hci.handle_event(&ok_complete(0x0C03)).unwrap();
        first.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_frees_the_pending_slot() {
        let transport = Loopback::default();
        let hci = Arc::new(Hci::with_command_timeout(transport.clone(), Duration::from_millis(50)));
        assert!(matches!(hci.reset().await, Err(Error::Timeout)));

        // A late completion is dropped without side effects.
        hci.handle_event(&ok_complete(0x0C03)).unwrap();

        let retry = {
            let hci = hci.clone();
            tokio::spawn(async move { hci.reset().await })
        };
        tokio::task::yield_now().await;
        hci.handle_event(&ok_complete(0x0C03)).unwrap();
        retry.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn mismatched_completion_is_ignored() {
        let (hci, _transport) = hci();
        let pending = {
            let hci = hci.clone();
            tokio::spawn(async move { hci.reset().await })
        };
        tokio::task::yield_now().await;
        hci.handle_event(&ok_complete(0x0C01)).unwrap();
        tokio::task::yield_now().await;
        assert!(!pending.is_finished());
        hci.handle_event(&ok_complete(0x0C03)).unwrap();
        pending.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn controller_error_is_typed() {
        let (hci, _transport) = hci();
        let pending = {
            let hci = hci.clone();
            tokio::spawn(async move { hci.reset().await })
        };
        tokio::task::yield_now().await;
        hci.handle_event(&[0x0E, 0x04, 0x01, 0x03, 0x0C, 0x0C]).unwrap();
        assert!(matches!(
            pending.await.unwrap(),
            Err(Error::Controller(Status::CommandDisallowed))
        ));
    }

    #[tokio::test]
    async fn framing_errors_are_surfaced_and_dropped() {
        let (hci, _transport) = hci();
        // Declared length disagrees with the trailing byte count.
        assert!(matches!(
            hci.handle_event(&[0x0E, 0x05, 0x01, 0x03, 0x0C, 0x00]),
            Err(Error::BadEventPacketSize)
        ));
        assert!(matches!(hci.handle_event(&[0x0E]), Err(Error::BadEventPacketSize)));
        assert!(matches!(hci.handle_event(&[0x47, 0x00]), Err(Error::UnknownEventCode(0x47))));
        // A short Command Complete body is a framing error as well.
        assert!(matches!(
            hci.handle_event(&[0x0E, 0x03, 0x01, 0x03, 0x0C]),
            Err(Error::BadEventPacketSize)
        ));
    }

    #[tokio::test]
    async fn advertising_reports_are_decoded_and_dispatched() {
        let (hci, _transport) = hci();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        hci.register_advertising_handler(tx);
        let mut packet = vec![
            0x3E, 0x00, // length patched below
            0x0D, // extended advertising report
            0x01, // one report
            0x13, 0x00, // event type
            0x01, // random address
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06,
            0x01, 0x00, 0xFF, 0x7F, // phys, sid, tx power
            0xC8, // rssi -56
            0x00, 0x00, // no periodic interval
            0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x03, 0x02, 0x01, 0x06, // flags record
        ];
        packet[1] = (packet.len() - 2) as u8;
        hci.handle_event(&packet).unwrap();
        let report = rx.try_recv().unwrap();
        assert_eq!(report.rssi, -56);
        assert_eq!(report.data.as_ref(), &[0x02, 0x01, 0x06]);
    }

    #[tokio::test]
    async fn malformed_advertising_reports_are_dropped() {
        let (hci, _transport) = hci();
        // The report promises more bytes than the event carries.
        assert!(matches!(
            hci.handle_event(&[0x3E, 0x04, 0x0D, 0x01, 0x13, 0x00]),
            Err(Error::BadEventPacketSize)
        ));
    }

    #[tokio::test]
    async fn other_le_meta_subevents_pass_through_raw() {
        let (hci, _transport) = hci();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        hci.register_event_handler([EventCode::LeMeta], tx);
        // Connection update complete.
        hci.handle_event(&[0x3E, 0x0A, 0x03, 0x00, 0x40, 0x00, 0x18, 0x00, 0x00, 0x00, 0x64, 0x00]).unwrap();
        let event = rx.try_recv().unwrap();
        assert_eq!(event.code, EventCode::LeMeta);
    }

    #[tokio::test]
    async fn spontaneous_completion_reaches_subscribers() {
        let (hci, _transport) = hci();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        hci.register_event_handler([EventCode::CommandComplete], tx);
        hci.handle_event(&ok_complete(0x0000)).unwrap();
        let event = rx.try_recv().unwrap();
        assert_eq!(event.code, EventCode::CommandComplete);
    }
}
