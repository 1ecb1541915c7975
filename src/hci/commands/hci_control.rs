use crate::hci::consts::EventMask;
use crate::hci::{Error, Hci, Opcode, OpcodeGroup};

/// Controller and baseband commands ([Vol 4] Part E, Section 7.3).
impl Hci {

    pub async fn set_event_mask(&self, mask: EventMask) -> Result<(), Error> {
        self.call_with_args(Opcode::new(OpcodeGroup::HciControl, 0x0001), |p| {
            p.put_u64(mask);
        }).await
    }

    /// Resets the controller's link manager, baseband, and link layer
    /// ([Vol 4] Part E, Section 7.3.2).
    pub async fn reset(&self) -> Result<(), Error> {
        self.call(Opcode::new(OpcodeGroup::HciControl, 0x0003)).await
    }

}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::hci::consts::{EventCode, EventMask};
    use crate::hci::testing::{complete_with, Loopback};
    use crate::hci::Hci;

    #[tokio::test]
    async fn set_event_mask_layout() {
        let transport = Loopback::default();
        let hci = Arc::new(Hci::new(transport.clone()));
        let mask = EventMask::none()
            .with(EventCode::DisconnectionComplete, true)
            .with(EventCode::LeMeta, true);
        let (result, _) = tokio::join!(hci.set_event_mask(mask), async {
            tokio::task::yield_now().await;
            hci.handle_event(&complete_with(0x0C01, &[])).unwrap();
        });
        result.unwrap();
        assert_eq!(
            transport.last_sent(),
            [0x01, 0x0C, 0x08, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x20]
        );
    }
}
