//! The ack loop: periodically snapshots the bitmap and emits a wire-format
//! ack packet.

use std::sync::atomic::Ordering;
use std::time::Duration;

use super::Shared;
use crate::header::{AckPacket, ACK_PACKET_SIZE};
use crate::network::NetworkManager;

/// The ack loop thread body. Wakes on either a signal from the data loop
/// or `max_time_between_ack` elapsing, whichever comes first; snapshots
/// the bitmap under the ack-packet lock, converts to wire order outside
/// the lock, and submits it. Runs until `stop_requested` is observed.
pub(super) fn run(
    shared: &Shared,
    network: &dyn NetworkManager,
    ack_buffer_id: u16,
    max_time_between_ack: Duration,
) {
    loop {
        if shared.stop_requested.load(Ordering::SeqCst) {
            break;
        }

        {
            let pending = shared.ack_send_lock.lock().unwrap();
            let (mut pending, _timeout_result) = shared
                .ack_send_condvar
                .wait_timeout_while(pending, max_time_between_ack, |pending| !*pending)
                .unwrap();
            *pending = false;
        }

        if shared.stop_requested.load(Ordering::SeqCst) {
            break;
        }

        let packet = {
            let slot = shared.ack_slot.lock().unwrap();
            AckPacket {
                frame_number: slot.frame_number,
                high_packets_ack: slot.bitmap.high(),
                low_packets_ack: slot.bitmap.low(),
            }
        };

        let mut wire = [0u8; ACK_PACKET_SIZE];
        if packet.encode(&mut wire).is_ok() {
            if let Err(e) = network.send_data(ack_buffer_id, &wire) {
                log::warn!("failed to send ack packet: {e}");
            }
        }
    }

    shared.ack_running.store(false, Ordering::SeqCst);
}
