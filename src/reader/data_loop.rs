//! The data loop: reads fragments, detects frame transitions, maintains
//! the bitmap, and mediates the capacity handshake with the host.

use std::sync::atomic::Ordering;
use std::time::Duration;

use super::Shared;
use crate::callback::FrameHandler;
use crate::header::{FragmentHeader, FRAGMENT_HEADER_SIZE};
use crate::network::{NetworkManager, ReadStatus};

/// The data loop's exclusive state: the current frame buffer, its filled
/// length, the last frame number reported via `FRAME_COMPLETE`, and
/// whether the in-progress frame has been abandoned due to insufficient
/// capacity. Never shared with the ack loop.
struct DataLoopState {
    buf: Box<[u8]>,
    size: usize,
    previously_reported_frame_number: Option<u16>,
    skip_current_frame: bool,
}

impl DataLoopState {
    fn new(initial_buf: Box<[u8]>) -> Self {
        Self {
            buf: initial_buf,
            size: 0,
            previously_reported_frame_number: None,
            skip_current_frame: false,
        }
    }
}

/// `missed = frameNumber - previouslyReportedFrameNumber - 1` computed
/// modulo 2^16, with gaps larger than half the number space treated as a
/// stale/out-of-order report rather than a real gap (resolves the wrap
/// open question: large unsigned results near `u16::MAX` are noise, not
/// tens of thousands of dropped frames).
fn missed_frames(frame_number: u16, previously_reported: u16) -> u32 {
    let gap = frame_number.wrapping_sub(previously_reported).wrapping_sub(1);
    if gap > u16::MAX / 2 {
        0
    } else {
        gap as u32
    }
}

/// Applies one received fragment to `state`, mediating the callback
/// protocol exactly as steps 3-11 of the data loop describe. Pure of I/O:
/// callers supply the decoded header and payload, so this is exercised
/// directly by scenario tests without any real timing or sockets.
fn process_fragment(
    state: &mut DataLoopState,
    shared: &Shared,
    fragment_size: usize,
    header: FragmentHeader,
    payload: &[u8],
    handler: &mut dyn FrameHandler,
) {
    let fragment_number = header.fragment_number as usize;

    let was_already_set = {
        let mut slot = shared.ack_slot.lock().unwrap();
        if header.frame_number != slot.frame_number {
            let previous = slot.frame_number;
            slot.efficiency.advance();
            state.size = 0;
            state.skip_current_frame = false;
            slot.frame_number = header.frame_number;
            slot.bitmap.reset();
            log::debug!(
                "new frame {} (previous {previous} abandoned incomplete)",
                header.frame_number
            );
        }
        let was_already_set = slot.bitmap.is_set(fragment_number);
        slot.bitmap.set(fragment_number);
        slot.efficiency.record(!was_already_set);
        was_already_set
    };

    shared.notify_ack_loop();

    let cp_index = fragment_number * fragment_size;
    let cp_size = payload.len();
    let end_index = cp_index + cp_size;

    // Capacity loop: re-tests because the host may return a buffer that is
    // still too small.
    while end_index > state.buf.len() && !state.skip_current_frame {
        let current_size = state.size;
        let candidate = handler.frame_too_small(current_size);
        let old_buf = std::mem::replace(&mut state.buf, candidate);
        if state.buf.len() >= current_size && !state.buf.is_empty() {
            state.buf[..current_size].copy_from_slice(&old_buf[..current_size]);
            handler.copy_complete(old_buf);
        } else {
            handler.copy_complete(old_buf);
            state.skip_current_frame = true;
            log::debug!("frame {} skipped: host buffer still too small", header.frame_number);
        }
    }

    if !state.skip_current_frame {
        if !was_already_set {
            state.buf[cp_index..end_index].copy_from_slice(payload);
        }
        if end_index > state.size {
            state.size = end_index;
        }

        let mut slot = shared.ack_slot.lock().unwrap();
        let already_reported =
            state.previously_reported_frame_number == Some(header.frame_number);
        if slot.bitmap.all_set(header.fragments_per_frame as usize) && !already_reported {
            let missed = match state.previously_reported_frame_number {
                Some(prev) => missed_frames(header.frame_number, prev),
                None => 0,
            };
            state.previously_reported_frame_number = Some(header.frame_number);
            let is_flush = header.is_flush();
            let size = state.size;
            log::debug!("ack all in frame {}", header.frame_number);
            let old_buf = std::mem::replace(&mut state.buf, Box::new([]));
            state.buf = handler.frame_complete(old_buf, size, missed, is_flush);
            state.size = 0;
        }
        drop(slot);
    }
}

/// The data loop thread body. Runs until `stop_requested` is observed,
/// then raises `cancel` and clears `data_running`.
pub(super) fn run(
    shared: &Shared,
    network: &dyn NetworkManager,
    data_buffer_id: u16,
    fragment_size: usize,
    read_timeout: Duration,
    initial_buf: Box<[u8]>,
    handler: &mut dyn FrameHandler,
) {
    let mut state = DataLoopState::new(initial_buf);
    let mut scratch = vec![0u8; fragment_size + FRAGMENT_HEADER_SIZE];

    loop {
        if shared.stop_requested.load(Ordering::SeqCst) {
            break;
        }

        match network.read_with_timeout(data_buffer_id, &mut scratch, read_timeout) {
            Ok(ReadStatus::Empty) => continue,
            Ok(ReadStatus::Data(n)) => {
                if n < FRAGMENT_HEADER_SIZE {
                    log::warn!("short fragment ({n} bytes), dropping");
                    continue;
                }
                let header = match FragmentHeader::decode(&scratch[..n]) {
                    Ok(h) => h,
                    Err(e) => {
                        log::warn!("failed to decode fragment header: {e}");
                        continue;
                    }
                };
                let payload = &scratch[FRAGMENT_HEADER_SIZE..n];
                process_fragment(&mut state, shared, fragment_size, header, payload, handler);
            }
            Err(e) => {
                log::warn!("network read error, continuing: {e}");
            }
        }
    }

    handler.cancel(state.buf);
    shared.data_running.store(false, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::test_support::RecordingHandler;
    use crate::header::FLUSH_FRAME;
    use crate::reader::Shared;

    fn frag(frame_number: u16, fragment_number: u8, fragments_per_frame: u8, flags: u8) -> FragmentHeader {
        FragmentHeader {
            frame_number,
            fragment_number,
            fragments_per_frame,
            frame_flags: flags,
        }
    }

    fn fresh() -> (DataLoopState, Shared) {
        (DataLoopState::new(vec![0u8; 9].into_boxed_slice()), Shared::new())
    }

    // S1: single 3-fragment frame, in order.
    #[test]
    fn s1_three_fragment_frame_in_order() {
        let (mut state, shared) = fresh();
        let mut handler = RecordingHandler::new(|sz| sz);

        process_fragment(&mut state, &shared, 3, frag(7, 0, 3, 0), b"AAA", &mut handler);
        process_fragment(&mut state, &shared, 3, frag(7, 1, 3, 0), b"BBB", &mut handler);
        process_fragment(&mut state, &shared, 3, frag(7, 2, 3, 0), b"CC", &mut handler);

        assert_eq!(handler.completions.len(), 1);
        let (buf, missed, is_flush) = &handler.completions[0];
        assert_eq!(buf, b"AAABBBCC");
        assert_eq!(*missed, 0);
        assert!(!is_flush);
    }

    // S2: same fragments, arrival order 2, 0, 1.
    #[test]
    fn s2_out_of_order_fragments_same_result() {
        let (mut state, shared) = fresh();
        let mut handler = RecordingHandler::new(|sz| sz);

        process_fragment(&mut state, &shared, 3, frag(7, 2, 3, 0), b"CC", &mut handler);
        assert!(handler.completions.is_empty());
        process_fragment(&mut state, &shared, 3, frag(7, 0, 3, 0), b"AAA", &mut handler);
        assert!(handler.completions.is_empty());
        process_fragment(&mut state, &shared, 3, frag(7, 1, 3, 0), b"BBB", &mut handler);

        assert_eq!(handler.completions.len(), 1);
        assert_eq!(handler.completions[0].0, b"AAABBBCC");
    }

    // S3: duplicate fragment is not rewritten and not counted useful.
    #[test]
    fn s3_duplicate_fragment_not_rewritten() {
        let (mut state, shared) = fresh();
        let mut handler = RecordingHandler::new(|sz| sz);

        process_fragment(&mut state, &shared, 2, frag(7, 0, 2, 0), b"XX", &mut handler);
        process_fragment(&mut state, &shared, 2, frag(7, 0, 2, 0), b"YY", &mut handler);
        process_fragment(&mut state, &shared, 2, frag(7, 1, 2, 0), b"ZZ", &mut handler);

        assert_eq!(handler.completions.len(), 1);
        assert_eq!(handler.completions[0].0, b"XXZZ");

        let slot = shared.ack_slot.lock().unwrap();
        let eff = slot.efficiency.efficiency();
        // 2 useful out of 3 total fragments received.
        assert_eq!(eff, 2.0 / 3.0);
    }

    // S4: capacity growth via FRAME_TOO_SMALL, host returns larger buffer.
    #[test]
    fn s4_capacity_growth_copies_and_completes() {
        let mut state = DataLoopState::new(vec![0u8; 4].into_boxed_slice());
        let shared = Shared::new();
        let mut handler = RecordingHandler::new(|_sz| 8);

        process_fragment(&mut state, &shared, 4, frag(9, 0, 2, FLUSH_FRAME), b"ABCD", &mut handler);
        assert!(handler.too_small_calls.is_empty());
        process_fragment(&mut state, &shared, 4, frag(9, 1, 2, FLUSH_FRAME), b"EFGH", &mut handler);

        assert_eq!(handler.too_small_calls.len(), 1);
        assert_eq!(handler.copy_completions, 1);
        assert_eq!(handler.completions.len(), 1);
        let (buf, _missed, is_flush) = &handler.completions[0];
        assert_eq!(buf, b"ABCDEFGH");
        assert!(is_flush);
    }

    // S5: host returns a too-small replacement, frame is skipped.
    #[test]
    fn s5_skip_when_replacement_still_too_small() {
        let mut state = DataLoopState::new(vec![0u8; 4].into_boxed_slice());
        let shared = Shared::new();
        let mut handler = RecordingHandler::new(|_sz| 3);

        process_fragment(&mut state, &shared, 4, frag(9, 0, 2, 0), b"ABCD", &mut handler);
        process_fragment(&mut state, &shared, 4, frag(9, 1, 2, 0), b"EFGH", &mut handler);

        assert_eq!(handler.copy_completions, 1);
        assert!(handler.completions.is_empty());
        assert!(state.skip_current_frame);
    }

    // S6: frames 6 and 7 drop entirely; frame 8 reports missed=2.
    #[test]
    fn s6_frame_gap_reports_missed_count() {
        let (mut state, shared) = fresh();
        let mut handler = RecordingHandler::new(|sz| sz);

        process_fragment(&mut state, &shared, 3, frag(5, 0, 1, 0), b"AAA", &mut handler);
        process_fragment(&mut state, &shared, 3, frag(8, 0, 1, 0), b"BBB", &mut handler);

        assert_eq!(handler.completions.len(), 2);
        assert_eq!(handler.completions[1].1, 2);
    }

    #[test]
    fn duplicate_after_completion_does_not_reraise() {
        let (mut state, shared) = fresh();
        let mut handler = RecordingHandler::new(|sz| sz);

        process_fragment(&mut state, &shared, 3, frag(7, 0, 1, 0), b"AAA", &mut handler);
        assert_eq!(handler.completions.len(), 1);
        process_fragment(&mut state, &shared, 3, frag(7, 0, 1, 0), b"AAA", &mut handler);
        assert_eq!(handler.completions.len(), 1);
    }

    #[test]
    fn missed_frames_wraps_correctly() {
        assert_eq!(missed_frames(8, 5), 2);
        assert_eq!(missed_frames(5, 5), 0); // gap wraps to u16::MAX, treated as noise
        assert_eq!(missed_frames(0, u16::MAX), 0);
        assert_eq!(missed_frames(1, u16::MAX - 1), 0);
    }
}
