//! The frame buffer manager's callback protocol.
//!
//! The reader never allocates frame payload memory. The host supplies the
//! initial buffer at construction and every subsequent handoff happens
//! through a [`FrameHandler`] implementation, one method per cause. Buffer
//! ownership moves explicitly through the method signatures rather than
//! through an out-parameter and a raw pointer, so there is no separate
//! "new capacity" value: it is simply the length of the returned buffer.

/// Host-supplied sink for completed frames and buffer lifecycle events.
///
/// Runs on the data loop thread. Implementations should not block
/// indefinitely: the data loop makes no progress on new fragments while a
/// callback method is executing.
pub trait FrameHandler: Send {
    /// All bits `0..fragments_per_frame` of the frame have been set, and
    /// this frame number has not yet been reported. Must return a free
    /// buffer (possibly the same one) for the reader to start filling for
    /// the next frame.
    fn frame_complete(
        &mut self,
        buf: Box<[u8]>,
        size: usize,
        missed_frames: u32,
        is_flush: bool,
    ) -> Box<[u8]>;

    /// A fragment's end offset exceeds the current buffer's capacity.
    /// Returning a buffer whose length is `>= current_size` accepts the
    /// resize (the data loop copies the bytes already received and then
    /// calls `copy_complete` with the old buffer); returning anything
    /// smaller than `current_size` signals "skip this frame".
    fn frame_too_small(&mut self, current_size: usize) -> Box<[u8]>;

    /// Called immediately after a successful copy into a replacement
    /// buffer returned from `frame_too_small`. The host may free `old_buf`.
    fn copy_complete(&mut self, old_buf: Box<[u8]>);

    /// The data loop is exiting because shutdown was requested. The host
    /// must release `buf`; the reader will not touch it again.
    fn cancel(&mut self, buf: Box<[u8]>);
}
