//! Reader construction, lifecycle, and the state shared between the two
//! loop threads.

mod ack_loop;
mod data_loop;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use crate::bitmap::AckBitmap;
use crate::callback::FrameHandler;
use crate::config::ReaderConfig;
use crate::efficiency::EfficiencyTracker;
use crate::error::{ReaderError, Result};
use crate::network::NetworkManager;

/// State protected by the ack-packet lock: the bitmap for the frame
/// currently being reassembled, the frame number it refers to, and the
/// rolling efficiency counters (advanced in lockstep with frame rotation).
pub(crate) struct AckSlot {
    pub bitmap: AckBitmap,
    pub frame_number: u16,
    pub efficiency: EfficiencyTracker,
}

impl AckSlot {
    fn new() -> Self {
        Self {
            bitmap: AckBitmap::new(),
            frame_number: 0,
            efficiency: EfficiencyTracker::new(),
        }
    }
}

/// Everything the data loop and ack loop threads share. `buf`/`size`/
/// `previously_reported_frame_number` are deliberately *not* here: they
/// are exclusive to the data loop thread and live as locals in its
/// closure, per the concurrency model.
pub(crate) struct Shared {
    pub ack_slot: Mutex<AckSlot>,
    pub ack_send_lock: Mutex<bool>,
    pub ack_send_condvar: Condvar,
    pub stop_requested: AtomicBool,
    pub data_running: AtomicBool,
    pub ack_running: AtomicBool,
}

impl Shared {
    fn new() -> Self {
        Self {
            ack_slot: Mutex::new(AckSlot::new()),
            ack_send_lock: Mutex::new(false),
            ack_send_condvar: Condvar::new(),
            stop_requested: AtomicBool::new(false),
            data_running: AtomicBool::new(false),
            ack_running: AtomicBool::new(false),
        }
    }

    /// Wakes the ack loop ahead of its timeout, used after every fragment
    /// arrival and once more on `stop()` so the final iteration does not
    /// wait out the ceiling unnecessarily.
    pub(crate) fn notify_ack_loop(&self) {
        let mut pending = self.ack_send_lock.lock().unwrap();
        *pending = true;
        self.ack_send_condvar.notify_one();
    }
}

/// Not-yet-started reader: holds everything needed to spawn the two
/// threads, constructed once per stream.
pub struct Reader {
    shared: Arc<Shared>,
    network: Arc<dyn NetworkManager>,
    data_buffer_id: u16,
    ack_buffer_id: u16,
    config: ReaderConfig,
    initial_buf: Box<[u8]>,
    handler: Box<dyn FrameHandler>,
}

impl Reader {
    /// Validates construction arguments and builds a reader that has not
    /// yet started its threads. Fails with [`ReaderError::BadParameters`]
    /// if `initial_buf` is empty.
    pub fn new(
        network: Arc<dyn NetworkManager>,
        data_buffer_id: u16,
        ack_buffer_id: u16,
        config: ReaderConfig,
        initial_buf: Box<[u8]>,
        handler: Box<dyn FrameHandler>,
    ) -> Result<Self> {
        if initial_buf.is_empty() {
            return Err(ReaderError::BadParameters);
        }
        Ok(Self {
            shared: Arc::new(Shared::new()),
            network,
            data_buffer_id,
            ack_buffer_id,
            config,
            initial_buf,
            handler,
        })
    }

    /// Starts the data loop and ack loop threads and returns a handle to
    /// control them. Consumes the reader: once spawned, the two threads
    /// own everything.
    pub fn spawn(self) -> ReaderHandle {
        self.shared.data_running.store(true, Ordering::SeqCst);
        self.shared.ack_running.store(true, Ordering::SeqCst);

        let data_shared = Arc::clone(&self.shared);
        let data_network = Arc::clone(&self.network);
        let fragment_size = self.config.fragment_size;
        let read_timeout = self.config.read_timeout;
        let data_buffer_id = self.data_buffer_id;
        let initial_buf = self.initial_buf;
        let mut handler = self.handler;
        let data_thread = thread::spawn(move || {
            data_loop::run(
                &data_shared,
                data_network.as_ref(),
                data_buffer_id,
                fragment_size,
                read_timeout,
                initial_buf,
                handler.as_mut(),
            );
        });

        let ack_shared = Arc::clone(&self.shared);
        let ack_network = Arc::clone(&self.network);
        let ack_buffer_id = self.ack_buffer_id;
        let max_time_between_ack = self.config.max_time_between_ack;
        let ack_thread = thread::spawn(move || {
            ack_loop::run(
                &ack_shared,
                ack_network.as_ref(),
                ack_buffer_id,
                max_time_between_ack,
            );
        });

        ReaderHandle {
            shared: self.shared,
            data_thread: Some(data_thread),
            ack_thread: Some(ack_thread),
        }
    }
}

/// A running reader. Owns the two join handles; dropping a handle whose
/// loops are still running detaches them (they keep running until they
/// observe `stop_requested`).
pub struct ReaderHandle {
    shared: Arc<Shared>,
    data_thread: Option<JoinHandle<()>>,
    ack_thread: Option<JoinHandle<()>>,
}

impl ReaderHandle {
    /// Requests cooperative shutdown. Each loop observes this at the top
    /// of its next iteration; neither is forcibly interrupted.
    pub fn stop(&self) {
        self.shared.stop_requested.store(true, Ordering::SeqCst);
        self.shared.notify_ack_loop();
    }

    /// `true` once the reader has been asked to stop (does not imply the
    /// loops have exited yet).
    pub fn stop_requested(&self) -> bool {
        self.shared.stop_requested.load(Ordering::SeqCst)
    }

    /// The rolling efficiency estimate, see [`crate::efficiency`].
    pub fn estimated_efficiency(&self) -> f32 {
        self.shared.ack_slot.lock().unwrap().efficiency.efficiency()
    }

    /// Succeeds only once both loops have cleared their running flags;
    /// joins both threads and consumes the handle. Otherwise returns the
    /// handle unchanged to the caller, per the reader's "left intact on
    /// busy" lifecycle contract.
    pub fn try_delete(mut self) -> std::result::Result<(), Self> {
        if self.shared.data_running.load(Ordering::SeqCst)
            || self.shared.ack_running.load(Ordering::SeqCst)
        {
            return Err(self);
        }
        if let Some(t) = self.data_thread.take() {
            let _ = t.join();
        }
        if let Some(t) = self.ack_thread.take() {
            let _ = t.join();
        }
        Ok(())
    }
}
