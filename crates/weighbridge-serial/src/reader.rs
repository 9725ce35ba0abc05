//! Weigh reader worker
//!
//! Owns the serial link for the lifetime of the session and runs the
//! open / read / retry loop on a dedicated worker thread. Assembled
//! frames go through [`crate::frame::decode`]; stable samples are
//! delivered in stream order on the stable channel, every decoded
//! sample (stable or not) on the optional live channel for the weight
//! display.
//!
//! Frame and link failures never escape this loop: bad frames are
//! logged and discarded, link failures force-close the port and re-open
//! it after a fixed backoff, indefinitely, until [`ReaderHandle::stop`]
//! is called.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use weighbridge_types::{FrameError, LinkError, WeightSample};

use crate::frame;
use crate::link::PortOpener;

/// Fixed wait between reconnect attempts after an open or read failure.
pub const RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Slice used when sleeping so a stop request is observed promptly.
const BACKOFF_SLICE: Duration = Duration::from_millis(50);

/// Longest frame the assembler will buffer. Real frames are a dozen
/// bytes; a line past this without `\r` is misconfiguration noise
/// (wrong baud rate) and gets discarded instead of growing the buffer.
const MAX_FRAME_LEN: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Stopped,
    Opening,
    Reading,
    Retrying,
}

impl ReaderState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => ReaderState::Opening,
            2 => ReaderState::Reading,
            3 => ReaderState::Retrying,
            _ => ReaderState::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ReaderState::Stopped => 0,
            ReaderState::Opening => 1,
            ReaderState::Reading => 2,
            ReaderState::Retrying => 3,
        }
    }
}

struct Shared {
    running: AtomicBool,
    state: AtomicU8,
}

impl Shared {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn set_state(&self, state: ReaderState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }
}

/// Cloneable control handle for a running reader. Safe to use from any
/// thread.
#[derive(Clone)]
pub struct ReaderHandle {
    shared: Arc<Shared>,
}

impl ReaderHandle {
    /// Request the worker loop to exit. Idempotent; the loop observes
    /// the flag within one read poll or backoff slice and closes the
    /// port on its way out.
    pub fn stop(&self) {
        if self.shared.running.swap(false, Ordering::SeqCst) {
            info!("weigh reader stop requested");
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    pub fn state(&self) -> ReaderState {
        ReaderState::from_u8(self.shared.state.load(Ordering::SeqCst))
    }
}

pub struct WeighReader {
    opener: Box<dyn PortOpener>,
    stable_tx: Option<flume::Sender<WeightSample>>,
    live_tx: Option<flume::Sender<WeightSample>>,
    backoff: Duration,
    shared: Arc<Shared>,
}

impl WeighReader {
    /// A reader with no consumers yet; attach channels with
    /// [`WeighReader::with_stable_channel`] /
    /// [`WeighReader::with_live_channel`], then call
    /// [`WeighReader::start`] on a dedicated worker thread.
    pub fn new(opener: Box<dyn PortOpener>) -> Self {
        Self {
            opener,
            stable_tx: None,
            live_tx: None,
            backoff: RETRY_BACKOFF,
            shared: Arc::new(Shared {
                running: AtomicBool::new(true),
                state: AtomicU8::new(ReaderState::Stopped.as_u8()),
            }),
        }
    }

    /// Deliver stable samples (the transaction-facing channel).
    pub fn with_stable_channel(mut self, stable_tx: flume::Sender<WeightSample>) -> Self {
        self.stable_tx = Some(stable_tx);
        self
    }

    /// Also deliver every decoded sample, stable or not, for a live
    /// weight display.
    pub fn with_live_channel(mut self, live_tx: flume::Sender<WeightSample>) -> Self {
        self.live_tx = Some(live_tx);
        self
    }

    /// Override the reconnect backoff.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn handle(&self) -> ReaderHandle {
        ReaderHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Run the open/read/retry loop until stopped. Blocks for the
    /// lifetime of the session; never call this on the command thread.
    pub fn start(&mut self) {
        info!(port = self.opener.port_name(), "weigh reader starting");
        let mut attempts: u32 = 0;

        while self.shared.is_running() {
            self.shared.set_state(ReaderState::Opening);
            attempts += 1;

            let port = match self.opener.open() {
                Ok(port) => {
                    if attempts > 1 {
                        info!(attempts, "serial port opened after retries");
                    }
                    attempts = 0;
                    port
                }
                Err(e) => {
                    warn!(attempt = attempts, error = %e, "serial port open failed");
                    self.shared.set_state(ReaderState::Retrying);
                    self.wait_backoff();
                    continue;
                }
            };

            self.shared.set_state(ReaderState::Reading);
            match self.read_loop(port) {
                Ok(()) => {} // stop requested, port dropped on scope exit
                Err(e) => {
                    warn!(error = %e, "serial read failed, reconnecting");
                    self.shared.set_state(ReaderState::Retrying);
                    self.wait_backoff();
                }
            }
        }

        self.shared.set_state(ReaderState::Stopped);
        info!("weigh reader stopped");
    }

    /// Read bytes and assemble frames until stop or an I/O error. The
    /// port is force-closed on return by dropping it.
    fn read_loop(&self, mut port: Box<dyn crate::link::WeighPort>) -> Result<(), LinkError> {
        let mut buf = [0u8; 256];
        let mut pending = Vec::new();
        let mut frames: u64 = 0;

        while self.shared.is_running() {
            let n = port.read(&mut buf)?;
            if n == 0 {
                // Poll window elapsed without data; check the stop flag
                // and wait again.
                continue;
            }

            for &byte in &buf[..n] {
                match byte {
                    b'\r' => {
                        frames += 1;
                        self.handle_frame(&pending);
                        pending.clear();
                        if frames % 100 == 0 {
                            debug!(frames, "frames processed");
                        }
                    }
                    b'\n' => {} // never part of a frame
                    other => {
                        if pending.len() >= MAX_FRAME_LEN {
                            warn!(len = pending.len(), "no frame terminator, discarding buffer");
                            pending.clear();
                        }
                        pending.push(other);
                    }
                }
            }
        }

        Ok(())
    }

    fn handle_frame(&self, raw: &[u8]) {
        let text = String::from_utf8_lossy(raw);
        match frame::decode(&text) {
            Ok(sample) => {
                trace!(kg = sample.kg, status = %sample.status.code(), "sample decoded");
                if let Some(live_tx) = &self.live_tx {
                    let _ = live_tx.send(sample);
                }
                if sample.is_stable() {
                    debug!(kg = sample.kg, "stable weight");
                    if let Some(stable_tx) = &self.stable_tx {
                        if stable_tx.send(sample).is_err() {
                            warn!("stable sample dropped: consumer gone");
                        }
                    }
                }
            }
            Err(FrameError::Empty) => trace!("empty frame ignored"),
            Err(FrameError::Malformed(f)) => warn!(frame = %f, "malformed frame discarded"),
        }
    }

    fn wait_backoff(&self) {
        let mut waited = Duration::ZERO;
        while self.shared.is_running() && waited < self.backoff {
            thread::sleep(BACKOFF_SLICE.min(self.backoff - waited));
            waited += BACKOFF_SLICE;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::WeighPort;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted port: plays back a sequence of reads, then reports "no
    /// data" forever, like a quiet line.
    struct ScriptedPort {
        script: VecDeque<Result<Vec<u8>, LinkError>>,
    }

    impl WeighPort for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
            match self.script.pop_front() {
                Some(Ok(bytes)) => {
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Some(Err(e)) => Err(e),
                None => {
                    thread::sleep(Duration::from_millis(5));
                    Ok(0)
                }
            }
        }
    }

    /// Opener playing back one outcome per open attempt; once the
    /// outcomes run out, every further open fails.
    struct ScriptedOpener {
        outcomes: Mutex<VecDeque<Result<Vec<Result<Vec<u8>, LinkError>>, ()>>>,
    }

    impl ScriptedOpener {
        fn new(outcomes: Vec<Result<Vec<Result<Vec<u8>, LinkError>>, ()>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
            }
        }
    }

    impl PortOpener for ScriptedOpener {
        fn open(&self) -> Result<Box<dyn WeighPort>, LinkError> {
            let outcome = self.outcomes.lock().unwrap().pop_front();
            match outcome {
                Some(Ok(script)) => Ok(Box::new(ScriptedPort {
                    script: script.into(),
                })),
                _ => Err(LinkError::OpenFailed {
                    port: "FAKE0".to_string(),
                    reason: "port busy".to_string(),
                }),
            }
        }

        fn port_name(&self) -> &str {
            "FAKE0"
        }
    }

    fn bytes(s: &str) -> Result<Vec<u8>, LinkError> {
        Ok(s.as_bytes().to_vec())
    }

    fn spawn(reader: WeighReader) -> (ReaderHandle, thread::JoinHandle<()>) {
        let handle = reader.handle();
        let join = thread::spawn(move || {
            let mut reader = reader;
            reader.start();
        });
        (handle, join)
    }

    const RECV_WAIT: Duration = Duration::from_secs(2);

    #[test]
    fn test_frames_assembled_across_reads() {
        let opener = ScriptedOpener::new(vec![Ok(vec![
            bytes("P+00"),
            bytes("500\r"),
            bytes("T+00800\rM+0100\r"),
        ])]);
        let (stable_tx, stable_rx) = flume::unbounded();
        let (live_tx, live_rx) = flume::unbounded();
        let reader = WeighReader::new(Box::new(opener))
            .with_stable_channel(stable_tx)
            .with_live_channel(live_tx)
            .with_backoff(Duration::from_millis(10));

        let (handle, join) = spawn(reader);

        // Only the two stable frames reach the transaction channel.
        assert_eq!(stable_rx.recv_timeout(RECV_WAIT).unwrap().kg, 500);
        assert_eq!(stable_rx.recv_timeout(RECV_WAIT).unwrap().kg, 800);

        // The live channel sees all three, in stream order.
        let live: Vec<i32> = (0..3)
            .map(|_| live_rx.recv_timeout(RECV_WAIT).unwrap().kg)
            .collect();
        assert_eq!(live, vec![500, 800, 100]);

        handle.stop();
        join.join().unwrap();
        assert_eq!(handle.state(), ReaderState::Stopped);
    }

    #[test]
    fn test_newline_and_garbage_do_not_break_stream() {
        let opener = ScriptedOpener::new(vec![Ok(vec![bytes(
            "\nP+00500\r\n@@garbage@@\rP+00505\r\n",
        )])]);
        let (stable_tx, stable_rx) = flume::unbounded();
        let reader = WeighReader::new(Box::new(opener))
            .with_stable_channel(stable_tx)
            .with_backoff(Duration::from_millis(10));

        let (handle, join) = spawn(reader);

        assert_eq!(stable_rx.recv_timeout(RECV_WAIT).unwrap().kg, 500);
        assert_eq!(stable_rx.recv_timeout(RECV_WAIT).unwrap().kg, 505);

        handle.stop();
        join.join().unwrap();
    }

    #[test]
    fn test_terminator_free_noise_does_not_stall_stream() {
        // A misconfigured line (wrong baud rate) can emit arbitrarily
        // long runs with no `\r`; the reader must keep its buffer
        // bounded and still decode once real frames appear.
        let noise = "@".repeat(200);
        let opener = ScriptedOpener::new(vec![Ok(vec![
            bytes(&noise),
            bytes(&noise),
            bytes("\rP+00500\r"),
        ])]);
        let (stable_tx, stable_rx) = flume::unbounded();
        let reader = WeighReader::new(Box::new(opener))
            .with_stable_channel(stable_tx)
            .with_backoff(Duration::from_millis(10));

        let (handle, join) = spawn(reader);

        assert_eq!(stable_rx.recv_timeout(RECV_WAIT).unwrap().kg, 500);

        handle.stop();
        join.join().unwrap();
    }

    #[test]
    fn test_open_failure_retries_until_success() {
        // First open fails; the reader must reach Reading and deliver
        // frames without start() being called again.
        let opener = ScriptedOpener::new(vec![Err(()), Ok(vec![bytes("P+00500\r")])]);
        let (stable_tx, stable_rx) = flume::unbounded();
        let reader = WeighReader::new(Box::new(opener))
            .with_stable_channel(stable_tx)
            .with_backoff(Duration::from_millis(10));

        let (handle, join) = spawn(reader);

        assert_eq!(stable_rx.recv_timeout(RECV_WAIT).unwrap().kg, 500);
        assert_eq!(handle.state(), ReaderState::Reading);

        handle.stop();
        join.join().unwrap();
        assert_eq!(handle.state(), ReaderState::Stopped);
    }

    #[test]
    fn test_read_error_reconnects_and_resumes() {
        let opener = ScriptedOpener::new(vec![
            Ok(vec![
                bytes("P+00500\r"),
                Err(LinkError::ReadFailed("cable unplugged".to_string())),
            ]),
            Ok(vec![bytes("P+00800\r")]),
        ]);
        let (stable_tx, stable_rx) = flume::unbounded();
        let reader = WeighReader::new(Box::new(opener))
            .with_stable_channel(stable_tx)
            .with_backoff(Duration::from_millis(10));

        let (handle, join) = spawn(reader);

        assert_eq!(stable_rx.recv_timeout(RECV_WAIT).unwrap().kg, 500);
        assert_eq!(stable_rx.recv_timeout(RECV_WAIT).unwrap().kg, 800);

        handle.stop();
        join.join().unwrap();
    }

    #[test]
    fn test_stop_is_idempotent() {
        // All opens fail, so the reader cycles Opening/Retrying.
        let opener = ScriptedOpener::new(vec![]);
        let (stable_tx, _stable_rx) = flume::unbounded();
        let reader = WeighReader::new(Box::new(opener))
            .with_stable_channel(stable_tx)
            .with_backoff(Duration::from_millis(10));

        let (handle, join) = spawn(reader);
        thread::sleep(Duration::from_millis(30));

        handle.stop();
        handle.stop();
        join.join().unwrap();

        assert_eq!(handle.state(), ReaderState::Stopped);
        assert!(!handle.is_running());

        // Stopping an already stopped reader stays stopped.
        handle.stop();
        assert_eq!(handle.state(), ReaderState::Stopped);
    }
}
