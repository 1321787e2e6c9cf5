//! Dispatch and reader workers.
//!
//! The dispatch worker is the channel's single deferred consumer: a
//! dedicated thread parked on the channel's wake signal, running
//! [`LinkChannel::service`] whenever the ingest path completes a frame. It
//! exits, loudly, when the peer breaks protocol.
//!
//! The reader worker is optional glue for platforms without an IRQ-driven
//! byte source: it polls the read half of a [`Transport`] and feeds every
//! byte into [`LinkChannel::ingest`], the way a receive interrupt would.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{error, info, warn};

use crate::link::channel::LinkChannel;
use crate::link::transport::Transport;

/// Read-poll interval for the reader worker.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

const READ_BUF_SIZE: usize = 64;

/// Handle to the deferred dispatch thread.
pub struct DispatchWorker<T: Transport + Send + 'static> {
    stop: Arc<AtomicBool>,
    channel: Arc<LinkChannel<T>>,
    handle: Option<JoinHandle<()>>,
}

/// Spawn the dispatch worker for `channel`.
///
/// Handlers must be registered before this call; the channel is shared
/// from here on.
pub fn spawn_dispatcher<T>(channel: Arc<LinkChannel<T>>) -> DispatchWorker<T>
where
    T: Transport + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let thread_stop = Arc::clone(&stop);
    let thread_channel = Arc::clone(&channel);

    let handle = thread::Builder::new()
        .name("link-dispatch".into())
        .spawn(move || {
            futures_lite::future::block_on(async {
                loop {
                    thread_channel.wake_signal().wait().await;
                    if thread_stop.load(Ordering::Relaxed) {
                        break;
                    }
                    if let Err(err) = thread_channel.service() {
                        error!("dispatch worker stopping: {err}");
                        break;
                    }
                }
            });
            info!("dispatch worker exited");
        })
        .expect("failed to spawn dispatch worker");

    DispatchWorker {
        stop,
        channel,
        handle: Some(handle),
    }
}

impl<T: Transport + Send + 'static> DispatchWorker<T> {
    /// Stop the worker and wait for it to exit.
    pub fn stop(self) {
        // Drop does the work.
    }

    /// True if the worker stopped because the channel was poisoned.
    pub fn channel_failed(&self) -> bool {
        self.channel.is_poisoned()
    }
}

impl<T: Transport + Send + 'static> Drop for DispatchWorker<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.stop.store(true, Ordering::Relaxed);
            self.channel.wake_signal().signal(());
            let _ = handle.join();
        }
    }
}

/// Handle to the polling reader thread.
pub struct ReaderWorker {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

/// Spawn a polling reader that bridges `rx` into `channel.ingest`.
pub fn spawn_reader<R, T>(mut rx: R, channel: Arc<LinkChannel<T>>) -> ReaderWorker
where
    R: Transport + Send + 'static,
    T: Transport + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let thread_stop = Arc::clone(&stop);

    let handle = thread::Builder::new()
        .name("link-io".into())
        .spawn(move || {
            let mut buf = [0u8; READ_BUF_SIZE];
            while !thread_stop.load(Ordering::Relaxed) {
                match rx.read(&mut buf) {
                    Ok(0) => thread::sleep(POLL_INTERVAL),
                    Ok(n) => {
                        for &byte in &buf[..n] {
                            channel.ingest(byte);
                        }
                    }
                    Err(err) => {
                        warn!("reader worker stopping, read error: {err:?}");
                        break;
                    }
                }
            }
            info!("reader worker exited");
        })
        .expect("failed to spawn reader worker");

    ReaderWorker {
        stop,
        handle: Some(handle),
    }
}

impl ReaderWorker {
    /// Stop the worker and wait for it to exit.
    pub fn stop(self) {
        // Drop does the work.
    }
}

impl Drop for ReaderWorker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.stop.store(true, Ordering::Relaxed);
            let _ = handle.join();
        }
    }
}
