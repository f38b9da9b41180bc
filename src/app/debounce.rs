use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

enum Message<T> {
    Schedule(T),
    Flush(mpsc::Sender<()>),
    Shutdown,
}

/// Coalesces bursts of values into one call of a sink.
///
/// Every `schedule` replaces the pending value and restarts the quiet period;
/// the sink runs on a worker thread once the period passes without another
/// value. Dropping the debouncer runs anything still pending and joins the
/// worker.
pub struct Debouncer<T: Send + 'static> {
    tx: mpsc::Sender<Message<T>>,
    worker: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(delay: Duration, mut sink: impl FnMut(T) + Send + 'static) -> Self {
        let (tx, rx) = mpsc::channel::<Message<T>>();
        let worker = thread::spawn(move || {
            let mut pending: Option<T> = None;
            let mut deadline: Option<Instant> = None;
            let mut run = |pending: &mut Option<T>| {
                if let Some(value) = pending.take() {
                    debug!("debounced write firing");
                    sink(value);
                }
            };

            loop {
                let message = match deadline {
                    Some(at) => match rx.recv_timeout(at.saturating_duration_since(Instant::now())) {
                        Ok(message) => message,
                        Err(RecvTimeoutError::Timeout) => {
                            run(&mut pending);
                            deadline = None;
                            continue;
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    },
                    None => match rx.recv() {
                        Ok(message) => message,
                        Err(_) => break,
                    },
                };

                match message {
                    Message::Schedule(value) => {
                        trace!("debounce timer restarted");
                        pending = Some(value);
                        deadline = Some(Instant::now() + delay);
                    }
                    Message::Flush(ack) => {
                        run(&mut pending);
                        deadline = None;
                        let _ = ack.send(());
                    }
                    Message::Shutdown => break,
                }
            }
            run(&mut pending);
        });

        Debouncer {
            tx,
            worker: Some(worker),
        }
    }

    pub fn schedule(&self, value: T) {
        let _ = self.tx.send(Message::Schedule(value));
    }

    /// Run any pending value now and wait for the sink to finish.
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = mpsc::channel();
        if self.tx.send(Message::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }
}

impl<T: Send + 'static> Drop for Debouncer<T> {
    fn drop(&mut self) {
        let _ = self.tx.send(Message::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
