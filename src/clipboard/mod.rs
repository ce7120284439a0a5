//! Clipboard access with timed clearing.
//!
//! `copy_secret` puts a value on the clipboard and returns a
//! [`ClipboardClear`] handle.  The handle owns a worker thread that wipes
//! the clipboard once the timeout expires:
//!
//! - `wait()` blocks until the clear has run.
//! - `cancel()` stops the worker; the clipboard is left alone.
//! - dropping the handle clears right away.
//! - a [`ClearTrigger`] taken from the handle clears right away from any
//!   thread, e.g. a Ctrl-C handler while the main thread sits in `wait()`.
//!
//! The worker only holds a SHA-256 digest of the copied value, and only
//! clears if the clipboard still holds that value.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::errors::{RabbitHoleError, Result};

/// Minimal clipboard surface used by RabbitHole.
pub trait ClipboardBackend: Send + Sync {
    /// Current text content, or `None` if the clipboard holds no text.
    fn get_text(&self) -> Result<Option<String>>;

    fn set_text(&self, text: &str) -> Result<()>;

    fn clear(&self) -> Result<()>;
}

/// The OS clipboard, via `arboard`.
///
/// On X11 and Wayland the copied text is served by this process, so the
/// handle must stay alive until the clear has run.
pub struct SystemClipboard {
    inner: Mutex<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Result<Self> {
        let inner = arboard::Clipboard::new().map_err(clipboard_error)?;
        Ok(Self {
            inner: Mutex::new(inner),
        })
    }

    fn with<T>(
        &self,
        f: impl FnOnce(&mut arboard::Clipboard) -> std::result::Result<T, arboard::Error>,
    ) -> Result<T> {
        let mut board = self
            .inner
            .lock()
            .map_err(|_| RabbitHoleError::ClipboardError("clipboard lock poisoned".into()))?;
        f(&mut *board).map_err(clipboard_error)
    }
}

fn clipboard_error(e: arboard::Error) -> RabbitHoleError {
    RabbitHoleError::ClipboardError(e.to_string())
}

impl ClipboardBackend for SystemClipboard {
    fn get_text(&self) -> Result<Option<String>> {
        self.with(|board| match board.get_text() {
            Ok(text) => Ok(Some(text)),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(e),
        })
    }

    fn set_text(&self, text: &str) -> Result<()> {
        self.with(|board| board.set_text(text))
    }

    fn clear(&self) -> Result<()> {
        self.with(|board| board.clear())
    }
}

/// Messages from the handle side to the clear worker.
enum Signal {
    Cancel,
    ClearNow,
}

/// Handle to a scheduled clipboard clear.
#[must_use = "dropping the handle clears the clipboard immediately"]
pub struct ClipboardClear {
    signal_tx: mpsc::Sender<Signal>,
    worker: Option<JoinHandle<()>>,
}

/// Cloneable remote control that fires a pending clear early.
#[derive(Clone)]
pub struct ClearTrigger {
    signal_tx: mpsc::Sender<Signal>,
}

impl ClearTrigger {
    /// Run the clear now.  No-op if it already ran or was cancelled.
    pub fn fire(&self) {
        let _ = self.signal_tx.send(Signal::ClearNow);
    }
}

impl ClipboardClear {
    /// Run `action` on a worker thread once `after` has elapsed.
    pub fn schedule<F>(after: Duration, action: F) -> Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let (signal_tx, signal_rx) = mpsc::channel::<Signal>();

        let worker = thread::Builder::new()
            .name("rabbithole-clipboard".into())
            .spawn(move || match signal_rx.recv_timeout(after) {
                Ok(Signal::Cancel) => tracing::debug!("clipboard clear cancelled"),
                Ok(Signal::ClearNow) => {
                    tracing::debug!("clipboard clear requested early");
                    action();
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => action(),
            })?;

        Ok(Self {
            signal_tx,
            worker: Some(worker),
        })
    }

    /// A trigger that clears immediately when fired.
    pub fn trigger(&self) -> ClearTrigger {
        ClearTrigger {
            signal_tx: self.signal_tx.clone(),
        }
    }

    /// Stop the task without running the clear.
    pub fn cancel(mut self) {
        // The worker may already have fired; nothing to do then.
        let _ = self.signal_tx.send(Signal::Cancel);
        self.join();
    }

    /// Block until the timeout elapses (or a trigger fires) and the clear
    /// has run.
    pub fn wait(mut self) {
        self.join();
    }

    fn join(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("clipboard clear worker panicked");
            }
        }
    }
}

impl Drop for ClipboardClear {
    fn drop(&mut self) {
        // Triggers may keep the channel open, so ask explicitly.
        if self.worker.is_some() {
            let _ = self.signal_tx.send(Signal::ClearNow);
        }
        self.join();
    }
}

/// Copy `text` to the clipboard and schedule a clear after `timeout`.
///
/// The clear is skipped if something else has replaced the clipboard
/// content in the meantime.
pub fn copy_secret<B>(backend: Arc<B>, text: &str, timeout: Duration) -> Result<ClipboardClear>
where
    B: ClipboardBackend + ?Sized + 'static,
{
    backend.set_text(text)?;
    let digest = Sha256::digest(text.as_bytes());
    tracing::debug!(timeout_secs = timeout.as_secs(), "secret copied to clipboard");

    ClipboardClear::schedule(timeout, move || {
        match backend.get_text() {
            Ok(Some(current)) => {
                let current = Zeroizing::new(current);
                if Sha256::digest(current.as_bytes()) != digest {
                    tracing::debug!("clipboard content changed; not clearing");
                    return;
                }
            }
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "could not read clipboard before clearing");
                return;
            }
        }

        match backend.clear() {
            Ok(()) => tracing::info!("clipboard cleared"),
            Err(e) => tracing::warn!(error = %e, "failed to clear clipboard"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Instant;

    #[derive(Default)]
    struct MemoryClipboard {
        content: Mutex<Option<String>>,
    }

    impl MemoryClipboard {
        fn current(&self) -> Option<String> {
            self.content.lock().unwrap().clone()
        }
    }

    impl ClipboardBackend for MemoryClipboard {
        fn get_text(&self) -> Result<Option<String>> {
            Ok(self.current())
        }

        fn set_text(&self, text: &str) -> Result<()> {
            *self.content.lock().unwrap() = Some(text.to_string());
            Ok(())
        }

        fn clear(&self) -> Result<()> {
            *self.content.lock().unwrap() = None;
            Ok(())
        }
    }

    const LONG: Duration = Duration::from_secs(60);

    #[test]
    fn clears_after_timeout() {
        let board = Arc::new(MemoryClipboard::default());
        let handle = copy_secret(board.clone(), "sk-12345", Duration::from_millis(50)).unwrap();
        assert_eq!(board.current().as_deref(), Some("sk-12345"));

        handle.wait();
        assert_eq!(board.current(), None);
    }

    #[test]
    fn cancel_leaves_clipboard_untouched() {
        let board = Arc::new(MemoryClipboard::default());
        let handle = copy_secret(board.clone(), "sk-12345", LONG).unwrap();

        let started = Instant::now();
        handle.cancel();
        assert!(started.elapsed() < LONG);
        assert_eq!(board.current().as_deref(), Some("sk-12345"));
    }

    #[test]
    fn dropping_handle_clears_immediately() {
        let board = Arc::new(MemoryClipboard::default());
        let handle = copy_secret(board.clone(), "sk-12345", LONG).unwrap();

        drop(handle);
        assert_eq!(board.current(), None);
    }

    #[test]
    fn trigger_clears_while_waiting() {
        let board = Arc::new(MemoryClipboard::default());
        let handle = copy_secret(board.clone(), "sk-12345", LONG).unwrap();
        let trigger = handle.trigger();

        let started = Instant::now();
        let firing = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            trigger.fire();
        });
        handle.wait();
        firing.join().unwrap();

        assert!(started.elapsed() < LONG);
        assert_eq!(board.current(), None);
    }

    #[test]
    fn trigger_after_cancel_is_harmless() {
        let board = Arc::new(MemoryClipboard::default());
        let handle = copy_secret(board.clone(), "sk-12345", LONG).unwrap();
        let trigger = handle.trigger();

        handle.cancel();
        trigger.fire();
        assert_eq!(board.current().as_deref(), Some("sk-12345"));
    }

    #[test]
    fn dropping_handle_clears_even_with_live_trigger() {
        let board = Arc::new(MemoryClipboard::default());
        let handle = copy_secret(board.clone(), "sk-12345", LONG).unwrap();
        let _trigger = handle.trigger();

        drop(handle);
        assert_eq!(board.current(), None);
    }

    #[test]
    fn does_not_wipe_foreign_content() {
        let board = Arc::new(MemoryClipboard::default());
        let handle = copy_secret(board.clone(), "sk-12345", Duration::from_millis(50)).unwrap();
        board.set_text("something the user copied").unwrap();

        handle.wait();
        assert_eq!(board.current().as_deref(), Some("something the user copied"));
    }

    #[test]
    fn schedule_runs_action_once() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let handle = ClipboardClear::schedule(Duration::from_millis(10), move || {
            assert!(!flag.swap(true, Ordering::SeqCst));
        })
        .unwrap();

        handle.wait();
        assert!(fired.load(Ordering::SeqCst));
    }
}
