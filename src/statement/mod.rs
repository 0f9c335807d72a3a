//! Statement text and its settle policy.
//!
//! Every edit replaces the text immediately and bumps `edit_revision`. A
//! separate `settled_revision` only catches up once the debounce window has
//! passed with no further edits. Verification runs on settle, never per
//! keystroke: N edits inside one window produce exactly one settle event
//! carrying the last revision.
//!
//! Timers use `tokio::time`, so tests drive the window with paused time.

use std::fmt;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// Quiet period after the last edit before the statement counts as stable
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(2000);

/// Monotonic edit counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Revision(u64);

impl Revision {
    pub const ZERO: Self = Self(0);

    pub fn get(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Callback fired once per settle event
pub type SettleHandler = Box<dyn FnMut(Revision) + Send>;

/// Current statement plus the debounce bookkeeping.
pub struct StatementState {
    content: String,
    edit_revision: Revision,
    settled_revision: Revision,
    window: Duration,
    deadline: Option<Instant>,
    handlers: Vec<SettleHandler>,
}

impl StatementState {
    /// Stable statement with the default 2 second window
    pub fn new(content: impl Into<String>) -> Self {
        Self::with_window(content, DEFAULT_DEBOUNCE)
    }

    pub fn with_window(content: impl Into<String>, window: Duration) -> Self {
        Self {
            content: content.into(),
            edit_revision: Revision::ZERO,
            settled_revision: Revision::ZERO,
            window,
            deadline: None,
            handlers: Vec::new(),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn edit_revision(&self) -> Revision {
        self.edit_revision
    }

    pub fn settled_revision(&self) -> Revision {
        self.settled_revision
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// When the pending settle fires, if an edit is waiting
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Replace the text and restart the debounce window.
    pub fn set_content(&mut self, text: impl Into<String>) -> Revision {
        self.content = text.into();
        self.edit_revision = self.edit_revision.next();
        self.deadline = Some(Instant::now() + self.window);
        self.edit_revision
    }

    /// Replace the text and settle at once, cancelling any pending window.
    ///
    /// Used for bundle imports, whose signatures are checked immediately.
    pub fn load(&mut self, text: impl Into<String>) -> Revision {
        self.content = text.into();
        self.edit_revision = self.edit_revision.next();
        self.deadline = None;
        self.settle()
    }

    /// No edit happened within the last debounce window.
    pub fn is_stable(&self) -> bool {
        self.settled_revision == self.edit_revision
    }

    /// An edit is waiting for its window to elapse
    pub fn is_processing(&self) -> bool {
        !self.is_stable()
    }

    /// Register a settle handler.
    pub fn on_settle(&mut self, handler: impl FnMut(Revision) + Send + 'static) {
        self.handlers.push(Box::new(handler));
    }

    /// Settle if the window has elapsed by `now`.
    pub fn poll_settle(&mut self, now: Instant) -> Option<Revision> {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                Some(self.settle())
            }
            _ => None,
        }
    }

    /// Wait for the next settle event.
    ///
    /// Pending forever while nothing is waiting to settle. Cancel safe: a
    /// dropped wait leaves the state untouched.
    pub async fn settled(&mut self) -> Revision {
        loop {
            match self.deadline {
                Some(deadline) => {
                    sleep_until(deadline).await;
                    if let Some(revision) = self.poll_settle(Instant::now()) {
                        return revision;
                    }
                }
                None => std::future::pending::<()>().await,
            }
        }
    }

    fn settle(&mut self) -> Revision {
        self.settled_revision = self.edit_revision;
        debug!(revision = %self.settled_revision, "statement settled");
        for handler in &mut self.handlers {
            handler(self.settled_revision);
        }
        self.settled_revision
    }
}

impl fmt::Debug for StatementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatementState")
            .field("content", &self.content)
            .field("edit_revision", &self.edit_revision)
            .field("settled_revision", &self.settled_revision)
            .field("window", &self.window)
            .field("deadline", &self.deadline)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl Default for StatementState {
    fn default() -> Self {
        Self::new(String::new())
    }
}
