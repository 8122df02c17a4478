#![forbid(unsafe_code)]

//! Backend-independent bookkeeping layered over a [`RenderEngine`].
//!
//! [`EngineBase`] owns the title state so backends never see redundant
//! title updates: a title may be proposed any number of times between two
//! frames, and the backend receives at most one `update_title` per frame,
//! none at all when the final proposal equals what it already shows.
//!
//! Proposals may come from the producer thread through a [`TitleProposer`];
//! commits happen only on the render thread. The title lock is never held
//! across the backend call.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use termframe_core::{CellRect, EngineCaps, GridSize, RegionContent};
use tracing::{debug, trace};

use crate::engine::{EngineError, RenderEngine};

/// Title bookkeeping for one render target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleState {
    last_committed: String,
    pending: Option<String>,
    changed: bool,
    in_flight: Option<String>,
}

impl TitleState {
    /// Record a proposal. It is pending only if it differs from what the
    /// backend shows (or is being sent); a proposal equal to that cancels
    /// any earlier pending one.
    pub fn propose(&mut self, title: &str) {
        let shown = self.in_flight.as_deref().unwrap_or(&self.last_committed);
        self.changed = title != shown;
        self.pending = self.changed.then(|| title.to_owned());
    }

    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    #[must_use]
    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    #[must_use]
    pub fn last_committed(&self) -> &str {
        &self.last_committed
    }

    /// Claim the title to send to the backend, if one is due.
    fn begin_commit(&mut self) -> Option<String> {
        if !self.changed {
            return None;
        }
        let title = self.pending.clone()?;
        self.in_flight = Some(title.clone());
        Some(title)
    }

    /// The backend accepted the in-flight title.
    fn confirm(&mut self) {
        if let Some(title) = self.in_flight.take() {
            self.last_committed = title;
        }
        self.settle();
    }

    /// The backend rejected the in-flight title; it becomes pending again
    /// unless a newer proposal replaced it.
    fn abandon(&mut self) {
        if let Some(title) = self.in_flight.take()
            && self.pending.is_none()
        {
            self.pending = Some(title);
        }
        self.settle();
    }

    fn settle(&mut self) {
        self.changed = self
            .pending
            .as_deref()
            .is_some_and(|p| p != self.last_committed);
        if !self.changed {
            self.pending = None;
        }
    }

    /// Forget what the backend shows so the current title is sent again.
    fn reset_committed(&mut self) {
        let current = self
            .pending
            .take()
            .unwrap_or_else(|| std::mem::take(&mut self.last_committed));
        self.last_committed.clear();
        self.propose(&current);
    }
}

fn lock_title(state: &Mutex<TitleState>) -> MutexGuard<'_, TitleState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cloneable handle for proposing titles from another thread.
#[derive(Debug, Clone)]
pub struct TitleProposer {
    state: Arc<Mutex<TitleState>>,
}

impl TitleProposer {
    pub fn propose(&self, title: &str) {
        lock_title(&self.state).propose(title);
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        lock_title(&self.state).is_changed()
    }
}

/// A backend wrapped with title deduplication.
#[derive(Debug)]
pub struct EngineBase<E> {
    backend: E,
    title: Arc<Mutex<TitleState>>,
    title_commits: u64,
}

impl<E: RenderEngine> EngineBase<E> {
    #[must_use]
    pub fn new(backend: E) -> Self {
        Self {
            backend,
            title: Arc::new(Mutex::new(TitleState::default())),
            title_commits: 0,
        }
    }

    /// Handle that proposes titles into this engine's title state.
    #[must_use]
    pub fn title_proposer(&self) -> TitleProposer {
        TitleProposer {
            state: Arc::clone(&self.title),
        }
    }

    pub fn propose_title(&self, title: &str) {
        lock_title(&self.title).propose(title);
    }

    /// Send the pending title to the backend if it changed. Returns `true`
    /// when a commit happened. On failure the title stays pending.
    ///
    /// A backend without [`EngineCaps::TITLE`] is not called; the title is
    /// recorded as committed.
    pub fn commit_title_if_changed(&mut self) -> Result<bool, EngineError> {
        let Some(title) = lock_title(&self.title).begin_commit() else {
            return Ok(false);
        };
        if self.backend.capabilities().contains(EngineCaps::TITLE) {
            if let Err(err) = self.backend.update_title(&title) {
                lock_title(&self.title).abandon();
                return Err(err);
            }
            self.title_commits += 1;
            debug!(engine = self.backend.name(), title = %title, "title committed");
        } else {
            trace!(engine = self.backend.name(), "title skipped: backend has no title support");
        }
        lock_title(&self.title).confirm();
        Ok(true)
    }

    #[must_use]
    pub fn title_pending(&self) -> bool {
        lock_title(&self.title).is_changed()
    }

    #[must_use]
    pub fn last_committed_title(&self) -> String {
        lock_title(&self.title).last_committed().to_owned()
    }

    /// Number of `update_title` calls that reached the backend.
    #[must_use]
    pub fn title_commits(&self) -> u64 {
        self.title_commits
    }

    /// Swap in a new backend and return the old one. The current title is
    /// re-sent to the new backend on the next commit.
    pub fn replace_backend(&mut self, backend: E) -> E {
        self.forget_committed_title();
        std::mem::replace(&mut self.backend, backend)
    }

    /// The backend may no longer show the committed title (a failed present
    /// can drop a staged title). The current title becomes pending again.
    pub fn forget_committed_title(&self) {
        lock_title(&self.title).reset_committed();
    }

    #[must_use]
    pub fn backend(&self) -> &E {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut E {
        &mut self.backend
    }

    pub fn into_backend(self) -> E {
        self.backend
    }

    // ── delegated operations ────────────────────────────────────────────

    #[must_use]
    pub fn name(&self) -> &str {
        self.backend.name()
    }

    #[must_use]
    pub fn capabilities(&self) -> EngineCaps {
        self.backend.capabilities()
    }

    pub fn invalidate(&mut self, rect: CellRect) -> Result<(), EngineError> {
        self.backend.invalidate(rect)
    }

    pub fn paint_region(&mut self, rect: CellRect, content: &RegionContent) -> Result<(), EngineError> {
        self.backend.paint_region(rect, content)
    }

    pub fn present(&mut self) -> Result<(), EngineError> {
        self.backend.present()
    }

    pub fn resize(&mut self, size: GridSize) -> Result<(), EngineError> {
        self.backend.resize(size)
    }
}
