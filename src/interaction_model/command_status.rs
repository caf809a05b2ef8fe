//! Terminal and per-command status of outstanding invokes.
//!
//! An invoke may batch several commands. The device acknowledges each of them with a
//! status record before the engine reports the terminal result of the whole invoke, and
//! a command answered with a response command gets no status record at all. The two are
//! therefore kept in separate maps under one lock, keyed by the same handle.
//!
//! Entries live until they are cleared, overwritten or released. Nothing is evicted on
//! its own, so a long running session that never releases handles keeps growing.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::trace;

use crate::{
    constants::{NULL_COMMAND_HANDLE, PLACEHOLDER_COMMAND_HANDLE},
    error::{Error, Result},
    message::CommandStatusRecord,
};

use super::CommandHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// Cleared, the terminal result has not arrived yet.
    Pending,
    /// The terminal result, 0 on success.
    ErrorCode(u32),
}

#[derive(Default)]
struct StatusState {
    status: HashMap<CommandHandle, CommandStatus>,
    index_status: HashMap<CommandHandle, HashMap<u8, CommandStatusRecord>>,
}

impl StatusState {
    fn terminal(&self, handle: CommandHandle) -> Option<u32> {
        match self.status.get(&handle) {
            Some(CommandStatus::ErrorCode(code)) => Some(*code),
            _ => None,
        }
    }
}

/// Whether waits on `handle` are correlated with a terminal status.
pub fn is_tracked(handle: CommandHandle) -> bool {
    handle != NULL_COMMAND_HANDLE && handle != PLACEHOLDER_COMMAND_HANDLE
}

#[derive(Default)]
pub struct CommandStatusTable {
    state: Mutex<StatusState>,
    // Waiters on any handle share this, each re-checks its own handle on wake.
    changed: Condvar,
}

impl CommandStatusTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset `handle` before sending on it. Without this, a wait returns the result of
    /// the previous invoke on the same handle.
    pub fn clear(&self, handle: CommandHandle) {
        let mut state = self.state.lock();
        state.status.insert(handle, CommandStatus::Pending);
        state.index_status.insert(handle, HashMap::new());
    }

    /// Store the terminal result and wake every waiter.
    pub fn set_status(&self, handle: CommandHandle, code: u32) {
        let mut state = self.state.lock();
        trace!(handle, code, "command status");
        state.status.insert(handle, CommandStatus::ErrorCode(code));
        self.changed.notify_all();
    }

    pub fn set_index_status(&self, handle: CommandHandle, index: u8, record: CommandStatusRecord) {
        let mut state = self.state.lock();
        trace!(handle, index, ?record, "command index status");
        state
            .index_status
            .entry(handle)
            .or_default()
            .insert(index, record);
    }

    pub fn status(&self, handle: CommandHandle) -> Option<CommandStatus> {
        self.state.lock().status.get(&handle).copied()
    }

    pub fn index_status(&self, handle: CommandHandle, index: u8) -> Option<CommandStatusRecord> {
        Self::record(&self.state.lock(), handle, index)
    }

    /// Block until the terminal result for `handle` is set, and return it.
    ///
    /// Returns `None` straight away for [`PLACEHOLDER_COMMAND_HANDLE`] and
    /// [`NULL_COMMAND_HANDLE`], which carry no correlation. There is no timeout, see
    /// [`Self::wait_status_timeout`].
    pub fn wait_status(&self, handle: CommandHandle) -> Option<u32> {
        if !is_tracked(handle) {
            return None;
        }
        let mut state = self.state.lock();
        Some(self.wait_locked(&mut state, handle))
    }

    pub fn wait_status_timeout(
        &self,
        handle: CommandHandle,
        timeout: Duration,
    ) -> Result<Option<u32>> {
        if !is_tracked(handle) {
            return Ok(None);
        }
        let mut state = self.state.lock();
        self.wait_locked_timeout(&mut state, handle, timeout)
            .map(Some)
    }

    /// Wait as [`Self::wait_status`] does, then return the result together with the
    /// status record of command `index`. The record is `None` when the device answered
    /// that command with a response command instead of a status.
    pub fn wait_index_status(
        &self,
        handle: CommandHandle,
        index: u8,
    ) -> (Option<u32>, Option<CommandStatusRecord>) {
        if !is_tracked(handle) {
            return (None, None);
        }
        let mut state = self.state.lock();
        let code = self.wait_locked(&mut state, handle);
        (Some(code), Self::record(&state, handle, index))
    }

    pub fn wait_index_status_timeout(
        &self,
        handle: CommandHandle,
        index: u8,
        timeout: Duration,
    ) -> Result<(Option<u32>, Option<CommandStatusRecord>)> {
        if !is_tracked(handle) {
            return Ok((None, None));
        }
        let mut state = self.state.lock();
        let code = self.wait_locked_timeout(&mut state, handle, timeout)?;
        Ok((Some(code), Self::record(&state, handle, index)))
    }

    /// Forget everything recorded for `handle`.
    pub fn release(&self, handle: CommandHandle) {
        let mut state = self.state.lock();
        state.status.remove(&handle);
        state.index_status.remove(&handle);
    }

    /// Number of handles with a recorded status.
    pub fn len(&self) -> usize {
        self.state.lock().status.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn wait_locked(&self, state: &mut MutexGuard<'_, StatusState>, handle: CommandHandle) -> u32 {
        loop {
            if let Some(code) = state.terminal(handle) {
                return code;
            }
            self.changed.wait(state);
        }
    }

    fn wait_locked_timeout(
        &self,
        state: &mut MutexGuard<'_, StatusState>,
        handle: CommandHandle,
        timeout: Duration,
    ) -> Result<u32> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(code) = state.terminal(handle) {
                return Ok(code);
            }
            if self.changed.wait_until(state, deadline).timed_out() {
                return state.terminal(handle).ok_or(Error::Timeout(timeout));
            }
        }
    }

    fn record(state: &StatusState, handle: CommandHandle, index: u8) -> Option<CommandStatusRecord> {
        state
            .index_status
            .get(&handle)
            .and_then(|indices| indices.get(&index))
            .copied()
    }
}
