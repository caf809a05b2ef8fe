//! Blocking requests over the native engine.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::{
    config::ClientConfig,
    error::{Error, Result},
    interaction_model::{
        command_status::is_tracked, AttributeRead, CommandHandle, CommandStatusTable,
        HandleAllocator, NativeCallbackAdapter, ReadCallback, ReadCallbackRegistry, ReadHandle,
    },
    message::{encode_attribute_paths, AttributeInfo, CommandStatusRecord},
    native::{InvokeCommand, NativeEngine},
    tlv::{AttributeDecoder, TlvDecoder, TlvValue},
};

/// A session with the native engine.
///
/// Registers its callbacks with the engine on construction and removes them on drop.
/// Every method blocks the calling thread until the engine has answered, so they are
/// meant to be called from application threads, never from an engine callback.
pub struct InteractionClient<E: NativeEngine> {
    engine: Arc<E>,
    config: ClientConfig,
    command_status: Arc<CommandStatusTable>,
    read_callbacks: Arc<ReadCallbackRegistry>,
    handles: &'static HandleAllocator,
}

impl<E: NativeEngine> InteractionClient<E> {
    pub fn new(engine: Arc<E>, config: ClientConfig) -> Self {
        Self::with_decoder(engine, config, TlvDecoder)
    }

    /// Create a session that decodes attribute data with `decoder`.
    pub fn with_decoder<D: AttributeDecoder>(
        engine: Arc<E>,
        config: ClientConfig,
        decoder: D,
    ) -> Self {
        let command_status = Arc::new(CommandStatusTable::new());
        let read_callbacks = Arc::new(ReadCallbackRegistry::new());
        engine.set_delegate(Arc::new(NativeCallbackAdapter::new(
            command_status.clone(),
            read_callbacks.clone(),
            decoder,
        )));
        Self {
            engine,
            config,
            command_status,
            read_callbacks,
            handles: HandleAllocator::global(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn command_status(&self) -> &CommandStatusTable {
        &self.command_status
    }

    pub fn read_callbacks(&self) -> &ReadCallbackRegistry {
        &self.read_callbacks
    }

    pub fn next_read_handle(&self) -> ReadHandle {
        self.handles.next_read_handle()
    }

    /// Allocate a command sender in the engine, with its status cleared.
    pub fn new_command_handle(&self) -> Result<CommandHandle> {
        let handle = self.engine.new_command_sender().map_err(Error::Native)?;
        self.command_status.clear(handle);
        Ok(handle)
    }

    /// Send `command` on `handle` and wait for the terminal status of the invoke.
    ///
    /// Returns `None` for the placeholder and null handles, whose outcome is not tracked.
    pub fn send_command(
        &self,
        handle: CommandHandle,
        command: &InvokeCommand,
    ) -> Result<Option<u32>> {
        self.issue_command(handle, command)?;
        let code = match self.config.wait_timeout() {
            Some(timeout) => self.command_status.wait_status_timeout(handle, timeout)?,
            None => self.command_status.wait_status(handle),
        };
        self.consumed(handle);
        Ok(code)
    }

    /// Send `command` on `handle` and wait for the terminal status, together with the
    /// status record of the command at `index` of the batch.
    pub fn send_command_and_wait_index(
        &self,
        handle: CommandHandle,
        command: &InvokeCommand,
        index: u8,
    ) -> Result<(Option<u32>, Option<CommandStatusRecord>)> {
        self.issue_command(handle, command)?;
        let status = match self.config.wait_timeout() {
            Some(timeout) => self
                .command_status
                .wait_index_status_timeout(handle, index, timeout)?,
            None => self.command_status.wait_index_status(handle, index),
        };
        self.consumed(handle);
        Ok(status)
    }

    /// Read `paths` from a node and return the reports in the order they arrived.
    pub fn read_attributes(
        &self,
        node_id: u64,
        admin_id: u16,
        paths: &[AttributeInfo],
    ) -> Result<Vec<AttributeRead>> {
        let response = Arc::new(ReadResponse::default());
        let on_data = {
            let response = response.clone();
            move |path: &AttributeInfo, value: TlvValue, status: u8| {
                debug!(%path, ?value, status, "read data");
                response.state.lock().reports.push(AttributeRead {
                    path: *path,
                    value,
                    status,
                    version: 0,
                });
            }
        };
        let on_end = {
            let response = response.clone();
            move |error_code: u32| {
                let mut state = response.state.lock();
                state.error_code = Some(error_code);
                response.ended.notify_all();
            }
        };

        let handle = self.read_attributes_with(
            node_id,
            admin_id,
            paths,
            ReadCallback::new(on_data, on_end),
        )?;
        let error_code = response.wait(self.config.wait_timeout()).map_err(|e| {
            self.read_callbacks.cancel(handle);
            e
        })?;
        debug!(handle, error_code, "read interaction ended");
        if error_code != 0 {
            return Err(Error::Status(error_code));
        }
        let reports = std::mem::take(&mut response.state.lock().reports);
        Ok(reports)
    }

    /// Issue a read whose reports are streamed to `callback`, and return its handle.
    pub fn read_attributes_with(
        &self,
        node_id: u64,
        admin_id: u16,
        paths: &[AttributeInfo],
        callback: ReadCallback,
    ) -> Result<ReadHandle> {
        let handle = self.handles.next_read_handle();
        self.read_callbacks.register(handle, callback)?;

        let encoded = encode_attribute_paths(paths);
        let res = self
            .engine
            .send_read_request(node_id, admin_id, &encoded, paths.len(), handle);
        if res != 0 {
            self.read_callbacks.cancel(handle);
            return Err(Error::Native(res));
        }
        debug!(handle, node_id, admin_id, paths = paths.len(), "read request sent");
        Ok(handle)
    }

    /// Stop delivering reports of a read started with [`Self::read_attributes_with`].
    pub fn cancel_read(&self, handle: ReadHandle) -> bool {
        self.read_callbacks.cancel(handle)
    }

    fn issue_command(&self, handle: CommandHandle, command: &InvokeCommand) -> Result<()> {
        self.command_status.clear(handle);
        let res = self.engine.send_command(handle, command);
        if res != 0 {
            return Err(Error::Native(res));
        }
        debug!(
            handle,
            endpoint = command.endpoint_id,
            cluster = command.cluster_id,
            command = command.command_id,
            "command sent"
        );
        Ok(())
    }

    fn consumed(&self, handle: CommandHandle) {
        if self.config.release_on_consume && is_tracked(handle) {
            self.command_status.release(handle);
        }
    }
}

#[cfg(feature = "std-tokio")]
impl<E: NativeEngine + 'static> InteractionClient<E> {
    /// [`Self::send_command`] on the blocking thread pool.
    pub async fn send_command_async(
        self: Arc<Self>,
        handle: CommandHandle,
        command: InvokeCommand,
    ) -> Result<Option<u32>> {
        tokio::task::spawn_blocking(move || self.send_command(handle, &command)).await?
    }

    /// [`Self::read_attributes`] on the blocking thread pool.
    pub async fn read_attributes_async(
        self: Arc<Self>,
        node_id: u64,
        admin_id: u16,
        paths: Vec<AttributeInfo>,
    ) -> Result<Vec<AttributeRead>> {
        tokio::task::spawn_blocking(move || self.read_attributes(node_id, admin_id, &paths)).await?
    }
}

impl<E: NativeEngine> Drop for InteractionClient<E> {
    fn drop(&mut self) {
        self.engine.clear_delegate();
    }
}

#[derive(Default)]
struct ReadState {
    reports: Vec<AttributeRead>,
    error_code: Option<u32>,
}

#[derive(Default)]
struct ReadResponse {
    state: Mutex<ReadState>,
    ended: Condvar,
}

impl ReadResponse {
    fn wait(&self, timeout: Option<Duration>) -> Result<u32> {
        let deadline = timeout.map(|timeout| (timeout, Instant::now() + timeout));
        let mut state = self.state.lock();
        loop {
            if let Some(error_code) = state.error_code {
                return Ok(error_code);
            }
            match deadline {
                Some((timeout, deadline)) => {
                    if self.ended.wait_until(&mut state, deadline).timed_out() {
                        return state.error_code.ok_or(Error::Timeout(timeout));
                    }
                }
                None => self.ended.wait(&mut state),
            }
        }
    }
}
