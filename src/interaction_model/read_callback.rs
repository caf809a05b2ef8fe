//! Streaming delivery of attribute reports to the caller that issued a read.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::{
    constants::READ_HANDLE_BASE,
    error::{Error, Result},
    message::AttributeInfo,
    tlv::TlvValue,
};

use super::ReadHandle;

pub type OnData = Box<dyn FnMut(&AttributeInfo, TlvValue, u8) + Send>;
pub type OnEnd = Box<dyn FnOnce(u32) + Send>;

/// The pair of callbacks for one read. `on_data` runs once per report, then `on_end`
/// runs exactly once with the terminal error code.
pub struct ReadCallback {
    on_data: OnData,
    on_end: Option<OnEnd>,
}

impl ReadCallback {
    pub fn new<D, E>(on_data: D, on_end: E) -> Self
    where
        D: FnMut(&AttributeInfo, TlvValue, u8) + Send + 'static,
        E: FnOnce(u32) + Send + 'static,
    {
        Self {
            on_data: Box::new(on_data),
            on_end: Some(Box::new(on_end)),
        }
    }
}

struct Registration {
    cancelled: AtomicBool,
    callback: Mutex<ReadCallback>,
}

/// Maps each outstanding read to its callbacks.
///
/// Callbacks run with the registry unlocked, so they may register or cancel reads.
/// Each registration has its own lock, which orders a report being delivered before
/// the end of the same read.
#[derive(Default)]
pub struct ReadCallbackRegistry {
    callbacks: Mutex<HashMap<ReadHandle, Arc<Registration>>>,
}

impl ReadCallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, handle: ReadHandle, callback: ReadCallback) -> Result<()> {
        if handle < READ_HANDLE_BASE {
            return Err(Error::HandleBelowReserved(handle));
        }
        let mut callbacks = self.callbacks.lock();
        if callbacks.contains_key(&handle) {
            return Err(Error::DuplicateRegistration(handle));
        }
        callbacks.insert(
            handle,
            Arc::new(Registration {
                cancelled: AtomicBool::new(false),
                callback: Mutex::new(callback),
            }),
        );
        Ok(())
    }

    /// Stop delivering to the callbacks of `handle`. The read itself is not stopped,
    /// reports that still arrive for it are dropped.
    pub fn cancel(&self, handle: ReadHandle) -> bool {
        let removed = self.callbacks.lock().remove(&handle);
        match removed {
            Some(registration) => {
                registration.cancelled.store(true, Ordering::Release);
                debug!(handle, "read callback cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_registered(&self, handle: ReadHandle) -> bool {
        self.callbacks.lock().contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.callbacks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hand a report to the read's `on_data`. Returns false if nothing is registered.
    pub fn dispatch_data(
        &self,
        handle: ReadHandle,
        info: &AttributeInfo,
        value: TlvValue,
        status: u8,
    ) -> bool {
        let Some(registration) = self.callbacks.lock().get(&handle).cloned() else {
            trace!(handle, %info, "dropping report for unregistered read");
            return false;
        };
        let mut callback = registration.callback.lock();
        if registration.cancelled.load(Ordering::Acquire) || callback.on_end.is_none() {
            trace!(handle, %info, "dropping report for finished read");
            return false;
        }
        (callback.on_data)(info, value, status);
        true
    }

    /// End the read, calling its `on_end`. Returns false if nothing is registered.
    pub fn dispatch_end(&self, handle: ReadHandle, error_code: u32) -> bool {
        let Some(registration) = self.callbacks.lock().remove(&handle) else {
            trace!(handle, error_code, "dropping end for unregistered read");
            return false;
        };
        let on_end = registration.callback.lock().on_end.take();
        match on_end {
            Some(on_end) => {
                on_end(error_code);
                true
            }
            None => false,
        }
    }
}
