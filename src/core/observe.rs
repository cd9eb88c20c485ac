//! Observation sink.
//!
//! Components never log directly; they report [`Event`]s to an [`Observer`]
//! handed to them by the caller. The binary uses [`TracingObserver`], tests
//! use [`Recorder`].

use std::cell::RefCell;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, warn};

use crate::core::types::ProviderLocator;

/// Something worth reporting that does not abort the launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A provider returned successfully.
    SecretsFetched {
        locator: ProviderLocator,
        keys: usize,
        elapsed: Duration,
    },
    /// A later provider overwrote a key set by an earlier one.
    SecretCollision {
        key: String,
        locator: ProviderLocator,
    },
    /// A secret overwrote an inherited environment variable.
    EnvOverwrite { key: String },
    /// The open-files limit was changed.
    LimitsApplied { soft: u64, hard: u64 },
    /// About to replace the process image.
    Launching { target: PathBuf, argv: Vec<String> },
}

/// Receiver for [`Event`]s.
pub trait Observer {
    fn observe(&self, event: Event);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn observe(&self, event: Event) {
        match event {
            Event::SecretsFetched {
                locator,
                keys,
                elapsed,
            } => debug!(
                provider = %locator.kind(),
                locator = locator.identifier(),
                keys,
                duration_ms = elapsed.as_millis() as u64,
                "fetched secrets"
            ),
            Event::SecretCollision { key, locator } => warn!(
                key = %key,
                provider = %locator.kind(),
                locator = locator.identifier(),
                "secrets key collision detected"
            ),
            Event::EnvOverwrite { key } => warn!(
                key = %key,
                "overwriting already existing environment variable"
            ),
            Event::LimitsApplied { soft, hard } => {
                debug!(soft, hard, "set the new open-files limit")
            }
            Event::Launching { target, argv } => debug!(
                path = %target.display(),
                cmd = ?argv,
                "launching the process"
            ),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct Recorder {
    events: RefCell<Vec<Event>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events seen so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    /// Keys reported as provider collisions, in order.
    pub fn collisions(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::SecretCollision { key, .. } => Some(key.clone()),
                _ => None,
            })
            .collect()
    }

    /// Keys reported as environment overwrites, in order.
    pub fn overwrites(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::EnvOverwrite { key } => Some(key.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Observer for Recorder {
    fn observe(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }
}
