//! Test doubles: an in-memory core and a capturing code delivery.
//!
//! Everything here is deterministic-enough for tests: the mock core keeps
//! its own clock offset so expiry paths can be driven without sleeping.

pub mod core;

pub use core::MockCore;

use crate::passwordless::{CodeDelivery, CodeDeliveryDetails};
use async_trait::async_trait;
use authkit_core::Result;
use std::sync::Mutex;

/// Records every delivered code instead of sending it anywhere.
#[derive(Debug, Default)]
pub struct CapturingDelivery {
    sent: Mutex<Vec<CodeDeliveryDetails>>,
}

impl CapturingDelivery {
    /// Fresh, empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far, in order.
    pub fn sent(&self) -> Vec<CodeDeliveryDetails> {
        self.sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl CodeDelivery for CapturingDelivery {
    async fn send(&self, details: &CodeDeliveryDetails) -> Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(details.clone());
        Ok(())
    }
}
