//! # Interrupt vector
//!
//! A [`Vector`] binds one [`InterruptSource`] to the [`Handler`] registered for it, standing in
//! for an NVIC line. On the firmware `service()` is called from the interrupt task bound to the
//! source. In simulation it is called whenever a simulated event is delivered.
//!
//! The handler owns all the state it mutates, so there is exactly one writer and nothing to lock.
//! `service()` takes `&mut self`, so a handler can't be entered again while it is running.

use crate::error::{fatal, Component};
use crate::source::InterruptSource;

/// Number of back to back entries before a latched request is treated as a storm
pub const STORM_LIMIT: u32 = 16;

/// An interrupt handler for the source `S`
///
/// Handlers run to completion and must not block. They must clear the source's pending flag
/// before returning.
pub trait Handler<S> {
    fn handle(&mut self, source: &mut S);
}

impl<S, F> Handler<S> for F
where
    F: FnMut(&mut S),
{
    fn handle(&mut self, source: &mut S) {
        self(source)
    }
}

/// An interrupt source and its registered handler
pub struct Vector<S, H> {
    source: S,
    handler: H,
    invocations: u32,
}

impl<S, H> Vector<S, H>
where
    S: InterruptSource,
    H: Handler<S>,
{
    /// Register `handler` for `source`
    pub fn new(source: S, handler: H) -> Self {
        Self {
            source,
            handler,
            invocations: 0,
        }
    }

    /// Run the handler if the source is requesting an interrupt.
    ///
    /// Returns whether the handler ran. A request that is still latched once the handler returns
    /// vectors again immediately, the same as the hardware would. After [`STORM_LIMIT`] entries in
    /// a row this is reported as fatal.
    pub fn service(&mut self) -> bool {
        if !self.requested() {
            return false;
        }

        let mut entries = 0;
        while self.requested() {
            if entries == STORM_LIMIT {
                fatal(Component::Vector, "interrupt storm, pending flag not cleared");
            }

            self.handler.handle(&mut self.source);
            self.invocations = self.invocations.wrapping_add(1);
            entries += 1;
        }

        trace!("serviced after {} entries", entries);

        true
    }

    fn requested(&self) -> bool {
        self.source.interrupt_enabled() && self.source.is_pending()
    }

    /// Number of times the handler has run
    pub fn invocations(&self) -> u32 {
        self.invocations
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

}
