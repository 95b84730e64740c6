//! Boundary helper for hosts that want a "current session"
//!
//! A [`SessionStack`] is an explicit value owned by the host (one per request
//! or thread). Opening pushes a nested session; the innermost one is current.
//! The engine itself never consults a stack.

use crate::runtime::Runtime;
use crate::session::Session;
use causeway_core::{Error, Principal, Result};

/// Stack of nested sessions over one runtime
#[derive(Debug)]
pub struct SessionStack {
    runtime: Runtime,
    sessions: Vec<Session>,
}

impl SessionStack {
    /// Empty stack
    pub fn new(runtime: Runtime) -> Self {
        Self {
            runtime,
            sessions: Vec::new(),
        }
    }

    /// Open a session and make it current
    pub fn open(&mut self, principal: Principal) -> &mut Session {
        let session = self.runtime.open_session(principal);
        self.sessions.push(session);
        let top = self.sessions.len() - 1;
        &mut self.sessions[top]
    }

    /// Innermost session
    pub fn current(&self) -> Option<&Session> {
        self.sessions.last()
    }

    /// Innermost session, mutably
    pub fn current_mut(&mut self) -> Option<&mut Session> {
        self.sessions.last_mut()
    }

    /// Close the innermost session and make its parent current
    ///
    /// If closing fails (a transaction is still active) the session stays
    /// current and the error is returned.
    pub fn close_current(&mut self) -> Result<()> {
        let session = self
            .sessions
            .last_mut()
            .ok_or_else(|| Error::illegal_state("no session is open"))?;
        session.close()?;
        self.sessions.pop();
        Ok(())
    }

    /// Number of open sessions
    pub fn depth(&self) -> usize {
        self.sessions.len()
    }

    /// True if no session is open
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
