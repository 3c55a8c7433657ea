//! In-process implementation of the installer boundary.
//!
//! [`InMemoryInstaller`] keeps sessions in memory, records every call it
//! receives in a journal and can be told to fail at chosen points. Hosts
//! use it for dry runs; the crate's tests use it to observe call ordering.

use super::{
    CallbackToken, InstallerError, InstallerSession, PackageInstaller, PreapprovalDetails,
    SessionId, SessionInfo, SessionParams, WriteChannel,
};
use crate::package::PackageIdentity;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;

/// A call received by [`InMemoryInstaller`] or one of its session handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallerCall {
    ListSessions,
    CreateSession(PackageIdentity),
    OpenSession(SessionId),
    Abandon(SessionId),
    OpenWrite { session: SessionId, name: String },
    Fsync(SessionId),
    RequestPreapproval(SessionId),
    Commit(SessionId),
    Close(SessionId),
    Uninstall(PackageIdentity),
}

/// Operations that can be made to fail with [`InMemoryInstaller::fail_on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    ListSessions,
    CreateSession,
    OpenSession,
    Abandon,
    OpenWrite,
    Fsync,
    Preapproval,
    Commit,
    Uninstall,
}

#[derive(Debug)]
struct MemorySession {
    package: Option<PackageIdentity>,
    active: bool,
    committed: bool,
    data: Arc<Mutex<Vec<u8>>>,
    preapproval: Option<PreapprovalDetails>,
}

impl MemorySession {
    fn new(package: Option<PackageIdentity>, active: bool) -> Self {
        Self {
            package,
            active,
            committed: false,
            data: Arc::new(Mutex::new(Vec::new())),
            preapproval: None,
        }
    }
}

#[derive(Debug)]
struct State {
    next_id: i32,
    sessions: BTreeMap<SessionId, MemorySession>,
    calls: Vec<InstallerCall>,
    failures: HashSet<FailPoint>,
    uninstalled: Vec<CallbackToken>,
}

impl State {
    fn check(&self, point: FailPoint) -> Result<(), InstallerError> {
        if self.failures.contains(&point) {
            return Err(InstallerError::Rejected(format!(
                "injected {:?} failure",
                point
            )));
        }
        Ok(())
    }

    fn live_session(&mut self, id: SessionId) -> Result<&mut MemorySession, InstallerError> {
        match self.sessions.get_mut(&id) {
            Some(session) if !session.committed => Ok(session),
            _ => Err(InstallerError::SessionNotFound(id)),
        }
    }
}

/// An installer service that lives entirely in memory.
///
/// Clones share state, so a test can keep one clone for inspection while
/// the orchestrator owns another.
///
/// # Example
///
/// ```rust
/// use catalog_installer::{InMemoryInstaller, PackageIdentity, SessionId, SessionInfo};
///
/// let installer = InMemoryInstaller::new();
/// installer.add_session(SessionInfo {
///     id: SessionId(7),
///     app_package_name: Some(PackageIdentity::new("com.example.app")),
///     is_active: false,
/// });
/// assert_eq!(installer.pending_sessions(), vec![SessionId(7)]);
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryInstaller {
    state: Arc<Mutex<State>>,
}

impl Default for InMemoryInstaller {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryInstaller {
    /// Create an empty installer whose first session id is 1.
    pub fn new() -> Self {
        Self::with_first_session_id(1)
    }

    /// Create an empty installer that hands out ids starting at `first`.
    pub fn with_first_session_id(first: i32) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                next_id: first,
                sessions: BTreeMap::new(),
                calls: Vec::new(),
                failures: HashSet::new(),
                uninstalled: Vec::new(),
            })),
        }
    }

    /// Seed a session, as if left behind by an earlier install attempt.
    pub fn add_session(&self, info: SessionInfo) {
        let mut state = self.state.lock();
        state.next_id = state.next_id.max(info.id.0 + 1);
        state
            .sessions
            .insert(info.id, MemorySession::new(info.app_package_name, info.is_active));
    }

    /// Mark a session active or inactive.
    pub fn set_active(&self, id: SessionId, active: bool) {
        if let Some(session) = self.state.lock().sessions.get_mut(&id) {
            session.active = active;
        }
    }

    /// Make every subsequent call at `point` fail.
    pub fn fail_on(&self, point: FailPoint) {
        self.state.lock().failures.insert(point);
    }

    /// Stop injecting failures.
    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<InstallerCall> {
        self.state.lock().calls.clone()
    }

    /// Bytes written into a session, committed or not.
    pub fn written(&self, id: SessionId) -> Option<Vec<u8>> {
        self.state
            .lock()
            .sessions
            .get(&id)
            .map(|session| session.data.lock().clone())
    }

    /// Whether a session has been committed.
    pub fn is_committed(&self, id: SessionId) -> bool {
        self.state
            .lock()
            .sessions
            .get(&id)
            .is_some_and(|session| session.committed)
    }

    /// Preapproval details requested on a session, if any.
    pub fn preapproval(&self, id: SessionId) -> Option<PreapprovalDetails> {
        self.state
            .lock()
            .sessions
            .get(&id)
            .and_then(|session| session.preapproval.clone())
    }

    /// Sessions that exist and have not been committed.
    pub fn pending_sessions(&self) -> Vec<SessionId> {
        self.state
            .lock()
            .sessions
            .iter()
            .filter(|(_, session)| !session.committed)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Uninstall requests accepted so far.
    pub fn uninstall_requests(&self) -> Vec<CallbackToken> {
        self.state.lock().uninstalled.clone()
    }
}

#[async_trait]
impl PackageInstaller for InMemoryInstaller {
    async fn sessions(&self) -> Result<Vec<SessionInfo>, InstallerError> {
        let mut state = self.state.lock();
        state.calls.push(InstallerCall::ListSessions);
        state.check(FailPoint::ListSessions)?;
        Ok(state
            .sessions
            .iter()
            .filter(|(_, session)| !session.committed)
            .map(|(id, session)| SessionInfo {
                id: *id,
                app_package_name: session.package.clone(),
                is_active: session.active,
            })
            .collect())
    }

    async fn create_session(&self, params: &SessionParams) -> Result<SessionId, InstallerError> {
        let mut state = self.state.lock();
        state
            .calls
            .push(InstallerCall::CreateSession(params.app_package_name.clone()));
        state.check(FailPoint::CreateSession)?;
        let id = SessionId(state.next_id);
        state.next_id += 1;
        state.sessions.insert(
            id,
            MemorySession::new(Some(params.app_package_name.clone()), false),
        );
        Ok(id)
    }

    async fn open_session(
        &self,
        id: SessionId,
    ) -> Result<Box<dyn InstallerSession>, InstallerError> {
        let mut state = self.state.lock();
        state.calls.push(InstallerCall::OpenSession(id));
        state.check(FailPoint::OpenSession)?;
        state.live_session(id)?;
        Ok(Box::new(MemorySessionHandle {
            id,
            state: Arc::clone(&self.state),
            closed: false,
        }))
    }

    async fn abandon(&self, id: SessionId) -> Result<(), InstallerError> {
        let mut state = self.state.lock();
        state.calls.push(InstallerCall::Abandon(id));
        state.check(FailPoint::Abandon)?;
        state
            .sessions
            .remove(&id)
            .map(|_| ())
            .ok_or(InstallerError::SessionNotFound(id))
    }

    async fn uninstall(
        &self,
        package: &PackageIdentity,
        token: CallbackToken,
    ) -> Result<(), InstallerError> {
        let mut state = self.state.lock();
        state.calls.push(InstallerCall::Uninstall(package.clone()));
        state.check(FailPoint::Uninstall)?;
        state.uninstalled.push(token);
        Ok(())
    }
}

struct MemorySessionHandle {
    id: SessionId,
    state: Arc<Mutex<State>>,
    closed: bool,
}

#[async_trait]
impl InstallerSession for MemorySessionHandle {
    fn id(&self) -> SessionId {
        self.id
    }

    async fn open_write(
        &mut self,
        name: &str,
        _offset: u64,
        _length: Option<u64>,
    ) -> Result<WriteChannel, InstallerError> {
        let mut state = self.state.lock();
        state.calls.push(InstallerCall::OpenWrite {
            session: self.id,
            name: name.to_string(),
        });
        state.check(FailPoint::OpenWrite)?;
        let data = Arc::clone(&state.live_session(self.id)?.data);
        Ok(Box::pin(SharedBuffer { data }))
    }

    async fn fsync(&mut self, _channel: &mut WriteChannel) -> Result<(), InstallerError> {
        let mut state = self.state.lock();
        state.calls.push(InstallerCall::Fsync(self.id));
        state.check(FailPoint::Fsync)
    }

    async fn request_user_preapproval(
        &mut self,
        details: &PreapprovalDetails,
        _token: CallbackToken,
    ) -> Result<(), InstallerError> {
        let mut state = self.state.lock();
        state.calls.push(InstallerCall::RequestPreapproval(self.id));
        state.check(FailPoint::Preapproval)?;
        state.live_session(self.id)?.preapproval = Some(details.clone());
        Ok(())
    }

    async fn commit(&mut self, _token: CallbackToken) -> Result<(), InstallerError> {
        let mut state = self.state.lock();
        state.calls.push(InstallerCall::Commit(self.id));
        state.check(FailPoint::Commit)?;
        state.live_session(self.id)?.committed = true;
        Ok(())
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.state.lock().calls.push(InstallerCall::Close(self.id));
    }
}

/// Write channel appending into a session's shared buffer.
struct SharedBuffer {
    data: Arc<Mutex<Vec<u8>>>,
}

impl AsyncWrite for SharedBuffer {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.data.lock().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
