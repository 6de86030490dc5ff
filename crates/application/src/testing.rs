//! In-memory port implementations shared by the unit tests.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::significant_drop_tightening)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use qrslot_domain::{
    Challenge, Credential, NewRecord, OwnerId, PollStatus, Record, RecordId, SlotNaming,
};

use crate::ports::{
    ChallengeGrant, ChallengePresenter, ChallengeRenderer, IssuerApi, IssuerError, PanelError,
    PanelStore, PanelToken, PollReply, RenderedChallenge,
};
use crate::session::SessionPurpose;

/// Issuer that replays a fixed status script, then waits for a scan forever.
#[derive(Clone)]
pub struct ScriptedIssuer {
    script: Arc<Mutex<VecDeque<PollStatus>>>,
    queries: Arc<AtomicUsize>,
    confirmed_cookies: Credential,
    fail_generate: bool,
    fail_status_after: Option<usize>,
}

impl ScriptedIssuer {
    pub const SESSION_SECRET: &'static str = "c0ffee00c0ffee00%2C1735689600%2Cabcd";
    pub const CSRF_TOKEN: &'static str = "0123456789abcdef0123456789abcdef";

    pub fn new(script: impl IntoIterator<Item = PollStatus>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into_iter().collect())),
            queries: Arc::new(AtomicUsize::new(0)),
            confirmed_cookies: Credential::from_pairs([
                ("DedeUserID", "123"),
                ("SESSDATA", Self::SESSION_SECRET),
                ("bili_jct", Self::CSRF_TOKEN),
            ]),
            fail_generate: false,
            fail_status_after: None,
        }
    }

    /// Script ending in a confirmation for `owner`.
    pub fn confirming(owner: &str) -> Self {
        Self::new([PollStatus::AwaitingScan, PollStatus::Confirmed]).with_cookie("DedeUserID", owner)
    }

    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.confirmed_cookies.insert(name, value);
        self
    }

    pub const fn failing_generate(mut self) -> Self {
        self.fail_generate = true;
        self
    }

    pub const fn failing_status_after(mut self, queries: usize) -> Self {
        self.fail_status_after = Some(queries);
        self
    }

    pub fn status_queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IssuerApi for ScriptedIssuer {
    async fn request_challenge(&self) -> Result<ChallengeGrant, IssuerError> {
        if self.fail_generate {
            return Err(IssuerError::Unavailable("HTTP 502".to_string()));
        }
        Ok(ChallengeGrant {
            key: "key-1".to_string(),
            url: "https://issuer.example/qr?key=key-1".to_string(),
        })
    }

    async fn query_status(&self, _key: &str) -> Result<PollReply, IssuerError> {
        let previous = self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_status_after.is_some_and(|limit| previous >= limit) {
            return Err(IssuerError::Unavailable("connection reset".to_string()));
        }
        let status = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(PollStatus::AwaitingScan);
        if status == PollStatus::Confirmed {
            return Ok(PollReply {
                status,
                cookies: self.confirmed_cookies.clone(),
            });
        }
        Ok(PollReply::status(status))
    }

    async fn complement(&self, session: &Credential) -> Result<Credential, IssuerError> {
        assert!(session.contains("SESSDATA"), "landing visit needs the session");
        Ok(Credential::from_pairs([("buvid3", "landing")]))
    }
}

/// Renderer that keeps the payload in memory.
pub struct TextRenderer;

impl ChallengeRenderer for TextRenderer {
    fn render(&self, challenge: &Challenge) -> Result<RenderedChallenge, IssuerError> {
        Ok(RenderedChallenge::inline(challenge.url.clone()))
    }
}

/// Presenter that records what it was shown.
#[derive(Clone, Default)]
pub struct RecordingPresenter {
    shown: Arc<Mutex<Vec<(SessionPurpose, String)>>>,
}

impl RecordingPresenter {
    pub fn shown(&self) -> Vec<(SessionPurpose, String)> {
        self.shown.lock().unwrap().clone()
    }
}

impl ChallengePresenter for RecordingPresenter {
    fn present(&self, purpose: SessionPurpose, _owner: &OwnerId, challenge: &RenderedChallenge) {
        self.shown
            .lock()
            .unwrap()
            .push((purpose, challenge.payload().to_string()));
    }
}

/// A panel call as seen by [`FakePanel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelCall {
    Token,
    List,
    Create(Vec<String>),
    Update { id: RecordId, name: String },
    Delete(Vec<RecordId>),
}

impl PanelCall {
    pub const fn is_mutation(&self) -> bool {
        matches!(self, Self::Create(_) | Self::Update { .. } | Self::Delete(_))
    }
}

#[derive(Default)]
struct FakePanelState {
    records: Vec<Record>,
    next_id: i64,
    calls: Vec<PanelCall>,
    fail_updates: bool,
    fail_deletes: bool,
    unreachable: bool,
}

/// In-memory panel.
#[derive(Clone, Default)]
pub struct FakePanel {
    state: Arc<Mutex<FakePanelState>>,
}

impl FakePanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record directly, bypassing the call log.
    pub fn seed(&self, name: &str, value: &str, remarks: &str) -> RecordId {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = RecordId::Number(state.next_id);
        state.records.push(Record {
            id: id.clone(),
            name: name.to_string(),
            value: value.to_string(),
            remarks: remarks.to_string(),
        });
        id
    }

    pub fn records(&self) -> Vec<Record> {
        self.state.lock().unwrap().records.clone()
    }

    /// `(index, value, remarks)` of every slot record, by index.
    pub fn slots(&self, naming: &SlotNaming) -> Vec<(usize, String, String)> {
        let mut slots: Vec<_> = self
            .records()
            .into_iter()
            .filter_map(|r| naming.index_of(&r.name).map(|i| (i, r.value, r.remarks)))
            .collect();
        slots.sort();
        slots
    }

    pub fn calls(&self) -> Vec<PanelCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.calls().iter().filter(|c| c.is_mutation()).count()
    }

    pub fn fail_updates(&self) {
        self.state.lock().unwrap().fail_updates = true;
    }

    pub fn fail_deletes(&self) {
        self.state.lock().unwrap().fail_deletes = true;
    }

    pub fn go_offline(&self) {
        self.state.lock().unwrap().unreachable = true;
    }

    fn record_call(&self, call: PanelCall) -> Result<(), PanelError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.unreachable {
            return Err(PanelError::Unreachable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PanelStore for FakePanel {
    async fn acquire_token(&self) -> Result<PanelToken, PanelError> {
        self.record_call(PanelCall::Token)?;
        Ok(PanelToken::new("token"))
    }

    async fn list_records(
        &self,
        _token: &PanelToken,
        search: Option<&str>,
    ) -> Result<Vec<Record>, PanelError> {
        self.record_call(PanelCall::List)?;
        let records = self
            .records()
            .into_iter()
            .filter(|r| {
                search.is_none_or(|s| r.name.contains(s) || r.value.contains(s) || r.remarks.contains(s))
            })
            .collect();
        // Give concurrent callers a chance to interleave between list and mutate.
        tokio::task::yield_now().await;
        Ok(records)
    }

    async fn create_records(
        &self,
        _token: &PanelToken,
        records: &[NewRecord],
    ) -> Result<(), PanelError> {
        self.record_call(PanelCall::Create(
            records.iter().map(|r| r.name.clone()).collect(),
        ))?;
        for record in records {
            self.seed(&record.name, &record.value, &record.remarks);
        }
        Ok(())
    }

    async fn update_record(&self, _token: &PanelToken, record: &Record) -> Result<(), PanelError> {
        self.record_call(PanelCall::Update {
            id: record.id.clone(),
            name: record.name.clone(),
        })?;
        let mut state = self.state.lock().unwrap();
        if state.fail_updates {
            return Err(PanelError::Rejected("update refused".to_string()));
        }
        let target = state
            .records
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or_else(|| PanelError::Rejected(format!("no record {}", record.id)))?;
        *target = record.clone();
        Ok(())
    }

    async fn delete_records(&self, _token: &PanelToken, ids: &[RecordId]) -> Result<(), PanelError> {
        self.record_call(PanelCall::Delete(ids.to_vec()))?;
        let mut state = self.state.lock().unwrap();
        if state.fail_deletes {
            return Err(PanelError::Rejected("delete refused".to_string()));
        }
        state.records.retain(|r| !ids.contains(&r.id));
        Ok(())
    }
}
