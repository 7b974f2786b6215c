//! Shared test fixtures: an in-memory, scripted channel API.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chanpack::api::{ApiError, ChannelApi, FetchOutcome, PageResponse, ResolveOutcome};
use chanpack::channel::{ChannelDescriptor, ChannelRef};
use chanpack::handle::ChannelHandle;
use serde_json::{Value, json};

/// Base timestamp for generated messages (2023-11-14T22:13:20Z).
pub const BASE_TS: i64 = 1_700_000_000;

/// A canned answer for a specific call number.
#[derive(Debug, Clone)]
pub enum Scripted {
    RateLimited(Duration),
    Error(ApiError),
}

type CallHook = Box<dyn Fn(usize) + Send + Sync>;

/// Serves a fixed message history newest-first, like the real gateway.
pub struct MockApi {
    pub descriptor: ChannelDescriptor,
    resolve: ResolveOutcome,
    messages: Vec<Value>,
    count_hint: Option<u64>,
    script: Mutex<HashMap<usize, Scripted>>,
    calls: Mutex<Vec<(i64, u32)>>,
    on_call: Option<CallHook>,
}

impl MockApi {
    /// A channel `@testchannel` with messages `1..=count`.
    pub fn channel(count: i64) -> Self {
        let messages = (1..=count).map(text_message).collect();
        Self::with_messages(messages).with_estimate(count as u64)
    }

    /// A channel serving exactly `messages` (any order).
    pub fn with_messages(messages: Vec<Value>) -> Self {
        let descriptor = ChannelDescriptor::new(4242, handle(), "Test Channel")
            .with_description("Fixture channel");
        Self {
            resolve: ResolveOutcome::Found(descriptor.clone()),
            descriptor,
            messages,
            count_hint: None,
            script: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            on_call: None,
        }
    }

    pub fn with_estimate(mut self, count: u64) -> Self {
        self.descriptor = self.descriptor.with_message_count(count);
        self.resolve = ResolveOutcome::Found(self.descriptor.clone());
        self
    }

    pub fn with_resolve(mut self, outcome: ResolveOutcome) -> Self {
        self.resolve = outcome;
        self
    }

    pub fn with_count_hint(mut self, hint: u64) -> Self {
        self.count_hint = Some(hint);
        self
    }

    /// Answers call number `call` (0-based) with `outcome` instead of a page.
    pub fn script(self, call: usize, outcome: Scripted) -> Self {
        self.script.lock().unwrap().insert(call, outcome);
        self
    }

    /// Runs `hook` with the call number at the start of every page request.
    pub fn on_call(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_call = Some(Box::new(hook));
        self
    }

    /// `(offset_id, limit)` of every page request so far.
    pub fn calls(&self) -> Vec<(i64, u32)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn offsets(&self) -> Vec<i64> {
        self.calls().into_iter().map(|(offset, _)| offset).collect()
    }

    fn page(&self, offset_id: i64, limit: u32) -> Vec<Value> {
        let mut older: Vec<&Value> = self
            .messages
            .iter()
            .filter(|m| {
                let id = m.get("id").and_then(Value::as_i64).unwrap_or(i64::MAX);
                offset_id == 0 || id < offset_id
            })
            .collect();
        older.sort_by_key(|m| std::cmp::Reverse(m.get("id").and_then(Value::as_i64)));
        older.into_iter().take(limit as usize).cloned().collect()
    }
}

#[async_trait]
impl ChannelApi for MockApi {
    async fn resolve(&self, handle: &ChannelHandle) -> Result<ResolveOutcome, ApiError> {
        if handle == &self.descriptor.handle {
            Ok(self.resolve.clone())
        } else {
            Ok(ResolveOutcome::NotFound)
        }
    }

    async fn fetch_page(
        &self,
        _channel: &ChannelRef,
        offset_id: i64,
        limit: u32,
    ) -> Result<FetchOutcome, ApiError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((offset_id, limit));
            calls.len() - 1
        };
        if let Some(hook) = &self.on_call {
            hook(call);
        }

        match self.script.lock().unwrap().remove(&call) {
            Some(Scripted::RateLimited(retry_after)) => {
                return Ok(FetchOutcome::RateLimited { retry_after });
            }
            Some(Scripted::Error(e)) => return Err(e),
            None => {}
        }

        let page = PageResponse::from_values(self.page(offset_id, limit), None);
        Ok(FetchOutcome::Page(match self.count_hint {
            Some(hint) => page.with_count_hint(hint),
            None => page,
        }))
    }
}

pub fn handle() -> ChannelHandle {
    "testchannel".parse().unwrap()
}

/// A plain text message sent `id` minutes after [`BASE_TS`].
pub fn text_message(id: i64) -> Value {
    json!({
        "type": "message",
        "id": id,
        "date": BASE_TS + id * 60,
        "from": "Test Channel",
        "text": format!("message {id}")
    })
}
