//! Hand-written test doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::{StreamExt, stream};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use yanjiu_core::prelude::*;
use yanjiu_research::sources::format_citation;

/// Needles that identify which stage built a prompt.
pub mod stage {
    pub const PLAN: &str = "generate targeted web search queries";
    pub const RELEVANCY: &str = "You are a grader assessing";
    pub const SUMMARIZE: &str = "Write a report that follows the organization below";
    pub const EXTEND: &str = "Extend the existing report";
    pub const REFLECT: &str = "identify a knowledge gap";
    pub const FINALIZE: &str = "Polish the draft report";
    pub const GUARDRAIL: &str = "Decide whether the user prompt is related";
    pub const REWRITE: &str = "You are rewriting an artifact";
    pub const CHAT: &str = "<app-context>";
}

#[derive(Debug)]
struct Rule {
    needles: Vec<String>,
    replies: VecDeque<String>,
    delay: Option<Duration>,
    stall: bool,
}

/// A chat model that answers from a script.
///
/// A rule matches when every one of its needles occurs somewhere in the
/// conversation. Rules are tried in the order they were added. Each rule
/// replays its replies in order and repeats the last one.
#[derive(Debug)]
pub struct ScriptedModel {
    name: String,
    streaming: bool,
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            streaming: true,
            rules: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn without_streaming(mut self) -> Self {
        self.streaming = false;
        self
    }

    pub fn on(self, needles: &[&str], reply: &str) -> Self {
        self.push_rule(needles, reply, None, false)
    }

    pub fn on_slow(self, needles: &[&str], reply: &str, delay: Duration) -> Self {
        self.push_rule(needles, reply, Some(delay), false)
    }

    /// Stream `partial` and then never finish.
    pub fn on_stalled(self, needles: &[&str], partial: &str) -> Self {
        self.push_rule(needles, partial, None, true)
    }

    fn push_rule(
        self,
        needles: &[&str],
        reply: &str,
        delay: Option<Duration>,
        stall: bool,
    ) -> Self {
        {
            let mut rules = self.rules.lock().unwrap();
            let needles: Vec<String> = needles.iter().map(|n| (*n).to_string()).collect();
            if let Some(rule) = rules.iter_mut().find(|r| r.needles == needles) {
                rule.replies.push_back(reply.to_string());
            } else {
                rules.push(Rule {
                    needles,
                    replies: VecDeque::from([reply.to_string()]),
                    delay,
                    stall,
                });
            }
        }
        self
    }

    /// Number of calls whose conversation contains `needle`.
    pub fn calls_containing(&self, needle: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|messages| messages.iter().any(|m| m.content.contains(needle)))
            .count()
    }

    /// Conversations sent so far.
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }

    fn reply_for(&self, messages: &[ChatMessage]) -> Result<(String, Option<Duration>, bool)> {
        self.calls.lock().unwrap().push(messages.to_vec());
        let conversation: String = messages.iter().map(|m| m.content.as_str()).collect();

        let mut rules = self.rules.lock().unwrap();
        let rule = rules
            .iter_mut()
            .find(|rule| rule.needles.iter().all(|n| conversation.contains(n.as_str())))
            .ok_or_else(|| YanjiuError::llm("no scripted reply"))?;
        let reply = if rule.replies.len() > 1 {
            rule.replies.pop_front().unwrap_or_default()
        } else {
            rule.replies.front().cloned().unwrap_or_default()
        };
        Ok((reply, rule.delay, rule.stall))
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String> {
        let (reply, delay, stall) = self.reply_for(messages)?;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if stall {
            std::future::pending::<()>().await;
        }
        Ok(reply)
    }

    async fn stream(&self, messages: &[ChatMessage]) -> Result<ChatStream> {
        let (reply, delay, stall) = self.reply_for(messages)?;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let chunks: Vec<Result<ChatChunk>> = reply
            .split_inclusive(char::is_whitespace)
            .map(|piece| Ok(ChatChunk::content(piece)))
            .collect();
        if stall {
            return Ok(Box::pin(stream::iter(chunks).chain(stream::pending())));
        }
        Ok(Box::pin(stream::iter(chunks)))
    }

    fn model_name(&self) -> &str {
        &self.name
    }

    fn supports_streaming(&self) -> bool {
        self.streaming
    }
}

/// Shared, ordered log of backend calls such as `rag:<query>`.
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// RAG backend answering every query with a per-query citation.
#[derive(Debug)]
pub struct RecordingRag {
    log: CallLog,
    answers: HashMap<String, String>,
    fail: bool,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingRag {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            answers: HashMap::new(),
            fail: false,
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_answer(mut self, query: &str, answer: &str) -> Self {
        self.answers.insert(query.to_string(), answer.to_string());
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RagBackend for RecordingRag {
    async fn query(&self, text: &str, _collection: &str) -> Result<RagAnswer> {
        self.log.lock().unwrap().push(format!("rag:{text}"));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail {
            return Err(YanjiuError::retrieval("rag", "service unavailable"));
        }
        let answer = self
            .answers
            .get(text)
            .cloned()
            .unwrap_or_else(|| format!("rag answer for {text}"));
        let citation = format_citation(text, &answer, &format!("{text}.pdf"));
        Ok(RagAnswer { answer, citation })
    }
}

/// Enterprise search backend returning fixed hits.
#[derive(Debug)]
pub struct RecordingEnterprise {
    log: CallLog,
    hits: Vec<EnterpriseHit>,
}

impl RecordingEnterprise {
    pub fn new(log: CallLog, hits: Vec<EnterpriseHit>) -> Self {
        Self { log, hits }
    }
}

#[async_trait]
impl EnterpriseSearchBackend for RecordingEnterprise {
    async fn query(&self, text: &str) -> Result<Vec<EnterpriseHit>> {
        self.log.lock().unwrap().push(format!("eci:{text}"));
        Ok(self.hits.clone())
    }
}

/// Web search backend returning fixed hits.
#[derive(Debug)]
pub struct RecordingWeb {
    log: CallLog,
    hits: Vec<WebSearchHit>,
}

impl RecordingWeb {
    pub fn new(log: CallLog, hits: Vec<WebSearchHit>) -> Self {
        Self { log, hits }
    }
}

#[async_trait]
impl WebSearchBackend for RecordingWeb {
    async fn query(&self, text: &str) -> Result<Vec<WebSearchHit>> {
        self.log.lock().unwrap().push(format!("web:{text}"));
        Ok(self.hits.clone())
    }
}

/// Progress sink that keeps every event.
#[derive(Debug, Default)]
pub struct RecordingProgress(Mutex<Vec<ProgressEvent>>);

impl RecordingProgress {
    pub fn messages_for(&self, key: ProgressKey) -> Vec<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.key == key)
            .map(|e| e.message.clone())
            .collect()
    }
}

impl ProgressSink for RecordingProgress {
    fn write(&self, event: ProgressEvent) {
        self.0.lock().unwrap().push(event);
    }
}

pub fn plan_reply(queries: &[&str]) -> String {
    let items: Vec<String> = queries
        .iter()
        .map(|q| {
            format!(r#"{{"query": "{q}", "report_section": "Findings", "rationale": "coverage"}}"#)
        })
        .collect();
    format!("```json\n[{}]\n```", items.join(", "))
}

pub fn logged(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}
