//! Test utilities shared across the workspace.
//! Only compiled when running tests or with the `testing` feature.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::error::Error;
use crate::fetch::PageFetcher;
use crate::message::{Message, Usage};
use crate::provider::{CompletionRequest, CompletionResponse, FinishReason, Provider};
use crate::search::SearchProvider;

fn reply(content: &str) -> CompletionResponse {
    CompletionResponse {
        message: Message::assistant(content),
        usage: Usage::new(0, 0),
        model: "mock-model".to_string(),
        finish_reason: FinishReason::Stop,
    }
}

/// A mock provider that returns pre-configured responses.
pub struct MockProvider {
    responses: Mutex<Vec<Result<CompletionResponse, Error>>>,
    /// Captured requests (for assertion).
    pub captured_requests: Mutex<Vec<CompletionRequest>>,
    pub name: String,
    pub default_model: Option<String>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            captured_requests: Mutex::new(Vec::new()),
            name: "mock".to_string(),
            default_model: None,
        }
    }

    /// Queue a response to be returned by the next complete() call.
    /// Responses are returned in FIFO order (first queued = first returned).
    pub fn queue_response(&self, content: &str) {
        self.responses.lock().unwrap().insert(0, Ok(reply(content)));
    }

    /// Queue a failure for the next complete() call.
    pub fn queue_error(&self, error: Error) {
        self.responses.lock().unwrap().insert(0, Err(error));
    }

    /// Get the number of captured requests.
    pub fn request_count(&self) -> usize {
        self.captured_requests.lock().unwrap().len()
    }

    /// Get the last captured request.
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.captured_requests.lock().unwrap().last().cloned()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_model(&self) -> Option<&str> {
        self.default_model.as_deref()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, Error> {
        self.captured_requests.lock().unwrap().push(request);
        match self.responses.lock().unwrap().pop() {
            Some(response) => response,
            None => Err(Error::Unknown("No mock response queued".to_string())),
        }
    }
}

/// One scripted rule: fires when every needle occurs in the request transcript.
struct Rule {
    needles: Vec<String>,
    replies: VecDeque<Option<String>>,
}

/// A provider whose replies are chosen by what the conversation contains.
///
/// Concurrent callers (one per link in a fan-out) make FIFO queues
/// order-sensitive; matching on content keeps tests deterministic. Rules are
/// checked in insertion order. A rule with several replies hands them out in
/// turn and keeps repeating the last one.
pub struct ScriptedProvider {
    rules: Mutex<Vec<Rule>>,
    pub captured_requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            captured_requests: Mutex::new(Vec::new()),
        }
    }

    /// Reply with `content` whenever all `needles` appear in the conversation.
    pub fn on(self, needles: &[&str], content: &str) -> Self {
        self.on_sequence(needles, &[content])
    }

    /// Reply with each entry of `contents` in turn, repeating the last one.
    pub fn on_sequence(self, needles: &[&str], contents: &[&str]) -> Self {
        self.push_rule(needles, contents.iter().map(|c| Some(c.to_string())).collect());
        self
    }

    /// Fail the completion whenever all `needles` appear in the conversation.
    pub fn fail_on(self, needles: &[&str]) -> Self {
        self.push_rule(needles, VecDeque::from(vec![None]));
        self
    }

    fn push_rule(&self, needles: &[&str], replies: VecDeque<Option<String>>) {
        self.rules.lock().unwrap().push(Rule {
            needles: needles.iter().map(|n| n.to_string()).collect(),
            replies,
        });
    }

    /// Number of captured requests whose transcript contains `needle`.
    pub fn count_matching(&self, needle: &str) -> usize {
        self.captured_requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.transcript().contains(needle))
            .count()
    }

    pub fn request_count(&self) -> usize {
        self.captured_requests.lock().unwrap().len()
    }
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> Option<&str> {
        None
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, Error> {
        let transcript = request.transcript();
        self.captured_requests.lock().unwrap().push(request);

        let mut rules = self.rules.lock().unwrap();
        let Some(rule) = rules
            .iter_mut()
            .find(|r| r.needles.iter().all(|n| transcript.contains(n.as_str())))
        else {
            return Err(Error::Unknown("No scripted response matched".to_string()));
        };

        let next = if rule.replies.len() > 1 {
            rule.replies.pop_front().flatten()
        } else {
            rule.replies.front().cloned().flatten()
        };

        match next {
            Some(content) => Ok(reply(&content)),
            None => Err(Error::api(503, "scripted failure")),
        }
    }
}

/// Search stub with canned link lists per query. Unknown queries yield no links.
pub struct MockSearch {
    results: HashMap<String, Result<Vec<String>, String>>,
    pub calls: Mutex<Vec<String>>,
}

impl MockSearch {
    pub fn new() -> Self {
        Self {
            results: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, query: &str, links: &[&str]) -> Self {
        self.results.insert(
            query.to_string(),
            Ok(links.iter().map(|l| l.to_string()).collect()),
        );
        self
    }

    pub fn failing(mut self, query: &str) -> Self {
        self.results
            .insert(query.to_string(), Err(format!("search for '{}' failed", query)));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Default for MockSearch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchProvider for MockSearch {
    fn name(&self) -> &str {
        "mock-search"
    }

    async fn search(&self, query: &str) -> Result<Vec<String>, Error> {
        self.calls.lock().unwrap().push(query.to_string());
        match self.results.get(query) {
            Some(Ok(links)) => Ok(links.clone()),
            Some(Err(message)) => Err(Error::network(message.clone())),
            None => Ok(Vec::new()),
        }
    }
}

/// Fetch stub with canned page text per URL. Unknown URLs fail.
pub struct MockFetcher {
    pages: HashMap<String, String>,
    pub calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, url: &str, text: &str) -> Self {
        self.pages.insert(url.to_string(), text.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// How many times `url` was fetched.
    pub fn fetches_of(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock-fetch"
    }

    async fn fetch_text(&self, url: &str) -> Result<String, Error> {
        self.calls.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| Error::api(404, format!("no page for {}", url)))
    }
}
