//! Mock providers for testing.
//!
//! Each mock implements the same trait as its production client, so the
//! pipelines under test run their real code paths against recorded calls.

use async_trait::async_trait;
use digest_core::{Error, ProviderErrorCode, Result};
use mailer::{EmailSender, OutgoingEmail, SendReceipt};
use parking_lot::Mutex;
use research::{ChatMessage, LlmClient, SearchClient, SearchDepth, SearchHit, SearchResponse};
use std::sync::Arc;

/// Mock mailer that captures every email it is asked to send.
#[derive(Clone, Default)]
pub struct MockMailer {
    sent: Arc<Mutex<Vec<OutgoingEmail>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }

    /// Emails addressed to `address`.
    pub fn sent_to(&self, address: &str) -> Vec<OutgoingEmail> {
        self.sent
            .lock()
            .iter()
            .filter(|e| e.to.iter().any(|to| to == address))
            .cloned()
            .collect()
    }

    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }
}

#[async_trait]
impl EmailSender for MockMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt> {
        if *self.should_fail.lock() {
            return Err(Error::provider(ProviderErrorCode::CallFailed, "mailer", "mock mailer failure"));
        }
        self.sent.lock().push(email.clone());
        Ok(SendReceipt {
            id: Some(format!("mock-{}", self.sent.lock().len())),
        })
    }
}

/// Mock search returning one hit with a section and penalty reference.
#[derive(Clone, Default)]
pub struct MockSearch {
    queries: Arc<Mutex<Vec<String>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.queries.lock().len()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }

    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }
}

#[async_trait]
impl SearchClient for MockSearch {
    async fn search(&self, query: &str, _depth: SearchDepth) -> Result<SearchResponse> {
        self.queries.lock().push(query.to_string());
        if *self.should_fail.lock() {
            return Err(Error::provider(ProviderErrorCode::CallFailed, "search", "mock search failure"));
        }
        Ok(SearchResponse {
            answer: Some("Annual return must be filed within 60 days of the AGM.".into()),
            results: vec![SearchHit {
                title: "Filing of annual return".into(),
                url: "https://www.mca.gov.in/annual-return".into(),
                content: "Under Section 92 of the Companies Act, 2013 a late filer pays Rs. 100 per day."
                    .into(),
            }],
        })
    }
}

/// Mock LLM that answers every `### key:` heading in the prompt.
#[derive(Clone, Default)]
pub struct MockLlm {
    prompts: Arc<Mutex<Vec<String>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().len()
    }

    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn complete(&self, messages: &[ChatMessage], _max_tokens: u32) -> Result<String> {
        let prompt = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        self.prompts.lock().push(prompt.clone());
        if *self.should_fail.lock() {
            return Err(Error::provider(ProviderErrorCode::CallFailed, "llm", "mock llm failure"));
        }

        let mut answer = serde_json::Map::new();
        for key in prompt.lines().filter_map(|l| l.strip_prefix("### key: ")) {
            answer.insert(
                key.trim().to_string(),
                serde_json::json!({
                    "legal_section": "Section 92, Companies Act 2013",
                    "penalty_provision": "Rs. 100 per day of default",
                    "business_impact": {
                        "financial": "Daily late fees",
                        "reputation": "Marked non-compliant on MCA portal",
                        "operations": "Directors may be disqualified"
                    }
                }),
            );
        }
        Ok(format!("```json\n{}\n```", serde_json::Value::Object(answer)))
    }
}
