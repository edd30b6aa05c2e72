//! Test doubles shared by the pipeline unit tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use digest_core::{
    Error, NewQueueItem, NotificationKind, NotificationPayload, ProviderErrorCode, RecipientUser,
    RequirementInput, RequirementRow, RequirementStatus, Result, Role, UnsubscribeSigner,
};
use mailer::{EmailSender, OutgoingEmail, SendReceipt};
use parking_lot::Mutex;
use research::{ChatMessage, LlmClient, SearchClient, SearchDepth, SearchHit, SearchResponse};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::render::UnsubscribeLinks;

pub fn links() -> UnsubscribeLinks {
    UnsubscribeLinks::new("https://notify.example.com", UnsubscribeSigner::new("test-secret"))
        .expect("valid base url")
}

pub fn status_change(user_id: &str, requirement_id: &str, new_status: RequirementStatus) -> NewQueueItem {
    NewQueueItem {
        user_id: user_id.to_string(),
        email: format!("{}@example.com", user_id),
        company_id: "c1".to_string(),
        company_name: "Acme Pvt Ltd".to_string(),
        kind: NotificationKind::StatusChange,
        payload: NotificationPayload {
            requirement_id: requirement_id.to_string(),
            requirement_name: format!("Requirement {}", requirement_id),
            due_date: None,
            old_status: Some(RequirementStatus::Pending),
            new_status: Some(new_status),
            recipient_name: None,
        },
    }
}

pub fn requirement(id: &str, company_id: &str, due_date: NaiveDate, status: RequirementStatus) -> RequirementRow {
    RequirementRow {
        id: id.to_string(),
        company_id: company_id.to_string(),
        company_name: format!("Company {}", company_id),
        requirement: format!("Requirement {}", id),
        due_date,
        status,
    }
}

pub fn user(id: &str, role: Role, company_id: Option<&str>) -> RecipientUser {
    RecipientUser {
        user_id: id.to_string(),
        email: format!("{}@example.com", id),
        name: None,
        role,
        company_id: company_id.map(str::to_string),
    }
}

pub fn input(id: &str, requirement: &str) -> RequirementInput {
    RequirementInput {
        id: id.to_string(),
        category: "Annual filings".to_string(),
        requirement: requirement.to_string(),
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::provider(ProviderErrorCode::CallFailed, "mailer", "scripted failure"));
        }
        self.sent.lock().push(email.clone());
        Ok(SendReceipt::default())
    }
}

pub struct ScriptedSearch {
    fail: bool,
    calls: AtomicUsize,
}

impl ScriptedSearch {
    pub fn ok() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchClient for ScriptedSearch {
    async fn search(&self, _query: &str, _depth: SearchDepth) -> Result<SearchResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::provider(ProviderErrorCode::CallFailed, "search", "scripted failure"));
        }
        Ok(SearchResponse {
            answer: None,
            results: vec![SearchHit {
                title: "Companies Act, 2013".into(),
                url: "https://example.gov/act".into(),
                content: "Section 92 requires filing; default attracts a penalty of Rs. 50,000.".into(),
            }],
        })
    }
}

/// LLM double. `echo_keys` answers every `### key:` in the prompt.
pub struct ScriptedLlm {
    fail: bool,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    pub fn echo_keys() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, messages: &[ChatMessage], _max_tokens: u32) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::provider(ProviderErrorCode::CallFailed, "llm", "scripted failure"));
        }
        let prompt = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
        let mut reply = serde_json::Map::new();
        for line in prompt.lines() {
            if let Some(key) = line.strip_prefix("### key: ") {
                reply.insert(
                    key.trim().to_string(),
                    serde_json::json!({
                        "legal_section": "Section 92, Companies Act 2013",
                        "penalty_provision": "Rs. 50,000 plus Rs. 100 per day",
                        "business_impact": {
                            "financial": "Fines",
                            "reputation": "Regulator notice",
                            "operations": "Filing backlog"
                        }
                    }),
                );
            }
        }
        Ok(format!("Here is the JSON:\n{}", serde_json::Value::Object(reply)))
    }
}
