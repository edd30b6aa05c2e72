//! Requirement enrichment: legal section, penalty and business impact.
//!
//! Cache first. Misses are researched with one web search each through a
//! bounded pool, then annotated in batches with a single LLM call per
//! batch. Anything that cannot be researched gets the fallback annotation,
//! so the output always lines up one-to-one with the input.

use chrono::Utc;
use digest_core::limits::{
    DEFAULT_CACHE_TTL_DAYS, DEFAULT_ENRICHMENT_CONCURRENCY, DEFAULT_LLM_BATCH_SIZE,
    DEFAULT_MAX_SEARCHES, FALLBACK_TEXT, MAX_CACHE_TTL_DAYS,
};
use digest_core::{
    Annotation, AnnotationSource, BusinessImpact, EnrichmentCacheEntry, RequirementInput,
};
use futures::stream::{self, StreamExt};
use regex::Regex;
use research::{ChatMessage, LlmClient, SearchClient, SearchDepth, SearchResponse};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use std::time::Instant;
use store::Store;
use telemetry::metrics;
use tracing::{debug, info, warn};
use validator::Validate;

static SECTION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(section|sec\.|rule|regulation)\s+(\d+[A-Z]{0,2}(?:\s*\(\d+[a-z]?\))*)")
        .expect("invalid section pattern")
});

static PENALTY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\brs\.?|\binr|₹)\s?[\d,]+(?:\.\d+)?(?:\s*(?:lakhs?|crores?))?")
        .expect("invalid penalty pattern")
});

const SNIPPET_CHARS: usize = 1200;
const TOKENS_PER_ITEM: u32 = 400;
const MAX_COMPLETION_TOKENS: u32 = 4000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichOptions {
    pub max_searches: usize,
    pub concurrency: usize,
    pub cache_ttl_days: i64,
    pub llm_batch_size: usize,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            max_searches: DEFAULT_MAX_SEARCHES,
            concurrency: DEFAULT_ENRICHMENT_CONCURRENCY,
            cache_ttl_days: DEFAULT_CACHE_TTL_DAYS,
            llm_batch_size: DEFAULT_LLM_BATCH_SIZE,
        }
    }
}

impl EnrichOptions {
    /// Apply per-call overrides. Concurrency, search cap and batch size
    /// may be lowered but never raised above `self`.
    pub fn with_overrides(&self, overrides: &EnrichOverrides) -> Self {
        let lowered = |requested: Option<usize>, ceiling: usize| {
            requested.map_or(ceiling, |r| r.min(ceiling))
        };
        Self {
            max_searches: lowered(overrides.max_searches, self.max_searches),
            concurrency: lowered(overrides.concurrency, self.concurrency).max(1),
            cache_ttl_days: overrides
                .cache_ttl_days
                .map_or(self.cache_ttl_days, |ttl| ttl.clamp(1, MAX_CACHE_TTL_DAYS)),
            llm_batch_size: lowered(overrides.llm_batch_size, self.llm_batch_size).max(1),
        }
    }
}

/// Caller-supplied options; unset fields keep the configured values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EnrichOverrides {
    pub max_searches: Option<usize>,
    #[validate(range(min = 1))]
    pub concurrency: Option<usize>,
    #[validate(range(min = 1, max = 3650))]
    pub cache_ttl_days: Option<i64>,
    #[validate(range(min = 1))]
    pub llm_batch_size: Option<usize>,
}

/// First legal-section reference in `text`, e.g. "Section 92(1)".
pub fn extract_legal_section(text: &str) -> Option<String> {
    SECTION_REGEX.captures(text).map(|caps| {
        let kind = &caps[1];
        let mut kind = kind.to_lowercase();
        if kind == "sec." {
            kind = "section".to_string();
        }
        let mut chars = kind.chars();
        let kind = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
            None => kind,
        };
        format!("{} {}", kind, caps[2].trim())
    })
}

/// First rupee amount in `text`, e.g. "Rs. 50,000".
pub fn extract_penalty(text: &str) -> Option<String> {
    PENALTY_REGEX.find(text).map(|m| m.as_str().trim().to_string())
}

/// Outermost `{...}` in an LLM reply, tolerating prose and code fences.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if start >= end {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Search outcome for one distinct cache key.
#[derive(Debug, Clone)]
struct Research {
    key: String,
    input: RequirementInput,
    search: Option<SearchResponse>,
    legal_hint: Option<String>,
    penalty_hint: Option<String>,
}

impl Research {
    fn snippet(&self) -> String {
        let Some(search) = &self.search else {
            return String::new();
        };
        let mut text = String::new();
        if let Some(answer) = &search.answer {
            text.push_str(answer);
            text.push('\n');
        }
        if let Some(top) = search.top() {
            text.push_str(&top.title);
            text.push('\n');
            text.push_str(&top.content);
        }
        text.chars().take(SNIPPET_CHARS).collect()
    }

    /// Annotation from regex hints alone (no usable LLM output).
    fn hinted(&self) -> (String, String) {
        (
            self.legal_hint.clone().unwrap_or_else(|| FALLBACK_TEXT.to_string()),
            self.penalty_hint.clone().unwrap_or_else(|| FALLBACK_TEXT.to_string()),
        )
    }
}

fn string_field(value: Option<&Value>, field: &str) -> Option<String> {
    value?
        .get(field)?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Build a cache entry from one keyed object of the LLM reply.
fn entry_from_llm(research: &Research, value: Option<&Value>) -> EnrichmentCacheEntry {
    let (legal_hint, penalty_hint) = research.hinted();
    let impact = value.and_then(|v| v.get("business_impact"));
    EnrichmentCacheEntry {
        cache_key: research.key.clone(),
        legal_section: string_field(value, "legal_section").unwrap_or(legal_hint),
        penalty_provision: string_field(value, "penalty_provision").unwrap_or(penalty_hint),
        business_impact: BusinessImpact {
            financial: string_field(impact, "financial").unwrap_or_else(|| FALLBACK_TEXT.to_string()),
            reputation: string_field(impact, "reputation").unwrap_or_else(|| FALLBACK_TEXT.to_string()),
            operations: string_field(impact, "operations").unwrap_or_else(|| FALLBACK_TEXT.to_string()),
        },
        created_at: Utc::now(),
    }
}

fn build_prompt(batch: &[Research]) -> Vec<ChatMessage> {
    let mut prompt = String::from(
        "Annotate each compliance requirement below for an Indian company. Reply with ONE JSON \
         object and nothing else. Keys are the item keys given; each value is \
         {\"legal_section\": string, \"penalty_provision\": string, \"business_impact\": \
         {\"financial\": string, \"reputation\": string, \"operations\": string}}.\n",
    );
    for research in batch {
        prompt.push_str(&format!(
            "\n### key: {}\ncategory: {}\nrequirement: {}\n",
            research.key, research.input.category, research.input.requirement
        ));
        if let Some(section) = &research.legal_hint {
            prompt.push_str(&format!("section found: {}\n", section));
        }
        if let Some(penalty) = &research.penalty_hint {
            prompt.push_str(&format!("penalty found: {}\n", penalty));
        }
        let snippet = research.snippet();
        if !snippet.is_empty() {
            prompt.push_str(&format!("search context: {}\n", snippet));
        }
    }

    vec![
        ChatMessage::system(
            "You are a corporate compliance analyst. Answer strictly in JSON. Be concise.",
        ),
        ChatMessage::user(prompt),
    ]
}

pub struct EnrichmentOrchestrator {
    cache: Arc<dyn Store>,
    search: Arc<dyn SearchClient>,
    llm: Arc<dyn LlmClient>,
    defaults: EnrichOptions,
}

impl EnrichmentOrchestrator {
    pub fn new(
        cache: Arc<dyn Store>,
        search: Arc<dyn SearchClient>,
        llm: Arc<dyn LlmClient>,
        defaults: EnrichOptions,
    ) -> Self {
        Self {
            cache,
            search,
            llm,
            defaults,
        }
    }

    pub fn defaults(&self) -> &EnrichOptions {
        &self.defaults
    }

    /// Annotate `items`; the result has exactly one entry per input, in order.
    pub async fn enrich(&self, items: &[RequirementInput], options: &EnrichOptions) -> Vec<Annotation> {
        let started = Instant::now();
        let now = Utc::now();
        let keys: Vec<String> = items.iter().map(RequirementInput::cache_key).collect();

        let mut distinct: Vec<String> = keys.clone();
        distinct.sort();
        distinct.dedup();
        let cached = match self.cache.get_cached(&distinct).await {
            Ok(cached) => cached,
            Err(e) => {
                warn!(error = %e, "Enrichment cache read failed, treating all items as misses");
                HashMap::new()
            }
        };

        let mut results: Vec<Option<Annotation>> = vec![None; items.len()];
        // first input index per missed key, in input order
        let mut misses: Vec<(String, usize)> = Vec::new();
        for (idx, (item, key)) in items.iter().zip(&keys).enumerate() {
            match cached.get(key) {
                Some(entry) if entry.is_fresh(now, options.cache_ttl_days) => {
                    metrics().enrichment_cache_hits.inc();
                    results[idx] = Some(Annotation::from_cache(&item.id, entry));
                }
                _ => {
                    metrics().enrichment_cache_misses.inc();
                    if !misses.iter().any(|(k, _)| k == key) {
                        misses.push((key.clone(), idx));
                    }
                }
            }
        }

        let hits = results.iter().filter(|r| r.is_some()).count();
        let searchable = misses.len().min(options.max_searches);
        if misses.len() > searchable {
            info!(
                misses = misses.len(),
                max_searches = options.max_searches,
                "Search cap reached, remaining items get fallback annotations"
            );
        }

        let researched = self.research(&misses[..searchable], items, options.concurrency).await;
        let computed = self.annotate(researched, options.llm_batch_size.max(1)).await;

        let fresh_entries: Vec<EnrichmentCacheEntry> = computed
            .values()
            .filter(|(_, cacheable)| *cacheable)
            .map(|(entry, _)| entry.clone())
            .collect();
        if !fresh_entries.is_empty() {
            if let Err(e) = self.cache.upsert_cached(&fresh_entries).await {
                warn!(error = %e, entries = fresh_entries.len(), "Failed to write enrichment cache");
            }
        }

        let annotations: Vec<Annotation> = results
            .into_iter()
            .zip(items.iter().zip(&keys))
            .map(|(done, (item, key))| {
                done.unwrap_or_else(|| match computed.get(key) {
                    Some((entry, cacheable)) => Annotation {
                        requirement_id: item.id.clone(),
                        legal_section: entry.legal_section.clone(),
                        penalty_provision: entry.penalty_provision.clone(),
                        business_impact: entry.business_impact.clone(),
                        source: if *cacheable {
                            AnnotationSource::Computed
                        } else {
                            AnnotationSource::Fallback
                        },
                    },
                    None => Annotation::fallback(&item.id),
                })
            })
            .collect();

        metrics()
            .enrichment_latency_ms
            .observe(started.elapsed().as_millis() as u64);
        info!(
            items = items.len(),
            cache_hits = hits,
            searched = searchable,
            cache_writes = fresh_entries.len(),
            "Enrichment complete"
        );

        annotations
    }

    /// One search per key through a pool of `concurrency` workers.
    async fn research(
        &self,
        keys: &[(String, usize)],
        items: &[RequirementInput],
        concurrency: usize,
    ) -> Vec<Research> {
        stream::iter(keys.iter().cloned())
            .map(|(key, idx)| {
                let input = items[idx].clone();
                let search = self.search.clone();
                async move {
                    let query = format!(
                        "{} {} India Companies Act section penalty",
                        input.category, input.requirement
                    );
                    let response = match search.search(query.trim(), SearchDepth::Advanced).await {
                        Ok(response) => Some(response),
                        Err(e) => {
                            warn!(requirement_id = %input.id, error = %e, "Search failed");
                            None
                        }
                    };
                    let text = response
                        .as_ref()
                        .map(|r| {
                            let mut text = r.top().map(|t| t.content.clone()).unwrap_or_default();
                            if let Some(answer) = &r.answer {
                                text.push('\n');
                                text.push_str(answer);
                            }
                            text
                        })
                        .unwrap_or_default();
                    Research {
                        legal_hint: extract_legal_section(&text),
                        penalty_hint: extract_penalty(&text),
                        key,
                        input,
                        search: response,
                    }
                }
            })
            .buffer_unordered(concurrency.max(1))
            .collect::<Vec<_>>()
            .await
    }

    /// Run the LLM over researched items in batches. Returns key to
    /// (entry, cacheable); only search-and-LLM successes are cacheable.
    async fn annotate(
        &self,
        mut researched: Vec<Research>,
        batch_size: usize,
    ) -> HashMap<String, (EnrichmentCacheEntry, bool)> {
        researched.sort_by(|a, b| a.key.cmp(&b.key));
        let mut out = HashMap::new();

        for batch in researched.chunks(batch_size) {
            let max_tokens = (TOKENS_PER_ITEM * batch.len() as u32).min(MAX_COMPLETION_TOKENS);
            let reply = match self.llm.complete(&build_prompt(batch), max_tokens).await {
                Ok(text) => extract_json_object(&text).or_else(|| {
                    warn!(batch = batch.len(), "LLM reply contained no JSON object");
                    None
                }),
                Err(e) => {
                    warn!(batch = batch.len(), error = %e, "LLM call failed");
                    None
                }
            };

            for research in batch {
                let value = reply.as_ref().and_then(|v| v.get(&research.key));
                let cacheable = research.search.is_some() && value.is_some();
                debug!(key = %research.key, cacheable, "Annotated");
                out.insert(research.key.clone(), (entry_from_llm(research, value), cacheable));
            }
        }

        out
    }
}
