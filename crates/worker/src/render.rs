//! HTML rendering for digest and reminder emails.

use chrono::NaiveDate;
use digest_core::{
    NotificationKind, QueueItem, RequirementRow, RequirementStatus, UnsubscribeKind,
    UnsubscribeSigner,
};
use mailer::OutgoingEmail;
use std::collections::BTreeMap;
use url::Url;

use crate::reminders::ReminderBucket;

/// Builds signed one-click unsubscribe URLs.
#[derive(Debug, Clone)]
pub struct UnsubscribeLinks {
    endpoint: Url,
    signer: UnsubscribeSigner,
}

impl UnsubscribeLinks {
    /// `public_base_url` is the externally reachable root of this service.
    pub fn new(public_base_url: &str, signer: UnsubscribeSigner) -> Result<Self, url::ParseError> {
        let endpoint = Url::parse(&format!("{}/unsubscribe", public_base_url.trim_end_matches('/')))?;
        Ok(Self { endpoint, signer })
    }

    pub fn url_for(&self, user_id: &str, kind: UnsubscribeKind) -> String {
        let token = self.signer.generate(user_id, kind);
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("token", &token);
        url.into()
    }

    pub fn signer(&self) -> &UnsubscribeSigner {
        &self.signer
    }
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Digest sub-section, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DigestSection {
    Completed,
    Pending,
    Overdue,
    Other,
}

impl DigestSection {
    pub fn for_status(status: Option<RequirementStatus>) -> Self {
        match status {
            Some(RequirementStatus::Completed) => Self::Completed,
            Some(RequirementStatus::Pending) => Self::Pending,
            Some(RequirementStatus::Overdue) => Self::Overdue,
            _ => Self::Other,
        }
    }

    pub fn heading(&self) -> &'static str {
        match self {
            Self::Completed => "Completed",
            Self::Pending => "Pending",
            Self::Overdue => "Overdue",
            Self::Other => "Other updates",
        }
    }
}

/// Partition items by resulting status, preserving input order per section.
pub fn partition_sections<'a>(items: &[&'a QueueItem]) -> BTreeMap<DigestSection, Vec<&'a QueueItem>> {
    let mut sections: BTreeMap<DigestSection, Vec<&QueueItem>> = BTreeMap::new();
    for item in items {
        sections
            .entry(DigestSection::for_status(item.payload.new_status))
            .or_default()
            .push(item);
    }
    sections
}

/// Render at most `limit` rows followed by a "+N more" line.
fn push_capped_list<T>(html: &mut String, rows: &[T], limit: usize, render: impl Fn(&T) -> String) {
    html.push_str("<ul>");
    for row in rows.iter().take(limit) {
        html.push_str("<li>");
        html.push_str(&render(row));
        html.push_str("</li>");
    }
    html.push_str("</ul>");
    if rows.len() > limit {
        html.push_str(&format!("<p>+{} more</p>", rows.len() - limit));
    }
}

fn push_footer(html: &mut String, unsubscribe_url: &str, what: &str) {
    html.push_str(&format!(
        "<hr><p style=\"font-size:12px;color:#666\">You are receiving this because you are \
         subscribed to {}. <a href=\"{}\">Unsubscribe</a></p>",
        escape_html(what),
        escape_html(unsubscribe_url)
    ));
}

fn greeting(name: Option<&str>) -> String {
    match name {
        Some(name) if !name.trim().is_empty() => format!("<p>Hi {},</p>", escape_html(name)),
        _ => "<p>Hi,</p>".to_string(),
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

/// One digest email for a (recipient, kind) group.
pub fn render_status_digest(
    items: &[&QueueItem],
    section_limit: usize,
    links: &UnsubscribeLinks,
) -> Option<OutgoingEmail> {
    let first = items.first()?;
    let kind = first.kind;
    let unsubscribe_kind = kind.unsubscribe_kind();
    let unsubscribe_url = links.url_for(&first.user_id, unsubscribe_kind);

    let mut companies: Vec<&str> = items.iter().map(|i| i.company_name.as_str()).collect();
    companies.sort_unstable();
    companies.dedup();

    let noun = match kind {
        NotificationKind::StatusChange => "compliance update",
        NotificationKind::Reminder => "compliance reminder",
    };
    let subject = match companies.as_slice() {
        [company] => format!("{} for {}", plural(items.len(), noun), company),
        _ => format!("{} across {} companies", plural(items.len(), noun), companies.len()),
    };

    let mut html = String::new();
    html.push_str(&greeting(first.payload.recipient_name.as_deref()));
    html.push_str(&format!(
        "<p>{} changed since our last email.</p>",
        plural(items.len(), "requirement")
    ));

    for (section, rows) in partition_sections(items) {
        html.push_str(&format!("<h3>{} ({})</h3>", section.heading(), rows.len()));
        push_capped_list(&mut html, &rows, section_limit, |item| {
            let mut line = format!(
                "<strong>{}</strong> at {}",
                escape_html(&item.payload.requirement_name),
                escape_html(&item.company_name)
            );
            if let (Some(old), Some(new)) = (item.payload.old_status, item.payload.new_status) {
                line.push_str(&format!(": {} &rarr; {}", old.label(), new.label()));
            }
            if let Some(due) = item.payload.due_date {
                line.push_str(&format!(" (due {})", due.format("%d %b %Y")));
            }
            line
        });
    }

    push_footer(&mut html, &unsubscribe_url, unsubscribe_kind.describe());

    Some(OutgoingEmail::new(first.email.clone(), subject, html).with_unsubscribe_url(unsubscribe_url))
}

/// One reminder digest covering every qualifying requirement for a user.
pub fn render_reminder_digest(
    recipient_email: &str,
    recipient_name: Option<&str>,
    user_id: &str,
    requirements: &[(&RequirementRow, ReminderBucket)],
    today: NaiveDate,
    section_limit: usize,
    links: &UnsubscribeLinks,
) -> OutgoingEmail {
    let unsubscribe_url = links.url_for(user_id, UnsubscribeKind::Reminders);

    let overdue = requirements.iter().filter(|(_, b)| b.is_overdue()).count();
    let subject = if overdue > 0 {
        format!(
            "Compliance reminder: {} overdue, {} due soon",
            overdue,
            requirements.len() - overdue
        )
    } else {
        format!("Compliance reminder: {} due soon", plural(requirements.len(), "requirement"))
    };

    let mut by_company: BTreeMap<&str, Vec<(&RequirementRow, ReminderBucket)>> = BTreeMap::new();
    for (row, bucket) in requirements {
        by_company
            .entry(row.company_name.as_str())
            .or_default()
            .push((*row, *bucket));
    }

    let mut html = String::new();
    html.push_str(&greeting(recipient_name));
    html.push_str(&format!(
        "<p>Upcoming and overdue compliance deadlines as of {}.</p>",
        today.format("%d %b %Y")
    ));

    for (company, mut rows) in by_company {
        rows.sort_by_key(|(row, bucket)| (*bucket, row.due_date));
        html.push_str(&format!("<h3>{}</h3>", escape_html(company)));
        push_capped_list(&mut html, &rows, section_limit, |(row, bucket)| {
            format!(
                "<strong>{}</strong>: {} (due {})",
                escape_html(&row.requirement),
                bucket.label(),
                row.due_date.format("%d %b %Y")
            )
        });
    }

    push_footer(&mut html, &unsubscribe_url, UnsubscribeKind::Reminders.describe());

    OutgoingEmail::new(recipient_email, subject, html).with_unsubscribe_url(unsubscribe_url)
}
