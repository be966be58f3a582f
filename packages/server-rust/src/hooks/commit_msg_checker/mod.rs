//! The `commit_msg_checker` hook: mails committers whose pushed commit
//! messages do not match a configured format.

pub mod mailer;
pub mod template;

use std::sync::{Arc, LazyLock, OnceLock};

use async_trait::async_trait;
use hookshot_core::event::data_str;
use hookshot_core::{HookError, HookService, Mapping, ServiceHandle};
use quick_cache::sync::Cache;
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use tracing::debug;

pub use mailer::{DeliverySettings, EmailConfig, LogMailer, MailMessage, Mailer};
pub use template::{Template, TemplateError, MAX_NESTING};

/// Most parsed templates kept across requests.
pub const TEMPLATE_CACHE_CAPACITY: usize = 64;

/// Mail body used when `data.template` is unset.
pub const DEFAULT_TEMPLATE: &str = "\
Commits pushed to the repository contained invalid commit messages.

Please see {{event.repository.url}} for commit message guidelines.

Push event info
***************
repository: {{event.repository.url}}
reference: {{event.ref}}
push date: {{event.head_commit.timestamp | date: \"%Y\"}}
pusher: {{event.pusher.name}}

Commits
*******
{% for c in event.commits %}
committed: {{c.committer.username}} / {{c.timestamp}}
commit: {{ c.url }}
message:
{{c.message}}

------
{% endfor %}
";

static AUTO_MERGE: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"^Merge branch '\S+' of \S+$")
        .multi_line(true)
        .build()
        .unwrap_or_else(|err| unreachable!("static merge pattern: {err}"))
});

type TemplateKey = (String, String);

pub struct CommitMsgChecker {
    mailer: Arc<dyn Mailer>,
    email: EmailConfig,
    delivery: OnceLock<DeliverySettings>,
    templates: Cache<TemplateKey, Arc<Template>>,
}

impl CommitMsgChecker {
    #[must_use]
    pub fn new(mailer: Arc<dyn Mailer>, email: EmailConfig) -> Self {
        Self {
            mailer,
            email,
            delivery: OnceLock::new(),
            templates: Cache::new(TEMPLATE_CACHE_CAPACITY),
        }
    }

    /// SMTP settings, resolved on first delivery.
    fn delivery(&self) -> &DeliverySettings {
        self.delivery
            .get_or_init(|| DeliverySettings::resolve(&self.email))
    }

    fn template(&self, repository: &str, data: &Mapping) -> Result<Arc<Template>, HookError> {
        let source = data_str(data, "template").unwrap_or(DEFAULT_TEMPLATE);
        let key = (repository.to_string(), source.to_string());
        self.templates.get_or_insert_with(&key, || {
            Template::parse(source).map(Arc::new).map_err(invalid_template)
        })
    }

    #[cfg(test)]
    fn cached_templates(&self) -> usize {
        self.templates.len()
    }
}

impl std::fmt::Debug for CommitMsgChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitMsgChecker")
            .field("email", &self.email)
            .field("delivery_resolved", &self.delivery.get().is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl HookService for CommitMsgChecker {
    fn hook_name(&self) -> &'static str {
        "commit_msg_checker"
    }

    fn title(&self) -> &'static str {
        "CommitMsgChecker"
    }

    async fn receive(
        &self,
        event: &str,
        data: &Mapping,
        payload: &Mapping,
    ) -> Result<Option<ServiceHandle>, HookError> {
        if event != "push" {
            return Ok(None);
        }

        let format = RegexBuilder::new(data_str(data, "message_format").unwrap_or_default())
            .multi_line(true)
            .dot_matches_new_line(true)
            .build()
            .map_err(|_| HookError::configuration("Invalid commit message format specification"))?;
        let repository = pointer_str(payload, "/repository/url").unwrap_or_default();
        let template = self.template(repository, data)?;

        let commits = payload
            .get("commits")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let invalid = commits.iter().filter(|commit| {
            let message = commit.get("message").and_then(Value::as_str).unwrap_or_default();
            !format.is_match(message) && !AUTO_MERGE.is_match(message)
        });
        let groups = group_by_committer(invalid);
        if groups.is_empty() {
            return Ok(Some(ServiceHandle::ok()));
        }

        let settings = self.delivery();
        let cc = recipients(data);
        let subject = subject(data, payload);

        for (committer, commits) in groups {
            let mut push = payload.clone();
            push.insert(
                "commits".to_string(),
                Value::Array(commits.into_iter().cloned().collect()),
            );
            let mut globals = Mapping::new();
            globals.insert("event".to_string(), Value::Object(push));

            let message = MailMessage {
                from: settings.from.clone(),
                reply_to: settings.from.clone(),
                to: vec![committer.to_string()],
                cc: cc.clone(),
                subject: subject.clone(),
                body: template.render(&globals).map_err(invalid_template)?,
            };
            debug!(committer, "sending commit message notice");
            self.mailer.deliver(settings, &message).await?;
        }

        Ok(Some(ServiceHandle::ok()))
    }
}

fn invalid_template(err: TemplateError) -> HookError {
    debug!(error = %err, "rejecting message template");
    HookError::configuration("Invalid message template")
}

fn pointer_str<'a>(map: &'a Mapping, pointer: &str) -> Option<&'a str> {
    let mut segments = pointer.trim_start_matches('/').split('/');
    let first = map.get(segments.next()?)?;
    segments
        .try_fold(first, |value, segment| value.get(segment))?
        .as_str()
}

/// Commits keyed by committer email, in order of first appearance.
/// Commits without a committer email are skipped.
fn group_by_committer<'a>(
    commits: impl Iterator<Item = &'a Value>,
) -> Vec<(&'a str, Vec<&'a Value>)> {
    let mut groups: Vec<(&str, Vec<&Value>)> = Vec::new();
    for commit in commits {
        let Some(email) = commit
            .pointer("/committer/email")
            .and_then(Value::as_str)
            .filter(|email| !email.is_empty())
        else {
            continue;
        };
        match groups.iter_mut().find(|(existing, _)| *existing == email) {
            Some((_, group)) => group.push(commit),
            None => groups.push((email, vec![commit])),
        }
    }
    groups
}

fn recipients(data: &Mapping) -> Vec<String> {
    data_str(data, "recipients")
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|addr| !addr.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn subject(data: &Mapping, payload: &Mapping) -> String {
    if let Some(subject) = data_str(data, "subject") {
        return subject.to_string();
    }
    let owner = pointer_str(payload, "/repository/owner/name")
        .or_else(|| pointer_str(payload, "/repository/owner/login"))
        .unwrap_or_default();
    let repo = pointer_str(payload, "/repository/name").unwrap_or_default();
    format!("[{owner}/{repo}] commit message format is invalid")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
