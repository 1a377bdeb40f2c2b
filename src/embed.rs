//! Discord embed construction for GitHub webhook events.
//!
//! `format_message` is total: whatever the payload looks like, the caller
//! gets back a well-formed message that fits Discord's embed limits. Missing
//! payload fields degrade to placeholder values, never to an error.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{self, error};

use crate::error::Result;
use crate::utils::truncate;

/// A cool blue color for Discord embed
pub const COLOR_BLUE: u32 = 3_066_993;
/// Red color for errors
pub const COLOR_RED: u32 = 15_158_332;

// Discord embed limits
pub const MAX_TITLE_LEN: usize = 256;
pub const MAX_FIELD_NAME_LEN: usize = 256;
pub const MAX_FIELD_VALUE_LEN: usize = 1024;
pub const MAX_FOOTER_LEN: usize = 2048;
pub const MAX_FIELDS: usize = 25;
pub const MAX_TOTAL_CHARS: usize = 6000;

/// Envelope posted to the Discord webhook URL.
#[derive(Debug, Clone, Serialize)]
pub struct DiscordMessage {
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    pub color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedThumbnail>,
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedAuthor {
    pub name: String,
    pub icon_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedThumbnail {
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedFooter {
    pub text: String,
    pub icon_url: String,
}

impl Embed {
    /// Combined character count Discord enforces across an embed
    /// (title, description, footer text, and all field names/values).
    pub fn total_chars(&self) -> usize {
        let mut total = self.title.chars().count();
        if let Some(description) = &self.description {
            total += description.chars().count();
        }
        if let Some(footer) = &self.footer {
            total += footer.text.chars().count();
        }
        for field in &self.fields {
            total += field.name.chars().count() + field.value.chars().count();
        }
        total
    }
}

/// Walks a nested path like `["repository", "owner", "login"]`.
fn value_at<'a>(payload: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = payload;
    for key in path {
        current = current.get(key)?;
    }
    Some(current)
}

fn str_at<'a>(payload: &'a Value, path: &[&str]) -> Option<&'a str> {
    value_at(payload, path).and_then(Value::as_str)
}

fn str_or<'a>(payload: &'a Value, path: &[&str], default: &'a str) -> &'a str {
    str_at(payload, path).unwrap_or(default)
}

/// Renders strings as-is and anything else (hook IDs are numbers) via JSON.
fn display_at(payload: &Value, path: &[&str]) -> Option<String> {
    value_at(payload, path).map(|v| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// `[name](html_url)` markdown link for the payload's repository.
fn repo_link(payload: &Value) -> String {
    format!(
        "[{}]({})",
        str_or(payload, &["repository", "name"], "Unknown"),
        str_or(payload, &["repository", "html_url"], "#"),
    )
}

/// Commit IDs are displayed as their first 7 characters.
fn short_sha(sha: &str) -> String {
    sha.chars().take(7).collect()
}

struct EmbedBuilder {
    event: String,
    embed: Embed,
}

impl EmbedBuilder {
    /// Base document every event starts from: blue color, sender as author,
    /// generic title, repository URL and best-available thumbnail.
    fn new(event: &str, payload: &Value) -> Self {
        let thumbnail = str_at(payload, &["organization", "avatar_url"])
            .or_else(|| str_at(payload, &["repository", "owner", "avatar_url"]))
            .map(|url| EmbedThumbnail {
                url: url.to_string(),
            });

        let embed = Embed {
            color: COLOR_BLUE,
            author: Some(EmbedAuthor {
                name: truncate(str_or(payload, &["sender", "login"], "Unknown"), MAX_TITLE_LEN),
                icon_url: str_or(payload, &["sender", "avatar_url"], "").to_string(),
            }),
            title: truncate(&format!("GitHub Event: {}", event), MAX_TITLE_LEN),
            description: None,
            url: str_at(payload, &["repository", "html_url"]).map(String::from),
            thumbnail,
            fields: Vec::new(),
            footer: None,
            timestamp: Utc::now(),
        };

        Self {
            event: event.to_string(),
            embed,
        }
    }

    fn set_title(&mut self, title: &str) {
        self.embed.title = truncate(title, MAX_TITLE_LEN);
    }

    /// Appends a field, truncating name/value to Discord's budgets.
    /// Once the 25-field cap is reached, further additions are dropped.
    fn add_field(&mut self, name: &str, value: &str, inline: bool) {
        if self.embed.fields.len() < MAX_FIELDS {
            self.embed.fields.push(EmbedField {
                name: truncate(name, MAX_FIELD_NAME_LEN),
                value: truncate(value, MAX_FIELD_VALUE_LEN),
                inline,
            });
        }
    }

    /// Repository name+link and owner login, plus primary language if set.
    /// Shared by push, pull_request, issues and the unknown-kind branch.
    fn add_repository_fields(&mut self, payload: &Value) {
        if payload.get("repository").is_some() {
            self.add_field("Repository", &repo_link(payload), true);
            self.add_field(
                "Repository Owner",
                str_or(payload, &["repository", "owner", "login"], "Unknown"),
                true,
            );
            if let Some(language) = str_at(payload, &["repository", "language"]) {
                self.add_field("Language", language, true);
            }
        }
    }

    /// Comma-joined file/label list; omitted entirely when the array is
    /// empty so it doesn't waste one of the 25 field slots.
    fn add_list_field(&mut self, name: &str, container: &Value, key: &str) {
        let joined = container
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        if !joined.is_empty() {
            self.add_field(name, &joined, false);
        }
    }

    /// Footer prefers repository-owner identity (with language annotation),
    /// falls back to organization identity, else no footer at all.
    fn apply_footer(&mut self, payload: &Value) {
        if value_at(payload, &["repository", "owner"]).is_some() {
            let owner = str_or(payload, &["repository", "owner", "login"], "Unknown");
            let text = match str_at(payload, &["repository", "language"]) {
                Some(language) => format!("Repository Owner: {} | Language: {}", owner, language),
                None => format!("Repository Owner: {}", owner),
            };
            self.embed.footer = Some(EmbedFooter {
                text: truncate(&text, MAX_FOOTER_LEN),
                icon_url: str_or(payload, &["repository", "owner", "avatar_url"], "").to_string(),
            });
        } else if payload.get("organization").is_some() {
            self.embed.footer = Some(EmbedFooter {
                text: truncate(
                    &format!(
                        "Organization: {}",
                        str_or(payload, &["organization", "login"], "Unknown")
                    ),
                    MAX_FOOTER_LEN,
                ),
                icon_url: str_or(payload, &["organization", "avatar_url"], "").to_string(),
            });
        }
    }
}

type FieldResult = Result<()>;
type FieldBuilder = fn(&mut EmbedBuilder, &Value) -> FieldResult;

/// Fixed table of known event kinds. Each entry is a pure field-building
/// function so individual kinds can be unit tested in isolation.
const EVENT_BUILDERS: &[(&str, FieldBuilder)] = &[
    ("push", push_fields),
    ("pull_request", pull_request_fields),
    ("issues", issues_fields),
    ("meta", meta_fields),
    ("star", star_fields),
    ("watch", watch_fields),
    ("fork", fork_fields),
    ("create", create_fields),
    ("delete", delete_fields),
    ("deployment", deployment_fields),
    ("deployment_status", deployment_status_fields),
    ("pull_request_review", pull_request_review_fields),
    ("pull_request_review_comment", pr_review_comment_fields),
    ("installation", installation_fields),
    ("release", release_fields),
    ("repository", repository_event_fields),
    ("commit_comment", commit_comment_fields),
    ("label", label_fields),
    ("milestone", milestone_fields),
    ("workflow_run", workflow_run_fields),
    ("repository_dispatch", repository_dispatch_fields),
    ("membership", membership_fields),
    ("team_add", team_add_fields),
    ("team_remove", team_remove_fields),
    ("team_update", team_update_fields),
    ("repository_add", repository_add_fields),
    ("repository_remove", repository_remove_fields),
    ("repository_transfer", repository_transfer_fields),
    ("member_added", member_added_fields),
    ("member_removed", member_removed_fields),
    ("team_add_to_repository", team_add_to_repo_fields),
    ("team_remove_from_repository", team_remove_from_repo_fields),
    ("project_create", project_create_fields),
    ("project_update", project_update_fields),
    ("project_delete", project_delete_fields),
];

fn builder_for(event: &str) -> Option<FieldBuilder> {
    EVENT_BUILDERS
        .iter()
        .find(|(kind, _)| *kind == event)
        .map(|(_, builder)| *builder)
}

fn push_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    if let Some(commit) = payload.get("head_commit").filter(|c| !c.is_null()) {
        b.add_field("Commit Message", str_or(commit, &["message"], "N/A"), false);
        let id = commit
            .get("id")
            .and_then(Value::as_str)
            .map(short_sha)
            .unwrap_or_else(|| "N/A".to_string());
        b.add_field(
            "Commit ID",
            &format!("[{}]({})", id, str_or(commit, &["url"], "#")),
            true,
        );
        b.add_field("Branch", str_or(payload, &["ref"], "N/A"), true);

        b.add_list_field("Files Added", commit, "added");
        b.add_list_field("Files Modified", commit, "modified");
        b.add_list_field("Files Removed", commit, "removed");

        if let Some(timestamp) = commit.get("timestamp").and_then(Value::as_str) {
            let display = DateTime::parse_from_rfc3339(timestamp)
                .map(|t| t.format("%Y-%m-%d %H:%M:%S %Z").to_string())
                .unwrap_or_else(|_| timestamp.to_string());
            b.add_field("Commit Date", &display, false);
        }
    }
    b.add_repository_fields(payload);
    Ok(())
}

fn pull_request_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    if let Some(pr) = payload.get("pull_request").filter(|p| !p.is_null()) {
        b.add_field("PR Title", str_or(pr, &["title"], "N/A"), true);
        b.add_field("Action", str_or(payload, &["action"], "N/A"), true);
        b.add_field(
            "PR URL",
            &format!("[Link to PR]({})", str_or(pr, &["html_url"], "#")),
            false,
        );
        if pr.get("user").is_some() {
            b.add_field("PR Author", str_or(pr, &["user", "login"], "Unknown"), true);
        }
        if pr.get("head").is_some() && pr.get("base").is_some() {
            b.add_field(
                "PR Branch",
                &format!(
                    "{} → {}",
                    str_or(pr, &["head", "ref"], "Unknown"),
                    str_or(pr, &["base", "ref"], "Unknown"),
                ),
                true,
            );
        }
    }
    b.add_repository_fields(payload);
    Ok(())
}

fn issues_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    if let Some(issue) = payload.get("issue").filter(|i| !i.is_null()) {
        b.add_field("Issue Title", str_or(issue, &["title"], "N/A"), true);
        b.add_field("Action", str_or(payload, &["action"], "N/A"), true);
        b.add_field(
            "Issue URL",
            &format!("[Link to Issue]({})", str_or(issue, &["html_url"], "#")),
            false,
        );
        if issue.get("user").is_some() {
            b.add_field(
                "Issue Author",
                str_or(issue, &["user", "login"], "Unknown"),
                true,
            );
        }
        let labels = issue
            .get("labels")
            .and_then(Value::as_array)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(|label| label.get("name").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        if !labels.is_empty() {
            b.add_field("Labels", &labels, true);
        }
    }
    b.add_repository_fields(payload);
    Ok(())
}

fn meta_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    b.set_title("GitHub Webhook Management");
    b.add_field("Action", str_or(payload, &["action"], "Unknown"), true);
    if payload.get("hook").is_some() {
        let hook_id = display_at(payload, &["hook_id"]).unwrap_or_else(|| "Unknown".to_string());
        b.add_field("Hook ID", &hook_id, true);
        b.add_field("Hook Type", str_or(payload, &["hook", "type"], "Unknown"), true);
    }
    if payload.get("organization").is_some() {
        b.add_field(
            "Organization",
            str_or(payload, &["organization", "login"], "Unknown"),
            true,
        );
    } else {
        b.add_repository_fields(payload);
    }
    Ok(())
}

fn star_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    b.add_field("Repository Starred", &repo_link(payload), true);
    b.add_field(
        "Starred By",
        str_or(payload, &["sender", "login"], "Unknown"),
        true,
    );
    Ok(())
}

fn watch_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    b.add_field("Action", str_or(payload, &["action"], "Unknown"), true);
    b.add_repository_fields(payload);
    Ok(())
}

fn fork_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    b.add_field("Repository Forked", &repo_link(payload), true);
    b.add_field(
        "Forked By",
        str_or(payload, &["sender", "login"], "Unknown"),
        true,
    );
    let fork_url = str_at(payload, &["forkee", "html_url"])
        .unwrap_or_else(|| str_or(payload, &["repository", "html_url"], "#"));
    b.add_field(
        "Forked Repository URL",
        &format!("[Forked Repo]({})", fork_url),
        false,
    );
    Ok(())
}

fn create_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    ref_change_fields(b, payload, "Created")
}

fn delete_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    ref_change_fields(b, payload, "Deleted")
}

/// Branch/tag creation and deletion share the same shape.
fn ref_change_fields(b: &mut EmbedBuilder, payload: &Value, verb: &str) -> FieldResult {
    b.add_field(
        verb,
        &format!(
            "{} {}",
            str_or(payload, &["ref_type"], "Unknown"),
            str_or(payload, &["ref"], "Unknown"),
        ),
        true,
    );
    b.add_field("In Repo", &repo_link(payload), true);
    Ok(())
}

fn deployment_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    b.add_field("Deployment Action", str_or(payload, &["action"], "Unknown"), true);
    b.add_field(
        "Environment",
        str_or(payload, &["deployment", "environment"], "Unknown"),
        true,
    );
    b.add_field(
        "Deployment URL",
        str_or(payload, &["deployment", "url"], "N/A"),
        false,
    );
    b.add_field("Repository", &repo_link(payload), true);
    Ok(())
}

fn deployment_status_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    b.add_field(
        "Deployment Status Action",
        str_or(payload, &["state"], "Unknown"),
        true,
    );
    b.add_field(
        "Environment",
        str_or(payload, &["deployment_status", "environment"], "Unknown"),
        true,
    );
    b.add_field(
        "Status URL",
        str_or(payload, &["deployment_status", "target_url"], "N/A"),
        false,
    );
    b.add_field("Repository", &repo_link(payload), true);
    Ok(())
}

fn pull_request_review_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    b.add_field("Review Action", str_or(payload, &["action"], "Unknown"), true);
    b.add_field(
        "Reviewer",
        str_or(payload, &["review", "user", "login"], "Unknown"),
        true,
    );
    b.add_field(
        "PR Title",
        str_or(payload, &["pull_request", "title"], "N/A"),
        true,
    );
    b.add_field(
        "PR URL",
        str_or(payload, &["pull_request", "html_url"], "N/A"),
        false,
    );
    Ok(())
}

fn pr_review_comment_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    b.add_field("Comment Action", str_or(payload, &["action"], "Unknown"), true);
    b.add_field(
        "Reviewer",
        str_or(payload, &["comment", "user", "login"], "Unknown"),
        true,
    );
    b.add_field(
        "PR Title",
        str_or(payload, &["pull_request", "title"], "N/A"),
        true,
    );
    b.add_field(
        "PR URL",
        str_or(payload, &["pull_request", "html_url"], "N/A"),
        false,
    );
    b.add_field("Comment", str_or(payload, &["comment", "body"], "N/A"), true);
    Ok(())
}

fn installation_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    b.add_field("Action", str_or(payload, &["action"], "Unknown"), true);
    b.add_repository_fields(payload);
    Ok(())
}

fn release_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    b.add_field("Release", str_or(payload, &["release", "name"], "Unknown"), true);
    b.add_field("Action", str_or(payload, &["action"], "Unknown"), true);
    b.add_field(
        "Release URL",
        str_or(payload, &["release", "html_url"], "N/A"),
        false,
    );
    b.add_field("Tag", str_or(payload, &["release", "tag_name"], "N/A"), true);
    Ok(())
}

fn repository_event_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    b.add_field(
        "Repository",
        str_or(payload, &["repository", "name"], "Unknown"),
        true,
    );
    b.add_field("Action", str_or(payload, &["action"], "Unknown"), true);
    b.add_field(
        "Repository URL",
        str_or(payload, &["repository", "html_url"], "N/A"),
        false,
    );
    b.add_field(
        "Description",
        str_or(payload, &["repository", "description"], "No description"),
        true,
    );
    Ok(())
}

fn commit_comment_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    b.add_field(
        "Commit Comment",
        str_or(payload, &["comment", "body"], "N/A"),
        true,
    );
    let sha = str_at(payload, &["comment", "commit_id"])
        .or_else(|| str_at(payload, &["commit_id"]))
        .map(short_sha)
        .unwrap_or_else(|| "Unknown".to_string());
    b.add_field("Commit", &sha, true);
    b.add_field("Repository", &repo_link(payload), true);
    Ok(())
}

fn label_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    b.add_field("Label", str_or(payload, &["label", "name"], "Unknown"), true);
    b.add_field("Action", str_or(payload, &["action"], "Unknown"), true);
    b.add_field("Repository", &repo_link(payload), true);
    Ok(())
}

fn milestone_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    b.add_field(
        "Milestone",
        str_or(payload, &["milestone", "title"], "Unknown"),
        true,
    );
    b.add_field("Action", str_or(payload, &["action"], "Unknown"), true);
    b.add_field("Repository", &repo_link(payload), true);
    Ok(())
}

fn workflow_run_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    b.add_field(
        "Workflow Run",
        str_or(payload, &["workflow_run", "name"], "Unknown"),
        true,
    );
    b.add_field(
        "Status",
        str_or(payload, &["workflow_run", "status"], "Unknown"),
        true,
    );
    b.add_field("Repository", &repo_link(payload), true);
    b.add_field(
        "Workflow Run URL",
        str_or(payload, &["workflow_run", "html_url"], "N/A"),
        false,
    );
    Ok(())
}

fn repository_dispatch_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    b.add_field("Action", str_or(payload, &["action"], "Unknown"), true);
    b.add_field("Repository", &repo_link(payload), true);
    let client_payload = payload.get("client_payload").unwrap_or(&Value::Null);
    let rendered = serde_json::to_string_pretty(client_payload)?;
    b.add_field("Payload", &rendered, false);
    Ok(())
}

fn membership_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    b.add_field(
        "Organization",
        str_or(payload, &["organization", "login"], "Unknown"),
        true,
    );
    b.add_field("User", str_or(payload, &["sender", "login"], "Unknown"), true);
    b.add_field("Action", str_or(payload, &["action"], "Unknown"), false);
    Ok(())
}

fn team_add_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    team_fields(b, payload, "Team Added")
}

fn team_remove_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    team_fields(b, payload, "Team Removed")
}

fn team_update_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    team_fields(b, payload, "Team Updated")
}

fn team_fields(b: &mut EmbedBuilder, payload: &Value, action: &str) -> FieldResult {
    b.add_field("Team", str_or(payload, &["team", "name"], "Unknown"), true);
    b.add_field("Action", action, true);
    b.add_field("Team URL", str_or(payload, &["team", "url"], "N/A"), false);
    Ok(())
}

fn repository_add_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    org_repository_fields(b, payload, "Repository Added to Organization")
}

fn repository_remove_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    org_repository_fields(b, payload, "Repository Removed from Organization")
}

fn org_repository_fields(b: &mut EmbedBuilder, payload: &Value, action: &str) -> FieldResult {
    b.add_field(
        "Repository",
        str_or(payload, &["repository", "name"], "Unknown"),
        true,
    );
    b.add_field("Action", action, true);
    b.add_field(
        "Repository URL",
        str_or(payload, &["repository", "html_url"], "N/A"),
        false,
    );
    Ok(())
}

fn repository_transfer_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    b.add_field(
        "Repository",
        str_or(payload, &["repository", "name"], "Unknown"),
        true,
    );
    b.add_field("Action", "Repository Transferred", true);
    b.add_field(
        "From Organization",
        str_or(payload, &["changes", "owner", "from", "organization", "login"], "Unknown"),
        true,
    );
    b.add_field(
        "To Organization",
        str_or(payload, &["organization", "login"], "Unknown"),
        true,
    );
    b.add_field(
        "Repository URL",
        str_or(payload, &["repository", "html_url"], "N/A"),
        false,
    );
    Ok(())
}

fn member_added_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    org_member_fields(b, payload, "User Added to Organization")
}

fn member_removed_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    org_member_fields(b, payload, "User Removed from Organization")
}

fn org_member_fields(b: &mut EmbedBuilder, payload: &Value, action: &str) -> FieldResult {
    b.add_field(
        "Organization",
        str_or(payload, &["organization", "login"], "Unknown"),
        true,
    );
    b.add_field("User", str_or(payload, &["member", "login"], "Unknown"), true);
    b.add_field("Action", action, true);
    Ok(())
}

fn team_add_to_repo_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    team_repo_fields(b, payload, "Team Added to Repository")
}

fn team_remove_from_repo_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    team_repo_fields(b, payload, "Team Removed from Repository")
}

fn team_repo_fields(b: &mut EmbedBuilder, payload: &Value, action: &str) -> FieldResult {
    b.add_field("Team", str_or(payload, &["team", "name"], "Unknown"), true);
    b.add_field(
        "Repository",
        str_or(payload, &["repository", "name"], "Unknown"),
        true,
    );
    b.add_field("Action", action, true);
    Ok(())
}

fn project_create_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    project_fields(b, payload, "Project Created")
}

fn project_update_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    project_fields(b, payload, "Project Updated")
}

fn project_delete_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    project_fields(b, payload, "Project Deleted")
}

fn project_fields(b: &mut EmbedBuilder, payload: &Value, action: &str) -> FieldResult {
    b.add_field("Project", str_or(payload, &["project", "name"], "Unknown"), true);
    b.add_field(
        "Organization",
        str_or(payload, &["organization", "login"], "Unknown"),
        true,
    );
    b.add_field("Action", action, true);
    Ok(())
}

/// Unknown kinds get a reduced payload view: just the action and the sender
/// login, rendered as JSON inside a code fence.
fn unknown_event_fields(b: &mut EmbedBuilder, payload: &Value) -> FieldResult {
    let summary = json!({
        "action": payload.get("action").cloned().unwrap_or(Value::Null),
        "sender": str_at(payload, &["sender", "login"]),
    });
    let details = serde_json::to_string_pretty(&summary)?;
    let event = b.event.clone();
    b.add_field("Event Type", &event, true);
    b.add_field("Details", &format!("```json\n{}\n```", details), false);
    if payload.get("repository").is_some() || payload.get("organization").is_some() {
        b.add_repository_fields(payload);
    }
    Ok(())
}

/// Formats a GitHub webhook payload into a Discord message.
///
/// Never fails: formatting errors are absorbed and downgraded to an
/// error-indicator embed so a malformed payload cannot crash the pipeline.
pub fn format_message(event: &str, payload: &Value) -> DiscordMessage {
    match build_message(event, payload) {
        Ok(message) => message,
        Err(e) => {
            error!("Error formatting {} message: {}", event, e);
            error_message(event)
        }
    }
}

fn build_message(event: &str, payload: &Value) -> Result<DiscordMessage> {
    let mut builder = EmbedBuilder::new(event, payload);

    match builder_for(event) {
        Some(build_fields) => build_fields(&mut builder, payload)?,
        None => unknown_event_fields(&mut builder, payload)?,
    }
    builder.apply_footer(payload);

    let embed = builder.embed;
    if embed.total_chars() > MAX_TOTAL_CHARS {
        return Ok(oversize_message(event, payload));
    }
    Ok(DiscordMessage {
        embeds: vec![embed],
    })
}

fn minimal_embed(color: u32, title: &str, description: &str) -> Embed {
    Embed {
        color,
        author: None,
        title: truncate(title, MAX_TITLE_LEN),
        description: Some(description.to_string()),
        url: None,
        thumbnail: None,
        fields: Vec::new(),
        footer: None,
        timestamp: Utc::now(),
    }
}

fn two_field_summary(event: &str, payload: &Value, description: &str) -> DiscordMessage {
    let mut embed = minimal_embed(COLOR_BLUE, &format!("GitHub Event: {}", event), description);
    embed.fields = vec![
        EmbedField {
            name: "Event Type".to_string(),
            value: truncate(event, MAX_FIELD_VALUE_LEN),
            inline: true,
        },
        EmbedField {
            name: "Action".to_string(),
            value: truncate(str_or(payload, &["action"], "Unknown"), MAX_FIELD_VALUE_LEN),
            inline: true,
        },
    ];
    DiscordMessage {
        embeds: vec![embed],
    }
}

/// Replacement when the built embed blows Discord's 6000-character budget.
pub fn oversize_message(event: &str, payload: &Value) -> DiscordMessage {
    two_field_summary(
        event,
        payload,
        "Event received with large payload. See GitHub for details.",
    )
}

/// Replacement when the serialized message exceeds the sink's byte ceiling.
pub fn simplified_message(event: &str, payload: &Value) -> DiscordMessage {
    two_field_summary(
        event,
        payload,
        "Event received, but payload was too large to display details.",
    )
}

/// Last-resort message posted after the primary dispatch attempt failed.
pub fn fallback_message(event: &str) -> DiscordMessage {
    let mut embed = minimal_embed(
        COLOR_RED,
        &format!("GitHub Event: {} (Error)", event),
        "Failed to send detailed notification to Discord.",
    );
    embed.fields = vec![EmbedField {
        name: "Event Type".to_string(),
        value: truncate(event, MAX_FIELD_VALUE_LEN),
        inline: true,
    }];
    DiscordMessage {
        embeds: vec![embed],
    }
}

/// Error-indicator message returned when formatting itself failed.
pub fn error_message(event: &str) -> DiscordMessage {
    let mut embed = minimal_embed(
        COLOR_RED,
        &format!("GitHub Event: {} (Error Processing)", event),
        "There was an error processing this webhook event.",
    );
    embed.fields = vec![EmbedField {
        name: "Event Type".to_string(),
        value: truncate(if event.is_empty() { "Unknown" } else { event }, MAX_FIELD_VALUE_LEN),
        inline: true,
    }];
    DiscordMessage {
        embeds: vec![embed],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field<'a>(embed: &'a Embed, name: &str) -> Option<&'a EmbedField> {
        embed.fields.iter().find(|f| f.name == name)
    }

    fn push_payload() -> Value {
        json!({
            "ref": "refs/heads/main",
            "head_commit": {
                "id": "d6fde92930d4715a2b49857d24b940956b26d2d3",
                "url": "https://github.com/octo/hello/commit/d6fde929",
                "message": "Fix the frobnicator",
                "timestamp": "2015-05-05T19:40:15-04:00",
                "added": ["a.txt", "b.txt"],
                "modified": [],
                "removed": []
            },
            "repository": {
                "name": "hello",
                "html_url": "https://github.com/octo/hello",
                "language": "Rust",
                "owner": {
                    "login": "octo",
                    "avatar_url": "https://avatars.example/octo.png"
                }
            },
            "sender": {
                "login": "octo",
                "avatar_url": "https://avatars.example/octo.png"
            }
        })
    }

    #[test]
    fn empty_payload_still_formats() {
        let message = format_message("push", &json!({}));
        let embed = &message.embeds[0];
        assert_eq!(embed.title, "GitHub Event: push");
        assert_eq!(embed.author.as_ref().unwrap().name, "Unknown");
        assert!(embed.total_chars() <= MAX_TOTAL_CHARS);
        assert!(!embed.title.is_empty());
    }

    #[test]
    fn push_event_has_commit_fields() {
        let message = format_message("push", &push_payload());
        let embed = &message.embeds[0];

        assert_eq!(field(embed, "Commit Message").unwrap().value, "Fix the frobnicator");
        assert_eq!(
            field(embed, "Commit ID").unwrap().value,
            "[d6fde92](https://github.com/octo/hello/commit/d6fde929)"
        );
        assert_eq!(field(embed, "Branch").unwrap().value, "refs/heads/main");
        assert_eq!(
            field(embed, "Repository").unwrap().value,
            "[hello](https://github.com/octo/hello)"
        );
        assert_eq!(field(embed, "Repository Owner").unwrap().value, "octo");
        assert_eq!(field(embed, "Language").unwrap().value, "Rust");
    }

    #[test]
    fn empty_file_arrays_are_omitted() {
        let message = format_message("push", &push_payload());
        let embed = &message.embeds[0];
        assert_eq!(field(embed, "Files Added").unwrap().value, "a.txt, b.txt");
        assert!(field(embed, "Files Modified").is_none());
        assert!(field(embed, "Files Removed").is_none());
    }

    #[test]
    fn footer_prefers_repository_owner() {
        let message = format_message("push", &push_payload());
        let footer = message.embeds[0].footer.as_ref().unwrap();
        assert_eq!(footer.text, "Repository Owner: octo | Language: Rust");
    }

    #[test]
    fn footer_falls_back_to_organization() {
        let payload = json!({
            "action": "created",
            "organization": {
                "login": "acme",
                "avatar_url": "https://avatars.example/acme.png"
            }
        });
        let message = format_message("membership", &payload);
        let footer = message.embeds[0].footer.as_ref().unwrap();
        assert_eq!(footer.text, "Organization: acme");
    }

    #[test]
    fn organization_avatar_wins_thumbnail() {
        let mut payload = push_payload();
        payload["organization"] = json!({"avatar_url": "https://avatars.example/org.png"});
        let message = format_message("push", &payload);
        assert_eq!(
            message.embeds[0].thumbnail.as_ref().unwrap().url,
            "https://avatars.example/org.png"
        );
    }

    #[test]
    fn unknown_event_renders_details_json() {
        let payload = json!({"action": "bar", "sender": {"login": "alice"}});
        let message = format_message("foo", &payload);
        let embed = &message.embeds[0];

        assert_eq!(field(embed, "Event Type").unwrap().value, "foo");
        let details = &field(embed, "Details").unwrap().value;
        let inner = details
            .strip_prefix("```json\n")
            .and_then(|d| d.strip_suffix("\n```"))
            .unwrap();
        let parsed: Value = serde_json::from_str(inner).unwrap();
        assert_eq!(parsed["action"], "bar");
        assert_eq!(parsed["sender"], "alice");
    }

    #[test]
    fn meta_event_overrides_title() {
        let payload = json!({
            "action": "deleted",
            "hook_id": 123456,
            "hook": {"type": "Repository"},
            "organization": {"login": "acme"}
        });
        let message = format_message("meta", &payload);
        let embed = &message.embeds[0];
        assert_eq!(embed.title, "GitHub Webhook Management");
        assert_eq!(field(embed, "Hook ID").unwrap().value, "123456");
        assert_eq!(field(embed, "Organization").unwrap().value, "acme");
    }

    #[test]
    fn pull_request_event_has_branch_arrow() {
        let payload = json!({
            "action": "opened",
            "pull_request": {
                "title": "Add widget",
                "html_url": "https://github.com/octo/hello/pull/1",
                "user": {"login": "alice"},
                "head": {"ref": "feature"},
                "base": {"ref": "main"}
            },
            "repository": {"name": "hello", "html_url": "https://github.com/octo/hello"}
        });
        let message = format_message("pull_request", &payload);
        let embed = &message.embeds[0];
        assert_eq!(field(embed, "PR Branch").unwrap().value, "feature → main");
        assert_eq!(field(embed, "PR Author").unwrap().value, "alice");
    }

    #[test]
    fn oversize_document_collapses_to_two_fields() {
        let long = "x".repeat(2000);
        let payload = json!({
            "action": "oversized",
            "ref": long,
            "head_commit": {
                "id": "d6fde92930d4715a2b49857d24b940956b26d2d3",
                "message": long,
                "added": [long, long],
                "modified": [long, long],
                "removed": [long, long]
            },
            "repository": {
                "name": long,
                "html_url": "https://github.com/octo/hello",
                "owner": {"login": long}
            }
        });
        let message = format_message("push", &payload);
        let embed = &message.embeds[0];

        assert_eq!(embed.fields.len(), 2);
        assert_eq!(field(embed, "Event Type").unwrap().value, "push");
        assert_eq!(field(embed, "Action").unwrap().value, "oversized");
        assert!(embed.description.is_some());
        assert!(embed.total_chars() <= MAX_TOTAL_CHARS);
    }

    #[test]
    fn format_is_idempotent_modulo_timestamp() {
        let payload = push_payload();
        let strip = |m: DiscordMessage| {
            let mut v = serde_json::to_value(&m).unwrap();
            v["embeds"][0]
                .as_object_mut()
                .unwrap()
                .remove("timestamp");
            v
        };
        let a = strip(format_message("push", &payload));
        let b = strip(format_message("push", &payload));
        assert_eq!(a, b);
    }

    #[test]
    fn every_known_kind_formats_an_empty_payload() {
        for (kind, _) in EVENT_BUILDERS {
            let message = format_message(kind, &json!({}));
            let embed = &message.embeds[0];
            assert!(!embed.title.is_empty(), "empty title for {}", kind);
            assert!(
                embed.total_chars() <= MAX_TOTAL_CHARS,
                "over budget for {}",
                kind
            );
            assert!(embed.fields.len() <= MAX_FIELDS, "too many fields for {}", kind);
        }
    }

    #[test]
    fn field_values_are_truncated_to_budget() {
        let mut builder = EmbedBuilder::new("push", &json!({}));
        builder.add_field(&"n".repeat(500), &"v".repeat(5000), false);
        let f = &builder.embed.fields[0];
        assert_eq!(f.name.chars().count(), MAX_FIELD_NAME_LEN);
        assert_eq!(f.value.chars().count(), MAX_FIELD_VALUE_LEN);
    }

    #[test]
    fn field_count_is_capped() {
        let mut builder = EmbedBuilder::new("push", &json!({}));
        for i in 0..40 {
            builder.add_field(&format!("field-{}", i), "value", true);
        }
        assert_eq!(builder.embed.fields.len(), MAX_FIELDS);
    }

    #[test]
    fn fallback_and_error_messages_are_red_single_field() {
        for message in [fallback_message("push"), error_message("push")] {
            let embed = &message.embeds[0];
            assert_eq!(embed.color, COLOR_RED);
            assert_eq!(embed.fields.len(), 1);
            assert_eq!(embed.fields[0].name, "Event Type");
            assert_eq!(embed.fields[0].value, "push");
        }
    }
}
