//! Source adapters turning external exports into [`ImportItem`]s.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use walkdir::WalkDir;

use crate::error::{MembankError, Result};
use crate::types::{ImportItem, ImportSpec};

/// Produces items from an external source. Adapters never touch the store.
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    fn load(&self, spec: &ImportSpec) -> Result<Vec<ImportItem>>;
}

/// Every source the import pipeline knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportSource {
    Jsonl,
    /// Markdown vaults, including Obsidian.
    Markdown,
    Slack,
}

impl ImportSource {
    pub const ALL: [Self; 3] = [Self::Jsonl, Self::Markdown, Self::Slack];

    #[must_use]
    pub fn name(self) -> &'static str {
        self.adapter().name()
    }

    #[must_use]
    pub fn adapter(self) -> &'static dyn SourceAdapter {
        match self {
            Self::Jsonl => &JsonlAdapter,
            Self::Markdown => &MarkdownAdapter,
            Self::Slack => &SlackAdapter,
        }
    }
}

impl FromStr for ImportSource {
    type Err = MembankError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "jsonl" => Ok(Self::Jsonl),
            "markdown" | "obsidian" => Ok(Self::Markdown),
            "slack" => Ok(Self::Slack),
            _ => Err(MembankError::UnknownSource {
                name: raw.to_string(),
            }),
        }
    }
}

impl fmt::Display for ImportSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn required_path<'a>(spec: &'a ImportSpec, source: &str) -> Result<&'a Path> {
    spec.path.as_deref().ok_or_else(|| MembankError::InvalidInput {
        reason: format!("{source} import requires a path"),
    })
}

/// Directory sources must point at an existing directory.
fn required_dir<'a>(spec: &'a ImportSpec, source: &str) -> Result<&'a Path> {
    let root = required_path(spec, source)?;
    if !root.is_dir() {
        return Err(MembankError::InvalidInput {
            reason: format!("{source} import path {} is not a directory", root.display()),
        });
    }
    Ok(root)
}

fn walk_error(err: walkdir::Error) -> MembankError {
    MembankError::Io(err.into())
}

fn default_tags(spec: &ImportSpec, extra: Option<&str>) -> Option<Vec<String>> {
    let mut tags: Vec<String> = spec.default_tags.clone().unwrap_or_default();
    if let Some(extra) = extra.filter(|tag| !tag.is_empty()) {
        if !tags.iter().any(|tag| tag == extra) {
            tags.push(extra.to_string());
        }
    }
    if tags.is_empty() { None } else { Some(tags) }
}

fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// One JSON object per line in the [`ImportItem`] shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonlAdapter;

impl SourceAdapter for JsonlAdapter {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    fn load(&self, spec: &ImportSpec) -> Result<Vec<ImportItem>> {
        let path = required_path(spec, self.name())?;
        let text = fs_err::read_to_string(path)?;
        let mut items = Vec::new();

        for (lineno, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let mut item: ImportItem =
                serde_json::from_str(line).map_err(|err| MembankError::InvalidInput {
                    reason: format!("{}:{}: {err}", path.display(), lineno + 1),
                })?;
            if item.project.is_none() {
                item.project.clone_from(&spec.project);
            }
            if item.tags.is_none() {
                item.tags = default_tags(spec, spec.channel_tag.as_deref());
            }
            if item.external_source.is_none() {
                item.external_source = Some(self.name().to_string());
            }
            items.push(item);
        }

        tracing::debug!(path = %path.display(), items = items.len(), "loaded jsonl export");
        Ok(items)
    }
}

/// Every `.md` file under a directory, one item per file.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownAdapter;

fn markdown_title(text: &str) -> Option<String> {
    text.lines()
        .find_map(|line| line.trim_start().strip_prefix("# "))
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
}

fn markdown_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(walk_error)?;
        let is_markdown = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("md"));
        if entry.file_type().is_file() && is_markdown {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

impl SourceAdapter for MarkdownAdapter {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn load(&self, spec: &ImportSpec) -> Result<Vec<ImportItem>> {
        let root = required_dir(spec, self.name())?;
        let mut items = Vec::new();

        for file in markdown_files(root)? {
            let content = fs_err::read_to_string(&file)?;
            if content.trim().is_empty() {
                continue;
            }
            let rel_path = relative_path(root, &file);
            let modified = fs_err::metadata(&file)
                .and_then(|meta| meta.modified())
                .ok()
                .map(DateTime::<Utc>::from);

            let mut item = ImportItem::new(String::new());
            if let Some(title) = markdown_title(&content) {
                item.metadata = Some(BTreeMap::from([("title".to_string(), title)]));
            }
            item.content = content;
            item.kind = Some("note".to_string());
            item.project.clone_from(&spec.project);
            item.tags = default_tags(spec, spec.channel_tag.as_deref());
            item.external_source = Some(self.name().to_string());
            item.external_id = Some(rel_path.clone());
            item.rel_path = Some(rel_path);
            item.created_at_orig = modified;
            items.push(item);
        }

        tracing::debug!(root = %root.display(), items = items.len(), "loaded markdown vault");
        Ok(items)
    }
}

/// Slack workspace export: `<channel>/<YYYY-MM-DD>.json` arrays of messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlackAdapter;

#[derive(Debug, Deserialize)]
struct SlackMessage {
    ts: String,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    subtype: Option<String>,
}

/// Slack `ts` values are `<seconds>.<microseconds>`.
fn parse_slack_ts(ts: &str) -> Option<DateTime<Utc>> {
    let (secs, frac) = ts.split_once('.').unwrap_or((ts, "0"));
    let secs: i64 = secs.parse().ok()?;
    let micros: u32 = format!("{frac:0<6}").get(..6)?.parse().ok()?;
    DateTime::from_timestamp(secs, micros * 1_000)
}

impl SourceAdapter for SlackAdapter {
    fn name(&self) -> &'static str {
        "slack"
    }

    fn load(&self, spec: &ImportSpec) -> Result<Vec<ImportItem>> {
        let root = required_dir(spec, self.name())?;
        let mut items = Vec::new();

        let mut day_files = Vec::new();
        for entry in WalkDir::new(root).min_depth(2).max_depth(2).sort_by_file_name() {
            let entry = entry.map_err(walk_error)?;
            let is_json = entry.path().extension().is_some_and(|ext| ext == "json");
            if entry.file_type().is_file() && is_json {
                day_files.push(entry);
            }
        }

        for entry in day_files {
            let Some(channel) = entry
                .path()
                .parent()
                .and_then(Path::file_name)
                .map(|name| name.to_string_lossy().into_owned())
            else {
                continue;
            };
            let text = fs_err::read_to_string(entry.path())?;
            let messages: Vec<SlackMessage> =
                serde_json::from_str(&text).map_err(|err| MembankError::InvalidInput {
                    reason: format!("{}: {err}", entry.path().display()),
                })?;

            let channel_tag = spec.channel_tag.as_deref().unwrap_or(&channel);
            for message in messages {
                // Joins, leaves, and other system events carry no memory content.
                let system_event = message
                    .subtype
                    .as_deref()
                    .is_some_and(|s| s.ends_with("_join") || s.ends_with("_leave"));
                if system_event {
                    continue;
                }
                let Some(content) = message.text.filter(|text| !text.trim().is_empty()) else {
                    continue;
                };

                let mut item = ImportItem::new(content);
                item.kind = Some("message".to_string());
                item.project.clone_from(&spec.project);
                item.tags = default_tags(spec, Some(channel_tag));
                item.external_source = Some(self.name().to_string());
                item.external_id = Some(format!("{channel}:{}", message.ts));
                item.author = message.user;
                item.created_at_orig = parse_slack_ts(&message.ts);
                item.metadata = Some(BTreeMap::from([("channel".to_string(), channel.clone())]));
                items.push(item);
            }
        }

        tracing::debug!(root = %root.display(), items = items.len(), "loaded slack export");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_names_parse() {
        assert_eq!("jsonl".parse::<ImportSource>().unwrap(), ImportSource::Jsonl);
        assert_eq!("Obsidian".parse::<ImportSource>().unwrap(), ImportSource::Markdown);
        assert_eq!(" slack ".parse::<ImportSource>().unwrap(), ImportSource::Slack);
        for source in ImportSource::ALL {
            assert_eq!(source.name().parse::<ImportSource>().unwrap(), source);
        }
    }

    #[test]
    fn unknown_source_is_bad_input() {
        let err = "notion".parse::<ImportSource>().unwrap_err();
        assert!(matches!(err, MembankError::UnknownSource { ref name } if name == "notion"));
        assert!(err.is_bad_input());
    }

    #[test]
    fn slack_timestamps_keep_microseconds() {
        let ts = parse_slack_ts("1700000000.000100").unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert_eq!(ts.timestamp_subsec_micros(), 100);
        assert_eq!(parse_slack_ts("1700000000").unwrap().timestamp(), 1_700_000_000);
        assert!(parse_slack_ts("yesterday").is_none());
    }

    #[test]
    fn markdown_title_is_first_heading() {
        assert_eq!(
            markdown_title("intro\n# Weekly sync\n## Notes"),
            Some("Weekly sync".to_string())
        );
        assert_eq!(markdown_title("no heading"), None);
    }

    #[test]
    fn default_tags_do_not_duplicate_channel() {
        let spec = ImportSpec::new("slack").default_tags(["team", "general"]);
        assert_eq!(
            default_tags(&spec, Some("general")),
            Some(vec!["team".to_string(), "general".to_string()])
        );
        assert_eq!(default_tags(&ImportSpec::new("slack"), None), None);
    }

    #[test]
    fn missing_path_is_bad_input() {
        let err = JsonlAdapter.load(&ImportSpec::new("jsonl")).unwrap_err();
        assert!(err.is_bad_input());
    }
}
