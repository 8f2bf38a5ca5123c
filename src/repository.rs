use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::content_type;
use crate::ids::{IdGenerator, RandomHexIds};
use crate::pagination::{Page, PageRequest, paginate};
use crate::stats::{StatsAggregator, StatsEvent, StoreStatistics};
use crate::validation::{FieldError, MAX_CONTENT_CHARS, ScriptInput, ScriptValidator};

/// Default number of id candidates tried before giving up on a create.
pub const DEFAULT_MAX_ID_ATTEMPTS: usize = 16;

/// Defines the types of repository errors that can occur
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Script not found: {0}")]
    NotFound(String),
    #[error("Not the owner of script {0}")]
    Forbidden(String),
    #[error("Validation failed: {}", join_errors(.0))]
    ValidationFailed(Vec<FieldError>),
    #[error("No unique script id found after {attempts} attempts")]
    IdSpaceExhausted { attempts: usize },
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Who may read raw content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawAccess {
    /// Anyone holding the id.
    #[default]
    Public,
    /// Only a viewer whose identity matches the owner. Everyone else gets
    /// the same answer as for an unknown id.
    OwnerOnly,
}

/// A stored script and its metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRecord {
    pub id: String,
    pub content: String,
    pub owner: String,
    pub filename: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub last_modified_at: Option<DateTime<Utc>>,
    pub view_count: u64,
    pub last_viewed_at: Option<DateTime<Utc>>,
}

impl ScriptRecord {
    fn mark_viewed(&mut self) {
        self.view_count += 1;
        self.last_viewed_at = Some(Utc::now());
    }
}

/// Caller-facing links for a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptUrls {
    pub raw: String,
    pub view: String,
    pub edit: String,
}

impl ScriptUrls {
    pub fn for_script(id: &str, owner: &str) -> Self {
        let owner_query = serde_urlencoded::to_string([("owner", owner)]).unwrap_or_default();
        Self {
            raw: raw_url(id),
            view: format!("/view/{}", id),
            edit: format!("/edit/{}?{}", id, owner_query),
        }
    }
}

pub fn raw_url(id: &str) -> String {
    format!("/raw/{}", id)
}

/// Result of a successful create.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedScript {
    #[serde(flatten)]
    pub record: ScriptRecord,
    pub urls: ScriptUrls,
}

/// Metadata-only projection used by listings and the view route.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptSummary {
    pub id: String,
    pub filename: String,
    pub description: String,
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub view_count: u64,
    pub last_viewed_at: Option<DateTime<Utc>>,
    /// Content length in characters.
    pub size: usize,
    /// Number of `\n`-delimited segments.
    pub lines: usize,
    pub raw_url: String,
}

impl From<&ScriptRecord> for ScriptSummary {
    fn from(record: &ScriptRecord) -> Self {
        Self {
            id: record.id.clone(),
            filename: record.filename.clone(),
            description: record.description.clone(),
            owner: record.owner.clone(),
            created_at: record.created_at,
            view_count: record.view_count,
            last_viewed_at: record.last_viewed_at,
            size: record.content.chars().count(),
            lines: record.content.split('\n').count(),
            raw_url: raw_url(&record.id),
        }
    }
}

/// Content served by the raw route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawContent {
    pub content: String,
    pub content_type: &'static str,
}

/// Fields an owner may change. Blank `filename`/`description` keep the old value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptChanges<'a> {
    pub content: Option<&'a str>,
    pub filename: Option<&'a str>,
    pub description: Option<&'a str>,
}

#[derive(Debug, Clone, Copy)]
pub struct RepositoryOptions {
    pub max_content_chars: usize,
    pub max_id_attempts: usize,
    pub raw_access: RawAccess,
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        Self {
            max_content_chars: MAX_CONTENT_CHARS,
            max_id_attempts: DEFAULT_MAX_ID_ATTEMPTS,
            raw_access: RawAccess::Public,
        }
    }
}

/// In-memory script store.
///
/// Methods take `&mut self` and run to completion, so a single owner (or a
/// mutex around the whole repository) makes every operation atomic,
/// including the id uniqueness check and the insert that follows it.
pub struct ScriptRepository {
    /// Insertion-ordered so listings with equal timestamps stay stable.
    scripts: IndexMap<String, ScriptRecord>,
    stats: StatsAggregator,
    validator: ScriptValidator,
    ids: Box<dyn IdGenerator + Send>,
    max_id_attempts: usize,
    raw_access: RawAccess,
}

impl std::fmt::Debug for ScriptRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptRepository")
            .field("scripts", &self.scripts.len())
            .field("stats", &self.stats.snapshot())
            .field("raw_access", &self.raw_access)
            .finish()
    }
}

impl Default for ScriptRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptRepository {
    pub fn new() -> Self {
        Self::with_options(RepositoryOptions::default(), RandomHexIds::default())
    }

    pub fn with_options(options: RepositoryOptions, ids: impl IdGenerator + Send + 'static) -> Self {
        Self {
            scripts: IndexMap::new(),
            stats: StatsAggregator::new(),
            validator: ScriptValidator::new(options.max_content_chars),
            ids: Box::new(ids),
            max_id_attempts: options.max_id_attempts,
            raw_access: options.raw_access,
        }
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.scripts.contains_key(id)
    }

    pub fn stats(&self) -> StoreStatistics {
        self.stats.snapshot()
    }

    /// Validate and store a new script under a freshly generated id.
    pub fn create(&mut self, input: ScriptInput<'_>) -> Result<CreatedScript, RepositoryError> {
        let errors = self.validator.validate(&input);
        if !errors.is_empty() {
            debug!("Rejected script submission: {}", join_errors(&errors));
            return Err(RepositoryError::ValidationFailed(errors));
        }

        let id = self.allocate_id()?;
        let owner = input.owner.unwrap_or_default().trim().to_string();
        let record = ScriptRecord {
            content: input.content.unwrap_or_default().trim().to_string(),
            filename: non_blank(input.filename).unwrap_or_else(|| format!("script_{}", id)),
            description: non_blank(input.description).unwrap_or_default(),
            owner,
            created_at: Utc::now(),
            last_modified_at: None,
            view_count: 0,
            last_viewed_at: None,
            id: id.clone(),
        };

        let urls = ScriptUrls::for_script(&record.id, &record.owner);
        self.scripts.insert(id.clone(), record.clone());
        self.stats.record(StatsEvent::Created);

        info!("Created script {} ({}) for {}", id, record.filename, record.owner);
        Ok(CreatedScript { record, urls })
    }

    /// Content with its inferred media type. Counts as a view.
    pub fn get_raw(
        &mut self,
        id: &str,
        viewer: Option<&str>,
    ) -> Result<RawContent, RepositoryError> {
        let record = self
            .scripts
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;

        if self.raw_access == RawAccess::OwnerOnly
            && viewer.map(str::trim) != Some(record.owner.as_str())
        {
            debug!("Raw access to {} refused for viewer {:?}", id, viewer);
            return Err(RepositoryError::NotFound(id.to_string()));
        }

        record.mark_viewed();
        self.stats.record(StatsEvent::Viewed);

        Ok(RawContent {
            content: record.content.clone(),
            content_type: content_type::resolve(Some(&record.filename)),
        })
    }

    /// Metadata projection. Counts as a view, same as raw access.
    pub fn get_metadata(&mut self, id: &str) -> Result<ScriptSummary, RepositoryError> {
        let record = self
            .scripts
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;

        record.mark_viewed();
        self.stats.record(StatsEvent::Viewed);

        Ok(ScriptSummary::from(&*record))
    }

    /// Full record for the owner's editor. Not counted as a view.
    pub fn get_for_edit(&self, id: &str, requester: &str) -> Result<ScriptRecord, RepositoryError> {
        let record = self.owned(id, requester)?;
        Ok(record.clone())
    }

    pub fn update(
        &mut self,
        id: &str,
        requester: &str,
        changes: ScriptChanges<'_>,
    ) -> Result<ScriptRecord, RepositoryError> {
        self.owned(id, requester)?;

        let errors = self.validator.validate(&ScriptInput {
            content: changes.content,
            owner: Some(requester),
            filename: changes.filename,
            description: changes.description,
        });
        if !errors.is_empty() {
            debug!("Rejected update of {}: {}", id, join_errors(&errors));
            return Err(RepositoryError::ValidationFailed(errors));
        }

        let record = self
            .scripts
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;

        record.content = changes.content.unwrap_or_default().trim().to_string();
        if let Some(filename) = non_blank(changes.filename) {
            record.filename = filename;
        }
        if let Some(description) = non_blank(changes.description) {
            record.description = description;
        }
        record.last_modified_at = Some(Utc::now());

        debug!("Updated script {}", id);
        Ok(record.clone())
    }

    pub fn delete(&mut self, id: &str, requester: &str) -> Result<(), RepositoryError> {
        self.owned(id, requester)?;

        self.scripts.shift_remove(id);
        let totals = self.stats.totals_mut();
        totals.total_scripts = totals.total_scripts.saturating_sub(1);

        info!("Deleted script {}", id);
        Ok(())
    }

    /// Summaries of every record, newest first, windowed by `request`.
    pub fn list(&self, request: PageRequest) -> Page<ScriptSummary> {
        // Reverse insertion order first so that equal timestamps list the later insert first.
        let mut records: Vec<&ScriptRecord> = self.scripts.values().rev().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let summaries = records.into_iter().map(ScriptSummary::from).collect();
        paginate(summaries, request)
    }

    fn owned(&self, id: &str, requester: &str) -> Result<&ScriptRecord, RepositoryError> {
        let record = self
            .scripts
            .get(id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;

        if record.owner != requester.trim() {
            warn!("Refused access to script {} for non-owner {:?}", id, requester);
            return Err(RepositoryError::Forbidden(id.to_string()));
        }

        Ok(record)
    }

    fn allocate_id(&self) -> Result<String, RepositoryError> {
        for attempt in 1..=self.max_id_attempts {
            let candidate = self.ids.generate();
            if !self.scripts.contains_key(&candidate) {
                return Ok(candidate);
            }
            debug!("Script id collision on attempt {}: {}", attempt, candidate);
        }

        Err(RepositoryError::IdSpaceExhausted {
            attempts: self.max_id_attempts,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::MockIdGenerator;
    use crate::validation::ValidationErrorKind;

    fn input<'a>(content: &'a str, owner: &'a str) -> ScriptInput<'a> {
        ScriptInput {
            content: Some(content),
            owner: Some(owner),
            ..Default::default()
        }
    }

    fn changes(content: &str) -> ScriptChanges<'_> {
        ScriptChanges {
            content: Some(content),
            ..Default::default()
        }
    }

    fn sequence_ids(ids: &'static [&'static str]) -> MockIdGenerator {
        let mut mock = MockIdGenerator::new();
        let mut next = 0;
        mock.expect_generate().returning(move || {
            let id = ids[next.min(ids.len() - 1)];
            next += 1;
            id.to_string()
        });
        mock
    }

    #[test]
    fn test_create_stores_trimmed_record() {
        let mut repo = ScriptRepository::new();
        let created = repo
            .create(ScriptInput {
                content: Some("  print(1)\n"),
                owner: Some(" alice "),
                filename: Some("a.py"),
                description: None,
            })
            .unwrap();

        let record = &created.record;
        assert!(repo.contains(&record.id));
        assert_eq!(record.content, "print(1)");
        assert_eq!(record.owner, "alice");
        assert_eq!(record.filename, "a.py");
        assert_eq!(record.description, "");
        assert_eq!(record.view_count, 0);
        assert!(record.last_modified_at.is_none());
        assert!(record.last_viewed_at.is_none());

        assert_eq!(created.urls.raw, format!("/raw/{}", record.id));
        assert_eq!(created.urls.view, format!("/view/{}", record.id));
        assert_eq!(created.urls.edit, format!("/edit/{}?owner=alice", record.id));
    }

    #[test]
    fn test_create_defaults_filename() {
        let mut repo = ScriptRepository::new();
        let created = repo
            .create(ScriptInput {
                filename: Some("   "),
                ..input("x", "bob")
            })
            .unwrap();
        assert_eq!(created.record.filename, format!("script_{}", created.record.id));
    }

    #[test]
    fn test_create_validation_failure_leaves_store_untouched() {
        let mut repo = ScriptRepository::new();
        let err = repo.create(input(" ", "")).unwrap_err();

        match err {
            RepositoryError::ValidationFailed(errors) => {
                assert_eq!(
                    errors,
                    vec![FieldError::missing("content"), FieldError::missing("owner")]
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(repo.is_empty());
        assert_eq!(repo.stats(), StoreStatistics::default());
    }

    #[test]
    fn test_identical_creations_get_distinct_ids() {
        let mut repo = ScriptRepository::new();
        let a = repo.create(input("same", "alice")).unwrap();
        let b = repo.create(input("same", "alice")).unwrap();
        assert_ne!(a.record.id, b.record.id);
        assert_eq!(repo.len(), 2);
    }

    #[test]
    fn test_id_collision_is_retried() {
        let mut repo = ScriptRepository::with_options(
            RepositoryOptions::default(),
            sequence_ids(&["aaaaaaaaaaaa", "aaaaaaaaaaaa", "bbbbbbbbbbbb"]),
        );

        let first = repo.create(input("one", "alice")).unwrap();
        let second = repo.create(input("two", "alice")).unwrap();
        assert_eq!(first.record.id, "aaaaaaaaaaaa");
        assert_eq!(second.record.id, "bbbbbbbbbbbb");
    }

    #[test]
    fn test_id_exhaustion_fails_without_inserting() {
        let mut mock = MockIdGenerator::new();
        mock.expect_generate()
            .times(1 + 3)
            .returning(|| "cccccccccccc".to_string());

        let options = RepositoryOptions {
            max_id_attempts: 3,
            ..Default::default()
        };
        let mut repo = ScriptRepository::with_options(options, mock);

        repo.create(input("one", "alice")).unwrap();
        let err = repo.create(input("two", "alice")).unwrap_err();
        assert!(matches!(err, RepositoryError::IdSpaceExhausted { attempts: 3 }));
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.stats().total_scripts, 1);
    }

    #[test]
    fn test_get_raw_counts_views_and_resolves_type() {
        let mut repo = ScriptRepository::new();
        let id = repo
            .create(ScriptInput {
                filename: Some("a.py"),
                ..input("print(1)", "alice")
            })
            .unwrap()
            .record
            .id;

        let raw = repo.get_raw(&id, None).unwrap();
        assert_eq!(raw.content, "print(1)");
        assert_eq!(raw.content_type, "text/plain");

        repo.get_raw(&id, Some("someone-else")).unwrap();
        let record = repo.get_for_edit(&id, "alice").unwrap();
        assert_eq!(record.view_count, 2);
        assert!(record.last_viewed_at.is_some());
        assert_eq!(repo.stats().total_views, 2);
    }

    #[test]
    fn test_get_raw_html_content_type() {
        let mut repo = ScriptRepository::new();
        let id = repo
            .create(ScriptInput {
                filename: Some("Page.HTML"),
                ..input("<p>hi</p>", "alice")
            })
            .unwrap()
            .record
            .id;
        assert_eq!(repo.get_raw(&id, None).unwrap().content_type, "text/html");
    }

    #[test]
    fn test_get_raw_unknown_id() {
        let mut repo = ScriptRepository::new();
        assert!(matches!(
            repo.get_raw("nope", None),
            Err(RepositoryError::NotFound(id)) if id == "nope"
        ));
        assert_eq!(repo.stats().total_views, 0);
    }

    #[test]
    fn test_owner_only_raw_access() {
        let options = RepositoryOptions {
            raw_access: RawAccess::OwnerOnly,
            ..Default::default()
        };
        let mut repo = ScriptRepository::with_options(options, RandomHexIds::default());
        let id = repo.create(input("secret", "alice")).unwrap().record.id;

        assert!(matches!(
            repo.get_raw(&id, Some("mallory")),
            Err(RepositoryError::NotFound(_))
        ));
        assert!(matches!(repo.get_raw(&id, None), Err(RepositoryError::NotFound(_))));
        assert_eq!(repo.stats().total_views, 0);

        assert_eq!(repo.get_raw(&id, Some("alice")).unwrap().content, "secret");
        assert_eq!(repo.stats().total_views, 1);
    }

    #[test]
    fn test_get_metadata_summary() {
        let mut repo = ScriptRepository::new();
        let id = repo
            .create(ScriptInput {
                filename: Some("multi.txt"),
                description: Some("three lines"),
                ..input("a\nbb\nccc", "alice")
            })
            .unwrap()
            .record
            .id;

        let summary = repo.get_metadata(&id).unwrap();
        assert_eq!(summary.filename, "multi.txt");
        assert_eq!(summary.description, "three lines");
        assert_eq!(summary.owner, "alice");
        assert_eq!(summary.size, 8);
        assert_eq!(summary.lines, 3);
        assert_eq!(summary.view_count, 1);
        assert!(summary.last_viewed_at.is_some());
        assert_eq!(summary.raw_url, format!("/raw/{}", id));
        assert_eq!(repo.stats().total_views, 1);

        assert!(matches!(
            repo.get_metadata("missing"),
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[test]
    fn test_get_for_edit_checks_owner_and_not_counted() {
        let mut repo = ScriptRepository::new();
        let id = repo.create(input("x", "alice")).unwrap().record.id;

        assert!(matches!(
            repo.get_for_edit(&id, "bob"),
            Err(RepositoryError::Forbidden(_))
        ));
        assert!(matches!(
            repo.get_for_edit("missing", "alice"),
            Err(RepositoryError::NotFound(_))
        ));

        let record = repo.get_for_edit(&id, "alice").unwrap();
        assert_eq!(record.view_count, 0);
        assert_eq!(repo.stats().total_views, 0);
    }

    #[test]
    fn test_update_by_owner() {
        let mut repo = ScriptRepository::new();
        let original = repo
            .create(ScriptInput {
                filename: Some("old.js"),
                description: Some("old"),
                ..input("v1", "alice")
            })
            .unwrap()
            .record;
        repo.get_raw(&original.id, None).unwrap();

        let updated = repo
            .update(
                &original.id,
                "alice",
                ScriptChanges {
                    content: Some("  v2  "),
                    filename: Some("new.json"),
                    description: Some("new"),
                },
            )
            .unwrap();

        assert_eq!(updated.content, "v2");
        assert_eq!(updated.filename, "new.json");
        assert_eq!(updated.description, "new");
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.owner, original.owner);
        assert_eq!(updated.created_at, original.created_at);
        assert_eq!(updated.view_count, 1);
        assert!(updated.last_modified_at.is_some());
    }

    #[test]
    fn test_update_blank_optional_fields_keep_previous() {
        let mut repo = ScriptRepository::new();
        let id = repo
            .create(ScriptInput {
                filename: Some("keep.css"),
                description: Some("keep me"),
                ..input("v1", "alice")
            })
            .unwrap()
            .record
            .id;

        let updated = repo
            .update(
                &id,
                "alice",
                ScriptChanges {
                    content: Some("v2"),
                    filename: Some(""),
                    description: None,
                },
            )
            .unwrap();
        assert_eq!(updated.filename, "keep.css");
        assert_eq!(updated.description, "keep me");
    }

    #[test]
    fn test_update_by_non_owner_is_forbidden() {
        let mut repo = ScriptRepository::new();
        let id = repo.create(input("v1", "alice")).unwrap().record.id;

        let err = repo.update(&id, "bob", changes("hacked")).unwrap_err();
        assert!(matches!(err, RepositoryError::Forbidden(_)));

        let record = repo.get_for_edit(&id, "alice").unwrap();
        assert_eq!(record.content, "v1");
        assert!(record.last_modified_at.is_none());
    }

    #[test]
    fn test_update_error_precedence() {
        let mut repo = ScriptRepository::new();
        let id = repo.create(input("v1", "alice")).unwrap().record.id;

        assert!(matches!(
            repo.update("missing", "alice", changes("")),
            Err(RepositoryError::NotFound(_))
        ));
        assert!(matches!(
            repo.update(&id, "bob", changes("")),
            Err(RepositoryError::Forbidden(_))
        ));

        let too_big = "x".repeat(MAX_CONTENT_CHARS + 1);
        match repo.update(&id, "alice", changes(&too_big)) {
            Err(RepositoryError::ValidationFailed(errors)) => {
                assert_eq!(errors.len(), 1);
                assert!(matches!(errors[0].kind, ValidationErrorKind::TooLarge { .. }));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(repo.get_for_edit(&id, "alice").unwrap().content, "v1");
    }

    #[test]
    fn test_delete_by_owner() {
        let mut repo = ScriptRepository::new();
        let id = repo.create(input("bye", "alice")).unwrap().record.id;

        repo.delete(&id, " alice ").unwrap();
        assert!(!repo.contains(&id));
        assert!(matches!(repo.get_raw(&id, None), Err(RepositoryError::NotFound(_))));
        assert!(matches!(repo.delete(&id, "alice"), Err(RepositoryError::NotFound(_))));

        let stats = repo.stats();
        assert_eq!(stats.total_scripts, 0);
        assert_eq!(stats.created_today, 1);
    }

    #[test]
    fn test_delete_by_non_owner_keeps_record() {
        let mut repo = ScriptRepository::new();
        let id = repo.create(input("stay", "alice")).unwrap().record.id;

        assert!(matches!(repo.delete(&id, "bob"), Err(RepositoryError::Forbidden(_))));
        assert_eq!(repo.get_raw(&id, None).unwrap().content, "stay");
        assert_eq!(repo.stats().total_scripts, 1);
    }

    #[test]
    fn test_list_newest_first_with_total() {
        let mut repo = ScriptRepository::new();
        let mut ids = Vec::new();
        for n in 0..5 {
            let created = repo.create(input(&format!("script {n}"), "alice")).unwrap();
            ids.push(created.record.id);
        }

        let page = repo.list(PageRequest { page: 1, limit: 2 });
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].id, ids[4]);
        assert_eq!(page.items[1].id, ids[3]);

        let all = repo.list(PageRequest { page: 1, limit: 10 });
        let listed: Vec<&str> = all.items.iter().map(|s| s.id.as_str()).collect();
        let expected: Vec<&str> = ids.iter().rev().map(String::as_str).collect();
        assert_eq!(listed, expected);
        assert!(
            all.items
                .windows(2)
                .all(|w| w[0].created_at >= w[1].created_at)
        );

        let last = repo.list(PageRequest { page: 3, limit: 2 });
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].id, ids[0]);
        assert_eq!(last.total, 5);
    }

    #[test]
    fn test_list_does_not_count_views() {
        let mut repo = ScriptRepository::new();
        repo.create(input("x", "alice")).unwrap();
        let page = repo.list(PageRequest { page: 1, limit: 10 });
        assert_eq!(page.items[0].view_count, 0);
        assert_eq!(repo.stats().total_views, 0);
    }

    #[test]
    fn test_error_display() {
        let err = RepositoryError::ValidationFailed(vec![
            FieldError::missing("content"),
            FieldError::missing("owner"),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: content is required, owner is required"
        );
    }
}
