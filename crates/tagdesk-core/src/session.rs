//! The tag edit session.
//!
//! A session loads the project's catalog, tracks at most one selected work
//! item, keeps an unsaved [`TagSet`] plus a draft tag for that selection, and
//! writes the set back as a single `System.Tags` replacement on save.
//!
//! ```text
//! Uninitialized -> Loading -> Ready <-> Saving
//!                     |         ^         |
//!                     v         |         v
//!                 LoadFailed ---+     SaveFailed
//! ```
//!
//! The session is pure state: rendering layers subscribe to [`SessionEvent`]s
//! and dispatch user intents as method calls. Host and store capabilities are
//! injected at construction.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, load_catalog, resolve_project};
use crate::error::SessionError;
use crate::host::{HostEnvironment, PANEL_SIZE, ProjectName};
use crate::model::{Field, TagSet, WorkItem, WorkItemId};
use crate::store::{PatchOperation, WorkItemStore};

/// Notice shown when the user asks to cancel pending edits.
pub const CANCEL_NOTICE: &str = "Cancel not possible";

static NO_TAGS: TagSet = TagSet::new();

/// Where the session is in its load/save cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Loading,
    Ready,
    Saving,
    LoadFailed(SessionError),
    SaveFailed(SessionError),
}

impl SessionPhase {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Saving => "saving",
            Self::LoadFailed(_) => "load failed",
            Self::SaveFailed(_) => "save failed",
        }
    }

    /// The failure retained for display, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&SessionError> {
        match self {
            Self::LoadFailed(err) | Self::SaveFailed(err) => Some(err),
            _ => None,
        }
    }

    /// A remote call is in flight.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::Loading | Self::Saving)
    }

    /// Selection and tag edits are allowed.
    #[must_use]
    pub const fn accepts_edits(&self) -> bool {
        matches!(self, Self::Ready | Self::SaveFailed(_))
    }
}

/// Editing state that exists only while a row is selected.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TagEdit {
    selected: WorkItemId,
    pending: TagSet,
    draft: String,
}

/// State transitions published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PhaseChanged(SessionPhase),
    CatalogReplaced { len: usize },
    SelectionChanged(Option<WorkItemId>),
    PendingTagsChanged(TagSet),
    DraftChanged(String),
    Notice(String),
}

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveOutcome {
    pub id: WorkItemId,
    /// The tag string written to the store.
    pub tags: String,
    /// Whether the follow-up catalog reload succeeded.
    pub reloaded: bool,
}

type Listener = Box<dyn FnMut(&SessionEvent)>;

/// One activation of the tag editing panel.
pub struct TagEditSession<H, S> {
    host: H,
    store: S,
    phase: SessionPhase,
    catalog: Catalog,
    edit: Option<TagEdit>,
    project: Option<ProjectName>,
    resized: bool,
    listeners: Vec<Listener>,
}

impl<H: HostEnvironment, S: WorkItemStore> TagEditSession<H, S> {
    pub fn new(host: H, store: S) -> Self {
        Self {
            host,
            store,
            phase: SessionPhase::Uninitialized,
            catalog: Catalog::default(),
            edit: None,
            project: None,
            resized: false,
            listeners: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Observation
    // -----------------------------------------------------------------------

    /// Register a callback for every subsequent transition.
    pub fn subscribe(&mut self, listener: impl FnMut(&SessionEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    #[must_use]
    pub const fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn selection(&self) -> Option<WorkItemId> {
        self.edit.as_ref().map(|edit| edit.selected)
    }

    #[must_use]
    pub fn selected_item(&self) -> Option<&WorkItem> {
        self.selection().and_then(|id| self.catalog.get(id))
    }

    /// Pending tags for the selection; empty when nothing is selected.
    #[must_use]
    pub fn pending_tags(&self) -> &TagSet {
        self.edit.as_ref().map_or(&NO_TAGS, |edit| &edit.pending)
    }

    /// Draft tag text; empty when nothing is selected.
    #[must_use]
    pub fn draft_input(&self) -> &str {
        self.edit.as_ref().map_or("", |edit| edit.draft.as_str())
    }

    /// Project resolved by the last successful initialization.
    #[must_use]
    pub const fn project(&self) -> Option<&ProjectName> {
        self.project.as_ref()
    }

    #[must_use]
    pub const fn host(&self) -> &H {
        &self.host
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Resolve the project and load the catalog.
    ///
    /// On success the session is `Ready` with no selection. On failure it is
    /// `LoadFailed` and may be retried by calling `initialize` again.
    ///
    /// # Errors
    ///
    /// Returns the load failure, or [`SessionError::InvalidOperation`] if a
    /// load or save is already in flight.
    pub fn initialize(&mut self) -> Result<(), SessionError> {
        self.ensure_idle("initialize")?;
        self.set_phase(SessionPhase::Loading);

        let loaded = resolve_project(&self.host).and_then(|project| {
            let catalog = load_catalog(&self.store, &project)?;
            Ok((project, catalog))
        });

        match loaded {
            Ok((project, catalog)) => {
                info!(project = %project, items = catalog.len(), "session initialized");
                self.project = Some(project);
                self.clear_edit();
                self.replace_catalog(catalog);
                self.finish_load();
                Ok(())
            }
            Err(err) => {
                warn!(code = %err.code(), "failed to load work items: {err}");
                self.set_phase(SessionPhase::LoadFailed(err.clone()));
                Err(err)
            }
        }
    }

    /// Select a catalog row and seed the pending tags from its stored tags.
    ///
    /// Any previous selection's pending tags and draft are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidOperation`] outside `Ready`/`SaveFailed`
    /// and [`SessionError::ItemNotInCatalog`] for an unknown id.
    pub fn select_row(&mut self, id: WorkItemId) -> Result<(), SessionError> {
        self.ensure_editable("select a work item")?;
        let item = self
            .catalog
            .get(id)
            .ok_or(SessionError::ItemNotInCatalog { id })?;

        let pending = item.tag_set();
        debug!(id = %id, tags = pending.len(), "row selected");
        // A fresh selection discards the edit the failed save belonged to.
        if matches!(self.phase, SessionPhase::SaveFailed(_)) {
            self.set_phase(SessionPhase::Ready);
        }
        self.edit = Some(TagEdit {
            selected: id,
            pending: pending.clone(),
            draft: String::new(),
        });
        self.emit(&SessionEvent::SelectionChanged(Some(id)));
        self.emit(&SessionEvent::PendingTagsChanged(pending));
        self.emit(&SessionEvent::DraftChanged(String::new()));
        Ok(())
    }

    /// Replace the draft tag text. Ignored when no row is selected.
    ///
    /// Returns whether the draft was updated.
    pub fn set_draft_input(&mut self, text: impl Into<String>) -> bool {
        if !self.phase.accepts_edits() {
            return false;
        }
        let Some(edit) = self.edit.as_mut() else {
            debug!("draft input ignored: no work item selected");
            return false;
        };
        edit.draft = text.into();
        let draft = edit.draft.clone();
        self.emit(&SessionEvent::DraftChanged(draft));
        true
    }

    /// Move the draft into the pending tags and clear it.
    ///
    /// A no-op when the draft is empty or already a pending tag. Returns
    /// whether a tag was added.
    pub fn add_draft_tag(&mut self) -> bool {
        if !self.phase.accepts_edits() {
            return false;
        }
        let Some(edit) = self.edit.as_mut() else {
            return false;
        };
        if edit.draft.is_empty() || edit.pending.contains(&edit.draft) {
            return false;
        }

        let tag = std::mem::take(&mut edit.draft);
        edit.pending.insert(tag);
        let pending = edit.pending.clone();
        self.emit(&SessionEvent::PendingTagsChanged(pending));
        self.emit(&SessionEvent::DraftChanged(String::new()));
        true
    }

    /// Remove a pending tag by exact match. Returns whether it was present.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        if !self.phase.accepts_edits() {
            return false;
        }
        let Some(edit) = self.edit.as_mut() else {
            return false;
        };
        if !edit.pending.remove(tag) {
            return false;
        }
        let pending = edit.pending.clone();
        self.emit(&SessionEvent::PendingTagsChanged(pending));
        true
    }

    /// Write the pending tags to the selected item, replacing its tag field.
    ///
    /// On success the selection is cleared and the catalog reloaded from the
    /// last resolved project; a failed reload leaves the session `LoadFailed`
    /// but the save still succeeds. On failure the session is `SaveFailed`
    /// with selection, pending tags, and draft untouched.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidOperation`] without a selection or in
    /// the wrong phase, and [`SessionError::Update`] if the store fails.
    pub fn save(&mut self) -> Result<SaveOutcome, SessionError> {
        self.ensure_editable("save")?;
        let Some(edit) = self.edit.as_ref() else {
            return Err(SessionError::InvalidOperation {
                operation: "save",
                state: "no work item is selected",
            });
        };

        let id = edit.selected;
        let tags = edit.pending.join();
        self.set_phase(SessionPhase::Saving);

        let patch = [PatchOperation::replace_field(Field::Tags, tags.clone())];
        match self.store.update_work_item(&patch, id) {
            Ok(_) => {
                info!(id = %id, tags = %tags, "tags saved");
                self.clear_edit();
                let reloaded = self.reload();
                Ok(SaveOutcome { id, tags, reloaded })
            }
            Err(err) => {
                let err = SessionError::Update {
                    id,
                    message: format!("{err:#}"),
                };
                warn!(code = %err.code(), "{err}");
                self.set_phase(SessionPhase::SaveFailed(err.clone()));
                Err(err)
            }
        }
    }

    /// Discarding pending edits is not supported; publishes a notice only.
    pub fn cancel(&mut self) -> &'static str {
        info!("cancel requested; pending edits are kept");
        self.emit(&SessionEvent::Notice(CANCEL_NOTICE.to_string()));
        CANCEL_NOTICE
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn reload(&mut self) -> bool {
        self.set_phase(SessionPhase::Loading);
        let result = match self.project.clone() {
            Some(project) => load_catalog(&self.store, &project),
            None => Err(SessionError::NoProjectContext),
        };

        match result {
            Ok(catalog) => {
                self.replace_catalog(catalog);
                self.finish_load();
                true
            }
            Err(err) => {
                warn!(code = %err.code(), "catalog reload after save failed: {err}");
                self.set_phase(SessionPhase::LoadFailed(err));
                false
            }
        }
    }

    fn finish_load(&mut self) {
        self.set_phase(SessionPhase::Ready);
        self.host.notify_load_succeeded();
        if !self.resized {
            self.host.resize(PANEL_SIZE.0, PANEL_SIZE.1);
            self.resized = true;
        }
    }

    fn replace_catalog(&mut self, catalog: Catalog) {
        let len = catalog.len();
        self.catalog = catalog;
        self.emit(&SessionEvent::CatalogReplaced { len });
    }

    fn clear_edit(&mut self) {
        if self.edit.take().is_some() {
            self.emit(&SessionEvent::SelectionChanged(None));
            self.emit(&SessionEvent::PendingTagsChanged(TagSet::new()));
            self.emit(&SessionEvent::DraftChanged(String::new()));
        }
    }

    fn ensure_idle(&self, operation: &'static str) -> Result<(), SessionError> {
        if self.phase.is_busy() {
            return Err(SessionError::InvalidOperation {
                operation,
                state: self.phase.name(),
            });
        }
        Ok(())
    }

    fn ensure_editable(&self, operation: &'static str) -> Result<(), SessionError> {
        if !self.phase.accepts_edits() {
            return Err(SessionError::InvalidOperation {
                operation,
                state: self.phase.name(),
            });
        }
        Ok(())
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        if self.phase == phase {
            return;
        }
        debug!(from = self.phase.name(), to = phase.name(), "session phase");
        self.phase = phase.clone();
        self.emit(&SessionEvent::PhaseChanged(phase));
    }

    fn emit(&mut self, event: &SessionEvent) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }
}
