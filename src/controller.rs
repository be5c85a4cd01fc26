use std::path::PathBuf;
use std::time::{Duration, Instant};

/// What the user is doing with the list as a whole. `UpdateSelect` and
/// `DeleteSelect` arm the next selection; they cannot both be active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Browse,
    UpdateSelect,
    DeleteSelect,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Browse
    }
}

/// The single active selection. One variant at a time, so an item can never
/// be pending edit and pending delete together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Play(String),
    Edit(String),
    Delete(String),
}

impl Default for Action {
    fn default() -> Self {
        Action::None
    }
}

impl Action {
    pub fn target(&self) -> Option<&str> {
        match self {
            Action::None => None,
            Action::Play(id) | Action::Edit(id) | Action::Delete(id) => Some(id),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Action::None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    Played(String),
    Stopped,
    EditRequested(String),
    DeleteRequested(String),
}

/// Selection state machine for one list view. Long-lived: it never reaches a
/// terminal state, it only cycles back to browsing.
#[derive(Debug, Default)]
pub struct Selector {
    mode: Mode,
    action: Action,
    thread: Option<String>,
}

impl Selector {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn playing(&self) -> Option<&str> {
        match &self.action {
            Action::Play(id) => Some(id),
            _ => None,
        }
    }

    pub fn editing(&self) -> Option<&str> {
        match &self.action {
            Action::Edit(id) => Some(id),
            _ => None,
        }
    }

    pub fn deleting(&self) -> Option<&str> {
        match &self.action {
            Action::Delete(id) => Some(id),
            _ => None,
        }
    }

    pub fn thread(&self) -> Option<&str> {
        self.thread.as_deref()
    }

    /// Arms update selection. Whatever was selected before is dropped, and an
    /// open thread closes so the armed list is unobstructed.
    pub fn enter_update_mode(&mut self) {
        self.mode = Mode::UpdateSelect;
        self.action = Action::None;
        self.thread = None;
    }

    pub fn enter_delete_mode(&mut self) {
        self.mode = Mode::DeleteSelect;
        self.action = Action::None;
        self.thread = None;
    }

    /// Leaves any selecting mode without touching a playing selection.
    pub fn exit_mode(&mut self) {
        self.mode = Mode::Browse;
        if !matches!(self.action, Action::Play(_)) {
            self.action = Action::None;
        }
    }

    /// Drops the armed edit/delete target but stays in the current mode, so
    /// another item can be picked.
    pub fn clear_action(&mut self) {
        self.action = Action::None;
    }

    /// Full reset to browsing. Runs after a mutation lands.
    pub fn reset(&mut self) {
        self.mode = Mode::Browse;
        self.action = Action::None;
    }

    pub fn select(&mut self, id: &str) -> SelectOutcome {
        match self.mode {
            Mode::UpdateSelect => {
                self.action = Action::Edit(id.to_string());
                SelectOutcome::EditRequested(id.to_string())
            }
            Mode::DeleteSelect => {
                self.action = Action::Delete(id.to_string());
                SelectOutcome::DeleteRequested(id.to_string())
            }
            Mode::Browse => {
                if self.playing() == Some(id) {
                    self.action = Action::None;
                    SelectOutcome::Stopped
                } else {
                    self.action = Action::Play(id.to_string());
                    SelectOutcome::Played(id.to_string())
                }
            }
        }
    }

    /// A comment thread may sit alongside browsing or playback, never
    /// alongside an armed edit/delete.
    pub fn open_thread(&mut self, id: &str) -> bool {
        if matches!(self.action, Action::Edit(_) | Action::Delete(_)) {
            return false;
        }
        self.thread = Some(id.to_string());
        true
    }

    pub fn close_thread(&mut self) {
        self.thread = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Upload,
    UpdateVideo,
    DeleteVideo,
    LikeVideo,
    AddComment,
    UpdateComment,
    DeleteComment,
    LikeComment,
    AddTweet,
    UpdateTweet,
    DeleteTweet,
    Login,
    Register,
    Logout,
}

impl MutationKind {
    pub fn label(&self) -> &'static str {
        match self {
            MutationKind::Upload => "upload",
            MutationKind::UpdateVideo => "video update",
            MutationKind::DeleteVideo => "video delete",
            MutationKind::LikeVideo => "like",
            MutationKind::AddComment => "comment",
            MutationKind::UpdateComment => "comment update",
            MutationKind::DeleteComment => "comment delete",
            MutationKind::LikeComment => "comment like",
            MutationKind::AddTweet => "tweet",
            MutationKind::UpdateTweet => "tweet update",
            MutationKind::DeleteTweet => "tweet delete",
            MutationKind::Login => "sign-in",
            MutationKind::Register => "registration",
            MutationKind::Logout => "sign-out",
        }
    }

    /// Mutations on comments refresh the open thread; everything else
    /// refreshes the collection that owns the view.
    pub fn comment_scoped(&self) -> bool {
        matches!(
            self,
            MutationKind::AddComment
                | MutationKind::UpdateComment
                | MutationKind::DeleteComment
                | MutationKind::LikeComment
        )
    }
}

/// One mutation slot per view. A new mutation only starts when nothing is in
/// flight; a failure parks the slot in `Failed` until the user retries or
/// moves on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionStatus {
    Idle,
    InFlight(MutationKind),
    Failed(MutationKind, String),
}

impl Default for ActionStatus {
    fn default() -> Self {
        ActionStatus::Idle
    }
}

impl ActionStatus {
    pub fn is_idle(&self) -> bool {
        matches!(self, ActionStatus::Idle)
    }

    pub fn in_flight(&self) -> Option<MutationKind> {
        match self {
            ActionStatus::InFlight(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn begin(&mut self, kind: MutationKind) -> bool {
        if matches!(self, ActionStatus::InFlight(_)) {
            return false;
        }
        *self = ActionStatus::InFlight(kind);
        true
    }

    pub fn settle(&mut self, kind: MutationKind, outcome: Result<(), String>) {
        *self = match outcome {
            Ok(()) => ActionStatus::Idle,
            Err(reason) => ActionStatus::Failed(kind, reason),
        };
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub total_pages: u32,
}

#[derive(Debug, Clone, Copy)]
struct PendingFetch {
    request: u64,
    page: u32,
}

/// Paged window over a remote collection. Every fetch carries a request
/// number; only the response matching the outstanding number is applied, so
/// a slow page can never overwrite a newer one.
#[derive(Debug)]
pub struct Collection<T> {
    items: Vec<T>,
    page: u32,
    total_pages: u32,
    loading: bool,
    loaded: bool,
    pending: Option<PendingFetch>,
    next_request: u64,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            page: 1,
            total_pages: 1,
            loading: false,
            loaded: false,
            pending: None,
            next_request: 0,
        }
    }
}

impl<T> Collection<T> {
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// True once any page has been applied; the views use this to tell an
    /// empty collection from one that has not arrived yet.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn begin_fetch(&mut self, page: u32) -> u64 {
        self.next_request += 1;
        let request = self.next_request;
        self.pending = Some(PendingFetch { request, page });
        self.loading = true;
        request
    }

    pub fn apply(&mut self, request: u64, page: Page<T>) -> bool {
        if !self.settle_pending(request) {
            return false;
        }
        self.items = page.items;
        self.page = page.page.max(1);
        self.total_pages = page.total_pages.max(1);
        self.loaded = true;
        true
    }

    /// A failed fetch leaves the previous window on screen.
    pub fn fail(&mut self, request: u64) -> bool {
        self.settle_pending(request)
    }

    fn settle_pending(&mut self, request: u64) -> bool {
        match self.pending {
            Some(pending) if pending.request == request => {
                self.pending = None;
                self.loading = false;
                true
            }
            _ => false,
        }
    }

    /// The page the view is headed for: the in-flight target if there is
    /// one, otherwise the page on screen.
    fn cursor(&self) -> u32 {
        self.pending.map(|p| p.page).unwrap_or(self.page)
    }

    pub fn can_prev(&self) -> bool {
        self.cursor() > 1
    }

    pub fn can_next(&self) -> bool {
        self.cursor() < self.total_pages
    }

    pub fn prev_target(&self) -> Option<u32> {
        self.can_prev().then(|| self.cursor() - 1)
    }

    pub fn next_target(&self) -> Option<u32> {
        self.can_next().then(|| self.cursor() + 1)
    }
}

#[derive(Debug, Clone)]
struct PendingThread {
    request: u64,
}

/// Unpaginated comment window under a single parent. Opening a different
/// parent throws the previous comments away outright.
#[derive(Debug)]
pub struct Thread<T> {
    parent: Option<String>,
    items: Vec<T>,
    loading: bool,
    pending: Option<PendingThread>,
    next_request: u64,
}

impl<T> Default for Thread<T> {
    fn default() -> Self {
        Self {
            parent: None,
            items: Vec::new(),
            loading: false,
            pending: None,
            next_request: 0,
        }
    }
}

impl<T> Thread<T> {
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_open(&self) -> bool {
        self.parent.is_some()
    }

    pub fn open(&mut self, parent: &str) -> u64 {
        if self.parent.as_deref() != Some(parent) {
            self.items.clear();
        }
        self.parent = Some(parent.to_string());
        self.begin()
    }

    /// Re-fetches the open thread in place, for after a comment mutation.
    pub fn refresh(&mut self) -> Option<u64> {
        self.parent.is_some().then(|| self.begin())
    }

    fn begin(&mut self) -> u64 {
        self.next_request += 1;
        let request = self.next_request;
        self.pending = Some(PendingThread { request });
        self.loading = true;
        request
    }

    pub fn apply(&mut self, request: u64, items: Vec<T>) -> bool {
        if !self.settle_pending(request) {
            return false;
        }
        self.items = items;
        true
    }

    pub fn fail(&mut self, request: u64) -> bool {
        self.settle_pending(request)
    }

    fn settle_pending(&mut self, request: u64) -> bool {
        match &self.pending {
            Some(pending) if pending.request == request => {
                self.pending = None;
                self.loading = false;
                true
            }
            _ => false,
        }
    }

    pub fn close(&mut self) {
        self.parent = None;
        self.items.clear();
        self.pending = None;
        self.loading = false;
    }
}

/// Edit buffer for the update form. Loaded entities are left untouched; the
/// form works on this copy until submit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Draft {
    pub title: String,
    pub description: String,
    pub attachment: Option<PathBuf>,
}

impl Draft {
    pub fn from_fields(title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            attachment: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

/// Transient footer message. Expiry is measured from this notice's own
/// `posted_at`, so replacing it restarts the clock and an older notice's
/// deadline can never clear a newer one.
#[derive(Debug, Clone)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
    pub posted_at: Instant,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            posted_at: Instant::now(),
        }
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.posted_at.elapsed() >= ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(ids: &[&str], number: u32, total: u32) -> Page<String> {
        Page {
            items: ids.iter().map(|s| s.to_string()).collect(),
            page: number,
            total_pages: total,
        }
    }

    #[test]
    fn update_and_delete_modes_are_exclusive() {
        let mut sel = Selector::default();

        sel.enter_update_mode();
        assert_eq!(sel.select("v1"), SelectOutcome::EditRequested("v1".into()));
        assert_eq!(sel.editing(), Some("v1"));
        assert_eq!(sel.deleting(), None);

        sel.enter_delete_mode();
        assert_eq!(sel.mode(), Mode::DeleteSelect);
        assert!(sel.action().is_none());

        assert_eq!(
            sel.select("v2"),
            SelectOutcome::DeleteRequested("v2".into())
        );
        assert_eq!(sel.deleting(), Some("v2"));
        assert_eq!(sel.editing(), None);
    }

    #[test]
    fn selecting_in_browse_toggles_playback() {
        let mut sel = Selector::default();
        assert_eq!(sel.select("v1"), SelectOutcome::Played("v1".into()));
        assert_eq!(sel.playing(), Some("v1"));

        assert_eq!(sel.select("v1"), SelectOutcome::Stopped);
        assert_eq!(sel.playing(), None);

        assert_eq!(sel.select("v2"), SelectOutcome::Played("v2".into()));
        assert_eq!(sel.select("v3"), SelectOutcome::Played("v3".into()));
        assert_eq!(sel.playing(), Some("v3"));
    }

    #[test]
    fn thread_coexists_with_playback_only() {
        let mut sel = Selector::default();
        sel.select("v1");
        assert!(sel.open_thread("v1"));
        assert_eq!(sel.thread(), Some("v1"));
        assert_eq!(sel.playing(), Some("v1"));

        sel.enter_update_mode();
        assert_eq!(sel.thread(), None);
        sel.select("v2");
        assert!(!sel.open_thread("v2"));
    }

    #[test]
    fn exit_mode_keeps_playback() {
        let mut sel = Selector::default();
        sel.select("v1");
        sel.enter_update_mode();
        sel.select("v2");
        sel.exit_mode();
        assert_eq!(sel.mode(), Mode::Browse);
        assert!(sel.action().is_none());

        sel.select("v1");
        sel.exit_mode();
        assert_eq!(sel.playing(), Some("v1"));
    }

    #[test]
    fn clear_action_stays_in_mode() {
        let mut sel = Selector::default();
        sel.enter_update_mode();
        sel.select("v1");
        sel.clear_action();
        assert_eq!(sel.mode(), Mode::UpdateSelect);
        assert!(sel.action().is_none());
    }

    #[test]
    fn stale_page_response_is_discarded() {
        let mut coll = Collection::<String>::default();
        let first = coll.begin_fetch(1);
        assert!(coll.apply(first, page(&["a", "b"], 1, 3)));

        let slow = coll.begin_fetch(2);
        let fast = coll.begin_fetch(3);

        assert!(coll.apply(fast, page(&["e"], 3, 3)));
        assert_eq!(coll.page(), 3);

        assert!(!coll.apply(slow, page(&["c", "d"], 2, 3)));
        assert_eq!(coll.page(), 3);
        assert_eq!(coll.items(), ["e".to_string()]);
        assert!(!coll.is_loading());
    }

    #[test]
    fn failed_fetch_keeps_previous_page() {
        let mut coll = Collection::<String>::default();
        let first = coll.begin_fetch(1);
        assert!(coll.apply(first, page(&["a", "b"], 1, 2)));

        let second = coll.begin_fetch(2);
        assert!(coll.is_loading());
        assert!(coll.fail(second));
        assert!(!coll.is_loading());
        assert_eq!(coll.page(), 1);
        assert_eq!(coll.items().len(), 2);
    }

    #[test]
    fn stale_failure_does_not_clear_loading() {
        let mut coll = Collection::<String>::default();
        let old = coll.begin_fetch(2);
        let new = coll.begin_fetch(3);
        assert!(!coll.fail(old));
        assert!(coll.is_loading());
        assert!(coll.fail(new));
        assert!(!coll.is_loading());
    }

    #[test]
    fn navigation_respects_bounds() {
        let mut coll = Collection::<String>::default();
        let req = coll.begin_fetch(1);
        coll.apply(req, page(&["a"], 1, 1));
        assert_eq!(coll.prev_target(), None);
        assert_eq!(coll.next_target(), None);

        let req = coll.begin_fetch(1);
        coll.apply(req, page(&["a"], 1, 3));
        assert_eq!(coll.prev_target(), None);
        assert_eq!(coll.next_target(), Some(2));

        let req = coll.begin_fetch(3);
        coll.apply(req, page(&["z"], 3, 3));
        assert_eq!(coll.prev_target(), Some(2));
        assert_eq!(coll.next_target(), None);
    }

    #[test]
    fn pending_navigation_advances_cursor() {
        let mut coll = Collection::<String>::default();
        let req = coll.begin_fetch(1);
        coll.apply(req, page(&["a"], 1, 5));

        coll.begin_fetch(2);
        assert_eq!(coll.next_target(), Some(3));
        assert_eq!(coll.prev_target(), Some(1));
    }

    #[test]
    fn mutation_slot_rejects_overlap() {
        let mut status = ActionStatus::default();
        assert!(status.begin(MutationKind::DeleteVideo));
        assert!(!status.begin(MutationKind::DeleteVideo));
        assert!(!status.begin(MutationKind::LikeVideo));

        status.settle(MutationKind::DeleteVideo, Ok(()));
        assert!(status.is_idle());
        assert!(status.begin(MutationKind::LikeVideo));
    }

    #[test]
    fn failed_mutation_allows_retry() {
        let mut status = ActionStatus::default();
        assert!(status.begin(MutationKind::UpdateVideo));
        status.settle(MutationKind::UpdateVideo, Err("boom".into()));
        assert_eq!(
            status,
            ActionStatus::Failed(MutationKind::UpdateVideo, "boom".into())
        );
        assert!(status.begin(MutationKind::UpdateVideo));
    }

    #[test]
    fn thread_switch_discards_other_parent() {
        let mut thread = Thread::<String>::default();
        let first = thread.open("v1");
        assert!(thread.apply(first, vec!["c1".into(), "c2".into()]));
        assert_eq!(thread.items().len(), 2);

        let second = thread.open("v2");
        assert!(thread.items().is_empty());
        assert!(thread.is_loading());

        assert!(!thread.apply(first, vec!["old".into()]));
        assert!(thread.apply(second, vec!["fresh".into()]));
        assert_eq!(thread.parent(), Some("v2"));
        assert_eq!(thread.items(), ["fresh".to_string()]);
    }

    #[test]
    fn thread_refresh_targets_open_parent() {
        let mut thread = Thread::<String>::default();
        assert_eq!(thread.refresh(), None);

        let first = thread.open("v1");
        thread.apply(first, vec!["c1".into()]);
        let refresh = thread.refresh().expect("thread open");
        assert!(thread.apply(refresh, vec!["c1".into(), "c2".into()]));
        assert_eq!(thread.items().len(), 2);

        thread.close();
        assert!(!thread.is_open());
        assert!(thread.items().is_empty());
    }

    #[test]
    fn newer_notice_restarts_expiry() {
        let ttl = Duration::from_millis(2500);
        let old = Notice {
            severity: Severity::Info,
            message: "first".into(),
            posted_at: Instant::now() - ttl,
        };
        assert!(old.is_expired(ttl));

        let newer = Notice::success("second");
        assert!(!newer.is_expired(ttl));
    }
}
