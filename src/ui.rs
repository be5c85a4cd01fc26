use std::env;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Padding, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use semver::Version;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::api::{self, ApiError, LoginCredentials, RegisterForm, VideoPatch, VideoUpload};
use crate::config;
use crate::controller::{
    ActionStatus, Collection, Draft, Mode, MutationKind, Notice, Page, SelectOutcome, Selector,
    Severity, Thread,
};
use crate::data::{CommentService, LikeService, SessionService, TweetService, VideoService};
use crate::player;
use crate::session::AuthStatus;
use crate::update;

const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_PANEL_BG: Color = Color::Rgb(24, 24, 36);
const COLOR_PANEL_SELECTED_BG: Color = Color::Rgb(69, 71, 90);
const COLOR_BORDER_IDLE: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_FOCUSED: Color = Color::Rgb(137, 180, 250);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_SUCCESS: Color = Color::Rgb(166, 227, 161);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Home,
    Tweets,
    Dashboard,
    Login,
    Register,
    Upload,
}

/// Routing key for collections and mutation slots. The three list screens
/// each own one binding; the form screens share a fourth slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Home,
    Dashboard,
    Tweets,
    Form,
}

/// One sign-in check per screen activation. The data fetch for the screen is
/// issued only from the matching `Auth` response, never before it.
#[derive(Debug, Clone)]
enum AuthGate {
    Unknown,
    Checking { request: u64 },
    Known(AuthStatus),
}

#[derive(Default)]
struct Composer {
    active: bool,
    buffer: String,
    editing: Option<String>,
}

impl Composer {
    fn start(&mut self) {
        self.active = true;
        self.buffer.clear();
        self.editing = None;
    }

    fn start_edit(&mut self, id: &str, content: &str) {
        self.active = true;
        self.buffer = content.to_string();
        self.editing = Some(id.to_string());
    }

    fn cancel(&mut self) {
        self.active = false;
        self.buffer.clear();
        self.editing = None;
    }
}

struct FormField {
    label: &'static str,
    value: String,
    masked: bool,
}

impl FormField {
    fn plain(label: &'static str) -> Self {
        Self {
            label,
            value: String::new(),
            masked: false,
        }
    }

    fn masked(label: &'static str) -> Self {
        Self {
            label,
            value: String::new(),
            masked: true,
        }
    }

    fn prefilled(label: &'static str, value: &str) -> Self {
        Self {
            label,
            value: value.to_string(),
            masked: false,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FormTarget {
    Field,
    Submit,
    Secondary,
}

/// Keyboard-driven form. The active slot walks the fields first, then the
/// buttons; button zero submits, button one (when present) navigates away.
struct Form {
    title: &'static str,
    fields: Vec<FormField>,
    buttons: Vec<&'static str>,
    active: usize,
    status: Option<String>,
}

impl Form {
    fn login() -> Self {
        Self {
            title: "Sign in to VidTube",
            fields: vec![
                FormField::plain("Email"),
                FormField::plain("Username"),
                FormField::masked("Password"),
            ],
            buttons: vec!["Sign in", "Create an account"],
            active: 0,
            status: None,
        }
    }

    fn register() -> Self {
        Self {
            title: "Create your account",
            fields: vec![
                FormField::plain("Full name"),
                FormField::plain("Username"),
                FormField::plain("Email"),
                FormField::masked("Password"),
                FormField::plain("Avatar image path"),
                FormField::plain("Cover image path (optional)"),
            ],
            buttons: vec!["Register", "Back to sign in"],
            active: 0,
            status: None,
        }
    }

    fn upload() -> Self {
        Self {
            title: "Upload a video",
            fields: vec![
                FormField::plain("Title"),
                FormField::plain("Description"),
                FormField::plain("Video file path"),
                FormField::plain("Thumbnail path"),
            ],
            buttons: vec!["Upload"],
            active: 0,
            status: None,
        }
    }

    fn edit_video(title: &str, description: &str) -> Self {
        Self {
            title: "Update video",
            fields: vec![
                FormField::prefilled("Title", title),
                FormField::prefilled("Description", description),
                FormField::plain("New thumbnail path (optional)"),
            ],
            buttons: vec!["Save"],
            active: 0,
            status: None,
        }
    }

    fn slots(&self) -> usize {
        self.fields.len() + self.buttons.len()
    }

    fn next(&mut self) {
        self.active = (self.active + 1) % self.slots();
    }

    fn previous(&mut self) {
        self.active = (self.active + self.slots() - 1) % self.slots();
    }

    fn enter_target(&self) -> FormTarget {
        if self.active < self.fields.len() {
            FormTarget::Field
        } else if self.active == self.fields.len() {
            FormTarget::Submit
        } else {
            FormTarget::Secondary
        }
    }

    fn active_value_mut(&mut self) -> Option<&mut String> {
        self.fields.get_mut(self.active).map(|field| &mut field.value)
    }

    fn insert_char(&mut self, ch: char) {
        if let Some(value) = self.active_value_mut() {
            value.push(ch);
        }
        self.reset_status();
    }

    fn backspace(&mut self) {
        if let Some(value) = self.active_value_mut() {
            value.pop();
        }
        self.reset_status();
    }

    fn clear_active(&mut self) {
        if let Some(value) = self.active_value_mut() {
            value.clear();
        }
        self.reset_status();
    }

    fn value(&self, index: usize) -> String {
        self.fields
            .get(index)
            .map(|field| field.value.trim().to_string())
            .unwrap_or_default()
    }

    fn display_value(&self, index: usize) -> String {
        let Some(field) = self.fields.get(index) else {
            return String::new();
        };
        if field.value.is_empty() {
            return "(not set)".to_string();
        }
        if field.masked {
            return "*".repeat(field.value.chars().count().max(1));
        }
        field.value.clone()
    }

    fn set_status<S: Into<String>>(&mut self, message: S) {
        self.status = Some(message.into());
    }

    fn reset_status(&mut self) {
        self.status = None;
    }
}

struct Spinner {
    index: usize,
    last_tick: Instant,
}

impl Spinner {
    fn new() -> Self {
        Self {
            index: 0,
            last_tick: Instant::now(),
        }
    }

    fn frame(&self) -> &'static str {
        SPINNER_FRAMES[self.index % SPINNER_FRAMES.len()]
    }

    fn advance(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_tick) >= Duration::from_millis(120) {
            self.index = (self.index + 1) % SPINNER_FRAMES.len();
            self.last_tick = now;
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.index = 0;
        self.last_tick = Instant::now();
    }
}

enum AsyncResponse {
    Auth {
        request: u64,
        status: AuthStatus,
    },
    Videos {
        view: View,
        request: u64,
        result: Result<api::VideoPage, ApiError>,
    },
    Tweets {
        request: u64,
        result: Result<Vec<api::Tweet>, ApiError>,
    },
    Stats {
        result: Result<api::ChannelStats, ApiError>,
    },
    Thread {
        request: u64,
        video_id: String,
        result: Result<Vec<api::Comment>, ApiError>,
    },
    Mutation {
        view: View,
        kind: MutationKind,
        result: Result<(), ApiError>,
    },
    Login {
        result: Result<api::User, ApiError>,
    },
    Update {
        result: Result<Option<update::UpdateInfo>>,
    },
}

pub struct Options {
    pub status_message: String,
    pub session_service: Arc<dyn SessionService>,
    pub video_service: Arc<dyn VideoService>,
    pub comment_service: Arc<dyn CommentService>,
    pub tweet_service: Arc<dyn TweetService>,
    pub like_service: Arc<dyn LikeService>,
    pub player: config::PlayerConfig,
    pub notice_ttl: Duration,
    pub config_path: String,
}

pub struct Model {
    screen: Screen,
    status_message: String,
    notice: Option<Notice>,
    notice_ttl: Duration,

    session_service: Arc<dyn SessionService>,
    video_service: Arc<dyn VideoService>,
    comment_service: Arc<dyn CommentService>,
    tweet_service: Arc<dyn TweetService>,
    like_service: Arc<dyn LikeService>,

    auth_gate: AuthGate,
    auth_request: u64,

    home_videos: Collection<api::Video>,
    home_selector: Selector,
    home_status: ActionStatus,
    home_selected: usize,
    home_list: ListState,

    channel_videos: Collection<api::Video>,
    channel_selector: Selector,
    channel_status: ActionStatus,
    channel_selected: usize,
    channel_list: ListState,
    stats: Option<api::ChannelStats>,
    stats_loading: bool,

    tweets: Collection<api::Tweet>,
    tweet_selector: Selector,
    tweet_status: ActionStatus,
    tweet_selected: usize,
    tweet_list: ListState,

    thread: Thread<api::Comment>,
    thread_selected: usize,
    thread_focused: bool,
    thread_list: ListState,

    form: Option<Form>,
    form_status: ActionStatus,
    edit_form: Option<Form>,
    draft: Option<Draft>,
    comment_composer: Composer,
    tweet_composer: Composer,

    player: config::PlayerConfig,
    config_path: String,

    update_notice: Option<update::UpdateInfo>,
    update_check_in_progress: bool,
    update_checked: bool,
    current_version: Version,

    needs_redraw: bool,
    spinner: Spinner,
    response_tx: Sender<AsyncResponse>,
    response_rx: Receiver<AsyncResponse>,
}

impl Model {
    pub fn new(opts: Options) -> Self {
        let current_version =
            Version::parse(crate::VERSION).expect("crate version is valid semver");
        let (response_tx, response_rx) = unbounded();
        let mut model = Self {
            screen: Screen::Home,
            status_message: opts.status_message,
            notice: None,
            notice_ttl: opts.notice_ttl,
            session_service: opts.session_service,
            video_service: opts.video_service,
            comment_service: opts.comment_service,
            tweet_service: opts.tweet_service,
            like_service: opts.like_service,
            auth_gate: AuthGate::Unknown,
            auth_request: 0,
            home_videos: Collection::default(),
            home_selector: Selector::default(),
            home_status: ActionStatus::default(),
            home_selected: 0,
            home_list: ListState::default(),
            channel_videos: Collection::default(),
            channel_selector: Selector::default(),
            channel_status: ActionStatus::default(),
            channel_selected: 0,
            channel_list: ListState::default(),
            stats: None,
            stats_loading: false,
            tweets: Collection::default(),
            tweet_selector: Selector::default(),
            tweet_status: ActionStatus::default(),
            tweet_selected: 0,
            tweet_list: ListState::default(),
            thread: Thread::default(),
            thread_selected: 0,
            thread_focused: false,
            thread_list: ListState::default(),
            form: None,
            form_status: ActionStatus::default(),
            edit_form: None,
            draft: None,
            comment_composer: Composer::default(),
            tweet_composer: Composer::default(),
            player: opts.player,
            config_path: opts.config_path,
            update_notice: None,
            update_check_in_progress: false,
            update_checked: false,
            current_version,
            needs_redraw: true,
            spinner: Spinner::new(),
            response_tx,
            response_rx,
        };
        model.activate_screen(Screen::Home);
        model.queue_update_check();
        model
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        let tick_rate = Duration::from_millis(120);

        loop {
            if self.poll_async() {
                self.mark_dirty();
            }

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        match self.handle_key(key.code) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(err) => {
                                self.status_message = format!("Error: {}", err);
                                self.mark_dirty();
                            }
                        }
                    }
                    Event::Resize(_, _) => self.mark_dirty(),
                    _ => {}
                }
            }

            if self.poll_async() {
                self.mark_dirty();
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
                if self.is_loading() {
                    if self.spinner.advance() {
                        self.mark_dirty();
                    }
                } else {
                    self.spinner.reset();
                }
                self.expire_notice();
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn is_loading(&self) -> bool {
        self.home_videos.is_loading()
            || self.channel_videos.is_loading()
            || self.tweets.is_loading()
            || self.thread.is_loading()
            || self.stats_loading
            || self.update_check_in_progress
            || matches!(self.auth_gate, AuthGate::Checking { .. })
            || self.home_status.in_flight().is_some()
            || self.channel_status.in_flight().is_some()
            || self.tweet_status.in_flight().is_some()
            || self.form_status.in_flight().is_some()
    }

    fn is_authenticated(&self) -> bool {
        matches!(
            self.auth_gate,
            AuthGate::Known(AuthStatus::Authenticated(_))
        )
    }

    fn current_username(&self) -> Option<&str> {
        match &self.auth_gate {
            AuthGate::Known(AuthStatus::Authenticated(user)) => Some(user.username.as_str()),
            _ => None,
        }
    }

    fn set_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
        self.mark_dirty();
    }

    fn expire_notice(&mut self) {
        if let Some(notice) = &self.notice {
            if notice.is_expired(self.notice_ttl) {
                self.notice = None;
                self.mark_dirty();
            }
        }
    }

    fn view_for_screen(&self) -> View {
        match self.screen {
            Screen::Home => View::Home,
            Screen::Dashboard => View::Dashboard,
            Screen::Tweets => View::Tweets,
            Screen::Login | Screen::Register | Screen::Upload => View::Form,
        }
    }

    fn status_slot_mut(&mut self, view: View) -> &mut ActionStatus {
        match view {
            View::Home => &mut self.home_status,
            View::Dashboard => &mut self.channel_status,
            View::Tweets => &mut self.tweet_status,
            View::Form => &mut self.form_status,
        }
    }

    fn selector_mut(&mut self, view: View) -> &mut Selector {
        match view {
            View::Home | View::Form => &mut self.home_selector,
            View::Dashboard => &mut self.channel_selector,
            View::Tweets => &mut self.tweet_selector,
        }
    }

    fn activate_screen(&mut self, screen: Screen) {
        self.screen = screen;
        self.edit_form = None;
        self.draft = None;
        self.comment_composer.cancel();
        self.tweet_composer.cancel();
        self.home_selector.close_thread();
        self.thread.close();
        self.thread_focused = false;
        self.form = match screen {
            Screen::Login => Some(Form::login()),
            Screen::Register => Some(Form::register()),
            Screen::Upload => Some(Form::upload()),
            _ => None,
        };
        self.status_message = screen_hint(screen).to_string();
        match screen {
            Screen::Home | Screen::Dashboard | Screen::Tweets | Screen::Upload => {
                self.queue_auth_check()
            }
            Screen::Login | Screen::Register => {}
        }
        self.mark_dirty();
    }

    fn queue_auth_check(&mut self) {
        self.auth_request += 1;
        let request = self.auth_request;
        self.auth_gate = AuthGate::Checking { request };
        let service = self.session_service.clone();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let status = service.check_auth();
            let _ = tx.send(AsyncResponse::Auth { request, status });
        });
    }

    /// Per-activation fetch sequence: runs only once the sign-in check for
    /// the current screen has come back.
    fn on_auth_resolved(&mut self) {
        match self.screen {
            Screen::Home => {
                let page = if self.home_videos.is_loaded() {
                    self.home_videos.page()
                } else {
                    1
                };
                self.queue_videos_fetch(View::Home, page);
            }
            Screen::Tweets => self.queue_tweets_fetch(),
            Screen::Dashboard => {
                if self.is_authenticated() {
                    let page = if self.channel_videos.is_loaded() {
                        self.channel_videos.page()
                    } else {
                        1
                    };
                    self.queue_videos_fetch(View::Dashboard, page);
                    self.queue_stats_fetch();
                } else {
                    self.set_notice(Notice::info("Sign in to manage your channel."));
                    self.activate_screen(Screen::Login);
                }
            }
            Screen::Upload => {
                if !self.is_authenticated() {
                    self.set_notice(Notice::info("Sign in to upload videos."));
                    self.activate_screen(Screen::Login);
                }
            }
            Screen::Login | Screen::Register => {}
        }
    }

    fn queue_videos_fetch(&mut self, view: View, page: u32) {
        let request = match view {
            View::Home => self.home_videos.begin_fetch(page),
            View::Dashboard => self.channel_videos.begin_fetch(page),
            _ => return,
        };
        let service = self.video_service.clone();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let result = if view == View::Dashboard {
                service.channel_videos(page)
            } else {
                service.videos(page)
            };
            let _ = tx.send(AsyncResponse::Videos {
                view,
                request,
                result,
            });
        });
    }

    fn queue_tweets_fetch(&mut self) {
        let request = self.tweets.begin_fetch(1);
        let service = self.tweet_service.clone();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let result = service.tweets();
            let _ = tx.send(AsyncResponse::Tweets { request, result });
        });
    }

    fn queue_stats_fetch(&mut self) {
        self.stats_loading = true;
        let service = self.video_service.clone();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let result = service.channel_stats();
            let _ = tx.send(AsyncResponse::Stats { result });
        });
    }

    fn queue_thread_fetch(&mut self, request: u64, video_id: String) {
        let service = self.comment_service.clone();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let result = service.for_video(&video_id);
            let _ = tx.send(AsyncResponse::Thread {
                request,
                video_id,
                result,
            });
        });
    }

    fn queue_mutation<F>(&mut self, view: View, kind: MutationKind, job: F)
    where
        F: FnOnce() -> Result<(), ApiError> + Send + 'static,
    {
        if !self.status_slot_mut(view).begin(kind) {
            self.set_notice(Notice::info(format!(
                "A {} is already in flight.",
                kind.label()
            )));
            return;
        }
        self.mark_dirty();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let result = job();
            let _ = tx.send(AsyncResponse::Mutation { view, kind, result });
        });
    }

    fn queue_update_check(&mut self) {
        if self.update_checked || self.update_check_in_progress {
            return;
        }
        if cfg!(test) || env::var(update::SKIP_UPDATE_ENV).is_ok() {
            self.update_checked = true;
            return;
        }
        self.update_checked = true;
        self.update_check_in_progress = true;
        let tx = self.response_tx.clone();
        let version = self.current_version.clone();
        thread::spawn(move || {
            let result = update::check_for_update(&version);
            let _ = tx.send(AsyncResponse::Update { result });
        });
    }

    fn poll_async(&mut self) -> bool {
        let mut changed = false;
        while let Ok(message) = self.response_rx.try_recv() {
            self.handle_async_response(message);
            changed = true;
        }
        changed
    }

    fn handle_async_response(&mut self, message: AsyncResponse) {
        match message {
            AsyncResponse::Auth { request, status } => {
                match &self.auth_gate {
                    AuthGate::Checking { request: expected } if *expected == request => {}
                    _ => return,
                }
                self.auth_gate = AuthGate::Known(status);
                self.on_auth_resolved();
                self.mark_dirty();
            }
            AsyncResponse::Videos {
                view,
                request,
                result,
            } => {
                match result {
                    Ok(page) => {
                        let page = Page {
                            items: page.videos,
                            page: page.page,
                            total_pages: page.total_pages,
                        };
                        match view {
                            View::Home => {
                                if self.home_videos.apply(request, page) {
                                    self.home_selected = self
                                        .home_selected
                                        .min(self.home_videos.items().len().saturating_sub(1));
                                }
                            }
                            View::Dashboard => {
                                if self.channel_videos.apply(request, page) {
                                    self.channel_selected = self
                                        .channel_selected
                                        .min(self.channel_videos.items().len().saturating_sub(1));
                                }
                            }
                            _ => {}
                        }
                    }
                    Err(err) => {
                        let settled = match view {
                            View::Home => self.home_videos.fail(request),
                            View::Dashboard => self.channel_videos.fail(request),
                            _ => false,
                        };
                        if settled {
                            self.handle_read_failure("videos", err);
                        }
                    }
                }
                self.mark_dirty();
            }
            AsyncResponse::Tweets { request, result } => {
                match result {
                    Ok(tweets) => {
                        let page = Page {
                            items: tweets,
                            page: 1,
                            total_pages: 1,
                        };
                        if self.tweets.apply(request, page) {
                            self.tweet_selected = self
                                .tweet_selected
                                .min(self.tweets.items().len().saturating_sub(1));
                        }
                    }
                    Err(err) => {
                        if self.tweets.fail(request) {
                            self.handle_read_failure("tweets", err);
                        }
                    }
                }
                self.mark_dirty();
            }
            AsyncResponse::Stats { result } => {
                self.stats_loading = false;
                if self.screen != Screen::Dashboard {
                    return;
                }
                match result {
                    Ok(stats) => self.stats = Some(stats),
                    Err(err) => self.handle_read_failure("channel stats", err),
                }
                self.mark_dirty();
            }
            AsyncResponse::Thread {
                request,
                video_id,
                result,
            } => {
                if self.thread.parent() != Some(video_id.as_str()) {
                    return;
                }
                match result {
                    Ok(comments) => {
                        if self.thread.apply(request, comments) {
                            self.thread_selected = self
                                .thread_selected
                                .min(self.thread.items().len().saturating_sub(1));
                        }
                    }
                    Err(err) => {
                        if self.thread.fail(request) {
                            self.handle_read_failure("comments", err);
                        }
                    }
                }
                self.mark_dirty();
            }
            AsyncResponse::Mutation { view, kind, result } => {
                match result {
                    Ok(()) => {
                        self.status_slot_mut(view).settle(kind, Ok(()));
                        self.after_mutation_success(view, kind);
                    }
                    Err(err) => {
                        let reason = failure_reason(&err);
                        self.status_slot_mut(view).settle(kind, Err(reason.clone()));
                        self.set_notice(Notice::error(format!(
                            "{} failed: {reason}",
                            kind.label()
                        )));
                        if let Some(form) = self.form.as_mut() {
                            form.set_status(reason);
                        }
                    }
                }
                self.mark_dirty();
            }
            AsyncResponse::Login { result } => {
                match result {
                    Ok(user) => {
                        self.form_status.settle(MutationKind::Login, Ok(()));
                        self.set_notice(Notice::success(format!(
                            "Signed in as {}.",
                            user.username
                        )));
                        self.auth_gate = AuthGate::Known(AuthStatus::Authenticated(user));
                        self.activate_screen(Screen::Dashboard);
                    }
                    Err(err) => {
                        let reason = failure_reason(&err);
                        self.form_status
                            .settle(MutationKind::Login, Err(reason.clone()));
                        if let Some(form) = self.form.as_mut() {
                            form.set_status(reason.clone());
                        }
                        self.set_notice(Notice::error(format!("Sign-in failed: {reason}")));
                    }
                }
                self.mark_dirty();
            }
            AsyncResponse::Update { result } => {
                self.update_check_in_progress = false;
                self.update_checked = true;
                match result {
                    Ok(info) => self.update_notice = info,
                    Err(err) => {
                        self.update_notice = None;
                        self.status_message = format!("Update check failed: {}", err);
                    }
                }
                self.mark_dirty();
            }
        }
    }

    /// Read failures keep whatever window is on screen. Transport trouble
    /// lands in the status line with the retry key; an expired session on a
    /// protected read drops to the sign-in screen.
    fn handle_read_failure(&mut self, what: &str, err: ApiError) {
        match err {
            ApiError::Unauthorized => {
                self.set_notice(Notice::error("Session expired. Sign in again."));
                self.activate_screen(Screen::Login);
            }
            ApiError::Api { message, .. } if !message.trim().is_empty() => {
                self.set_notice(Notice::error(format!("Couldn't load {what}: {message}")));
            }
            _ => {
                self.status_message = format!("Couldn't load {what}. Press r to retry.");
            }
        }
        self.mark_dirty();
    }

    fn after_mutation_success(&mut self, view: View, kind: MutationKind) {
        self.set_notice(Notice::success(success_message(kind)));
        if kind.comment_scoped() {
            self.comment_composer.cancel();
            if let Some(request) = self.thread.refresh() {
                if let Some(parent) = self.thread.parent() {
                    let video_id = parent.to_string();
                    self.queue_thread_fetch(request, video_id);
                }
            }
            return;
        }
        match kind {
            MutationKind::LikeVideo => {
                let page = match view {
                    View::Dashboard => self.channel_videos.page(),
                    _ => self.home_videos.page(),
                };
                self.queue_videos_fetch(view, page);
            }
            MutationKind::UpdateVideo | MutationKind::DeleteVideo => {
                self.channel_selector.reset();
                self.draft = None;
                self.edit_form = None;
                let page = self.channel_videos.page();
                self.queue_videos_fetch(View::Dashboard, page);
            }
            MutationKind::Upload => {
                self.form = None;
                self.activate_screen(Screen::Dashboard);
            }
            MutationKind::AddTweet | MutationKind::UpdateTweet | MutationKind::DeleteTweet => {
                self.tweet_selector.reset();
                self.tweet_composer.cancel();
                self.queue_tweets_fetch();
            }
            MutationKind::Register => {
                self.activate_screen(Screen::Login);
            }
            MutationKind::Logout => {
                self.auth_gate = AuthGate::Known(AuthStatus::Anonymous);
                self.activate_screen(Screen::Home);
            }
            _ => {}
        }
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        if self.edit_form.is_some() {
            return self.handle_edit_form_key(code);
        }
        if self.comment_composer.active || self.tweet_composer.active {
            return self.handle_composer_key(code);
        }
        match self.screen {
            Screen::Login | Screen::Register | Screen::Upload => self.handle_form_screen_key(code),
            Screen::Home => self.handle_home_key(code),
            Screen::Dashboard => self.handle_dashboard_key(code),
            Screen::Tweets => self.handle_tweets_key(code),
        }
    }

    fn handle_home_key(&mut self, code: KeyCode) -> Result<bool> {
        match code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('2') => self.activate_screen(Screen::Tweets),
            KeyCode::Char('3') => self.activate_screen(Screen::Dashboard),
            KeyCode::Char('U') => self.activate_screen(Screen::Upload),
            KeyCode::Char('i') => {
                if !self.is_authenticated() {
                    self.activate_screen(Screen::Login);
                }
            }
            KeyCode::Char('o') => self.request_logout(),
            KeyCode::Char('r') => {
                let page = self.home_videos.page();
                self.queue_videos_fetch(View::Home, page);
            }
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('n') | KeyCode::Right => self.go_next_page(View::Home),
            KeyCode::Char('p') | KeyCode::Left => self.go_prev_page(View::Home),
            KeyCode::Enter => {
                if !self.thread_focused {
                    self.handle_list_select(View::Home);
                }
            }
            KeyCode::Char('c') => self.toggle_thread(),
            KeyCode::Tab => {
                if self.thread.is_open() {
                    self.thread_focused = !self.thread_focused;
                    self.mark_dirty();
                }
            }
            KeyCode::Char('l') => self.toggle_like_current(),
            KeyCode::Char('a') => self.start_comment_compose(),
            KeyCode::Char('e') => self.start_comment_edit(),
            KeyCode::Char('x') => self.delete_selected_comment(),
            KeyCode::Char('b') => self.open_in_browser(View::Home),
            KeyCode::Esc => {
                if self.thread.is_open() {
                    self.home_selector.close_thread();
                    self.thread.close();
                    self.thread_focused = false;
                } else {
                    self.home_selector.clear_action();
                }
                self.mark_dirty();
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_dashboard_key(&mut self, code: KeyCode) -> Result<bool> {
        match code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('1') => self.activate_screen(Screen::Home),
            KeyCode::Char('2') => self.activate_screen(Screen::Tweets),
            KeyCode::Char('U') => self.activate_screen(Screen::Upload),
            KeyCode::Char('o') => self.request_logout(),
            KeyCode::Char('r') => {
                let page = self.channel_videos.page();
                self.queue_videos_fetch(View::Dashboard, page);
                self.queue_stats_fetch();
            }
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('n') | KeyCode::Right => self.go_next_page(View::Dashboard),
            KeyCode::Char('p') | KeyCode::Left => self.go_prev_page(View::Dashboard),
            KeyCode::Char('u') => self.toggle_mode(View::Dashboard, Mode::UpdateSelect),
            KeyCode::Char('d') => self.toggle_mode(View::Dashboard, Mode::DeleteSelect),
            KeyCode::Enter => self.handle_list_select(View::Dashboard),
            KeyCode::Char('b') => self.open_in_browser(View::Dashboard),
            KeyCode::Esc => {
                if self.channel_selector.mode() != Mode::Browse {
                    self.channel_selector.exit_mode();
                    self.status_message = screen_hint(Screen::Dashboard).to_string();
                } else {
                    self.channel_selector.clear_action();
                }
                self.mark_dirty();
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_tweets_key(&mut self, code: KeyCode) -> Result<bool> {
        match code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('1') => self.activate_screen(Screen::Home),
            KeyCode::Char('3') => self.activate_screen(Screen::Dashboard),
            KeyCode::Char('i') => {
                if !self.is_authenticated() {
                    self.activate_screen(Screen::Login);
                }
            }
            KeyCode::Char('o') => self.request_logout(),
            KeyCode::Char('r') => self.queue_tweets_fetch(),
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('n') | KeyCode::Right => self.go_next_page(View::Tweets),
            KeyCode::Char('p') | KeyCode::Left => self.go_prev_page(View::Tweets),
            KeyCode::Char('u') => self.toggle_mode(View::Tweets, Mode::UpdateSelect),
            KeyCode::Char('d') => self.toggle_mode(View::Tweets, Mode::DeleteSelect),
            KeyCode::Char('a') => self.start_tweet_compose(),
            KeyCode::Enter => self.handle_list_select(View::Tweets),
            KeyCode::Esc => {
                if self.tweet_selector.mode() != Mode::Browse {
                    self.tweet_selector.exit_mode();
                    self.status_message = screen_hint(Screen::Tweets).to_string();
                } else {
                    self.tweet_selector.clear_action();
                }
                self.mark_dirty();
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_form_screen_key(&mut self, code: KeyCode) -> Result<bool> {
        if code == KeyCode::Esc {
            self.form = None;
            self.activate_screen(Screen::Home);
            return Ok(false);
        }
        match code {
            KeyCode::Tab | KeyCode::Down => {
                if let Some(form) = self.form.as_mut() {
                    form.next();
                }
                self.mark_dirty();
            }
            KeyCode::BackTab | KeyCode::Up => {
                if let Some(form) = self.form.as_mut() {
                    form.previous();
                }
                self.mark_dirty();
            }
            KeyCode::Backspace => {
                if let Some(form) = self.form.as_mut() {
                    form.backspace();
                }
                self.mark_dirty();
            }
            KeyCode::Delete => {
                if let Some(form) = self.form.as_mut() {
                    form.clear_active();
                }
                self.mark_dirty();
            }
            KeyCode::Enter => {
                let target = self.form.as_ref().map(|form| form.enter_target());
                match target {
                    Some(FormTarget::Field) => {
                        if let Some(form) = self.form.as_mut() {
                            form.next();
                        }
                    }
                    Some(FormTarget::Submit) => self.submit_active_form(),
                    Some(FormTarget::Secondary) => match self.screen {
                        Screen::Login => self.activate_screen(Screen::Register),
                        Screen::Register => self.activate_screen(Screen::Login),
                        _ => {}
                    },
                    None => {}
                }
                self.mark_dirty();
            }
            KeyCode::Char(ch) => {
                if let Some(form) = self.form.as_mut() {
                    form.insert_char(ch);
                }
                self.mark_dirty();
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_edit_form_key(&mut self, code: KeyCode) -> Result<bool> {
        if code == KeyCode::Esc {
            self.edit_form = None;
            self.draft = None;
            self.channel_selector.clear_action();
            self.status_message = screen_hint(Screen::Dashboard).to_string();
            self.mark_dirty();
            return Ok(false);
        }
        match code {
            KeyCode::Tab | KeyCode::Down => {
                if let Some(form) = self.edit_form.as_mut() {
                    form.next();
                }
                self.mark_dirty();
            }
            KeyCode::BackTab | KeyCode::Up => {
                if let Some(form) = self.edit_form.as_mut() {
                    form.previous();
                }
                self.mark_dirty();
            }
            KeyCode::Backspace => {
                if let Some(form) = self.edit_form.as_mut() {
                    form.backspace();
                }
                self.mark_dirty();
            }
            KeyCode::Delete => {
                if let Some(form) = self.edit_form.as_mut() {
                    form.clear_active();
                }
                self.mark_dirty();
            }
            KeyCode::Enter => {
                let target = self.edit_form.as_ref().map(|form| form.enter_target());
                match target {
                    Some(FormTarget::Field) => {
                        if let Some(form) = self.edit_form.as_mut() {
                            form.next();
                        }
                    }
                    Some(FormTarget::Submit) => self.submit_edit_form(),
                    _ => {}
                }
                self.mark_dirty();
            }
            KeyCode::Char(ch) => {
                if let Some(form) = self.edit_form.as_mut() {
                    form.insert_char(ch);
                }
                self.mark_dirty();
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_composer_key(&mut self, code: KeyCode) -> Result<bool> {
        match code {
            KeyCode::Esc => {
                self.comment_composer.cancel();
                self.tweet_composer.cancel();
                self.mark_dirty();
            }
            KeyCode::Enter => self.submit_composer(),
            KeyCode::Backspace => {
                if let Some(composer) = self.active_composer_mut() {
                    composer.buffer.pop();
                }
                self.mark_dirty();
            }
            KeyCode::Char(ch) => {
                if let Some(composer) = self.active_composer_mut() {
                    composer.buffer.push(ch);
                }
                self.mark_dirty();
            }
            _ => {}
        }
        Ok(false)
    }

    fn active_composer_mut(&mut self) -> Option<&mut Composer> {
        if self.comment_composer.active {
            Some(&mut self.comment_composer)
        } else if self.tweet_composer.active {
            Some(&mut self.tweet_composer)
        } else {
            None
        }
    }

    fn move_selection(&mut self, delta: i32) {
        match self.screen {
            Screen::Home => {
                if self.thread_focused {
                    self.thread_selected =
                        step(self.thread_selected, delta, self.thread.items().len());
                } else {
                    self.home_selected =
                        step(self.home_selected, delta, self.home_videos.items().len());
                }
            }
            Screen::Dashboard => {
                self.channel_selected = step(
                    self.channel_selected,
                    delta,
                    self.channel_videos.items().len(),
                );
            }
            Screen::Tweets => {
                self.tweet_selected = step(self.tweet_selected, delta, self.tweets.items().len());
            }
            _ => {}
        }
        self.mark_dirty();
    }

    fn go_next_page(&mut self, view: View) {
        let target = match view {
            View::Home => self.home_videos.next_target(),
            View::Dashboard => self.channel_videos.next_target(),
            View::Tweets => self.tweets.next_target(),
            View::Form => None,
        };
        match target {
            Some(page) => {
                if view == View::Tweets {
                    self.queue_tweets_fetch();
                } else {
                    self.queue_videos_fetch(view, page);
                }
            }
            None => {
                self.status_message = "Already on the last page.".to_string();
                self.mark_dirty();
            }
        }
    }

    fn go_prev_page(&mut self, view: View) {
        let target = match view {
            View::Home => self.home_videos.prev_target(),
            View::Dashboard => self.channel_videos.prev_target(),
            View::Tweets => self.tweets.prev_target(),
            View::Form => None,
        };
        match target {
            Some(page) => {
                if view == View::Tweets {
                    self.queue_tweets_fetch();
                } else {
                    self.queue_videos_fetch(view, page);
                }
            }
            None => {
                self.status_message = "Already on the first page.".to_string();
                self.mark_dirty();
            }
        }
    }

    fn toggle_mode(&mut self, view: View, mode: Mode) {
        if view == View::Tweets && !self.is_authenticated() {
            self.set_notice(Notice::info("Sign in to manage tweets."));
            return;
        }
        let selector = self.selector_mut(view);
        if selector.mode() == mode {
            selector.exit_mode();
            self.status_message = match view {
                View::Dashboard => screen_hint(Screen::Dashboard).to_string(),
                _ => screen_hint(Screen::Tweets).to_string(),
            };
        } else {
            match mode {
                Mode::UpdateSelect => selector.enter_update_mode(),
                Mode::DeleteSelect => selector.enter_delete_mode(),
                Mode::Browse => selector.exit_mode(),
            }
            self.status_message = match mode {
                Mode::UpdateSelect => "Update mode: Enter picks the item to edit, Esc leaves.",
                Mode::DeleteSelect => "Delete mode: Enter deletes the picked item, Esc leaves.",
                Mode::Browse => "",
            }
            .to_string();
        }
        self.mark_dirty();
    }

    fn handle_list_select(&mut self, view: View) {
        let id = match view {
            View::Home => self
                .home_videos
                .items()
                .get(self.home_selected)
                .map(|v| v.id.clone()),
            View::Dashboard => self
                .channel_videos
                .items()
                .get(self.channel_selected)
                .map(|v| v.id.clone()),
            View::Tweets => self
                .tweets
                .items()
                .get(self.tweet_selected)
                .map(|t| t.id.clone()),
            View::Form => None,
        };
        let Some(id) = id else {
            return;
        };
        let outcome = self.selector_mut(view).select(&id);
        self.handle_select_outcome(view, outcome);
    }

    fn handle_select_outcome(&mut self, view: View, outcome: SelectOutcome) {
        match outcome {
            SelectOutcome::Played(id) => match view {
                View::Home | View::Dashboard => self.start_playback(view, &id),
                _ => self.mark_dirty(),
            },
            SelectOutcome::Stopped => {
                self.mark_dirty();
            }
            SelectOutcome::EditRequested(id) => match view {
                View::Dashboard => self.open_edit_form(&id),
                View::Tweets => self.start_tweet_edit(&id),
                _ => {}
            },
            SelectOutcome::DeleteRequested(id) => match view {
                View::Dashboard => {
                    let service = self.video_service.clone();
                    let target = id.clone();
                    self.queue_mutation(View::Dashboard, MutationKind::DeleteVideo, move || {
                        service.delete(&target)
                    });
                }
                View::Tweets => {
                    let service = self.tweet_service.clone();
                    let target = id.clone();
                    self.queue_mutation(View::Tweets, MutationKind::DeleteTweet, move || {
                        service.delete(&target)
                    });
                }
                _ => {}
            },
        }
    }

    fn start_playback(&mut self, view: View, id: &str) {
        let video = match view {
            View::Home => self
                .home_videos
                .items()
                .iter()
                .find(|v| v.id == id)
                .cloned(),
            View::Dashboard => self
                .channel_videos
                .items()
                .iter()
                .find(|v| v.id == id)
                .cloned(),
            _ => None,
        };
        let Some(video) = video else {
            return;
        };
        if video.video_file.trim().is_empty() {
            self.set_notice(Notice::error("No playable source for this video."));
            return;
        }
        if cfg!(test) {
            self.set_notice(Notice::success(format!("Playing {}.", video.title)));
            return;
        }
        let launch = player::LaunchOptions {
            command: &self.player.video_command,
            url: &video.video_file,
            title: &video.title,
            detach: self.player.video_detach,
        };
        match player::spawn_player(launch) {
            Ok(()) => {
                let suffix = if copy_to_clipboard(&video.video_file) {
                    ", URL copied"
                } else {
                    ""
                };
                self.set_notice(Notice::success(format!(
                    "Playing {}{suffix}.",
                    video.title
                )));
            }
            Err(err) => self.set_notice(Notice::error(format!("Player failed: {err}"))),
        }
    }

    fn open_in_browser(&mut self, view: View) {
        let target = match view {
            View::Home => self.home_videos.items().get(self.home_selected),
            View::Dashboard => self.channel_videos.items().get(self.channel_selected),
            _ => None,
        }
        .map(|video| (video.video_file.clone(), video.title.clone()));
        let Some((url, title)) = target else {
            return;
        };
        if url.trim().is_empty() {
            self.set_notice(Notice::error("No playable source for this video."));
            return;
        }
        if cfg!(test) || webbrowser::open(&url).is_ok() {
            self.set_notice(Notice::info(format!("Opened {title} in the browser.")));
        } else {
            self.set_notice(Notice::error("Couldn't open the browser."));
        }
    }

    fn toggle_thread(&mut self) {
        let Some(id) = self
            .home_videos
            .items()
            .get(self.home_selected)
            .map(|v| v.id.clone())
        else {
            return;
        };
        if self.thread.parent() == Some(id.as_str()) {
            self.home_selector.close_thread();
            self.thread.close();
            self.thread_focused = false;
            self.mark_dirty();
            return;
        }
        if !self.home_selector.open_thread(&id) {
            self.set_notice(Notice::info("Finish the pending edit or delete first."));
            return;
        }
        let request = self.thread.open(&id);
        self.thread_selected = 0;
        self.queue_thread_fetch(request, id);
        self.mark_dirty();
    }

    fn toggle_like_current(&mut self) {
        if !self.is_authenticated() {
            self.set_notice(Notice::info("Sign in to like videos and comments."));
            return;
        }
        if self.thread_focused {
            let Some(comment_id) = self
                .thread
                .items()
                .get(self.thread_selected)
                .map(|c| c.id.clone())
            else {
                return;
            };
            let service = self.like_service.clone();
            self.queue_mutation(View::Home, MutationKind::LikeComment, move || {
                service.toggle_comment(&comment_id)
            });
        } else {
            let Some(video_id) = self
                .home_videos
                .items()
                .get(self.home_selected)
                .map(|v| v.id.clone())
            else {
                return;
            };
            let service = self.like_service.clone();
            self.queue_mutation(View::Home, MutationKind::LikeVideo, move || {
                service.toggle_video(&video_id)
            });
        }
    }

    fn start_comment_compose(&mut self) {
        if !self.thread.is_open() {
            self.set_notice(Notice::info("Open a comment thread first (c)."));
            return;
        }
        if !self.is_authenticated() {
            self.set_notice(Notice::info("Sign in to comment."));
            return;
        }
        self.comment_composer.start();
        self.mark_dirty();
    }

    fn start_comment_edit(&mut self) {
        if !self.thread_focused {
            return;
        }
        if !self.is_authenticated() {
            self.set_notice(Notice::info("Sign in to edit comments."));
            return;
        }
        let Some((id, content)) = self
            .thread
            .items()
            .get(self.thread_selected)
            .map(|c| (c.id.clone(), c.content.clone()))
        else {
            return;
        };
        self.comment_composer.start_edit(&id, &content);
        self.mark_dirty();
    }

    fn delete_selected_comment(&mut self) {
        if !self.thread_focused {
            return;
        }
        if !self.is_authenticated() {
            self.set_notice(Notice::info("Sign in to delete comments."));
            return;
        }
        let Some(comment_id) = self
            .thread
            .items()
            .get(self.thread_selected)
            .map(|c| c.id.clone())
        else {
            return;
        };
        let service = self.comment_service.clone();
        self.queue_mutation(View::Home, MutationKind::DeleteComment, move || {
            service.delete(&comment_id)
        });
    }

    fn start_tweet_compose(&mut self) {
        if !self.is_authenticated() {
            self.set_notice(Notice::info("Sign in to post tweets."));
            return;
        }
        self.tweet_composer.start();
        self.mark_dirty();
    }

    fn start_tweet_edit(&mut self, id: &str) {
        let Some(content) = self
            .tweets
            .items()
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.content.clone())
        else {
            self.set_notice(Notice::error("That tweet is no longer listed."));
            return;
        };
        self.tweet_composer.start_edit(id, &content);
        self.mark_dirty();
    }

    fn submit_composer(&mut self) {
        if self.comment_composer.active {
            let content = self.comment_composer.buffer.trim().to_string();
            if content.is_empty() {
                self.set_notice(Notice::info("Nothing to post."));
                return;
            }
            match self.comment_composer.editing.clone() {
                Some(comment_id) => {
                    let service = self.comment_service.clone();
                    self.queue_mutation(View::Home, MutationKind::UpdateComment, move || {
                        service.update(&comment_id, &content)
                    });
                }
                None => {
                    let Some(video_id) = self.thread.parent().map(|s| s.to_string()) else {
                        return;
                    };
                    let service = self.comment_service.clone();
                    self.queue_mutation(View::Home, MutationKind::AddComment, move || {
                        service.add(&video_id, &content)
                    });
                }
            }
        } else if self.tweet_composer.active {
            let content = self.tweet_composer.buffer.trim().to_string();
            if content.is_empty() {
                self.set_notice(Notice::info("Nothing to post."));
                return;
            }
            match self.tweet_composer.editing.clone() {
                Some(tweet_id) => {
                    let service = self.tweet_service.clone();
                    self.queue_mutation(View::Tweets, MutationKind::UpdateTweet, move || {
                        service.update(&tweet_id, &content)
                    });
                }
                None => {
                    let service = self.tweet_service.clone();
                    self.queue_mutation(View::Tweets, MutationKind::AddTweet, move || {
                        service.add(&content)
                    });
                }
            }
        }
    }

    fn open_edit_form(&mut self, id: &str) {
        let Some((title, description)) = self
            .channel_videos
            .items()
            .iter()
            .find(|v| v.id == id)
            .map(|v| (v.title.clone(), v.description.clone()))
        else {
            self.set_notice(Notice::error("That video is no longer on this page."));
            return;
        };
        self.draft = Some(Draft::from_fields(&title, &description));
        self.edit_form = Some(Form::edit_video(&title, &description));
        self.mark_dirty();
    }

    fn submit_edit_form(&mut self) {
        let Some(id) = self.channel_selector.editing().map(|s| s.to_string()) else {
            self.set_notice(Notice::error("No video selected for update."));
            return;
        };
        let (title, description, thumbnail) = match self.edit_form.as_ref() {
            Some(form) => (form.value(0), form.value(1), form.value(2)),
            None => return,
        };
        let mut draft = self.draft.take().unwrap_or_default();
        draft.title = title;
        draft.description = description;
        draft.attachment = (!thumbnail.is_empty()).then(|| PathBuf::from(thumbnail));
        let patch = VideoPatch {
            title: draft.title.clone(),
            description: draft.description.clone(),
            thumbnail: draft.attachment.clone(),
        };
        self.draft = Some(draft);
        let service = self.video_service.clone();
        self.queue_mutation(View::Dashboard, MutationKind::UpdateVideo, move || {
            service.update(&id, &patch)
        });
    }

    fn submit_active_form(&mut self) {
        match self.screen {
            Screen::Login => self.submit_login(),
            Screen::Register => self.submit_register(),
            Screen::Upload => self.submit_upload(),
            _ => {}
        }
    }

    fn submit_login(&mut self) {
        let (email, username, password) = match self.form.as_ref() {
            Some(form) => (form.value(0), form.value(1), form.value(2)),
            None => return,
        };
        if password.is_empty() || (email.is_empty() && username.is_empty()) {
            if let Some(form) = self.form.as_mut() {
                form.set_status("Email or username, plus the password, are required.");
            }
            self.mark_dirty();
            return;
        }
        if !self.form_status.begin(MutationKind::Login) {
            self.set_notice(Notice::info("Sign-in already in flight."));
            return;
        }
        let creds = LoginCredentials {
            email,
            username,
            password,
        };
        let service = self.session_service.clone();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let result = service.login(&creds);
            let _ = tx.send(AsyncResponse::Login { result });
        });
        self.mark_dirty();
    }

    fn submit_register(&mut self) {
        let values = match self.form.as_ref() {
            Some(form) => (
                form.value(0),
                form.value(1),
                form.value(2),
                form.value(3),
                form.value(4),
                form.value(5),
            ),
            None => return,
        };
        let (fullname, username, email, password, avatar, cover) = values;
        if fullname.is_empty()
            || username.is_empty()
            || email.is_empty()
            || password.is_empty()
            || avatar.is_empty()
        {
            if let Some(form) = self.form.as_mut() {
                form.set_status("Every field except the cover image is required.");
            }
            self.mark_dirty();
            return;
        }
        let registration = RegisterForm {
            fullname,
            username,
            email,
            password,
            avatar: PathBuf::from(avatar),
            cover_image: (!cover.is_empty()).then(|| PathBuf::from(cover)),
        };
        let service = self.session_service.clone();
        self.queue_mutation(View::Form, MutationKind::Register, move || {
            service.register(&registration)
        });
    }

    fn submit_upload(&mut self) {
        let values = match self.form.as_ref() {
            Some(form) => (form.value(0), form.value(1), form.value(2), form.value(3)),
            None => return,
        };
        let (title, description, video_file, thumbnail) = values;
        if title.is_empty()
            || description.is_empty()
            || video_file.is_empty()
            || thumbnail.is_empty()
        {
            if let Some(form) = self.form.as_mut() {
                form.set_status("Title, description, video file and thumbnail are required.");
            }
            self.mark_dirty();
            return;
        }
        let upload = VideoUpload {
            title,
            description,
            video_file: PathBuf::from(video_file),
            thumbnail: PathBuf::from(thumbnail),
        };
        let service = self.video_service.clone();
        self.queue_mutation(View::Form, MutationKind::Upload, move || {
            service.upload(&upload)
        });
    }

    fn request_logout(&mut self) {
        if !self.is_authenticated() {
            self.set_notice(Notice::info("Not signed in."));
            return;
        }
        let view = self.view_for_screen();
        let service = self.session_service.clone();
        self.queue_mutation(view, MutationKind::Logout, move || service.logout());
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let area = frame.size();
        frame.render_widget(
            Block::default().style(Style::default().bg(COLOR_BG).fg(COLOR_TEXT_PRIMARY)),
            area,
        );

        let mut constraints = vec![Constraint::Length(1)];
        if self.update_notice.is_some() {
            constraints.push(Constraint::Length(1));
        }
        constraints.push(Constraint::Min(3));
        if self.notice.is_some() {
            constraints.push(Constraint::Length(1));
        }
        constraints.push(Constraint::Length(1));
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        let mut index = 0;
        self.draw_header(frame, rows[index]);
        index += 1;
        if let Some(info) = &self.update_notice {
            let banner = Paragraph::new(format!(
                " Update v{} available, see {} ",
                info.version, info.url
            ))
            .style(Style::default().fg(COLOR_BG).bg(COLOR_SUCCESS));
            frame.render_widget(banner, rows[index]);
            index += 1;
        }
        let body = rows[index];
        index += 1;
        match self.screen {
            Screen::Home => self.draw_home(frame, body),
            Screen::Dashboard => self.draw_dashboard(frame, body),
            Screen::Tweets => self.draw_tweets(frame, body),
            Screen::Login | Screen::Register | Screen::Upload => {
                self.draw_form_screen(frame, body)
            }
        }
        if let Some(notice) = &self.notice {
            let color = match notice.severity {
                Severity::Info => COLOR_ACCENT,
                Severity::Success => COLOR_SUCCESS,
                Severity::Error => COLOR_ERROR,
            };
            let line = Paragraph::new(format!(" {} ", notice.message))
                .style(Style::default().fg(color).add_modifier(Modifier::BOLD));
            frame.render_widget(line, rows[index]);
            index += 1;
        }
        self.draw_status(frame, rows[index]);

        if let Some(form) = &self.edit_form {
            let popup = centered_rect(60, 60, area);
            frame.render_widget(Clear, popup);
            draw_form(frame, popup, form);
        }
    }

    fn draw_header(&self, frame: &mut Frame<'_>, area: Rect) {
        let tab = |label: &str, active: bool| {
            if active {
                Span::styled(
                    format!(" {label} "),
                    Style::default()
                        .fg(COLOR_ACCENT)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                Span::styled(
                    format!(" {label} "),
                    Style::default().fg(COLOR_TEXT_SECONDARY),
                )
            }
        };
        let line = Line::from(vec![
            Span::styled(
                " VidTube ",
                Style::default()
                    .fg(COLOR_BG)
                    .bg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            ),
            tab("1 Home", self.screen == Screen::Home),
            tab("2 Tweets", self.screen == Screen::Tweets),
            tab("3 Dashboard", self.screen == Screen::Dashboard),
        ]);
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(10), Constraint::Length(24)])
            .split(area);
        frame.render_widget(Paragraph::new(line), columns[0]);

        let user = match &self.auth_gate {
            AuthGate::Known(AuthStatus::Authenticated(user)) => format!("@{} ", user.username),
            AuthGate::Known(AuthStatus::Anonymous) => "anonymous ".to_string(),
            _ => "checking… ".to_string(),
        };
        frame.render_widget(
            Paragraph::new(user)
                .alignment(Alignment::Right)
                .style(Style::default().fg(COLOR_TEXT_SECONDARY)),
            columns[1],
        );
    }

    fn draw_home(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let constraints = if self.thread.is_open() {
            [
                Constraint::Percentage(34),
                Constraint::Percentage(33),
                Constraint::Percentage(33),
            ]
        } else {
            [
                Constraint::Percentage(45),
                Constraint::Percentage(55),
                Constraint::Percentage(0),
            ]
        };
        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(area);

        let rows: Vec<ListItem<'static>> = self
            .home_videos
            .items()
            .iter()
            .map(|video| video_row(video, &self.home_selector, panes[0].width))
            .collect();
        let title = format!(
            "Videos {}/{}",
            self.home_videos.page(),
            self.home_videos.total_pages()
        );
        let list = List::new(rows)
            .block(pane_block(&title, !self.thread_focused))
            .highlight_style(
                Style::default()
                    .bg(COLOR_PANEL_SELECTED_BG)
                    .add_modifier(Modifier::BOLD),
            );
        self.home_list
            .select(if self.home_videos.items().is_empty() {
                None
            } else {
                Some(self.home_selected)
            });
        frame.render_stateful_widget(list, panes[0], &mut self.home_list);

        let video = self.home_videos.items().get(self.home_selected);
        draw_detail(
            frame,
            panes[1],
            video,
            self.home_selector.playing(),
            self.home_videos.is_loaded(),
        );

        if self.thread.is_open() {
            self.draw_thread(frame, panes[2]);
        }
    }

    fn draw_thread(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let (list_area, input_area) = if self.comment_composer.active {
            let parts = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(3), Constraint::Length(3)])
                .split(area);
            (parts[0], Some(parts[1]))
        } else {
            (area, None)
        };

        let width = list_area.width.saturating_sub(4) as usize;
        let rows: Vec<ListItem<'static>> = self
            .thread
            .items()
            .iter()
            .map(|comment| comment_row(comment, width))
            .collect();
        let title = if self.thread.is_loading() {
            "Comments (loading…)".to_string()
        } else {
            format!("Comments ({})", self.thread.items().len())
        };
        let list = List::new(rows)
            .block(pane_block(&title, self.thread_focused))
            .highlight_style(
                Style::default()
                    .bg(COLOR_PANEL_SELECTED_BG)
                    .add_modifier(Modifier::BOLD),
            );
        self.thread_list.select(if self.thread.items().is_empty() {
            None
        } else {
            Some(self.thread_selected)
        });
        frame.render_stateful_widget(list, list_area, &mut self.thread_list);

        if let Some(input_area) = input_area {
            let label = if self.comment_composer.editing.is_some() {
                "Edit comment"
            } else {
                "New comment"
            };
            let input = Paragraph::new(format!("{}▏", self.comment_composer.buffer))
                .block(pane_block(label, true))
                .style(Style::default().fg(COLOR_TEXT_PRIMARY));
            frame.render_widget(input, input_area);
        }
    }

    fn draw_dashboard(&mut self, frame: &mut Frame<'_>, area: Rect) {
        if !self.is_authenticated() {
            let placeholder = Paragraph::new("Checking authentication…")
                .alignment(Alignment::Center)
                .block(pane_block("Dashboard", false));
            frame.render_widget(placeholder, area);
            return;
        }

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(3)])
            .split(area);

        let stats_line = match &self.stats {
            Some(stats) => format!(
                "Videos {} · Subscribers {} · Views {} · Likes {}",
                stats.total_videos, stats.total_subscribers, stats.total_views, stats.total_likes
            ),
            None if self.stats_loading => "Loading channel stats…".to_string(),
            None => "Channel stats unavailable.".to_string(),
        };
        frame.render_widget(
            Paragraph::new(stats_line)
                .block(pane_block("Channel", false))
                .style(Style::default().fg(COLOR_TEXT_PRIMARY)),
            rows[0],
        );

        let items: Vec<ListItem<'static>> = self
            .channel_videos
            .items()
            .iter()
            .map(|video| video_row(video, &self.channel_selector, rows[1].width))
            .collect();
        let mode_tag = match self.channel_selector.mode() {
            Mode::Browse => "",
            Mode::UpdateSelect => " · update mode",
            Mode::DeleteSelect => " · delete mode",
        };
        let title = format!(
            "My videos {}/{}{}",
            self.channel_videos.page(),
            self.channel_videos.total_pages(),
            mode_tag
        );
        let list = List::new(items)
            .block(pane_block(&title, true))
            .highlight_style(
                Style::default()
                    .bg(COLOR_PANEL_SELECTED_BG)
                    .add_modifier(Modifier::BOLD),
            );
        self.channel_list
            .select(if self.channel_videos.items().is_empty() {
                None
            } else {
                Some(self.channel_selected)
            });
        frame.render_stateful_widget(list, rows[1], &mut self.channel_list);
    }

    fn draw_tweets(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let (list_area, input_area) = if self.tweet_composer.active {
            let parts = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(3), Constraint::Length(3)])
                .split(area);
            (parts[0], Some(parts[1]))
        } else {
            (area, None)
        };

        let width = list_area.width.saturating_sub(4) as usize;
        let items: Vec<ListItem<'static>> = self
            .tweets
            .items()
            .iter()
            .map(|tweet| tweet_row(tweet, &self.tweet_selector, width))
            .collect();
        let mode_tag = match self.tweet_selector.mode() {
            Mode::Browse => "",
            Mode::UpdateSelect => " · update mode",
            Mode::DeleteSelect => " · delete mode",
        };
        let title = format!("Tweets ({}){}", self.tweets.items().len(), mode_tag);
        let list = List::new(items)
            .block(pane_block(&title, true))
            .highlight_style(
                Style::default()
                    .bg(COLOR_PANEL_SELECTED_BG)
                    .add_modifier(Modifier::BOLD),
            );
        self.tweet_list.select(if self.tweets.items().is_empty() {
            None
        } else {
            Some(self.tweet_selected)
        });
        frame.render_stateful_widget(list, list_area, &mut self.tweet_list);

        if let Some(input_area) = input_area {
            let label = if self.tweet_composer.editing.is_some() {
                "Edit tweet"
            } else {
                "New tweet"
            };
            let input = Paragraph::new(format!("{}▏", self.tweet_composer.buffer))
                .block(pane_block(label, true))
                .style(Style::default().fg(COLOR_TEXT_PRIMARY));
            frame.render_widget(input, input_area);
        }
    }

    fn draw_form_screen(&self, frame: &mut Frame<'_>, area: Rect) {
        let popup = centered_rect(56, 70, area);
        if let Some(form) = &self.form {
            draw_form(frame, popup, form);
        }
        if self.screen == Screen::Login {
            let footer = Rect {
                x: area.x,
                y: area.y.saturating_add(area.height.saturating_sub(1)),
                width: area.width,
                height: 1,
            };
            frame.render_widget(
                Paragraph::new(format!("Config: {}", self.config_path))
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(COLOR_TEXT_SECONDARY)),
                footer,
            );
        }
    }

    fn draw_status(&self, frame: &mut Frame<'_>, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(10), Constraint::Length(6)])
            .split(area);
        frame.render_widget(
            Paragraph::new(format!(" {}", self.status_message))
                .style(Style::default().fg(COLOR_TEXT_SECONDARY)),
            columns[0],
        );
        let right = if self.is_loading() {
            format!("{} ", self.spinner.frame())
        } else {
            String::new()
        };
        frame.render_widget(
            Paragraph::new(right)
                .alignment(Alignment::Right)
                .style(Style::default().fg(COLOR_ACCENT)),
            columns[1],
        );
    }
}

fn step(current: usize, delta: i32, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let max = len as i32 - 1;
    (current as i32 + delta).clamp(0, max) as usize
}

fn failure_reason(err: &ApiError) -> String {
    match err {
        ApiError::Unauthorized => "authentication required".to_string(),
        ApiError::Api { message, .. } if !message.trim().is_empty() => message.clone(),
        other => other.to_string(),
    }
}

fn success_message(kind: MutationKind) -> &'static str {
    match kind {
        MutationKind::Upload => "Video uploaded.",
        MutationKind::UpdateVideo => "Video updated.",
        MutationKind::DeleteVideo => "Video deleted.",
        MutationKind::LikeVideo | MutationKind::LikeComment => "Like toggled.",
        MutationKind::AddComment => "Comment posted.",
        MutationKind::UpdateComment => "Comment updated.",
        MutationKind::DeleteComment => "Comment deleted.",
        MutationKind::AddTweet => "Tweet posted.",
        MutationKind::UpdateTweet => "Tweet updated.",
        MutationKind::DeleteTweet => "Tweet deleted.",
        MutationKind::Login => "Signed in.",
        MutationKind::Register => "Registered. Sign in to continue.",
        MutationKind::Logout => "Signed out.",
    }
}

fn screen_hint(screen: Screen) -> &'static str {
    match screen {
        Screen::Home => {
            "j/k move · Enter play · c comments · l like · n/p pages · 3 dashboard · q quit"
        }
        Screen::Dashboard => {
            "u update mode · d delete mode · Enter pick · U upload · n/p pages · o sign out"
        }
        Screen::Tweets => "a compose · u/d manage · j/k move · 1 home · q quit",
        Screen::Login | Screen::Register | Screen::Upload => {
            "Tab fields · Enter submit · Esc back"
        }
    }
}

fn copy_to_clipboard(text: &str) -> bool {
    arboard::Clipboard::new()
        .and_then(|mut clipboard| clipboard.set_text(text.to_string()))
        .is_ok()
}

fn pane_block(title: &str, focused: bool) -> Block<'static> {
    let border = if focused {
        COLOR_BORDER_FOCUSED
    } else {
        COLOR_BORDER_IDLE
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(format!(" {title} "))
        .padding(Padding::horizontal(1))
        .style(Style::default().bg(COLOR_PANEL_BG).fg(COLOR_TEXT_PRIMARY))
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);
    horizontal[1]
}

fn truncate_to_width(text: &str, width: usize) -> String {
    if width == 0 || UnicodeWidthStr::width(text) <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as i64;
    format!("{}:{:02}", total / 60, total % 60)
}

fn format_date(created_at: Option<chrono::DateTime<chrono::Utc>>) -> String {
    created_at
        .map(|date| date.format("%b %e, %Y").to_string())
        .unwrap_or_else(|| "unknown date".to_string())
}

fn owner_name(owner: &Option<api::Owner>) -> String {
    owner
        .as_ref()
        .map(|owner| {
            if owner.username.is_empty() {
                "unknown".to_string()
            } else {
                owner.username.clone()
            }
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn video_row(video: &api::Video, selector: &Selector, width: u16) -> ListItem<'static> {
    let marker = if selector.playing() == Some(video.id.as_str()) {
        "▶ "
    } else if selector.editing() == Some(video.id.as_str()) {
        "✎ "
    } else if selector.deleting() == Some(video.id.as_str()) {
        "✗ "
    } else if selector.thread() == Some(video.id.as_str()) {
        "◆ "
    } else {
        "  "
    };
    let width = width.saturating_sub(4) as usize;
    let title = truncate_to_width(&video.title, width.saturating_sub(2));
    let meta = format!(
        "{} · {} views · {} · {}",
        owner_name(&video.owner),
        video.views,
        format_duration(video.duration),
        format_date(video.created_at),
    );
    ListItem::new(vec![
        Line::from(vec![
            Span::styled(marker, Style::default().fg(COLOR_ACCENT)),
            Span::styled(title, Style::default().fg(COLOR_TEXT_PRIMARY)),
        ]),
        Line::from(Span::styled(
            format!("  {}", truncate_to_width(&meta, width)),
            Style::default().fg(COLOR_TEXT_SECONDARY),
        )),
    ])
}

fn tweet_row(tweet: &api::Tweet, selector: &Selector, width: usize) -> ListItem<'static> {
    let marker = if selector.editing() == Some(tweet.id.as_str()) {
        "✎ "
    } else if selector.deleting() == Some(tweet.id.as_str()) {
        "✗ "
    } else {
        "  "
    };
    let meta = format!(
        "{} · {}",
        owner_name(&tweet.owner),
        format_date(tweet.created_at)
    );
    let mut lines = vec![Line::from(vec![
        Span::styled(marker, Style::default().fg(COLOR_ACCENT)),
        Span::styled(
            truncate_to_width(&meta, width),
            Style::default().fg(COLOR_TEXT_SECONDARY),
        ),
    ])];
    for wrapped in textwrap::wrap(tweet.content.trim(), width.max(8)) {
        lines.push(Line::from(Span::styled(
            format!("  {wrapped}"),
            Style::default().fg(COLOR_TEXT_PRIMARY),
        )));
    }
    ListItem::new(lines)
}

fn comment_row(comment: &api::Comment, width: usize) -> ListItem<'static> {
    let meta = format!(
        "{} · {} likes · {}",
        owner_name(&comment.owner),
        comment.total_likes,
        format_date(comment.created_at)
    );
    let mut lines = vec![Line::from(Span::styled(
        truncate_to_width(&meta, width),
        Style::default().fg(COLOR_TEXT_SECONDARY),
    ))];
    for wrapped in textwrap::wrap(comment.content.trim(), width.max(8)) {
        lines.push(Line::from(Span::styled(
            format!("  {wrapped}"),
            Style::default().fg(COLOR_TEXT_PRIMARY),
        )));
    }
    ListItem::new(lines)
}

fn draw_detail(
    frame: &mut Frame<'_>,
    area: Rect,
    video: Option<&api::Video>,
    playing: Option<&str>,
    loaded: bool,
) {
    let block = pane_block("Details", false);
    let Some(video) = video else {
        let message = if loaded {
            "No videos on this page."
        } else {
            "Loading videos…"
        };
        frame.render_widget(
            Paragraph::new(message)
                .block(block)
                .style(Style::default().fg(COLOR_TEXT_SECONDARY)),
            area,
        );
        return;
    };

    let width = area.width.saturating_sub(4) as usize;
    let mut lines = vec![
        Line::from(Span::styled(
            video.title.clone(),
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!(
                "by {} · {}",
                owner_name(&video.owner),
                format_date(video.created_at)
            ),
            Style::default().fg(COLOR_TEXT_SECONDARY),
        )),
        Line::from(Span::styled(
            format!(
                "{} views · {} likes · {} comments · {}",
                video.views,
                video.total_likes,
                video.total_comments,
                format_duration(video.duration)
            ),
            Style::default().fg(COLOR_TEXT_SECONDARY),
        )),
        Line::from(""),
    ];
    for wrapped in textwrap::wrap(video.description.trim(), width.max(8)) {
        lines.push(Line::from(Span::styled(
            wrapped.to_string(),
            Style::default().fg(COLOR_TEXT_PRIMARY),
        )));
    }
    if playing == Some(video.id.as_str()) {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "▶ Playing in the external player",
            Style::default().fg(COLOR_SUCCESS),
        )));
    }
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn draw_form(frame: &mut Frame<'_>, area: Rect, form: &Form) {
    frame.render_widget(Clear, area);
    let block = pane_block(form.title, true);
    let mut lines = Vec::new();
    for (index, field) in form.fields.iter().enumerate() {
        let active = form.active == index;
        let label_style = if active {
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(COLOR_TEXT_SECONDARY)
        };
        lines.push(Line::from(Span::styled(
            field.label.to_string(),
            label_style,
        )));
        let value = form.display_value(index);
        let value_style = if active {
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .bg(COLOR_PANEL_SELECTED_BG)
        } else {
            Style::default().fg(COLOR_TEXT_PRIMARY)
        };
        let cursor = if active { "▏" } else { "" };
        lines.push(Line::from(Span::styled(
            format!("  {value}{cursor}"),
            value_style,
        )));
        lines.push(Line::from(""));
    }
    let mut buttons = Vec::new();
    for (offset, label) in form.buttons.iter().enumerate() {
        let active = form.active == form.fields.len() + offset;
        let style = if active {
            Style::default()
                .fg(COLOR_BG)
                .bg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(COLOR_TEXT_SECONDARY)
        };
        buttons.push(Span::styled(format!("[ {label} ]"), style));
        buttons.push(Span::raw("  "));
    }
    lines.push(Line::from(buttons));
    if let Some(status) = &form.status {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            status.clone(),
            Style::default().fg(COLOR_ERROR),
        )));
    }
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::data::{
        mock_comment, mock_video, MockCommentService, MockLikeService, MockSessionService,
        MockTweetService, MockVideoService,
    };

    struct Rig {
        session: Arc<MockSessionService>,
        videos: Arc<MockVideoService>,
        comments: Arc<MockCommentService>,
        tweets: Arc<MockTweetService>,
        likes: Arc<MockLikeService>,
    }

    impl Rig {
        fn new(session: MockSessionService) -> Self {
            Self::with_videos(session, MockVideoService::default())
        }

        fn with_videos(session: MockSessionService, videos: MockVideoService) -> Self {
            Self {
                session: Arc::new(session),
                videos: Arc::new(videos),
                comments: Arc::new(MockCommentService::default()),
                tweets: Arc::new(MockTweetService::default()),
                likes: Arc::new(MockLikeService::default()),
            }
        }

        fn model(&self) -> Model {
            Model::new(Options {
                status_message: String::new(),
                session_service: self.session.clone(),
                video_service: self.videos.clone(),
                comment_service: self.comments.clone(),
                tweet_service: self.tweets.clone(),
                like_service: self.likes.clone(),
                player: config::PlayerConfig::default(),
                notice_ttl: Duration::from_millis(2500),
                config_path: "(test)".to_string(),
            })
        }
    }

    fn drain(model: &mut Model) {
        for _ in 0..64 {
            if !model.is_loading() {
                break;
            }
            let message = model
                .response_rx
                .recv_timeout(Duration::from_secs(2))
                .expect("async response");
            model.handle_async_response(message);
        }
        while let Ok(message) = model.response_rx.try_recv() {
            model.handle_async_response(message);
        }
        assert!(!model.is_loading(), "async work left outstanding");
    }

    fn catalog(count: usize) -> Vec<api::Video> {
        (1..=count)
            .map(|i| mock_video(&format!("v{i}"), &format!("Video {i}")))
            .collect()
    }

    #[test]
    fn auth_check_resolves_before_data_fetch_starts() {
        let rig = Rig::new(MockSessionService::signed_in("chai"));
        let mut model = rig.model();
        assert!(rig.videos.calls().is_empty());
        drain(&mut model);
        assert_eq!(rig.session.check_count(), 1);
        assert_eq!(rig.videos.calls(), vec!["videos p1".to_string()]);
    }

    #[test]
    fn anonymous_feed_loads_after_auth_check() {
        let rig = Rig::new(MockSessionService::anonymous());
        let mut model = rig.model();
        drain(&mut model);
        assert_eq!(rig.session.check_count(), 1);
        assert_eq!(rig.videos.calls(), vec!["videos p1".to_string()]);
        assert!(!model.is_authenticated());
    }

    #[test]
    fn anonymous_dashboard_redirects_to_login() {
        let rig = Rig::new(MockSessionService::anonymous());
        let mut model = rig.model();
        drain(&mut model);

        model.handle_key(KeyCode::Char('3')).unwrap();
        drain(&mut model);

        assert_eq!(model.screen, Screen::Login);
        assert!(rig
            .videos
            .calls()
            .iter()
            .all(|call| !call.starts_with("channel_videos")));
    }

    #[test]
    fn delete_refetches_current_page_without_item() {
        let rig = Rig::with_videos(
            MockSessionService::signed_in("chai"),
            MockVideoService::with_videos(catalog(10)),
        );
        let mut model = rig.model();
        drain(&mut model);

        model.handle_key(KeyCode::Char('3')).unwrap();
        drain(&mut model);
        assert_eq!(model.channel_videos.items().len(), 10);

        model.handle_key(KeyCode::Char('d')).unwrap();
        model.handle_key(KeyCode::Char('j')).unwrap();
        model.handle_key(KeyCode::Char('j')).unwrap();
        model.handle_key(KeyCode::Enter).unwrap();
        drain(&mut model);

        let calls = rig.videos.calls();
        assert!(calls.contains(&"delete v3".to_string()));
        assert_eq!(calls.last().unwrap(), "channel_videos p1");
        assert!(model
            .channel_videos
            .items()
            .iter()
            .all(|video| video.id != "v3"));
        assert!(model.channel_selector.action().is_none());
        assert_eq!(model.channel_selector.mode(), Mode::Browse);
    }

    #[test]
    fn second_delete_while_in_flight_is_suppressed() {
        let rig = Rig::with_videos(
            MockSessionService::signed_in("chai"),
            MockVideoService::with_videos(catalog(10)),
        );
        let mut model = rig.model();
        drain(&mut model);
        model.handle_key(KeyCode::Char('3')).unwrap();
        drain(&mut model);

        model.handle_key(KeyCode::Char('d')).unwrap();
        model.handle_key(KeyCode::Char('j')).unwrap();
        model.handle_key(KeyCode::Char('j')).unwrap();
        model.handle_key(KeyCode::Enter).unwrap();
        model.handle_key(KeyCode::Enter).unwrap();
        drain(&mut model);

        let deletes = rig
            .videos
            .calls()
            .iter()
            .filter(|call| call.starts_with("delete"))
            .count();
        assert_eq!(deletes, 1);
    }

    #[test]
    fn page_two_edit_refetches_page_two() {
        let rig = Rig::with_videos(
            MockSessionService::signed_in("chai"),
            MockVideoService::with_videos(catalog(25)),
        );
        let mut model = rig.model();
        drain(&mut model);
        model.handle_key(KeyCode::Char('3')).unwrap();
        drain(&mut model);

        model.handle_key(KeyCode::Char('n')).unwrap();
        drain(&mut model);
        assert_eq!(model.channel_videos.page(), 2);
        assert_eq!(model.channel_videos.items()[0].id, "v11");

        model.handle_key(KeyCode::Char('u')).unwrap();
        model.handle_key(KeyCode::Enter).unwrap();
        assert!(model.edit_form.is_some());
        assert_eq!(model.channel_selector.editing(), Some("v11"));

        model.handle_key(KeyCode::Char('!')).unwrap();
        model.handle_key(KeyCode::Tab).unwrap();
        model.handle_key(KeyCode::Tab).unwrap();
        model.handle_key(KeyCode::Tab).unwrap();
        model.handle_key(KeyCode::Enter).unwrap();
        drain(&mut model);

        let calls = rig.videos.calls();
        assert!(calls.contains(&"update v11".to_string()));
        assert_eq!(calls.last().unwrap(), "channel_videos p2");
        assert_eq!(model.channel_videos.page(), 2);
        assert!(model.edit_form.is_none());
        assert!(model.draft.is_none());
        assert_eq!(model.channel_selector.mode(), Mode::Browse);
    }

    #[test]
    fn failed_update_keeps_draft_and_selection() {
        let rig = Rig::with_videos(
            MockSessionService::signed_in("chai"),
            MockVideoService::with_videos(catalog(10)),
        );
        let mut model = rig.model();
        drain(&mut model);
        model.handle_key(KeyCode::Char('3')).unwrap();
        drain(&mut model);

        model.handle_key(KeyCode::Char('u')).unwrap();
        model.handle_key(KeyCode::Enter).unwrap();
        rig.videos.fail_next(ApiError::Api {
            status: 400,
            message: "title is required".into(),
        });
        model.handle_key(KeyCode::Tab).unwrap();
        model.handle_key(KeyCode::Tab).unwrap();
        model.handle_key(KeyCode::Tab).unwrap();
        model.handle_key(KeyCode::Enter).unwrap();
        drain(&mut model);

        assert!(model.edit_form.is_some());
        assert!(model.draft.is_some());
        assert_eq!(model.channel_selector.editing(), Some("v1"));
        assert!(matches!(
            model.channel_status,
            ActionStatus::Failed(MutationKind::UpdateVideo, _)
        ));
        let notice = model.notice.as_ref().expect("failure notice");
        assert!(notice.message.contains("title is required"));
    }

    #[test]
    fn comment_like_refetches_only_the_thread() {
        let rig = Rig {
            session: Arc::new(MockSessionService::signed_in("chai")),
            videos: Arc::new(MockVideoService::default()),
            comments: Arc::new(MockCommentService::with_thread(
                "v1",
                vec![mock_comment("c1", "first"), mock_comment("c2", "second")],
            )),
            tweets: Arc::new(MockTweetService::default()),
            likes: Arc::new(MockLikeService::default()),
        };
        let mut model = rig.model();
        drain(&mut model);

        model.handle_key(KeyCode::Char('c')).unwrap();
        drain(&mut model);
        assert_eq!(model.thread.items().len(), 2);

        model.handle_key(KeyCode::Tab).unwrap();
        model.handle_key(KeyCode::Char('l')).unwrap();
        drain(&mut model);

        assert_eq!(rig.likes.calls(), vec!["comment c1".to_string()]);
        assert_eq!(
            rig.comments.calls(),
            vec!["for_video v1".to_string(), "for_video v1".to_string()]
        );
        assert_eq!(rig.videos.calls(), vec!["videos p1".to_string()]);
    }

    #[test]
    fn video_like_refetches_the_page() {
        let rig = Rig::new(MockSessionService::signed_in("chai"));
        let mut model = rig.model();
        drain(&mut model);

        model.handle_key(KeyCode::Char('l')).unwrap();
        drain(&mut model);

        assert_eq!(rig.likes.calls(), vec!["video v1".to_string()]);
        assert_eq!(
            rig.videos.calls(),
            vec!["videos p1".to_string(), "videos p1".to_string()]
        );
    }

    #[test]
    fn anonymous_like_prompts_sign_in() {
        let rig = Rig::new(MockSessionService::anonymous());
        let mut model = rig.model();
        drain(&mut model);

        model.handle_key(KeyCode::Char('l')).unwrap();
        drain(&mut model);

        assert!(rig.likes.calls().is_empty());
        let notice = model.notice.as_ref().expect("sign-in prompt");
        assert!(notice.message.contains("Sign in"));
    }

    #[test]
    fn anonymous_thread_is_read_only() {
        let rig = Rig {
            session: Arc::new(MockSessionService::anonymous()),
            videos: Arc::new(MockVideoService::default()),
            comments: Arc::new(MockCommentService::with_thread(
                "v1",
                vec![mock_comment("c1", "first")],
            )),
            tweets: Arc::new(MockTweetService::default()),
            likes: Arc::new(MockLikeService::default()),
        };
        let mut model = rig.model();
        drain(&mut model);

        model.handle_key(KeyCode::Char('c')).unwrap();
        drain(&mut model);
        assert_eq!(model.thread.items().len(), 1);

        model.handle_key(KeyCode::Char('a')).unwrap();
        assert!(!model.comment_composer.active);
        let notice = model.notice.as_ref().expect("sign-in prompt");
        assert!(notice.message.contains("Sign in"));
    }

    #[test]
    fn tweets_have_a_single_page() {
        let rig = Rig::new(MockSessionService::anonymous());
        let mut model = rig.model();
        drain(&mut model);

        model.handle_key(KeyCode::Char('2')).unwrap();
        drain(&mut model);
        assert_eq!(rig.tweets.calls(), vec!["tweets".to_string()]);

        model.handle_key(KeyCode::Char('n')).unwrap();
        model.handle_key(KeyCode::Char('p')).unwrap();
        drain(&mut model);

        assert_eq!(rig.tweets.calls(), vec!["tweets".to_string()]);
        assert_eq!(model.tweets.page(), 1);
    }

    #[test]
    fn login_flow_lands_on_dashboard() {
        let rig = Rig::new(MockSessionService::anonymous());
        let mut model = rig.model();
        drain(&mut model);

        model.handle_key(KeyCode::Char('i')).unwrap();
        assert_eq!(model.screen, Screen::Login);

        for ch in "chai@example.com".chars() {
            model.handle_key(KeyCode::Char(ch)).unwrap();
        }
        model.handle_key(KeyCode::Tab).unwrap();
        for ch in "chai".chars() {
            model.handle_key(KeyCode::Char(ch)).unwrap();
        }
        model.handle_key(KeyCode::Tab).unwrap();
        for ch in "secret".chars() {
            model.handle_key(KeyCode::Char(ch)).unwrap();
        }
        model.handle_key(KeyCode::Tab).unwrap();
        model.handle_key(KeyCode::Enter).unwrap();
        drain(&mut model);

        assert_eq!(model.screen, Screen::Dashboard);
        assert!(model.is_authenticated());
        assert_eq!(model.current_username(), Some("chai"));
        assert!(rig
            .videos
            .calls()
            .iter()
            .any(|call| call.starts_with("channel_videos")));
    }

    #[test]
    fn playback_toggles_through_selection() {
        let rig = Rig::new(MockSessionService::signed_in("chai"));
        let mut model = rig.model();
        drain(&mut model);

        model.handle_key(KeyCode::Enter).unwrap();
        assert_eq!(model.home_selector.playing(), Some("v1"));

        model.handle_key(KeyCode::Enter).unwrap();
        assert_eq!(model.home_selector.playing(), None);
    }

    #[test]
    fn expired_notice_is_cleared_on_tick() {
        let rig = Rig::new(MockSessionService::anonymous());
        let mut model = rig.model();
        drain(&mut model);

        model.notice = Some(Notice {
            severity: Severity::Info,
            message: "old".into(),
            posted_at: Instant::now() - Duration::from_secs(10),
        });
        model.expire_notice();
        assert!(model.notice.is_none());

        model.set_notice(Notice::info("fresh"));
        model.expire_notice();
        assert!(model.notice.is_some());
    }

    #[test]
    fn quit_key_exits() {
        let rig = Rig::new(MockSessionService::anonymous());
        let mut model = rig.model();
        drain(&mut model);
        assert!(model.handle_key(KeyCode::Char('q')).unwrap());
    }
}
