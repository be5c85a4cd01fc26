use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::api::{
    self, ApiError, ChannelStats, Comment, LoginCredentials, RegisterForm, Tweet, User, Video,
    VideoPage, VideoPatch, VideoUpload,
};
use crate::session::{self, AuthStatus};

pub trait SessionService: Send + Sync {
    fn check_auth(&self) -> AuthStatus;
    fn login(&self, creds: &LoginCredentials) -> Result<User, ApiError>;
    fn logout(&self) -> Result<(), ApiError>;
    fn register(&self, form: &RegisterForm) -> Result<(), ApiError>;
}

pub trait VideoService: Send + Sync {
    fn videos(&self, page: u32) -> Result<VideoPage, ApiError>;
    fn channel_videos(&self, page: u32) -> Result<VideoPage, ApiError>;
    fn channel_stats(&self) -> Result<ChannelStats, ApiError>;
    fn upload(&self, upload: &VideoUpload) -> Result<(), ApiError>;
    fn update(&self, id: &str, patch: &VideoPatch) -> Result<(), ApiError>;
    fn delete(&self, id: &str) -> Result<(), ApiError>;
}

pub trait CommentService: Send + Sync {
    fn for_video(&self, video_id: &str) -> Result<Vec<Comment>, ApiError>;
    fn add(&self, video_id: &str, content: &str) -> Result<(), ApiError>;
    fn update(&self, id: &str, content: &str) -> Result<(), ApiError>;
    fn delete(&self, id: &str) -> Result<(), ApiError>;
}

pub trait TweetService: Send + Sync {
    fn tweets(&self) -> Result<Vec<Tweet>, ApiError>;
    fn add(&self, content: &str) -> Result<(), ApiError>;
    fn update(&self, id: &str, content: &str) -> Result<(), ApiError>;
    fn delete(&self, id: &str) -> Result<(), ApiError>;
}

pub trait LikeService: Send + Sync {
    fn toggle_video(&self, video_id: &str) -> Result<(), ApiError>;
    fn toggle_comment(&self, comment_id: &str) -> Result<(), ApiError>;
}

pub struct HttpSessionService {
    manager: Arc<session::Manager>,
    client: Arc<api::Client>,
}

impl HttpSessionService {
    pub fn new(manager: Arc<session::Manager>, client: Arc<api::Client>) -> Self {
        Self { manager, client }
    }
}

impl SessionService for HttpSessionService {
    fn check_auth(&self) -> AuthStatus {
        self.manager.check()
    }

    fn login(&self, creds: &LoginCredentials) -> Result<User, ApiError> {
        self.manager.login(creds)
    }

    fn logout(&self) -> Result<(), ApiError> {
        self.manager.logout()
    }

    fn register(&self, form: &RegisterForm) -> Result<(), ApiError> {
        self.client.register(form)
    }
}

pub struct HttpVideoService {
    client: Arc<api::Client>,
}

impl HttpVideoService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl VideoService for HttpVideoService {
    fn videos(&self, page: u32) -> Result<VideoPage, ApiError> {
        self.client.videos(page)
    }

    fn channel_videos(&self, page: u32) -> Result<VideoPage, ApiError> {
        self.client.channel_videos(page)
    }

    fn channel_stats(&self) -> Result<ChannelStats, ApiError> {
        self.client.channel_stats()
    }

    fn upload(&self, upload: &VideoUpload) -> Result<(), ApiError> {
        self.client.upload_video(upload)
    }

    fn update(&self, id: &str, patch: &VideoPatch) -> Result<(), ApiError> {
        self.client.update_video(id, patch)
    }

    fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete_video(id)
    }
}

pub struct HttpCommentService {
    client: Arc<api::Client>,
}

impl HttpCommentService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl CommentService for HttpCommentService {
    fn for_video(&self, video_id: &str) -> Result<Vec<Comment>, ApiError> {
        self.client.video_comments(video_id)
    }

    fn add(&self, video_id: &str, content: &str) -> Result<(), ApiError> {
        self.client.add_comment(video_id, content)
    }

    fn update(&self, id: &str, content: &str) -> Result<(), ApiError> {
        self.client.update_comment(id, content)
    }

    fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete_comment(id)
    }
}

pub struct HttpTweetService {
    client: Arc<api::Client>,
}

impl HttpTweetService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl TweetService for HttpTweetService {
    fn tweets(&self) -> Result<Vec<Tweet>, ApiError> {
        self.client.tweets()
    }

    fn add(&self, content: &str) -> Result<(), ApiError> {
        self.client.add_tweet(content)
    }

    fn update(&self, id: &str, content: &str) -> Result<(), ApiError> {
        self.client.update_tweet(id, content)
    }

    fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete_tweet(id)
    }
}

pub struct HttpLikeService {
    client: Arc<api::Client>,
}

impl HttpLikeService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl LikeService for HttpLikeService {
    fn toggle_video(&self, video_id: &str) -> Result<(), ApiError> {
        self.client.toggle_video_like(video_id)
    }

    fn toggle_comment(&self, comment_id: &str) -> Result<(), ApiError> {
        self.client.toggle_comment_like(comment_id)
    }
}

/// Canned in-memory backend. Mutations edit the shared catalog so the pages
/// served after a write reflect it, the way the live server would.
pub struct MockVideoService {
    catalog: Mutex<Vec<Video>>,
    page_size: usize,
    fail_next: Mutex<Option<ApiError>>,
    calls: Mutex<Vec<String>>,
}

impl Default for MockVideoService {
    fn default() -> Self {
        Self::with_videos(vec![
            mock_video("v1", "Getting started"),
            mock_video("v2", "Second upload"),
        ])
    }
}

impl MockVideoService {
    pub fn with_videos(videos: Vec<Video>) -> Self {
        Self {
            catalog: Mutex::new(videos),
            page_size: 10,
            fail_next: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn fail_next(&self, err: ApiError) {
        *self.fail_next.lock() = Some(err);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn page(&self, page: u32) -> VideoPage {
        let catalog = self.catalog.lock();
        let total_pages = ((catalog.len() + self.page_size - 1) / self.page_size).max(1) as u32;
        let start = (page.saturating_sub(1) as usize) * self.page_size;
        let videos = catalog
            .iter()
            .skip(start)
            .take(self.page_size)
            .cloned()
            .collect();
        VideoPage {
            videos,
            page,
            total_pages,
        }
    }

    fn take_failure(&self) -> Option<ApiError> {
        self.fail_next.lock().take()
    }
}

impl VideoService for MockVideoService {
    fn videos(&self, page: u32) -> Result<VideoPage, ApiError> {
        self.calls.lock().push(format!("videos p{page}"));
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        Ok(self.page(page))
    }

    fn channel_videos(&self, page: u32) -> Result<VideoPage, ApiError> {
        self.calls.lock().push(format!("channel_videos p{page}"));
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        Ok(self.page(page))
    }

    fn channel_stats(&self) -> Result<ChannelStats, ApiError> {
        self.calls.lock().push("channel_stats".into());
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        let total_videos = self.catalog.lock().len() as i64;
        Ok(ChannelStats {
            total_videos,
            total_subscribers: 12,
            total_views: 345,
            total_likes: 67,
        })
    }

    fn upload(&self, upload: &VideoUpload) -> Result<(), ApiError> {
        self.calls.lock().push(format!("upload {}", upload.title));
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        let mut catalog = self.catalog.lock();
        let id = format!("v{}", catalog.len() + 1);
        catalog.push(mock_video(&id, &upload.title));
        Ok(())
    }

    fn update(&self, id: &str, patch: &VideoPatch) -> Result<(), ApiError> {
        self.calls.lock().push(format!("update {id}"));
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        let mut catalog = self.catalog.lock();
        match catalog.iter_mut().find(|video| video.id == id) {
            Some(video) => {
                video.title = patch.title.clone();
                video.description = patch.description.clone();
                Ok(())
            }
            None => Err(ApiError::Api {
                status: 404,
                message: "video not found".into(),
            }),
        }
    }

    fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.calls.lock().push(format!("delete {id}"));
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        self.catalog.lock().retain(|video| video.id != id);
        Ok(())
    }
}

pub struct MockSessionService {
    user: Mutex<Option<User>>,
    checks: Mutex<u32>,
}

impl MockSessionService {
    pub fn anonymous() -> Self {
        Self {
            user: Mutex::new(None),
            checks: Mutex::new(0),
        }
    }

    pub fn signed_in(username: &str) -> Self {
        Self {
            user: Mutex::new(Some(mock_user(username))),
            checks: Mutex::new(0),
        }
    }

    pub fn check_count(&self) -> u32 {
        *self.checks.lock()
    }
}

impl SessionService for MockSessionService {
    fn check_auth(&self) -> AuthStatus {
        *self.checks.lock() += 1;
        match self.user.lock().clone() {
            Some(user) => AuthStatus::Authenticated(user),
            None => AuthStatus::Anonymous,
        }
    }

    fn login(&self, creds: &LoginCredentials) -> Result<User, ApiError> {
        if creds.password.is_empty() {
            return Err(ApiError::Api {
                status: 400,
                message: "password is required".into(),
            });
        }
        let user = mock_user(&creds.username);
        *self.user.lock() = Some(user.clone());
        Ok(user)
    }

    fn logout(&self) -> Result<(), ApiError> {
        *self.user.lock() = None;
        Ok(())
    }

    fn register(&self, _form: &RegisterForm) -> Result<(), ApiError> {
        Ok(())
    }
}

pub struct MockCommentService {
    threads: Mutex<HashMap<String, Vec<Comment>>>,
    fail_next: Mutex<Option<ApiError>>,
    calls: Mutex<Vec<String>>,
}

impl Default for MockCommentService {
    fn default() -> Self {
        Self {
            threads: Mutex::new(HashMap::new()),
            fail_next: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl MockCommentService {
    pub fn with_thread(video_id: &str, comments: Vec<Comment>) -> Self {
        let service = Self::default();
        service.threads.lock().insert(video_id.to_string(), comments);
        service
    }

    pub fn fail_next(&self, err: ApiError) {
        *self.fail_next.lock() = Some(err);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn take_failure(&self) -> Option<ApiError> {
        self.fail_next.lock().take()
    }
}

impl CommentService for MockCommentService {
    fn for_video(&self, video_id: &str) -> Result<Vec<Comment>, ApiError> {
        self.calls.lock().push(format!("for_video {video_id}"));
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        Ok(self
            .threads
            .lock()
            .get(video_id)
            .cloned()
            .unwrap_or_default())
    }

    fn add(&self, video_id: &str, content: &str) -> Result<(), ApiError> {
        self.calls.lock().push(format!("add {video_id}"));
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        let mut threads = self.threads.lock();
        let thread = threads.entry(video_id.to_string()).or_default();
        let id = format!("c{}", thread.len() + 1);
        thread.push(mock_comment(&id, content));
        Ok(())
    }

    fn update(&self, id: &str, content: &str) -> Result<(), ApiError> {
        self.calls.lock().push(format!("update {id}"));
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        let mut threads = self.threads.lock();
        for thread in threads.values_mut() {
            if let Some(comment) = thread.iter_mut().find(|comment| comment.id == id) {
                comment.content = content.to_string();
                return Ok(());
            }
        }
        Err(ApiError::Api {
            status: 404,
            message: "comment not found".into(),
        })
    }

    fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.calls.lock().push(format!("delete {id}"));
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        let mut threads = self.threads.lock();
        for thread in threads.values_mut() {
            thread.retain(|comment| comment.id != id);
        }
        Ok(())
    }
}

pub struct MockTweetService {
    tweets: Mutex<Vec<Tweet>>,
    fail_next: Mutex<Option<ApiError>>,
    calls: Mutex<Vec<String>>,
}

impl Default for MockTweetService {
    fn default() -> Self {
        Self::with_tweets(vec![mock_tweet("t1", "hello vidtube")])
    }
}

impl MockTweetService {
    pub fn with_tweets(tweets: Vec<Tweet>) -> Self {
        Self {
            tweets: Mutex::new(tweets),
            fail_next: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_next(&self, err: ApiError) {
        *self.fail_next.lock() = Some(err);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn take_failure(&self) -> Option<ApiError> {
        self.fail_next.lock().take()
    }
}

impl TweetService for MockTweetService {
    fn tweets(&self) -> Result<Vec<Tweet>, ApiError> {
        self.calls.lock().push("tweets".into());
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        Ok(self.tweets.lock().clone())
    }

    fn add(&self, content: &str) -> Result<(), ApiError> {
        self.calls.lock().push("add".into());
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        let mut tweets = self.tweets.lock();
        let id = format!("t{}", tweets.len() + 1);
        tweets.push(mock_tweet(&id, content));
        Ok(())
    }

    fn update(&self, id: &str, content: &str) -> Result<(), ApiError> {
        self.calls.lock().push(format!("update {id}"));
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        let mut tweets = self.tweets.lock();
        match tweets.iter_mut().find(|tweet| tweet.id == id) {
            Some(tweet) => {
                tweet.content = content.to_string();
                Ok(())
            }
            None => Err(ApiError::Api {
                status: 404,
                message: "tweet not found".into(),
            }),
        }
    }

    fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.calls.lock().push(format!("delete {id}"));
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        self.tweets.lock().retain(|tweet| tweet.id != id);
        Ok(())
    }
}

#[derive(Default)]
pub struct MockLikeService {
    fail_next: Mutex<Option<ApiError>>,
    calls: Mutex<Vec<String>>,
}

impl MockLikeService {
    pub fn fail_next(&self, err: ApiError) {
        *self.fail_next.lock() = Some(err);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl LikeService for MockLikeService {
    fn toggle_video(&self, video_id: &str) -> Result<(), ApiError> {
        self.calls.lock().push(format!("video {video_id}"));
        if let Some(err) = self.fail_next.lock().take() {
            return Err(err);
        }
        Ok(())
    }

    fn toggle_comment(&self, comment_id: &str) -> Result<(), ApiError> {
        self.calls.lock().push(format!("comment {comment_id}"));
        if let Some(err) = self.fail_next.lock().take() {
            return Err(err);
        }
        Ok(())
    }
}

pub fn mock_user(username: &str) -> User {
    User {
        id: format!("u_{username}"),
        username: username.to_string(),
        full_name: username.to_string(),
        email: format!("{username}@example.com"),
        ..User::default()
    }
}

pub fn mock_video(id: &str, title: &str) -> Video {
    Video {
        id: id.to_string(),
        title: title.to_string(),
        description: format!("{title} description"),
        video_file: format!("https://cdn.example.com/{id}.mp4"),
        thumbnail: format!("https://cdn.example.com/{id}.jpg"),
        owner: Some(api::Owner {
            id: "u_chai".into(),
            username: "chai".into(),
            full_name: "Chai Aunty".into(),
            avatar: String::new(),
        }),
        ..Video::default()
    }
}

pub fn mock_comment(id: &str, content: &str) -> Comment {
    Comment {
        id: id.to_string(),
        content: content.to_string(),
        owner: Some(api::Owner {
            id: "u_chai".into(),
            username: "chai".into(),
            full_name: "Chai Aunty".into(),
            avatar: String::new(),
        }),
        ..Comment::default()
    }
}

pub fn mock_tweet(id: &str, content: &str) -> Tweet {
    Tweet {
        id: id.to_string(),
        content: content.to_string(),
        owner: Some(api::Owner {
            id: "u_chai".into(),
            username: "chai".into(),
            full_name: "Chai Aunty".into(),
            avatar: String::new(),
        }),
        ..Tweet::default()
    }
}
