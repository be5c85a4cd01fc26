use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::cookie::Jar;
use reqwest::header::USER_AGENT;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/";
pub const DEFAULT_PATH_PREFIX: &str = "/api";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not signed in")]
    Unauthorized,
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("read {path}: {source}")]
    File {
        path: String,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub user_agent: String,
    pub base_url: Option<String>,
    pub path_prefix: Option<String>,
    pub timeout: Option<Duration>,
}

pub struct Client {
    http: HttpClient,
    jar: Arc<Jar>,
    user_agent: String,
    base_url: Url,
    path_prefix: String,
}

enum Payload {
    Empty,
    Json(serde_json::Value),
    Multipart(Form),
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("api client user agent required");
        }
        let mut base = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;
        let path_prefix = config
            .path_prefix
            .unwrap_or_else(|| DEFAULT_PATH_PREFIX.to_string());
        let jar = Arc::new(Jar::default());
        let http = HttpClient::builder()
            .timeout(config.timeout.unwrap_or(Duration::from_secs(20)))
            .cookie_provider(jar.clone())
            .build()?;

        Ok(Client {
            http,
            jar,
            user_agent: config.user_agent,
            base_url,
            path_prefix,
        })
    }

    pub fn jar(&self) -> Arc<Jar> {
        self.jar.clone()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn current_user(&self) -> Result<User, ApiError> {
        let resp = self.request(
            Method::GET,
            "/api/v1/users/current-user",
            &[],
            Payload::Empty,
        )?;
        decode(resp)
    }

    pub fn login(&self, creds: &LoginCredentials) -> Result<(), ApiError> {
        let body = json!({
            "email": creds.email,
            "username": creds.username,
            "password": creds.password,
        });
        let resp = self.request(
            Method::POST,
            "/api/v1/users/login",
            &[],
            Payload::Json(body),
        )?;
        ack(resp)
    }

    pub fn logout(&self) -> Result<(), ApiError> {
        let resp = self.request(
            Method::POST,
            "/api/v1/users/logout",
            &[],
            Payload::Json(json!({})),
        )?;
        ack(resp)
    }

    pub fn register(&self, reg: &RegisterForm) -> Result<(), ApiError> {
        let mut form = Form::new()
            .text("fullname", reg.fullname.clone())
            .text("username", reg.username.clone())
            .text("email", reg.email.clone())
            .text("password", reg.password.clone())
            .part("avatar", file_part(&reg.avatar)?);
        if let Some(cover) = reg.cover_image.as_ref() {
            form = form.part("coverImage", file_part(cover)?);
        }
        let resp = self.request(
            Method::POST,
            "/api/v1/users/register",
            &[],
            Payload::Multipart(form),
        )?;
        ack(resp)
    }

    pub fn videos(&self, page: u32) -> Result<VideoPage, ApiError> {
        let resp = self.request(
            Method::GET,
            "/api/v1/videos/getAll",
            &[("page", page.to_string())],
            Payload::Empty,
        )?;
        let data: VideoListData = decode(resp)?;
        Ok(data.into_page(page))
    }

    pub fn channel_videos(&self, page: u32) -> Result<VideoPage, ApiError> {
        let resp = self.request(
            Method::GET,
            "/api/v1/dashboard/videos",
            &[("page", page.to_string())],
            Payload::Empty,
        )?;
        let data: VideoListData = decode(resp)?;
        Ok(data.into_page(page))
    }

    pub fn channel_stats(&self) -> Result<ChannelStats, ApiError> {
        let resp = self.request(Method::GET, "/api/v1/dashboard/stats", &[], Payload::Empty)?;
        decode(resp)
    }

    pub fn upload_video(&self, upload: &VideoUpload) -> Result<(), ApiError> {
        let form = Form::new()
            .text("title", upload.title.clone())
            .text("description", upload.description.clone())
            .part("videoFile", file_part(&upload.video_file)?)
            .part("thumbnail", file_part(&upload.thumbnail)?);
        let resp = self.request(
            Method::POST,
            "/api/v1/videos/upload-video",
            &[],
            Payload::Multipart(form),
        )?;
        ack(resp)
    }

    pub fn update_video(&self, id: &str, patch: &VideoPatch) -> Result<(), ApiError> {
        let mut form = Form::new()
            .text("title", patch.title.clone())
            .text("description", patch.description.clone());
        if let Some(thumbnail) = patch.thumbnail.as_ref() {
            form = form.part("thumbnail", file_part(thumbnail)?);
        }
        let resp = self.request(
            Method::PATCH,
            &format!("/api/v1/videos/updateVideo/{id}"),
            &[],
            Payload::Multipart(form),
        )?;
        ack(resp)
    }

    pub fn delete_video(&self, id: &str) -> Result<(), ApiError> {
        let resp = self.request(
            Method::DELETE,
            &format!("/api/v1/videos/delete/{id}"),
            &[],
            Payload::Empty,
        )?;
        ack(resp)
    }

    pub fn video_comments(&self, video_id: &str) -> Result<Vec<Comment>, ApiError> {
        let resp = self.request(
            Method::GET,
            &format!("/api/v1/comments/getVideoComments/{video_id}"),
            &[],
            Payload::Empty,
        )?;
        let data: CommentListData = decode(resp)?;
        Ok(data.comments)
    }

    pub fn add_comment(&self, video_id: &str, content: &str) -> Result<(), ApiError> {
        let resp = self.request(
            Method::POST,
            &format!("/api/v1/comments/addVideoComment/{video_id}"),
            &[],
            Payload::Json(json!({ "content": content })),
        )?;
        ack(resp)
    }

    pub fn update_comment(&self, id: &str, content: &str) -> Result<(), ApiError> {
        let resp = self.request(
            Method::PATCH,
            &format!("/api/v1/comments/updateComment/{id}"),
            &[],
            Payload::Json(json!({ "content": content })),
        )?;
        ack(resp)
    }

    pub fn delete_comment(&self, id: &str) -> Result<(), ApiError> {
        let resp = self.request(
            Method::DELETE,
            &format!("/api/v1/comments/deleteComment/{id}"),
            &[],
            Payload::Empty,
        )?;
        ack(resp)
    }

    pub fn tweets(&self) -> Result<Vec<Tweet>, ApiError> {
        let resp = self.request(
            Method::GET,
            "/api/v1/tweets/getAllTweets",
            &[],
            Payload::Empty,
        )?;
        let data: TweetListData = decode(resp)?;
        Ok(data.tweets)
    }

    pub fn add_tweet(&self, content: &str) -> Result<(), ApiError> {
        let resp = self.request(
            Method::POST,
            "/api/v1/tweets/addTweet",
            &[],
            Payload::Json(json!({ "content": content })),
        )?;
        ack(resp)
    }

    pub fn update_tweet(&self, id: &str, content: &str) -> Result<(), ApiError> {
        let resp = self.request(
            Method::PATCH,
            &format!("/api/v1/tweets/updateTweet/{id}"),
            &[],
            Payload::Json(json!({ "content": content })),
        )?;
        ack(resp)
    }

    pub fn delete_tweet(&self, id: &str) -> Result<(), ApiError> {
        let resp = self.request(
            Method::DELETE,
            &format!("/api/v1/tweets/deleteTweet/{id}"),
            &[],
            Payload::Empty,
        )?;
        ack(resp)
    }

    pub fn toggle_video_like(&self, video_id: &str) -> Result<(), ApiError> {
        let resp = self.request(
            Method::POST,
            &format!("/api/v1/likes/toggle/v/{video_id}"),
            &[],
            Payload::Json(json!({})),
        )?;
        ack(resp)
    }

    pub fn toggle_comment_like(&self, comment_id: &str) -> Result<(), ApiError> {
        let resp = self.request(
            Method::POST,
            &format!("/api/v1/likes/toggle/c/{comment_id}"),
            &[],
            Payload::Json(json!({})),
        )?;
        ack(resp)
    }

    /// Request paths are written with the routing prefix the web frontend
    /// uses; it is stripped before the path is joined onto the base URL.
    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let trimmed = path
            .strip_prefix(self.path_prefix.as_str())
            .unwrap_or(path);
        let relative = trimmed.trim_start_matches('/');
        Ok(self.base_url.join(relative)?)
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        payload: Payload,
    ) -> Result<Response, ApiError> {
        let mut url = self.endpoint(path)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }

        let mut req = self.http.request(method, url);
        req = req.header(USER_AGENT, self.user_agent.clone());
        req = match payload {
            Payload::Empty => req,
            Payload::Json(body) => req.json(&body),
            Payload::Multipart(form) => req.multipart(form),
        };

        let resp = req.send()?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        let body = resp.text().unwrap_or_default();
        Err(envelope_error(status, &body))
    }
}

fn envelope_error(status: StatusCode, body: &str) -> ApiError {
    let message = match serde_json::from_str::<Envelope<serde_json::Value>>(body) {
        Ok(env) if !env.message.is_empty() => env.message,
        _ => format!("request failed with status {status}"),
    };
    ApiError::Api {
        status: status.as_u16(),
        message,
    }
}

fn decode<T: DeserializeOwned + Default>(resp: Response) -> Result<T, ApiError> {
    let status = resp.status();
    let body = resp.text()?;
    let envelope: Envelope<T> =
        serde_json::from_str(&body).map_err(|err| ApiError::Decode(err.to_string()))?;
    if !envelope.success {
        return Err(ApiError::Api {
            status: status.as_u16(),
            message: nonempty_message(envelope.message),
        });
    }
    envelope
        .data
        .ok_or_else(|| ApiError::Decode("response data missing".into()))
}

fn ack(resp: Response) -> Result<(), ApiError> {
    let status = resp.status();
    let body = resp.text()?;
    let envelope: Envelope<serde_json::Value> =
        serde_json::from_str(&body).map_err(|err| ApiError::Decode(err.to_string()))?;
    if !envelope.success {
        return Err(ApiError::Api {
            status: status.as_u16(),
            message: nonempty_message(envelope.message),
        });
    }
    Ok(())
}

fn nonempty_message(message: String) -> String {
    if message.is_empty() {
        "request failed".into()
    } else {
        message
    }
}

fn file_part(path: &Path) -> Result<Part, ApiError> {
    let bytes = fs::read(path).map_err(|source| ApiError::File {
        path: path.display().to_string(),
        source,
    })?;
    let mime = detect_mime(&bytes).to_string();
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();
    Ok(Part::bytes(bytes).file_name(name).mime_str(&mime)?)
}

fn detect_mime(bytes: &[u8]) -> &'static str {
    let head = &bytes[..bytes.len().min(512)];
    tree_magic_mini::from_u8(head)
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<T>,
}

#[derive(Debug, Clone, Default)]
pub struct LoginCredentials {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub fullname: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub avatar: PathBuf,
    pub cover_image: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct VideoUpload {
    pub title: String,
    pub description: String,
    pub video_file: PathBuf,
    pub thumbnail: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct VideoPatch {
    pub title: String,
    pub description: String,
    pub thumbnail: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct User {
    #[serde(default, rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, rename = "fullName")]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default, rename = "coverImage")]
    pub cover_image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Owner {
    #[serde(default, rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, rename = "fullName")]
    pub full_name: String,
    #[serde(default)]
    pub avatar: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Video {
    #[serde(default, rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "videoFile")]
    pub video_file: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub owner: Option<Owner>,
    #[serde(default, rename = "totalLikes")]
    pub total_likes: i64,
    #[serde(default, rename = "totalComments")]
    pub total_comments: i64,
    #[serde(default, rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Comment {
    #[serde(default, rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub owner: Option<Owner>,
    #[serde(default, rename = "totalLikes")]
    pub total_likes: i64,
    #[serde(default, rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Tweet {
    #[serde(default, rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub owner: Option<Owner>,
    #[serde(default, rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ChannelStats {
    #[serde(default, rename = "totalVideos")]
    pub total_videos: i64,
    #[serde(default, rename = "totalSubscribers")]
    pub total_subscribers: i64,
    #[serde(default, rename = "totalViews")]
    pub total_views: i64,
    #[serde(default, rename = "totalLikes")]
    pub total_likes: i64,
}

#[derive(Debug, Clone, Default)]
pub struct VideoPage {
    pub videos: Vec<Video>,
    pub page: u32,
    pub total_pages: u32,
}

#[derive(Debug, Default, Deserialize)]
struct VideoListData {
    #[serde(default)]
    videos: Vec<Video>,
    #[serde(default, rename = "currentPage")]
    current_page: u32,
    #[serde(default, rename = "totalPages")]
    total_pages: u32,
}

impl VideoListData {
    fn into_page(self, requested: u32) -> VideoPage {
        let page = if self.current_page > 0 {
            self.current_page
        } else {
            requested
        };
        VideoPage {
            videos: self.videos,
            page,
            total_pages: self.total_pages.max(1),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct CommentListData {
    #[serde(default)]
    comments: Vec<Comment>,
}

#[derive(Debug, Default, Deserialize)]
struct TweetListData {
    #[serde(default)]
    tweets: Vec<Tweet>,
}
