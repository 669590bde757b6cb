//! HTTP client for the Flickr REST API.
//!
//! The service speaks loosely-typed JSON: numbers arrive as strings,
//! text fields are sometimes plain and sometimes wrapped in
//! `{"_content": …}`, and arrays vanish when empty. Everything is mapped
//! to typed records here so the rest of the crate never touches a raw
//! payload.

use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use super::MetadataSource;
use crate::domain::{AlbumRecord, CommentRecord, Credentials, PhotoRecord};
use crate::error::{Error, Result};

const BASE_URL: &str = "https://api.flickr.com/services/rest/";
const PAGE_SIZE: u32 = 500;
const PHOTO_EXTRAS: &str = "description,date_upload,date_taken,tags,views,url_t,url_o";
/// Pause between pagination requests, to stay well under the API quota.
const PAGE_PAUSE: Duration = Duration::from_millis(100);

pub struct FlickrClient {
    http: Client,
    api_key: String,
    user_id: String,
    base_url: String,
}

impl FlickrClient {
    pub fn new(credentials: &Credentials) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(transport_error)?;
        Ok(Self {
            http,
            api_key: credentials.api_key.clone(),
            user_id: credentials.user_id.clone(),
            base_url: BASE_URL.to_string(),
        })
    }

    fn call(&self, method: &str, extra: &[(&str, String)]) -> Result<Value> {
        let mut params: Vec<(&str, String)> = vec![
            ("method", method.to_string()),
            ("api_key", self.api_key.clone()),
            ("format", "json".to_string()),
            ("nojsoncallback", "1".to_string()),
        ];
        params.extend_from_slice(extra);

        let resp = self
            .http
            .get(&self.base_url)
            .query(&params)
            .send()
            .map_err(transport_error)?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(Error::RateLimited { retry_after });
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Auth(format!("{method}: HTTP {status}")));
        }
        if !status.is_success() {
            return Err(Error::TransientNetwork(format!("{method}: HTTP {status}")));
        }

        let body: Value = resp
            .json()
            .map_err(|e| Error::MalformedResponse(format!("{method}: {e}")))?;
        check_envelope(body, method)
    }
}

impl MetadataSource for FlickrClient {
    fn list_albums(&self) -> Result<Vec<AlbumRecord>> {
        let mut albums = Vec::new();
        let mut page = 1u32;
        loop {
            let body = self.call(
                "flickr.photosets.getList",
                &[
                    ("user_id", self.user_id.clone()),
                    ("page", page.to_string()),
                    ("per_page", PAGE_SIZE.to_string()),
                ],
            )?;
            let parsed: AlbumsPage = from_body(body, "flickr.photosets.getList")?;
            let pages = parsed.photosets.pages();
            albums.extend(parsed.photosets.photoset.into_iter().map(WireAlbum::into_record));
            if u64::from(page) >= pages {
                break;
            }
            page += 1;
            thread::sleep(PAGE_PAUSE);
        }
        tracing::debug!(count = albums.len(), "fetched remote album listing");
        Ok(albums)
    }

    fn list_photos_since(&self, watermark: i64) -> Result<Vec<PhotoRecord>> {
        let mut photos = Vec::new();
        let mut page = 1u32;
        loop {
            let body = self.call(
                "flickr.people.getPhotos",
                &[
                    ("user_id", self.user_id.clone()),
                    ("min_upload_date", watermark.to_string()),
                    ("extras", PHOTO_EXTRAS.to_string()),
                    ("page", page.to_string()),
                    ("per_page", PAGE_SIZE.to_string()),
                ],
            )?;
            let parsed: PhotosPage = from_body(body, "flickr.people.getPhotos")?;
            let pages = parsed.photos.pages();
            photos.extend(parsed.photos.photo.into_iter().map(WirePhoto::into_record));
            if u64::from(page) >= pages {
                break;
            }
            page += 1;
            thread::sleep(PAGE_PAUSE);
        }
        tracing::debug!(count = photos.len(), watermark, "fetched remote photo listing");
        Ok(photos)
    }

    fn photo_albums(&self, photo_id: &str) -> Result<Vec<String>> {
        let body = self.call(
            "flickr.photos.getAllContexts",
            &[("photo_id", photo_id.to_string())],
        )?;
        let parsed: ContextsPage = from_body(body, "flickr.photos.getAllContexts")?;
        Ok(parsed.set.into_iter().map(|s| s.id).collect())
    }

    fn photo_comments(&self, photo_id: &str) -> Result<Vec<CommentRecord>> {
        let body = self.call(
            "flickr.photos.comments.getList",
            &[("photo_id", photo_id.to_string())],
        )?;
        let parsed: CommentsPage = from_body(body, "flickr.photos.comments.getList")?;
        Ok(parsed
            .comments
            .map(|c| c.comment.into_iter().map(WireComment::into_record).collect())
            .unwrap_or_default())
    }

    fn fetch_thumbnail(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.http.get(url).send().map_err(transport_error)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::TransientNetwork(format!(
                "thumbnail fetch: HTTP {status}"
            )));
        }
        let bytes = resp.bytes().map_err(transport_error)?;
        Ok(bytes.to_vec())
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    Error::TransientNetwork(e.to_string())
}

fn from_body<T: serde::de::DeserializeOwned>(body: Value, method: &str) -> Result<T> {
    serde_json::from_value(body).map_err(|e| Error::MalformedResponse(format!("{method}: {e}")))
}

/// Map the API envelope onto the error taxonomy. Codes 98-100 cover the
/// login/permission/key failures, 105 is the service's own "currently
/// unavailable".
fn check_envelope(body: Value, method: &str) -> Result<Value> {
    match body.get("stat").and_then(Value::as_str) {
        Some("ok") => Ok(body),
        Some(_) => {
            let code = body.get("code").and_then(Value::as_i64).unwrap_or(-1);
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            Err(match code {
                98..=100 => Error::Auth(message),
                105 => Error::TransientNetwork(message),
                _ => Error::Api { code, message },
            })
        }
        None => Err(Error::MalformedResponse(format!(
            "{method}: missing stat field"
        ))),
    }
}

// ── Wire types ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(rename = "_content", default)]
    content: String,
}

/// Text fields arrive either plain or `{"_content": …}` depending on the
/// endpoint.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Text {
    Plain(String),
    Wrapped(Content),
}

impl Text {
    fn into_string(self) -> String {
        match self {
            Text::Plain(s) => s,
            Text::Wrapped(c) => c.content,
        }
    }
}

/// Numeric fields arrive either as JSON numbers or as decimal strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumOrStr {
    Num(i64),
    Str(String),
}

impl NumOrStr {
    fn as_i64(&self) -> Option<i64> {
        match self {
            NumOrStr::Num(n) => Some(*n),
            NumOrStr::Str(s) => s.parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AlbumsPage {
    photosets: AlbumsBody,
}

#[derive(Debug, Deserialize)]
struct AlbumsBody {
    #[serde(default)]
    pages: Option<NumOrStr>,
    #[serde(default)]
    photoset: Vec<WireAlbum>,
}

impl AlbumsBody {
    fn pages(&self) -> u64 {
        self.pages
            .as_ref()
            .and_then(NumOrStr::as_i64)
            .map(|p| p.max(1) as u64)
            .unwrap_or(1)
    }
}

#[derive(Debug, Deserialize)]
struct WireAlbum {
    id: String,
    title: Text,
    #[serde(default)]
    description: Option<Text>,
    #[serde(default)]
    date_create: Option<NumOrStr>,
}

impl WireAlbum {
    fn into_record(self) -> AlbumRecord {
        AlbumRecord {
            id: self.id,
            title: self.title.into_string(),
            description: self.description.map(Text::into_string).unwrap_or_default(),
            created_at: self.date_create.as_ref().and_then(NumOrStr::as_i64),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PhotosPage {
    photos: PhotosBody,
}

#[derive(Debug, Deserialize)]
struct PhotosBody {
    #[serde(default)]
    pages: Option<NumOrStr>,
    #[serde(default)]
    photo: Vec<WirePhoto>,
}

impl PhotosBody {
    fn pages(&self) -> u64 {
        self.pages
            .as_ref()
            .and_then(NumOrStr::as_i64)
            .map(|p| p.max(1) as u64)
            .unwrap_or(1)
    }
}

#[derive(Debug, Deserialize)]
struct WirePhoto {
    id: String,
    #[serde(default)]
    title: Option<Text>,
    #[serde(default)]
    description: Option<Text>,
    #[serde(default)]
    datetaken: Option<String>,
    #[serde(default)]
    dateupload: Option<NumOrStr>,
    #[serde(default)]
    views: Option<NumOrStr>,
    #[serde(default)]
    tags: Option<String>,
    #[serde(default)]
    url_t: Option<String>,
    #[serde(default)]
    url_o: Option<String>,
}

impl WirePhoto {
    fn into_record(self) -> PhotoRecord {
        PhotoRecord {
            id: self.id,
            title: self.title.map(Text::into_string).unwrap_or_default(),
            description: self.description.map(Text::into_string).unwrap_or_default(),
            tags: self
                .tags
                .map(|t| t.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            date_taken: self.datetaken.filter(|s| !s.is_empty()),
            uploaded_at: self.dateupload.as_ref().and_then(NumOrStr::as_i64).unwrap_or(0),
            views: self.views.as_ref().and_then(NumOrStr::as_i64).unwrap_or(0),
            url_thumbnail: self.url_t,
            url_original: self.url_o,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ContextsPage {
    #[serde(default)]
    set: Vec<WireContextSet>,
}

#[derive(Debug, Deserialize)]
struct WireContextSet {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CommentsPage {
    #[serde(default)]
    comments: Option<CommentsBody>,
}

#[derive(Debug, Deserialize)]
struct CommentsBody {
    #[serde(default)]
    comment: Vec<WireComment>,
}

#[derive(Debug, Deserialize)]
struct WireComment {
    id: String,
    #[serde(default)]
    authorname: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(rename = "_content", default)]
    body: String,
    #[serde(default)]
    datecreate: Option<NumOrStr>,
}

impl WireComment {
    fn into_record(self) -> CommentRecord {
        CommentRecord {
            id: self.id,
            author: self.authorname.or(self.author).unwrap_or_default(),
            body: self.body,
            created_at: self
                .datecreate
                .as_ref()
                .and_then(NumOrStr::as_i64)
                .map(|t| t.to_string()),
        }
    }
}
