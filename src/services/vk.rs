use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::models::{CandidateId, DirectoryProfile, Location, OwnProfile, SearchQuery, Sex, UserId};
use crate::services::traits::{
    DirectorySearch, LocationLookup, PhotoLookup, ProfileLookup, UpstreamError,
};

/// VK API version the client speaks
pub const API_VERSION: &str = "5.199";

/// Photos requested from the profile album before ranking
const PHOTO_FETCH_COUNT: u32 = 50;

/// VK API client
///
/// Implements every directory collaborator the dialog core consumes:
/// - own profile lookup (`users.get`)
/// - city resolution (`database.getCities`)
/// - candidate search (`users.search`)
/// - profile photo ranking (`photos.get`)
pub struct VkClient {
    api_url: String,
    token: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct CityRef {
    id: i64,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VkUser {
    id: i64,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    sex: Option<i64>,
    #[serde(default)]
    city: Option<CityRef>,
    #[serde(default)]
    bdate: Option<String>,
    #[serde(default)]
    has_photo: Option<i64>,
    #[serde(default)]
    is_closed: Option<bool>,
    #[serde(default)]
    can_access_closed: Option<bool>,
}

impl From<VkUser> for DirectoryProfile {
    fn from(user: VkUser) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            sex: user.sex.and_then(Sex::from_code),
            city: user.city.and_then(|c| c.title),
            birth_date: user.bdate,
            has_photo: user.has_photo.map(|v| v != 0).unwrap_or(true),
            is_closed: user.is_closed.unwrap_or(false),
            can_access_closed: user.can_access_closed.unwrap_or(true),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ItemsPage<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
struct Likes {
    #[serde(default)]
    count: u64,
}

/// A profile photo as returned by `photos.get` with `extended=1`
#[derive(Debug, Clone, Deserialize)]
pub struct Photo {
    pub id: i64,
    pub owner_id: i64,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    likes: Option<Likes>,
}

impl Photo {
    pub fn like_count(&self) -> u64 {
        self.likes.as_ref().map(|l| l.count).unwrap_or(0)
    }

    /// Message attachment reference: `photo{owner}_{id}[_{access_key}]`
    pub fn attachment(&self) -> String {
        match &self.access_key {
            Some(key) => format!("photo{}_{}_{}", self.owner_id, self.id, key),
            None => format!("photo{}_{}", self.owner_id, self.id),
        }
    }
}

/// Order photos by like count (descending) and keep the first `limit`
///
/// The sort is stable, so equally liked photos keep the API order.
pub fn rank_photos(mut photos: Vec<Photo>, limit: usize) -> Vec<String> {
    photos.sort_by_key(|p| std::cmp::Reverse(p.like_count()));
    photos.iter().take(limit).map(Photo::attachment).collect()
}

impl VkClient {
    /// Create a new VK client
    pub fn new(api_url: String, token: String, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_url,
            token,
            client,
        })
    }

    /// Call an API method and unwrap the `response` envelope
    async fn call(&self, method: &str, params: &[(&str, String)]) -> Result<Value, UpstreamError> {
        let mut url = format!(
            "{}/{}?access_token={}&v={}",
            self.api_url.trim_end_matches('/'),
            method,
            urlencoding::encode(&self.token),
            API_VERSION
        );
        for (key, value) in params {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }

        tracing::debug!("Calling VK method {}", method);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(UpstreamError::Api {
                code: i64::from(response.status().as_u16()),
                message: format!("HTTP status {} from {}", response.status(), method),
            });
        }

        let json: Value = response.json().await?;

        if let Some(error) = json.get("error") {
            let code = error.get("error_code").and_then(Value::as_i64).unwrap_or(0);
            let message = error
                .get("error_msg")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error")
                .to_string();
            tracing::warn!("VK method {} failed: {} ({})", method, message, code);
            return Err(UpstreamError::Api { code, message });
        }

        json.get("response")
            .cloned()
            .ok_or_else(|| UpstreamError::InvalidResponse(format!("Missing response in {}", method)))
    }

    fn parse<T: for<'de> Deserialize<'de>>(method: &str, value: Value) -> Result<T, UpstreamError> {
        serde_json::from_value(value).map_err(|e| {
            UpstreamError::InvalidResponse(format!("Failed to parse {} response: {}", method, e))
        })
    }
}

#[async_trait]
impl ProfileLookup for VkClient {
    async fn own_profile(&self, user_id: UserId) -> Result<Option<OwnProfile>, UpstreamError> {
        let response = self
            .call(
                "users.get",
                &[
                    ("user_ids", user_id.to_string()),
                    ("fields", "sex,bdate,city".to_string()),
                ],
            )
            .await?;

        let users: Vec<VkUser> = Self::parse("users.get", response)?;

        Ok(users.into_iter().next().map(|user| OwnProfile {
            user_id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            sex: user.sex.and_then(Sex::from_code),
            location: user.city.map(|city| Location {
                id: city.id,
                label: city.title.unwrap_or_default(),
            }),
        }))
    }
}

#[async_trait]
impl LocationLookup for VkClient {
    async fn resolve(
        &self,
        text: &str,
        country_id: i64,
    ) -> Result<Option<Location>, UpstreamError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let response = self
            .call(
                "database.getCities",
                &[
                    ("country_id", country_id.to_string()),
                    ("q", text.to_string()),
                    ("count", "10".to_string()),
                ],
            )
            .await?;

        let page: ItemsPage<CityRef> = Self::parse("database.getCities", response)?;

        Ok(page.items.into_iter().next().map(|city| Location {
            id: city.id,
            label: city.title.unwrap_or_else(|| text.to_string()),
        }))
    }
}

#[async_trait]
impl DirectorySearch for VkClient {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<DirectoryProfile>, UpstreamError> {
        let response = self
            .call(
                "users.search",
                &[
                    ("city", query.location_id.to_string()),
                    ("age_from", query.age_from.to_string()),
                    ("age_to", query.age_to.to_string()),
                    ("sex", query.sex.search_code().to_string()),
                    ("offset", query.offset.to_string()),
                    ("count", query.count.to_string()),
                    (
                        "fields",
                        "is_closed,can_access_closed,sex,city,bdate,has_photo".to_string(),
                    ),
                ],
            )
            .await?;

        let page: ItemsPage<VkUser> = Self::parse("users.search", response)?;

        tracing::debug!(
            "users.search returned {} profiles at offset {}",
            page.items.len(),
            query.offset
        );

        Ok(page.items.into_iter().map(DirectoryProfile::from).collect())
    }
}

#[async_trait]
impl PhotoLookup for VkClient {
    async fn top_photos(
        &self,
        candidate_id: CandidateId,
        limit: usize,
    ) -> Result<Vec<String>, UpstreamError> {
        let response = self
            .call(
                "photos.get",
                &[
                    ("owner_id", candidate_id.to_string()),
                    ("album_id", "profile".to_string()),
                    ("extended", "1".to_string()),
                    ("count", PHOTO_FETCH_COUNT.to_string()),
                ],
            )
            .await?;

        let page: ItemsPage<Photo> = Self::parse("photos.get", response)?;

        Ok(rank_photos(page.items, limit))
    }
}
