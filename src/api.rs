//! HTTP client for the game server's REST API.
//!
//! The server owns persistence, the who-hunts-whom assignment and the
//! authoritative pending-delivery state; this client only moves JSON. Error
//! bodies are `{"error": "..."}` and the message is surfaced verbatim.

use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::delivery::DeliveryConfig;
use crate::types::{DispatchRoster, GameStats, Match, MatchId, Person, PersonId};

/// Result type for server calls
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("could not reach server: {0}")]
    Network(String),

    /// Server-supplied message, passed through verbatim
    #[error("{0}")]
    Server(String),

    #[error("unexpected response shape: {0}")]
    Shape(String),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct PersonPayload<'a> {
    name: &'a str,
    email: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct NewMatchPayload<'a> {
    name: &'a str,
    participants: &'a [PersonId],
}

#[derive(Debug, Serialize)]
struct FinalizePayload {
    winner_id: PersonId,
}

#[derive(Debug, Serialize)]
struct DeliveredPayload<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct LoginPayload<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/api/{}", self.base_url, path);
        self.client.request(method, url)
    }

    async fn error_from(response: reqwest::Response) -> ApiError {
        let status = response.status();
        match response.json::<ErrorBody>().await {
            Ok(body) => ApiError::Server(body.error),
            Err(_) => ApiError::Server(format!("server returned {}", status)),
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: reqwest::RequestBuilder) -> ApiResult<T> {
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Shape(e.to_string()))
    }

    /// Like `send`, for endpoints whose response body does not matter
    async fn send_discarding(&self, builder: reqwest::RequestBuilder) -> ApiResult<()> {
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        Ok(())
    }

    // ---- people ----

    pub async fn list_people(&self) -> ApiResult<Vec<Person>> {
        self.send(self.request(Method::GET, "players")).await
    }

    pub async fn ranking(&self) -> ApiResult<Vec<Person>> {
        self.send(self.request(Method::GET, "players/ranking")).await
    }

    pub async fn create_person(&self, name: &str, email: Option<&str>) -> ApiResult<Person> {
        self.send(
            self.request(Method::POST, "players")
                .json(&PersonPayload { name, email }),
        )
        .await
    }

    pub async fn update_person(
        &self,
        id: PersonId,
        name: &str,
        email: Option<&str>,
    ) -> ApiResult<Person> {
        self.send(
            self.request(Method::PUT, &format!("players/{}", id))
                .json(&PersonPayload { name, email }),
        )
        .await
    }

    pub async fn delete_person(&self, id: PersonId) -> ApiResult<()> {
        self.send_discarding(self.request(Method::DELETE, &format!("players/{}", id)))
            .await
    }

    // ---- matches ----

    pub async fn active_matches(&self) -> ApiResult<Vec<Match>> {
        self.send(self.request(Method::GET, "matches/active")).await
    }

    pub async fn finished_matches(&self) -> ApiResult<Vec<Match>> {
        self.send(self.request(Method::GET, "matches/finished"))
            .await
    }

    pub async fn get_match(&self, id: MatchId) -> ApiResult<Match> {
        self.send(self.request(Method::GET, &format!("matches/{}", id)))
            .await
    }

    pub async fn stats(&self) -> ApiResult<GameStats> {
        self.send(self.request(Method::GET, "matches/stats")).await
    }

    pub async fn create_match(&self, name: &str, participants: &[PersonId]) -> ApiResult<Match> {
        self.send(
            self.request(Method::POST, "matches")
                .json(&NewMatchPayload { name, participants }),
        )
        .await
    }

    pub async fn finalize_match(&self, id: MatchId, winner_id: PersonId) -> ApiResult<Match> {
        self.send(
            self.request(Method::PUT, &format!("matches/{}/finalize", id))
                .json(&FinalizePayload { winner_id }),
        )
        .await
    }

    pub async fn delete_match(&self, id: MatchId) -> ApiResult<()> {
        self.send_discarding(self.request(Method::DELETE, &format!("matches/{}", id)))
            .await
    }

    // ---- notifications ----

    /// Dispatch roster for a match: one row per participant with the target
    /// each should be told about, plus what the server already considers
    /// delivered.
    pub async fn roster(&self, id: MatchId, locale: Option<&str>) -> ApiResult<DispatchRoster> {
        let mut builder = self.request(Method::GET, &format!("matches/{}/roster", id));
        if let Some(locale) = locale {
            builder = builder.query(&[("locale", locale)]);
        }
        self.send(builder).await
    }

    /// Tell the server one recipient's notification arrived so it can clear
    /// the pending entry.
    pub async fn confirm_delivered(&self, id: MatchId, email: &str) -> ApiResult<()> {
        self.send_discarding(
            self.request(Method::POST, &format!("matches/{}/delivered", id))
                .json(&DeliveredPayload { email }),
        )
        .await
    }

    // ---- config & auth ----

    pub async fn delivery_config(&self) -> ApiResult<DeliveryConfig> {
        self.send(self.request(Method::GET, "config")).await
    }

    pub async fn login(&self, username: &str, password: &str) -> ApiResult<LoginResponse> {
        self.send(
            self.request(Method::POST, "auth/login")
                .json(&LoginPayload { username, password }),
        )
        .await
    }
}
