use async_trait::async_trait;
use marquee_core::{
    Booking, BookingRemote, CoreError, CoreResult, Movie, NewBooking, Session, SessionRemote,
    TransitionAck,
};
use marquee_shared::{BookingId, MovieId, ReservationCode, SessionId};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use crate::app_config::RemoteConfig;
use crate::error::StoreError;

pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// JSON-over-HTTP client for the reservation service.
#[derive(Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: String,
}

impl HttpRemote {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Client(e.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &RemoteConfig) -> Result<Self, StoreError> {
        Self::new(config.base_url.clone(), config.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `{base}/{segments...}/` with every segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> CoreResult<Url> {
        let mut url = Url::parse(&format!("{}/", self.base_url))
            .map_err(|e| CoreError::transport(format!("Invalid base URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| CoreError::transport(format!("Base URL {} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments)
            .push("");
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> CoreResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| CoreError::transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!("Reservation service answered {} ({} bytes)", status, body.len());
        let message = if body.trim().is_empty() {
            format!("Request failed with status {}", status.as_u16())
        } else {
            body
        };
        Err(CoreError::remote(status.as_u16(), message))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> CoreResult<T> {
        let url = response.url().clone();
        response
            .json::<T>()
            .await
            .map_err(|e| CoreError::transport(format!("Unreadable response from {}: {}", url, e)))
    }

    async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> CoreResult<T> {
        let response = self.send(request).await?;
        Self::decode(response).await
    }

    async fn transition(&self, id: &BookingId, action: &str) -> CoreResult<TransitionAck> {
        let url = self.endpoint(&["bookings", id.as_str(), action])?;
        debug!("POST {}", url.path());
        let response = self.send(self.client.post(url.clone())).await?;
        let body = response
            .text()
            .await
            .map_err(|e| CoreError::transport(e.to_string()))?;
        if body.trim().is_empty() {
            return Ok(TransitionAck::default());
        }
        serde_json::from_str(&body)
            .map_err(|e| CoreError::transport(format!("Unreadable response from {}: {}", url, e)))
    }
}

#[async_trait]
impl SessionRemote for HttpRemote {
    async fn fetch_session(&self, id: &SessionId) -> CoreResult<Session> {
        let url = self.endpoint(&["sessions", id.as_str()])?;
        self.get_json(self.client.get(url)).await
    }

    async fn list_sessions(&self, movie: Option<&MovieId>) -> CoreResult<Vec<Session>> {
        let url = match movie {
            Some(m) => self.endpoint(&["movies", m.as_str(), "sessions"])?,
            None => self.endpoint(&["sessions"])?,
        };
        self.get_json(self.client.get(url)).await
    }

    async fn fetch_movie(&self, id: &MovieId) -> CoreResult<Movie> {
        let url = self.endpoint(&["movies", id.as_str()])?;
        self.get_json(self.client.get(url)).await
    }

    async fn list_movies(&self) -> CoreResult<Vec<Movie>> {
        self.get_json(self.client.get(self.url("/movies/"))).await
    }
}

#[async_trait]
impl BookingRemote for HttpRemote {
    async fn create_booking(
        &self,
        request: &NewBooking,
        idempotency_key: Option<&str>,
    ) -> CoreResult<Booking> {
        let mut builder = self.client.post(self.url("/bookings/")).json(request);
        if let Some(key) = idempotency_key {
            builder = builder.header(IDEMPOTENCY_HEADER, key);
        }
        debug!(
            "POST /bookings/ for session {} with {} seats",
            request.session, request.seat_count
        );
        self.get_json(builder).await
    }

    async fn fetch_booking(&self, id: &BookingId) -> CoreResult<Booking> {
        let url = self.endpoint(&["bookings", id.as_str()])?;
        self.get_json(self.client.get(url)).await
    }

    async fn fetch_booking_by_code(&self, code: &ReservationCode) -> CoreResult<Booking> {
        let url = self.endpoint(&["bookings", "by_code", code.as_str()])?;
        self.get_json(self.client.get(url)).await
    }

    async fn list_bookings(&self, session: Option<&SessionId>) -> CoreResult<Vec<Booking>> {
        let mut builder = self.client.get(self.url("/bookings/"));
        if let Some(id) = session {
            builder = builder.query(&[("session", id.as_str())]);
        }
        self.get_json(builder).await
    }

    async fn confirm_booking(&self, id: &BookingId) -> CoreResult<TransitionAck> {
        self.transition(id, "confirm").await
    }

    async fn cancel_booking(&self, id: &BookingId) -> CoreResult<TransitionAck> {
        self.transition(id, "cancel").await
    }

    async fn delete_booking(&self, id: &BookingId) -> CoreResult<()> {
        let url = self.endpoint(&["bookings", id.as_str()])?;
        self.send(self.client.delete(url)).await?;
        Ok(())
    }
}
