use std::io::{ErrorKind, Read, Write};
use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::domain::{CardRecord, Set};
use crate::error::ScryError;

pub const DEFAULT_BASE_URL: &str = "https://api.scryfall.com";

/// Pause between two page requests of the same listing.
pub const PAGE_DELAY: Duration = Duration::from_millis(100);

pub trait CatalogClient: Send + Sync {
    /// All sets, newest release first.
    fn fetch_sets(&self) -> Result<Vec<Set>, ScryError>;
    /// Every card of a paginated listing (set search or print history).
    fn fetch_paged_cards(&self, listing_url: &str) -> Result<Vec<CardRecord>, ScryError>;
    fn fetch_card_by_name(&self, name: &str) -> Result<CardRecord, ScryError>;
}

pub trait ImageClient: Send + Sync {
    /// Streams the image at `url` into `sink` and returns the byte count.
    fn download_image(&self, url: &str, sink: &mut dyn Write) -> Result<u64, ScryError>;
}

#[derive(Debug, Deserialize)]
struct SetList {
    data: Vec<Set>,
}

#[derive(Debug, Deserialize)]
pub struct CardPage {
    #[serde(default)]
    pub data: Vec<CardRecord>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_page: Option<String>,
}

impl CardPage {
    /// Continuation reference, only when the listing says there is more.
    pub fn continuation(&self) -> Option<&str> {
        if !self.has_more {
            return None;
        }
        self.next_page
            .as_deref()
            .filter(|url| !url.trim().is_empty())
    }
}

#[derive(Clone)]
pub struct ScryfallHttpClient {
    client: Client,
    base_url: String,
    page_delay: Duration,
}

impl ScryfallHttpClient {
    pub fn new() -> Result<Self, ScryError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, ScryError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("scry-dl/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ScryError::Network(err.to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json;q=0.9,*/*;q=0.8"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| ScryError::Network(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            page_delay: PAGE_DELAY,
        })
    }

    fn sets_url(&self) -> String {
        format!("{}/sets", self.base_url)
    }

    fn named_url(&self) -> String {
        format!("{}/cards/named", self.base_url)
    }

    fn get(&self, url: &str) -> Result<Response, ScryError> {
        self.client
            .get(url)
            .send()
            .map_err(|err| ScryError::Network(err.to_string()))
    }

    fn handle_status(response: Response) -> Result<Response, ScryError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "Scryfall request failed".to_string());
        Err(ScryError::HttpStatus { status, message })
    }

    fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ScryError> {
        response
            .json()
            .map_err(|err| ScryError::Decode(err.to_string()))
    }
}

impl CatalogClient for ScryfallHttpClient {
    fn fetch_sets(&self) -> Result<Vec<Set>, ScryError> {
        let response = Self::handle_status(self.get(&self.sets_url())?)?;
        let mut sets = Self::decode::<SetList>(response)?.data;
        sort_newest_first(&mut sets);
        debug!(count = sets.len(), "fetched set catalog");
        Ok(sets)
    }

    fn fetch_paged_cards(&self, listing_url: &str) -> Result<Vec<CardRecord>, ScryError> {
        let mut cards = Vec::new();
        let mut current = Some(listing_url.to_string());
        let mut pages = 0usize;

        while let Some(url) = current.take() {
            if pages > 0 {
                thread::sleep(self.page_delay);
            }
            let response = Self::handle_status(self.get(&url)?)?;
            let page = Self::decode::<CardPage>(response)?;
            pages += 1;
            current = page.continuation().map(str::to_string);
            cards.extend(page.data);
        }

        debug!(pages, cards = cards.len(), listing = listing_url, "fetched listing");
        Ok(cards)
    }

    fn fetch_card_by_name(&self, name: &str) -> Result<CardRecord, ScryError> {
        let fuzzy = normalize_fuzzy_name(name);
        let response = self
            .client
            .get(self.named_url())
            .query(&[("fuzzy", fuzzy.as_str())])
            .send()
            .map_err(|err| ScryError::Network(err.to_string()))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ScryError::CardNotFound(name.to_string()));
        }
        let response = Self::handle_status(response)?;
        Self::decode(response)
    }
}

impl ImageClient for ScryfallHttpClient {
    fn download_image(&self, url: &str, sink: &mut dyn Write) -> Result<u64, ScryError> {
        let mut response = Self::handle_status(self.get(url)?)?;
        copy_body(&mut response, sink)
    }
}

/// Streams a response body into `sink`. Read failures are transport errors,
/// write failures are local ones.
pub fn copy_body<R: Read + ?Sized>(body: &mut R, sink: &mut dyn Write) -> Result<u64, ScryError> {
    let mut buffer = [0u8; 16 * 1024];
    let mut written = 0u64;
    loop {
        let read = match body.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(ScryError::Network(err.to_string())),
        };
        sink.write_all(&buffer[..read])
            .map_err(|err| ScryError::Filesystem(err.to_string()))?;
        written += read as u64;
    }
    Ok(written)
}

/// Release dates are ISO `YYYY-MM-DD`, so string order is date order.
pub fn sort_newest_first(sets: &mut [Set]) {
    sets.sort_by(|a, b| b.released_at.cmp(&a.released_at));
}

/// Separators and punctuation confuse the fuzzy matcher; reduce the name to
/// plain words.
pub fn normalize_fuzzy_name(name: &str) -> String {
    name.replace(['/', ','], " ")
        .replace('\'', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
