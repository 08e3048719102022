//! Aladhan API client.
//!
//! `GET {base}/timingsByCity?city=..&country=..` for the five daily prayers and
//! `GET {base}/gToH` for today's hijri date.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use wird_core::{HijriDate, Location, Prayer, TimeSource, WirdError, WirdResult};

pub struct AladhanClient {
    client: Client,
    base_url: String,
}

impl AladhanClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Aladhan HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> WirdResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| WirdError::TimeSource(format!("request to {path} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WirdError::TimeSource(format!("{path} returned {status}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| WirdError::TimeSource(format!("unexpected {path} payload: {e}")))
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct TimingsData {
    timings: HashMap<String, String>,
}

#[derive(Deserialize)]
struct HijriData {
    hijri: HijriBody,
}

#[derive(Deserialize)]
struct HijriBody {
    day: String,
    month: HijriMonth,
    year: String,
}

#[derive(Deserialize)]
struct HijriMonth {
    number: u32,
    ar: String,
}

/// The API sometimes appends a zone hint, e.g. `"04:12 (+03)"`.
fn strip_zone_suffix(raw: &str) -> &str {
    raw.split_once(' ').map_or(raw, |(time, _)| time).trim()
}

#[async_trait]
impl TimeSource for AladhanClient {
    async fn named_times(&self, location: &Location) -> WirdResult<Vec<(String, String)>> {
        let envelope: Envelope<TimingsData> = self
            .get_json(
                "/timingsByCity",
                &[("city", location.city.as_str()), ("country", location.country.as_str())],
            )
            .await?;
        let timings = envelope.data.timings;

        let mut times = Vec::with_capacity(Prayer::ALL.len());
        for prayer in Prayer::ALL {
            let raw = timings.get(prayer.name()).ok_or_else(|| {
                WirdError::TimeSource(format!("timings for {location} lack {prayer}"))
            })?;
            times.push((prayer.name().to_string(), strip_zone_suffix(raw).to_string()));
        }
        debug!(location = %location, ?times, "Resolved prayer times");
        Ok(times)
    }

    async fn calendar_day(&self) -> WirdResult<HijriDate> {
        let envelope: Envelope<HijriData> = self.get_json("/gToH", &[]).await?;
        let hijri = envelope.data.hijri;
        let day = hijri
            .day
            .trim()
            .parse()
            .map_err(|_| WirdError::TimeSource(format!("hijri day {:?} is not a number", hijri.day)))?;
        Ok(HijriDate {
            day,
            month: hijri.month.number,
            month_name: hijri.month.ar,
            year: hijri.year,
        })
    }
}
