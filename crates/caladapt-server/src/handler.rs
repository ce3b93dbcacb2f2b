//! Request handler tying the adapt pipeline, the picker configuration and
//! the calendar merger together.
//!
//! Routing and HTTP status mapping belong to the embedding web framework;
//! every method here returns ICS text or a [`ServerError`] whose
//! [`is_client_error`](ServerError::is_client_error) picks the status
//! class.

use std::path::PathBuf;
use std::sync::Arc;

use caladapt_core::{bitmask, grouping, merge};
use caladapt_providers::{
    Adapter, CalendarProvider, Fetcher, HttpFetcher, ProviderExtra, TimeEditProvider,
};
use futures_util::future::try_join_all;
use tokio::sync::RwLock;
use tracing::{Span, debug, field, info};

use crate::cache::{ConfigCache, content_hash};
use crate::config::{PickerConfig, ServerConfig};
use crate::error::{ServerError, ServerResult};
use crate::query::{AdaptQuery, MergeQuery};
use crate::source::{CalendarSource, DirectorySource};

/// Picker configuration cache shared across requests.
pub type SharedPickerCache = Arc<RwLock<ConfigCache<PickerConfig>>>;

/// Creates an empty picker configuration cache.
pub fn new_picker_cache() -> SharedPickerCache {
    Arc::new(RwLock::new(ConfigCache::new()))
}

/// Handles adapt, merge and lookup requests.
pub struct RequestHandler<P = TimeEditProvider, F = HttpFetcher> {
    adapter: Adapter<P, F>,
    source: Arc<dyn CalendarSource>,
    picker_path: PathBuf,
    picker_cache: SharedPickerCache,
}

impl RequestHandler {
    /// Creates a TimeEdit handler serving merge calendars from disk.
    pub fn from_config(config: &ServerConfig) -> ServerResult<Self> {
        let adapter = Adapter::timeedit(config.timeedit()?)?;
        let source = Arc::new(DirectorySource::new(&config.calendar_dir));
        Ok(Self::new(adapter, source, &config.picker_config))
    }
}

impl<P, F> RequestHandler<P, F>
where
    P: CalendarProvider,
    F: Fetcher,
{
    pub fn new(
        adapter: Adapter<P, F>,
        source: Arc<dyn CalendarSource>,
        picker_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            adapter,
            source,
            picker_path: picker_path.into(),
            picker_cache: new_picker_cache(),
        }
    }

    /// Shares an existing picker cache, e.g. between handler instances.
    pub fn with_picker_cache(mut self, cache: SharedPickerCache) -> Self {
        self.picker_cache = cache;
        self
    }

    /// Adapt route: fetches, narrows and rewrites one provider calendar.
    #[tracing::instrument(skip(self), fields(events = field::Empty))]
    pub async fn adapt(&self, query: &str) -> ServerResult<String> {
        let query = AdaptQuery::from_query(query)?;
        let options = query.adapt_options()?;
        let calendar = self.adapter.adapt(&query.id, &options).await?;
        Span::current().record("events", calendar.event_count());
        Ok(calendar.serialize())
    }

    /// Merge route: merges the calendars selected by the mask in `segment`.
    #[tracing::instrument(skip(self), fields(events = field::Empty))]
    pub async fn merge(&self, segment: &str, query: &str) -> ServerResult<String> {
        let mask = bitmask::parse_mask(segment)?;
        let MergeQuery { origin } = MergeQuery::from_query(query)?;

        let picker = self.picker_config().await?;
        let names = bitmask::decode(mask, &picker.bit_entries());
        if names.is_empty() {
            return Err(ServerError::invalid_query(format!(
                "selection {mask} matches no calendar"
            )));
        }
        debug!(mask, calendars = ?names, "Merging selection");

        let calendars = try_join_all(names.iter().map(|name| self.source.load(name))).await?;
        let merged = merge::merge(&calendars, origin)?;

        info!(
            mask,
            calendars = calendars.len(),
            events = merged.event_count(),
            "Merged calendars"
        );
        Span::current().record("events", merged.event_count());
        Ok(merged.serialize())
    }

    /// Resolves a provider URL pasted by a user into a calendar id.
    pub fn lookup_id(&self, url: &str) -> ServerResult<String> {
        Ok(self.adapter.provider().get_id(url)?)
    }

    /// Extra links (e.g. the web view) for a calendar id.
    pub fn extras(&self, id: &str) -> ServerResult<Vec<ProviderExtra>> {
        let provider = self.adapter.provider();
        let url = provider.create_url(id)?;
        Ok(provider.get_extras(&url))
    }

    /// Lists the combination keys available for grouping calendar `id` by
    /// the property at `group`.
    #[tracing::instrument(skip(self))]
    pub async fn groups(&self, id: &str, group: usize) -> ServerResult<Vec<String>> {
        let calendar = self.adapter.fetch_calendar(id).await?;
        Ok(grouping::keys_for_index(group, &calendar.events)?)
    }

    /// Returns the picker configuration, re-parsing it only when the file
    /// content changed since the last call.
    pub async fn picker_config(&self) -> ServerResult<Arc<PickerConfig>> {
        let text = tokio::fs::read_to_string(&self.picker_path)
            .await
            .map_err(|e| {
                ServerError::config(format!(
                    "cannot read picker config {}: {}",
                    self.picker_path.display(),
                    e
                ))
            })?;

        let hash = content_hash(&text);
        if let Some(config) = self.picker_cache.read().await.lookup(&hash) {
            return Ok(config);
        }

        let mut cache = self.picker_cache.write().await;
        cache.get_or_populate(&text, PickerConfig::from_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caladapt_providers::TimeEditConfig;
    use std::path::Path;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED: &str = "BEGIN:VCALENDAR\r\n\
        VERSION:2.0\r\n\
        PRODID:-//TimeEdit//EN\r\n\
        BEGIN:VEVENT\r\n\
        UID:1@timeedit\r\n\
        DTSTART:20250205T081500Z\r\n\
        DTEND:20250205T100000Z\r\n\
        SUMMARY:Kurskod: TDA357_VT25\\, Kursnamn: Databaser\\, Aktivitet: Föreläsning\r\n\
        LOCATION:Lokalnamn: HA1\\, Campus: Johanneberg\r\n\
        END:VEVENT\r\n\
        BEGIN:VEVENT\r\n\
        UID:2@timeedit\r\n\
        DTSTART:20250206T081500Z\r\n\
        DTEND:20250206T100000Z\r\n\
        SUMMARY:Kurskod: TDA357_VT25\\, Kursnamn: Databaser\\, Aktivitet: Övning\r\n\
        LOCATION:Lokalnamn: EG-2515\\, Campus: Johanneberg\r\n\
        END:VEVENT\r\n\
        END:VCALENDAR\r\n";

    fn calendar_file(name: &str, summary: &str) -> String {
        format!(
            "BEGIN:VCALENDAR\r\n\
             VERSION:2.0\r\n\
             PRODID:-//caladapt//EN\r\n\
             X-WR-CALNAME:{name}\r\n\
             BEGIN:VEVENT\r\n\
             UID:{name}-1@test\r\n\
             DTSTART:20250205T081500Z\r\n\
             DTEND:20250205T100000Z\r\n\
             SUMMARY:{summary}\r\n\
             END:VEVENT\r\n\
             END:VCALENDAR\r\n"
        )
    }

    const PICKER: &str = r#"[
        { "filename": "a.ics", "id": 0 },
        { "filename": "b.ics", "id": 1 },
        { "filename": "c.ics", "id": 2 },
        { "filename": "never.ics", "id": -1 }
    ]"#;

    fn write_calendars(dir: &Path) {
        std::fs::write(dir.join("a.ics"), calendar_file("A", "Lecture")).unwrap();
        std::fs::write(dir.join("b.ics"), calendar_file("B", "Exercise")).unwrap();
        std::fs::write(dir.join("c.ics"), calendar_file("C", "Exam")).unwrap();
        std::fs::write(dir.join("picker.json"), PICKER).unwrap();
    }

    async fn timeedit_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/public/ri123.ics"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(FEED, "text/calendar; charset=UTF-8"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/public/plain.ics"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/public/gone.ics"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        server
    }

    fn handler(dir: &Path, server: &MockServer) -> RequestHandler {
        let config = ServerConfig::new(dir).with_timeedit_base_url(format!("{}/public/", server.uri()));
        RequestHandler::from_config(&config).unwrap()
    }

    fn summaries(ics: &str) -> Vec<String> {
        caladapt_core::Calendar::parse(ics)
            .unwrap()
            .events
            .into_iter()
            .filter_map(|e| e.summary)
            .collect()
    }

    #[tokio::test]
    async fn adapt_serves_rewritten_calendar() {
        let dir = tempfile::tempdir().unwrap();
        let server = timeedit_server().await;

        let ics = handler(dir.path(), &server).adapt("id=ri123").await.unwrap();

        assert_eq!(
            summaries(&ics),
            ["Föreläsning: Databaser (TDA357)", "Övning: Databaser (TDA357)"]
        );
    }

    #[tokio::test]
    async fn adapt_applies_filters() {
        let dir = tempfile::tempdir().unwrap();
        let server = timeedit_server().await;

        let ics = handler(dir.path(), &server)
            .adapt("id=ri123&f=0(%C3%96vning)&fg=1")
            .await
            .unwrap();

        assert_eq!(summaries(&ics), ["Föreläsning: Databaser (TDA357)"]);
    }

    #[tokio::test]
    async fn adapt_errors_are_classified() {
        let dir = tempfile::tempdir().unwrap();
        let server = timeedit_server().await;
        let handler = handler(dir.path(), &server);

        let err = handler.adapt("group=0&gi=x").await.unwrap_err();
        assert!(err.is_client_error());

        let err = handler.adapt("id=gone").await.unwrap_err();
        assert!(!err.is_client_error());
        assert!(err.to_string().contains("404"));

        let err = handler.adapt("id=plain").await.unwrap_err();
        assert!(!err.is_client_error());
        assert!(err.to_string().contains("text/plain"), "{err}");
    }

    #[tokio::test]
    async fn out_of_range_filter_group_fails_before_fetching() {
        let dir = tempfile::tempdir().unwrap();
        let server = MockServer::start().await;

        let err = handler(dir.path(), &server)
            .adapt("id=ri123&f=0(x)&fg=2")
            .await
            .unwrap_err();

        assert!(err.is_client_error());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn merge_selected_calendars_in_declared_order() {
        let dir = tempfile::tempdir().unwrap();
        write_calendars(dir.path());
        let server = timeedit_server().await;
        let handler = handler(dir.path(), &server);

        let ics = handler.merge("5", "").await.unwrap();
        let merged = caladapt_core::Calendar::parse(&ics).unwrap();
        assert_eq!(merged.name.as_deref(), Some("A+C"));
        assert_eq!(summaries(&ics), ["Lecture - A", "Exam - C"]);

        let ics = handler.merge("3", "origin=false").await.unwrap();
        assert_eq!(summaries(&ics), ["Lecture", "Exercise"]);
    }

    #[tokio::test]
    async fn merge_rejects_bad_selections() {
        let dir = tempfile::tempdir().unwrap();
        write_calendars(dir.path());
        let server = timeedit_server().await;
        let handler = handler(dir.path(), &server);

        for segment in ["abc", "-1", "0", "8"] {
            let err = handler.merge(segment, "").await.unwrap_err();
            assert!(err.is_client_error(), "{segment}: {err}");
        }
    }

    #[tokio::test]
    async fn merge_without_picker_config_is_a_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let server = timeedit_server().await;

        let err = handler(dir.path(), &server).merge("1", "").await.unwrap_err();
        assert!(matches!(err, ServerError::Config { .. }));
    }

    #[tokio::test]
    async fn picker_config_is_reparsed_on_change() {
        let dir = tempfile::tempdir().unwrap();
        write_calendars(dir.path());
        let server = timeedit_server().await;
        let handler = handler(dir.path(), &server);

        let first = handler.picker_config().await.unwrap();
        let again = handler.picker_config().await.unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        std::fs::write(
            dir.path().join("picker.json"),
            r#"[{ "filename": "b.ics", "id": 0 }]"#,
        )
        .unwrap();
        let changed = handler.picker_config().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &changed));
        assert_eq!(changed.bit_entries(), [("b.ics".to_string(), 0)]);

        let ics = handler.merge("1", "").await.unwrap();
        assert_eq!(summaries(&ics), ["Exercise - B"]);
    }

    #[tokio::test]
    async fn lookup_id_and_extras() {
        let dir = tempfile::tempdir().unwrap();
        let server = timeedit_server().await;
        let handler = handler(dir.path(), &server);

        let url = format!("{}/public/ri123.html", server.uri());
        assert_eq!(handler.lookup_id(&url).unwrap(), "ri123");
        assert!(handler.lookup_id("https://example.com/x.ics").unwrap_err().is_client_error());

        let extras = handler.extras("ri123").unwrap();
        assert_eq!(extras[0].url.as_str(), url);
    }

    #[tokio::test]
    async fn groups_lists_combination_keys() {
        let dir = tempfile::tempdir().unwrap();
        let server = timeedit_server().await;
        let handler = handler(dir.path(), &server);

        assert_eq!(
            handler.groups("ri123", 0).await.unwrap(),
            ["-vning", "f-rel-sning"]
        );
        assert_eq!(handler.groups("ri123", 3).await.unwrap(), ["eg-2515", "ha1"]);
        assert!(handler.groups("ri123", 9).await.unwrap_err().is_client_error());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ServerConfig::default().with_timeedit_base_url("::");
        assert!(RequestHandler::from_config(&config).is_err());
    }
}
