// Query classification and phrase resolution.

use super::music_models::{MusicError, QueryKind, Track};
use super::music_ports::TrackResolver;

/// Variants tried, in order, for every search phrase.
pub const SEARCH_SUFFIXES: [&str; 3] = ["", " lyrics", " audio"];

impl QueryKind {
    /// Catalog links are only recognised when a catalog client is configured;
    /// otherwise the link is searched like any other text.
    pub fn classify(query: &str, catalog_configured: bool) -> Self {
        let query = query.trim();
        if catalog_configured && query.contains("open.spotify.com") {
            if query.contains("/track/") {
                return QueryKind::CatalogTrack(query.to_string());
            }
            if query.contains("/playlist/") {
                return QueryKind::CatalogPlaylist(query.to_string());
            }
        }
        QueryKind::Search(query.to_string())
    }
}

/// First successful search over the phrase variants.
pub async fn resolve_phrase(
    resolver: &dyn TrackResolver,
    phrase: &str,
) -> Result<Track, MusicError> {
    for suffix in SEARCH_SUFFIXES {
        let attempt = format!("{phrase}{suffix}");
        match resolver.search(&attempt).await {
            Ok(track) => return Ok(track),
            Err(e) => tracing::debug!(phrase = %attempt, error = %e, "Search variant failed"),
        }
    }
    Err(MusicError::NotFound(phrase.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[test]
    fn classify_catalog_links() {
        assert_eq!(
            QueryKind::classify("https://open.spotify.com/track/abc", true),
            QueryKind::CatalogTrack("https://open.spotify.com/track/abc".into())
        );
        assert_eq!(
            QueryKind::classify(" https://open.spotify.com/playlist/xyz ", true),
            QueryKind::CatalogPlaylist("https://open.spotify.com/playlist/xyz".into())
        );
    }

    #[test]
    fn catalog_links_are_plain_searches_without_catalog() {
        assert_eq!(
            QueryKind::classify("https://open.spotify.com/track/abc", false),
            QueryKind::Search("https://open.spotify.com/track/abc".into())
        );
    }

    #[test]
    fn unsupported_catalog_link_is_searched() {
        assert!(matches!(
            QueryKind::classify("https://open.spotify.com/album/abc", true),
            QueryKind::Search(_)
        ));
        assert!(matches!(
            QueryKind::classify("never gonna give you up", true),
            QueryKind::Search(_)
        ));
    }

    /// Succeeds only for phrases ending with `accept_suffix`.
    struct PickyResolver {
        accept_suffix: Option<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TrackResolver for PickyResolver {
        async fn search(&self, phrase: &str) -> Result<Track, MusicError> {
            self.calls.lock().unwrap().push(phrase.to_string());
            match self.accept_suffix {
                Some(suffix) if phrase.ends_with(suffix) => Ok(Track {
                    source_url: format!("https://stream/{phrase}"),
                    title: phrase.to_string(),
                    thumbnail: None,
                    page_url: None,
                }),
                _ => Err(MusicError::Extractor("no results".into())),
            }
        }
    }

    #[tokio::test]
    async fn falls_back_to_later_variants() {
        let resolver = PickyResolver {
            accept_suffix: Some(" lyrics"),
            calls: Mutex::new(Vec::new()),
        };

        let track = resolve_phrase(&resolver, "song").await.unwrap();

        assert_eq!(track.title, "song lyrics");
        assert_eq!(*resolver.calls.lock().unwrap(), vec!["song", "song lyrics"]);
    }

    #[tokio::test]
    async fn all_variants_failing_is_not_found() {
        let resolver = PickyResolver {
            accept_suffix: None,
            calls: Mutex::new(Vec::new()),
        };

        let err = resolve_phrase(&resolver, "song").await.unwrap_err();

        assert_eq!(err, MusicError::NotFound("song".into()));
        assert_eq!(resolver.calls.lock().unwrap().len(), 3);
    }
}
