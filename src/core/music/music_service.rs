// Music service - the entry point the Discord layer talks to.
//
// Resolution (catalog lookup + extractor search) happens here, outside the
// per-guild actor, so a slow search never blocks skip/pause for that guild.
// Everything that touches playback state is forwarded to the guild's actor.

use super::guild_player::{PlayerCommand, PlayerRegistry, Reply};
use super::music_models::{EnqueueOutcome, MusicError, PauseState, QueryKind, QueueSnapshot, Track};
use super::music_ports::{CatalogLookup, MusicAnnouncer, TrackResolver, VoiceLink};
use super::resolution::resolve_phrase;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::warn;

/// Everything the music core needs from the outside world.
#[derive(Clone)]
pub struct MusicBackends {
    pub resolver: Arc<dyn TrackResolver>,
    pub catalog: Option<Arc<dyn CatalogLookup>>,
    pub voice: Arc<dyn VoiceLink>,
    pub announcer: Arc<dyn MusicAnnouncer>,
}

pub struct MusicService {
    backends: MusicBackends,
    players: Arc<PlayerRegistry>,
}

impl MusicService {
    pub fn new(backends: MusicBackends) -> Self {
        let players = Arc::new(PlayerRegistry::new(
            backends.voice.clone(),
            backends.announcer.clone(),
        ));
        Self { backends, players }
    }

    async fn request<T>(
        &self,
        guild_id: u64,
        command: impl FnOnce(Reply<T>) -> PlayerCommand,
    ) -> Result<T, MusicError> {
        let (tx, rx) = oneshot::channel();
        self.players.dispatch(guild_id, command(tx))?;
        rx.await.map_err(|_| MusicError::PlayerGone)
    }

    // ===== RESOLUTION =====

    /// Turn a user query into the search phrases to resolve.
    pub async fn search_phrases(&self, query: &str) -> Result<Vec<String>, MusicError> {
        let kind = QueryKind::classify(query, self.backends.catalog.is_some());
        match (kind, &self.backends.catalog) {
            (QueryKind::CatalogTrack(url), Some(catalog)) => {
                Ok(vec![catalog.track_phrase(&url).await?])
            }
            (QueryKind::CatalogPlaylist(url), Some(catalog)) => {
                catalog.playlist_phrases(&url).await
            }
            (QueryKind::Search(text), _)
            | (QueryKind::CatalogTrack(text), None)
            | (QueryKind::CatalogPlaylist(text), None) => Ok(vec![text]),
        }
    }

    /// Resolve every phrase and queue whatever was found.
    ///
    /// Phrases that can't be resolved are skipped; the outcome reports how many.
    /// Fails only when nothing at all could be resolved.
    pub async fn enqueue_phrases(
        &self,
        guild_id: u64,
        channel_id: u64,
        phrases: Vec<String>,
    ) -> Result<EnqueueOutcome, MusicError> {
        let mut tracks = Vec::with_capacity(phrases.len());
        let mut last_error = None;

        for phrase in &phrases {
            match resolve_phrase(self.backends.resolver.as_ref(), phrase).await {
                Ok(track) => tracks.push(track),
                Err(e) => {
                    warn!(guild_id, phrase = %phrase, error = %e, "Dropping unresolvable track");
                    last_error = Some(e);
                }
            }
        }

        let failed = phrases.len() - tracks.len();
        if tracks.is_empty() {
            return Err(match (phrases.len(), last_error) {
                (1, Some(e)) => e,
                _ => MusicError::NothingFound,
            });
        }

        let added = tracks.len();
        let first_title = tracks.first().map(|t| t.title.clone());
        let started = self
            .request(guild_id, |reply| PlayerCommand::Enqueue {
                channel_id,
                tracks,
                reply,
            })
            .await?;

        Ok(EnqueueOutcome {
            added,
            failed,
            first_title,
            started,
        })
    }

    pub async fn enqueue(
        &self,
        guild_id: u64,
        channel_id: u64,
        query: &str,
    ) -> Result<EnqueueOutcome, MusicError> {
        let phrases = self.search_phrases(query).await?;
        self.enqueue_phrases(guild_id, channel_id, phrases).await
    }

    // ===== VOICE =====

    pub async fn join(&self, guild_id: u64, channel_id: u64) -> Result<(), MusicError> {
        self.backends.voice.join(guild_id, channel_id).await
    }

    pub async fn connected_channel(&self, guild_id: u64) -> Option<u64> {
        self.backends.voice.connected_channel(guild_id).await
    }

    // ===== PLAYBACK CONTROL =====

    /// Returns the skipped track, or `None` when nothing was playing.
    pub async fn skip(&self, guild_id: u64) -> Result<Option<Track>, MusicError> {
        self.request(guild_id, |reply| PlayerCommand::Skip { reply })
            .await
    }

    /// Clear the queue and leave voice. Returns whether something was playing.
    pub async fn stop(&self, guild_id: u64) -> Result<bool, MusicError> {
        self.request(guild_id, |reply| PlayerCommand::Stop { reply })
            .await
    }

    pub async fn pause(&self, guild_id: u64) -> Result<bool, MusicError> {
        self.request(guild_id, |reply| PlayerCommand::Pause { reply })
            .await
    }

    pub async fn resume(&self, guild_id: u64) -> Result<bool, MusicError> {
        self.request(guild_id, |reply| PlayerCommand::Resume { reply })
            .await
    }

    pub async fn toggle_pause(&self, guild_id: u64) -> Result<Option<PauseState>, MusicError> {
        self.request(guild_id, |reply| PlayerCommand::TogglePause { reply })
            .await
    }

    /// Returns the new loop state.
    pub async fn toggle_loop(&self, guild_id: u64) -> Result<bool, MusicError> {
        self.request(guild_id, |reply| PlayerCommand::ToggleLoop { reply })
            .await
    }

    pub async fn shuffle(&self, guild_id: u64) -> Result<bool, MusicError> {
        self.request(guild_id, |reply| PlayerCommand::Shuffle { reply })
            .await
    }

    /// `percent` is clamped to 1..=200. `false` when nothing is playing.
    pub async fn set_volume(&self, guild_id: u64, percent: u32) -> Result<bool, MusicError> {
        let percent = percent.clamp(1, 200);
        self.request(guild_id, |reply| PlayerCommand::SetVolume { percent, reply })
            .await
    }

    pub async fn now_playing(&self, guild_id: u64) -> Result<Option<Track>, MusicError> {
        self.request(guild_id, |reply| PlayerCommand::NowPlaying { reply })
            .await
    }

    pub async fn snapshot(&self, guild_id: u64) -> Result<QueueSnapshot, MusicError> {
        self.request(guild_id, |reply| PlayerCommand::Snapshot { reply })
            .await
    }

    /// End the guild's session: delete the now-playing post, leave voice, reset state.
    pub async fn teardown(&self, guild_id: u64) -> Result<(), MusicError> {
        if !self.players.is_active(guild_id) {
            return Ok(());
        }
        self.request(guild_id, |reply| PlayerCommand::Teardown { reply: Some(reply) })
            .await
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::music::{EndCallback, PlaybackControl, PlaybackEnd};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const GUILD: u64 = 1;
    const TEXT: u64 = 50;
    const VOICE: u64 = 60;

    fn track(title: &str) -> Track {
        Track {
            source_url: format!("https://stream/{title}"),
            title: title.to_string(),
            thumbnail: None,
            page_url: None,
        }
    }

    // ===== MOCKS =====

    /// Finds every phrase except the ones listed as missing (any variant).
    struct MockResolver {
        missing: HashSet<String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TrackResolver for MockResolver {
        async fn search(&self, phrase: &str) -> Result<Track, MusicError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let base = phrase
                .trim_end_matches(" lyrics")
                .trim_end_matches(" audio");
            if self.missing.contains(base) {
                Err(MusicError::Extractor("no results".into()))
            } else {
                Ok(track(phrase))
            }
        }
    }

    struct MockCatalog;

    #[async_trait]
    impl CatalogLookup for MockCatalog {
        async fn track_phrase(&self, _url: &str) -> Result<String, MusicError> {
            Ok("song artist".into())
        }

        async fn playlist_phrases(&self, _url: &str) -> Result<Vec<String>, MusicError> {
            Ok(vec!["one a".into(), "two b".into(), "gone c".into()])
        }
    }

    struct MockControl;

    impl PlaybackControl for MockControl {
        fn pause(&self) -> Result<(), MusicError> {
            Ok(())
        }
        fn resume(&self) -> Result<(), MusicError> {
            Ok(())
        }
        fn stop(&self) -> Result<(), MusicError> {
            Ok(())
        }
        fn set_volume(&self, _volume: f32) -> Result<(), MusicError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockVoice {
        channel: Mutex<Option<u64>>,
        fail_starts: bool,
        started: Mutex<Vec<String>>,
        callbacks: Mutex<Vec<EndCallback>>,
        disconnects: AtomicUsize,
    }

    impl MockVoice {
        fn started(&self) -> Vec<String> {
            self.started.lock().unwrap().clone()
        }

        /// Fire the end callback of the n-th started playback.
        fn end(&self, index: usize, end: PlaybackEnd) {
            let callback = self.callbacks.lock().unwrap()[index].clone();
            callback(end);
        }
    }

    #[async_trait]
    impl VoiceLink for MockVoice {
        async fn join(&self, _guild_id: u64, channel_id: u64) -> Result<(), MusicError> {
            *self.channel.lock().unwrap() = Some(channel_id);
            Ok(())
        }

        async fn connected_channel(&self, _guild_id: u64) -> Option<u64> {
            *self.channel.lock().unwrap()
        }

        async fn start(
            &self,
            _guild_id: u64,
            track: &Track,
            _volume: f32,
            on_end: EndCallback,
        ) -> Result<Box<dyn PlaybackControl>, MusicError> {
            self.started.lock().unwrap().push(track.title.clone());
            if self.fail_starts {
                return Err(MusicError::Playback("stream unavailable".into()));
            }
            self.callbacks.lock().unwrap().push(on_end);
            Ok(Box::new(MockControl))
        }

        async fn disconnect(&self, _guild_id: u64) {
            *self.channel.lock().unwrap() = None;
            self.disconnects.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct MockAnnouncer {
        notices: Mutex<Vec<String>>,
        deleted: AtomicUsize,
    }

    #[async_trait]
    impl MusicAnnouncer for MockAnnouncer {
        async fn now_playing(&self, _channel_id: u64, _track: &Track) -> Option<u64> {
            Some(777)
        }

        async fn delete_message(&self, _channel_id: u64, _message_id: u64) {
            self.deleted.fetch_add(1, Ordering::SeqCst);
        }

        async fn notice(&self, _channel_id: u64, text: &str) {
            self.notices.lock().unwrap().push(text.to_string());
        }
    }

    struct Harness {
        service: MusicService,
        resolver: Arc<MockResolver>,
        voice: Arc<MockVoice>,
        announcer: Arc<MockAnnouncer>,
    }

    async fn harness(missing: &[&str], fail_starts: bool, with_catalog: bool) -> Harness {
        let resolver = Arc::new(MockResolver {
            missing: missing.iter().map(|s| s.to_string()).collect(),
            calls: AtomicUsize::new(0),
        });
        let voice = Arc::new(MockVoice {
            fail_starts,
            ..MockVoice::default()
        });
        let announcer = Arc::new(MockAnnouncer::default());
        let catalog: Option<Arc<dyn CatalogLookup>> = if with_catalog {
            Some(Arc::new(MockCatalog))
        } else {
            None
        };

        let service = MusicService::new(MusicBackends {
            resolver: resolver.clone(),
            catalog,
            voice: voice.clone(),
            announcer: announcer.clone(),
        });
        service.join(GUILD, VOICE).await.unwrap();

        Harness {
            service,
            resolver,
            voice,
            announcer,
        }
    }

    // ===== TESTS =====

    #[tokio::test]
    async fn first_enqueue_starts_playback() {
        let h = harness(&[], false, false).await;

        let outcome = h.service.enqueue(GUILD, TEXT, "song").await.unwrap();

        assert_eq!(
            outcome,
            EnqueueOutcome {
                added: 1,
                failed: 0,
                first_title: Some("song".to_string()),
                started: true
            }
        );
        assert_eq!(h.voice.started(), vec!["song"]);

        let second = h.service.enqueue(GUILD, TEXT, "other").await.unwrap();
        assert!(!second.started);
        assert_eq!(h.service.snapshot(GUILD).await.unwrap().total_queued, 1);
    }

    #[tokio::test]
    async fn single_track_is_appended_exactly_once() {
        let h = harness(&[], false, false).await;
        h.service.enqueue(GUILD, TEXT, "first").await.unwrap();

        h.service.enqueue(GUILD, TEXT, "second").await.unwrap();

        let snapshot = h.service.snapshot(GUILD).await.unwrap();
        let titles: Vec<String> = snapshot.upcoming.into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["second"]);
    }

    #[tokio::test]
    async fn unresolvable_query_appends_nothing() {
        let h = harness(&["ghost"], false, false).await;

        let err = h.service.enqueue(GUILD, TEXT, "ghost").await.unwrap_err();

        assert_eq!(err, MusicError::NotFound("ghost".into()));
        assert_eq!(h.resolver.calls.load(Ordering::SeqCst), 3);
        assert!(h.voice.started().is_empty());
        assert_eq!(h.service.snapshot(GUILD).await.unwrap().total_queued, 0);
    }

    #[tokio::test]
    async fn playlist_skips_missing_tracks() {
        let h = harness(&["gone c"], false, true).await;

        let outcome = h
            .service
            .enqueue(GUILD, TEXT, "https://open.spotify.com/playlist/abc")
            .await
            .unwrap();

        assert_eq!(outcome.added, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(h.voice.started(), vec!["one a"]);
    }

    #[tokio::test]
    async fn catalog_track_link_searches_name_and_artist() {
        let h = harness(&[], false, true).await;

        let phrases = h
            .service
            .search_phrases("https://open.spotify.com/track/xyz")
            .await
            .unwrap();

        assert_eq!(phrases, vec!["song artist"]);
    }

    #[tokio::test]
    async fn track_end_advances_queue() {
        let h = harness(&[], false, false).await;
        h.service
            .enqueue_phrases(GUILD, TEXT, vec!["a".into(), "b".into()])
            .await
            .unwrap();

        h.voice.end(0, PlaybackEnd::Finished);

        let snapshot = h.service.snapshot(GUILD).await.unwrap();
        assert_eq!(snapshot.current.unwrap().title, "b");
        assert_eq!(h.voice.started(), vec!["a", "b"]);
        // The first now-playing post was replaced
        assert_eq!(h.announcer.deleted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn loop_replays_current_track() {
        let h = harness(&[], false, false).await;
        h.service
            .enqueue_phrases(GUILD, TEXT, vec!["a".into(), "b".into()])
            .await
            .unwrap();
        assert!(h.service.toggle_loop(GUILD).await.unwrap());

        h.voice.end(0, PlaybackEnd::Finished);
        h.service.snapshot(GUILD).await.unwrap();

        assert_eq!(h.voice.started(), vec!["a", "a"]);
    }

    #[tokio::test]
    async fn stale_track_end_is_ignored() {
        let h = harness(&[], false, false).await;
        h.service
            .enqueue_phrases(GUILD, TEXT, vec!["a".into(), "b".into(), "c".into()])
            .await
            .unwrap();

        h.voice.end(0, PlaybackEnd::Finished);
        // Duplicate callback for the already finished playback
        h.voice.end(0, PlaybackEnd::Finished);
        h.service.snapshot(GUILD).await.unwrap();

        assert_eq!(h.voice.started(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn finished_queue_tears_down_once() {
        let h = harness(&[], false, false).await;
        h.service.enqueue(GUILD, TEXT, "only").await.unwrap();

        h.voice.end(0, PlaybackEnd::Finished);
        h.service.snapshot(GUILD).await.unwrap();

        assert_eq!(h.voice.disconnects.load(Ordering::SeqCst), 1);
        assert!(h
            .announcer
            .notices
            .lock()
            .unwrap()
            .contains(&"Queue finished, disconnecting.".to_string()));

        // A second teardown finds nothing to do
        h.service.teardown(GUILD).await.unwrap();
        assert_eq!(h.voice.disconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_queue_gives_up_after_retry_ceiling() {
        let h = harness(&[], true, false).await;

        let phrases = (0..6).map(|i| format!("t{i}")).collect();
        let outcome = h.service.enqueue_phrases(GUILD, TEXT, phrases).await.unwrap();

        assert!(!outcome.started);
        assert_eq!(h.voice.started().len(), 3);
        assert_eq!(h.voice.disconnects.load(Ordering::SeqCst), 1);
        assert_eq!(h.service.snapshot(GUILD).await.unwrap().total_queued, 0);
    }

    #[tokio::test]
    async fn playback_failure_moves_to_next_track() {
        let h = harness(&[], false, false).await;
        h.service
            .enqueue_phrases(GUILD, TEXT, vec!["a".into(), "b".into()])
            .await
            .unwrap();

        h.voice.end(0, PlaybackEnd::Failed("decoder error".into()));
        let snapshot = h.service.snapshot(GUILD).await.unwrap();

        assert_eq!(snapshot.current.unwrap().title, "b");
        assert_eq!(h.announcer.notices.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stop_while_idle_still_tears_down() {
        let h = harness(&[], false, false).await;

        assert!(!h.service.stop(GUILD).await.unwrap());
        assert_eq!(h.voice.disconnects.load(Ordering::SeqCst), 1);
        assert_eq!(h.service.connected_channel(GUILD).await, None);
    }

    #[tokio::test]
    async fn stop_clears_queue_even_when_looping() {
        let h = harness(&[], false, false).await;
        h.service
            .enqueue_phrases(GUILD, TEXT, vec!["a".into(), "b".into()])
            .await
            .unwrap();
        h.service.toggle_loop(GUILD).await.unwrap();

        assert!(h.service.stop(GUILD).await.unwrap());
        // The stopped playback's callback arrives late and must not restart anything
        h.voice.end(0, PlaybackEnd::Finished);

        let snapshot = h.service.snapshot(GUILD).await.unwrap();
        assert_eq!(snapshot.current, None);
        assert_eq!(snapshot.total_queued, 0);
        assert!(!snapshot.looping);
        assert_eq!(h.voice.started(), vec!["a"]);
    }

    #[tokio::test]
    async fn controls_report_idle_player() {
        let h = harness(&[], false, false).await;

        assert_eq!(h.service.skip(GUILD).await.unwrap(), None);
        assert!(!h.service.pause(GUILD).await.unwrap());
        assert!(!h.service.set_volume(GUILD, 80).await.unwrap());
        assert!(!h.service.shuffle(GUILD).await.unwrap());
        assert_eq!(h.service.toggle_pause(GUILD).await.unwrap(), None);
        assert_eq!(h.service.now_playing(GUILD).await.unwrap(), None);
    }

    #[tokio::test]
    async fn pause_resume_and_volume_while_playing() {
        let h = harness(&[], false, false).await;
        h.service.enqueue(GUILD, TEXT, "a").await.unwrap();

        assert_eq!(
            h.service.toggle_pause(GUILD).await.unwrap(),
            Some(PauseState::Paused)
        );
        assert!(!h.service.pause(GUILD).await.unwrap());
        assert!(h.service.resume(GUILD).await.unwrap());

        assert!(h.service.set_volume(GUILD, 500).await.unwrap());
        assert_eq!(h.service.snapshot(GUILD).await.unwrap().volume_percent, 200);
    }

    #[tokio::test]
    async fn player_is_released_after_teardown() {
        let h = harness(&[], false, false).await;
        h.service.enqueue(GUILD, TEXT, "a").await.unwrap();
        assert_eq!(h.service.players.active_count(), 1);

        assert!(h.service.stop(GUILD).await.unwrap());
        assert_eq!(h.service.players.active_count(), 0);

        // A new session gets a fresh player
        h.service.join(GUILD, VOICE).await.unwrap();
        let outcome = h.service.enqueue(GUILD, TEXT, "b").await.unwrap();
        assert!(outcome.started);
        assert_eq!(h.service.players.active_count(), 1);
    }

    #[tokio::test]
    async fn finished_queue_releases_player() {
        let h = harness(&[], false, false).await;
        h.service.enqueue(GUILD, TEXT, "only").await.unwrap();

        h.voice.end(0, PlaybackEnd::Finished);
        // Queued behind the track end, answered after the player is gone
        let snapshot = h.service.snapshot(GUILD).await.unwrap();

        assert_eq!(snapshot.current, None);
        assert_eq!(h.service.players.active_count(), 0);
    }

    #[tokio::test]
    async fn queries_on_idle_guild_spawn_nothing() {
        let h = harness(&[], false, false).await;

        let snapshot = h.service.snapshot(GUILD).await.unwrap();
        assert_eq!(snapshot.total_queued, 0);
        assert_eq!(snapshot.volume_percent, 50);
        assert_eq!(h.service.skip(GUILD).await.unwrap(), None);
        h.service.teardown(GUILD).await.unwrap();

        assert_eq!(h.service.players.active_count(), 0);
    }

    #[tokio::test]
    async fn teardown_resets_volume() {
        let h = harness(&[], false, false).await;
        h.service.enqueue(GUILD, TEXT, "a").await.unwrap();
        h.service.set_volume(GUILD, 150).await.unwrap();

        h.service.teardown(GUILD).await.unwrap();

        assert_eq!(h.service.snapshot(GUILD).await.unwrap().volume_percent, 50);
    }
}
