// Per-guild music actor.
//
// One task per guild owns all playback state and processes commands from its
// mailbox one at a time: slash commands, buttons and track-end callbacks all
// go through here, so no two of them ever interleave.
//
// An actor only lives while its guild has a session. After a teardown it
// removes itself from the registry and exits; the next command that needs
// playback state spawns a fresh one.

use super::music_models::{
    MusicError, PauseState, PlaybackEnd, QueueSnapshot, Track, DEFAULT_VOLUME,
    MAX_START_ATTEMPTS, SNAPSHOT_LIMIT,
};
use super::music_ports::{EndCallback, MusicAnnouncer, PlaybackControl, VoiceLink};
use super::music_queue::MusicQueue;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

pub(super) type Reply<T> = oneshot::Sender<T>;

pub(super) enum PlayerCommand {
    Enqueue {
        channel_id: u64,
        tracks: Vec<Track>,
        reply: Reply<bool>,
    },
    TrackEnded {
        generation: u64,
        end: PlaybackEnd,
    },
    Skip {
        reply: Reply<Option<Track>>,
    },
    Stop {
        reply: Reply<bool>,
    },
    Pause {
        reply: Reply<bool>,
    },
    Resume {
        reply: Reply<bool>,
    },
    TogglePause {
        reply: Reply<Option<PauseState>>,
    },
    ToggleLoop {
        reply: Reply<bool>,
    },
    Shuffle {
        reply: Reply<bool>,
    },
    SetVolume {
        percent: u32,
        reply: Reply<bool>,
    },
    NowPlaying {
        reply: Reply<Option<Track>>,
    },
    Snapshot {
        reply: Reply<QueueSnapshot>,
    },
    Teardown {
        reply: Option<Reply<()>>,
    },
}

impl PlayerCommand {
    /// Answer the command the way a player with no session would.
    ///
    /// Gives the command back when it needs a live player.
    fn answer_idle(self) -> Result<(), PlayerCommand> {
        match self {
            PlayerCommand::TrackEnded { .. } => {}
            PlayerCommand::Skip { reply } | PlayerCommand::NowPlaying { reply } => {
                let _ = reply.send(None);
            }
            PlayerCommand::Pause { reply }
            | PlayerCommand::Resume { reply }
            | PlayerCommand::Shuffle { reply }
            | PlayerCommand::SetVolume { reply, .. } => {
                let _ = reply.send(false);
            }
            PlayerCommand::TogglePause { reply } => {
                let _ = reply.send(None);
            }
            PlayerCommand::Snapshot { reply } => {
                let _ = reply.send(QueueSnapshot {
                    current: None,
                    upcoming: Vec::new(),
                    total_queued: 0,
                    looping: false,
                    paused: false,
                    volume_percent: (DEFAULT_VOLUME * 100.0).round() as u32,
                });
            }
            PlayerCommand::Teardown { reply } => {
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
            }
            command @ (PlayerCommand::Enqueue { .. }
            | PlayerCommand::Stop { .. }
            | PlayerCommand::ToggleLoop { .. }) => return Err(command),
        }
        Ok(())
    }
}

/// Mailboxes of the guilds that currently have a player.
pub(super) struct PlayerRegistry {
    voice: Arc<dyn VoiceLink>,
    announcer: Arc<dyn MusicAnnouncer>,
    players: DashMap<u64, mpsc::UnboundedSender<PlayerCommand>>,
}

impl PlayerRegistry {
    pub(super) fn new(voice: Arc<dyn VoiceLink>, announcer: Arc<dyn MusicAnnouncer>) -> Self {
        Self {
            voice,
            announcer,
            players: DashMap::new(),
        }
    }

    /// Route a command to the guild's player, spawning one only when the
    /// command needs playback state.
    ///
    /// Sends happen under the map entry lock, so a player that has removed
    /// itself never receives anything new.
    pub(super) fn dispatch(
        self: &Arc<Self>,
        guild_id: u64,
        command: PlayerCommand,
    ) -> Result<(), MusicError> {
        if let Some(mailbox) = self.players.get(&guild_id) {
            return mailbox.send(command).map_err(|_| MusicError::PlayerGone);
        }

        let Err(command) = command.answer_idle() else {
            return Ok(());
        };
        self.players
            .entry(guild_id)
            .or_insert_with(|| GuildPlayer::spawn(guild_id, Arc::clone(self)))
            .send(command)
            .map_err(|_| MusicError::PlayerGone)
    }

    pub(super) fn is_active(&self, guild_id: u64) -> bool {
        self.players.contains_key(&guild_id)
    }

    #[cfg(test)]
    pub(super) fn active_count(&self) -> usize {
        self.players.len()
    }

    /// Drop the guild's entry if it still belongs to `mailbox`.
    fn remove(&self, guild_id: u64, mailbox: &mpsc::UnboundedSender<PlayerCommand>) -> bool {
        self.players
            .remove_if(&guild_id, |_, current| current.same_channel(mailbox))
            .is_some()
    }
}

pub(super) struct GuildPlayer {
    guild_id: u64,
    voice: Arc<dyn VoiceLink>,
    announcer: Arc<dyn MusicAnnouncer>,
    registry: Arc<PlayerRegistry>,
    mailbox: mpsc::UnboundedSender<PlayerCommand>,
    /// Set once the player has removed itself from the registry.
    retired: bool,

    queue: MusicQueue,
    paused: bool,
    volume: f32,
    playback: Option<Box<dyn PlaybackControl>>,
    /// (channel, message) of the current now-playing post.
    now_playing_message: Option<(u64, u64)>,
    announce_channel: Option<u64>,
    /// Bumped on every start and teardown; end callbacks carrying an older value are ignored.
    generation: u64,
}

impl GuildPlayer {
    /// Spawn the actor task and return its mailbox.
    fn spawn(guild_id: u64, registry: Arc<PlayerRegistry>) -> mpsc::UnboundedSender<PlayerCommand> {
        let (tx, rx) = mpsc::unbounded_channel();
        let player = GuildPlayer {
            guild_id,
            voice: registry.voice.clone(),
            announcer: registry.announcer.clone(),
            registry,
            mailbox: tx.clone(),
            retired: false,
            queue: MusicQueue::new(),
            paused: false,
            volume: DEFAULT_VOLUME,
            playback: None,
            now_playing_message: None,
            announce_channel: None,
            generation: 0,
        };
        tokio::spawn(player.run(rx));
        tx
    }

    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<PlayerCommand>) {
        debug!(guild_id = self.guild_id, "Music player started");
        while let Some(command) = inbox.recv().await {
            self.handle(command).await;
            if self.retired {
                break;
            }
        }

        // Commands that were queued before the player removed itself.
        inbox.close();
        while let Some(command) = inbox.recv().await {
            if let Err(e) = self.registry.dispatch(self.guild_id, command) {
                warn!(guild_id = self.guild_id, error = %e, "Could not hand over music command");
            }
        }
        debug!(guild_id = self.guild_id, "Music player stopped");
    }

    async fn handle(&mut self, command: PlayerCommand) {
        match command {
            PlayerCommand::Enqueue {
                channel_id,
                tracks,
                reply,
            } => {
                self.announce_channel = Some(channel_id);
                self.queue.extend(tracks);
                let idle = self.playback.is_none();
                if idle {
                    self.advance().await;
                }
                let _ = reply.send(idle && self.playback.is_some());
            }
            PlayerCommand::TrackEnded { generation, end } => {
                if generation != self.generation {
                    debug!(guild_id = self.guild_id, generation, "Ignoring stale track end");
                    return;
                }
                self.playback = None;
                if let PlaybackEnd::Failed(reason) = end {
                    let title = self
                        .queue
                        .current()
                        .map(|t| t.title.clone())
                        .unwrap_or_default();
                    warn!(guild_id = self.guild_id, %reason, "Track failed during playback");
                    self.notify(&format!("Playback of **{title}** failed: {reason}"))
                        .await;
                }
                self.advance().await;
            }
            PlayerCommand::Skip { reply } => {
                let skipped = match &self.playback {
                    Some(playback) => {
                        let _ = playback.stop();
                        self.queue.current().cloned()
                    }
                    None => None,
                };
                let _ = reply.send(skipped);
            }
            PlayerCommand::Stop { reply } => {
                let was_playing = self.playback.is_some();
                self.teardown().await;
                let _ = reply.send(was_playing);
            }
            PlayerCommand::Pause { reply } => {
                let _ = reply.send(self.pause());
            }
            PlayerCommand::Resume { reply } => {
                let _ = reply.send(self.resume());
            }
            PlayerCommand::TogglePause { reply } => {
                let state = if self.playback.is_none() {
                    None
                } else if self.paused {
                    self.resume().then_some(PauseState::Resumed)
                } else {
                    self.pause().then_some(PauseState::Paused)
                };
                let _ = reply.send(state);
            }
            PlayerCommand::ToggleLoop { reply } => {
                let _ = reply.send(self.queue.toggle_loop());
            }
            PlayerCommand::Shuffle { reply } => {
                let shuffled = self.queue.shuffle(&mut rand::thread_rng());
                let _ = reply.send(shuffled);
            }
            PlayerCommand::SetVolume { percent, reply } => {
                let applied = match &self.playback {
                    Some(playback) => {
                        self.volume = percent as f32 / 100.0;
                        playback.set_volume(self.volume).is_ok()
                    }
                    None => false,
                };
                let _ = reply.send(applied);
            }
            PlayerCommand::NowPlaying { reply } => {
                let current = self
                    .playback
                    .as_ref()
                    .and_then(|_| self.queue.current().cloned());
                let _ = reply.send(current);
            }
            PlayerCommand::Snapshot { reply } => {
                let _ = reply.send(QueueSnapshot {
                    current: self.queue.current().cloned(),
                    upcoming: self.queue.upcoming(SNAPSHOT_LIMIT),
                    total_queued: self.queue.len(),
                    looping: self.queue.looping(),
                    paused: self.paused,
                    volume_percent: (self.volume * 100.0).round() as u32,
                });
            }
            PlayerCommand::Teardown { reply } => {
                self.teardown().await;
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
            }
        }
    }

    fn pause(&mut self) -> bool {
        match &self.playback {
            Some(playback) if !self.paused => {
                self.paused = playback.pause().is_ok();
                self.paused
            }
            _ => false,
        }
    }

    fn resume(&mut self) -> bool {
        match &self.playback {
            Some(playback) if self.paused => {
                self.paused = playback.resume().is_err();
                !self.paused
            }
            _ => false,
        }
    }

    /// Start whatever plays next, or tear down when there is nothing left.
    async fn advance(&mut self) {
        if !self.voice.is_connected(self.guild_id).await {
            debug!(guild_id = self.guild_id, "Voice connection gone, tearing down");
            self.teardown().await;
            return;
        }

        self.delete_now_playing().await;

        for _ in 0..MAX_START_ATTEMPTS {
            let Some(track) = self.queue.select_next() else {
                self.notify("Queue finished, disconnecting.").await;
                self.teardown().await;
                return;
            };

            match self.start(&track).await {
                Ok(()) => {
                    info!(guild_id = self.guild_id, title = %track.title, "Now playing");
                    if let Some(channel_id) = self.announce_channel {
                        if let Some(message_id) =
                            self.announcer.now_playing(channel_id, &track).await
                        {
                            self.now_playing_message = Some((channel_id, message_id));
                        }
                    }
                    return;
                }
                Err(e) => {
                    warn!(guild_id = self.guild_id, title = %track.title, error = %e, "Could not start track");
                    self.notify(&format!("Could not play **{}**: {e}", track.title))
                        .await;
                    self.queue.clear_current();
                }
            }
        }

        self.notify("Too many tracks in a row failed to play, stopping.")
            .await;
        self.teardown().await;
    }

    async fn start(&mut self, track: &Track) -> Result<(), MusicError> {
        self.generation += 1;
        let generation = self.generation;
        let mailbox = self.mailbox.clone();
        let on_end: EndCallback = Arc::new(move |end| {
            let _ = mailbox.send(PlayerCommand::TrackEnded { generation, end });
        });

        let playback = self
            .voice
            .start(self.guild_id, track, self.volume, on_end)
            .await?;
        self.playback = Some(playback);
        self.paused = false;
        Ok(())
    }

    /// Reset the session. Safe to call repeatedly.
    async fn teardown(&mut self) {
        let was_active = self.playback.is_some() || self.queue.current().is_some();
        self.generation += 1;

        if let Some(playback) = self.playback.take() {
            let _ = playback.stop();
        }
        self.delete_now_playing().await;

        if was_active || self.voice.is_connected(self.guild_id).await {
            self.voice.disconnect(self.guild_id).await;
            info!(guild_id = self.guild_id, "Music session ended");
        }

        self.queue.reset();
        self.paused = false;
        self.volume = DEFAULT_VOLUME;
        self.retired = self.registry.remove(self.guild_id, &self.mailbox);
    }

    async fn delete_now_playing(&mut self) {
        if let Some((channel_id, message_id)) = self.now_playing_message.take() {
            self.announcer.delete_message(channel_id, message_id).await;
        }
    }

    async fn notify(&self, text: &str) {
        if let Some(channel_id) = self.announce_channel {
            self.announcer.notice(channel_id, text).await;
        }
    }
}
