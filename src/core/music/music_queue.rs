// Pure queue state for one guild: pending tracks, the current track and the loop flag.

use super::music_models::Track;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct MusicQueue {
    pending: VecDeque<Track>,
    current: Option<Track>,
    looping: bool,
}

impl MusicQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, tracks: impl IntoIterator<Item = Track>) {
        self.pending.extend(tracks);
    }

    /// Pick what plays next and make it current.
    ///
    /// With looping on, the current track repeats. Otherwise the head of the
    /// queue is taken; an empty queue clears the current track.
    pub fn select_next(&mut self) -> Option<Track> {
        if self.looping {
            if let Some(current) = &self.current {
                return Some(current.clone());
            }
        }

        self.current = self.pending.pop_front();
        self.current.clone()
    }

    /// Forget the current track so looping can't replay it.
    pub fn clear_current(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn looping(&self) -> bool {
        self.looping
    }

    /// Returns the new loop state.
    pub fn toggle_loop(&mut self) -> bool {
        self.looping = !self.looping;
        self.looping
    }

    /// Uniformly permute pending tracks. `false` when there is nothing to shuffle.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if self.pending.is_empty() {
            return false;
        }
        self.pending.make_contiguous().shuffle(rng);
        true
    }

    pub fn upcoming(&self, limit: usize) -> Vec<Track> {
        self.pending.iter().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop pending tracks, the current track and the loop flag.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.current = None;
        self.looping = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn track(title: &str) -> Track {
        Track {
            source_url: format!("https://stream/{title}"),
            title: title.to_string(),
            thumbnail: None,
            page_url: None,
        }
    }

    fn titles(tracks: &[Track]) -> Vec<&str> {
        tracks.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn plays_in_fifo_order() {
        let mut queue = MusicQueue::new();
        queue.extend([track("a"), track("b")]);

        assert_eq!(queue.select_next().unwrap().title, "a");
        assert_eq!(queue.current().unwrap().title, "a");
        assert_eq!(queue.select_next().unwrap().title, "b");
        assert_eq!(queue.select_next(), None);
        assert_eq!(queue.current(), None);
    }

    #[test]
    fn loop_replays_current_track() {
        let mut queue = MusicQueue::new();
        queue.extend([track("a"), track("b")]);
        queue.select_next();
        assert!(queue.toggle_loop());

        assert_eq!(queue.select_next().unwrap().title, "a");
        assert_eq!(queue.select_next().unwrap().title, "a");
        assert_eq!(queue.len(), 1);

        assert!(!queue.toggle_loop());
        assert_eq!(queue.select_next().unwrap().title, "b");
    }

    #[test]
    fn cleared_current_is_not_looped() {
        let mut queue = MusicQueue::new();
        queue.extend([track("a"), track("b")]);
        queue.toggle_loop();
        queue.select_next();

        queue.clear_current();

        assert_eq!(queue.select_next().unwrap().title, "b");
    }

    #[test]
    fn shuffle_keeps_the_same_tracks() {
        let mut queue = MusicQueue::new();
        let originals: Vec<Track> = (0..10).map(|i| track(&i.to_string())).collect();
        queue.extend(originals.clone());
        let mut rng = StdRng::seed_from_u64(3);

        assert!(queue.shuffle(&mut rng));

        let mut shuffled = titles(&queue.upcoming(usize::MAX))
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        shuffled.sort();
        let mut expected: Vec<String> = titles(&originals).into_iter().map(str::to_string).collect();
        expected.sort();
        assert_eq!(shuffled, expected);
    }

    #[test]
    fn shuffle_on_empty_queue_reports_false() {
        let mut queue = MusicQueue::new();
        let mut rng = StdRng::seed_from_u64(3);

        assert!(!queue.shuffle(&mut rng));
    }

    #[test]
    fn upcoming_is_limited() {
        let mut queue = MusicQueue::new();
        queue.extend((0..20).map(|i| track(&i.to_string())));

        assert_eq!(queue.upcoming(15).len(), 15);
        assert_eq!(queue.len(), 20);
    }

    #[test]
    fn reset_clears_everything() {
        let mut queue = MusicQueue::new();
        queue.extend([track("a"), track("b")]);
        queue.select_next();
        queue.toggle_loop();

        queue.reset();

        assert!(queue.is_empty());
        assert_eq!(queue.current(), None);
        assert!(!queue.looping());
    }
}
