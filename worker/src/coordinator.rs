use std::{
    collections::VecDeque,
    num::NonZeroUsize,
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
};

use parking_lot::Mutex;

/// What `EpisodeCoordinator::record` observed for a finished episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeRecord {
    /// The global, 1-based number of this episode.
    pub episode: u64,
    /// The mean score of the trailing window, including this episode.
    pub average: f32,
    /// Whether the task is considered solved.
    pub solved: bool,
    /// Whether this very episode is the one that solved the task.
    pub newly_solved: bool,
    /// Whether workers should stop after this episode.
    pub stop: bool,
}

/// Process wide episode bookkeeping shared by every worker.
///
/// Keeps the global episode counter and a FIFO window with the latest scores from any worker.
/// The task is solved once the window is full and its mean reaches the threshold, after that
/// it stays solved.
#[derive(Debug)]
pub struct EpisodeCoordinator {
    episodes: AtomicU64,
    solved: AtomicBool,
    window: Mutex<VecDeque<f32>>,
    capacity: NonZeroUsize,
    threshold: f32,
    max_episodes: Option<u64>,
}

impl EpisodeCoordinator {
    /// Creates a new `EpisodeCoordinator`.
    ///
    /// # Arguments
    /// * `capacity` - The length of the trailing score window.
    /// * `threshold` - The mean score that solves the task.
    /// * `max_episodes` - An optional global cap on the amount of episodes.
    ///
    /// # Returns
    /// A new `EpisodeCoordinator` instance.
    pub fn new(capacity: NonZeroUsize, threshold: f32, max_episodes: Option<u64>) -> Self {
        Self {
            episodes: AtomicU64::new(0),
            solved: AtomicBool::new(false),
            window: Mutex::new(VecDeque::with_capacity(capacity.get())),
            capacity,
            threshold,
            max_episodes,
        }
    }

    /// Records the score of a finished episode.
    ///
    /// # Arguments
    /// * `score` - The total reward of the episode.
    ///
    /// # Returns
    /// The state of the coordinator right after recording it.
    pub fn record(&self, score: f32) -> EpisodeRecord {
        let mut window = self.window.lock();
        let episode = self.episodes.fetch_add(1, Ordering::AcqRel) + 1;

        if window.len() == self.capacity.get() {
            window.pop_front();
        }
        window.push_back(score);

        let average = mean(&window);
        let full = window.len() == self.capacity.get();
        drop(window);

        let newly_solved = full
            && average >= self.threshold
            && !self.solved.swap(true, Ordering::AcqRel);

        let solved = self.is_solved();

        EpisodeRecord {
            episode,
            average,
            solved,
            newly_solved,
            stop: solved || self.cap_reached(episode),
        }
    }

    /// The global stop predicate every worker polls before starting an episode.
    pub fn should_stop(&self) -> bool {
        self.is_solved() || self.cap_reached(self.episodes())
    }

    /// The amount of episodes recorded so far.
    pub fn episodes(&self) -> u64 {
        self.episodes.load(Ordering::Acquire)
    }

    pub fn is_solved(&self) -> bool {
        self.solved.load(Ordering::Acquire)
    }

    /// The mean of the trailing window, `None` before the first episode.
    pub fn average(&self) -> Option<f32> {
        let window = self.window.lock();
        (!window.is_empty()).then(|| mean(&window))
    }

    /// A copy of the trailing window, oldest score first.
    pub fn window(&self) -> Vec<f32> {
        self.window.lock().iter().copied().collect()
    }

    fn cap_reached(&self, episodes: u64) -> bool {
        self.max_episodes.is_some_and(|max| episodes >= max)
    }
}

fn mean(window: &VecDeque<f32>) -> f32 {
    window.iter().sum::<f32>() / window.len().max(1) as f32
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    fn coordinator(capacity: usize, threshold: f32) -> EpisodeCoordinator {
        EpisodeCoordinator::new(NonZeroUsize::new(capacity).unwrap(), threshold, None)
    }

    #[test]
    fn window_is_fifo() {
        let coordinator = coordinator(3, f32::INFINITY);

        for score in [1., 2., 3., 4., 5.] {
            coordinator.record(score);
        }

        assert_eq!(coordinator.window(), [3., 4., 5.]);
        assert_eq!(coordinator.average(), Some(4.));
        assert_eq!(coordinator.episodes(), 5);
    }

    #[test]
    fn solved_only_once_the_window_is_full() {
        let coordinator = coordinator(3, 10.);

        let first = coordinator.record(5.);
        assert!(!first.solved && !first.stop);

        // 15 alone would pass the threshold, but the window isn't full yet.
        let second = coordinator.record(15.);
        assert!(!second.solved && !second.stop);

        let third = coordinator.record(20.);
        assert!(third.solved && third.newly_solved && third.stop);
        assert!(coordinator.should_stop());
    }

    #[test]
    fn solved_is_sticky() {
        let coordinator = coordinator(1, 10.);

        assert!(coordinator.record(10.).newly_solved);
        let record = coordinator.record(0.);
        assert!(record.solved && !record.newly_solved);
        assert!(coordinator.is_solved());
    }

    #[test]
    fn counter_is_exact_under_concurrency() {
        const THREADS: usize = 8;
        const EPISODES: usize = 500;

        let coordinator = Arc::new(coordinator(100, f32::INFINITY));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let coordinator = Arc::clone(&coordinator);
                thread::spawn(move || {
                    for _ in 0..EPISODES {
                        coordinator.record(1.);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(coordinator.episodes(), (THREADS * EPISODES) as u64);
        assert_eq!(coordinator.window().len(), 100);
    }

    #[test]
    fn global_cap_stops_workers() {
        let coordinator = EpisodeCoordinator::new(NonZeroUsize::new(10).unwrap(), 100., Some(2));

        assert!(!coordinator.record(0.).stop);
        assert!(coordinator.record(0.).stop);
        assert!(coordinator.should_stop());
        assert!(!coordinator.is_solved());
    }
}
