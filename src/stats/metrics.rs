//! Statistics for the stream controller and player

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Controller-level statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerStats {
    /// Starts entered, user-initiated or scheduled
    pub starts: u64,
    /// Starts triggered by a reconnect or source switch
    pub restarts: u64,
    /// Refresh ticks that re-issued the stream URL
    pub refreshes: u64,
    /// Delivery failures for the current generation
    pub delivery_failures: u64,
    /// Reconnects scheduled by the recovery monitor
    pub reconnects_scheduled: u64,
    /// Completions and reports discarded as stale
    pub stale_discards: u64,
}

/// Lock-free counters behind [`ControllerStats`]
#[derive(Debug, Default)]
pub struct ControllerCounters {
    pub starts: AtomicU64,
    pub restarts: AtomicU64,
    pub refreshes: AtomicU64,
    pub delivery_failures: AtomicU64,
    pub reconnects_scheduled: AtomicU64,
    pub stale_discards: AtomicU64,
}

impl ControllerCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ControllerStats {
        ControllerStats {
            starts: self.starts.load(Ordering::Relaxed),
            restarts: self.restarts.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            reconnects_scheduled: self.reconnects_scheduled.load(Ordering::Relaxed),
            stale_discards: self.stale_discards.load(Ordering::Relaxed),
        }
    }
}

/// Player-level statistics
#[derive(Debug, Clone)]
pub struct PlayerStats {
    /// When the player was created
    pub started_at: Instant,
    /// HTTP fetches that got a successful response
    pub fetches: u64,
    /// JPEG frames published
    pub frames: u64,
    /// Total JPEG payload bytes published
    pub bytes: u64,
}

impl PlayerStats {
    /// Time since the player was created
    pub fn duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Average payload bitrate in bits per second
    pub fn bitrate(&self) -> u64 {
        let secs = self.duration().as_secs();
        if secs > 0 {
            (self.bytes * 8) / secs
        } else {
            0
        }
    }

    /// Average frames per second
    pub fn framerate(&self) -> f64 {
        let secs = self.duration().as_secs_f64();
        if secs > 0.0 {
            self.frames as f64 / secs
        } else {
            0.0
        }
    }
}

/// Lock-free counters behind [`PlayerStats`]
#[derive(Debug)]
pub struct PlayerCounters {
    started_at: Instant,
    fetches: AtomicU64,
    frames: AtomicU64,
    bytes: AtomicU64,
}

impl Default for PlayerCounters {
    fn default() -> Self {
        Self {
            started_at: Instant::now(),
            fetches: AtomicU64::new(0),
            frames: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
        }
    }
}

impl PlayerCounters {
    pub fn record_fetch(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame(&self, len: usize) {
        self.frames.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(len as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PlayerStats {
        PlayerStats {
            started_at: self.started_at,
            fetches: self.fetches.load(Ordering::Relaxed),
            frames: self.frames.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controller_counters_snapshot() {
        let counters = ControllerCounters::default();
        ControllerCounters::bump(&counters.starts);
        ControllerCounters::bump(&counters.starts);
        ControllerCounters::bump(&counters.stale_discards);

        let stats = counters.snapshot();
        assert_eq!(stats.starts, 2);
        assert_eq!(stats.stale_discards, 1);
        assert_eq!(stats.refreshes, 0);
    }

    #[test]
    fn test_player_counters() {
        let counters = PlayerCounters::default();
        counters.record_fetch();
        counters.record_frame(1_000);
        counters.record_frame(500);

        let stats = counters.snapshot();
        assert_eq!(stats.fetches, 1);
        assert_eq!(stats.frames, 2);
        assert_eq!(stats.bytes, 1_500);
    }

    #[test]
    fn test_player_bitrate() {
        let stats = PlayerStats {
            started_at: Instant::now() - Duration::from_secs(10),
            fetches: 1,
            frames: 100,
            bytes: 1_000_000,
        };

        // 1,000,000 bytes * 8 bits / 10 seconds
        assert_eq!(stats.bitrate(), 800_000);
        assert!(stats.framerate() > 9.0 && stats.framerate() <= 10.0);
    }

    #[test]
    fn test_player_bitrate_zero_duration() {
        let stats = PlayerCounters::default().snapshot();
        assert_eq!(stats.bitrate(), 0);
    }
}
