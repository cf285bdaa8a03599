//! Build phases and progress reporting.
//!
//! A build pushes progress records to a [`BuildObserver`]. Closures,
//! [`NullObserver`], and [`ChannelObserver`] all implement it, so a host can
//! either react inline or drain [`ProgressEvent`]s from a channel.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Phase of an index build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildPhase {
    #[default]
    Idle,
    Parsing,
    CallGraph,
    Trigrams,
    Inverted,
    Complete,
    Failed,
}

impl BuildPhase {
    /// Progress band `(start, end)` in percent.
    pub fn band(&self) -> (u8, u8) {
        match self {
            BuildPhase::Idle => (0, 0),
            BuildPhase::Parsing => (0, 50),
            BuildPhase::CallGraph => (50, 60),
            BuildPhase::Trigrams => (60, 75),
            BuildPhase::Inverted => (75, 100),
            BuildPhase::Complete => (100, 100),
            BuildPhase::Failed => (0, 0),
        }
    }

    /// Percent for `done` out of `total` units of work within this phase.
    pub fn percent(&self, done: usize, total: usize) -> u8 {
        let (start, end) = self.band();
        if total == 0 || end <= start {
            return start;
        }
        let span = (end - start) as usize;
        let offset = (done.min(total) * span) / total;
        start + offset as u8
    }

    /// Phase that follows this one in a successful build.
    pub fn next(&self) -> BuildPhase {
        match self {
            BuildPhase::Idle => BuildPhase::Parsing,
            BuildPhase::Parsing => BuildPhase::CallGraph,
            BuildPhase::CallGraph => BuildPhase::Trigrams,
            BuildPhase::Trigrams => BuildPhase::Inverted,
            BuildPhase::Inverted => BuildPhase::Complete,
            BuildPhase::Complete => BuildPhase::Complete,
            BuildPhase::Failed => BuildPhase::Failed,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(
            self,
            BuildPhase::Parsing | BuildPhase::CallGraph | BuildPhase::Trigrams | BuildPhase::Inverted
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            BuildPhase::Idle => "idle",
            BuildPhase::Parsing => "parsing",
            BuildPhase::CallGraph => "callgraph",
            BuildPhase::Trigrams => "trigrams",
            BuildPhase::Inverted => "inverted",
            BuildPhase::Complete => "complete",
            BuildPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Running counters attached to a progress record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStats {
    pub phase: BuildPhase,
    pub files_indexed: usize,
    pub symbols_found: usize,
    pub functions_found: usize,
    pub summaries_found: usize,
}

/// Receives progress from a running build.
pub trait BuildObserver {
    /// Called as work advances; `percent` is 0-100.
    fn on_progress(&mut self, percent: u8, message: &str, stats: Option<&ProgressStats>);

    /// Free-form status line meant for a chat transcript.
    fn on_chat_message(&mut self, _message: &str) {}
}

impl<F> BuildObserver for F
where
    F: FnMut(u8, &str, Option<&ProgressStats>),
{
    fn on_progress(&mut self, percent: u8, message: &str, stats: Option<&ProgressStats>) {
        self(percent, message, stats)
    }
}

/// Observer that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl BuildObserver for NullObserver {
    fn on_progress(&mut self, _percent: u8, _message: &str, _stats: Option<&ProgressStats>) {}
}

/// A single record written by [`ChannelObserver`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ProgressEvent {
    Progress {
        percent: u8,
        message: String,
        stats: Option<ProgressStats>,
    },
    ChatMessage {
        message: String,
    },
}

/// Forwards progress into an unbounded channel.
///
/// Send failures (receiver dropped) are ignored; a build never fails
/// because nobody is listening.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }

    /// Create an observer together with its receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl BuildObserver for ChannelObserver {
    fn on_progress(&mut self, percent: u8, message: &str, stats: Option<&ProgressStats>) {
        let _ = self.tx.send(ProgressEvent::Progress {
            percent,
            message: message.to_string(),
            stats: stats.copied(),
        });
    }

    fn on_chat_message(&mut self, message: &str) {
        let _ = self.tx.send(ProgressEvent::ChatMessage {
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_bands_are_ordered() {
        let phases = [
            BuildPhase::Parsing,
            BuildPhase::CallGraph,
            BuildPhase::Trigrams,
            BuildPhase::Inverted,
        ];
        for pair in phases.windows(2) {
            assert_eq!(pair[0].band().1, pair[1].band().0);
            assert_eq!(pair[0].next(), pair[1]);
        }
        assert_eq!(BuildPhase::Inverted.next(), BuildPhase::Complete);
    }

    #[test]
    fn test_percent_within_band() {
        assert_eq!(BuildPhase::Parsing.percent(0, 10), 0);
        assert_eq!(BuildPhase::Parsing.percent(5, 10), 25);
        assert_eq!(BuildPhase::Parsing.percent(10, 10), 50);
        assert_eq!(BuildPhase::CallGraph.percent(1, 2), 55);
        assert_eq!(BuildPhase::Inverted.percent(3, 0), 75);
        assert_eq!(BuildPhase::Inverted.percent(20, 10), 100);
    }

    #[test]
    fn test_closure_observer() {
        let mut seen = Vec::new();
        {
            let mut observer = |percent: u8, message: &str, _stats: Option<&ProgressStats>| {
                seen.push((percent, message.to_string()));
            };
            observer.on_progress(10, "parsing", None);
            observer.on_chat_message("ignored by default");
        }
        assert_eq!(seen, vec![(10, "parsing".to_string())]);
    }

    #[test]
    fn test_channel_observer() {
        let (mut observer, mut rx) = ChannelObserver::channel();
        let stats = ProgressStats {
            files_indexed: 2,
            ..Default::default()
        };
        observer.on_progress(40, "files", Some(&stats));
        observer.on_chat_message("hello");

        match rx.try_recv().unwrap() {
            ProgressEvent::Progress { percent, stats, .. } => {
                assert_eq!(percent, 40);
                assert_eq!(stats.unwrap().files_indexed, 2);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(
            rx.try_recv().unwrap(),
            ProgressEvent::ChatMessage {
                message: "hello".to_string()
            }
        );
    }

    #[test]
    fn test_channel_observer_ignores_dropped_receiver() {
        let (mut observer, rx) = ChannelObserver::channel();
        drop(rx);
        observer.on_progress(1, "still fine", None);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(BuildPhase::CallGraph.to_string(), "callgraph");
        assert!(BuildPhase::Trigrams.is_running());
        assert!(!BuildPhase::Complete.is_running());
    }
}
