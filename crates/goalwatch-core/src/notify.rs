//! Outbound notifications.

use rand::seq::SliceRandom;
use std::sync::Mutex;

use crate::storage::NotificationsConfig;

/// Fire-and-forget notification channel.
pub trait NotificationSink: Send + Sync {
    fn notify_missed_window(&self, goal_title: &str, window_index: u32);

    fn notify_praise(&self, goal_title: &str);
}

/// Emits notifications as structured log events, each with a randomly
/// chosen message from the configured pool.
pub struct LogNotifier {
    config: NotificationsConfig,
}

impl LogNotifier {
    pub fn new(config: NotificationsConfig) -> Self {
        Self { config }
    }

    fn pick(messages: &[String]) -> &str {
        messages
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or_default()
    }
}

impl NotificationSink for LogNotifier {
    fn notify_missed_window(&self, goal_title: &str, window_index: u32) {
        if !self.config.enabled {
            return;
        }
        let message = Self::pick(&self.config.scold_messages);
        tracing::info!(
            target: "goalwatch::notify",
            goal = goal_title,
            window = window_index + 1,
            "Missed window for: {goal_title}. {message}"
        );
    }

    fn notify_praise(&self, goal_title: &str) {
        if !self.config.enabled {
            return;
        }
        let message = Self::pick(&self.config.praise_messages);
        tracing::info!(target: "goalwatch::notify", goal = goal_title, "{goal_title}: {message}");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    MissedWindow { goal_title: String, window_index: u32 },
    Praise { goal_title: String },
}

/// Sink that keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn push(&self, notification: Notification) {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).push(notification);
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify_missed_window(&self, goal_title: &str, window_index: u32) {
        self.push(Notification::MissedWindow {
            goal_title: goal_title.to_string(),
            window_index,
        });
    }

    fn notify_praise(&self, goal_title: &str) {
        self.push(Notification::Praise {
            goal_title: goal_title.to_string(),
        });
    }
}
