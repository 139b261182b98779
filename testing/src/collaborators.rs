//! In-memory task queue, announcement cache, and mailers.

#![allow(clippy::unwrap_used)] // Lock poisoning only happens after a panic in a test

use conference_core::entity_store::BoxFuture;
use conference_core::{
    AnnouncementCache, CacheError, Mail, Mailer, MailerError, Task, TaskQueue, TaskQueueError,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tracing::info;

/// Task queue that records every accepted task.
///
/// Tasks are never run; tests inspect them with [`InMemoryTaskQueue::tasks`]
/// and the demo drains them through a task processor. Switch the queue to
/// failing mode to check that callers swallow enqueue errors.
#[derive(Clone, Debug, Default)]
pub struct InMemoryTaskQueue {
    tasks: Arc<Mutex<Vec<Task>>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryTaskQueue {
    /// Create an empty, accepting queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue that rejects every task.
    #[must_use]
    pub fn failing() -> Self {
        let queue = Self::default();
        queue.set_failing(true);
        queue
    }

    /// Toggle rejection of new tasks.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of accepted tasks, oldest first.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.lock().unwrap().clone()
    }

    /// Remove and return all accepted tasks.
    #[must_use]
    pub fn drain(&self) -> Vec<Task> {
        std::mem::take(&mut *self.tasks.lock().unwrap())
    }

    /// Number of accepted tasks of the given kind.
    #[must_use]
    pub fn count_of(&self, kind: &str) -> usize {
        self.tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.kind() == kind)
            .count()
    }
}

impl TaskQueue for InMemoryTaskQueue {
    fn enqueue(&self, task: Task) -> BoxFuture<'_, Result<(), TaskQueueError>> {
        let result = if self.failing.load(Ordering::SeqCst) {
            Err(TaskQueueError::EnqueueFailed {
                kind: task.kind(),
                reason: "queue unavailable".to_string(),
            })
        } else {
            self.tasks.lock().unwrap().push(task);
            Ok(())
        };
        Box::pin(async move { result })
    }
}

/// Process-local announcement cache.
#[derive(Clone, Debug, Default)]
pub struct InMemoryAnnouncementCache {
    announcement: Arc<RwLock<Option<String>>>,
    featured_speaker: Arc<RwLock<Option<String>>>,
}

impl InMemoryAnnouncementCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AnnouncementCache for InMemoryAnnouncementCache {
    fn set_announcement(&self, text: String) -> BoxFuture<'_, Result<(), CacheError>> {
        *self.announcement.write().unwrap() = Some(text);
        Box::pin(async { Ok(()) })
    }

    fn get_announcement(&self) -> BoxFuture<'_, Result<Option<String>, CacheError>> {
        let text = self.announcement.read().unwrap().clone();
        Box::pin(async move { Ok(text) })
    }

    fn clear_announcement(&self) -> BoxFuture<'_, Result<(), CacheError>> {
        *self.announcement.write().unwrap() = None;
        Box::pin(async { Ok(()) })
    }

    fn set_featured_speaker(&self, text: String) -> BoxFuture<'_, Result<(), CacheError>> {
        *self.featured_speaker.write().unwrap() = Some(text);
        Box::pin(async { Ok(()) })
    }

    fn get_featured_speaker(&self) -> BoxFuture<'_, Result<Option<String>, CacheError>> {
        let text = self.featured_speaker.read().unwrap().clone();
        Box::pin(async move { Ok(text) })
    }
}

/// Mailer that keeps sent mail for assertions.
#[derive(Clone, Debug)]
pub struct RecordingMailer {
    /// Mails recorded so far.
    pub sent: Arc<Mutex<Vec<Mail>>>,
    /// Whether to simulate success or failure.
    pub should_succeed: bool,
}

impl Default for RecordingMailer {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingMailer {
    /// Create a mailer that accepts every message.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sent: Arc::default(),
            should_succeed: true,
        }
    }

    /// Messages delivered so far.
    #[must_use]
    pub fn sent(&self) -> Vec<Mail> {
        self.sent.lock().unwrap().clone()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, mail: Mail) -> BoxFuture<'_, Result<(), MailerError>> {
        let result = if self.should_succeed {
            self.sent.lock().unwrap().push(mail);
            Ok(())
        } else {
            Err(MailerError::SendFailed {
                to: mail.to,
                reason: "simulated failure".to_string(),
            })
        };
        Box::pin(async move { result })
    }
}

/// Mailer that prints messages instead of delivering them.
///
/// Useful for the demo and local development.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleMailer;

impl ConsoleMailer {
    /// Create a console mailer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Mailer for ConsoleMailer {
    fn send(&self, mail: Mail) -> BoxFuture<'_, Result<(), MailerError>> {
        info!(to = %mail.to, subject = %mail.subject, "📧 Mail (development mode)");
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║ To: {:<57}║", mail.to);
        println!("║ Subject: {:<52}║", mail.subject);
        println!("╠══════════════════════════════════════════════════════════════╣");
        for line in mail.body.lines() {
            println!("║ {line:<61}║");
        }
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn speaker_task() -> Task {
        Task::SetFeaturedSpeaker {
            announcement: "Featured speaker: Ada!!".to_string(),
        }
    }

    #[tokio::test]
    async fn queue_records_and_drains() {
        let queue = InMemoryTaskQueue::new();
        queue.enqueue(speaker_task()).await.unwrap();

        assert_eq!(queue.count_of("set_featured_speaker"), 1);
        assert_eq!(queue.drain().len(), 1);
        assert!(queue.tasks().is_empty());
    }

    #[tokio::test]
    async fn failing_queue_rejects_without_recording() {
        let queue = InMemoryTaskQueue::failing();
        let result = queue.enqueue(speaker_task()).await;

        assert!(matches!(
            result,
            Err(TaskQueueError::EnqueueFailed { kind: "set_featured_speaker", .. })
        ));
        assert!(queue.tasks().is_empty());
    }

    #[tokio::test]
    async fn cache_slots_are_independent() {
        let cache = InMemoryAnnouncementCache::new();
        cache.set_announcement("sold out soon".to_string()).await.unwrap();
        cache.set_featured_speaker("Featured speaker: Ada!!".to_string()).await.unwrap();
        cache.clear_announcement().await.unwrap();

        assert_eq!(cache.get_announcement().await.unwrap(), None);
        assert_eq!(
            cache.get_featured_speaker().await.unwrap().as_deref(),
            Some("Featured speaker: Ada!!")
        );
    }

    #[tokio::test]
    async fn recording_mailer_keeps_messages() {
        let mailer = RecordingMailer::new();
        mailer
            .send(Mail {
                to: "org@example.com".to_string(),
                subject: "Hi".to_string(),
                body: "Body".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn recording_mailer_can_fail() {
        let mailer = RecordingMailer {
            should_succeed: false,
            ..RecordingMailer::new()
        };
        let result = mailer
            .send(Mail {
                to: "org@example.com".to_string(),
                subject: "Hi".to_string(),
                body: "Body".to_string(),
            })
            .await;

        assert!(result.is_err());
        assert!(mailer.sent().is_empty());
    }
}
