//! Task processing: the worker side of the task queue.
//!
//! Services only enqueue. A worker drains the queue and hands every task to
//! [`TaskProcessor::process`], which talks to the announcement cache and the
//! mailer.

use crate::error::Result;
use conference_core::{AnnouncementCache, Mail, Mailer, Task};
use std::sync::Arc;
use tracing::info;

const CONFIRMATION_SUBJECT: &str = "You created a new Conference!";

/// Executes queued tasks.
#[derive(Clone)]
pub struct TaskProcessor {
    cache: Arc<dyn AnnouncementCache>,
    mailer: Arc<dyn Mailer>,
}

impl TaskProcessor {
    /// Create a processor.
    #[must_use]
    pub fn new(cache: Arc<dyn AnnouncementCache>, mailer: Arc<dyn Mailer>) -> Self {
        Self { cache, mailer }
    }

    /// Run one task to completion.
    ///
    /// # Errors
    ///
    /// - `Cache`: the featured speaker could not be stored
    /// - `Mail`: the confirmation could not be sent
    #[tracing::instrument(skip(self, task), fields(task = task.kind()))]
    pub async fn process(&self, task: Task) -> Result<()> {
        match task {
            Task::SetFeaturedSpeaker { announcement } => {
                self.cache.set_featured_speaker(announcement.clone()).await?;
                info!(announcement = %announcement, "Featured speaker set");
            }
            Task::SendConfirmationEmail {
                email,
                conference_info,
            } => {
                let mail = Mail {
                    to: email.clone(),
                    subject: CONFIRMATION_SUBJECT.to_string(),
                    body: format!("Hi, you have created a following conference:\r\n\r\n{conference_info}"),
                };
                self.mailer.send(mail).await?;
                info!(to = %email, "Confirmation mail sent");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use conference_testing::{InMemoryAnnouncementCache, RecordingMailer};

    #[tokio::test]
    async fn featured_speaker_lands_in_the_cache() {
        let cache = Arc::new(InMemoryAnnouncementCache::new());
        let processor = TaskProcessor::new(cache.clone(), Arc::new(RecordingMailer::new()));

        processor
            .process(Task::SetFeaturedSpeaker {
                announcement: "Featured speaker: Ada!!".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(
            cache.get_featured_speaker().await.unwrap().as_deref(),
            Some("Featured speaker: Ada!!")
        );
    }

    #[tokio::test]
    async fn confirmation_mail_carries_the_conference_dump() {
        let mailer = Arc::new(RecordingMailer::new());
        let processor = TaskProcessor::new(Arc::new(InMemoryAnnouncementCache::new()), mailer.clone());

        processor
            .process(Task::SendConfirmationEmail {
                email: "org@example.com".to_string(),
                conference_info: "{\"name\": \"RustConf\"}".to_string(),
            })
            .await
            .unwrap();

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "org@example.com");
        assert_eq!(sent[0].subject, CONFIRMATION_SUBJECT);
        assert!(sent[0].body.ends_with("{\"name\": \"RustConf\"}"));
    }

    #[tokio::test]
    async fn mail_failures_surface() {
        let mailer = Arc::new(RecordingMailer {
            should_succeed: false,
            ..RecordingMailer::new()
        });
        let processor = TaskProcessor::new(Arc::new(InMemoryAnnouncementCache::new()), mailer);

        let result = processor
            .process(Task::SendConfirmationEmail {
                email: "org@example.com".to_string(),
                conference_info: String::new(),
            })
            .await;

        assert!(matches!(result, Err(crate::error::ServiceError::Mail(_))));
    }
}
