//! Mailing dispatch engine.
//!
//! Sends a mailing's message to each of its recipients, one at a time,
//! records an attempt per recipient and moves the mailing's lifecycle
//! forward. Interactive dispatch (owner-triggered) and the unattended
//! scheduled run share the same per-mailing batch.

mod clock;

pub use clock::{Clock, FixedClock, SystemClock};

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::auth::permission::{require_owner, require_owner_to_finish, Actor};
use crate::config::MailConfig;
use crate::db::Database;
use crate::mailing::{
    AttemptRepository, AttemptStatus, Mailing, MailingRepository, MailingStatus,
    MessageRepository, NewMailingAttempt,
};
use crate::transport::{Mailer, OutgoingEmail};
use crate::{MailcastError, Result};

/// Diagnostic stored for a successful send.
pub const SUCCESS_RESPONSE: &str = "Отправлено успешно";

/// Outcome counts of one dispatch batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub success: usize,
    pub failed: usize,
}

impl DispatchSummary {
    /// User-facing notice shown after an interactive dispatch.
    pub fn notice(&self) -> String {
        format!(
            "Рассылка выполнена: успешно - {}, неуспешно - {}",
            self.success, self.failed
        )
    }

    pub fn total(&self) -> usize {
        self.success + self.failed
    }
}

/// Dispatches mailings through a [`Mailer`].
#[derive(Clone)]
pub struct DispatchEngine {
    db: Database,
    mailer: Arc<dyn Mailer>,
    sender: String,
    clock: Arc<dyn Clock>,
}

impl DispatchEngine {
    /// Create an engine using the system clock.
    pub fn new(db: Database, mailer: Arc<dyn Mailer>, mail: &MailConfig) -> Self {
        Self {
            db,
            mailer,
            sender: mail.sender().to_string(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Default sender address used for every email.
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Send a mailing on behalf of its owner.
    ///
    /// Anybody other than the owner is rejected before any email is sent,
    /// managers included.
    pub async fn dispatch(&self, mailing_id: i64, actor: &Actor) -> Result<DispatchSummary> {
        let mailing = self.load(mailing_id).await?;
        require_owner(actor, mailing.owner_id)?;

        info!(mailing_id, user_id = actor.user_id, "dispatching mailing");
        self.process(&mailing, &mut io::sink()).await
    }

    /// Mark a started mailing as finished.
    ///
    /// Finishing an already finished mailing returns it unchanged; a mailing
    /// that was never started cannot be finished.
    pub async fn finish(&self, mailing_id: i64, actor: &Actor) -> Result<Mailing> {
        let mailing = self.load(mailing_id).await?;
        require_owner_to_finish(actor, mailing.owner_id)?;

        match mailing.status {
            MailingStatus::Finished => Ok(mailing),
            MailingStatus::Created => Err(MailcastError::Validation(
                "Нельзя завершить рассылку, которая ещё не запущена.".to_string(),
            )),
            MailingStatus::Started => {
                let now = self.clock.now();
                MailingRepository::new(self.db.pool())
                    .set_lifecycle(
                        mailing.id,
                        MailingStatus::Finished,
                        mailing.start_time,
                        Some(now),
                    )
                    .await?;
                info!(mailing_id, "mailing finished");
                self.load(mailing_id).await
            }
        }
    }

    /// Send every mailing that is due, writing progress lines to `out`.
    ///
    /// Runs unattended, so no ownership check is made. A mailing whose batch
    /// fails is logged and skipped. Returns the summary of each processed
    /// mailing in order.
    pub async fn dispatch_scheduled<W: Write + Send>(
        &self,
        out: &mut W,
    ) -> Result<Vec<(i64, DispatchSummary)>> {
        let due = MailingRepository::new(self.db.pool())
            .list_scheduled(self.clock.now())
            .await?;

        if due.is_empty() {
            report(out, format_args!("Нет активных рассылок для отправки."));
            return Ok(Vec::new());
        }

        info!(count = due.len(), "scheduled dispatch started");
        let mut results = Vec::with_capacity(due.len());
        for mailing in &due {
            match self.process(mailing, out).await {
                Ok(summary) => results.push((mailing.id, summary)),
                Err(e) => {
                    error!(mailing_id = mailing.id, error = %e, "scheduled mailing failed");
                    report(out, format_args!("Рассылка ID={}: ошибка: {}", mailing.id, e));
                }
            }
        }

        report(out, format_args!("Отправка рассылок завершена."));
        Ok(results)
    }

    async fn load(&self, mailing_id: i64) -> Result<Mailing> {
        MailingRepository::new(self.db.pool())
            .get_by_id(mailing_id)
            .await?
            .ok_or_else(|| MailcastError::NotFound("mailing".to_string()))
    }

    /// One batch: a send and an attempt record per recipient, then the
    /// lifecycle update.
    async fn process<W: Write + Send>(
        &self,
        mailing: &Mailing,
        out: &mut W,
    ) -> Result<DispatchSummary> {
        let pool = self.db.pool();
        let message = MessageRepository::new(pool)
            .get_by_id(mailing.message_id)
            .await?
            .ok_or_else(|| MailcastError::NotFound("message".to_string()))?;
        let mailings = MailingRepository::new(pool);
        let attempts = AttemptRepository::new(pool);

        // Recipients added from here on are not part of this batch.
        let recipients = mailings.recipients(mailing.id).await?;

        report(
            out,
            format_args!(
                "Обрабатываем рассылку ID={}, сообщение: \"{}\"",
                mailing.id, message.subject
            ),
        );
        if recipients.is_empty() {
            report(out, format_args!(" - Нет получателей."));
        }

        let mut summary = DispatchSummary::default();
        for recipient in &recipients {
            let email = OutgoingEmail::new(
                self.sender.as_str(),
                recipient.email.as_str(),
                message.subject.as_str(),
                message.body.as_str(),
            );

            let (status, server_response) = match self.mailer.send(&email).await {
                Ok(()) => {
                    summary.success += 1;
                    (AttemptStatus::Success, SUCCESS_RESPONSE.to_string())
                }
                Err(e) => {
                    summary.failed += 1;
                    error!(
                        mailing_id = mailing.id,
                        recipient = %recipient.email,
                        error = %e,
                        "failed to send mailing email"
                    );
                    (AttemptStatus::Failed, e.to_string())
                }
            };

            let attempt = attempts
                .create(&NewMailingAttempt {
                    mailing_id: mailing.id,
                    attempt_time: self.clock.now(),
                    status,
                    server_response,
                })
                .await?;

            match attempt.status {
                AttemptStatus::Success => report(
                    out,
                    format_args!("  - Письмо успешно отправлено {}", recipient.email),
                ),
                AttemptStatus::Failed => report(
                    out,
                    format_args!(
                        "  - Ошибка отправки {}: {}",
                        recipient.email, attempt.server_response
                    ),
                ),
            }
        }

        let now = self.clock.now();
        let status = mailing.status.after_dispatch();
        let start_time = if mailing.status == MailingStatus::Created {
            mailing.start_time.or(Some(now))
        } else {
            mailing.start_time
        };
        mailings
            .set_lifecycle(mailing.id, status, start_time, Some(now))
            .await?;

        report(
            out,
            format_args!(
                "Рассылка ID={}: успешно отправлено {}, неудачно {}",
                mailing.id, summary.success, summary.failed
            ),
        );
        info!(
            mailing_id = mailing.id,
            success = summary.success,
            failed = summary.failed,
            status = %status,
            "mailing dispatched"
        );
        Ok(summary)
    }
}

/// Write one progress line. Output is best effort: a closed or failing
/// writer never interrupts a batch.
fn report<W: Write>(out: &mut W, line: fmt::Arguments<'_>) {
    if let Err(e) = writeln!(out, "{line}") {
        warn!(error = %e, "failed to write dispatch progress");
    }
}
