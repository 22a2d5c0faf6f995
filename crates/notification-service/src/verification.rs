use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::Rng;

use crate::templates::EmailTemplate;
use crate::{EmailMessage, EmailTransport, NotificationError};

struct PendingCode {
    code: String,
    issued_at: DateTime<Utc>,
    attempts: u32,
}

/// Result of checking a submitted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    Mismatch { remaining: u32 },
    Expired,
    TooManyAttempts,
    NotFound,
}

/// Email verification codes with expiry and an attempt limit.
///
/// Codes are keyed by lowercased email. Issuing a new code replaces the
/// previous one; a successful verify consumes it.
pub struct VerificationCodes {
    pending: DashMap<String, PendingCode>,
    transport: Arc<dyn EmailTransport>,
    ttl: Duration,
    max_attempts: u32,
}

impl VerificationCodes {
    pub fn new(transport: Arc<dyn EmailTransport>, ttl: Duration, max_attempts: u32) -> Self {
        tracing::info!(
            "Verification codes: {}s TTL, max {} attempts",
            ttl.as_secs(),
            max_attempts
        );
        Self {
            pending: DashMap::new(),
            transport,
            ttl,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Reads `VERIFICATION_CODE_TTL_SECS` (600) and `VERIFICATION_MAX_ATTEMPTS` (5).
    pub fn from_env(transport: Arc<dyn EmailTransport>) -> Self {
        let ttl_secs = std::env::var("VERIFICATION_CODE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(600u64);
        let max_attempts = std::env::var("VERIFICATION_MAX_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5u32);
        Self::new(transport, Duration::from_secs(ttl_secs), max_attempts)
    }

    pub async fn issue(&self, email: &str) -> Result<(), NotificationError> {
        self.issue_at(email, Utc::now()).await
    }

    pub(crate) async fn issue_at(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<(), NotificationError> {
        let key = normalize(email);
        if key.is_empty() {
            return Err(NotificationError::InvalidArgument("Email required".into()));
        }

        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32));
        let message = EmailMessage::new(
            email.trim(),
            "Your verification code",
            EmailTemplate::verification_code(&code, self.ttl.as_secs() / 60),
        );

        self.cleanup_at(now);
        self.pending.insert(
            key.clone(),
            PendingCode {
                code: code.clone(),
                issued_at: now,
                attempts: 0,
            },
        );

        if let Err(e) = self.transport.send(&message).await {
            // A newer code issued while this send was in flight stays.
            self.pending
                .remove_if(&key, |_, p| p.code == code && p.issued_at == now);
            tracing::warn!("Failed to send verification code to {}: {}", key, e);
            return Err(e);
        }
        Ok(())
    }

    pub fn verify(&self, email: &str, code: &str) -> VerifyOutcome {
        self.verify_at(email, code, Utc::now())
    }

    pub(crate) fn verify_at(&self, email: &str, code: &str, now: DateTime<Utc>) -> VerifyOutcome {
        let key = normalize(email);
        let Some(mut entry) = self.pending.get_mut(&key) else {
            return VerifyOutcome::NotFound;
        };

        let age = now.signed_duration_since(entry.issued_at);
        if age.to_std().map_or(false, |age| age > self.ttl) {
            drop(entry);
            self.pending.remove(&key);
            return VerifyOutcome::Expired;
        }

        if entry.attempts >= self.max_attempts {
            return VerifyOutcome::TooManyAttempts;
        }

        if entry.code == code.trim() {
            drop(entry);
            self.pending.remove(&key);
            tracing::info!("Verification code accepted for {}", key);
            return VerifyOutcome::Verified;
        }

        entry.attempts += 1;
        let remaining = self.max_attempts - entry.attempts;
        if remaining == 0 {
            tracing::warn!("Verification attempts exhausted for {}", key);
            return VerifyOutcome::TooManyAttempts;
        }
        VerifyOutcome::Mismatch { remaining }
    }

    /// Drops codes older than the TTL.
    pub fn cleanup(&self) {
        self.cleanup_at(Utc::now());
    }

    fn cleanup_at(&self, now: DateTime<Utc>) {
        self.pending.retain(|_, p| {
            now.signed_duration_since(p.issued_at)
                .to_std()
                .map_or(true, |age| age <= self.ttl)
        });
    }

    #[cfg(test)]
    fn code_for(&self, email: &str) -> Option<String> {
        self.pending.get(&normalize(email)).map(|p| p.code.clone())
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}
