//! Issuance, verification, and maintenance over an injected store.

use carwash_auth_core::{
    AuthError, AuthResult, Clock, NewOtpRecord, OtpFilter, OtpPatch, OtpPurpose, OtpRecord,
    OtpStore, RecordOrdering, SystemClock,
};
use carwash_auth_otp_utils::{
    OtpConfig, OtpGenerator, RateLimitResult, RateLimiter, VerificationOutcome,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::{EmailOtpConfig, EmailOtpData};
use crate::message::OtpMessage;
use crate::responses::{CleanupResponse, IssueResponse, OtpStats, SendOtpResponse, VerifyResponse};

/// A freshly issued code, before it is shaped into a response.
#[derive(Debug, Clone)]
struct IssuedOtp {
    code: String,
    expires_at: DateTime<Utc>,
}

/// The Email OTP service.
///
/// Owns no state beyond its configuration: every operation is a fresh round
/// trip to the injected store.
pub struct EmailOtpService {
    store: Arc<dyn OtpStore>,
    clock: Arc<dyn Clock>,
    config: EmailOtpConfig,
    generator: OtpGenerator,
    limiter: RateLimiter,
}

impl EmailOtpService {
    /// Creates a service reading wall-clock time.
    pub fn new(store: Arc<dyn OtpStore>, config: EmailOtpConfig) -> AuthResult<Self> {
        Self::with_clock(store, Arc::new(SystemClock), config)
    }

    /// Creates a service reading time from `clock`.
    pub fn with_clock(
        store: Arc<dyn OtpStore>,
        clock: Arc<dyn Clock>,
        config: EmailOtpConfig,
    ) -> AuthResult<Self> {
        config.validate()?;

        let generator = OtpGenerator::new(OtpConfig::numeric(config.otp_length))?;
        let limiter = RateLimiter::new(store.clone(), clock.clone(), config.rate_limit.clone());

        Ok(Self {
            store,
            clock,
            config,
            generator,
            limiter,
        })
    }

    /// Gets the service configuration.
    pub fn config(&self) -> &EmailOtpConfig {
        &self.config
    }

    /// Generates a new OTP code.
    pub fn generate_otp(&self) -> String {
        match &self.config.generate_otp {
            Some(generate) => generate(),
            None => self.generator.generate(),
        }
    }

    /// Issues a new code for the identity and purpose.
    ///
    /// Any earlier unused code for the pair stops being valid. The caller is
    /// responsible for delivering the returned code.
    pub async fn issue(&self, identity: &str, purpose: OtpPurpose) -> IssueResponse {
        match self.try_issue(identity, purpose).await {
            Ok(issued) => IssueResponse::issued(issued.code, issued.expires_at),
            Err(err) => {
                log_failure("issue", purpose, &err);
                IssueResponse::failed(&err)
            }
        }
    }

    /// Issues a code and hands the rendered message to the configured sender.
    ///
    /// Delivery is attempted once; a failed send is reported, not retried.
    pub async fn issue_and_send(&self, identity: &str, purpose: OtpPurpose) -> SendOtpResponse {
        let issued = match self.try_issue(identity, purpose).await {
            Ok(issued) => issued,
            Err(err) => {
                log_failure("issue_and_send", purpose, &err);
                return SendOtpResponse::failed(&err);
            }
        };

        let delivered = self.deliver(identity, purpose, &issued).await;
        SendOtpResponse::sent(issued.expires_at, delivered)
    }

    /// Verifies a submitted code and consumes the matching record.
    ///
    /// With `delete_on_consume` the record is removed; otherwise it is kept
    /// with `is_used = true` as an audit trail.
    pub async fn verify(
        &self,
        identity: &str,
        code: &str,
        purpose: OtpPurpose,
        delete_on_consume: bool,
    ) -> VerifyResponse {
        match self.try_verify(identity, code, purpose, delete_on_consume).await {
            Ok(was_already_used) => VerifyResponse::verified(was_already_used),
            Err(err) => {
                log_failure("verify", purpose, &err);
                VerifyResponse::failed(&err)
            }
        }
    }

    /// Deletes expired records and used records past the retention window.
    pub async fn cleanup(&self) -> CleanupResponse {
        match self.try_cleanup().await {
            Ok(deleted) => CleanupResponse::completed(deleted),
            Err(err) => {
                tracing::error!(error = %err, "otp cleanup failed");
                CleanupResponse::failed(&err)
            }
        }
    }

    /// Counts records by state at the current instant.
    pub async fn stats(&self) -> AuthResult<OtpStats> {
        let now = self.clock.now();

        Ok(OtpStats {
            total: self.store.count(&OtpFilter::new()).await?,
            live: self
                .store
                .count(&OtpFilter::new().is_used(false).expires_from(now))
                .await?,
            used: self.store.count(&OtpFilter::new().is_used(true)).await?,
            expired: self
                .store
                .count(&OtpFilter::new().expires_before(now))
                .await?,
        })
    }

    async fn try_issue(&self, identity: &str, purpose: OtpPurpose) -> AuthResult<IssuedOtp> {
        require_identity(identity)?;

        if let RateLimitResult::Limited { wait_minutes, .. } =
            self.limiter.check(identity, purpose).await?
        {
            return Err(AuthError::RateLimitExceeded { wait_minutes });
        }

        let code = self.generate_otp();
        let record = NewOtpRecord::new(
            identity,
            self.config.store_otp.prepare_for_storage(&code),
            purpose,
            self.clock.now(),
            self.config.expires_in_duration(),
        );

        let stored = self.store.replace_live(record).await?;
        tracing::info!(
            purpose = %purpose,
            otp_id = %stored.id,
            expires_at = %stored.expires_at,
            "otp issued"
        );

        Ok(IssuedOtp {
            code,
            expires_at: stored.expires_at,
        })
    }

    async fn try_verify(
        &self,
        identity: &str,
        code: &str,
        purpose: OtpPurpose,
        delete_on_consume: bool,
    ) -> AuthResult<bool> {
        require_identity(identity)?;

        let filter = OtpFilter::for_pair(identity, purpose)
            .code(self.config.store_otp.prepare_for_storage(code));
        let record = self
            .store
            .find_first(&filter, RecordOrdering::NewestFirst)
            .await?;

        let now = self.clock.now();
        let outcome =
            VerificationOutcome::evaluate(record.as_ref(), now, self.config.tolerate_replay);

        if let Some(record) = record.as_ref().filter(|_| outcome.consumes_record()) {
            self.consume(record, delete_on_consume).await?;
        }

        if outcome.is_valid() {
            tracing::info!(purpose = %purpose, "otp verified");
        }
        outcome.into_result()
    }

    /// Deletes or marks the record used. Losing a race to a concurrent
    /// verification of the same record reads as an invalid code.
    async fn consume(&self, record: &OtpRecord, delete_on_consume: bool) -> AuthResult<()> {
        if delete_on_consume {
            return match self.store.delete(&record.id).await {
                Err(AuthError::NotFound { .. }) => Err(AuthError::InvalidOtp),
                other => other,
            };
        }

        let unchanged = OtpFilter::by_id(&record.id).is_used(record.is_used);
        let changed = self
            .store
            .update_many(&unchanged, OtpPatch::mark_used())
            .await?;
        if changed == 0 {
            return Err(AuthError::InvalidOtp);
        }
        Ok(())
    }

    async fn try_cleanup(&self) -> AuthResult<usize> {
        let now = self.clock.now();

        let expired = self
            .store
            .delete_many(&OtpFilter::new().expires_before(now))
            .await?;
        // Anything both expired and stale went in the first pass.
        let stale = self
            .store
            .delete_many(
                &OtpFilter::new()
                    .is_used(true)
                    .created_before(now - self.config.used_retention_duration()),
            )
            .await?;

        tracing::info!(expired, stale, "otp cleanup finished");
        Ok(expired + stale)
    }

    async fn deliver(&self, identity: &str, purpose: OtpPurpose, issued: &IssuedOtp) -> bool {
        let Some(send) = &self.config.send_verification_otp else {
            tracing::warn!(purpose = %purpose, "no otp sender configured, code not delivered");
            return false;
        };

        let message = OtpMessage::render(
            &self.config.app_name,
            purpose,
            &issued.code,
            self.config.expires_in_minutes(),
        );
        let data = EmailOtpData::new(identity, issued.code.clone(), purpose, message);

        match send(data).await {
            Ok(()) => {
                tracing::info!(purpose = %purpose, "otp delivered");
                true
            }
            Err(reason) => {
                tracing::warn!(purpose = %purpose, %reason, "otp delivery failed");
                false
            }
        }
    }
}

fn require_identity(identity: &str) -> AuthResult<()> {
    if identity.trim().is_empty() {
        return Err(AuthError::missing("identity"));
    }
    Ok(())
}

fn log_failure(operation: &'static str, purpose: OtpPurpose, err: &AuthError) {
    let code = err.error_code();
    if err.is_user_error() {
        tracing::debug!(operation, purpose = %purpose, code, error = %err, "otp request declined");
    } else if err.is_store_failure() {
        tracing::error!(operation, purpose = %purpose, code, error = %err, "otp store failure");
    } else {
        tracing::error!(operation, purpose = %purpose, code, error = %err, "otp request failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carwash_auth_adapter_memory::MemoryOtpStore;

    fn service(config: EmailOtpConfig) -> EmailOtpService {
        EmailOtpService::new(Arc::new(MemoryOtpStore::new()), config).unwrap()
    }

    #[test]
    fn test_service_rejects_invalid_config() {
        let result = EmailOtpService::new(
            Arc::new(MemoryOtpStore::new()),
            EmailOtpConfig::new().otp_length(0),
        );
        assert!(matches!(result, Err(AuthError::ConfigurationError { .. })));
    }

    #[test]
    fn test_service_rejects_out_of_range_durations() {
        for config in [
            EmailOtpConfig::new().expires_in(100_000_000_000_000_000),
            EmailOtpConfig::new().used_retention(u64::MAX),
        ] {
            let result = EmailOtpService::new(Arc::new(MemoryOtpStore::new()), config);
            assert!(matches!(result, Err(AuthError::ConfigurationError { .. })));
        }
    }

    #[test]
    fn test_otp_generation() {
        let otp = service(EmailOtpConfig::default()).generate_otp();
        assert_eq!(otp.len(), 6);
        assert!(otp.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_custom_generator_is_used() {
        let service = service(EmailOtpConfig::new().generate_otp_with(|| "424242".to_string()));
        assert_eq!(service.generate_otp(), "424242");
    }

    #[tokio::test]
    async fn test_empty_identity_is_rejected() {
        let service = service(EmailOtpConfig::default());

        let issued = service.issue("   ", OtpPurpose::PasswordReset).await;
        assert!(!issued.success);
        assert_eq!(issued.error.as_deref(), Some("Missing required field: identity"));

        let verified = service.verify("", "123456", OtpPurpose::PasswordReset, true).await;
        assert!(!verified.success);
    }
}
