//! # Carwash Auth Server
//!
//! Maintenance host for OTP "buckets". Each bucket is one tenant with its own
//! store and service; the host sweeps every bucket on a fixed interval,
//! deleting expired and stale records and logging record counts.
//!
//! The host is a library: the embedding process builds it with
//! [`AuthServer::from_config`], hands each bucket's service to its request
//! handlers via [`AuthServer::get_bucket`], and drives maintenance with
//! [`AuthServer::run`] or [`AuthServer::run_until`].
//!
//! ```rust,ignore
//! let (config, buckets) = carwash_auth_server::load_config("carwash-auth.toml")?;
//! carwash_auth_server::init_tracing(&config)?;
//! let server = AuthServer::from_config(config, buckets)?;
//! let service = server.get_bucket("downtown").unwrap().service.clone();
//! // ... route requests to `service` ...
//! server.run().await?;
//! ```

mod config;
mod observability;

pub use config::{BucketConfig, ConfigError, OtpSettings, ServerConfig, load_config, parse_config};
pub use observability::{init_tracing, log_filter};

use carwash_auth_adapter_memory::MemoryOtpStore;
use carwash_auth_core::AuthError;
use carwash_auth_email_otp::{CleanupResponse, EmailOtpService, OtpStats};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Server error.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Bucket '{bucket}': {source}")]
    Bucket {
        bucket: String,
        #[source]
        source: AuthError,
    },
    #[error("Failed to listen for shutdown signal: {0}")]
    Signal(#[from] std::io::Error),
    #[error("Failed to install tracing subscriber: {0}")]
    Tracing(String),
}

/// A tenant/bucket in the auth server.
pub struct AuthBucket {
    /// Bucket ID.
    pub id: String,
    /// OTP service for this bucket.
    pub service: Arc<EmailOtpService>,
}

impl AuthBucket {
    /// Creates a new auth bucket.
    pub fn new(id: impl Into<String>, service: Arc<EmailOtpService>) -> Self {
        Self {
            id: id.into(),
            service,
        }
    }

    /// Creates a bucket backed by its own in-memory store.
    pub fn in_memory(id: impl Into<String>, config: &BucketConfig) -> Result<Self, ServerError> {
        let id = id.into();
        let service = config
            .otp
            .to_email_otp_config()
            .and_then(|otp| EmailOtpService::new(Arc::new(MemoryOtpStore::new()), otp))
            .map_err(|source| ServerError::Bucket {
                bucket: id.clone(),
                source,
            })?;

        Ok(Self::new(id, Arc::new(service)))
    }
}

/// Outcome of sweeping one bucket.
#[derive(Debug, Clone)]
pub struct SweepReport {
    pub bucket_id: String,
    pub cleanup: CleanupResponse,
    /// Counts after cleanup; `None` if the store could not be read.
    pub stats: Option<OtpStats>,
}

/// The auth server managing multiple buckets.
pub struct AuthServer {
    /// Server configuration.
    pub config: ServerConfig,
    /// Registered buckets.
    buckets: HashMap<String, AuthBucket>,
}

impl AuthServer {
    /// Creates a new auth server.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            buckets: HashMap::new(),
        }
    }

    /// Creates a server with one in-memory bucket per configured entry.
    ///
    /// With no buckets configured a single `default` bucket is registered.
    pub fn from_config(
        config: ServerConfig,
        buckets: HashMap<String, BucketConfig>,
    ) -> Result<Self, ServerError> {
        let mut server = Self::new(config);

        if buckets.is_empty() {
            tracing::warn!("no buckets configured, registering 'default'");
            server.register_bucket(AuthBucket::in_memory("default", &BucketConfig::default())?);
        }
        for (id, bucket) in &buckets {
            server.register_bucket(AuthBucket::in_memory(id.as_str(), bucket)?);
        }

        Ok(server)
    }

    /// Registers a bucket.
    pub fn register_bucket(&mut self, bucket: AuthBucket) {
        self.buckets.insert(bucket.id.clone(), bucket);
    }

    /// Gets a bucket by ID.
    pub fn get_bucket(&self, id: &str) -> Option<&AuthBucket> {
        self.buckets.get(id)
    }

    /// Returns all bucket IDs, sorted.
    pub fn bucket_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.buckets.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    /// Runs cleanup and stats once on every bucket.
    ///
    /// A failing bucket is reported and logged; it does not stop the others.
    pub async fn sweep_once(&self) -> Vec<SweepReport> {
        let mut reports = Vec::with_capacity(self.buckets.len());

        for id in self.bucket_ids() {
            let bucket = &self.buckets[id];
            let cleanup = bucket.service.cleanup().await;
            let stats = match bucket.service.stats().await {
                Ok(stats) => Some(stats),
                Err(err) => {
                    tracing::error!(bucket = id, error = %err, "failed to read otp stats");
                    None
                }
            };

            if cleanup.success {
                tracing::info!(
                    bucket = id,
                    deleted = cleanup.deleted_count,
                    live = ?stats.map(|s| s.live),
                    total = ?stats.map(|s| s.total),
                    "bucket swept"
                );
            } else {
                tracing::warn!(bucket = id, "bucket sweep failed");
            }

            reports.push(SweepReport {
                bucket_id: id.to_string(),
                cleanup,
                stats,
            });
        }

        reports
    }

    /// Sweeps on the configured interval until `shutdown` resolves.
    ///
    /// The first sweep runs immediately. Returns the number of sweeps made.
    pub async fn run_until<F>(&self, shutdown: F) -> usize
    where
        F: Future<Output = ()>,
    {
        let period = Duration::from_secs(self.config.sweep_interval_secs.max(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::pin!(shutdown);
        let mut sweeps = 0;
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    self.sweep_once().await;
                    sweeps += 1;
                }
            }
        }

        tracing::info!(sweeps, "sweep loop stopped");
        sweeps
    }

    /// Starts the server and sweeps until Ctrl-C.
    pub async fn run(&self) -> Result<(), ServerError> {
        tracing::info!(
            interval_secs = self.config.sweep_interval_secs,
            buckets = ?self.bucket_ids(),
            "starting carwash auth server"
        );

        let (signal_tx, signal_rx) = tokio::sync::oneshot::channel();
        let shutdown = async move {
            let result = tokio::signal::ctrl_c().await;
            if result.is_ok() {
                tracing::info!("shutdown signal received");
            }
            let _ = signal_tx.send(result);
        };

        self.run_until(shutdown).await;

        match signal_rx.await {
            Ok(Err(err)) => Err(ServerError::Signal(err)),
            _ => Ok(()),
        }
    }
}

impl Default for AuthServer {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}
