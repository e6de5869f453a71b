//! Sessions and the keepalive that refreshes them before they expire

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::AuthConfig;
use crate::error::Result;

/// The signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Tokens for a signed-in user
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds
    pub expires_at: i64,
    pub user: User,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"***")
            .field("refresh_token", &"***")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

impl Session {
    /// Seconds until expiry, negative once expired
    pub fn expires_in(&self, now_unix: i64) -> i64 {
        self.expires_at - now_unix
    }

    pub fn is_expired(&self, now_unix: i64) -> bool {
        self.expires_in(now_unix) <= 0
    }
}

/// Something that can trade a refresh token for a new session
#[async_trait]
pub trait SessionRefresher: Send + Sync {
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Validated less than `min_interval` ago
    Throttled,
    /// Another validation is running
    InFlight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Skipped(SkipReason),
    NoSession,
    StillValid,
    Refreshed,
    /// The old session is kept
    RefreshFailed(String),
}

struct KeeperState {
    session: Option<Session>,
    last_check: Option<Instant>,
}

/// Keeps a session fresh
///
/// Validation is throttled to once per `min_interval` and never runs twice
/// concurrently. A session within `refresh_margin` of expiry is refreshed.
pub struct SessionKeeper {
    refresher: Arc<dyn SessionRefresher>,
    state: Mutex<KeeperState>,
    in_flight: AtomicBool,
    min_interval: Duration,
    refresh_margin: Duration,
}

impl fmt::Debug for SessionKeeper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeeper")
            .field("min_interval", &self.min_interval)
            .field("refresh_margin", &self.refresh_margin)
            .finish()
    }
}

/// Clears the in-flight flag however validation ends
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SessionKeeper {
    pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(5 * 60);
    pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(30 * 60);

    pub fn new(refresher: Arc<dyn SessionRefresher>, session: Option<Session>) -> Self {
        Self {
            refresher,
            state: Mutex::new(KeeperState {
                session,
                last_check: None,
            }),
            in_flight: AtomicBool::new(false),
            min_interval: Self::DEFAULT_MIN_INTERVAL,
            refresh_margin: Self::DEFAULT_REFRESH_MARGIN,
        }
    }

    pub fn from_config(
        refresher: Arc<dyn SessionRefresher>,
        session: Option<Session>,
        config: &AuthConfig,
    ) -> Self {
        Self::new(refresher, session)
            .with_min_interval(Duration::from_secs(config.keepalive_interval_secs))
            .with_refresh_margin(Duration::from_secs(config.refresh_margin_secs))
    }

    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    pub async fn session(&self) -> Option<Session> {
        self.state.lock().await.session.clone()
    }

    pub async fn set_session(&self, session: Option<Session>) {
        self.state.lock().await.session = session;
    }

    /// Check the session and refresh it if it is close to expiry
    pub async fn validate(&self) -> ValidationOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return ValidationOutcome::Skipped(SkipReason::InFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let session = {
            let mut state = self.state.lock().await;
            let now = Instant::now();
            if let Some(last) = state.last_check {
                if now.duration_since(last) < self.min_interval {
                    return ValidationOutcome::Skipped(SkipReason::Throttled);
                }
            }
            state.last_check = Some(now);
            state.session.clone()
        };

        let Some(session) = session else {
            return ValidationOutcome::NoSession;
        };

        let margin = i64::try_from(self.refresh_margin.as_secs()).unwrap_or(i64::MAX);
        if session.expires_in(Utc::now().timestamp()) >= margin {
            debug!("Session still valid");
            return ValidationOutcome::StillValid;
        }

        match self.refresher.refresh_session(&session.refresh_token).await {
            Ok(refreshed) => {
                info!(user_id = %refreshed.user.id, "Session refreshed");
                self.state.lock().await.session = Some(refreshed);
                ValidationOutcome::Refreshed
            }
            Err(e) => {
                warn!(error = %e, "Session refresh failed");
                ValidationOutcome::RefreshFailed(e.to_string())
            }
        }
    }

    /// Validate on a fixed period until the handle is aborted
    pub fn spawn(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let outcome = self.validate().await;
                debug!(outcome = ?outcome, "Session keepalive tick");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    fn session(expires_in_secs: i64, token: &str) -> Session {
        Session {
            access_token: format!("access-{}", token),
            refresh_token: format!("refresh-{}", token),
            expires_at: Utc::now().timestamp() + expires_in_secs,
            user: User {
                id: "user-1".to_string(),
                email: Some("a@example.com".to_string()),
            },
        }
    }

    #[derive(Default)]
    struct CountingRefresher {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl SessionRefresher for CountingRefresher {
        async fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::AuthError("refresh token revoked".to_string()));
            }
            assert_eq!(refresh_token, "refresh-old");
            Ok(session(3600, "new"))
        }
    }

    #[tokio::test]
    async fn test_no_session() {
        let keeper = SessionKeeper::new(Arc::new(CountingRefresher::default()), None);
        assert_eq!(keeper.validate().await, ValidationOutcome::NoSession);
    }

    #[tokio::test]
    async fn test_refreshes_inside_margin() {
        let refresher = Arc::new(CountingRefresher::default());
        let keeper = SessionKeeper::new(refresher.clone(), Some(session(10 * 60, "old")));

        assert_eq!(keeper.validate().await, ValidationOutcome::Refreshed);
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(keeper.session().await.unwrap().access_token, "access-new");
    }

    #[tokio::test]
    async fn test_still_valid_outside_margin() {
        let refresher = Arc::new(CountingRefresher::default());
        let keeper = SessionKeeper::new(refresher.clone(), Some(session(2 * 3600, "old")));

        assert_eq!(keeper.validate().await, ValidationOutcome::StillValid);
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_old_session() {
        let refresher = Arc::new(CountingRefresher {
            fail: true,
            ..Default::default()
        });
        let keeper = SessionKeeper::new(refresher, Some(session(60, "old")));

        assert!(matches!(
            keeper.validate().await,
            ValidationOutcome::RefreshFailed(msg) if msg.contains("revoked")
        ));
        assert_eq!(keeper.session().await.unwrap().access_token, "access-old");
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttled_until_interval_passes() {
        let keeper = SessionKeeper::new(
            Arc::new(CountingRefresher::default()),
            Some(session(2 * 3600, "old")),
        );

        assert_eq!(keeper.validate().await, ValidationOutcome::StillValid);
        assert_eq!(
            keeper.validate().await,
            ValidationOutcome::Skipped(SkipReason::Throttled)
        );

        tokio::time::advance(Duration::from_secs(4 * 60)).await;
        assert_eq!(
            keeper.validate().await,
            ValidationOutcome::Skipped(SkipReason::Throttled)
        );

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(keeper.validate().await, ValidationOutcome::StillValid);
    }

    struct BlockingRefresher {
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl SessionRefresher for BlockingRefresher {
        async fn refresh_session(&self, _refresh_token: &str) -> Result<Session> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(session(3600, "new"))
        }
    }

    #[tokio::test]
    async fn test_concurrent_validation_skipped() {
        let refresher = Arc::new(BlockingRefresher {
            started: Notify::new(),
            release: Notify::new(),
        });
        let keeper = Arc::new(SessionKeeper::new(
            refresher.clone(),
            Some(session(60, "old")),
        ));

        let first = tokio::spawn({
            let keeper = keeper.clone();
            async move { keeper.validate().await }
        });
        refresher.started.notified().await;

        assert_eq!(
            keeper.validate().await,
            ValidationOutcome::Skipped(SkipReason::InFlight)
        );

        refresher.release.notify_one();
        assert_eq!(first.await.unwrap(), ValidationOutcome::Refreshed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_validates_on_period() {
        let refresher = Arc::new(CountingRefresher::default());
        let keeper = Arc::new(
            SessionKeeper::new(refresher.clone(), Some(session(60, "old")))
                .with_min_interval(Duration::ZERO),
        );

        let handle = keeper.clone().spawn(Duration::from_secs(300));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(keeper.session().await.unwrap().access_token, "access-new");

        handle.abort();
    }

    #[test]
    fn test_session_debug_hides_tokens() {
        let debug = format!("{:?}", session(60, "secret"));
        assert!(!debug.contains("access-secret"));
        assert!(debug.contains("user-1"));
    }
}
