//! Startup check of the platform permission BLE scanning depends on (location access on older
//! Android releases). The outcome is only reported: a central keeps working without the
//! permission, its scans simply fail with a radio error.

use crate::Result;
use async_trait::async_trait;
use log::{info, warn};

/// Platform permission prompt.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    /// Whether the permission is already granted, without prompting.
    async fn check(&self) -> Result<bool>;

    /// Prompts the user. Resolves with their answer.
    async fn request(&self) -> Result<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    /// Already granted before we asked.
    Granted,
    /// Granted by the user when prompted.
    Accepted,
    /// Refused by the user when prompted.
    Refused,
    /// The gate itself failed.
    Unknown,
}

impl PermissionStatus {
    pub fn is_granted(self) -> bool {
        matches!(self, PermissionStatus::Granted | PermissionStatus::Accepted)
    }
}

/// Checks the permission and prompts for it when missing.
pub async fn ensure_permission<G: PermissionGate + ?Sized>(gate: &G) -> PermissionStatus {
    match gate.check().await {
        Ok(true) => {
            info!("Permission is OK");
            return PermissionStatus::Granted;
        }
        Ok(false) => {}
        Err(e) => {
            warn!("Permission check failed: {}", e);
            return PermissionStatus::Unknown;
        }
    }

    match gate.request().await {
        Ok(true) => {
            info!("User accepted permission request");
            PermissionStatus::Accepted
        }
        Ok(false) => {
            warn!("User refused permission request, scans will fail");
            PermissionStatus::Refused
        }
        Err(e) => {
            warn!("Permission request failed: {}", e);
            PermissionStatus::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Gate {
        granted: Option<bool>,
        answer: Option<bool>,
        prompts: AtomicUsize,
    }

    impl Gate {
        fn new(granted: Option<bool>, answer: Option<bool>) -> Self {
            Gate {
                granted,
                answer,
                prompts: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PermissionGate for Gate {
        async fn check(&self) -> Result<bool> {
            self.granted.ok_or(Error::PermissionDenied)
        }

        async fn request(&self) -> Result<bool> {
            self.prompts.fetch_add(1, Ordering::SeqCst);
            self.answer.ok_or(Error::PermissionDenied)
        }
    }

    #[tokio::test]
    async fn granted_permission_skips_prompt() {
        let gate = Gate::new(Some(true), Some(false));
        assert_eq!(ensure_permission(&gate).await, PermissionStatus::Granted);
        assert_eq!(gate.prompts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_permission_prompts_user() {
        let accepted = Gate::new(Some(false), Some(true));
        assert_eq!(ensure_permission(&accepted).await, PermissionStatus::Accepted);
        assert_eq!(accepted.prompts.load(Ordering::SeqCst), 1);

        let refused = Gate::new(Some(false), Some(false));
        let status = ensure_permission(&refused).await;
        assert_eq!(status, PermissionStatus::Refused);
        assert!(!status.is_granted());
    }

    #[tokio::test]
    async fn gate_failures_are_not_fatal() {
        assert_eq!(
            ensure_permission(&Gate::new(None, Some(true))).await,
            PermissionStatus::Unknown
        );
        assert_eq!(
            ensure_permission(&Gate::new(Some(false), None)).await,
            PermissionStatus::Unknown
        );
    }
}
