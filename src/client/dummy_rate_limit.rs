use super::QuotaStatus;

use crate::{config::Quota, error::Result as CourtsideResult, hooks::Hooks};

/// Pass-through call quota used when the `rate-limit` feature is disabled.
#[derive(Debug, Clone, Default)]
pub(crate) struct RateLimit {}

#[derive(Debug)]
pub(crate) enum Permit {
    Ready,
}

impl RateLimit {
    pub fn new(_quota: &Quota, _hooks: Hooks) -> Self {
        RateLimit {}
    }

    pub fn admit(&self) -> CourtsideResult<Permit> {
        Ok(Permit::Ready)
    }

    pub fn status(&self) -> QuotaStatus {
        QuotaStatus::default()
    }
}

impl Permit {
    pub async fn ready(self) -> CourtsideResult<()> {
        Ok(())
    }
}
