//! One-shot subscription eligibility check.

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::platform::SubscriptionProvider;

/// What the user's subscription currently allows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    pub can_play_catalog_content: bool,
    pub can_become_subscriber: bool,
}

/// Whether the user can currently play catalog content.
///
/// Takes the first subscription update and stops observing. A stream that
/// ends before producing anything counts as not eligible.
#[instrument(skip_all)]
pub async fn check_subscription_eligibility<S: SubscriptionProvider>(provider: &S) -> bool {
    let first = {
        let mut updates = provider.subscription_updates();
        updates.next().await
    };

    match first {
        Some(status) => {
            debug!(?status, "received subscription status");
            status.can_play_catalog_content
        },
        None => {
            debug!("subscription updates ended without a value");
            false
        },
    }
}
