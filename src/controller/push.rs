//! Push notification hook
//!
//! Not part of the caching contract. A push message becomes a
//! user-visible notification built from the configured defaults.

use crate::config::schema::PushConfig;
use serde::{Deserialize, Serialize};

/// Notification shown in response to a push message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    /// Vibration pattern in milliseconds (on, off, on, ...)
    pub vibrate: Vec<u32>,
}

/// Build the notification for a push payload. An absent or empty payload
/// gets the configured default body.
pub fn notification_for(config: &PushConfig, payload: Option<&[u8]>) -> Notification {
    let body = payload
        .map(|data| String::from_utf8_lossy(data).into_owned())
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| config.default_body.clone());

    Notification {
        title: config.title.clone(),
        body,
        icon: config.icon.clone(),
        badge: config.badge.clone(),
        vibrate: config.vibrate.clone(),
    }
}
