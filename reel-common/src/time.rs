//! Event timestamps

use chrono::{DateTime, Utc};

/// Wall-clock stamp carried by every `MediaEvent`
pub fn now() -> DateTime<Utc> {
    Utc::now()
}
