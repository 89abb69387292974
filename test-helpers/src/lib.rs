pub mod mock;

use std::sync::Once;

use jiff::{Span, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Install the test tracing subscriber, once per process.
///
/// Honors `RUST_LOG`; defaults to errors only so test output stays quiet.
/// Run with `RUST_LOG=api_state=debug` to watch requests supersede each
/// other.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("error"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Catalog row used across the tests, standing in for the dashboard's real
/// entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    /// Fee in minor units.
    pub fee: u32,
    pub created_at: Timestamp,
}

pub fn course(title: &str) -> Course {
    Course {
        id: Uuid::new_v4(),
        title: title.to_string(),
        fee: 4900,
        created_at: fixture_epoch(),
    }
}

/// `count` distinct courses, created an hour apart so rows stay
/// distinguishable in assertions.
pub fn course_catalog(count: usize) -> Vec<Course> {
    (1..=count)
        .map(|n| Course {
            id: Uuid::new_v4(),
            title: format!("Course {n:02}"),
            fee: 4900 + (n as u32) * 100,
            created_at: fixture_epoch() + Span::new().hours(n as i64),
        })
        .collect()
}

fn fixture_epoch() -> Timestamp {
    "2025-01-01T00:00:00Z".parse().unwrap()
}
