//! Activity Logging Module
//!
//! Provides structured activity logging for auditing and debugging.
//! IMPORTANT: This module must NEVER log student-identifying or captured content.
//!
//! What IS logged:
//! - Session IDs and material IDs
//! - Timestamps, durations and sizes
//! - Event types and outcomes (success/failure)
//! - Target skill, feedback category, reward asset names
//! - Error messages (sanitized)
//!
//! What is NOT logged:
//! - Student names
//! - Captured images or emotion scores
//! - Recorded audio
//! - Uploaded material contents or file names

use std::sync::OnceLock;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::Config;

/// Guard that must be held for the duration of the application
/// to ensure logs are flushed before exit
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

fn console_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the activity logging system
///
/// Sets up dual logging:
/// - Console output (human-readable, filtered by `RUST_LOG`)
/// - File output (JSON, daily rotation) in ~/.supporthub/logs/
pub fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = Config::logs_dir()?;
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "activity.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    LOG_GUARD.set(guard).ok();

    let file_layer = fmt::layer()
        .json()
        .with_timer(UtcTime::rfc_3339())
        .with_writer(non_blocking)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_filter(console_filter());

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    info!(
        event = "logging_initialized",
        log_dir = %log_dir.display(),
        "Activity logging system initialized"
    );

    Ok(())
}

/// Console-only logging, used when the log directory is unavailable
pub fn init_console_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(console_filter())
        .try_init();
}

// ============================================================================
// Session Events
// ============================================================================

/// Log the first render of a session
pub fn log_session_start(session_id: &str, target_skill: &str) {
    info!(
        event = "session_start",
        session_id = %session_id,
        target_skill = %target_skill,
        "Support session started"
    );
}

/// Log a sidebar profile change (skill only; the name is never logged)
pub fn log_profile_update(session_id: &str, target_skill: &str) {
    info!(
        event = "profile_update",
        session_id = %session_id,
        target_skill = %target_skill,
        "Session profile updated"
    );
}

// ============================================================================
// Capture Events
// ============================================================================

/// Log an emotion capture outcome
pub fn log_emotion_capture(
    session_id: &str,
    image_size_bytes: usize,
    analysis_time_ms: u64,
    feedback: Option<&str>,
    error: Option<&str>,
) {
    match error {
        None => info!(
            event = "emotion_capture",
            session_id = %session_id,
            image_size_bytes = image_size_bytes,
            analysis_time_ms = analysis_time_ms,
            feedback = feedback,
            success = true,
            "Expression captured and classified"
        ),
        Some(error) => warn!(
            event = "emotion_capture",
            session_id = %session_id,
            image_size_bytes = image_size_bytes,
            analysis_time_ms = analysis_time_ms,
            success = false,
            error = %error,
            "Expression could not be classified"
        ),
    }
}

/// Log a microphone recording (metadata only)
pub fn log_audio_recorded(session_id: &str, size_bytes: usize, duration_ms: Option<u64>) {
    info!(
        event = "audio_recorded",
        session_id = %session_id,
        size_bytes = size_bytes,
        duration_ms = duration_ms,
        "Vocal recording received"
    );
}

// ============================================================================
// Rewards and Materials
// ============================================================================

/// Log a startup animation fetch
pub fn log_asset_fetch(asset: &str, success: bool, error: Option<&str>) {
    if success {
        info!(
            event = "asset_fetch",
            asset = %asset,
            success = true,
            "Reward animation loaded"
        );
    } else {
        warn!(
            event = "asset_fetch",
            asset = %asset,
            success = false,
            error = error,
            "Reward animation unavailable"
        );
    }
}

/// Log a reward control press
pub fn log_reward_played(session_id: &str, asset: &str, available: bool) {
    info!(
        event = "reward_played",
        session_id = %session_id,
        asset = %asset,
        available = available,
        "Reward animation requested"
    );
}

/// Log a material upload (kind and size, never contents)
pub fn log_material_upload(
    session_id: &str,
    material_id: Option<&str>,
    kind: Option<&str>,
    size_bytes: usize,
    error: Option<&str>,
) {
    match error {
        None => info!(
            event = "material_upload",
            session_id = %session_id,
            material_id = material_id,
            kind = kind,
            size_bytes = size_bytes,
            success = true,
            "Session material uploaded"
        ),
        Some(error) => warn!(
            event = "material_upload",
            session_id = %session_id,
            size_bytes = size_bytes,
            success = false,
            error = %error,
            "Session material rejected"
        ),
    }
}
