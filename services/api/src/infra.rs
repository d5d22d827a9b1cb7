use chrono::NaiveDate;
use hostel_ledger::ledger::{Notice, Notifier, NotifyError, RoomType, MAX_FAN_COUNT};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Notifier that records each notice as a structured log line.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) -> Result<(), NotifyError> {
        info!(
            template = %notice.template,
            student = %notice.student,
            details = ?notice.details,
            "notification queued"
        );
        Ok(())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_room_type(raw: &str) -> Result<RoomType, String> {
    RoomType::parse(raw)
        .ok_or_else(|| format!("unknown room type '{raw}' (expected single, double, triple, or quad)"))
}

pub(crate) fn parse_fan_count(raw: &str) -> Result<u8, String> {
    let count = raw
        .trim()
        .parse::<u8>()
        .map_err(|err| format!("failed to parse '{raw}' as a fan count ({err})"))?;
    if count > MAX_FAN_COUNT {
        return Err(format!("at most {MAX_FAN_COUNT} fans can be fitted"));
    }
    Ok(count)
}
