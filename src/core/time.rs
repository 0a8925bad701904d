use time::{format_description::well_known::Rfc3339, Duration, OffsetDateTime, PrimitiveDateTime};

pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

/// Naive UTC timestamp `seconds` before now; used for staleness cut-offs.
pub(crate) fn primitive_seconds_ago(seconds: u64) -> PrimitiveDateTime {
    let seconds = i64::try_from(seconds).unwrap_or(i64::MAX);
    primitive_now_utc().saturating_sub(Duration::seconds(seconds))
}

pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}
