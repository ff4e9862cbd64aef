//! Built-in `get_current_time_in_timezone` tool.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::tools::{handler, single_string_schema, str_arg, ToolMeta, ToolRegistry};

/// Local wall-clock time at `now` in the IANA zone `timezone`.
pub fn time_in_timezone(timezone: &str, now: DateTime<Utc>) -> anyhow::Result<String> {
    let zone: Tz = timezone
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("unknown timezone '{timezone}'"))?;
    let local = now.with_timezone(&zone).format("%Y-%m-%d %H:%M:%S");
    Ok(format!("Current time in {timezone}: {local}"))
}

pub fn register(registry: &mut ToolRegistry) {
    registry.register(
        ToolMeta {
            name: "get_current_time_in_timezone".into(),
            description: "Fetches the current local time in a specified timezone.".into(),
            args_schema: single_string_schema(
                "timezone",
                "A valid IANA timezone (e.g. 'America/New_York').",
            ),
        },
        handler(|args| async move { time_in_timezone(str_arg(&args, "timezone")?, Utc::now()) }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_local_time() {
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 12, 30, 5).unwrap();
        assert_eq!(
            time_in_timezone("America/New_York", now).unwrap(),
            "Current time in America/New_York: 2025-01-15 07:30:05"
        );
        assert_eq!(
            time_in_timezone("Asia/Tokyo", now).unwrap(),
            "Current time in Asia/Tokyo: 2025-01-15 21:30:05"
        );
    }

    #[test]
    fn rejects_unknown_zone() {
        let err = time_in_timezone("Gotham/City", Utc::now()).unwrap_err();
        assert!(err.to_string().contains("Gotham/City"));
    }
}
