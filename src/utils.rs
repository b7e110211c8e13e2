use std::time::Duration;

/// Formats a scan duration as `h:mm:ss.mmm`, `m:ss.mmm` or `s.mmm seconds`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let millis = elapsed.subsec_millis();
    match secs {
        3600.. => format!(
            "{}:{:02}:{:02}.{millis:03}",
            secs / 3600,
            (secs % 3600) / 60,
            secs % 60
        ),
        60.. => format!("{}:{:02}.{millis:03}", secs / 60, secs % 60),
        _ => format!("{secs}.{millis:03} seconds"),
    }
}
