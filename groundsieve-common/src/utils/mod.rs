use std::time::Instant;

/// Returns a formatted string of elapsed time, e.g. `1min 34.852s`.
pub fn get_formatted_elapsed_time(instant: Instant) -> String {
    let dur = instant.elapsed();
    let minutes = dur.as_secs() / 60;
    let sub_sec = dur.as_secs() % 60;
    let sub_milli = dur.subsec_millis();
    if minutes > 0 {
        return format!("{}min {}.{}s", minutes, sub_sec, sub_milli);
    }
    format!("{}.{}s", sub_sec, sub_milli)
}

/// Integer percent-complete, used to throttle verbose progress printing to one
/// line per percentage point rather than one line per item.
pub fn percent_complete(done: usize, total: usize) -> i32 {
    if total == 0 {
        return 100;
    }
    (100.0_f64 * done as f64 / total as f64) as i32
}
