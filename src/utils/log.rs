// src/utils/log.rs

//! Presentational log helpers on top of the `log` facade.
//!
//! Formatting (timestamps, levels) is left to whichever logger the binary
//! installs; these helpers only shape the lines.

const RULE_WIDTH: usize = 60;

/// Log a header
pub fn header(title: &str) {
    let border = "═".repeat(RULE_WIDTH);
    log::info!("{border}");
    log::info!("  {title}");
    log::info!("{border}");
}

/// Log a separator line
pub fn separator() {
    log::info!("{}", "─".repeat(RULE_WIDTH));
}

/// Log a sub-item (indented)
pub fn sub_item(message: &str) {
    log::info!("    {message}");
}

/// Log a success message
pub fn success(message: &str) {
    log::info!("[OK] {message}");
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    log::info!("[SUMMARY] {title}");
    let width = items.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    for (key, value) in items {
        log::info!("    {key:<width$} : {value}");
    }
}

/// Map a config level name onto a filter, defaulting to `Info`.
pub fn level_filter(level: &str) -> log::LevelFilter {
    match level.trim().to_lowercase().as_str() {
        "off" => log::LevelFilter::Off,
        "error" => log::LevelFilter::Error,
        "warn" | "warning" => log::LevelFilter::Warn,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter() {
        assert_eq!(level_filter("debug"), log::LevelFilter::Debug);
        assert_eq!(level_filter(" WARN "), log::LevelFilter::Warn);
        assert_eq!(level_filter("unknown"), log::LevelFilter::Info);
    }
}
