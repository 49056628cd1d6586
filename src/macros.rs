/// Similar to `info!` macro in tracing.
/// You can pass in the starting time and it will log how long it took from starting time to now.
/// ```
/// use tweet_scrap::info_time;
///
/// info_time!("str {}, {}", 1, 2);
/// let time = chrono::Local::now();
/// info_time!(time, "str {}, {}", 1, 2);
/// ```
#[macro_export]
macro_rules! info_time {
    ($strfm:literal $(,)? $($arg:expr),*) => {{
        let res = format!($strfm, $($arg),*);
        ::tracing::info!("{}", res);
    }};
    ($time:expr, $strfm:literal $(,)? $($arg:expr),*) => {{
        let local_now = ::chrono::Local::now();
        let run_time = (local_now - $time)
                .num_microseconds()
                .map(|n| n as f64 / 1_000_000.0)
                .unwrap_or(0.0);
        let res = format!($strfm, $($arg),*);
        ::tracing::info!(runtime_secs = run_time, "{}", res);
    }};
}
