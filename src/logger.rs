/// Timestamped logging to stdout, gated by `config::LOGGING_ENABLED`.
pub fn log(msg: &str) {
    if crate::config::LOGGING_ENABLED {
        let now = chrono::Local::now();
        println!("[{}] {}", now.format("%Y-%m-%d %H:%M:%S%.3f"), msg);
    }
}
