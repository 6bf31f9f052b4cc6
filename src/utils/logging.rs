//! Logging setup and run-log helpers.

use std::fs;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Initialize tracing. `RUST_LOG` wins; the default keeps dependency noise
/// down while leaving the crate at info.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,chromiumoxide=warn,reqwest=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Write the run log file header. Appends per-site lines later via
/// [`append_run_log`].
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let header = format!(
        "{}\nfunding crawl log - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, header)?;
    Ok(())
}

/// Append one line to the run log file. Failures are not fatal to the run.
pub fn append_run_log(log_file_path: &str, line: &str) {
    use std::io::Write;
    if let Ok(mut file) = fs::OpenOptions::new().append(true).open(log_file_path) {
        let _ = writeln!(file, "{}", line);
    }
}

pub fn log_startup(total_sites: usize) {
    info!("{}", "=".repeat(60));
    info!("funding-program crawl starting");
    info!("sites: {}, all crawled concurrently", total_sites);
    info!("{}", "=".repeat(60));
}

pub fn log_site_start(site: &str, url: &str) {
    info!("[{}] crawling {}", site, url);
}

pub fn log_site_complete(site: &str, programs: usize, millis: u128) {
    info!("[{}] done: {} programs in {}ms", site, programs, millis);
}

pub fn print_final_stats(
    sites_ok: usize,
    sites_failed: usize,
    top_level: usize,
    children: usize,
    log_file_path: &str,
) {
    info!("{}", "=".repeat(60));
    info!(
        "run complete at {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("sites ok: {}, failed: {}", sites_ok, sites_failed);
    info!("programs: {} top-level, {} nested", top_level, children);
    info!("{}", "=".repeat(60));
    info!("run log: {}", log_file_path);
}

/// Truncate long text for log lines.
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
