use anyhow::{Context, Result};
use pagewatch::config::Config;
use std::path::{Path, PathBuf};

const SAMPLE_URLS: &str = "\
url,name,notification
https://example.com,Example Domain,true
https://www.rust-lang.org,Rust,false
";

/// Write a commented sample configuration and URL list.
///
/// Existing files are left untouched. Returns the files that were created.
pub fn init_project(config_path: &Path) -> Result<Vec<PathBuf>> {
    let base = config_path.parent().unwrap_or_else(|| Path::new(""));
    let urls_path = base.join("config").join("urls.csv");
    let mut created = Vec::new();

    if write_new(config_path, &sample_config(&urls_path))? {
        created.push(config_path.to_path_buf());
    }
    if write_new(&urls_path, SAMPLE_URLS)? {
        created.push(urls_path);
    }
    Ok(created)
}

fn write_new(path: &Path, content: &str) -> Result<bool> {
    if path.exists() {
        println!("Keeping existing file: {}", path.display());
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Created {}", path.display());
    Ok(true)
}

fn sample_config(urls_path: &Path) -> String {
    let config = Config::default();
    format!(
        r#"# pagewatch configuration

[monitoring]
# Only run between these dates (inclusive, YYYY-MM-DD); omit for no limit
# start_date = "2026-01-01"
# end_date = "2026-12-31"
urls_file = "{urls_file}"

[fetch]
timeout_secs = {fetch_timeout}
# user_agent = "..."          # or USER_AGENT
# http_proxy = "..."          # or HTTP_PROXY
# https_proxy = "..."         # or HTTPS_PROXY
# no_proxy = "localhost"      # or NO_PROXY

[fetch.headers]
# Accept-Language = "en-US"

[screenshot]
enabled = {screenshot_enabled}
width = {width}
height = {height}
format = "{format}"
timeout_secs = {screenshot_timeout}

[notifications]
email = false
slack = false
# Send only the diff; false also includes the start of the page text
diff_only = {diff_only}

[notifications.smtp]
# Credentials come from SMTP_SERVER, SMTP_PORT, SMTP_USERNAME,
# SMTP_PASSWORD, EMAIL_FROM and EMAIL_RECIPIENTS
port = {smtp_port}

[notifications.slack_webhook]
# The webhook URL comes from SLACK_WEBHOOK_URL
channel = "{slack_channel}"
username = "{slack_username}"

[report]
visualization_enabled = {visualization}
chart_type = "all"
history_days = {history_days}

[storage]
history_dir = "{history_dir}"
reports_dir = "{reports_dir}"

[logging]
level = "{level}"
format = "text"
file = {log_file}
log_dir = "{log_dir}"
retention_days = {retention}
"#,
        urls_file = toml_path(urls_path),
        fetch_timeout = config.fetch.timeout_secs,
        screenshot_enabled = config.screenshot.enabled,
        width = config.screenshot.width,
        height = config.screenshot.height,
        format = config.screenshot.format,
        screenshot_timeout = config.screenshot.timeout_secs,
        diff_only = config.notifications.diff_only,
        smtp_port = config.notifications.smtp.port,
        slack_channel = config.notifications.slack_webhook.channel,
        slack_username = config.notifications.slack_webhook.username,
        visualization = config.report.visualization_enabled,
        history_days = config.report.history_days,
        history_dir = toml_path(&config.storage.history_dir),
        reports_dir = toml_path(&config.storage.reports_dir),
        level = config.logging.level,
        log_file = config.logging.file,
        log_dir = toml_path(&config.logging.log_dir),
        retention = config.logging.retention_days,
    )
}

/// Path as a TOML basic-string body
fn toml_path(path: &Path) -> String {
    path.display().to_string().replace('\\', "\\\\").replace('"', "\\\"")
}
