//! Check for the external tools a production run needs.

use demoreel_common::config::AppConfig;
use demoreel_common::ffmpeg::command_exists;
use demoreel_document::WebDriverDocument;

pub async fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("DemoReel System Check");
    println!("{}", "=".repeat(50));

    let mut all_required_ok = true;

    for (binary, purpose) in [
        ("ffmpeg", "screen capture, audio alignment, merge"),
        ("ffprobe", "narration clip durations"),
    ] {
        if command_exists(binary) {
            println!("[OK] {binary} ({purpose})");
        } else {
            println!("[MISSING] {binary} ({purpose})");
            all_required_ok = false;
        }
    }

    let url = &config.webdriver.url;
    if WebDriverDocument::is_available(url).await {
        println!("[OK] WebDriver at {url}");
    } else {
        println!("[MISSING] WebDriver at {url} (start chromedriver or geckodriver)");
        all_required_ok = false;
    }

    let key_env = &config.audio.api_key_env;
    if std::env::var(key_env).map_or(false, |key| !key.trim().is_empty()) {
        println!("[OK] Speech API key in ${key_env}");
    } else {
        println!("[WARN] ${key_env} is not set; narration requests are unauthenticated");
    }

    println!();
    if all_required_ok {
        println!("All required tools are available. DemoReel is ready.");
    } else {
        println!("Some required tools are missing. `record --dry-run` still works.");
    }

    Ok(())
}
