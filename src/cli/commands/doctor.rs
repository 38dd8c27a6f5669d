//! Doctor command - verify system requirements and configuration.

use crate::cli::preflight::find_api_key;
use crate::cli::Output;
use crate::config::Settings;
use crate::fewshot;
use console::style;
use std::path::Path;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(config_path: Option<&Path>, settings: &Settings) -> anyhow::Result<()> {
    Output::header("tldw doctor");
    println!();

    let sections = [
        ("External Tools", vec![check_ytdlp()]),
        ("API Configuration", vec![check_api_key(settings)]),
        ("Example Store", vec![check_example_store(&settings.examples_path())]),
        ("Configuration", vec![check_config_file(config_path)]),
    ];

    let mut checks = Vec::new();
    for (title, results) in sections {
        println!("{}", style(title).bold());
        for check in &results {
            check.print();
        }
        println!();
        checks.extend(results);
    }

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!("{} error(s) found. Please fix them before using tldw.", errors));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! tldw is ready to use.");
    }

    Ok(())
}

fn check_ytdlp() -> CheckResult {
    match Command::new("yt-dlp").arg("--version").output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
            CheckResult::ok("yt-dlp", &version)
        }
        Ok(_) => CheckResult::error("yt-dlp", "installed but not working", install_hint_ytdlp()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::error("yt-dlp", "not found", install_hint_ytdlp())
        }
        Err(e) => CheckResult::error("yt-dlp", &format!("error: {}", e), install_hint_ytdlp()),
    }
}

fn check_api_key(settings: &Settings) -> CheckResult {
    match find_api_key(settings, None) {
        Some(key) if key.expose().starts_with("sk-") => {
            CheckResult::ok("OpenAI API key", &format!("configured ({})", key.masked()))
        }
        Some(key) => CheckResult::warning(
            "OpenAI API key",
            &format!("set but format looks unusual ({})", key.masked()),
            "Expected format: sk-... (OpenAI API key)",
        ),
        None => CheckResult::warning(
            "OpenAI API key",
            "not set; you will be asked for it",
            "Set with: export OPENAI_API_KEY='sk-...' (or OPEN_AI_KEY in .env)",
        ),
    }
}

fn check_example_store(path: &Path) -> CheckResult {
    let name = "Example store";
    match fewshot::load(path) {
        Ok(examples) if examples.is_empty() => CheckResult::warning(
            name,
            &format!("{} (empty)", path.display()),
            "Add one with: tldw add-example <url>",
        ),
        Ok(examples) => CheckResult::ok(
            name,
            &format!("{} ({} examples)", path.display(), examples.len()),
        ),
        Err(crate::error::TldwError::NotFound(_)) => CheckResult::warning(
            name,
            &format!("{} (not created yet)", path.display()),
            "Add one with: tldw add-example <url>, or summarize with --no-examples",
        ),
        Err(e) => CheckResult::error(name, &e.to_string(), "Fix or move the file, then re-run"),
    }
}

fn check_config_file(config_path: Option<&Path>) -> CheckResult {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Settings::default_config_path);
    if path.exists() {
        CheckResult::ok("Config file", &format!("{}", path.display()))
    } else {
        CheckResult::warning("Config file", "using defaults", "Create with: tldw config edit")
    }
}

/// Platform-specific install hint for yt-dlp.
fn install_hint_ytdlp() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp"
    } else if cfg!(target_os = "linux") {
        "Install with: pip install yt-dlp (or your package manager)"
    } else {
        "Install from: https://github.com/yt-dlp/yt-dlp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fewshot::{Example, Metadata};

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_example_store_states() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("examples.json");
        assert_eq!(check_example_store(&path).status, CheckStatus::Warning);

        fewshot::append(&path, Example::new("v1", Metadata::Text("M".into()), "S")).unwrap();
        let check = check_example_store(&path);
        assert_eq!(check.status, CheckStatus::Ok);
        assert!(check.message.contains("1 examples"));

        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(check_example_store(&path).status, CheckStatus::Error);
    }

    #[test]
    fn test_missing_config_file_warns() {
        let dir = tempfile::tempdir().unwrap();
        let check = check_config_file(Some(&dir.path().join("config.toml")));
        assert_eq!(check.status, CheckStatus::Warning);
    }
}
