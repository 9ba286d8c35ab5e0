//! Validate an interaction script.

use std::path::PathBuf;

use demoreel_script_model::Script;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating script at: {}", path.display());

    let script =
        Script::load(&path).map_err(|e| anyhow::anyhow!("Failed to load script: {e}"))?;

    if let Some(title) = &script.title {
        println!("  Title: {title}");
    }
    if let Some(url) = &script.start_url {
        println!("  Start URL: {url}");
    }
    println!("  Sections: {}", script.sections.len());
    println!(
        "  Actions: {}",
        script.sections.iter().map(|s| s.actions.len()).sum::<usize>()
    );
    println!(
        "  Nominal length: {:.1}s",
        script.nominal_duration_ms() as f64 / 1000.0
    );

    let issues = script.validate();
    if issues.is_empty() {
        println!("\nScript is valid.");
    } else {
        println!("\nValidation issues:");
        for issue in &issues {
            println!("  - {issue}");
        }
        println!(
            "\n{} issue(s) found. Affected steps will be skipped during a run.",
            issues.len()
        );
    }

    Ok(())
}
