//! The `careerquiz init` command.

use std::path::Path;

use anyhow::{Context, Result};

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("careerquiz.toml"), SAMPLE_CONFIG)?;

    std::fs::create_dir_all("banks").context("failed to create banks/")?;
    write_if_missing(Path::new("banks/react-advanced.toml"), EXAMPLE_BANK)?;

    println!("\nNext steps:");
    println!("  1. Set OPENAI_API_KEY or edit careerquiz.toml (the offline provider needs no key)");
    println!("  2. Run: careerquiz validate --bank banks/react-advanced.toml");
    println!("  3. Run: careerquiz play --bank banks/react-advanced.toml");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# careerquiz configuration

default_provider = "offline"
default_model = "gpt-4o-mini"

[providers.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"

[providers.offline]
type = "offline"

[quiz]
timer_enabled = true
time_limit_secs = 30
shuffle = false
bank_dir = "./banks"
"#;

const EXAMPLE_BANK: &str = r#"[bank]
id = "react-advanced"
title = "React Advanced Patterns"
description = "Hooks, Context, Performance, Custom Hooks"
difficulty = "advanced"
tags = ["react"]
duration_mins = 25
recommended = true

[[questions]]
id = "use-callback"
prompt = "What is the purpose of the useCallback hook in React?"
options = [
    "To memoize a value that is expensive to compute",
    "To memoize a callback function to prevent unnecessary re-renders",
    "To create a ref that persists across renders",
    "To synchronize with an external system",
]
correct_index = 1
explanation = "useCallback returns a memoized callback that only changes when a dependency changes."

[[questions]]
id = "global-state"
prompt = "Which pattern is best for managing complex global state in React?"
options = [
    "Prop drilling",
    "Context API with useReducer",
    "Local component state",
    "Direct DOM manipulation",
]
correct_index = 1
explanation = "Context combined with useReducer gives a predictable, centralized update path."
"#;
