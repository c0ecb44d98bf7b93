// file: src/script/render.rs
// version: 1.0.0
// guid: efa8c40d-c8e5-40f8-8a5f-dff77d8f0ab3

//! Job script generation

use crate::config::JobSpec;
use crate::Result;
use std::fmt::Write as _;
use tracing::debug;

/// Interpreter line at the top of every generated script
pub const SHEBANG: &str = "#!/bin/bash";

/// Prefix of a scheduler directive line
pub const DIRECTIVE_PREFIX: &str = "#SBATCH";

fn is_safe_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "_./=:,+%@-".contains(c)
}

/// Quote a word for a POSIX shell, leaving plain words untouched
pub fn quote_word(word: &str) -> String {
    if word.is_empty() {
        return "''".to_string();
    }
    if word.chars().all(is_safe_char) {
        return word.to_string();
    }
    format!("'{}'", word.replace('\'', r"'\''"))
}

/// Join words into one shell command line
pub fn join_command(words: &[String]) -> String {
    words
        .iter()
        .map(|w| quote_word(w))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render the directive block, without the shebang
pub fn render_directives(spec: &JobSpec) -> Vec<String> {
    let s = &spec.scheduler;
    let mut lines = vec![
        format!("{} --job-name={}", DIRECTIVE_PREFIX, s.job_name),
        format!("{} --partition={}", DIRECTIVE_PREFIX, s.partition),
        format!("{} --nodes={}", DIRECTIVE_PREFIX, s.nodes),
        format!("{} --output={}", DIRECTIVE_PREFIX, s.output),
        format!("{} --error={}", DIRECTIVE_PREFIX, s.error),
        format!("{} --account={}", DIRECTIVE_PREFIX, s.account),
        format!("{} --gres=gpu:{}", DIRECTIVE_PREFIX, s.gpus),
        format!("{} --time={}", DIRECTIVE_PREFIX, s.time),
        format!("{} --mem={}", DIRECTIVE_PREFIX, s.mem),
    ];

    for (key, value) in &s.extra {
        lines.push(format!("{} --{}={}", DIRECTIVE_PREFIX, key, value));
    }

    lines
}

/// Render the module commands
pub fn render_modules(spec: &JobSpec) -> Vec<String> {
    let mut lines = Vec::new();
    if spec.environment.purge {
        lines.push("module purge".to_string());
    }
    for module in &spec.environment.modules {
        lines.push(format!("module load {}", module));
    }
    lines
}

/// Render the complete job script
///
/// The job is validated first, so a rendered script never carries a value the
/// scheduler would misread.
pub fn render_script(spec: &JobSpec) -> Result<String> {
    spec.validate()?;

    let mut out = String::new();
    let _ = writeln!(out, "{}", SHEBANG);
    for line in render_directives(spec) {
        let _ = writeln!(out, "{}", line);
    }

    let modules = render_modules(spec);
    if !modules.is_empty() {
        out.push('\n');
        for line in modules {
            let _ = writeln!(out, "{}", line);
        }
    }

    out.push('\n');
    let _ = writeln!(out, "{}", join_command(&spec.program.command_line()));

    debug!(
        "Rendered job script for {} ({} bytes)",
        spec.scheduler.job_name,
        out.len()
    );
    Ok(out)
}
