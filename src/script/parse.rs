// file: src/script/parse.rs
// version: 1.0.0
// guid: 1a38e98b-ddea-4bfc-add5-2cabac25fc3a

//! Job script inspection: read an existing script back into a [`JobSpec`]

use super::render::DIRECTIVE_PREFIX;
use crate::config::{
    Invocation, JobSpec, MemoryLimit, ModuleEnvironment, SchedulerDirectives, TrainingArgs,
    WallTime,
};
use crate::{JobError, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Split one shell line into words
///
/// Handles single quotes, double quotes with backslash escapes, bare
/// backslashes and trailing `#` comments. Expansions are left as literal text.
pub fn split_words(line: &str, line_no: usize) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            ' ' | '\t' => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '#' if !in_word => break,
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(ch) => current.push(ch),
                        None => return Err(JobError::parse(line_no, "unterminated single quote")),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(ch @ ('"' | '\\' | '$' | '`')) => current.push(ch),
                            Some(ch) => {
                                current.push('\\');
                                current.push(ch);
                            }
                            None => {
                                return Err(JobError::parse(line_no, "unterminated double quote"))
                            }
                        },
                        Some(ch) => current.push(ch),
                        None => return Err(JobError::parse(line_no, "unterminated double quote")),
                    }
                }
            }
            '\\' => {
                in_word = true;
                if let Some(ch) = chars.next() {
                    current.push(ch);
                }
            }
            _ => {
                in_word = true;
                current.push(c);
            }
        }
    }

    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// Directives collected while scanning, before required ones are checked
#[derive(Default)]
struct DirectiveSet {
    job_name: Option<String>,
    partition: Option<String>,
    nodes: Option<u32>,
    output: Option<String>,
    error: Option<String>,
    account: Option<String>,
    gpus: Option<u32>,
    time: Option<WallTime>,
    mem: Option<MemoryLimit>,
    extra: BTreeMap<String, String>,
}

fn long_name(short: &str) -> Option<&'static str> {
    match short {
        "J" => Some("job-name"),
        "p" => Some("partition"),
        "N" => Some("nodes"),
        "o" => Some("output"),
        "e" => Some("error"),
        "A" => Some("account"),
        "t" => Some("time"),
        "G" => Some("gpus"),
        _ => None,
    }
}

fn parse_count(key: &str, value: &str, line_no: usize) -> Result<u32> {
    value.parse::<u32>().map_err(|_| {
        JobError::parse(line_no, format!("invalid number for --{}: {}", key, value))
    })
}

/// GPU count from a generic resource request such as `gpu`, `gpu:2`,
/// `gpu:a100:2` or a list like `gpu:1,shard:2`
fn parse_gres(value: &str, line_no: usize) -> Result<u32> {
    let mut gpu_entries = value
        .split(',')
        .filter(|entry| entry.split(':').next() == Some("gpu"));

    let entry = gpu_entries.next().ok_or_else(|| {
        JobError::parse(line_no, format!("generic resource request has no GPUs: {}", value))
    })?;
    if gpu_entries.next().is_some() {
        return Err(JobError::parse(
            line_no,
            format!("GPUs requested more than once: {}", value),
        ));
    }
    if entry != value {
        warn!("Only the GPU entry of --gres={} is kept at line {}", value, line_no);
    }

    let parts: Vec<&str> = entry.split(':').collect();
    match parts.len() {
        1 => Ok(1),
        2 | 3 => {
            let count = parts[parts.len() - 1];
            match count.parse::<u32>() {
                Ok(n) => Ok(n),
                // `gpu:a100` names a type without a count
                Err(_) if parts.len() == 2 => Ok(1),
                Err(_) => Err(JobError::parse(line_no, format!("invalid GPU count: {}", value))),
            }
        }
        _ => Err(JobError::parse(
            line_no,
            format!("unsupported generic resource: {}", value),
        )),
    }
}

impl DirectiveSet {
    fn apply(&mut self, words: &[String], line_no: usize) -> Result<()> {
        let first = words
            .first()
            .ok_or_else(|| JobError::parse(line_no, "empty directive"))?;

        let (key, inline): (String, Option<String>) = if let Some(long) = first.strip_prefix("--") {
            match long.split_once('=') {
                Some((k, v)) => (k.to_string(), Some(v.to_string())),
                None => (long.to_string(), None),
            }
        } else if let Some(short) = first.strip_prefix('-') {
            let mut chars = short.chars();
            let flag = chars.next().map(String::from).unwrap_or_default();
            let attached = chars.as_str();
            let name = long_name(&flag).ok_or_else(|| {
                JobError::parse(line_no, format!("unsupported short directive: {}", first))
            })?;
            let attached = attached.trim_start_matches('=');
            (
                name.to_string(),
                (!attached.is_empty()).then(|| attached.to_string()),
            )
        } else {
            return Err(JobError::parse(
                line_no,
                format!("directive must start with '-': {}", first),
            ));
        };

        let value = match inline.or_else(|| words.get(1).cloned()) {
            Some(v) => v,
            None => {
                return Err(JobError::parse(
                    line_no,
                    format!("directive --{} needs a value", key),
                ))
            }
        };

        match key.as_str() {
            "job-name" => self.job_name = Some(value),
            "partition" => self.partition = Some(value),
            "nodes" => self.nodes = Some(parse_count(&key, &value, line_no)?),
            "output" => self.output = Some(value),
            "error" => self.error = Some(value),
            "account" => self.account = Some(value),
            "gres" => self.gpus = Some(parse_gres(&value, line_no)?),
            "gpus" => self.gpus = Some(parse_count(&key, &value, line_no)?),
            "time" => self.time = Some(value.parse()?),
            "mem" => self.mem = Some(value.parse()?),
            _ => {
                self.extra.insert(key.clone(), value);
            }
        }

        Ok(())
    }

    fn finish(self) -> Result<SchedulerDirectives> {
        let mut missing = Vec::new();
        if self.job_name.is_none() {
            missing.push("job-name");
        }
        if self.partition.is_none() {
            missing.push("partition");
        }
        if self.output.is_none() {
            missing.push("output");
        }
        if self.error.is_none() {
            missing.push("error");
        }
        if self.account.is_none() {
            missing.push("account");
        }
        if self.gpus.is_none() {
            missing.push("gres");
        }
        if self.time.is_none() {
            missing.push("time");
        }
        if self.mem.is_none() {
            missing.push("mem");
        }

        match (
            self.job_name,
            self.partition,
            self.output,
            self.error,
            self.account,
            self.gpus,
            self.time,
            self.mem,
        ) {
            (
                Some(job_name),
                Some(partition),
                Some(output),
                Some(error),
                Some(account),
                Some(gpus),
                Some(time),
                Some(mem),
            ) => Ok(SchedulerDirectives {
                job_name,
                partition,
                nodes: self.nodes.unwrap_or(1),
                output,
                error,
                account,
                gpus,
                time,
                mem,
                extra: self.extra,
            }),
            _ => Err(JobError::validation(format!(
                "Job script is missing directives: {}",
                missing.join(", ")
            ))),
        }
    }
}

/// Join lines ending in a backslash with the line that follows
fn logical_lines(text: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let (start, mut acc) = pending.take().unwrap_or((line_no, String::new()));
        match raw.strip_suffix('\\') {
            Some(head) => {
                acc.push_str(head);
                acc.push(' ');
                pending = Some((start, acc));
            }
            None => {
                acc.push_str(raw);
                lines.push((start, acc));
            }
        }
    }

    if let Some(rest) = pending {
        lines.push(rest);
    }
    lines
}

/// Parse a job script into a validated [`JobSpec`]
///
/// Like the scheduler, directives are only honoured before the first command.
/// The script must run exactly one program after its module commands.
pub fn parse_script(text: &str) -> Result<JobSpec> {
    let mut directives = DirectiveSet::default();
    let mut environment = ModuleEnvironment {
        purge: false,
        modules: Vec::new(),
    };
    let mut invocation: Option<Invocation> = None;
    let mut seen_command = false;

    for (line_no, line) in logical_lines(text) {
        let trimmed = line.trim();

        if trimmed.is_empty() || (line_no == 1 && trimmed.starts_with("#!")) {
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix(DIRECTIVE_PREFIX) {
            if seen_command {
                warn!("Ignoring directive after first command at line {}", line_no);
                continue;
            }
            let words = split_words(rest, line_no)?;
            directives.apply(&words, line_no)?;
            continue;
        }

        if trimmed.starts_with('#') {
            continue;
        }

        seen_command = true;
        let words = split_words(trimmed, line_no)?;
        if words.is_empty() {
            continue;
        }

        if words[0] == "module" {
            match words.get(1).map(String::as_str) {
                Some("purge") => environment.purge = true,
                Some("load") | Some("add") => environment.modules.extend(words[2..].iter().cloned()),
                other => {
                    return Err(JobError::parse(
                        line_no,
                        format!("unsupported module command: {}", other.unwrap_or("")),
                    ))
                }
            }
            continue;
        }

        if invocation.is_some() {
            return Err(JobError::parse(
                line_no,
                "job script runs more than one program",
            ));
        }

        let script = words.get(1).ok_or_else(|| {
            JobError::parse(line_no, format!("{} is missing a training script", words[0]))
        })?;
        let (args, extra_args) = TrainingArgs::from_cli_args(&words[2..])?;
        invocation = Some(Invocation {
            interpreter: words[0].clone(),
            script: PathBuf::from(script),
            extra_args,
            args,
        });
    }

    let program = invocation
        .ok_or_else(|| JobError::validation("Job script does not launch a program"))?;

    let spec = JobSpec {
        scheduler: directives.finish()?,
        environment,
        program,
    };
    spec.validate()?;

    debug!("Parsed job script for {}", spec.scheduler.job_name);
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::render::render_script;

    #[test]
    fn test_split_words_quoting() {
        let words = split_words(r#"python "a b.py" 'c d' e\ f "x\"y" # trailing"#, 1).unwrap();
        assert_eq!(words, vec!["python", "a b.py", "c d", "e f", "x\"y"]);
    }

    #[test]
    fn test_split_words_unterminated() {
        let err = split_words("python 'oops", 4).unwrap_err();
        assert!(err.to_string().contains("line 4"));
    }

    #[test]
    fn test_round_trip_canonical() {
        let spec = JobSpec::canonical();
        let script = render_script(&spec).unwrap();
        assert_eq!(parse_script(&script).unwrap(), spec);
    }

    #[test]
    fn test_round_trip_with_extras() {
        let mut spec = JobSpec::canonical();
        spec.scheduler
            .extra
            .insert("cpus-per-task".to_string(), "8".to_string());
        spec.program.args.dataset_root = Some(PathBuf::from("/scratch/my data"));
        spec.program.args.data_aug_hflip = true;
        spec.program.extra_args = vec!["--seed".to_string(), "3".to_string()];

        let script = render_script(&spec).unwrap();
        assert_eq!(parse_script(&script).unwrap(), spec);
    }

    #[test]
    fn test_hand_written_script() {
        let script = r#"#!/bin/bash
#SBATCH --job-name lab5
#SBATCH -p teach_gpu
#SBATCH -N 1
#SBATCH -o log_%j.out
#SBATCH -e log_%j.err
#SBATCH -A COMS030144
#SBATCH --gres gpu:1
#SBATCH -t 0-00:30
#SBATCH --mem=64GB

# environment
module purge
module load languages/anaconda3/2021-3.8.8-cuda-11.1-pytorch

python train_cifar.py \
    --learning-rate 1e-2 \
    --batch-size 128 \
    --data-aug-brightness 0.1
"#;

        let spec = parse_script(script).unwrap();
        assert_eq!(spec.scheduler.job_name, "lab5");
        assert_eq!(spec.scheduler.partition, "teach_gpu");
        assert_eq!(spec.scheduler.output, "log_%j.out");
        assert_eq!(spec.scheduler.gpus, 1);
        assert_eq!(spec.scheduler.time.as_seconds(), 1_800);
        assert!(spec.environment.purge);
        assert_eq!(spec.environment.modules.len(), 1);
        assert_eq!(spec.program.args.learning_rate, 0.01);
        assert_eq!(spec.program.args.data_aug_brightness, 0.1);
        assert!(spec.program.extra_args.is_empty());
    }

    #[test]
    fn test_missing_directives_named() {
        let script = "#!/bin/bash\n#SBATCH --job-name=x\npython train_cifar.py\n";
        let err = parse_script(script).unwrap_err().to_string();
        assert!(err.contains("partition"));
        assert!(err.contains("account"));
        assert!(err.contains("gres"));
        assert!(!err.contains("job-name"));
    }

    #[test]
    fn test_directives_after_command_ignored() {
        let mut script = render_script(&JobSpec::canonical()).unwrap();
        script.push_str("#SBATCH --partition=other\n");

        let spec = parse_script(&script).unwrap();
        assert_eq!(spec.scheduler.partition, "teach_gpu");
    }

    #[test]
    fn test_second_program_rejected() {
        let mut script = render_script(&JobSpec::canonical()).unwrap();
        script.push_str("echo done\n");

        let err = parse_script(&script).unwrap_err();
        assert!(err.to_string().contains("more than one program"));
    }

    #[test]
    fn test_gres_forms() {
        assert_eq!(parse_gres("gpu", 1).unwrap(), 1);
        assert_eq!(parse_gres("gpu:2", 1).unwrap(), 2);
        assert_eq!(parse_gres("gpu:a100:4", 1).unwrap(), 4);
        assert_eq!(parse_gres("gpu:a100", 1).unwrap(), 1);
        assert!(parse_gres("fpga:1", 1).is_err());
    }

    #[test]
    fn test_gres_lists_count_only_gpus() {
        assert_eq!(parse_gres("gpu:1,shard:2", 1).unwrap(), 1);
        assert_eq!(parse_gres("shard:2,gpu:a100:3", 1).unwrap(), 3);
        assert_eq!(parse_gres("shard:2,gpu", 1).unwrap(), 1);
        assert!(parse_gres("shard:2,fpga:1", 1).is_err());
        assert!(parse_gres("gpu:1,gpu:2", 1).is_err());
    }

    #[test]
    fn test_round_trip_with_unusual_directive_values() {
        let mut spec = JobSpec::canonical();
        spec.scheduler.output = "logs/%x#%j.out".to_string();
        spec.scheduler.error = "logs/%x@%N,%j.err".to_string();
        spec.scheduler
            .extra
            .insert("mail-user".to_string(), "me@example.com".to_string());

        let script = render_script(&spec).unwrap();
        assert_eq!(parse_script(&script).unwrap(), spec);
    }

    #[test]
    fn test_quoted_directive_values_never_rendered() {
        let mut spec = JobSpec::canonical();
        spec.scheduler.output = "it's_%j.out".to_string();
        assert!(render_script(&spec).is_err());
    }
}
