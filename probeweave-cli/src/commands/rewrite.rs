use std::path::Path;

use anyhow::Context;
use probeweave::{
    engine::{DeclineReason, EngineConfig, FacadeBinding, RewriteOutcome, StatsSnapshot},
    Rewriter, UnitFile,
};
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::{collect_class_files, unit_name, DirectoryClasspath},
    output::{print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
struct RewriteEntry {
    unit: String,
    outcome: String,
    size: usize,
}

#[derive(Debug, Serialize)]
struct RewriteOutput {
    units: Vec<RewriteEntry>,
    transformed: usize,
    out_of_scope: usize,
    finalized: usize,
    failed: usize,
}

impl RewriteOutput {
    fn new(units: Vec<RewriteEntry>, stats: StatsSnapshot) -> Self {
        Self {
            units,
            transformed: stats.transformed,
            out_of_scope: stats.out_of_scope,
            finalized: stats.finalized,
            failed: stats.failed,
        }
    }
}

fn outcome_label(outcome: &RewriteOutcome) -> String {
    match outcome {
        RewriteOutcome::Transformed(_) => "transformed".to_string(),
        RewriteOutcome::Declined(DeclineReason::OutOfScope(kind)) => kind.to_string(),
        RewriteOutcome::Declined(DeclineReason::Finalized) => "finalized".to_string(),
        RewriteOutcome::Declined(DeclineReason::Failed(error)) => format!("failed: {error}"),
    }
}

// Inputs are read into owned buffers so that an output tree equal to the input tree can be
// overwritten safely.
fn rewrite_tree(
    input: &Path,
    output: &Path,
    agent_args: Option<&str>,
    dry_run: bool,
) -> anyhow::Result<RewriteOutput> {
    let config = EngineConfig::from_agent_args(agent_args).context("invalid agent arguments")?;
    let rewriter = Rewriter::new(config, FacadeBinding::default());
    let classpath = DirectoryClasspath::new(input);

    let files = collect_class_files(input)?;
    let mut loaded = Vec::with_capacity(files.len());
    for file in &files {
        let name = unit_name(input, file)
            .with_context(|| format!("not below the classpath root: {}", file.display()))?;
        let data = std::fs::read(file)
            .with_context(|| format!("failed to read class file: {}", file.display()))?;
        let unit = UnitFile::from_mem(data)
            .with_context(|| format!("empty class file: {}", file.display()))?;
        loaded.push((name, unit));
    }

    let units: Vec<(&str, &[u8])> = loaded
        .iter()
        .map(|(name, unit)| (name.as_str(), unit.data()))
        .collect();
    let outcomes = rewriter.rewrite_batch(&units, &classpath);

    let mut entries = Vec::with_capacity(outcomes.len());
    for ((name, original), outcome) in units.iter().zip(&outcomes) {
        let bytes = match outcome {
            RewriteOutcome::Transformed(bytes) => bytes.as_slice(),
            RewriteOutcome::Declined(_) => *original,
        };
        if !dry_run {
            let target = output.join(format!("{name}.class"));
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(&target, bytes)
                .with_context(|| format!("failed to write {}", target.display()))?;
        }
        entries.push(RewriteEntry {
            unit: name.replace('/', "."),
            outcome: outcome_label(outcome),
            size: bytes.len(),
        });
    }

    Ok(RewriteOutput::new(entries, rewriter.stats().snapshot()))
}

pub fn run(
    input: &Path,
    output: &Path,
    agent_args: Option<&str>,
    dry_run: bool,
    opts: &GlobalOptions,
) -> anyhow::Result<()> {
    let result = rewrite_tree(input, output, agent_args, dry_run)?;
    print_output(&result, opts, |out| {
        let mut tw = TabWriter::new(&[
            ("Unit", Align::Left),
            ("Outcome", Align::Left),
            ("Size", Align::Right),
        ]);
        for entry in &out.units {
            tw.row(vec![
                entry.unit.clone(),
                entry.outcome.clone(),
                entry.size.to_string(),
            ]);
        }
        tw.print();
        println!(
            "\n{} transformed, {} out of scope, {} finalized, {} failed.",
            out.transformed, out.out_of_scope, out.finalized, out.failed
        );
        if dry_run {
            println!("Dry run: nothing written.");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use probeweave::{
        classfile::{ClassFileBuilder, MethodBuilder},
        engine::TASK_MARKER,
        ClassFile,
    };

    fn write_unit(root: &Path, name: &str, marked: bool) -> anyhow::Result<Vec<u8>> {
        let mut method = MethodBuilder::new("run", "()V").body(0, 1, vec![0xB1]);
        if marked {
            method = method.annotation(TASK_MARKER);
        }
        let bytes = ClassFileBuilder::new(name).method(method).build()?.to_bytes()?;
        let path = root.join(format!("{name}.class"));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &bytes)?;
        Ok(bytes)
    }

    #[test]
    fn rewrite_in_place_keeps_declined_units() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let plain = write_unit(dir.path(), "demo/Main", false)?;
        write_unit(dir.path(), "demo/Job", true)?;

        let result = rewrite_tree(dir.path(), dir.path(), None, false)?;
        assert_eq!((result.transformed, result.out_of_scope), (1, 1));

        assert_eq!(std::fs::read(dir.path().join("demo/Main.class"))?, plain);
        let job = ClassFile::parse(&std::fs::read(dir.path().join("demo/Job.class"))?)?;
        assert!(job.find_method("run$tracked", "()V").is_some());
        Ok(())
    }

    #[test]
    fn dry_run_writes_nothing() -> anyhow::Result<()> {
        let input = tempfile::tempdir()?;
        let output = tempfile::tempdir()?;
        write_unit(input.path(), "demo/Job", true)?;

        let result = rewrite_tree(input.path(), output.path(), None, true)?;
        assert_eq!(result.transformed, 1);
        assert!(collect_class_files(output.path())?.is_empty());
        Ok(())
    }
}
