use std::path::Path;

use probeweave::engine::{classify, has_marker, MethodDescriptor, ScopeDecision};
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::{collect_class_files, load_class, DirectoryClasspath},
    output::{print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
struct UnitEntry {
    unit: String,
    decision: String,
    marked: Vec<String>,
}

#[derive(Debug, Serialize)]
struct InspectOutput {
    units: Vec<UnitEntry>,
    in_scope: usize,
}

/// Classpath root of `path`, derived from the package depth of the class it holds.
fn classpath_root<'a>(path: &'a Path, internal_name: &str) -> &'a Path {
    let depth = internal_name.matches('/').count();
    path.ancestors().nth(depth + 1).unwrap_or(path)
}

fn inspect_unit(path: &Path) -> anyhow::Result<UnitEntry> {
    let class = load_class(path)?;
    let name = class.name()?.to_string();
    let classpath = DirectoryClasspath::new(classpath_root(path, &name));
    let marked = MethodDescriptor::all(&class)?
        .into_iter()
        .filter(|m| !m.is_initializer() && has_marker(m))
        .map(|m| m.long_name)
        .collect();

    let bytes = std::fs::read(path)?;
    let decision = match classify(&bytes, &name, &classpath) {
        ScopeDecision::InScope(_) => "in_scope".to_string(),
        ScopeDecision::OutOfScope(kind) => kind.to_string(),
    };

    Ok(UnitEntry {
        unit: name.replace('/', "."),
        decision,
        marked,
    })
}

pub fn run(path: &Path, opts: &GlobalOptions) -> anyhow::Result<()> {
    let files = if path.is_dir() {
        collect_class_files(path)?
    } else {
        vec![path.to_path_buf()]
    };

    let units = files
        .iter()
        .map(|file| inspect_unit(file))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let in_scope = units.iter().filter(|u| u.decision == "in_scope").count();
    let output = InspectOutput { units, in_scope };

    print_output(&output, opts, |out| {
        let mut tw = TabWriter::new(&[
            ("Unit", Align::Left),
            ("Decision", Align::Left),
            ("Marked", Align::Right),
        ]);
        for unit in &out.units {
            tw.row(vec![
                unit.unit.clone(),
                unit.decision.clone(),
                unit.marked.len().to_string(),
            ]);
        }
        tw.print();

        for unit in out.units.iter().filter(|u| !u.marked.is_empty()) {
            println!("\n{}:", unit.unit);
            for method in &unit.marked {
                println!("  {method}");
            }
        }
        println!("\n{} of {} unit(s) in scope.", out.in_scope, out.units.len());
    })
}
