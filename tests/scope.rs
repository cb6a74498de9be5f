//! Scope classification of singleton-style unit pairs.
//!
//! A unit `X` whose name has no `$` may be the thin forwarder of a singleton whose real methods
//! live in `X$`. When the resolver can see `X$`, only `X$` is instrumented.

use std::collections::HashSet;

use probeweave::{
    engine::{classify_methods, MethodDescriptor},
    prelude::*,
};

fn marked(owner: &str) -> Result<Vec<MethodDescriptor>> {
    Ok(vec![
        MethodDescriptor::new(owner, "<init>", "()V")?,
        MethodDescriptor::new(owner, "run", "([Ljava/lang/String;)V")?.with_annotation(TASK_MARKER),
    ])
}

fn unit_bytes(name: &str) -> Result<Vec<u8>> {
    ClassFileBuilder::new(name)
        .method(MethodBuilder::new("run", "()V").annotation(TASK_MARKER).body(0, 1, vec![0xB1]))
        .build()?
        .to_bytes()
}

#[test]
fn singleton_pair_instruments_only_the_companion() -> Result<()> {
    let loader: HashSet<String> = ["com.acme.Job", "com.acme.Job$"]
        .into_iter()
        .map(String::from)
        .collect();

    let companion = classify_methods(&marked("com.acme.Job$")?, "com.acme.Job$", &loader);
    assert!(companion.is_in_scope());

    let forwarder = classify_methods(&marked("com.acme.Job")?, "com.acme.Job", &loader);
    assert_eq!(forwarder.out_of_scope(), Some(OutOfScope::CompanionPresent));
    Ok(())
}

#[test]
fn sole_plain_unit_is_instrumented() -> Result<()> {
    let decision = classify_methods(&marked("com.acme.Job")?, "com/acme/Job", &NoCompanions);
    assert!(decision.is_in_scope());
    Ok(())
}

#[test]
fn companion_probe_uses_binary_name() -> Result<()> {
    let probed = std::sync::Mutex::new(Vec::new());
    let resolver = |name: &str| {
        probed
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(name.to_string());
        false
    };
    let decision = classify_methods(&marked("com.acme.Job")?, "com/acme/Job", &resolver);
    assert!(decision.is_in_scope());
    assert_eq!(
        *probed.lock().unwrap_or_else(std::sync::PoisonError::into_inner),
        vec!["com.acme.Job$".to_string()]
    );
    Ok(())
}

#[test]
fn unmarked_methods_are_never_probed() -> Result<()> {
    let methods = vec![MethodDescriptor::new("a.B", "run", "()V")?];
    let resolver = |_: &str| -> bool { panic!("resolver must not be consulted") };
    assert_eq!(
        classify_methods(&methods, "a.B", &resolver).out_of_scope(),
        Some(OutOfScope::NoMarker)
    );
    Ok(())
}

#[test]
fn rewriter_follows_the_companion_rule() -> Result<()> {
    let loader: HashSet<String> = ["com.acme.Job$".to_string()].into_iter().collect();
    let rewriter = Rewriter::default();

    let companion = unit_bytes("com/acme/Job$")?;
    let forwarder = unit_bytes("com/acme/Job")?;
    let sole = unit_bytes("com/acme/Report")?;

    assert!(rewriter.rewrite(&companion, "com/acme/Job$", &loader).is_transformed());
    assert!(matches!(
        rewriter.rewrite(&forwarder, "com/acme/Job", &loader),
        RewriteOutcome::Declined(DeclineReason::OutOfScope(OutOfScope::CompanionPresent))
    ));
    assert!(rewriter.rewrite(&sole, "com/acme/Report", &loader).is_transformed());
    Ok(())
}
