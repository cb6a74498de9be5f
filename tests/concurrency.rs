//! Concurrent use of one `Rewriter` from many loader threads.

use std::sync::Arc;

use probeweave::{engine::StatsSnapshot, prelude::*};

fn unit_bytes(name: &str) -> Result<Vec<u8>> {
    ClassFileBuilder::new(name)
        .method(
            MethodBuilder::new("step", "(I)I")
                .flags(MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC)
                .annotation(TASK_MARKER)
                .body(1, 1, vec![0x1A, 0xAC]),
        )
        .build()?
        .to_bytes()
}

#[test]
fn batch_rewrites_distinct_units() -> Result<()> {
    let names: Vec<String> = (0..64).map(|i| format!("com/acme/Step{i}")).collect();
    let bytes: Vec<Vec<u8>> = names.iter().map(|n| unit_bytes(n)).collect::<Result<_>>()?;
    let units: Vec<(&str, &[u8])> = names
        .iter()
        .zip(&bytes)
        .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
        .collect();

    let rewriter = Rewriter::default();
    let outcomes = rewriter.rewrite_batch(&units, &NoCompanions);

    assert_eq!(outcomes.len(), 64);
    assert!(outcomes.iter().all(RewriteOutcome::is_transformed));
    assert_eq!(
        rewriter.stats().snapshot(),
        StatsSnapshot {
            transformed: 64,
            ..StatsSnapshot::default()
        }
    );
    assert_eq!(rewriter.pool().len(), 64);
    Ok(())
}

#[test]
fn racing_loads_of_one_unit_rewrite_it_once() -> Result<()> {
    let bytes = Arc::new(unit_bytes("com/acme/Shared")?);
    let rewriter = Arc::new(Rewriter::default());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let bytes = Arc::clone(&bytes);
            let rewriter = Arc::clone(&rewriter);
            std::thread::spawn(move || {
                rewriter
                    .rewrite(&bytes, "com/acme/Shared", &NoCompanions)
                    .is_transformed()
            })
        })
        .collect();

    let mut transformed = 0;
    for handle in handles {
        if handle.join().unwrap_or(false) {
            transformed += 1;
        }
    }
    assert_eq!(transformed, 1);

    let stats = rewriter.stats().snapshot();
    assert_eq!((stats.transformed, stats.finalized), (1, 7));
    Ok(())
}
