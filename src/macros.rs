#![allow(unused_macros)]

/// Helper macro for reading locked items
///
/// A poisoned lock is recovered instead of propagated: the guarded state is plain
/// bookkeeping that stays consistent between statements.
///
/// ```rust, ignore
///  let data = read_lock!(my_rwlock);
///  println!("{}", data.some_field);
/// ```
macro_rules! read_lock {
    ($rwlock:expr) => {
        $rwlock
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    };
}

/// Helper macro for writing to locked items
///
/// ```rust, ignore
///  let mut data = write_lock!(my_rwlock);
///  data.some_field = 42;
/// ```
macro_rules! write_lock {
    ($rwlock:expr) => {
        $rwlock
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    };
}
