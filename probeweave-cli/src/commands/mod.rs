pub mod common;
pub mod disasm;
pub mod inspect;
pub mod rewrite;
