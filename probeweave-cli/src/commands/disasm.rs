use std::path::Path;

use probeweave::{
    bytecode::{decode_stream, Instruction, Operand},
    classfile::{ClassFile, Constant, ConstantPool},
};

use crate::commands::common::load_class;

/// Human-readable form of the constant an instruction refers to.
fn describe_constant(pool: &ConstantPool, index: u16) -> Option<String> {
    match pool.get(index).ok()? {
        Constant::Class { .. } => pool.class_name(index).ok().map(|n| format!("class {n}")),
        Constant::String { .. } => pool.string(index).ok().map(|s| format!("String {s:?}")),
        Constant::Integer(value) => Some(format!("int {value}")),
        Constant::Long(value) => Some(format!("long {value}")),
        Constant::Float(bits) => Some(format!("float {}", f32::from_bits(*bits))),
        Constant::Double(bits) => Some(format!("double {}", f64::from_bits(*bits))),
        Constant::FieldRef { .. } => pool.member_ref(index).ok().map(|m| format!("Field {m}")),
        Constant::MethodRef { .. } | Constant::InterfaceMethodRef { .. } => {
            pool.member_ref(index).ok().map(|m| format!("Method {m}"))
        }
        _ => None,
    }
}

fn print_instruction(class: &ClassFile, code: &[u8], instruction: &Instruction, bytes: bool) {
    let mut line = instruction.to_string();
    if bytes {
        let start = instruction.offset as usize;
        let end = start + instruction.size as usize;
        let hex: Vec<String> = code[start..end].iter().map(|b| format!("{b:02X}")).collect();
        line = format!("{line:<40} [{}]", hex.join(" "));
    }
    let index = match instruction.operand {
        Operand::Constant(index)
        | Operand::Interface { index, .. }
        | Operand::MultiArray { index, .. } => Some(index),
        _ => None,
    };
    match index.and_then(|i| describe_constant(&class.constant_pool, i)) {
        Some(comment) => println!("  {line:<40} // {comment}"),
        None => println!("  {line}"),
    }
}

pub fn run(path: &Path, method_filter: Option<&str>, bytes: bool) -> anyhow::Result<()> {
    let class = load_class(path)?;
    let pool = &class.constant_pool;
    println!(
        "// {} (version {}.{})",
        class.binary_name()?,
        class.major_version,
        class.minor_version
    );

    for method in &class.methods {
        let name = method.name(pool)?;
        if method_filter.is_some_and(|filter| filter != name) {
            continue;
        }
        println!("\n{:?} {name}{}", method.access_flags, method.descriptor(pool)?);
        let Some(code) = method.code(pool)? else {
            println!("  // no code");
            continue;
        };
        println!("  // max_stack {}, max_locals {}", code.max_stack, code.max_locals);
        for instruction in decode_stream(&code.code)? {
            print_instruction(&class, &code.code, &instruction, bytes);
        }
        for entry in &code.exception_table {
            let catch = if entry.catch_type == 0 {
                "any".to_string()
            } else {
                pool.class_name(entry.catch_type)?.to_string()
            };
            println!(
                "  // try {}..{} catch {catch} -> {}",
                entry.start_pc, entry.end_pc, entry.handler_pc
            );
        }
    }
    Ok(())
}
