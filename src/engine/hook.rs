//! Hook field injection.
//!
//! Rewritten methods reach the tracking facade through one static field per unit, initialized
//! from the facade's static accessor in the unit's static initializer. Injection is idempotent:
//! a unit that already has the field is left untouched.

use strum::Display;

use crate::{
    bytecode::CodeAssembler,
    classfile::{ClassFile, FieldAccessFlags, FieldBuilder, MethodAccessFlags, MethodBuilder},
    engine::FacadeBinding,
    Error, Result,
};

const CLINIT: &str = "<clinit>";
const CLINIT_DESCRIPTOR: &str = "()V";

/// What [`ensure_hook_field`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum HookInjection {
    /// The field and its initialization were added.
    Injected,
    /// The field already existed; nothing changed.
    AlreadyPresent,
}

/// Ensure `class` has the hook field, initialized in `<clinit>`.
///
/// An existing static initializer gets an 8-byte prologue (`invokestatic`, `putstatic` and two
/// `nop`s so switch padding in the original code stays aligned); otherwise a new initializer is
/// created.
///
/// # Errors
///
/// Returns [`crate::Error::MissingCode`] if `<clinit>` exists without code,
/// [`crate::Error::CodeTooLarge`] if the prologue does not fit, and
/// [`crate::Error::ConstantPoolOverflow`] if the pool is full. The model may be partially
/// modified on error and must be discarded.
pub fn ensure_hook_field(class: &mut ClassFile, binding: &FacadeBinding) -> Result<HookInjection> {
    if class.find_field(&binding.hook_field).is_some() {
        return Ok(HookInjection::AlreadyPresent);
    }

    let owner = class.name()?.to_string();
    let facade = binding.facade_descriptor();

    match class.find_method(CLINIT, CLINIT_DESCRIPTOR) {
        Some(index) => {
            let mut asm = CodeAssembler::new(&mut class.constant_pool);
            asm.invokestatic(&binding.facade_class, &binding.accessor, &binding.accessor_descriptor(), false)?
                .putstatic(&owner, &binding.hook_field, &facade)?
                .nop()?
                .nop()?;
            let (prologue, max_stack) = asm.finish()?;

            let mut code = class.methods[index]
                .code(&class.constant_pool)?
                .ok_or_else(|| Error::MissingCode(format!("{owner}.{CLINIT}")))?;
            code.prepend(&prologue, &class.constant_pool)?;
            code.max_stack = code.max_stack.max(max_stack);
            class.methods[index].set_code(&mut class.constant_pool, &code)?;
        }
        None => {
            let mut asm = CodeAssembler::new(&mut class.constant_pool);
            asm.invokestatic(&binding.facade_class, &binding.accessor, &binding.accessor_descriptor(), false)?
                .putstatic(&owner, &binding.hook_field, &facade)?
                .return_value(None)?;
            let (code, max_stack) = asm.finish()?;

            MethodBuilder::new(CLINIT, CLINIT_DESCRIPTOR)
                .flags(MethodAccessFlags::STATIC)
                .body(max_stack, 0, code)
                .build(class)?;
        }
    }

    let flags = if class.is_interface() {
        FieldAccessFlags::PUBLIC
            | FieldAccessFlags::STATIC
            | FieldAccessFlags::FINAL
            | FieldAccessFlags::SYNTHETIC
    } else {
        FieldAccessFlags::STATIC | FieldAccessFlags::SYNTHETIC
    };
    FieldBuilder::new(binding.hook_field.as_str(), facade)
        .flags(flags)
        .build(class)?;

    Ok(HookInjection::Injected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bytecode::{decode_stream, Operand},
        classfile::{
            attributes::{names, Attribute},
            ClassFileBuilder, CodeAttribute, ExceptionTableEntry,
        },
        file::writer::Writer,
    };

    #[test]
    fn injection_is_idempotent() -> Result<()> {
        let binding = FacadeBinding::default();
        let mut class = ClassFileBuilder::new("com/acme/Job").build()?;

        assert_eq!(ensure_hook_field(&mut class, &binding)?, HookInjection::Injected);
        let once = class.to_bytes()?;
        assert_eq!(ensure_hook_field(&mut class, &binding)?, HookInjection::AlreadyPresent);
        assert_eq!(class.to_bytes()?, once);

        let hooks = class
            .fields
            .iter()
            .filter(|f| f.name(&class.constant_pool).is_ok_and(|n| n == "$probeweave"))
            .count();
        assert_eq!(hooks, 1);
        Ok(())
    }

    #[test]
    fn creates_static_initializer() -> Result<()> {
        let binding = FacadeBinding::default();
        let mut class = ClassFileBuilder::new("com/acme/Job").build()?;
        ensure_hook_field(&mut class, &binding)?;

        let index = class.find_method("<clinit>", "()V").ok_or(Error::Empty)?;
        let method = &class.methods[index];
        assert!(method.access_flags.contains(MethodAccessFlags::STATIC));
        let code = method.code(&class.constant_pool)?.ok_or(Error::Empty)?;
        assert_eq!(code.max_stack, 1);

        let instructions = decode_stream(&code.code)?;
        let mnemonics: Vec<_> = instructions.iter().map(|i| i.mnemonic).collect();
        assert_eq!(mnemonics, vec!["invokestatic", "putstatic", "return"]);

        let Operand::Constant(accessor) = instructions[0].operand else {
            panic!("invokestatic takes a constant");
        };
        let accessor = class.constant_pool.member_ref(accessor)?;
        assert_eq!(accessor.owner, "io/probeweave/Tracker");
        assert_eq!(accessor.name, "instance");
        assert_eq!(accessor.descriptor, "()Lio/probeweave/Tracker;");

        let field = &class.fields[class.find_field("$probeweave").ok_or(Error::Empty)?];
        assert_eq!(
            field.access_flags,
            FieldAccessFlags::STATIC | FieldAccessFlags::SYNTHETIC
        );
        assert_eq!(field.descriptor(&class.constant_pool)?, "Lio/probeweave/Tracker;");
        Ok(())
    }

    #[test]
    fn interface_field_is_public_final() -> Result<()> {
        let mut class = ClassFileBuilder::new("com/acme/Api").public_interface().build()?;
        ensure_hook_field(&mut class, &FacadeBinding::default())?;
        let field = &class.fields[0];
        assert!(field.access_flags.contains(
            FieldAccessFlags::PUBLIC | FieldAccessFlags::STATIC | FieldAccessFlags::FINAL
        ));
        Ok(())
    }

    #[test]
    fn existing_initializer_is_shifted() -> Result<()> {
        let mut class = ClassFileBuilder::new("com/acme/Job").build()?;
        let pool = &mut class.constant_pool;

        let mut lines = Writer::new();
        for value in [2_u16, 0, 10, 6, 11] {
            lines.write_be(value);
        }
        let code = CodeAttribute {
            max_stack: 2,
            max_locals: 0,
            code: vec![0x03, 0x99, 0x00, 0x05, 0x00, 0x00, 0xB1],
            exception_table: vec![ExceptionTableEntry {
                start_pc: 0,
                end_pc: 6,
                handler_pc: 6,
                catch_type: 0,
            }],
            attributes: vec![
                Attribute::new(pool, names::STACK_MAP_TABLE, vec![0x00, 0x01, 6])?,
                Attribute::new(pool, names::LINE_NUMBER_TABLE, lines.into_inner())?,
            ],
        };
        MethodBuilder::new("<clinit>", "()V")
            .flags(MethodAccessFlags::STATIC)
            .code(code)
            .build(&mut class)?;

        ensure_hook_field(&mut class, &FacadeBinding::default())?;

        let code = class.methods[0]
            .code(&class.constant_pool)?
            .ok_or(Error::Empty)?;
        assert_eq!(code.code.len(), 15);
        assert_eq!(&code.code[6..8], &[0x00, 0x00], "alignment nops");
        assert_eq!(&code.code[8..], &[0x03, 0x99, 0x00, 0x05, 0x00, 0x00, 0xB1]);
        assert_eq!(code.max_stack, 2);
        assert_eq!(code.exception_table[0].handler_pc, 14);
        assert_eq!(code.attributes[0].info, vec![0x00, 0x01, 14]);
        assert_eq!(
            code.attributes[1].info,
            vec![0x00, 0x02, 0x00, 8, 0x00, 10, 0x00, 14, 0x00, 11]
        );

        let reparsed = ClassFile::parse(&class.to_bytes()?)?;
        assert_eq!(reparsed, class);
        Ok(())
    }
}
