//! Method wrapping.
//!
//! A marked method `m` is wrapped by rename-and-delegate: its body moves, untouched, to a
//! private synthetic method `m$tracked`, and a new `m` with the original flags, descriptor and
//! annotations is generated around a call to it:
//!
//! ```text
//! getstatic  hook                       // before
//! ldc        "com.acme.Job"
//! ldc        "com.acme.Job.m(int)"
//! <Object[] of boxed arguments>
//! invokevirtual beforeTask
//! aload_0, <arguments>                  // try
//! invokespecial m$tracked
//! <store result>                        // after
//! getstatic hook, ldc name, <boxed result | null>
//! invokevirtual afterTask
//! <load result>, <typed return>
//! astore e                              // catch Throwable
//! getstatic hook, ldc name, aload e
//! invokevirtual errorTask
//! aload e, athrow
//! ```
//!
//! Because the original code is never edited, none of its branch offsets, exception ranges or
//! stack map frames need to move.

use strum::Display;

use crate::{
    bytecode::{CodeAssembler, StackMapFrame, StackMapTable, VerificationType},
    classfile::{
        attributes::names, Attribute, ClassFile, CodeAttribute, ExceptionTableEntry, FieldType,
        MethodAccessFlags, MethodInfo, MethodType,
    },
    engine::{
        scope::ScopedUnit, FacadeBinding, MethodDescriptor, AFTER_DESCRIPTOR, BEFORE_DESCRIPTOR,
        ERROR_DESCRIPTOR, WRAPPED_SUFFIX,
    },
    Error, Result,
};

const OBJECT: &str = "java/lang/Object";
const THROWABLE: &str = "java/lang/Throwable";

/// Attributes that describe the method's interface and therefore belong to the wrapper.
const MOVED_ATTRIBUTES: &[&str] = &[
    names::RUNTIME_VISIBLE_ANNOTATIONS,
    names::RUNTIME_INVISIBLE_ANNOTATIONS,
    names::RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS,
    names::RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS,
];

/// Attributes copied to the wrapper and also kept on the renamed body.
const SHARED_ATTRIBUTES: &[&str] = &[
    names::EXCEPTIONS,
    names::SIGNATURE,
    names::METHOD_PARAMETERS,
    names::DEPRECATED,
];

/// What [`wrap_method`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum WrapOutcome {
    /// The method now delegates to its renamed body through the probes.
    Wrapped,
    /// A renamed body with the same descriptor already exists.
    AlreadyWrapped,
}

/// Box a primitive on top of the stack; references are left as they are.
fn box_value(asm: &mut CodeAssembler, field: &FieldType) -> Result<()> {
    let wrapper = match field {
        FieldType::Boolean => "java/lang/Boolean",
        FieldType::Byte => "java/lang/Byte",
        FieldType::Char => "java/lang/Character",
        FieldType::Short => "java/lang/Short",
        FieldType::Int => "java/lang/Integer",
        FieldType::Long => "java/lang/Long",
        FieldType::Float => "java/lang/Float",
        FieldType::Double => "java/lang/Double",
        FieldType::Object(_) | FieldType::Array(_) => return Ok(()),
    };
    asm.invokestatic(wrapper, "valueOf", &format!("({field})L{wrapper};"), false)?;
    Ok(())
}

/// Wrap every marked method of a classified unit.
///
/// Returns the number of methods wrapped by this call. Methods are logged at info level when
/// `verbose` is set and at debug level otherwise.
///
/// # Errors
///
/// Fails on the first method that cannot be wrapped; the unit must then be discarded.
pub fn wrap_methods(unit: &mut ScopedUnit, binding: &FacadeBinding, verbose: bool) -> Result<usize> {
    let marked: Vec<MethodDescriptor> = unit.marked().cloned().collect();
    let mut wrapped = 0;
    for method in &marked {
        match wrap_method(&mut unit.class, method, binding)? {
            WrapOutcome::Wrapped => {
                if verbose {
                    log::info!("Instrumenting {}", method.long_name);
                } else {
                    log::debug!("Instrumenting {}", method.long_name);
                }
                wrapped += 1;
            }
            WrapOutcome::AlreadyWrapped => {
                log::debug!("{} is already instrumented", method.long_name);
            }
        }
    }
    Ok(wrapped)
}

/// Wrap one method of `class` with before, after and error probes.
///
/// # Errors
///
/// - [`crate::Error::MissingCode`] for abstract or native methods
/// - [`crate::Error::Malformed`] if `method` does not describe the method at its index
/// - [`crate::Error::ConstantPoolOverflow`] or [`crate::Error::CodeTooLarge`] when the class has
///   no room for the wrapper
pub fn wrap_method(
    class: &mut ClassFile,
    method: &MethodDescriptor,
    binding: &FacadeBinding,
) -> Result<WrapOutcome> {
    let original = class
        .methods
        .get(method.index)
        .ok_or_else(|| malformed_error!("Method index {} out of range", method.index))?;
    if original.name(&class.constant_pool)? != method.name
        || original.descriptor(&class.constant_pool)? != method.descriptor
    {
        return Err(malformed_error!(
            "Descriptor of {} does not match method {}",
            method.long_name,
            method.index
        ));
    }
    if original.access_flags.is_bodiless() || original.code(&class.constant_pool)?.is_none() {
        return Err(Error::MissingCode(method.long_name.clone()));
    }

    let renamed = format!("{}{WRAPPED_SUFFIX}", method.name);
    if class.find_method(&renamed, &method.descriptor).is_some() {
        return Ok(WrapOutcome::AlreadyWrapped);
    }

    let signature = MethodType::parse(&method.descriptor)?;
    let is_static = original.access_flags.contains(MethodAccessFlags::STATIC);
    let original_flags = original.access_flags;
    let owner = class.name()?.to_string();
    let interface = class.is_interface();
    let stack_maps = class.requires_stack_maps();

    let this_slots = u16::from(!is_static);
    let result_slot = this_slots + signature.param_slots();
    let error_slot = result_slot + signature.return_slots();
    let max_locals = error_slot + 1;

    let hook = binding.facade_descriptor();
    let pool = &mut class.constant_pool;
    let mut asm = CodeAssembler::new(pool);

    asm.getstatic(&owner, &binding.hook_field, &hook)?
        .ldc_string(&method.owner)?
        .ldc_string(&method.long_name)?
        .push_int(i32::try_from(signature.params.len()).map_err(|_| malformed_error!("Too many parameters"))?)?
        .anewarray(OBJECT)?;
    let mut slot = this_slots;
    for (position, param) in signature.params.iter().enumerate() {
        asm.dup()?
            .push_int(position as i32)?
            .load(param, slot)?;
        box_value(&mut asm, param)?;
        asm.aastore()?;
        slot += param.slots();
    }
    asm.invokevirtual(&binding.facade_class, &binding.before_probe, BEFORE_DESCRIPTOR)?;

    let try_start = asm.position()?;
    if !is_static {
        asm.aload(0)?;
    }
    let mut slot = this_slots;
    for param in &signature.params {
        asm.load(param, slot)?;
        slot += param.slots();
    }
    if is_static {
        asm.invokestatic(&owner, &renamed, &method.descriptor, interface)?;
    } else {
        asm.invokespecial(&owner, &renamed, &method.descriptor, interface)?;
    }
    let try_end = asm.position()?;

    if let Some(ret) = &signature.ret {
        asm.store(ret, result_slot)?;
    }
    asm.getstatic(&owner, &binding.hook_field, &hook)?
        .ldc_string(&method.long_name)?;
    match &signature.ret {
        Some(ret) => {
            asm.load(ret, result_slot)?;
            box_value(&mut asm, ret)?;
        }
        None => {
            asm.aconst_null()?;
        }
    }
    asm.invokevirtual(&binding.facade_class, &binding.after_probe, AFTER_DESCRIPTOR)?;
    if let Some(ret) = &signature.ret {
        asm.load(ret, result_slot)?;
    }
    asm.return_value(signature.ret.as_ref())?;

    let handler = asm.position()?;
    asm.set_stack_depth(1)
        .astore(error_slot)?
        .getstatic(&owner, &binding.hook_field, &hook)?
        .ldc_string(&method.long_name)?
        .aload(error_slot)?
        .invokevirtual(&binding.facade_class, &binding.error_probe, ERROR_DESCRIPTOR)?
        .aload(error_slot)?
        .athrow()?;
    let (code, max_stack) = asm.finish()?;

    let throwable = pool.class_index(THROWABLE)?;
    let mut code_attributes = Vec::new();
    if stack_maps {
        let mut locals = Vec::with_capacity(signature.params.len() + 1);
        if !is_static {
            locals.push(VerificationType::Object(pool.class_index(&owner)?));
        }
        for param in &signature.params {
            locals.push(VerificationType::from_field_type(param, pool)?);
        }
        let table = StackMapTable {
            frames: vec![StackMapFrame::Full {
                offset_delta: handler,
                locals,
                stack: vec![VerificationType::Object(throwable)],
            }],
        };
        code_attributes.push(Attribute::new(pool, names::STACK_MAP_TABLE, table.to_bytes()?)?);
    }

    let wrapper_code = CodeAttribute {
        max_stack,
        max_locals,
        code,
        exception_table: vec![ExceptionTableEntry {
            start_pc: try_start,
            end_pc: try_end,
            handler_pc: handler,
            catch_type: throwable,
        }],
        attributes: code_attributes,
    };

    let renamed_index = pool.utf8_index(&renamed)?;
    let code_name = pool.utf8_index(names::CODE)?;
    let original = &mut class.methods[method.index];

    let mut wrapper_attributes = vec![Attribute {
        name_index: code_name,
        info: wrapper_code.to_bytes()?,
    }];
    let mut kept = Vec::with_capacity(original.attributes.len());
    for attribute in std::mem::take(&mut original.attributes) {
        let name = attribute.name(&class.constant_pool)?;
        if MOVED_ATTRIBUTES.contains(&name) {
            wrapper_attributes.push(attribute);
        } else {
            if SHARED_ATTRIBUTES.contains(&name) {
                wrapper_attributes.push(attribute.clone());
            }
            kept.push(attribute);
        }
    }
    original.attributes = kept;

    let wrapper = MethodInfo {
        access_flags: original_flags,
        name_index: original.name_index,
        descriptor_index: original.descriptor_index,
        attributes: wrapper_attributes,
    };
    original.name_index = renamed_index;
    original.access_flags = (original_flags
        & (MethodAccessFlags::STATIC | MethodAccessFlags::STRICT))
        | MethodAccessFlags::PRIVATE
        | MethodAccessFlags::SYNTHETIC;
    class.methods.push(wrapper);

    Ok(WrapOutcome::Wrapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bytecode::{decode_stream, Operand},
        classfile::{ClassFileBuilder, MethodBuilder},
        engine::TASK_MARKER,
    };

    fn single(builder: MethodBuilder) -> Result<(ClassFile, MethodDescriptor)> {
        let class = ClassFileBuilder::new("com/acme/Job").method(builder).build()?;
        let descriptor = MethodDescriptor::from_class(&class, 0)?;
        Ok((class, descriptor))
    }

    fn member_name(class: &ClassFile, operand: &Operand) -> Result<String> {
        let Operand::Constant(index) = operand else {
            return Err(malformed_error!("expected a constant operand"));
        };
        Ok(class.constant_pool.member_ref(*index)?.name.to_string())
    }

    #[test]
    fn instance_method_layout() -> Result<()> {
        let (mut class, method) = single(
            MethodBuilder::new("execute", "(JLjava/lang/String;)I")
                .flags(MethodAccessFlags::PUBLIC | MethodAccessFlags::SYNCHRONIZED)
                .annotation(TASK_MARKER)
                .body(1, 4, vec![0x04, 0xAC]),
        )?;
        assert_eq!(wrap_method(&mut class, &method, &FacadeBinding::default())?, WrapOutcome::Wrapped);

        let pool = &class.constant_pool;
        let body = &class.methods[0];
        assert_eq!(body.name(pool)?, "execute$tracked");
        assert_eq!(
            body.access_flags,
            MethodAccessFlags::PRIVATE | MethodAccessFlags::SYNTHETIC
        );
        assert!(body.visible_annotations(pool)?.is_empty());
        assert_eq!(body.code(pool)?.map(|c| c.code), Some(vec![0x04, 0xAC]));

        let wrapper = &class.methods[1];
        assert_eq!(wrapper.name(pool)?, "execute");
        assert_eq!(
            wrapper.access_flags,
            MethodAccessFlags::PUBLIC | MethodAccessFlags::SYNCHRONIZED
        );
        assert_eq!(wrapper.visible_annotations(pool)?, vec![TASK_MARKER]);

        let code = wrapper.code(pool)?.ok_or(Error::Empty)?;
        // this + long (2) + String + int result + throwable
        assert_eq!(code.max_locals, 6);
        let instructions = decode_stream(&code.code)?;
        let handler = &code.exception_table[0];
        assert_eq!(pool.class_name(handler.catch_type)?, "java/lang/Throwable");

        let call = instructions
            .iter()
            .find(|i| i.mnemonic == "invokespecial")
            .ok_or(Error::Empty)?;
        assert_eq!(member_name(&class, &call.operand)?, "execute$tracked");
        assert!(u32::from(handler.start_pc) <= call.offset);
        assert_eq!(u32::from(handler.end_pc), call.offset + call.size);

        let probes: Vec<String> = instructions
            .iter()
            .filter(|i| i.mnemonic == "invokevirtual")
            .map(|i| member_name(&class, &i.operand))
            .collect::<Result<_>>()?;
        assert_eq!(probes, vec!["beforeTask", "afterTask", "errorTask"]);

        let boxes: Vec<String> = instructions
            .iter()
            .filter(|i| i.mnemonic == "invokestatic")
            .map(|i| {
                let Operand::Constant(index) = i.operand else {
                    return Err(malformed_error!("expected a constant operand"));
                };
                Ok(pool.member_ref(index)?.owner.to_string())
            })
            .collect::<Result<_>>()?;
        assert_eq!(boxes, vec!["java/lang/Long", "java/lang/Integer"]);
        Ok(())
    }

    #[test]
    fn handler_rethrows_caught_object() -> Result<()> {
        let (mut class, method) = single(
            MethodBuilder::new("run", "()V")
                .annotation(TASK_MARKER)
                .body(0, 1, vec![0xB1]),
        )?;
        wrap_method(&mut class, &method, &FacadeBinding::default())?;

        let code = class.methods[1]
            .code(&class.constant_pool)?
            .ok_or(Error::Empty)?;
        // this + throwable, the void result takes no slot
        assert_eq!(code.max_locals, 2);
        let handler = u32::from(code.exception_table[0].handler_pc);
        let tail: Vec<_> = decode_stream(&code.code)?
            .into_iter()
            .filter(|i| i.offset >= handler)
            .collect();
        let mnemonics: Vec<_> = tail.iter().map(|i| i.mnemonic).collect();
        assert_eq!(
            mnemonics,
            vec!["astore_1", "getstatic", "ldc", "aload_1", "invokevirtual", "aload_1", "athrow"]
        );
        Ok(())
    }

    #[test]
    fn static_method_frame_and_locals() -> Result<()> {
        let (mut class, method) = single(
            MethodBuilder::new("sum", "(DI)D")
                .flags(MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC)
                .annotation(TASK_MARKER)
                .body(2, 3, vec![0x18, 0x00, 0xAF]),
        )?;
        wrap_method(&mut class, &method, &FacadeBinding::default())?;

        let pool = &class.constant_pool;
        assert_eq!(
            class.methods[0].access_flags,
            MethodAccessFlags::PRIVATE | MethodAccessFlags::STATIC | MethodAccessFlags::SYNTHETIC
        );
        let code = class.methods[1].code(pool)?.ok_or(Error::Empty)?;
        // double (2) + int + double result (2) + throwable
        assert_eq!(code.max_locals, 6);

        let table = code
            .attributes
            .iter()
            .find(|a| a.is(pool, names::STACK_MAP_TABLE))
            .map(|a| StackMapTable::parse(&a.info))
            .transpose()?
            .ok_or(Error::Empty)?;
        let [StackMapFrame::Full {
            offset_delta,
            locals,
            stack,
        }] = table.frames.as_slice()
        else {
            panic!("expected a single full frame");
        };
        assert_eq!(*offset_delta, code.exception_table[0].handler_pc);
        assert_eq!(
            locals.as_slice(),
            &[VerificationType::Double, VerificationType::Integer]
        );
        assert_eq!(stack.len(), 1);
        Ok(())
    }

    #[test]
    fn old_versions_have_no_stack_map() -> Result<()> {
        let mut class = ClassFileBuilder::new("com/acme/Old")
            .version(49, 0)
            .method(MethodBuilder::new("run", "()V").annotation(TASK_MARKER).body(0, 1, vec![0xB1]))
            .build()?;
        let method = MethodDescriptor::from_class(&class, 0)?;
        wrap_method(&mut class, &method, &FacadeBinding::default())?;
        let code = class.methods[1]
            .code(&class.constant_pool)?
            .ok_or(Error::Empty)?;
        assert!(code.attributes.is_empty());
        Ok(())
    }

    #[test]
    fn abstract_methods_cannot_be_wrapped() -> Result<()> {
        let (mut class, method) = single(
            MethodBuilder::new("run", "()V")
                .flags(MethodAccessFlags::PUBLIC | MethodAccessFlags::ABSTRACT)
                .annotation(TASK_MARKER),
        )?;
        assert!(matches!(
            wrap_method(&mut class, &method, &FacadeBinding::default()),
            Err(Error::MissingCode(_))
        ));
        Ok(())
    }

    #[test]
    fn second_wrap_is_skipped() -> Result<()> {
        let (mut class, method) = single(
            MethodBuilder::new("run", "()V")
                .annotation(TASK_MARKER)
                .body(0, 1, vec![0xB1]),
        )?;
        wrap_method(&mut class, &method, &FacadeBinding::default())?;
        let wrapper = MethodDescriptor::from_class(&class, 1)?;
        assert_eq!(
            wrap_method(&mut class, &wrapper, &FacadeBinding::default())?,
            WrapOutcome::AlreadyWrapped
        );
        assert_eq!(class.methods.len(), 2);
        Ok(())
    }
}
