//! Fluent bytecode assembler with operand stack tracking.
//!
//! [`CodeAssembler`] emits straight-line JVM bytecode, interning constants in the class's pool as
//! it goes and tracking the operand stack depth in slots after every instruction. The maximum
//! depth observed becomes the method's `max_stack`, so generated code never needs a separate
//! analysis pass.
//!
//! # Examples
//!
//! ```rust
//! use probeweave::{bytecode::CodeAssembler, classfile::ConstantPool};
//!
//! let mut pool = ConstantPool::new();
//! let mut asm = CodeAssembler::new(&mut pool);
//! asm.getstatic("java/lang/System", "out", "Ljava/io/PrintStream;")?
//!     .ldc_string("hello")?
//!     .invokevirtual("java/io/PrintStream", "println", "(Ljava/lang/String;)V")?
//!     .return_value(None)?;
//!
//! let (code, max_stack) = asm.finish()?;
//! assert_eq!(max_stack, 2);
//! assert_eq!(code.len(), 9);
//! # Ok::<(), probeweave::Error>(())
//! ```

use crate::{
    bytecode::opcodes::{
        AASTORE, ACONST_NULL, ANEWARRAY, ATHROW, BIPUSH, DUP, GETSTATIC, ICONST_0, ILOAD,
        ILOAD_0, INVOKESPECIAL, INVOKESTATIC, INVOKEVIRTUAL, IRETURN, ISTORE, ISTORE_0, LDC,
        LDC_W, NOP, PUTSTATIC, RETURN, SIPUSH, WIDE,
    },
    classfile::{
        attributes::MAX_CODE_LENGTH,
        constpool::{Constant, ConstantPool},
        descriptor::{FieldType, MethodType},
    },
    Error, Result,
};

/// Typed instruction family offset: `i`, `l`, `f`, `d`, `a` variants are consecutive.
fn type_offset(field: &FieldType) -> u8 {
    match field {
        FieldType::Boolean
        | FieldType::Byte
        | FieldType::Char
        | FieldType::Short
        | FieldType::Int => 0,
        FieldType::Long => 1,
        FieldType::Float => 2,
        FieldType::Double => 3,
        FieldType::Object(_) | FieldType::Array(_) => 4,
    }
}

/// Assembler for a single method body.
pub struct CodeAssembler<'p> {
    pool: &'p mut ConstantPool,
    code: Vec<u8>,
    depth: u16,
    max_depth: u16,
}

impl<'p> CodeAssembler<'p> {
    /// Creates an assembler that interns constants in `pool`.
    #[must_use]
    pub fn new(pool: &'p mut ConstantPool) -> Self {
        CodeAssembler {
            pool,
            code: Vec::with_capacity(64),
            depth: 0,
            max_depth: 0,
        }
    }

    /// Current code offset.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::CodeTooLarge`] once the code no longer fits a `u16` offset.
    pub fn position(&self) -> Result<u16> {
        u16::try_from(self.code.len())
            .map_err(|_| Error::CodeTooLarge(format!("{} bytes", self.code.len())))
    }

    /// Current operand stack depth in slots.
    #[must_use]
    pub fn stack_depth(&self) -> u16 {
        self.depth
    }

    /// Reset the tracked stack depth, e.g. to 1 at the start of an exception handler.
    pub fn set_stack_depth(&mut self, depth: u16) -> &mut Self {
        self.depth = depth;
        self.max_depth = self.max_depth.max(depth);
        self
    }

    fn pop(&mut self, slots: u16) -> Result<()> {
        self.depth = self.depth.checked_sub(slots).ok_or_else(|| {
            malformed_error!(
                "Operand stack underflow at offset {}: need {} slots, have {}",
                self.code.len(),
                slots,
                self.depth
            )
        })?;
        Ok(())
    }

    fn push(&mut self, slots: u16) {
        self.depth += slots;
        self.max_depth = self.max_depth.max(self.depth);
    }

    fn emit(&mut self, bytes: &[u8]) {
        self.code.extend_from_slice(bytes);
    }

    fn emit_u16(&mut self, opcode: u8, operand: u16) {
        let [high, low] = operand.to_be_bytes();
        self.emit(&[opcode, high, low]);
    }

    /// `nop`
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches the other fluent methods.
    pub fn nop(&mut self) -> Result<&mut Self> {
        self.emit(&[NOP]);
        Ok(self)
    }

    /// `aconst_null`
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches the other fluent methods.
    pub fn aconst_null(&mut self) -> Result<&mut Self> {
        self.emit(&[ACONST_NULL]);
        self.push(1);
        Ok(self)
    }

    /// Push an `int` constant using the shortest encoding.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ConstantPoolOverflow`] if a pool constant is needed but the
    /// pool is full.
    pub fn push_int(&mut self, value: i32) -> Result<&mut Self> {
        match value {
            -1..=5 => self.emit(&[(i32::from(ICONST_0) + value) as u8]),
            -128..=127 => self.emit(&[BIPUSH, value as i8 as u8]),
            -32768..=32767 => {
                let [high, low] = (value as i16).to_be_bytes();
                self.emit(&[SIPUSH, high, low]);
            }
            _ => {
                let index = self.pool.find_or_add(Constant::Integer(value))?;
                return self.ldc_index(index);
            }
        }
        self.push(1);
        Ok(self)
    }

    /// Push a `String` constant.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ConstantPoolOverflow`] if the string cannot be interned.
    pub fn ldc_string(&mut self, value: &str) -> Result<&mut Self> {
        let index = self.pool.string_index(value)?;
        self.ldc_index(index)
    }

    fn ldc_index(&mut self, index: u16) -> Result<&mut Self> {
        match u8::try_from(index) {
            Ok(short) => self.emit(&[LDC, short]),
            Err(_) => self.emit_u16(LDC_W, index),
        }
        self.push(1);
        Ok(self)
    }

    fn local_instruction(&mut self, base: u8, short_base: u8, field: &FieldType, slot: u16) {
        let offset = type_offset(field);
        match slot {
            0..=3 => self.emit(&[short_base + offset * 4 + slot as u8]),
            4..=255 => self.emit(&[base + offset, slot as u8]),
            _ => {
                let [high, low] = slot.to_be_bytes();
                self.emit(&[WIDE, base + offset, high, low]);
            }
        }
    }

    /// Load a local of the given type (`iload`, `lload`, `fload`, `dload`, `aload`).
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches the other fluent methods.
    pub fn load(&mut self, field: &FieldType, slot: u16) -> Result<&mut Self> {
        self.local_instruction(ILOAD, ILOAD_0, field, slot);
        self.push(field.slots());
        Ok(self)
    }

    /// Store into a local of the given type.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] on operand stack underflow.
    pub fn store(&mut self, field: &FieldType, slot: u16) -> Result<&mut Self> {
        self.pop(field.slots())?;
        self.local_instruction(ISTORE, ISTORE_0, field, slot);
        Ok(self)
    }

    /// `aload`
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches the other fluent methods.
    pub fn aload(&mut self, slot: u16) -> Result<&mut Self> {
        self.load(&FieldType::Object(String::new()), slot)
    }

    /// `astore`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] on operand stack underflow.
    pub fn astore(&mut self, slot: u16) -> Result<&mut Self> {
        self.store(&FieldType::Object(String::new()), slot)
    }

    /// `dup`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] on an empty stack.
    pub fn dup(&mut self) -> Result<&mut Self> {
        self.pop(1)?;
        self.emit(&[DUP]);
        self.push(2);
        Ok(self)
    }

    /// `anewarray` of the given component class.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] on underflow and
    /// [`crate::Error::ConstantPoolOverflow`] if the class cannot be interned.
    pub fn anewarray(&mut self, component: &str) -> Result<&mut Self> {
        let index = self.pool.class_index(component)?;
        self.pop(1)?;
        self.emit_u16(ANEWARRAY, index);
        self.push(1);
        Ok(self)
    }

    /// `aastore`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] on underflow.
    pub fn aastore(&mut self) -> Result<&mut Self> {
        self.pop(3)?;
        self.emit(&[AASTORE]);
        Ok(self)
    }

    /// `getstatic`
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid descriptor or a full pool.
    pub fn getstatic(&mut self, owner: &str, name: &str, descriptor: &str) -> Result<&mut Self> {
        let field = FieldType::parse(descriptor)?;
        let index = self.pool.field_ref_index(owner, name, descriptor)?;
        self.emit_u16(GETSTATIC, index);
        self.push(field.slots());
        Ok(self)
    }

    /// `putstatic`
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid descriptor, a full pool or a stack underflow.
    pub fn putstatic(&mut self, owner: &str, name: &str, descriptor: &str) -> Result<&mut Self> {
        let field = FieldType::parse(descriptor)?;
        let index = self.pool.field_ref_index(owner, name, descriptor)?;
        self.pop(field.slots())?;
        self.emit_u16(PUTSTATIC, index);
        Ok(self)
    }

    fn invoke(
        &mut self,
        opcode: u8,
        owner: &str,
        name: &str,
        descriptor: &str,
        interface: bool,
    ) -> Result<&mut Self> {
        let method = MethodType::parse(descriptor)?;
        let index = self
            .pool
            .method_ref_index(owner, name, descriptor, interface)?;
        let receiver = u16::from(opcode != INVOKESTATIC);
        self.pop(method.param_slots() + receiver)?;
        self.emit_u16(opcode, index);
        self.push(method.return_slots());
        Ok(self)
    }

    /// `invokestatic`, using an interface method ref when `interface` is set.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid descriptor, a full pool or a stack underflow.
    pub fn invokestatic(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
        interface: bool,
    ) -> Result<&mut Self> {
        self.invoke(INVOKESTATIC, owner, name, descriptor, interface)
    }

    /// `invokespecial`, using an interface method ref when `interface` is set.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid descriptor, a full pool or a stack underflow.
    pub fn invokespecial(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
        interface: bool,
    ) -> Result<&mut Self> {
        self.invoke(INVOKESPECIAL, owner, name, descriptor, interface)
    }

    /// `invokevirtual`
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid descriptor, a full pool or a stack underflow.
    pub fn invokevirtual(&mut self, owner: &str, name: &str, descriptor: &str) -> Result<&mut Self> {
        self.invoke(INVOKEVIRTUAL, owner, name, descriptor, false)
    }

    /// Typed return: `ireturn` .. `areturn`, or `return` for `None`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] on underflow.
    pub fn return_value(&mut self, ret: Option<&FieldType>) -> Result<&mut Self> {
        match ret {
            Some(field) => {
                self.pop(field.slots())?;
                self.emit(&[IRETURN + type_offset(field)]);
            }
            None => self.emit(&[RETURN]),
        }
        Ok(self)
    }

    /// `athrow`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] on an empty stack.
    pub fn athrow(&mut self) -> Result<&mut Self> {
        self.pop(1)?;
        self.emit(&[ATHROW]);
        Ok(self)
    }

    /// Finish assembly and return the code with its `max_stack`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::CodeTooLarge`] if the code is empty or exceeds the limit.
    pub fn finish(self) -> Result<(Vec<u8>, u16)> {
        if self.code.is_empty() || self.code.len() > MAX_CODE_LENGTH {
            return Err(Error::CodeTooLarge(format!("{} bytes", self.code.len())));
        }
        Ok((self.code, self.max_depth))
    }
}
