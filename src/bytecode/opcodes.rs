//! JVM opcode table (JVMS §6.5).
//!
//! [`OPCODES`] is indexed by opcode byte and describes every defined instruction from `nop`
//! (`0x00`) to `jsr_w` (`0xC9`) with its mnemonic and operand encoding. The named constants
//! below cover the instructions the engine emits.

/// How the operand bytes following an opcode are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandType {
    /// No operand
    None,
    /// Signed byte immediate (`bipush`)
    Byte,
    /// Signed short immediate (`sipush`)
    Short,
    /// Unsigned byte local index, widened by `wide`
    Local,
    /// Unsigned byte constant pool index (`ldc`)
    ConstantU8,
    /// Unsigned short constant pool index
    Constant,
    /// Signed 16-bit branch offset
    Branch,
    /// Signed 32-bit branch offset (`goto_w`, `jsr_w`)
    BranchWide,
    /// Local index and signed increment (`iinc`)
    Increment,
    /// Constant pool index, argument count and a zero byte (`invokeinterface`)
    InvokeInterface,
    /// Constant pool index and two zero bytes (`invokedynamic`)
    InvokeDynamic,
    /// Primitive array type code (`newarray`)
    ArrayType,
    /// Constant pool index and dimension count (`multianewarray`)
    MultiArray,
    /// `tableswitch` with padding, default, low, high and jump offsets
    TableSwitch,
    /// `lookupswitch` with padding, default and match/offset pairs
    LookupSwitch,
    /// The `wide` prefix
    Wide,
}

/// Static description of one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    /// Instruction mnemonic as printed by `javap`
    pub mnemonic: &'static str,
    /// Operand encoding
    pub operand: OperandType,
}

const fn op(mnemonic: &'static str, operand: OperandType) -> Opcode {
    Opcode { mnemonic, operand }
}

const fn simple(mnemonic: &'static str) -> Opcode {
    op(mnemonic, OperandType::None)
}

use OperandType::{
    ArrayType, Branch, BranchWide, Byte, Constant, ConstantU8, Increment, InvokeDynamic,
    InvokeInterface, Local, LookupSwitch, MultiArray, Short, TableSwitch, Wide,
};

/// All defined opcodes, indexed by opcode byte.
pub static OPCODES: [Opcode; 202] = [
    simple("nop"),
    simple("aconst_null"),
    simple("iconst_m1"),
    simple("iconst_0"),
    simple("iconst_1"),
    simple("iconst_2"),
    simple("iconst_3"),
    simple("iconst_4"),
    simple("iconst_5"),
    simple("lconst_0"),
    simple("lconst_1"),
    simple("fconst_0"),
    simple("fconst_1"),
    simple("fconst_2"),
    simple("dconst_0"),
    simple("dconst_1"),
    // 0x10
    op("bipush", Byte),
    op("sipush", Short),
    op("ldc", ConstantU8),
    op("ldc_w", Constant),
    op("ldc2_w", Constant),
    op("iload", Local),
    op("lload", Local),
    op("fload", Local),
    op("dload", Local),
    op("aload", Local),
    simple("iload_0"),
    simple("iload_1"),
    simple("iload_2"),
    simple("iload_3"),
    simple("lload_0"),
    simple("lload_1"),
    // 0x20
    simple("lload_2"),
    simple("lload_3"),
    simple("fload_0"),
    simple("fload_1"),
    simple("fload_2"),
    simple("fload_3"),
    simple("dload_0"),
    simple("dload_1"),
    simple("dload_2"),
    simple("dload_3"),
    simple("aload_0"),
    simple("aload_1"),
    simple("aload_2"),
    simple("aload_3"),
    simple("iaload"),
    simple("laload"),
    // 0x30
    simple("faload"),
    simple("daload"),
    simple("aaload"),
    simple("baload"),
    simple("caload"),
    simple("saload"),
    op("istore", Local),
    op("lstore", Local),
    op("fstore", Local),
    op("dstore", Local),
    op("astore", Local),
    simple("istore_0"),
    simple("istore_1"),
    simple("istore_2"),
    simple("istore_3"),
    simple("lstore_0"),
    // 0x40
    simple("lstore_1"),
    simple("lstore_2"),
    simple("lstore_3"),
    simple("fstore_0"),
    simple("fstore_1"),
    simple("fstore_2"),
    simple("fstore_3"),
    simple("dstore_0"),
    simple("dstore_1"),
    simple("dstore_2"),
    simple("dstore_3"),
    simple("astore_0"),
    simple("astore_1"),
    simple("astore_2"),
    simple("astore_3"),
    simple("iastore"),
    // 0x50
    simple("lastore"),
    simple("fastore"),
    simple("dastore"),
    simple("aastore"),
    simple("bastore"),
    simple("castore"),
    simple("sastore"),
    simple("pop"),
    simple("pop2"),
    simple("dup"),
    simple("dup_x1"),
    simple("dup_x2"),
    simple("dup2"),
    simple("dup2_x1"),
    simple("dup2_x2"),
    simple("swap"),
    // 0x60
    simple("iadd"),
    simple("ladd"),
    simple("fadd"),
    simple("dadd"),
    simple("isub"),
    simple("lsub"),
    simple("fsub"),
    simple("dsub"),
    simple("imul"),
    simple("lmul"),
    simple("fmul"),
    simple("dmul"),
    simple("idiv"),
    simple("ldiv"),
    simple("fdiv"),
    simple("ddiv"),
    // 0x70
    simple("irem"),
    simple("lrem"),
    simple("frem"),
    simple("drem"),
    simple("ineg"),
    simple("lneg"),
    simple("fneg"),
    simple("dneg"),
    simple("ishl"),
    simple("lshl"),
    simple("ishr"),
    simple("lshr"),
    simple("iushr"),
    simple("lushr"),
    simple("iand"),
    simple("land"),
    // 0x80
    simple("ior"),
    simple("lor"),
    simple("ixor"),
    simple("lxor"),
    op("iinc", Increment),
    simple("i2l"),
    simple("i2f"),
    simple("i2d"),
    simple("l2i"),
    simple("l2f"),
    simple("l2d"),
    simple("f2i"),
    simple("f2l"),
    simple("f2d"),
    simple("d2i"),
    simple("d2l"),
    // 0x90
    simple("d2f"),
    simple("i2b"),
    simple("i2c"),
    simple("i2s"),
    simple("lcmp"),
    simple("fcmpl"),
    simple("fcmpg"),
    simple("dcmpl"),
    simple("dcmpg"),
    op("ifeq", Branch),
    op("ifne", Branch),
    op("iflt", Branch),
    op("ifge", Branch),
    op("ifgt", Branch),
    op("ifle", Branch),
    op("if_icmpeq", Branch),
    // 0xA0
    op("if_icmpne", Branch),
    op("if_icmplt", Branch),
    op("if_icmpge", Branch),
    op("if_icmpgt", Branch),
    op("if_icmple", Branch),
    op("if_acmpeq", Branch),
    op("if_acmpne", Branch),
    op("goto", Branch),
    op("jsr", Branch),
    op("ret", Local),
    op("tableswitch", TableSwitch),
    op("lookupswitch", LookupSwitch),
    simple("ireturn"),
    simple("lreturn"),
    simple("freturn"),
    simple("dreturn"),
    // 0xB0
    simple("areturn"),
    simple("return"),
    op("getstatic", Constant),
    op("putstatic", Constant),
    op("getfield", Constant),
    op("putfield", Constant),
    op("invokevirtual", Constant),
    op("invokespecial", Constant),
    op("invokestatic", Constant),
    op("invokeinterface", InvokeInterface),
    op("invokedynamic", InvokeDynamic),
    op("new", Constant),
    op("newarray", ArrayType),
    op("anewarray", Constant),
    simple("arraylength"),
    simple("athrow"),
    // 0xC0
    op("checkcast", Constant),
    op("instanceof", Constant),
    simple("monitorenter"),
    simple("monitorexit"),
    op("wide", Wide),
    op("multianewarray", MultiArray),
    op("ifnull", Branch),
    op("ifnonnull", Branch),
    op("goto_w", BranchWide),
    op("jsr_w", BranchWide),
];

/// Look up an opcode byte.
#[must_use]
pub fn opcode(byte: u8) -> Option<&'static Opcode> {
    OPCODES.get(usize::from(byte))
}

#[allow(missing_docs)]
pub const NOP: u8 = 0x00;
#[allow(missing_docs)]
pub const ACONST_NULL: u8 = 0x01;
#[allow(missing_docs)]
pub const ICONST_M1: u8 = 0x02;
#[allow(missing_docs)]
pub const ICONST_0: u8 = 0x03;
#[allow(missing_docs)]
pub const BIPUSH: u8 = 0x10;
#[allow(missing_docs)]
pub const SIPUSH: u8 = 0x11;
#[allow(missing_docs)]
pub const LDC: u8 = 0x12;
#[allow(missing_docs)]
pub const LDC_W: u8 = 0x13;
#[allow(missing_docs)]
pub const ILOAD: u8 = 0x15;
#[allow(missing_docs)]
pub const ILOAD_0: u8 = 0x1A;
#[allow(missing_docs)]
pub const ISTORE: u8 = 0x36;
#[allow(missing_docs)]
pub const ISTORE_0: u8 = 0x3B;
#[allow(missing_docs)]
pub const AASTORE: u8 = 0x53;
#[allow(missing_docs)]
pub const DUP: u8 = 0x59;
#[allow(missing_docs)]
pub const IRETURN: u8 = 0xAC;
#[allow(missing_docs)]
pub const RETURN: u8 = 0xB1;
#[allow(missing_docs)]
pub const GETSTATIC: u8 = 0xB2;
#[allow(missing_docs)]
pub const PUTSTATIC: u8 = 0xB3;
#[allow(missing_docs)]
pub const INVOKEVIRTUAL: u8 = 0xB6;
#[allow(missing_docs)]
pub const INVOKESPECIAL: u8 = 0xB7;
#[allow(missing_docs)]
pub const INVOKESTATIC: u8 = 0xB8;
#[allow(missing_docs)]
pub const ANEWARRAY: u8 = 0xBD;
#[allow(missing_docs)]
pub const ATHROW: u8 = 0xBF;
#[allow(missing_docs)]
pub const WIDE: u8 = 0xC4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_constants() {
        let expected = [
            (NOP, "nop"),
            (ACONST_NULL, "aconst_null"),
            (ICONST_0, "iconst_0"),
            (LDC_W, "ldc_w"),
            (ILOAD_0, "iload_0"),
            (ISTORE_0, "istore_0"),
            (AASTORE, "aastore"),
            (DUP, "dup"),
            (IRETURN, "ireturn"),
            (RETURN, "return"),
            (GETSTATIC, "getstatic"),
            (PUTSTATIC, "putstatic"),
            (INVOKEVIRTUAL, "invokevirtual"),
            (INVOKESPECIAL, "invokespecial"),
            (INVOKESTATIC, "invokestatic"),
            (ANEWARRAY, "anewarray"),
            (ATHROW, "athrow"),
            (WIDE, "wide"),
            (0xC9, "jsr_w"),
        ];
        for (byte, mnemonic) in expected {
            assert_eq!(opcode(byte).map(|o| o.mnemonic), Some(mnemonic));
        }
    }

    #[test]
    fn undefined_opcodes() {
        assert!(opcode(0xCA).is_none());
        assert!(opcode(0xFF).is_none());
    }
}
