//! ARM instruction decode: a 4096-entry dispatch table built once at
//! construction.
//!
//! The table is indexed by the twelve bits that fully classify an ARM
//! instruction: word bits 27:20 concatenated with bits 7:4. Every entry is
//! a pre-decoded tag; per-instruction fields (registers, immediates) are
//! cheap to extract from the word at execute time, so they stay out of the
//! table. Encodings the ARMv4 architecture reserves, and the coprocessor
//! space (this core has no coprocessors), route to the undefined handler;
//! the guest sees them as the undefined-instruction exception.

use crate::alu::AluOp;

/// Second operand form of a data-processing instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operand2 {
    /// Register shifted by a 5-bit immediate.
    ShiftImm,
    /// Register shifted by the low byte of another register.
    ShiftReg,
    /// 8-bit immediate rotated right by twice a 4-bit field.
    RotImm,
}

/// Width/signedness of the halfword-and-signed transfer group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HalfKind {
    Half,
    SignedByte,
    SignedHalf,
}

/// A decoded ARM instruction class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArmOp {
    DataProc {
        op: AluOp,
        set_flags: bool,
        operand: Operand2,
    },
    /// MRS: status register to general register.
    Mrs { spsr: bool },
    /// MSR from a register.
    MsrReg { spsr: bool },
    /// MSR from a rotated immediate.
    MsrImm { spsr: bool },
    Multiply {
        accumulate: bool,
        set_flags: bool,
    },
    MultiplyLong {
        signed: bool,
        accumulate: bool,
        set_flags: bool,
    },
    Swap { byte: bool },
    BranchExchange,
    Branch { link: bool },
    SingleTransfer {
        load: bool,
        byte: bool,
        pre: bool,
        up: bool,
        writeback: bool,
        reg_offset: bool,
    },
    HalfTransfer {
        load: bool,
        pre: bool,
        up: bool,
        writeback: bool,
        imm_offset: bool,
        kind: HalfKind,
    },
    BlockTransfer {
        load: bool,
        pre: bool,
        up: bool,
        writeback: bool,
        user_bank: bool,
    },
    SoftwareInterrupt,
    Undefined,
}

/// Table index for an instruction word: bits 27:20 ++ bits 7:4.
pub(crate) fn arm_index(word: u32) -> usize {
    (((word >> 16) & 0xFF0) | ((word >> 4) & 0xF)) as usize
}

/// Build the 4096-entry dispatch table.
pub(crate) fn build_arm_table() -> Box<[ArmOp; 4096]> {
    let mut table = Vec::with_capacity(4096);
    for index in 0..4096u32 {
        table.push(decode(index));
    }
    match table.into_boxed_slice().try_into() {
        Ok(boxed) => boxed,
        Err(_) => unreachable!("table has exactly 4096 entries"),
    }
}

/// Decode one index. `hi` mirrors word bits 27:20, `lo` bits 7:4.
fn decode(index: u32) -> ArmOp {
    let hi = (index >> 4) & 0xFF;
    let lo = index & 0xF;

    // Branches: 101L.
    if hi & 0xE0 == 0xA0 {
        return ArmOp::Branch { link: hi & 0x10 != 0 };
    }

    // Block transfers: 100P USWL.
    if hi & 0xE0 == 0x80 {
        return ArmOp::BlockTransfer {
            load: hi & 0x01 != 0,
            pre: hi & 0x10 != 0,
            up: hi & 0x08 != 0,
            user_bank: hi & 0x04 != 0,
            writeback: hi & 0x02 != 0,
        };
    }

    // Single transfers: 01IP UBWL. The register-offset form with bit 4 set
    // is the architected undefined space.
    if hi & 0xC0 == 0x40 {
        let reg_offset = hi & 0x20 != 0;
        if reg_offset && lo & 1 != 0 {
            return ArmOp::Undefined;
        }
        return ArmOp::SingleTransfer {
            load: hi & 0x01 != 0,
            byte: hi & 0x04 != 0,
            pre: hi & 0x10 != 0,
            up: hi & 0x08 != 0,
            writeback: hi & 0x02 != 0,
            reg_offset,
        };
    }

    // Software interrupt: 1111 xxxx.
    if hi & 0xF0 == 0xF0 {
        return ArmOp::SoftwareInterrupt;
    }

    // Remaining 11xx space is coprocessor traffic; no coprocessors here.
    if hi & 0xC0 == 0xC0 {
        return ArmOp::Undefined;
    }

    // From here on: 00xx, the data-processing region with its carve-outs.
    debug_assert!(hi & 0xC0 == 0);

    // Multiply, multiply-long and swap share the 1001 column.
    if lo == 0b1001 {
        if hi & 0xFC == 0x00 {
            return ArmOp::Multiply {
                accumulate: hi & 0x02 != 0,
                set_flags: hi & 0x01 != 0,
            };
        }
        if hi & 0xF8 == 0x08 {
            return ArmOp::MultiplyLong {
                signed: hi & 0x04 != 0,
                accumulate: hi & 0x02 != 0,
                set_flags: hi & 0x01 != 0,
            };
        }
        if hi & 0xFB == 0x10 {
            return ArmOp::Swap { byte: hi & 0x04 != 0 };
        }
        return ArmOp::Undefined;
    }

    // Halfword and signed transfers: bit 7 and bit 4 set, SH nonzero.
    if lo & 0b1001 == 0b1001 {
        let kind = match (lo >> 1) & 0b11 {
            0b01 => HalfKind::Half,
            0b10 => HalfKind::SignedByte,
            0b11 => HalfKind::SignedHalf,
            _ => unreachable!("SH == 00 is the multiply column"),
        };
        let load = hi & 0x01 != 0;
        // Signed stores do not exist.
        if !load && kind != HalfKind::Half {
            return ArmOp::Undefined;
        }
        // Register-offset form with the 22 bit clear, immediate with it set.
        return ArmOp::HalfTransfer {
            load,
            pre: hi & 0x10 != 0,
            up: hi & 0x08 != 0,
            imm_offset: hi & 0x04 != 0,
            writeback: hi & 0x02 != 0,
            kind,
        };
    }

    let immediate = hi & 0x20 != 0;
    let opcode = (hi >> 1) & 0xF;
    let set_flags = hi & 0x01 != 0;

    // Test/compare opcodes without S are the PSR-transfer escape hatch.
    if (0x8..=0xB).contains(&opcode) && !set_flags {
        if immediate {
            // Only MSR has an immediate form here.
            if hi & 0xFB == 0x32 {
                return ArmOp::MsrImm { spsr: hi & 0x04 != 0 };
            }
            return ArmOp::Undefined;
        }
        if hi & 0xFB == 0x10 && lo == 0 {
            return ArmOp::Mrs { spsr: hi & 0x04 != 0 };
        }
        if hi & 0xFB == 0x12 && lo == 0 {
            return ArmOp::MsrReg { spsr: hi & 0x04 != 0 };
        }
        if hi == 0x12 && lo == 0b0001 {
            return ArmOp::BranchExchange;
        }
        return ArmOp::Undefined;
    }

    let operand = if immediate {
        Operand2::RotImm
    } else if lo & 1 == 0 {
        Operand2::ShiftImm
    } else {
        Operand2::ShiftReg
    };
    ArmOp::DataProc {
        op: AluOp::from_bits(opcode),
        set_flags,
        operand,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_word(word: u32) -> ArmOp {
        decode(arm_index(word) as u32)
    }

    #[test]
    fn index_extraction() {
        // Bits 27:20 land in index bits 11:4, bits 7:4 in index bits 3:0.
        assert_eq!(arm_index(0xE1A0_0000), 0x1A0); // MOV r0, r0
        assert_eq!(arm_index(0x0FF0_00F0), 0xFFF);
    }

    #[test]
    fn data_processing_forms() {
        // MOV r0, r1
        assert_eq!(
            decode_word(0xE1A0_0001),
            ArmOp::DataProc { op: AluOp::Mov, set_flags: false, operand: Operand2::ShiftImm }
        );
        // ADDS r0, r1, r2, LSL r3
        assert_eq!(
            decode_word(0xE091_0312),
            ArmOp::DataProc { op: AluOp::Add, set_flags: true, operand: Operand2::ShiftReg }
        );
        // SUBS r0, r0, #1
        assert_eq!(
            decode_word(0xE250_0001),
            ArmOp::DataProc { op: AluOp::Sub, set_flags: true, operand: Operand2::RotImm }
        );
    }

    #[test]
    fn psr_transfers_are_carved_out_of_tst_teq() {
        // MRS r0, cpsr
        assert_eq!(decode_word(0xE10F_0000), ArmOp::Mrs { spsr: false });
        // MRS r0, spsr
        assert_eq!(decode_word(0xE14F_0000), ArmOp::Mrs { spsr: true });
        // MSR cpsr_f, r0
        assert_eq!(decode_word(0xE128_F000), ArmOp::MsrReg { spsr: false });
        // MSR cpsr_f, #0xF0000000
        assert_eq!(decode_word(0xE328_F4F0), ArmOp::MsrImm { spsr: false });
        // TST with S still decodes as TST.
        assert_eq!(
            decode_word(0xE111_0002),
            ArmOp::DataProc { op: AluOp::Tst, set_flags: true, operand: Operand2::ShiftImm }
        );
    }

    #[test]
    fn multiply_column() {
        // MUL r0, r1, r2
        assert_eq!(
            decode_word(0xE000_0291),
            ArmOp::Multiply { accumulate: false, set_flags: false }
        );
        // MLAS r0, r1, r2, r3
        assert_eq!(
            decode_word(0xE033_0291),
            ArmOp::Multiply { accumulate: true, set_flags: true }
        );
        // UMULL r0, r1, r2, r3
        assert_eq!(
            decode_word(0xE081_0392),
            ArmOp::MultiplyLong { signed: false, accumulate: false, set_flags: false }
        );
        // SMLAL r0, r1, r2, r3
        assert_eq!(
            decode_word(0xE0E1_0392),
            ArmOp::MultiplyLong { signed: true, accumulate: true, set_flags: false }
        );
        // SWP r0, r1, [r2]
        assert_eq!(decode_word(0xE102_0091), ArmOp::Swap { byte: false });
        // SWPB
        assert_eq!(decode_word(0xE142_0091), ArmOp::Swap { byte: true });
    }

    #[test]
    fn branch_exchange() {
        // BX r0
        assert_eq!(decode_word(0xE12F_FF10), ArmOp::BranchExchange);
    }

    #[test]
    fn transfers() {
        // LDR r0, [r1, #4]
        assert_eq!(
            decode_word(0xE591_0004),
            ArmOp::SingleTransfer {
                load: true, byte: false, pre: true, up: true,
                writeback: false, reg_offset: false
            }
        );
        // STRB r0, [r1], -r2
        assert_eq!(
            decode_word(0xE641_0002),
            ArmOp::SingleTransfer {
                load: false, byte: true, pre: false, up: false,
                writeback: false, reg_offset: true
            }
        );
        // LDRH r0, [r1, #2]
        assert_eq!(
            decode_word(0xE1D1_00B2),
            ArmOp::HalfTransfer {
                load: true, pre: true, up: true, writeback: false,
                imm_offset: true, kind: HalfKind::Half
            }
        );
        // LDRSB r0, [r1]
        assert_eq!(
            decode_word(0xE1D1_00D0),
            ArmOp::HalfTransfer {
                load: true, pre: true, up: true, writeback: false,
                imm_offset: true, kind: HalfKind::SignedByte
            }
        );
        // Signed store is reserved.
        assert_eq!(decode_word(0xE1C1_00D0), ArmOp::Undefined);
        // STMDB r13!, {..}
        assert_eq!(
            decode_word(0xE92D_4000),
            ArmOp::BlockTransfer {
                load: false, pre: true, up: false, writeback: true, user_bank: false
            }
        );
    }

    #[test]
    fn branches_and_swi() {
        assert_eq!(decode_word(0xEA00_0000), ArmOp::Branch { link: false });
        assert_eq!(decode_word(0xEB00_0000), ArmOp::Branch { link: true });
        assert_eq!(decode_word(0xEF00_0000), ArmOp::SoftwareInterrupt);
    }

    #[test]
    fn reserved_space_is_undefined() {
        // Register-offset transfer with bit 4 set: architected undefined.
        assert_eq!(decode_word(0xE7F0_00F0), ArmOp::Undefined);
        // Coprocessor space.
        assert_eq!(decode_word(0xEE00_0000), ArmOp::Undefined);
        assert_eq!(decode_word(0xEC00_0000), ArmOp::Undefined);
    }

    #[test]
    fn every_slot_is_assigned() {
        // The generator is total by construction; make sure it stays so.
        let table = build_arm_table();
        assert_eq!(table.len(), 4096);
    }
}
