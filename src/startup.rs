//! MSC startup simulation: replaces crt0 + `__astart` so the first
//! translated game function observes the same DS/SS/SP, initialized
//! data, zeroed BSS, and argument frame the original runtime produced.

use crate::cpu::Cpu;
use crate::memory::Memory;

/// Segment the MZ loader places the resident image at (DOS loader
/// convention: immediately above a 16-byte PSP at `LOAD_SEG - 0x10`).
pub const LOAD_SEG: u16 = 0x0100;

/// Authoritative constants resolved from the Open Question in the design
/// notes: the source carried three drifted versions of these values; these
/// are the ones a faithful port uses.
pub const DS_OFFSET: u16 = 0x30C8;
pub const BSS_START: u16 = 0x64C2;
pub const BSS_END: u16 = 0xF7F0;
pub const INITIAL_SP: u16 = 0xFFEE;
pub const DATA_COPY_SIZE: usize = 0x14E9;
pub const DATA_COPY_SRC_OFFSET: u16 = 0x2A10;

/// Conservative, write-only CRT state-latch addresses (Open Question
/// resolution in SPEC_FULL.md §9): never read back by translated code.
const CRT_STACK_TOP_OFFSET: u16 = 0x0002;
const CRT_STACK_BOTTOM_OFFSET: u16 = 0x0004;
const CRT_SAVED_DS_OFFSET: u16 = 0x0006;

/// Runs the eight-step MSC startup sequence and returns control at the
/// point the translated entry point would be invoked. The caller is
/// responsible for invoking that entry point and then observing
/// `cpu.halted`; this function does not call into translated code itself
/// since that is the out-of-scope static translator's concern.
pub fn run_msc_startup(cpu: &mut Cpu, mem: &mut Memory) {
    // 1. DGROUP model: DS = ES = SS colocated, SP at the established top.
    let ds = LOAD_SEG + DS_OFFSET;
    cpu.ds = ds;
    cpu.es = ds;
    cpu.ss = ds;
    cpu.sp = INITIAL_SP;

    // 2. Data copy: crt0 init-data block -> DS:0.
    mem.copy(
        LOAD_SEG + DATA_COPY_SRC_OFFSET,
        0,
        ds,
        0,
        DATA_COPY_SIZE,
    );

    // 3. BSS clear: zero DS:[BSS_START..BSS_END).
    let bss_len = (BSS_END - BSS_START) as usize;
    mem.zero(ds, BSS_START, bss_len);

    // 4. CRT state latching.
    mem.write16(ds, CRT_STACK_TOP_OFFSET, cpu.sp);
    mem.write16(ds, CRT_STACK_BOTTOM_OFFSET, cpu.sp);
    mem.write16(ds, CRT_SAVED_DS_OFFSET, ds);

    // 5. BP = 0 (xor bp, bp).
    cpu.bp = 0;

    // 6. Push argc=0, argv=0, envp=0 for the translated main()'s frame.
    cpu.push16(mem, 0);
    cpu.push16(mem, 0);
    cpu.push16(mem, 0);

    // 7/8 (entry invocation and halted-on-return) are the caller's
    // responsibility — see `run_msc_startup`'s doc comment.
}
