//! End-to-end scenarios exercising the public API across module
//! boundaries, one per lettered scenario in the testable-properties
//! section of the design documents.

use civ_recomp_core::cpu::Cpu;
use civ_recomp_core::dos::{self, DosState};
use civ_recomp_core::memory::Memory;

fn fresh(game_dir: &str) -> (Cpu, Memory, DosState) {
    (Cpu::new(), Memory::new(), DosState::new(game_dir))
}

/// A. Boot-and-exit: AH=30h then AH=4Ch, AL=7.
#[test]
fn scenario_a_boot_and_exit() {
    let (mut cpu, mut mem, mut ds) = fresh(".");

    cpu.ax.set_high(0x30);
    dos::int21(&mut cpu, &mut mem, &mut ds);
    assert_eq!(cpu.ax.get(), 0x0005);

    cpu.ax.set_high(0x4C);
    cpu.ax.set_low(7);
    dos::int21(&mut cpu, &mut mem, &mut ds);
    assert!(cpu.halted);
}

/// B. Keyboard echo: push ('a' at 0x1E), ('s' at 0x1F); getch twice.
#[test]
fn scenario_b_keyboard_echo() {
    let (_cpu, _mem, mut ds) = fresh(".");
    ds.keyboard.push(0x1E, b'a');
    ds.keyboard.push(0x1F, b's');
    assert_eq!(ds.keyboard.getch(), b'a');
    assert_eq!(ds.keyboard.getch(), b's');
    assert!(!ds.keyboard.available());
}

/// C. Extended key: push up-arrow (0x48, ascii 0); getch twice.
#[test]
fn scenario_c_extended_key() {
    let (_cpu, _mem, mut ds) = fresh(".");
    ds.keyboard.push(0x48, 0x00);
    assert_eq!(ds.keyboard.getch(), 0);
    assert_eq!(ds.keyboard.getch(), 0x48);
}

/// D. Palette program: write-index 0x10, write R=63 G=0 B=0, read back.
#[test]
fn scenario_d_palette_program() {
    let (_cpu, _mem, mut ds) = fresh(".");
    ds.video.port_write(civ_recomp_core::video::DAC_WRITE_INDEX_PORT, 0x10);
    ds.video.port_write(civ_recomp_core::video::DAC_DATA_PORT, 63);
    ds.video.port_write(civ_recomp_core::video::DAC_DATA_PORT, 0);
    ds.video.port_write(civ_recomp_core::video::DAC_DATA_PORT, 0);
    assert!(ds.video.dirty);

    ds.video.port_write(civ_recomp_core::video::DAC_READ_INDEX_PORT, 0x10);
    let r = ds.video.port_read(civ_recomp_core::video::DAC_DATA_PORT);
    let g = ds.video.port_read(civ_recomp_core::video::DAC_DATA_PORT);
    let b = ds.video.port_read(civ_recomp_core::video::DAC_DATA_PORT);
    assert_eq!((r, g, b), (63, 0, 0));
}

/// E. File I/O: create, write 1024 bytes, close, open, read into a
/// different offset, compare.
#[test]
fn scenario_e_file_io_round_trip() {
    let dir = std::env::temp_dir().join(format!("civ-recomp-scenario-e-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let game_dir = dir.to_string_lossy().into_owned();

    let (mut cpu, mut mem, mut ds) = fresh(&game_dir);

    let pattern: Vec<u8> = (0..1024u32).map(|i| (i % 256) as u8).collect();
    let path_bytes = b"SAVE\\GAME.SAV\0";
    let src_off: u16 = 0x2000;
    for (i, &b) in path_bytes.iter().enumerate() {
        mem.write8(cpu.ds, src_off + i as u16, b);
    }
    let data_off: u16 = 0x3000;
    for (i, &b) in pattern.iter().enumerate() {
        mem.write8(cpu.ds, data_off + i as u16, b);
    }

    // create
    cpu.ax.set_high(0x3C);
    cpu.dx.set(src_off);
    dos::int21(&mut cpu, &mut mem, &mut ds);
    assert!(!cpu.flags.cf());
    let handle = cpu.ax.get();

    // write 1024 bytes
    cpu.ax.set_high(0x40);
    cpu.bx.set(handle);
    cpu.cx.set(1024);
    cpu.dx.set(data_off);
    dos::int21(&mut cpu, &mut mem, &mut ds);
    assert!(!cpu.flags.cf());
    assert_eq!(cpu.ax.get(), 1024);

    // close
    cpu.ax.set_high(0x3E);
    cpu.bx.set(handle);
    dos::int21(&mut cpu, &mut mem, &mut ds);
    assert!(!cpu.flags.cf());

    // open
    cpu.ax.set_high(0x3D);
    cpu.ax.set_low(0); // read mode
    cpu.dx.set(src_off);
    dos::int21(&mut cpu, &mut mem, &mut ds);
    assert!(!cpu.flags.cf());
    let read_handle = cpu.ax.get();

    // read into a different offset
    let dest_off: u16 = 0x5000;
    cpu.ax.set_high(0x3F);
    cpu.bx.set(read_handle);
    cpu.cx.set(1024);
    cpu.dx.set(dest_off);
    dos::int21(&mut cpu, &mut mem, &mut ds);
    assert!(!cpu.flags.cf());
    assert_eq!(cpu.ax.get(), 1024);

    for i in 0..1024u16 {
        assert_eq!(mem.read8(cpu.ds, dest_off + i), pattern[i as usize]);
    }

    std::fs::remove_dir_all(&dir).ok();
}

/// F. Fill-rect clipping: out-of-bounds rect clips to the visible region
/// and never touches bytes outside the framebuffer.
#[test]
fn scenario_f_fill_rect_clipping() {
    use civ_recomp_core::memory::{VGA_FB_SIZE, VGA_FRAMEBUFFER};
    use civ_recomp_core::video::fill_rect;

    let mut mem = Memory::new();
    mem.write_flat8(VGA_FRAMEBUFFER - 1, 0x99);
    mem.write_flat8(VGA_FRAMEBUFFER + VGA_FB_SIZE, 0x99);

    {
        let fb = &mut mem.as_mut_slice()[VGA_FRAMEBUFFER..VGA_FRAMEBUFFER + VGA_FB_SIZE];
        fill_rect(fb, -5, -5, 400, 250, 0x2A);
    }

    let fb = &mem.as_slice()[VGA_FRAMEBUFFER..VGA_FRAMEBUFFER + VGA_FB_SIZE];
    assert!(fb.iter().all(|&b| b == 0x2A));
    assert_eq!(mem.read_flat8(VGA_FRAMEBUFFER - 1), 0x99);
    assert_eq!(mem.read_flat8(VGA_FRAMEBUFFER + VGA_FB_SIZE), 0x99);
}
