//! DOS/BIOS service dispatcher: INT 21h/10h/16h/33h/08h/20h, the file
//! handle table, DOS path translation, the IVT, and the conventional
//! memory arena. Every handler follows the register-in/register-out
//! discipline the original interrupts used — failures are encoded in
//! CF/AX, never propagated as Rust errors.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};

use chrono::{Datelike, Local, Timelike};
use log::{info, warn};

use crate::cpu::Cpu;
use crate::input::{KeyboardState, MouseState};
use crate::memory::{Memory, BIOS_DATA_SEG};
use crate::timer::TimerState;
use crate::video::VideoState;

pub const MAX_HANDLES: usize = 32;
pub const RESERVED_HANDLES: usize = 5;
pub const MAX_DOS_PATH: usize = 260;

// DOS error codes (AX on CF-set return).
pub const ERR_FILE_NOT_FOUND: u16 = 2;
pub const ERR_PATH_NOT_FOUND: u16 = 3;
pub const ERR_TOO_MANY_OPEN_FILES: u16 = 4;
pub const ERR_INVALID_HANDLE: u16 = 6;
pub const ERR_INSUFFICIENT_MEMORY: u16 = 8;

pub struct FileHandleTable {
    files: Vec<Option<File>>,
}

impl FileHandleTable {
    pub fn new() -> Self {
        let mut files = Vec::with_capacity(MAX_HANDLES);
        files.resize_with(MAX_HANDLES, || None);
        Self { files }
    }

    /// Starts scanning at index 5 — 0..4 are reserved for
    /// stdin/stdout/stderr/aux/prn.
    fn alloc(&mut self, file: File) -> Option<usize> {
        for i in RESERVED_HANDLES..MAX_HANDLES {
            if self.files[i].is_none() {
                self.files[i] = Some(file);
                return Some(i);
            }
        }
        None
    }

    fn close(&mut self, handle: usize) -> bool {
        if handle < MAX_HANDLES && self.files[handle].is_some() {
            self.files[handle] = None;
            true
        } else {
            false
        }
    }

    fn get_mut(&mut self, handle: usize) -> Option<&mut File> {
        self.files.get_mut(handle).and_then(|f| f.as_mut())
    }
}

impl Default for FileHandleTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Callback invoked by blocking handlers once per spin-loop iteration.
/// Expected to push pending keyboard events, update mouse state, refresh
/// the timer, and (via host-side mechanism) note a closed window — the
/// recompiled side never inspects that flag directly.
pub type PollEventsFn = Box<dyn FnMut(&mut DosState, &Cpu)>;

pub struct DosState {
    pub files: FileHandleTable,
    pub keyboard: KeyboardState,
    pub mouse: MouseState,
    pub video: VideoState,
    pub timer: TimerState,
    pub game_dir: String,
    pub mem_top: u16,
    pub ivt: [u32; 256],
    poll_events: Option<PollEventsFn>,
}

impl DosState {
    pub fn new(game_dir: impl Into<String>) -> Self {
        Self {
            files: FileHandleTable::new(),
            keyboard: KeyboardState::new(),
            mouse: MouseState::new(),
            video: VideoState::new(),
            timer: TimerState::new(),
            game_dir: game_dir.into(),
            mem_top: 0x9000,
            ivt: [0; 256],
            poll_events: None,
        }
    }

    pub fn set_poll_events(&mut self, f: PollEventsFn) {
        self.poll_events = Some(f);
    }

    /// Invokes the installed poll callback once, if any is installed.
    /// Handlers spin-call this until their precondition holds.
    pub fn poll(&mut self, cpu: &Cpu) {
        if let Some(mut f) = self.poll_events.take() {
            f(self, cpu);
            self.poll_events = Some(f);
        }
    }

    pub fn has_poll_events(&self) -> bool {
        self.poll_events.is_some()
    }

    /// Seeds the BIOS data area, matching `dos_compat.c`'s `dos_init`.
    pub fn init(&self, mem: &mut Memory) {
        mem.write16(BIOS_DATA_SEG, 0x0010, 0x0021); // equipment word
        mem.write16(BIOS_DATA_SEG, 0x0013, 640); // memory size (KB)
        mem.write8(BIOS_DATA_SEG, 0x0049, 0x13); // video mode
        mem.write8(BIOS_DATA_SEG, 0x004A, 40); // screen columns
        mem.write16(BIOS_DATA_SEG, 0x006C, 0); // tick count
    }
}

/// Replaces each `\` with `/`, prepends `game_dir + '/'`. Rejects paths at
/// or beyond 260 DOS bytes as a bad-input diagnostic.
pub fn dos_path_to_native(raw: &[u8], game_dir: &str) -> Result<String, u16> {
    if raw.len() >= MAX_DOS_PATH {
        warn!("[DOS] path exceeds {} bytes, rejecting", MAX_DOS_PATH);
        return Err(ERR_PATH_NOT_FOUND);
    }
    let translated: String = raw
        .iter()
        .map(|&b| if b == b'\\' { '/' } else { b as char })
        .collect();
    Ok(format!("{}/{}", game_dir.trim_end_matches('/'), translated))
}

fn read_asciiz_path(mem: &Memory, segment: u16, offset: u16) -> Vec<u8> {
    mem.read_cstr(segment, offset, MAX_DOS_PATH)
}

fn fail(cpu: &mut Cpu, code: u16) {
    cpu.flags.set(crate::flags::CF, true);
    cpu.ax.set(code);
}

fn succeed(cpu: &mut Cpu) {
    cpu.flags.set(crate::flags::CF, false);
}

/// INT 21h, dispatched on AH (except where the service spans all of AX).
pub fn int21(cpu: &mut Cpu, mem: &mut Memory, dos: &mut DosState) {
    let ah = cpu.ax.high();
    match ah {
        0x00 | 0x4C => {
            let code = cpu.ax.low();
            cpu.halted = true;
            info!("[DOS] Program exit with code {}", code);
        }
        0x02 => {
            let ch = cpu.dx.low();
            print!("{}", ch as char);
        }
        0x07 | 0x08 => {
            while !dos.keyboard.available() {
                dos.poll(cpu);
                if !dos.has_poll_events() {
                    break;
                }
            }
            let packed = dos.keyboard.read();
            cpu.ax.set_low((packed & 0xFF) as u8);
        }
        0x09 => {
            let mut off = cpu.dx.get();
            loop {
                let b = mem.read8(cpu.ds, off);
                if b == b'$' {
                    break;
                }
                print!("{}", b as char);
                off = off.wrapping_add(1);
            }
        }
        0x0A => {
            let buf_off = cpu.dx.get();
            let max_len = mem.read8(cpu.ds, buf_off);
            let mut count = 0u8;
            while count < max_len {
                while !dos.keyboard.available() {
                    dos.poll(cpu);
                    if !dos.has_poll_events() {
                        break;
                    }
                }
                let packed = dos.keyboard.read();
                let ascii = (packed & 0xFF) as u8;
                if ascii == 0x0D {
                    break;
                }
                mem.write8(cpu.ds, buf_off + 2 + count as u16, ascii);
                count += 1;
            }
            mem.write8(cpu.ds, buf_off + 1, count);
            mem.write8(cpu.ds, buf_off + 2 + count as u16, 0x0D);
        }
        0x0B => {
            cpu.ax.set_low(if dos.keyboard.available() { 0xFF } else { 0x00 });
        }
        0x0E => {
            cpu.ax.set_low(5);
        }
        0x11 | 0x12 => {
            cpu.ax.set_low(0xFF);
        }
        0x19 => {
            cpu.ax.set_low(2);
        }
        0x1A => { /* set DTA: accepted, ignored */ }
        0x25 => {
            let vector = cpu.ax.low();
            dos.ivt[vector as usize] = ((cpu.ds as u32) << 16) | cpu.dx.get() as u32;
        }
        0x2A => {
            let now = Local::now();
            cpu.cx.set(now.year() as u16);
            cpu.dx.set_high(now.month() as u8);
            cpu.dx.set_low(now.day() as u8);
            cpu.ax.set_low(now.weekday().num_days_from_sunday() as u8);
        }
        0x2C => {
            let now = Local::now();
            cpu.cx.set_high(now.hour() as u8);
            cpu.cx.set_low(now.minute() as u8);
            cpu.dx.set_high(now.second() as u8);
            cpu.dx.set_low(0);
        }
        0x30 => {
            cpu.ax.set(0x0005);
        }
        0x35 => {
            let vector = cpu.ax.low();
            let packed = dos.ivt[vector as usize];
            cpu.es = (packed >> 16) as u16;
            cpu.bx.set((packed & 0xFFFF) as u16);
        }
        0x3C => {
            let path = read_asciiz_path(mem, cpu.ds, cpu.dx.get());
            match dos_path_to_native(&path, &dos.game_dir) {
                Ok(native) => match File::create(&native) {
                    Ok(file) => match dos.files.alloc(file) {
                        Some(handle) => {
                            succeed(cpu);
                            cpu.ax.set(handle as u16);
                        }
                        None => fail(cpu, ERR_TOO_MANY_OPEN_FILES),
                    },
                    Err(_) => fail(cpu, ERR_PATH_NOT_FOUND),
                },
                Err(code) => fail(cpu, code),
            }
        }
        0x3D => {
            let path = read_asciiz_path(mem, cpu.ds, cpu.dx.get());
            let mode = cpu.ax.low() & 0x3;
            match dos_path_to_native(&path, &dos.game_dir) {
                Ok(native) => {
                    let mut opts = OpenOptions::new();
                    match mode {
                        0 => {
                            opts.read(true);
                        }
                        1 => {
                            opts.write(true);
                        }
                        _ => {
                            opts.read(true).write(true);
                        }
                    }
                    match opts.open(&native) {
                        Ok(file) => match dos.files.alloc(file) {
                            Some(handle) => {
                                succeed(cpu);
                                cpu.ax.set(handle as u16);
                            }
                            None => fail(cpu, ERR_TOO_MANY_OPEN_FILES),
                        },
                        Err(_) => fail(cpu, ERR_FILE_NOT_FOUND),
                    }
                }
                Err(code) => fail(cpu, code),
            }
        }
        0x3E => {
            let handle = cpu.bx.get() as usize;
            if dos.files.close(handle) {
                succeed(cpu);
            } else {
                fail(cpu, ERR_INVALID_HANDLE);
            }
        }
        0x3F => {
            let handle = cpu.bx.get() as usize;
            let count = cpu.cx.get() as usize;
            let dest_off = cpu.dx.get();
            match dos.files.get_mut(handle) {
                Some(file) => {
                    let mut buf = vec![0u8; count];
                    match file.read(&mut buf) {
                        Ok(n) => {
                            for (i, &b) in buf[..n].iter().enumerate() {
                                mem.write8(cpu.ds, dest_off.wrapping_add(i as u16), b);
                            }
                            succeed(cpu);
                            cpu.ax.set(n as u16);
                        }
                        Err(_) => fail(cpu, ERR_INVALID_HANDLE),
                    }
                }
                None => fail(cpu, ERR_INVALID_HANDLE),
            }
        }
        0x40 => {
            let handle = cpu.bx.get() as usize;
            let count = cpu.cx.get() as usize;
            let src_off = cpu.dx.get();
            let mut buf = vec![0u8; count];
            for (i, b) in buf.iter_mut().enumerate() {
                *b = mem.read8(cpu.ds, src_off.wrapping_add(i as u16));
            }
            if handle == 1 || handle == 2 {
                let _ = std::io::stdout().write_all(&buf);
                succeed(cpu);
                cpu.ax.set(count as u16);
                return;
            }
            match dos.files.get_mut(handle) {
                Some(file) => match file.write(&buf) {
                    Ok(n) => {
                        succeed(cpu);
                        cpu.ax.set(n as u16);
                    }
                    Err(_) => fail(cpu, ERR_INVALID_HANDLE),
                },
                None => fail(cpu, ERR_INVALID_HANDLE),
            }
        }
        0x41 => {
            let path = read_asciiz_path(mem, cpu.ds, cpu.dx.get());
            match dos_path_to_native(&path, &dos.game_dir) {
                Ok(native) => match std::fs::remove_file(&native) {
                    Ok(_) => succeed(cpu),
                    Err(_) => fail(cpu, ERR_FILE_NOT_FOUND),
                },
                Err(code) => fail(cpu, code),
            }
        }
        0x42 => {
            let handle = cpu.bx.get() as usize;
            let whence = cpu.ax.low();
            let offset = ((cpu.cx.get() as u32) << 16) | cpu.dx.get() as u32;
            match dos.files.get_mut(handle) {
                Some(file) => {
                    let seek_from = match whence {
                        0 => SeekFrom::Start(offset as u64),
                        1 => SeekFrom::Current(offset as i64),
                        _ => SeekFrom::End(offset as i64),
                    };
                    match file.seek(seek_from) {
                        Ok(pos) => {
                            succeed(cpu);
                            cpu.dx.set((pos >> 16) as u16);
                            cpu.ax.set((pos & 0xFFFF) as u16);
                        }
                        Err(_) => fail(cpu, ERR_INVALID_HANDLE),
                    }
                }
                None => fail(cpu, ERR_INVALID_HANDLE),
            }
        }
        0x47 => {
            let si = cpu.si;
            mem.write8(cpu.ds, si, 0);
            succeed(cpu);
        }
        0x48 => {
            let paragraphs = cpu.bx.get();
            // Arbitrary but generous ceiling for the conventional-memory
            // arena; real DOS bounds this at segment 0xA000.
            if (dos.mem_top as u32 + paragraphs as u32) < 0xA000 {
                cpu.ax.set(dos.mem_top);
                dos.mem_top += paragraphs;
                succeed(cpu);
            } else {
                let largest = 0xA000u16.saturating_sub(dos.mem_top);
                fail(cpu, ERR_INSUFFICIENT_MEMORY);
                cpu.bx.set(largest);
            }
        }
        0x49 | 0x4A => {
            succeed(cpu);
        }
        0x62 => {
            cpu.bx.set(0x0100);
        }
        other => {
            warn!("[DOS] unhandled INT 21h AH={:#04X}", other);
        }
    }
}

/// INT 10h video services.
pub fn int10(cpu: &mut Cpu, mem: &mut Memory) {
    let ah = cpu.ax.high();
    match ah {
        0x00 => { /* mode set: idempotent, already in mode 13h */ }
        0x02 => {
            let row = cpu.dx.high();
            let col = cpu.dx.low();
            mem.write8(BIOS_DATA_SEG, 0x0050, col);
            mem.write8(BIOS_DATA_SEG, 0x0051, row);
        }
        0x09 | 0x0E => {
            let ch = cpu.ax.low();
            print!("{}", ch as char);
        }
        0x0F => {
            cpu.ax.set_high(0x13);
        }
        other => {
            warn!("[BIOS] unhandled INT 10h AH={:#04X}", other);
        }
    }
}

/// INT 16h keyboard services.
pub fn int16(cpu: &mut Cpu, dos: &mut DosState) {
    let ah = cpu.ax.high();
    match ah {
        0x00 | 0x10 => {
            while !dos.keyboard.available() {
                dos.poll(cpu);
                if !dos.has_poll_events() {
                    break;
                }
            }
            let packed = dos.keyboard.read();
            cpu.ax.set(packed);
        }
        0x01 | 0x11 => {
            if dos.keyboard.available() {
                cpu.flags.set(crate::flags::ZF, false);
            } else {
                cpu.flags.set(crate::flags::ZF, true);
            }
        }
        0x02 => {
            cpu.ax.set_low(0);
        }
        other => {
            warn!("[BIOS] unhandled INT 16h AH={:#04X}", other);
        }
    }
}

/// INT 33h mouse services, dispatched on the full AX value.
pub fn mouse_int33(cpu: &mut Cpu, dos: &mut DosState) {
    let ax = cpu.ax.get();
    match ax {
        0x0000 => {
            cpu.ax.set(0xFFFF);
            cpu.bx.set(3);
        }
        0x0001 => {
            dos.mouse.visible = true;
        }
        0x0002 => {
            dos.mouse.visible = false;
        }
        0x0003 => {
            cpu.bx.set(dos.mouse.buttons);
            cpu.cx.set(dos.mouse.x as u16);
            cpu.dx.set(dos.mouse.y as u16);
        }
        0x0004 => {
            let x = cpu.cx.get() as i16;
            let y = cpu.dx.get() as i16;
            dos.mouse.set_position_unclamped(x, y);
        }
        0x0007 => {
            let min = cpu.cx.get() as i16;
            let max = cpu.dx.get() as i16;
            dos.mouse.set_range(min, max, dos.mouse.min_y, dos.mouse.max_y);
        }
        0x0008 => {
            let min = cpu.cx.get() as i16;
            let max = cpu.dx.get() as i16;
            dos.mouse.set_range(dos.mouse.min_x, dos.mouse.max_x, min, max);
        }
        0x000C => { /* set event handler: accepted, ignored — events are polled */ }
        other => {
            warn!("[DOS] unhandled INT 33h AX={:#06X}", other);
        }
    }
}

/// INT 08h (timer tick) and INT 20h (legacy program terminate).
pub fn int_handler(vector: u8, cpu: &mut Cpu, mem: &mut Memory, dos: &mut DosState, host_ms: u64) {
    match vector {
        0x08 => {
            dos.timer.update(host_ms);
            mem.write16(BIOS_DATA_SEG, 0x006C, dos.timer.tick_count() as u16);
        }
        0x20 => {
            cpu.halted = true;
        }
        other => {
            warn!("[DOS] unhandled interrupt vector {:#04X}", other);
        }
    }
}

/// Port number -> component routing (§4.9), with a silent default for
/// every unmapped port.
pub fn port_out8(dos: &mut DosState, port: u16, value: u8) {
    match port {
        0x20 => { /* PIC EOI — ignored */ }
        0x40 | 0x43 => dos.timer.port_write(port, value),
        0x60 => { /* keyboard data — unused */ }
        0x3C7 | 0x3C8 | 0x3C9 => dos.video.port_write(port, value),
        _ => {}
    }
}

pub fn port_in8(dos: &mut DosState, port: u16) -> u8 {
    match port {
        0x40 | 0x43 => dos.timer.port_read(port),
        0x60 => 0,
        0x3C7 | 0x3C8 | 0x3C9 => dos.video.port_read(port),
        0x3DA => dos.video.port_read(port),
        _ => 0,
    }
}
