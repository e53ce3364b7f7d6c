//! Timer HAL: PIT channel-0 reload tracking and the wall-clock-derived
//! 18.2 Hz DOS tick counter, matching `hal/timer.c`.

pub const PIT_FREQUENCY: f64 = 1_193_182.0;
pub const DOS_TICK_HZ: f64 = 18.2065;

pub const TIMER_COMMAND_PORT: u16 = 0x43;
pub const TIMER_DATA_PORT: u16 = 0x40;

pub struct TimerState {
    tick_count: u32,
    start_ms: u64,
    pit_reload: u16,
    tick_rate_hz: f64,
    /// Tracks whether the next channel-0 data-port write is the low or
    /// high byte of the 16-bit reload value.
    pit_byte_high_next: bool,
}

impl TimerState {
    pub fn new() -> Self {
        Self {
            tick_count: 0,
            start_ms: 0,
            pit_reload: 0,
            tick_rate_hz: DOS_TICK_HZ,
            pit_byte_high_next: false,
        }
    }

    pub fn tick_count(&self) -> u32 {
        self.tick_count
    }

    /// Sentinel pattern: the first call only latches `start_ms`; every
    /// later call derives `tick_count` from elapsed wall-clock time.
    pub fn update(&mut self, current_ms: u64) {
        if self.start_ms == 0 {
            self.start_ms = current_ms;
            return;
        }
        let elapsed = current_ms.saturating_sub(self.start_ms) as f64;
        self.tick_count = ((elapsed * self.tick_rate_hz) / 1000.0) as u32;
    }

    pub fn port_write(&mut self, port: u16, value: u8) {
        match port {
            TIMER_COMMAND_PORT => {
                self.pit_byte_high_next = false;
            }
            TIMER_DATA_PORT => {
                if !self.pit_byte_high_next {
                    self.pit_reload = (self.pit_reload & 0xFF00) | value as u16;
                    self.pit_byte_high_next = true;
                } else {
                    self.pit_reload = (self.pit_reload & 0x00FF) | ((value as u16) << 8);
                    self.pit_byte_high_next = false;
                    let reload = if self.pit_reload == 0 {
                        65536.0
                    } else {
                        self.pit_reload as f64
                    };
                    self.tick_rate_hz = PIT_FREQUENCY / reload;
                }
            }
            _ => {}
        }
    }

    /// Port 0x40 reads are approximate (no latch-count support); all
    /// other ports return 0.
    pub fn port_read(&self, _port: u16) -> u8 {
        0
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_update_only_latches_start() {
        let mut t = TimerState::new();
        t.update(1_000);
        assert_eq!(t.tick_count(), 0);
    }

    #[test]
    fn tick_count_is_monotonic() {
        let mut t = TimerState::new();
        t.update(1_000);
        let mut last = t.tick_count();
        for ms in [1_100u64, 1_500, 2_000, 5_000] {
            t.update(ms);
            assert!(t.tick_count() >= last);
            last = t.tick_count();
        }
    }

    #[test]
    fn pit_reload_programming_updates_rate() {
        let mut t = TimerState::new();
        t.port_write(TIMER_COMMAND_PORT, 0x36);
        t.port_write(TIMER_DATA_PORT, 0x00); // low byte
        t.port_write(TIMER_DATA_PORT, 0x00); // high byte -> reload 0 -> 65536
        assert!((t.tick_rate_hz - PIT_FREQUENCY / 65536.0).abs() < 1e-9);
    }

    #[test]
    fn default_rate_is_dos_tick_hz() {
        let t = TimerState::new();
        assert!((t.tick_rate_hz - DOS_TICK_HZ).abs() < 1e-9);
    }
}
