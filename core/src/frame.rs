//! Frame-boundary signals and the frame pump.
//!
//! The host application owns one [`CoreSignals`] bus and one [`FramePump`].
//! Once per logical frame, on a single thread, it calls
//! [`FramePump::run_frame`], which fires `begin_frame` and then `end_frame`
//! exactly once each. Subsystems connect to whichever boundary they care
//! about — the work queue, for example, runs its cooperative drain and pool
//! maintenance from `begin_frame`.
//!
//! # Example
//!
//! ```
//! use vermilion_core::{CoreSignals, FramePump};
//!
//! let signals = CoreSignals::new();
//! let mut pump = FramePump::new();
//!
//! let conn = signals
//!     .begin_frame
//!     .connect(|frame| println!("frame {} dt {}", frame.frame_number, frame.time_step));
//!
//! pump.run_frame(&signals);
//! assert_eq!(pump.frame_number(), 1);
//! drop(conn);
//! ```

use std::time::Instant;

use crate::signal::Signal;

/// Payload of the `begin_frame` signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeginFrame {
    /// 1-based frame counter.
    pub frame_number: u64,
    /// Seconds elapsed since the previous frame (0.0 on the first frame).
    pub time_step: f32,
}

/// Payload of the `end_frame` signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndFrame {
    /// 1-based frame counter, matching the preceding [`BeginFrame`].
    pub frame_number: u64,
}

/// The engine-wide frame-boundary signal bus.
///
/// Constructed explicitly by the host and passed by reference to every
/// subsystem that needs frame notifications; there is no global instance.
#[derive(Default, Debug)]
pub struct CoreSignals {
    /// Fired first, once per frame.
    pub begin_frame: Signal<BeginFrame>,
    /// Fired last, once per frame.
    pub end_frame: Signal<EndFrame>,
}

impl CoreSignals {
    /// Creates a bus with no listeners.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Owns the frame counter and delta timer, and drives [`CoreSignals`].
pub struct FramePump {
    frame_number: u64,
    last_frame: Option<Instant>,
}

impl FramePump {
    /// Creates a pump at frame 0 (no frame run yet).
    pub fn new() -> Self {
        Self {
            frame_number: 0,
            last_frame: None,
        }
    }

    /// Number of completed frames.
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Runs one logical frame: advances the counter, measures the time step
    /// since the previous call, then fires `begin_frame` and `end_frame` in
    /// that order on the calling thread.
    pub fn run_frame(&mut self, signals: &CoreSignals) {
        let now = Instant::now();
        let time_step = match self.last_frame {
            Some(last) => (now - last).as_secs_f32(),
            None => 0.0,
        };
        self.last_frame = Some(now);
        self.frame_number += 1;

        signals.begin_frame.emit(&BeginFrame {
            frame_number: self.frame_number,
            time_step,
        });
        signals.end_frame.emit(&EndFrame {
            frame_number: self.frame_number,
        });
    }
}

impl Default for FramePump {
    fn default() -> Self {
        Self::new()
    }
}
