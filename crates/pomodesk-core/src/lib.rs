//! # Pomodesk Core Library
//!
//! Core logic for the Pomodesk timer: pomodoro work/break sessions, an
//! independent sit/stand posture cycle with active-break reminders, and
//! per-day statistics. The `pomodesk` CLI is a thin host over this crate.
//!
//! ## Architecture
//!
//! - **Timers**: countdowns anchored to an absolute end instant, so a
//!   remaining value is always recomputed from the wall clock and never
//!   drifts with missed ticks
//! - **Backends**: a foreground ticker driven by the host loop, or a tokio
//!   background worker; both only report, the controller applies
//! - **Storage**: a key-value store (SQLite or in-memory) for settings and
//!   stats, plus a TOML host configuration
//! - **Alerts**: the host provides sound and notifications through
//!   [`Alerter`]; the core decides when and what
//!
//! ## Key Components
//!
//! - [`Controller`]: single owner of all state, exposes the command surface
//! - [`Settings`]: user preferences with clamped bounds
//! - [`DailyStats`]: today's counters, reset on date change
//! - [`Event`]: what happened, for the host to render

pub mod alert;
pub mod clock;
pub mod controller;
pub mod error;
pub mod events;
pub mod posture;
pub mod settings;
pub mod stats;
pub mod storage;
pub mod timer;

pub use alert::{Alerter, NullAlerter, PermissionStatus, SoundPattern, TestAlertReport};
pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{Controller, Snapshot};
pub use error::{AlertError, ConfigError, CoreError, Result, StorageError};
pub use events::Event;
pub use posture::Posture;
pub use settings::{FieldUpdate, Settings};
pub use stats::DailyStats;
pub use storage::{AppConfig, KvStore, MemoryStore, SqliteStore, TimingMode};
pub use timer::SessionType;
