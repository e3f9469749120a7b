//! Centralized balance and tuning constants for Derby race logic.
//!
//! Odds, pacing and wallet numbers live here, compiled in.

// Logging targets ----------------------------------------------------------
pub(crate) const LOG_TARGET_PROGRAM: &str = "derby::program";
pub(crate) const LOG_TARGET_RACE: &str = "derby::race";
pub(crate) const LOG_TARGET_BET: &str = "derby::bet";
pub(crate) const LOG_TARGET_SESSION: &str = "derby::session";

// Field layout -------------------------------------------------------------
/// Horses per program; one per track line.
pub const TRACK_LINES: usize = 10;
/// Programs (laps) generated per session.
pub const LAPS: u32 = 6;
/// Distance of the first lap in metres.
pub const BASE_DISTANCE_METERS: u32 = 1_200;
/// Extra distance added for every lap after the first.
pub const DISTANCE_STEP_METERS: u32 = 200;

// Horse condition ----------------------------------------------------------
pub const MIN_HORSE_CONDITION: u32 = 10;
pub const MAX_HORSE_CONDITION: u32 = 100;

// Speed model --------------------------------------------------------------
pub const MIN_SPEED_CONDITION_COEF: f64 = 0.3;
pub const MAX_SPEED_CONDITION_COEF: f64 = 1.2;
/// Average horse speed in km/h.
pub const AVG_HORSE_SPEED: f64 = 48.0;
pub const RANDOM_FACTOR_COEF_MIN: f64 = 0.5;
pub const RANDOM_FACTOR_COEF_MAX: f64 = 1.5;
pub(crate) const KPH_PER_MPS: f64 = 3.6;

// Odds -----------------------------------------------------------------------
/// Lower bound of the odds remap. Keep at or above 1.
pub const BETTING_OUTPUT_MIN: f64 = 1.0;
/// Upper bound of the odds remap.
pub const BETTING_OUTPUT_MAX: f64 = 20.0;

// Wallet ---------------------------------------------------------------------
/// Starting balance for a new player, in cents.
pub const DEFAULT_BALANCE_CENTS: i64 = 100_000;
/// Fixed stake of a single bet, in cents.
pub const DEFAULT_BET_CENTS: i64 = 10_000;
