//! Blending of stage-internal progress into an overall job percentage.

use super::types::JobStage;
use crate::progress::clamp_percent;

/// Share of the overall percentage owned by each working stage.
pub const STAGE_SPAN: f64 = 25.0;

/// Overall percent for `percent` (0..=100) inside `stage`.
///
/// Working stage N maps onto `[25 * (N - 1), 25 * N]`.
pub fn overall_percent(stage: JobStage, percent: f64) -> f64 {
    match stage.ordinal() {
        Some(n) => {
            STAGE_SPAN * (n as f64 - 1.0) + clamp_percent(percent) / 100.0 * STAGE_SPAN
        }
        None if stage == JobStage::Done => 100.0,
        None => 0.0,
    }
}

/// Overall percent once `stage` has completed.
pub fn stage_end_percent(stage: JobStage) -> f64 {
    overall_percent(stage, 100.0)
}
