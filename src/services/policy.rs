//! Post-enhancement resize policy

use crate::{
    services::resize::ResizeTarget,
    types::{Orientation, ScaleOption},
};

/// Long edge used for the `2k` mode
pub const TARGET_2K: u32 = 2048;
/// Long edge used for the `4k` mode
pub const TARGET_4K: u32 = 3840;

/// Decides the final resize from the scale mode and the original geometry
pub struct ResizePolicy;

impl ResizePolicy {
    /// Resolve the resize target for an enhanced image
    ///
    /// Portrait originals pin the height, landscape and square ones the
    /// width. `4x` (and anything unrecognized) keeps the engine output.
    ///
    /// # Examples
    /// ```rust
    /// use imgly_upscale::{
    ///     services::{ResizePolicy, ResizeTarget},
    ///     types::{Orientation, ScaleOption},
    /// };
    ///
    /// let target = ResizePolicy::resolve(&ScaleOption::K2, Orientation::Landscape, 640, 480);
    /// assert_eq!(target, ResizeTarget::Width(2048));
    /// ```
    #[must_use]
    pub fn resolve(
        scale: &ScaleOption,
        orientation: Orientation,
        original_width: u32,
        original_height: u32,
    ) -> ResizeTarget {
        let pin = |value: u32| match orientation {
            Orientation::Portrait => ResizeTarget::Height(value),
            Orientation::Landscape => ResizeTarget::Width(value),
        };
        let original = match orientation {
            Orientation::Portrait => original_height,
            Orientation::Landscape => original_width,
        };

        match scale {
            ScaleOption::K2 => pin(TARGET_2K),
            ScaleOption::K4 => pin(TARGET_4K),
            ScaleOption::X2 => pin(original.saturating_mul(2)),
            ScaleOption::X6 => pin(original.saturating_mul(6)),
            ScaleOption::X4 | ScaleOption::Unrecognized(_) => ResizeTarget::None,
        }
    }
}
