//! Figure rendering on top of `plotters`.
//!
//! Every renderer takes the cleaned table, validates its selection before a
//! backend is created (an invalid selection aborts with no side effects),
//! draws a PNG and returns its path.

use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;

pub mod area;
pub mod choropleth;
pub mod compare;
pub mod gapminder;
pub mod heatmap;

/// Credit line placed along the bottom edge of every figure.
pub(crate) const SOURCE_NOTE: &str =
    "Source: Agricultural total factor productivity (USDA), Our World in Data 2021";

/// Default figure size in pixels.
pub(crate) const FIGURE_SIZE: (u32, u32) = (1024, 768);

pub(crate) const STEEL_BLUE: RGBColor = RGBColor(70, 130, 180);
pub(crate) const LIGHT_GRAY: RGBColor = RGBColor(211, 211, 211);

pub(crate) fn draw_source_note<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let (_, h) = root.dim_in_pixel();
    root.draw(&Text::new(
        SOURCE_NOTE,
        (10, h as i32 - 18),
        ("sans-serif", 14).into_font().color(&BLACK.mix(0.6)),
    ))
}

/// Linear blend between two colors; `t` clamped to [0, 1].
pub(crate) fn blend(from: RGBColor, to: RGBColor, t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    let channel = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8;
    RGBColor(
        channel(from.0, to.0),
        channel(from.1, to.1),
        channel(from.2, to.2),
    )
}

/// Diverging blue → white → red ramp for correlation values in [-1, 1].
pub(crate) fn diverging(v: f64) -> RGBColor {
    const BLUE_END: RGBColor = RGBColor(33, 102, 172);
    const RED_END: RGBColor = RGBColor(178, 24, 43);
    if v < 0.0 {
        blend(WHITE, BLUE_END, -v)
    } else {
        blend(WHITE, RED_END, v)
    }
}

/// Sequential dark-to-light ramp for choropleth fills; `t` in [0, 1].
pub(crate) fn sequential(t: f64) -> RGBColor {
    const LOW: RGBColor = RGBColor(68, 1, 84);
    const MID: RGBColor = RGBColor(33, 145, 140);
    const HIGH: RGBColor = RGBColor(253, 231, 37);
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        blend(LOW, MID, t * 2.0)
    } else {
        blend(MID, HIGH, (t - 0.5) * 2.0)
    }
}

/// Some build environments have no system fonts; captioned figures cannot
/// render there, so smoke tests bail out instead of failing.
#[cfg(test)]
pub(crate) fn fonts_available() -> bool {
    ("sans-serif", 12).into_font().layout_box("x").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_interpolates_channels() {
        assert_eq!(blend(RGBColor(0, 0, 0), RGBColor(100, 200, 40), 0.5), RGBColor(50, 100, 20));
        assert_eq!(blend(WHITE, BLACK, -1.0), WHITE);
        assert_eq!(blend(WHITE, BLACK, 2.0), BLACK);
    }

    #[test]
    fn diverging_ramp_is_white_at_zero() {
        assert_eq!(diverging(0.0), WHITE);
        assert_eq!(diverging(1.0), RGBColor(178, 24, 43));
        assert_eq!(diverging(-1.0), RGBColor(33, 102, 172));
    }
}
