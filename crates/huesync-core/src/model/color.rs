use huesync_api::model::{ColorMode, LightState};

const HUE_MAX: f64 = 65535.0;
const LEVEL_MAX: f64 = 254.0;

/// Color as hue (degrees), saturation and brightness (percent).
///
/// Values are rounded to whole units so that two lights showing the
/// same color compare equal even when their raw fields differ slightly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hsb {
    pub hue: u16,
    pub saturation: u8,
    pub brightness: u8,
}

impl Hsb {
    /// Convert the authoritative color fields of a light state.
    ///
    /// `xy` mode goes through the CIE xy -> sRGB conversion; every other
    /// mode uses the hue/saturation pair the hub keeps alongside it.
    pub fn from_light_state(state: &LightState) -> Self {
        let brightness = percent(f64::from(state.bri.unwrap_or(0)) / LEVEL_MAX);
        match (state.colormode, state.xy) {
            (Some(ColorMode::Xy), Some([x, y])) => Self::from_xy(x, y, brightness),
            _ => Self {
                hue: degrees(f64::from(state.hue.unwrap_or(0)) * 360.0 / HUE_MAX),
                saturation: percent(f64::from(state.sat.unwrap_or(0)) / LEVEL_MAX),
                brightness,
            },
        }
    }

    fn from_xy(x: f64, y: f64, brightness: u8) -> Self {
        if y <= 0.0 {
            return Self {
                hue: 0,
                saturation: 0,
                brightness,
            };
        }

        let z = 1.0 - x - y;
        let big_y = 1.0;
        let big_x = big_y / y * x;
        let big_z = big_y / y * z;

        // Wide-gamut D65 matrix.
        let rgb = [
            big_x * 1.656_492 - big_y * 0.354_851 - big_z * 0.255_038,
            -big_x * 0.707_196 + big_y * 1.655_397 + big_z * 0.036_152,
            big_x * 0.051_713 - big_y * 0.121_364 + big_z * 1.011_530,
        ]
        .map(gamma)
        .map(|c| c.max(0.0));

        let max = rgb[0].max(rgb[1]).max(rgb[2]);
        let min = rgb[0].min(rgb[1]).min(rgb[2]);
        let delta = max - min;

        let saturation = if max > 0.0 { delta / max } else { 0.0 };
        let hue = if delta <= f64::EPSILON {
            0.0
        } else if (max - rgb[0]).abs() <= f64::EPSILON {
            60.0 * ((rgb[1] - rgb[2]) / delta).rem_euclid(6.0)
        } else if (max - rgb[1]).abs() <= f64::EPSILON {
            60.0 * ((rgb[2] - rgb[0]) / delta + 2.0)
        } else {
            60.0 * ((rgb[0] - rgb[1]) / delta + 4.0)
        };

        Self {
            hue: degrees(hue),
            saturation: percent(saturation),
            brightness,
        }
    }
}

fn gamma(c: f64) -> f64 {
    if c <= 0.003_130_8 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

#[allow(
    clippy::as_conversions,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn degrees(value: f64) -> u16 {
    (value.round().clamp(0.0, 360.0) as u16) % 360
}

#[allow(
    clippy::as_conversions,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn percent(fraction: f64) -> u8 {
    (fraction * 100.0).round().clamp(0.0, 100.0) as u8
}
