use crate::dataset::error::DatasetError;
use crate::dataset::source::DatasetHandle;

/// Attribute holding the integer scaling applied to stored NSRDB values.
pub const SCALE_FACTOR_ATTRIBUTE: &str = "psm_scale_factor";

/// Reads `variable` at grid `position` for every time step of the handle's year, converted
/// to physical units (`raw / psm_scale_factor`).
///
/// A variable without a scale factor is an error rather than being assumed unscaled.
pub fn read_column<H>(handle: &H, variable: &str, position: usize) -> Result<Vec<f64>, DatasetError>
where
    H: DatasetHandle + ?Sized,
{
    let scale_factor = handle
        .attribute(variable, SCALE_FACTOR_ATTRIBUTE)?
        .ok_or_else(|| DatasetError::MissingScaleFactor {
            year: handle.year(),
            variable: variable.to_string(),
        })?;
    if scale_factor == 0.0 || !scale_factor.is_finite() {
        return Err(DatasetError::InvalidScaleFactor {
            year: handle.year(),
            variable: variable.to_string(),
            value: scale_factor,
        });
    }

    let raw = handle.values(variable, position)?;
    Ok(raw.into_iter().map(|value| value / scale_factor).collect())
}
