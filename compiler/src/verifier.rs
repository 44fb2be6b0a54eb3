use tracing::error;

use crate::{error::NifError, model::Model};

/// Returns `Ok(())` if every registry is non-empty and consistent, or
/// `Err(NifError::ValidationFailed(_))` naming the categories that are not.
pub fn verify_model(model: &Model) -> Result<(), NifError> {
    let checks = [
        (model.versions().category(), model.versions().is_consistent()),
        (model.basics().category(), model.basics().is_consistent()),
        (model.structs().category(), model.structs().is_consistent()),
        (model.blocks().category(), model.blocks().is_consistent()),
        (model.enums().category(), model.enums().is_consistent()),
        (model.flags().category(), model.flags().is_consistent()),
    ];

    let failed: Vec<&str> = checks.iter().filter(|(_, ok)| !ok).map(|(c, _)| *c).collect();
    if failed.is_empty() {
        return Ok(());
    }

    error!("The schema did not pass validation");
    Err(NifError::ValidationFailed(format!(
        "empty or inconsistent registries: {}",
        failed.join(", ")
    )))
}
