pub mod extract;
pub mod layouts;
pub mod merge;
pub mod run;
pub mod status;

use psp_core::error::PspError;
use psp_core::layout::builtin::preset_for;
use psp_core::layout::load_layout;
use psp_core::layout::schema::ReportLayout;
use psp_core::model::Region;
use std::path::Path;

/// The region's preset, or a custom layout file that must describe the same region.
pub fn resolve_layout(region: Region, custom: Option<&Path>) -> Result<ReportLayout, PspError> {
    let Some(path) = custom else {
        return preset_for(region);
    };
    let layout = load_layout(path)?;
    if layout.region != region {
        return Err(PspError::LayoutInvalid(format!(
            "{} describes {}, not {}",
            path.display(),
            layout.region,
            region
        )));
    }
    Ok(layout)
}
