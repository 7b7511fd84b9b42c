use crate::error::PspError;
use crate::layout::parse_layout_str;
use crate::layout::schema::ReportLayout;
use crate::model::Region;

const NRLDC_JSON: &str = include_str!("../../../../layouts/nrldc.json");
const SRLDC_JSON: &str = include_str!("../../../../layouts/srldc.json");
const WRLDC_JSON: &str = include_str!("../../../../layouts/wrldc.json");
const POSOCO_JSON: &str = include_str!("../../../../layouts/posoco.json");

/// Available predefined layouts.
pub const PRESETS: &[&str] = &["nrldc", "srldc", "wrldc", "posoco"];

/// Load a predefined layout by name.
pub fn load_preset(name: &str) -> Result<ReportLayout, PspError> {
    let json = match name {
        "nrldc" => NRLDC_JSON,
        "srldc" => SRLDC_JSON,
        "wrldc" => WRLDC_JSON,
        "posoco" => POSOCO_JSON,
        _ => {
            return Err(PspError::LayoutInvalid(format!(
                "unknown preset '{}'. Available: {}",
                name,
                PRESETS.join(", ")
            )))
        }
    };
    parse_layout_str(json)
}

pub fn preset_for(region: Region) -> Result<ReportLayout, PspError> {
    load_preset(region.slug())
}
