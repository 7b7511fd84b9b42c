use psp_core::error::PspError;
use psp_core::model::RegionReport;

pub fn print(report: &RegionReport) -> Result<(), PspError> {
    let json = serde_json::to_string_pretty(report)?;
    println!("{json}");
    Ok(())
}
