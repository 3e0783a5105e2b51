use chrono::{DateTime, Utc};
use chrono_tz::Asia::Bangkok;

use crate::LEVEL_UNIT;

/// Names printed in the alert; they come from configuration, not from the page.
#[derive(Debug, Clone, Copy)]
pub struct StationLabels<'a> {
    pub station: &'a str,
    pub area: &'a str,
    pub river: &'a str,
}

/// Formats an instant as Thai civil time (UTC+7, no DST).
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Bangkok)
        .format("%d/%m/%Y %H:%M")
        .to_string()
}

/// Builds the broadcast text for a changed reading.
///
/// The margin is `bank_level - level`, so a positive margin means the water
/// is still below the bank.
pub fn compose_alert(
    labels: &StationLabels<'_>,
    level: f64,
    bank_level: f64,
    at: DateTime<Utc>,
) -> String {
    let margin = bank_level - level;

    let mut lines = Vec::with_capacity(7);
    lines.push("‼️ ประกาศเตือนภัยระดับน้ำสูงสุด ‼️".to_string());
    lines.push(format!("📍รายงานสถานการณ์น้ำ{}", labels.river));
    lines.push(labels.area.to_string());
    lines.push(format!("🗓️ วันที่: {} น.", format_timestamp(at)));
    lines.push("🌊 ระดับน้ำ + ระดับตลิ่ง".to_string());
    lines.push(format!("• {}: {level:.2} {LEVEL_UNIT}", labels.station));
    lines.push(format!(
        "• ตลิ่ง: {bank_level:.2} {LEVEL_UNIT} (ต่ำกว่า {margin:+.2} ม.)"
    ));

    lines.join("\n")
}

/// Error-path alert sent when the page could not be scraped.
pub fn compose_failure(station: &str, description: &str, artifact: &str) -> String {
    format!(
        "❌ เกิดข้อผิดพลาดในการดึงข้อมูลน้ำ{station} ({description})\nกรุณาตรวจสอบ Artifact '{artifact}'"
    )
}

/// Alert for faults that happen before the page is even opened.
pub fn compose_fatal(detail: &str) -> String {
    format!("❌ เกิดข้อผิดพลาดร้ายแรงกับเบราว์เซอร์: {detail}")
}
