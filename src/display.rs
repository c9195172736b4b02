//! Human-readable rendering of a report.

use crate::models::{
    EntryMap, GradedResult, HazardEntry, HazardReport, SearchOutcome, NO_DATA_LABEL,
};

const NOT_APPLICABLE: &str = "該当なし";
const NO_INFORMATION: &str = "情報なし";

fn title(key: &str) -> &str {
    match key {
        "jshis_prob_50" => "30年以内に震度5強以上の地震が起こる確率",
        "jshis_prob_60" => "30年以内に震度6強以上の地震が起こる確率",
        "inundation_depth" => "想定最大浸水深",
        "flood_keizoku" => "浸水継続時間",
        "kaokutoukai_hanran" => "家屋倒壊等氾濫想定区域(氾濫流)",
        "tsunami_inundation" => "津波浸水想定",
        "hightide_inundation" => "高潮浸水想定",
        "landslide_hazard" => "土砂災害警戒・特別警戒区域",
        "large_fill_land" => "大規模盛土造成地",
        other => other,
    }
}

/// Probability as a floored percentage, e.g. 0.129 → "12%".
pub fn format_probability(value: Option<f64>) -> String {
    match value {
        Some(p) if p.is_finite() => format!("{}%", (p * 100.0).floor() as i64),
        _ => NO_DATA_LABEL.to_string(),
    }
}

/// Two-line "surrounding max / center" text, collapsed when both are `empty`.
pub fn format_pair(max: &str, center: &str, empty: &str) -> String {
    if max == empty && center == empty {
        return empty.to_string();
    }
    format!(" 周辺100mの最大: {}\n 中心点: {}", max, center)
}

fn graded_line(result: &GradedResult) -> String {
    format_pair(result.max_info(), result.center_info(), result.clear_label)
}

fn search_line(outcome: &SearchOutcome) -> String {
    match outcome {
        SearchOutcome::Present { .. } => format_pair("あり", outcome.center_info(), NO_INFORMATION),
        SearchOutcome::Absent { .. } => format_pair("なし", outcome.center_info(), NO_INFORMATION),
        SearchOutcome::Unknown => NO_INFORMATION.to_string(),
    }
}

/// Sub-layer labels that show something, joined; "該当なし" when none do.
fn group_line(group: &EntryMap) -> String {
    let mut max_labels = Vec::new();
    let mut center_labels = Vec::new();
    for (_, entry) in group.iter() {
        let (max, center) = match entry {
            HazardEntry::Graded(g) => (g.max_info(), g.center_info()),
            _ => (NO_DATA_LABEL, NO_DATA_LABEL),
        };
        if max != NOT_APPLICABLE {
            max_labels.push(max);
        }
        if center != NOT_APPLICABLE {
            center_labels.push(center);
        }
    }

    let join = |labels: Vec<&str>| {
        if labels.is_empty() {
            NOT_APPLICABLE.to_string()
        } else {
            labels.join(", ")
        }
    };
    format_pair(&join(max_labels), &join(center_labels), NOT_APPLICABLE)
}

fn entry_line(entry: &HazardEntry) -> String {
    match entry {
        HazardEntry::Probability(p) => format_pair(
            &format_probability(p.max_prob),
            &format_probability(p.center_prob),
            NO_DATA_LABEL,
        ),
        HazardEntry::Graded(g) => graded_line(g),
        HazardEntry::Group(group) => group_line(group),
        HazardEntry::Search(outcome) => search_line(outcome),
        HazardEntry::Unavailable(_) => NO_DATA_LABEL.to_string(),
    }
}

/// One (title, text) pair per report key, in report order.
pub fn format_report(report: &HazardReport) -> Vec<(String, String)> {
    report
        .hazard_info
        .iter()
        .map(|(key, entry)| (title(key).to_string(), entry_line(entry)))
        .collect()
}

/// The whole report as printable text.
pub fn render(report: &HazardReport) -> String {
    let mut out = format!(
        "座標: {:.6}, {:.6} (入力座標系: {})\n",
        report.coordinates.lat, report.coordinates.lon, report.input_datum
    );
    for (title, text) in format_report(report) {
        out.push_str(&format!("\n【{}】\n{}\n", title, text));
    }
    out
}
