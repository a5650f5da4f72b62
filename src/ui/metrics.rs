/// Nutrition metric cards
/// Six cards, always shown; values the service did not return read as 0
use iced::widget::{column, container, text};
use iced::{Alignment, Element, Length};

use crate::state::data::NutritionResult;

/// One rendered nutrition value
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub label: &'static str,
    pub value: String,
    pub unit: &'static str,
}

/// Format a value for display: absent or non-finite → "0",
/// whole numbers without decimals, everything else with one decimal
pub fn format_metric(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => {
            if v.fract() == 0.0 {
                format!("{:.0}", v)
            } else {
                format!("{:.1}", v)
            }
        }
        _ => "0".to_string(),
    }
}

/// The six metrics in display order
pub fn metrics(result: Option<&NutritionResult>) -> [Metric; 6] {
    let n = result.copied().unwrap_or_default();
    [
        metric("Energi Total", n.energy_kcal, "kkal"),
        metric("Lemak Total", n.total_fat_g, "gram"),
        metric("Lemak Jenuh", n.saturated_fat_g, "gram"),
        metric("Protein", n.protein_g, "gram"),
        metric("Karbohidrat", n.carbohydrate_g, "gram"),
        metric("Garam", n.salt_mg, "miligram"),
    ]
}

fn metric(label: &'static str, value: Option<f64>, unit: &'static str) -> Metric {
    Metric {
        label,
        value: format_metric(value),
        unit,
    }
}

/// Card widget for one metric
pub fn metric_card<'a, Message: 'a>(metric: &Metric) -> Element<'a, Message> {
    container(
        column![
            text(metric.label).size(14),
            text(metric.value.clone()).size(32),
            text(metric.unit).size(12),
        ]
        .spacing(4)
        .align_x(Alignment::Center),
    )
    .padding(12)
    .width(Length::FillPortion(1))
    .style(container::rounded_box)
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_metric() {
        assert_eq!(format_metric(None), "0");
        assert_eq!(format_metric(Some(250.0)), "250");
        assert_eq!(format_metric(Some(2.34)), "2.3");
        assert_eq!(format_metric(Some(0.5)), "0.5");
        assert_eq!(format_metric(Some(f64::NAN)), "0");
        assert_eq!(format_metric(Some(f64::INFINITY)), "0");
    }

    #[test]
    fn test_missing_field_shows_zero_only_there() {
        let result = NutritionResult {
            energy_kcal: Some(250.0),
            total_fat_g: Some(10.0),
            saturated_fat_g: Some(3.0),
            protein_g: None,
            carbohydrate_g: Some(30.0),
            salt_mg: Some(400.0),
        };
        let values: Vec<String> = metrics(Some(&result)).iter().map(|m| m.value.clone()).collect();
        assert_eq!(values, vec!["250", "10", "3", "0", "30", "400"]);
    }

    #[test]
    fn test_no_result_shows_all_zero() {
        let all = metrics(None);
        assert!(all.iter().all(|m| m.value == "0"));
        assert_eq!(all[5].unit, "miligram");
    }
}
