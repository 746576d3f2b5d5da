use crate::quiz::AnswerRecord;

/// Running score after each terminal answer, as (question number, points)
pub fn cumulative_points(answers: &[AnswerRecord]) -> Vec<(f64, f64)> {
    let mut total = 0.0;
    answers
        .iter()
        .enumerate()
        .map(|(i, record)| {
            total += record.gained;
            ((i + 1) as f64, total)
        })
        .collect()
}

/// X (question number) and Y (points) bounds for the results chart
pub fn compute_chart_params(coords: &[(f64, f64)]) -> (f64, f64) {
    let questions = coords.last().map(|&(x, _)| x).unwrap_or(1.0).max(1.0);
    let mut highest = 0.0;
    for &(_, points) in coords {
        if points > highest {
            highest = points;
        }
    }
    (questions, highest.round().max(1.0))
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}
