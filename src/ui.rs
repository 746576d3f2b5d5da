pub mod charting;

use std::time::SystemTime;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Axis, Chart, Dataset, Gauge, GraphType, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::question::DIFFICULTIES;
use crate::quiz::Quiz;
use crate::result::SessionResult;
use crate::util::{fmt_ms, mean};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

/// The question screen: session progress, the ticking time budget, the
/// prompt, and the option list with the current selection.
pub struct QuizView<'a> {
    pub quiz: &'a Quiz,
    pub selected: usize,
    pub now: SystemTime,
}

impl Widget for QuizView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let dim_style = Style::default().add_modifier(Modifier::DIM);

        let Some(question) = self.quiz.current() else {
            return;
        };

        let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
        let mut prompt_occupied_lines =
            ((question.prompt.width() as f64 / max_chars_per_line as f64).ceil() + 1.0) as u16;
        if question.prompt.width() <= max_chars_per_line as usize {
            prompt_occupied_lines = 1;
        }

        let option_lines = question.options.len() as u16;

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints(
                [
                    Constraint::Length(1), // session progress
                    Constraint::Length(1),
                    Constraint::Length(1), // time budget
                    Constraint::Length(2),
                    Constraint::Length(prompt_occupied_lines),
                    Constraint::Length(1),
                    Constraint::Length(option_lines),
                    Constraint::Min(0),
                    Constraint::Length(1), // legend
                ]
                .as_ref(),
            )
            .split(area);

        let progress = Gauge::default()
            .gauge_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::DIM))
            .ratio(self.quiz.progress_fraction().clamp(0.0, 1.0))
            .label("");
        progress.render(chunks[0], buf);

        // The gauge reads from the same effective-elapsed computation that
        // fires the timeout, so it cannot drift from the state machine.
        let remaining = self.quiz.remaining_fraction(self.now).clamp(0.0, 1.0);
        let timer_color = if remaining > 0.5 {
            Color::Green
        } else if remaining > 0.2 {
            Color::Yellow
        } else {
            Color::Red
        };
        let remaining_ms = (remaining * self.quiz.time_limit_ms as f64) as u64;
        let timer = Gauge::default()
            .gauge_style(Style::default().fg(timer_color))
            .ratio(remaining)
            .label(Span::styled(fmt_ms(remaining_ms), bold_style));
        timer.render(chunks[2], buf);

        let kind_tag = Paragraph::new(Span::styled(question.kind.to_string(), dim_style))
            .alignment(Alignment::Center);
        kind_tag.render(chunks[3], buf);

        let prompt = Paragraph::new(Span::styled(question.prompt.clone(), bold_style))
            .alignment(if prompt_occupied_lines == 1 {
                Alignment::Center
            } else {
                Alignment::Left
            })
            .wrap(Wrap { trim: true });
        prompt.render(chunks[4], buf);

        let option_rows: Vec<Line> = question
            .options
            .iter()
            .enumerate()
            .map(|(idx, option)| {
                let text = format!("{}. {}", idx + 1, option.text);
                if idx == self.selected {
                    Line::from(Span::styled(
                        format!("▶ {text}"),
                        Style::default()
                            .patch(bold_style)
                            .fg(Color::Yellow),
                    ))
                } else {
                    Line::from(Span::styled(format!("  {text}"), dim_style))
                }
            })
            .collect();
        Paragraph::new(option_rows)
            .alignment(Alignment::Left)
            .render(chunks[6], buf);

        let legend = Paragraph::new(Span::styled(
            "↑/↓ or 1-4 select  (enter)confirm  (s)kip  (esc)ape",
            Style::default().add_modifier(Modifier::ITALIC | Modifier::DIM),
        ))
        .alignment(Alignment::Center);
        legend.render(chunks[8], buf);
    }
}

/// The result screen: cumulative points chart, final score with tier, and
/// the accuracy summary.
pub struct ResultView<'a> {
    pub quiz: &'a Quiz,
    pub result: &'a SessionResult,
}

impl Widget for ResultView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let magenta_style = Style::default().fg(Color::Magenta);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints(
                [
                    Constraint::Min(1),    // score progression chart
                    Constraint::Length(1), // headline
                    Constraint::Length(1), // attempt summary
                    Constraint::Length(1), // accuracy by difficulty
                    Constraint::Length(1),
                    Constraint::Length(1), // legend
                ]
                .as_ref(),
            )
            .split(area);

        let coords = charting::cumulative_points(&self.quiz.answers);
        let (questions, highest) = charting::compute_chart_params(&coords);
        let datasets = vec![Dataset::default()
            .marker(ratatui::symbols::Marker::Braille)
            .style(magenta_style)
            .graph_type(GraphType::Line)
            .data(&coords)];
        let chart = Chart::new(datasets)
            .x_axis(
                Axis::default()
                    .title("question")
                    .bounds([1.0, questions])
                    .labels(vec![
                        Span::styled("1", bold_style),
                        Span::styled(charting::format_label(questions), bold_style),
                    ]),
            )
            .y_axis(
                Axis::default()
                    .title("points")
                    .bounds([0.0, highest])
                    .labels(vec![
                        Span::styled("0", bold_style),
                        Span::styled(charting::format_label(highest), bold_style),
                    ]),
            );
        chart.render(chunks[0], buf);

        let headline = Paragraph::new(Span::styled(
            format!(
                "{} — {} · {}",
                self.result.player_label, self.result.final_score, self.result.tier_label
            ),
            Style::default().patch(bold_style).fg(Color::Yellow),
        ))
        .alignment(Alignment::Center);
        headline.render(chunks[1], buf);

        let elapsed: Vec<f64> = self
            .quiz
            .answers
            .iter()
            .map(|a| a.elapsed_ms as f64)
            .collect();
        let avg = mean(&elapsed).map(|ms| fmt_ms(ms as u64)).unwrap_or_default();
        let correct = self.quiz.answers.iter().filter(|a| a.correct).count();
        let summary = Paragraph::new(Span::styled(
            format!(
                "{}/{} correct   avg {avg} per answer   finished {}",
                correct,
                self.quiz.answers.len(),
                self.result.finished_at.format("%H:%M"),
            ),
            bold_style,
        ))
        .alignment(Alignment::Center);
        summary.render(chunks[2], buf);

        let mut tiers: Vec<String> = Vec::new();
        for difficulty in DIFFICULTIES {
            if let Some(tally) = self.quiz.book.by_difficulty.get(difficulty) {
                if tally.total > 0 {
                    tiers.push(format!(
                        "{difficulty} {:.0}%",
                        self.quiz.book.accuracy(difficulty) * 100.0
                    ));
                }
            }
        }
        let accuracy = Paragraph::new(Span::styled(
            tiers.join("   "),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center);
        accuracy.render(chunks[3], buf);

        let legend = Paragraph::new(Span::styled(
            "(r)etry  (t)weet  (esc)ape",
            Style::default().add_modifier(Modifier::ITALIC | Modifier::DIM),
        ))
        .alignment(Alignment::Center);
        legend.render(chunks[5], buf);
    }
}
