use crate::question::{AnswerOption, Kind, QuestionRecord};
use include_dir::{include_dir, Dir};
use serde::Deserialize;
use std::error::Error;
use std::path::Path;

static BANK_DIR: Dir = include_dir!("src/banks");

/// Name of the bank shipped with the binary
pub const DEFAULT_BANK: &str = "general";

/// A validated pool of questions ready for sampling
#[derive(Clone, Debug, Deserialize)]
pub struct QuestionBank {
    pub name: String,
    pub questions: Vec<QuestionRecord>,
}

impl QuestionBank {
    /// Load one of the banks embedded in the binary
    pub fn embedded(name: &str) -> Result<Self, Box<dyn Error>> {
        let file = BANK_DIR
            .get_file(format!("{name}.json"))
            .ok_or_else(|| format!("embedded bank `{name}` not found"))?;
        let text = file
            .contents_utf8()
            .ok_or("bank file is not valid UTF-8")?;
        let mut bank: QuestionBank = serde_json::from_str(text)?;
        bank.questions.retain(QuestionRecord::is_valid);
        Ok(bank)
    }

    pub fn from_csv_path(path: &Path) -> Result<Self, Box<dyn Error>> {
        let text = std::fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "bank".to_string());
        Ok(Self::from_csv(&name, &text))
    }

    /// Parse the sheet-export layout
    /// `id, value, type, answer, prompt, opt1..opt4, area, difficulty`.
    /// Rows that fail validation are dropped silently; they must never
    /// surface mid-session.
    pub fn from_csv(name: &str, text: &str) -> Self {
        // some sheet locales export `;`-delimited; detect from the header
        let delimiter = if text.lines().next().is_some_and(|l| l.contains(';')) {
            b';'
        } else {
            b','
        };
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let questions: Vec<QuestionRecord> = reader
            .records()
            .filter_map(|row| row.ok())
            .filter_map(|row| record_from_row(&row))
            .filter(QuestionRecord::is_valid)
            .collect();

        QuestionBank {
            name: name.to_string(),
            questions,
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

fn record_from_row(row: &csv::StringRecord) -> Option<QuestionRecord> {
    let id = row.get(0)?.trim().to_string();
    if id.is_empty() || id.eq_ignore_ascii_case("id") {
        return None;
    }
    // decimal commas appear in some exports
    let value = row
        .get(1)?
        .trim()
        .replace(',', ".")
        .parse::<f64>()
        .unwrap_or(0.0);
    let kind = Kind::parse(row.get(2)?)?;
    let answer_key = row.get(3)?.trim().to_lowercase();
    let prompt = row.get(4)?.trim().to_string();

    let mut options = Vec::with_capacity(kind.option_count());
    for (i, key) in ["a", "b", "c", "d"]
        .iter()
        .enumerate()
        .take(kind.option_count())
    {
        options.push(AnswerOption {
            key: (*key).to_string(),
            text: row.get(5 + i).unwrap_or("").trim().to_string(),
        });
    }

    let area = non_empty(row.get(9)).unwrap_or("Unknown").to_string();
    let difficulty = non_empty(row.get(10)).unwrap_or("Medium").to_string();

    Some(QuestionRecord {
        id,
        value,
        kind,
        answer_key,
        prompt,
        options,
        area,
        difficulty,
        elapsed_carry_ms: 0,
    })
}

fn non_empty(field: Option<&str>) -> Option<&str> {
    field.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::{AREAS, DIFFICULTIES};

    const CSV_HEADER: &str = "id,value,type,answer,prompt,opt1,opt2,opt3,opt4,area,difficulty";

    #[test]
    fn test_embedded_default_bank_loads() {
        let bank = QuestionBank::embedded(DEFAULT_BANK).unwrap();
        assert_eq!(bank.name, "general");
        assert_eq!(bank.len(), 32);
        assert!(bank.questions.iter().all(QuestionRecord::is_valid));
    }

    #[test]
    fn test_embedded_bank_covers_all_categories() {
        let bank = QuestionBank::embedded(DEFAULT_BANK).unwrap();
        for area in AREAS {
            assert!(bank.questions.iter().any(|q| q.area == area), "area {area}");
        }
        for difficulty in DIFFICULTIES {
            assert!(
                bank.questions.iter().any(|q| q.difficulty == difficulty),
                "difficulty {difficulty}"
            );
        }
    }

    #[test]
    fn test_embedded_unknown_bank_errors() {
        assert!(QuestionBank::embedded("nope").is_err());
    }

    #[test]
    fn test_csv_comma_delimited() {
        let text = format!(
            "{CSV_HEADER}\n\
             q1,100,MC,b,Who was the first emperor of Rome?,Julius Caesar,Augustus,Nero,Constantine,History,Medium\n\
             q2,80,TF,a,The Berlin Wall fell in 1989.,True,False,,,History,Easy"
        );
        let bank = QuestionBank::from_csv("test", &text);
        assert_eq!(bank.len(), 2);

        let q1 = &bank.questions[0];
        assert_eq!(q1.kind, Kind::MultipleChoice);
        assert_eq!(q1.options.len(), 4);
        assert_eq!(q1.answer_key, "b");
        assert_eq!(q1.value, 100.0);

        let q2 = &bank.questions[1];
        assert_eq!(q2.kind, Kind::TrueFalse);
        assert_eq!(q2.options.len(), 2);
        assert_eq!(q2.options[0].text, "True");
    }

    #[test]
    fn test_csv_semicolon_delimited_with_decimal_comma() {
        let text = "id;value;type;answer;prompt;opt1;opt2;opt3;opt4;area;difficulty\n\
                    q1;112,5;MC;a;Some prompt;one;two;three;four;Science;Hard";
        let bank = QuestionBank::from_csv("test", text);
        assert_eq!(bank.len(), 1);
        assert_eq!(bank.questions[0].value, 112.5);
    }

    #[test]
    fn test_csv_invalid_rows_are_dropped() {
        let text = format!(
            "{CSV_HEADER}\n\
             ,100,MC,a,missing id,one,two,three,four,History,Easy\n\
             q2,100,ESSAY,a,bad kind,one,two,three,four,History,Easy\n\
             q3,100,MC,z,answer not an option,one,two,three,four,History,Easy\n\
             q4,100,MC,a,,one,two,three,four,History,Easy\n\
             q5,100,MC,a,the only valid row,one,two,three,four,History,Easy"
        );
        let bank = QuestionBank::from_csv("test", &text);
        assert_eq!(bank.len(), 1);
        assert_eq!(bank.questions[0].id, "q5");
    }

    #[test]
    fn test_csv_tf_answer_must_be_in_first_two_columns() {
        // a TF row whose answer points at a trimmed-off option is invalid
        let text = format!(
            "{CSV_HEADER}\n\
             q1,100,TF,c,is this valid?,True,False,Maybe,,History,Easy"
        );
        let bank = QuestionBank::from_csv("test", &text);
        assert!(bank.is_empty());
    }

    #[test]
    fn test_csv_missing_area_and_difficulty_default() {
        let text = format!(
            "{CSV_HEADER}\n\
             q1,100,MC,a,prompt text,one,two,three,four,,"
        );
        let bank = QuestionBank::from_csv("test", &text);
        assert_eq!(bank.len(), 1);
        assert_eq!(bank.questions[0].area, "Unknown");
        assert_eq!(bank.questions[0].difficulty, "Medium");
    }

    #[test]
    fn test_csv_unparseable_value_becomes_zero() {
        let text = format!(
            "{CSV_HEADER}\n\
             q1,lots,MC,a,prompt text,one,two,three,four,History,Easy"
        );
        let bank = QuestionBank::from_csv("test", &text);
        assert_eq!(bank.len(), 1);
        assert_eq!(bank.questions[0].value, 0.0);
    }

    #[test]
    fn test_csv_path_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mybank.csv");
        std::fs::write(
            &path,
            format!("{CSV_HEADER}\nq1,100,MC,a,prompt,one,two,three,four,History,Easy"),
        )
        .unwrap();

        let bank = QuestionBank::from_csv_path(&path).unwrap();
        assert_eq!(bank.name, "mybank");
        assert_eq!(bank.len(), 1);
    }
}
