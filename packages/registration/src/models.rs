use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use strum::EnumString;

/// Header row of the append log, in column order.
pub const CSV_HEADER: &str = "StudentID,FirstName,LastName,Gender,Department,DateOfBirth,Email";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Gender {
    #[strum(serialize = "M", serialize = "Male")]
    #[serde(rename = "M")]
    Male,
    #[strum(serialize = "F", serialize = "Female")]
    #[serde(rename = "F")]
    Female,
}

impl Gender {
    /// Single-character code stored in both backends.
    pub fn code(self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Department {
    #[strum(serialize = "Civil")]
    #[serde(rename = "Civil")]
    Civil,
    #[strum(
        serialize = "CSE",
        serialize = "ComputerScienceAndEngineering",
        serialize = "Computer Science and Engineering"
    )]
    #[serde(rename = "CSE")]
    ComputerScienceAndEngineering,
    #[strum(serialize = "Electrical")]
    #[serde(rename = "Electrical")]
    Electrical,
    #[strum(
        serialize = "E&C",
        serialize = "EC",
        serialize = "ElectronicsAndCommunication",
        serialize = "Electronics and Communication"
    )]
    #[serde(rename = "E&C")]
    ElectronicsAndCommunication,
    #[strum(serialize = "Mechanical")]
    #[serde(rename = "Mechanical")]
    Mechanical,
}

impl Department {
    /// Short code stored in both backends.
    pub fn code(self) -> &'static str {
        match self {
            Department::Civil => "Civil",
            Department::ComputerScienceAndEngineering => "CSE",
            Department::Electrical => "Electrical",
            Department::ElectronicsAndCommunication => "E&C",
            Department::Mechanical => "Mechanical",
        }
    }

    /// Full department name as offered on the form.
    pub fn label(self) -> &'static str {
        match self {
            Department::Civil => "Civil",
            Department::ComputerScienceAndEngineering => "Computer Science and Engineering",
            Department::Electrical => "Electrical",
            Department::ElectronicsAndCommunication => "Electronics and Communication",
            Department::Mechanical => "Mechanical",
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Student identifier of the form `YYYY-NNNNN`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct StudentId(String);

impl StudentId {
    pub fn new(year: i32, sequence: u32) -> Self {
        Self(format!("{year}-{sequence:05}"))
    }

    /// Parse an identifier, returning `None` for anything that is not
    /// `{year}-{digits}`.
    pub fn parse(value: &str) -> Option<Self> {
        let (year, sequence) = value.split_once('-')?;
        if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if sequence.is_empty() || !sequence.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self(value.to_string()))
    }

    pub fn year(&self) -> Option<i32> {
        self.0.get(..4)?.parse().ok()
    }

    pub fn sequence(&self) -> Option<u32> {
        self.0.get(5..)?.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw candidate field set as collected by the presentation layer.
///
/// `None` for a date part, gender or department means nothing was selected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistrationForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub confirm_email: String,
    pub password: String,
    pub confirm_password: String,
    pub birth_year: Option<i32>,
    pub birth_month: Option<u32>,
    pub birth_day: Option<u32>,
    pub gender: Option<Gender>,
    pub department: Option<Department>,
}

/// A registered student. Never carries the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentRecord {
    pub student_id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub department: Department,
    pub date_of_birth: NaiveDate,
    pub email: String,
}

impl StudentRecord {
    /// One append-log row, without a trailing newline.
    ///
    /// Fields are joined as-is; a comma inside a name or email corrupts the row.
    pub fn csv_line(&self) -> String {
        format!(
            "{},{},{},{},{},{},{}",
            self.student_id,
            self.first_name,
            self.last_name,
            self.gender.code(),
            self.department.code(),
            self.date_of_birth.format("%Y-%m-%d"),
            self.email
        )
    }

    /// Human-readable one-line summary shown after a registration.
    pub fn summary(&self) -> String {
        format!(
            "ID: {} | {} {} | {} | {} | {} | {}",
            self.student_id,
            self.first_name,
            self.last_name,
            self.gender.code(),
            self.department.code(),
            self.date_of_birth.format("%Y-%m-%d"),
            self.email
        )
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;

    use super::*;

    fn record() -> StudentRecord {
        StudentRecord {
            student_id: StudentId::new(2025, 1),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            gender: Gender::Female,
            department: Department::ComputerScienceAndEngineering,
            date_of_birth: NaiveDate::from_ymd_opt(2001, 12, 10).unwrap(),
            email: "ada@example.com".to_string(),
        }
    }

    #[test]
    fn test_student_id_format() {
        assert_eq!(StudentId::new(2025, 1).as_str(), "2025-00001");
        assert_eq!(StudentId::new(2025, 12345).as_str(), "2025-12345");
        assert_eq!(StudentId::new(2025, 123456).as_str(), "2025-123456");
    }

    #[test]
    fn test_student_id_parse() {
        let id = StudentId::parse("2025-00042").unwrap();
        assert_eq!(id.year(), Some(2025));
        assert_eq!(id.sequence(), Some(42));

        assert!(StudentId::parse("2025-").is_none());
        assert!(StudentId::parse("25-00001").is_none());
        assert!(StudentId::parse("2025-00a01").is_none());
        assert!(StudentId::parse("StudentID").is_none());
    }

    #[test]
    fn test_csv_line_column_order() {
        assert_eq!(
            record().csv_line(),
            "2025-00001,Ada,Lovelace,F,CSE,2001-12-10,ada@example.com"
        );
    }

    #[test]
    fn test_summary() {
        assert_eq!(
            record().summary(),
            "ID: 2025-00001 | Ada Lovelace | F | CSE | 2001-12-10 | ada@example.com"
        );
    }

    #[test]
    fn test_department_codes() {
        assert_eq!(Department::ElectronicsAndCommunication.code(), "E&C");
        assert_eq!(Department::ComputerScienceAndEngineering.to_string(), "CSE");
        assert_eq!(
            Department::from_str("e&c").unwrap(),
            Department::ElectronicsAndCommunication
        );
        assert_eq!(
            Department::from_str("Computer Science and Engineering").unwrap(),
            Department::ComputerScienceAndEngineering
        );
        assert!(Department::from_str("Physics").is_err());
    }

    #[test]
    fn test_gender_codes() {
        assert_eq!(Gender::from_str("m").unwrap(), Gender::Male);
        assert_eq!(Gender::from_str("Female").unwrap(), Gender::Female);
        assert_eq!(Gender::Male.code(), "M");
        assert!(Gender::from_str("X").is_err());
    }
}
