use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Closed set of documents the service can produce.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DocumentType {
    OfferLetter,
    SalarySlip,
    IncrementLetter,
    ExperienceLetter,
    RelievingLetter,
    /// Offer letter followed by a salary slip.
    OfferAndSalary,
}

/// Wizard fields a document cannot be produced without.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    FullName,
    Designation,
    JoiningDate,
    ResignationDate,
}

impl RequiredField {
    pub fn name(self) -> &'static str {
        match self {
            RequiredField::FullName => "full_name",
            RequiredField::Designation => "designation",
            RequiredField::JoiningDate => "joining_date",
            RequiredField::ResignationDate => "resignation_date",
        }
    }
}

impl DocumentType {
    /// Renderable parts in generation order.
    pub fn parts(self) -> &'static [DocumentType] {
        match self {
            DocumentType::OfferLetter => &[DocumentType::OfferLetter],
            DocumentType::SalarySlip => &[DocumentType::SalarySlip],
            DocumentType::IncrementLetter => &[DocumentType::IncrementLetter],
            DocumentType::ExperienceLetter => &[DocumentType::ExperienceLetter],
            DocumentType::RelievingLetter => &[DocumentType::RelievingLetter],
            DocumentType::OfferAndSalary => &[DocumentType::OfferLetter, DocumentType::SalarySlip],
        }
    }

    /// The part shown when no sub-document is named.
    pub fn primary_part(self) -> DocumentType {
        self.parts()[0]
    }

    pub fn is_composite(self) -> bool {
        self.parts().len() > 1
    }

    pub fn required_fields(self) -> &'static [RequiredField] {
        match self {
            DocumentType::OfferLetter | DocumentType::OfferAndSalary => {
                &[RequiredField::FullName, RequiredField::Designation]
            }
            DocumentType::SalarySlip | DocumentType::IncrementLetter => &[RequiredField::FullName],
            DocumentType::ExperienceLetter => {
                &[RequiredField::FullName, RequiredField::JoiningDate]
            }
            DocumentType::RelievingLetter => {
                &[RequiredField::FullName, RequiredField::ResignationDate]
            }
        }
    }

    /// Whether selected months and their labels are shown for this type.
    pub fn uses_months(self) -> bool {
        matches!(self, DocumentType::SalarySlip | DocumentType::OfferAndSalary)
    }

    /// "increment_letter" -> "Increment Letter"
    pub fn title(self) -> String {
        self.as_ref()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Document {
    #[schema(example = 10)]
    pub id: u64,
    pub employee_id: u64,
    #[sqlx(try_from = "String")]
    pub document_type: DocumentType,
    #[schema(example = "salary_slip_January_2024.pdf")]
    pub filename: String,
    pub file_path: String,
    #[schema(example = "january")]
    pub month: Option<String>,
    #[schema(example = 2024)]
    pub year: Option<i32>,
    #[schema(value_type = String, format = "date-time")]
    pub generated_at: NaiveDateTime,
    #[schema(example = "admin")]
    pub generated_by: String,
}

impl TryFrom<String> for DocumentType {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    pub employee_id: u64,
    pub document_type: DocumentType,
    pub filename: String,
    pub file_path: String,
    pub month: Option<String>,
    pub year: Option<i32>,
    pub generated_at: NaiveDateTime,
    pub generated_by: String,
}

impl NewDocument {
    /// The row as stored under `id`.
    pub fn stored(self, id: u64) -> Document {
        Document {
            id,
            employee_id: self.employee_id,
            document_type: self.document_type,
            filename: self.filename,
            file_path: self.file_path,
            month: self.month,
            year: self.year,
            generated_at: self.generated_at,
            generated_by: self.generated_by,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn offer_and_salary_fans_out_in_order() {
        assert_eq!(
            DocumentType::OfferAndSalary.parts(),
            &[DocumentType::OfferLetter, DocumentType::SalarySlip]
        );
        assert_eq!(DocumentType::OfferAndSalary.primary_part(), DocumentType::OfferLetter);
        assert!(DocumentType::OfferAndSalary.is_composite());
        assert!(!DocumentType::SalarySlip.is_composite());
    }

    #[test]
    fn parses_wire_names() {
        assert_eq!("offer_and_salary".parse::<DocumentType>(), Ok(DocumentType::OfferAndSalary));
        assert_eq!(DocumentType::RelievingLetter.to_string(), "relieving_letter");
        assert!("payslip".parse::<DocumentType>().is_err());
    }

    #[test]
    fn stored_document_keeps_every_field() {
        let generated_at = chrono::NaiveDate::from_ymd_opt(2024, 4, 1)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        let doc = NewDocument {
            employee_id: 7,
            document_type: DocumentType::SalarySlip,
            filename: "salary_slip_March_2024.pdf".into(),
            file_path: "/srv/docs/EMP0007/salary_slip_March_2024.pdf".into(),
            month: Some("march".into()),
            year: Some(2024),
            generated_at,
            generated_by: "admin".into(),
        }
        .stored(42);

        assert_eq!(doc.id, 42);
        assert_eq!(doc.employee_id, 7);
        assert_eq!(doc.filename, "salary_slip_March_2024.pdf");
        assert_eq!(doc.month.as_deref(), Some("march"));
        assert_eq!(doc.year, Some(2024));
        assert_eq!(doc.generated_at, generated_at);
    }

    #[test]
    fn titles_are_word_cased() {
        assert_eq!(DocumentType::IncrementLetter.title(), "Increment Letter");
        assert_eq!(DocumentType::OfferAndSalary.title(), "Offer And Salary");
    }
}
