use serde::{Deserialize, Serialize};
use std::fmt;

/// Tables of the remote store that take part in backups.
///
/// Declaration order is the export/import order and the key order of a
/// serialized snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableName {
    Students,
    Teachers,
    Classes,
    Grades,
    Payments,
    PaymentTypes,
    SchoolYears,
    SchoolSettings,
    Subjects,
}

impl TableName {
    pub const ALL: [TableName; 9] = [
        TableName::Students,
        TableName::Teachers,
        TableName::Classes,
        TableName::Grades,
        TableName::Payments,
        TableName::PaymentTypes,
        TableName::SchoolYears,
        TableName::SchoolSettings,
        TableName::Subjects,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TableName::Students => "students",
            TableName::Teachers => "teachers",
            TableName::Classes => "classes",
            TableName::Grades => "grades",
            TableName::Payments => "payments",
            TableName::PaymentTypes => "payment_types",
            TableName::SchoolYears => "school_years",
            TableName::SchoolSettings => "school_settings",
            TableName::Subjects => "subjects",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let needle = value.trim();
        Self::ALL.into_iter().find(|table| table.as_str() == needle)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
