//! User-visible session status

use serde::{Deserialize, Serialize};

/// Status of the reader session as shown in the status text region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    #[default]
    Idle,
    FileSelected,
    Validating,
    Success,
    ErrorNoFileSelected,
    ErrorInvalidFormat,
    ErrorCorruptFile,
    ErrorReadFailure,
}

impl Status {
    /// Message for the status region. `file_name` is only used for `FileSelected`.
    pub fn message(&self, file_name: Option<&str>) -> String {
        match self {
            Status::Idle => String::new(),
            Status::FileSelected => match file_name {
                Some(name) => format!("File selected: {}", name),
                None => "File selected".to_string(),
            },
            Status::Validating => "Checking file...".to_string(),
            Status::Success => "File uploaded successfully and is a valid EPUB file.".to_string(),
            Status::ErrorNoFileSelected => "No file selected!".to_string(),
            Status::ErrorInvalidFormat => "Invalid file format. Please upload an EPUB file.".to_string(),
            Status::ErrorCorruptFile => "Error loading EPUB file. It may be corrupted.".to_string(),
            Status::ErrorReadFailure => "Error reading file. It may be corrupted.".to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Status::ErrorNoFileSelected
                | Status::ErrorInvalidFormat
                | Status::ErrorCorruptFile
                | Status::ErrorReadFailure
        )
    }
}
