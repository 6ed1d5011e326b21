use serde::{Deserialize, Serialize};

/// Progress message type
#[derive(Debug, Deserialize, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ProgressType {
    Progress,
    Complete,
    Error,
}

/// Emitted once per item during a batch run. Observation only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    /// Progress type (progress, complete, error)
    pub progress_type: ProgressType,
    /// Items handled so far, this one included
    pub completed: usize,
    /// Items in the run
    pub total: usize,
    /// `round(100 * completed / total)`
    pub percent: u8,
    /// Name of the item just handled
    pub current_name: String,
    /// Set when this item failed and was skipped
    #[serde(default)]
    pub error: Option<String>,
}

impl BatchProgress {
    pub fn new(completed: usize, total: usize, current_name: &str, error: Option<String>) -> Self {
        let progress_type = match (&error, completed == total) {
            (Some(_), _) => ProgressType::Error,
            (None, true) => ProgressType::Complete,
            (None, false) => ProgressType::Progress,
        };

        Self {
            progress_type,
            completed,
            total,
            percent: round_percent(completed, total),
            current_name: current_name.to_string(),
            error,
        }
    }
}

/// Rounds `100 * completed / total` half-up without going through floats.
pub fn round_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total) as u128;
    let total = total as u128;
    ((200 * completed + total) / (2 * total)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(round_percent(1, 2), 50);
        assert_eq!(round_percent(1, 3), 33);
        assert_eq!(round_percent(2, 3), 67);
        assert_eq!(round_percent(1, 8), 13);
        assert_eq!(round_percent(3, 3), 100);
        assert_eq!(round_percent(0, 0), 0);
    }

    #[test]
    fn last_item_is_complete_unless_it_failed() {
        assert_eq!(BatchProgress::new(1, 2, "a", None).progress_type, ProgressType::Progress);
        assert_eq!(BatchProgress::new(2, 2, "b", None).progress_type, ProgressType::Complete);
        let failed = BatchProgress::new(2, 2, "b", Some("oom".into()));
        assert_eq!(failed.progress_type, ProgressType::Error);
        assert_eq!(failed.percent, 100);
    }
}
