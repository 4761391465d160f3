use serde::{Deserialize, Serialize};

/// A scheduled interval on one planner day, in minutes since midnight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBlock {
    /// Day key (`YYYY-MM-DD`)
    pub day: String,
    pub start: i32,
    pub end: i32,
}

impl TimeBlock {
    pub fn new(day: impl Into<String>, start: i32, end: i32) -> Self {
        TimeBlock {
            day: day.into(),
            start,
            end,
        }
    }

    pub fn duration(&self) -> i32 {
        self.end.saturating_sub(self.start)
    }

    /// `HH:MM-HH:MM`
    pub fn span_label(&self) -> String {
        format!("{}-{}", minute_label(self.start), minute_label(self.end))
    }
}

/// Format minutes since midnight as `HH:MM`
pub fn minute_label(minutes: i32) -> String {
    format!("{:02}:{:02}", minutes.div_euclid(60), minutes.rem_euclid(60))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels() {
        let block = TimeBlock::new("2025-05-05", 540, 630);
        assert_eq!(block.duration(), 90);
        assert_eq!(block.span_label(), "09:00-10:30");
        assert_eq!(minute_label(0), "00:00");
        assert_eq!(minute_label(24 * 60), "24:00");
    }
}
