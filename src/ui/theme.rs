use owo_colors::Style;
use std::sync::OnceLock;

use crate::job::JobStatus;

static THEME: OnceLock<Theme> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub warn: Style,
    pub dim: Style,
    pub muted: Style,
    /// Queued and in-progress jobs
    pub pending: Style,
}

impl Theme {
    /// Colors only when stdout is a terminal
    pub fn detect() -> Self {
        if console::Term::stdout().is_term() {
            Self::colored()
        } else {
            Self::plain()
        }
    }

    pub fn colored() -> Self {
        Self {
            header: Style::new().cyan().bold(),
            success: Style::new().green().bold(),
            error: Style::new().red().bold(),
            warn: Style::new().yellow().bold(),
            dim: Style::new().white().dimmed(),
            muted: Style::new().bright_black(),
            pending: Style::new().blue(),
        }
    }

    pub fn plain() -> Self {
        Self {
            header: Style::new(),
            success: Style::new(),
            error: Style::new(),
            warn: Style::new(),
            dim: Style::new(),
            muted: Style::new(),
            pending: Style::new(),
        }
    }

    pub fn for_status(&self, status: JobStatus) -> Style {
        match status {
            JobStatus::Completed => self.success.clone(),
            JobStatus::Queued | JobStatus::InProgress => self.pending.clone(),
            JobStatus::Missing => self.warn.clone(),
            JobStatus::Any => self.muted.clone(),
            _ => self.error.clone(),
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failures_share_the_error_style() {
        let theme = Theme::colored();
        for status in JobStatus::all() {
            if status.is_failure() {
                assert_eq!(format!("{:?}", theme.for_status(*status)), format!("{:?}", theme.error));
            }
        }
    }
}
