//! User-facing notices (success / warning / error) attached to command
//! responses.

use serde::Serialize;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

impl From<&ApiError> for Notice {
    fn from(err: &ApiError) -> Self {
        Notice::error(err.message.clone())
    }
}

/// A command result together with the notices to show.
#[derive(Debug, Clone, Serialize)]
pub struct Response<T> {
    pub data: T,
    pub notices: Vec<Notice>,
}

impl<T> Response<T> {
    pub fn new(data: T) -> Self {
        Response {
            data,
            notices: Vec::new(),
        }
    }

    pub fn with(mut self, notice: Notice) -> Self {
        self.notices.push(notice);
        self
    }

    pub fn push(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    pub fn has_warnings(&self) -> bool {
        self.notices.iter().any(|n| n.level == NoticeLevel::Warning)
    }
}
