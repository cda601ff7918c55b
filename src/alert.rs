//! Alert fragments for displaying success and error messages to users.

use maud::{Markup, html};

/// Alert message types for styling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlertKind {
    Success,
    Error,
}

/// Renders alert messages with appropriate styling.
#[derive(Debug, Clone)]
pub struct AlertView<'a> {
    pub kind: AlertKind,
    pub message: &'a str,
    pub details: &'a str,
}

impl<'a> AlertView<'a> {
    /// Create a new success alert.
    pub fn success(message: &'a str, details: &'a str) -> Self {
        Self {
            kind: AlertKind::Success,
            message,
            details,
        }
    }

    /// Create a new error alert.
    pub fn error(message: &'a str, details: &'a str) -> Self {
        Self {
            kind: AlertKind::Error,
            message,
            details,
        }
    }

    /// Create a new error alert without details.
    pub fn error_simple(message: &'a str) -> Self {
        Self::error(message, "")
    }

    pub fn into_html(self) -> Markup {
        let (container_style, icon) = match self.kind {
            AlertKind::Success => (
                "p-4 mb-4 text-sm text-green-800 rounded-lg bg-green-50 \
                dark:bg-gray-800 dark:text-green-400",
                "✓",
            ),
            AlertKind::Error => (
                "p-4 mb-4 text-sm text-red-800 rounded-lg bg-red-50 \
                dark:bg-gray-800 dark:text-red-400",
                "✗",
            ),
        };

        html!(
            div class=(container_style) role="alert"
            {
                span class="font-medium" { (icon) " " (self.message) }

                @if !self.details.is_empty()
                {
                    p { (self.details) }
                }
            }
        )
    }
}
