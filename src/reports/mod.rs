pub mod formatters;

pub use formatters::{formatter_for, JsonFormatter, MarkdownFormatter, QueryReport, ReportFormatter, TextFormatter};
