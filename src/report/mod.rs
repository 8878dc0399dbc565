//! Report rendering

mod formatter;
mod markdown;

pub use formatter::{
    DEFAULT_TITLE, DETAILED_CHANGES, EXECUTIVE_SUMMARY, RECOMMENDATIONS, RISK_ASSESSMENT, Report, ReportFormatter,
    ReportSection, SECTION_TITLES,
};
pub use markdown::{demote_headings, extract_section};
