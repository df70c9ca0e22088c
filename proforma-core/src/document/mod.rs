//! Quote document layout and text rendering.

pub mod format;
pub mod layout;

pub use format::{PAGE_WIDTH, format_money, format_percent, truncate_text, wrap_text};
pub use layout::{
    AdvisorBlock, CustomerBlock, Document, DocumentSource, FooterBand, HeaderBand, ItemBlock, Page,
    TotalsLine,
};
