pub mod duplicates;
pub mod locale_fixer;
pub mod transporter;

pub use locale_fixer::{LocaleFixOutcome, LocaleFixReport, LocaleFixer};
pub use transporter::{TransferOutcome, TransferReport, TransferredPage, Transporter};
