pub mod config;
pub mod error;
pub mod filing;
pub mod panel;
pub mod schedule;

pub use config::{OutputFormat, RunConfig};
pub use error::{DateError, QuarterError, QuarterStatus};
pub use filing::{FilingTable, ReportingDate};
pub use panel::{run, PanelReport, PanelRow, QuarterOutcome, QuarterSummary};
pub use schedule::{Category, Component, RegimeTable};
