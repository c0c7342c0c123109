pub mod report_handler;

pub use report_handler::{
    get_report, list_crime_types, list_reports, nearby_reports, submit_report, ReportState,
};
