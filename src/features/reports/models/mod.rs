mod report;

pub use report::{CreateReport, CrimeType, GeoPoint, Report, ReportCandidate, ReportFilter};
