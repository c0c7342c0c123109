mod report_dto;

pub use report_dto::{
    CrimeTypeDto, ListReportsQueryParams, LocationDto, NearbyQueryParams, ReportResponseDto,
    SubmitReportDto,
};
