pub mod activate;
pub mod latest;
pub mod report;
pub mod status;
pub mod upload;
