// Fusion Module - metrics records → verdict → report
//
// Tier 1 (extractors) produces independent metrics records; this module
// combines them: the risk aggregator scores them into a verdict and the
// report assembler composes records, verdict, conclusions and artifacts into
// the report.

pub mod conclusion;
pub mod findings;
pub mod report_assembler;
pub mod risk_aggregator;

pub use report_assembler::ForensicReportAssembler;
pub use risk_aggregator::RiskAggregator;
