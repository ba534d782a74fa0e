pub mod store;

pub use store::{
    ProposalDraft, ProposalError, ProposalFilters, ProposalPage, ProposalRecord, ProposalStatus,
    ProposalStore, RiskLevel,
};
