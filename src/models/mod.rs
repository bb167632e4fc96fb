// Model exports
pub mod domain;
pub mod records;
pub mod requests;
pub mod responses;

pub use domain::{
    Action, Candidate, City, Decision, ExclusionPolicy, Photo, PhotoId, PhotoSize, RelationStatus,
    Requester, SearchCriteria, Sex, UserId,
};
pub use records::{parse, ParseError, PhotoRecord, Record, UserRecord};
pub use requests::{
    CandidateRequest, DecisionRequest, NextCandidateRequest, PreferencesRequest, RequesterRequest,
};
pub use responses::{
    BlockResponse, CandidateListResponse, DecisionResponse, ErrorResponse, HealthResponse,
    ListUpdateResponse, PreferencesResponse, ResetResponse,
};
