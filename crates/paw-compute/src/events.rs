//! Compute event kinds.

pub const PROVIDER_REGISTERED: &str = "compute_provider_registered";
pub const SIGNING_KEY_REGISTERED: &str = "compute_signing_key_registered";
pub const REQUEST_SUBMITTED: &str = "compute_request_submitted";
pub const REQUEST_CANCELLED: &str = "compute_request_cancelled";
pub const RESULT_VERIFIED: &str = "compute_result_verified";
pub const ESCROW_RELEASED: &str = "compute_escrow_released";
pub const ESCROW_REFUNDED: &str = "compute_escrow_refunded";
pub const DISPUTE_OPENED: &str = "compute_dispute_opened";
pub const DISPUTE_VOTE: &str = "compute_dispute_vote";
pub const DISPUTE_UPHELD: &str = "compute_dispute_upheld";
pub const DISPUTE_REJECTED: &str = "compute_dispute_rejected";
pub const DISPUTE_APPEALED: &str = "compute_dispute_appealed";
pub const PROVIDER_SLASHED: &str = "compute_provider_slashed";
pub const CATASTROPHIC_FAILURE: &str = "compute_catastrophic_failure";
