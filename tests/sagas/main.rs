//! Saga Tests
//!
//! Each saga runs against an in-memory ledger. The request phases commit
//! state and outbox messages together; the reply phases are driven either
//! directly or through the simulated core-banking system.


mod auto_renewal;
mod card_issuance;
mod card_status;
mod deposit;
mod end_to_end;
mod withdrawal;
