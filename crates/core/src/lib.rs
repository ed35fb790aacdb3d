pub mod config;
pub mod domain;
pub mod errors;
pub mod qualification;
pub mod token;

pub use domain::crm::{
    ConversationOutcome, CrmContactId, CrmLeadId, NewContact, NewLead, NewNote,
};
pub use domain::listing::{format_price, ListingQuery, PropertyListing, SearchCriteria};
pub use domain::message::InboundMessage;
pub use errors::{RelayError, Upstream, UpstreamError};
pub use qualification::LeadPolicy;
pub use token::{FileTokenStore, TokenHolder, TokenStore};
