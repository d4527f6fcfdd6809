pub mod analysis;
pub mod mailing_list;
pub mod registration;

pub use analysis::{AnalysisProvider, MockAnalysisProvider};
pub use mailing_list::{Contact, MailchimpClient, MailingList, UnconfiguredMailingList};
pub use registration::RegistrationService;
