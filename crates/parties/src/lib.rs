//! Parties referenced by commercial documents: the selling company and the
//! client/contact partners an order is addressed to.

pub mod company;
pub mod partner;

pub use company::Company;
pub use partner::{ContactInfo, Partner, PartnerKind};
