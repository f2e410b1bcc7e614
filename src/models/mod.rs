pub mod company;
pub mod identity;

pub use company::{Company, CompanyStatus, CompanyWithRole, MemberRole, MembershipRecord};
pub use identity::Identity;
