pub mod company;
pub mod whoami;
