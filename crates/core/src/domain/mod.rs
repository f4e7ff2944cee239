pub mod dialogue;
pub mod preference;
pub mod request;
pub mod restaurant;
