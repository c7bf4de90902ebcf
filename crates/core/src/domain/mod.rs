pub mod decision;
pub mod escalation;
pub mod faq;
