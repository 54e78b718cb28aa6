pub mod accounts;
pub mod applications;
pub mod cycles;
pub mod decisions;
pub mod faq;
pub mod health;
pub mod reports;
pub mod reviews;
pub mod whitelist;
