use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqItem {
    pub faq_id: Uuid,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub position: u32,
}

/// Create-or-replace payload. Without an id a new entry is created.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertFaq {
    #[serde(default)]
    pub faq_id: Option<Uuid>,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub position: Option<u32>,
}

pub fn sort_by_position(items: &mut [FaqItem]) {
    items.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.question.cmp(&b.question)));
}
