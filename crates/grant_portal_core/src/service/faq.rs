use uuid::Uuid;

use crate::error::{PortalError, Result};
use crate::faq::{FaqItem, UpsertFaq};
use crate::principal::Principal;

use super::PortalService;

impl PortalService {
    pub async fn list_faqs(&self) -> Result<Vec<FaqItem>> {
        let mut items = self.store.list_faqs().await?;
        crate::faq::sort_by_position(&mut items);
        Ok(items)
    }

    /// New entries without a position go to the end of the list.
    pub async fn upsert_faq(&self, principal: &Principal, faq: UpsertFaq) -> Result<FaqItem> {
        principal.require_admin()?;
        if faq.question.trim().is_empty() {
            return Err(PortalError::InvalidInput("question is required".into()));
        }
        let position = match faq.position {
            Some(p) => p,
            None => {
                let existing = self.store.list_faqs().await?;
                faq.faq_id
                    .and_then(|id| existing.iter().find(|f| f.faq_id == id))
                    .map(|f| f.position)
                    .unwrap_or_else(|| {
                        existing.iter().map(|f| f.position + 1).max().unwrap_or(0)
                    })
            }
        };
        let item = FaqItem {
            faq_id: faq.faq_id.unwrap_or_else(Uuid::new_v4),
            question: faq.question.trim().to_string(),
            answer: faq.answer,
            position,
        };
        self.store.save_faq(&item).await?;
        tracing::info!(faq_id = %item.faq_id, "faq saved");
        Ok(item)
    }

    pub async fn delete_faq(&self, principal: &Principal, faq_id: Uuid) -> Result<()> {
        principal.require_admin()?;
        self.store.delete_faq(faq_id).await?;
        tracing::info!(%faq_id, "faq deleted");
        Ok(())
    }
}
