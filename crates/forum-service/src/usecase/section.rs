//! Section use-case. Every mutation is reserved to administrators.

use std::sync::Arc;

use forum_core::policy::require_admin;
use forum_core::{
    EntityId, ForumResult, Pagination, Section, SectionAdd, SectionEdit, SectionFilters,
    SectionSort, Session,
};
use tracing::info;

use super::{enriched, single};
use crate::service::SectionService;

pub struct SectionUseCase {
    sections: Arc<SectionService>,
}

impl SectionUseCase {
    pub(crate) fn new(sections: Arc<SectionService>) -> Self {
        SectionUseCase { sections }
    }

    pub async fn add(&self, sess: &Session, section: SectionAdd) -> ForumResult<Section> {
        enriched(sess, async {
            require_admin(sess)?;

            self.sections
                .do_transaction(sess, |tx| async move {
                    let id = self.sections.add(&tx, section).await?;
                    self.fetch(&tx, id).await
                })
                .await
        })
        .await
    }

    pub async fn edit(&self, sess: &Session, edit: SectionEdit) -> ForumResult<Section> {
        enriched(sess, async {
            require_admin(sess)?;

            self.sections
                .do_transaction(sess, |tx| async move {
                    let id = edit.id;
                    self.sections.edit(&tx, edit).await?;
                    self.fetch(&tx, id).await
                })
                .await
        })
        .await
    }

    /// Removes the section with its topics and their posts.
    pub async fn delete(&self, sess: &Session, id: EntityId) -> ForumResult<()> {
        enriched(sess, async {
            require_admin(sess)?;
            self.sections.delete(sess, id).await
        })
        .await?;

        info!(session_id = %sess.id, section_id = id, "Section removed");
        Ok(())
    }

    pub async fn by_id(&self, sess: &Session, id: EntityId) -> ForumResult<Section> {
        enriched(sess, self.fetch(sess, id)).await
    }

    pub async fn all(
        &self,
        sess: &Session,
        filters: SectionFilters,
        pagination: Option<Pagination>,
        sort: Option<SectionSort>,
    ) -> ForumResult<Vec<Section>> {
        enriched(sess, self.sections.all(sess, filters, pagination, sort)).await
    }

    async fn fetch(&self, sess: &Session, id: EntityId) -> ForumResult<Section> {
        let sections = self
            .sections
            .all(sess, SectionFilters::by_ids(vec![id]), None, None)
            .await?;
        single(sections, "Section", id)
    }
}
