//! Section service: top-level containers and the section delete cascade.

use std::future::Future;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use forum_core::fields::keys;
use forum_core::ports::SectionStorage;
use forum_core::validation::{
    validate_description, validate_description_edit, validate_id_list, validate_pagination,
    validate_section_name,
};
use forum_core::{
    EntityId, ForumResult, Pagination, Section, SectionAdd, SectionEdit, SectionFilters,
    SectionSort, Session, TopicDelete, TopicFilters,
};

use super::{missing_reference, non_empty, positions};
use crate::adapters::{SectionAdapter, Sibling, TopicAdapter, EVERYTHING};
use crate::config::ForumConfig;
use crate::transaction;

pub struct SectionService {
    storage: Arc<dyn SectionStorage>,
    config: Arc<ForumConfig>,
    topics: Sibling<dyn TopicAdapter>,
}

impl SectionService {
    pub fn new(storage: Arc<dyn SectionStorage>, config: Arc<ForumConfig>) -> Self {
        SectionService {
            storage,
            config,
            topics: Sibling::new("Topic"),
        }
    }

    pub fn attach(&self, topics: Weak<dyn TopicAdapter>) {
        self.topics.attach(topics);
    }

    pub async fn do_transaction<T, F, Fut>(&self, sess: &Session, body: F) -> ForumResult<T>
    where
        F: FnOnce(Session) -> Fut,
        Fut: Future<Output = ForumResult<T>>,
    {
        transaction::do_transaction(&*self.storage, sess, body).await
    }

    pub async fn add(&self, sess: &Session, mut section: SectionAdd) -> ForumResult<EntityId> {
        section.name = validate_section_name(&section.name)?;
        section.description = validate_description(section.description.as_deref())?;

        self.storage.insert(sess, &section).await
    }

    pub async fn edit(&self, sess: &Session, mut edit: SectionEdit) -> ForumResult<()> {
        edit.name = edit.name.as_deref().map(validate_section_name).transpose()?;
        edit.description = validate_description_edit(edit.description.as_deref())?;

        self.do_transaction(sess, |tx| {
            let edit = &edit;
            async move {
                self.exists_by_id(&tx, edit.id).await?;
                self.storage.update(&tx, edit).await
            }
        })
        .await
    }

    /// Deletes the section, its topics and their posts.
    pub async fn delete(&self, sess: &Session, id: EntityId) -> ForumResult<()> {
        self.do_transaction(sess, |tx| async move {
            self.exists_by_id(&tx, id).await?;
            self.storage.delete(&tx, &[id]).await?;

            self.topics
                .get()?
                .mass_delete(&tx, &TopicDelete::by_section_ids(vec![id]))
                .await
        })
        .await
    }

    pub async fn all(
        &self,
        sess: &Session,
        filters: SectionFilters,
        pagination: Option<Pagination>,
        sort: Option<SectionSort>,
    ) -> ForumResult<Vec<Section>> {
        let pagination = self.config.pagination_or_default(pagination);
        let sort = self.config.sort_or_default(sort);
        validate_pagination(&pagination, self.config.max_page_limit)?;
        validate_id_list("IDs", filters.ids.as_ref(), self.config.max_ids())?;

        self.do_transaction(sess, |tx| {
            let filters = &filters;
            async move {
                let sections = self.select(&tx, filters, pagination, sort).await?;
                non_empty(sections, "Sections not found")
            }
        })
        .await
    }

    pub async fn plain_by_id(&self, sess: &Session, id: EntityId) -> ForumResult<Section> {
        self.storage.select_by_id(sess, id).await
    }

    pub async fn exists_by_id(&self, sess: &Session, id: EntityId) -> ForumResult<()> {
        self.plain_by_id(sess, id)
            .await
            .map(|_| ())
            .map_err(|err| missing_reference(err, "Section", id))
    }

    async fn select(
        &self,
        sess: &Session,
        filters: &SectionFilters,
        pagination: Pagination,
        sort: SectionSort,
    ) -> ForumResult<Vec<Section>> {
        let mut sections = self.storage.select_all(sess, filters, pagination, sort).await?;

        if !sections.is_empty() && sess.requested_fields.contains(keys::TOPICS) {
            let ids: Vec<EntityId> = sections.iter().map(|s| s.id).collect();
            let index = positions(&sections, |s| s.id);

            let topics = self
                .topics
                .get()?
                .related(&sess.narrowed_to(keys::TOPICS), TopicFilters::by_section_ids(ids))
                .await?;
            for topic in topics {
                if let Some(&i) = index.get(&topic.section_id) {
                    sections[i].topics.push(topic);
                }
            }
        }

        Ok(sections)
    }
}

#[async_trait]
impl SectionAdapter for SectionService {
    async fn related(&self, sess: &Session, filters: SectionFilters) -> ForumResult<Vec<Section>> {
        let sort = self.config.sort_or_default(None);
        self.select(sess, &filters, EVERYTHING, sort).await
    }

    async fn plain_by_id(&self, sess: &Session, id: EntityId) -> ForumResult<Section> {
        SectionService::plain_by_id(self, sess, id).await
    }

    async fn exists_by_id(&self, sess: &Session, id: EntityId) -> ForumResult<()> {
        SectionService::exists_by_id(self, sess, id).await
    }
}
