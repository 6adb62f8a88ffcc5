//! Forwarding of the `Repository` surface to an inner field.
//!
//! Entity-specific contracts are traits extending `Repository<E>`; their
//! direct and cached implementations are newtypes over `DirectRepository`
//! and `CachedRepository`. `delegate_repository!` writes the forwarding impl
//! so the newtypes only add what the contract adds.

/// Implements `Repository<$entity>` for `$ty` by forwarding every operation
/// to `self.$field`.
///
/// ```ignore
/// pub struct DirectPostRepository {
///     inner: DirectRepository<Post>,
/// }
///
/// repocache::delegate_repository!(DirectPostRepository => Post, inner);
/// impl PostRepository for DirectPostRepository {}
/// ```
#[macro_export]
macro_rules! delegate_repository {
    ($ty:ty => $entity:ty, $field:ident) => {
        const _: () = {
            use $crate::__private::{
                Attributes, Columns, DeleteTarget, EntityId, Page, PageRequest, QueryBuilder,
                Repository, Result, SortOrder, UpdateTarget,
            };

            #[$crate::__private::async_trait]
            impl Repository<$entity> for $ty {
                fn query_builder(&self) -> QueryBuilder<$entity> {
                    self.$field.query_builder()
                }

                async fn all(&self, columns: Columns) -> Result<Vec<$entity>> {
                    self.$field.all(columns).await
                }

                async fn find(&self, id: EntityId, columns: Columns) -> Result<Option<$entity>> {
                    self.$field.find(id, columns).await
                }

                async fn find_by_slug(&self, slug: &str) -> Result<Option<$entity>> {
                    self.$field.find_by_slug(slug).await
                }

                async fn first_by_attributes(
                    &self,
                    attributes: &Attributes,
                ) -> Result<Option<$entity>> {
                    self.$field.first_by_attributes(attributes).await
                }

                async fn all_by_attributes(
                    &self,
                    attributes: &Attributes,
                    order_by: Option<&str>,
                    sort_order: SortOrder,
                ) -> Result<Vec<$entity>> {
                    self.$field
                        .all_by_attributes(attributes, order_by, sort_order)
                        .await
                }

                fn with(&self, relations: &[&str]) -> QueryBuilder<$entity> {
                    self.$field.with(relations)
                }

                fn without(&self, relations: &[&str]) -> QueryBuilder<$entity> {
                    self.$field.without(relations)
                }

                async fn has(&self, relation: &str) -> Result<Vec<$entity>> {
                    self.$field.has(relation).await
                }

                async fn paginate(&self, request: PageRequest) -> Result<Page<$entity>> {
                    self.$field.paginate(request).await
                }

                async fn create(&self, attributes: Attributes) -> Result<$entity> {
                    self.$field.create(attributes).await
                }

                async fn update(
                    &self,
                    target: UpdateTarget<$entity>,
                    attributes: Attributes,
                ) -> Result<bool> {
                    self.$field.update(target, attributes).await
                }

                async fn delete(&self, target: DeleteTarget<$entity>) -> Result<usize> {
                    self.$field.delete(target).await
                }

                async fn delete_by_id(&self, id: EntityId) -> Result<usize> {
                    self.$field.delete_by_id(id).await
                }

                async fn force_delete(&self, entity: &$entity) -> Result<bool> {
                    self.$field.force_delete(entity).await
                }

                async fn clear_cache(&self) -> Result<bool> {
                    self.$field.clear_cache().await
                }

                fn new_entity_instance(&self, attributes: Attributes) -> Result<$entity> {
                    self.$field.new_entity_instance(attributes)
                }

                async fn truncate(&self) -> Result<()> {
                    self.$field.truncate().await
                }
            }
        };
    };
}
