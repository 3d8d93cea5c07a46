use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, Order,
    QueryFilter, QueryOrder,
};
use vigia_common::status::CatalogKind;
use vigia_common::types::{CatalogItem, CatalogSeedItem};

use crate::entities::catalog_item::{self, Column, Entity};
use crate::error::{Result, StorageError};
use crate::store::{now, parse_column, Store};

/// Outcome of a catalog sync or import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogSync {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

fn to_catalog_item(m: catalog_item::Model) -> Result<CatalogItem> {
    Ok(CatalogItem {
        kind: parse_column("catalog_items.kind", &m.kind)?,
        id: m.id,
        name: m.name,
        abbreviation: m.abbreviation,
        parent_id: m.parent_id,
        group_key: m.group_key,
        sort_order: m.sort_order,
        active: m.active,
    })
}

/// Looks up an active catalog entry by exact name. Nested kinds are matched
/// within `parent_id` when one is given.
pub(crate) async fn resolve<C: ConnectionTrait>(
    conn: &C,
    kind: CatalogKind,
    name: &str,
    parent_id: Option<i32>,
) -> Result<catalog_item::Model> {
    let mut q = Entity::find()
        .filter(Column::Kind.eq(kind.as_str()))
        .filter(Column::Name.eq(name.trim()))
        .filter(Column::Active.eq(true));
    if let Some(parent) = parent_id {
        q = q.filter(Column::ParentId.eq(parent));
    }
    q.order_by(Column::Id, Order::Asc)
        .one(conn)
        .await?
        .ok_or_else(|| StorageError::not_found(kind.label(), name.trim()))
}

/// Looks up a general status by name within a group such as `compliance`.
pub(crate) async fn find_general_status<C: ConnectionTrait>(
    conn: &C,
    group_key: &str,
    name: &str,
) -> Result<Option<catalog_item::Model>> {
    Ok(Entity::find()
        .filter(Column::Kind.eq(CatalogKind::GeneralStatus.as_str()))
        .filter(Column::GroupKey.eq(group_key))
        .filter(Column::Name.eq(name))
        .filter(Column::Active.eq(true))
        .one(conn)
        .await?)
}

impl Store {
    /// Active entries of one catalog ordered for display. `parent_id`
    /// narrows nested catalogs, `group_key` narrows general statuses.
    pub async fn list_catalog(
        &self,
        kind: CatalogKind,
        parent_id: Option<i32>,
        group_key: Option<&str>,
    ) -> Result<Vec<CatalogItem>> {
        let mut q = Entity::find()
            .filter(Column::Kind.eq(kind.as_str()))
            .filter(Column::Active.eq(true));
        if let Some(parent) = parent_id {
            q = q.filter(Column::ParentId.eq(parent));
        }
        if let Some(group) = group_key {
            q = q.filter(Column::GroupKey.eq(group));
        }
        let rows = q
            .order_by(Column::GroupKey, Order::Asc)
            .order_by(Column::SortOrder, Order::Asc)
            .order_by(Column::Name, Order::Asc)
            .all(self.db())
            .await?;
        rows.into_iter().map(to_catalog_item).collect()
    }

    /// Active entry by exact name; a miss is [`StorageError::NotFound`].
    pub async fn find_catalog_item(
        &self,
        kind: CatalogKind,
        name: &str,
        parent_id: Option<i32>,
    ) -> Result<CatalogItem> {
        to_catalog_item(resolve(self.db(), kind, name, parent_id).await?)
    }

    /// Writes catalog entries in order, so parents listed earlier can be
    /// referenced by later children.
    ///
    /// Existing entries (same kind, name, parent and group) are refreshed
    /// when `overwrite` is set and skipped otherwise.
    pub async fn sync_catalog(
        &self,
        items: &[CatalogSeedItem],
        overwrite: bool,
    ) -> Result<CatalogSync> {
        let mut outcome = CatalogSync::default();
        for item in items {
            let parent_id = match (&item.parent, item.kind.parent_kind()) {
                (Some(parent), Some(parent_kind)) => {
                    Some(resolve(self.db(), parent_kind, parent, None).await?.id)
                }
                (Some(_), None) => {
                    return Err(StorageError::Validation(format!(
                        "{} entries cannot have a parent",
                        item.kind
                    )));
                }
                (None, _) => None,
            };

            let mut q = Entity::find()
                .filter(Column::Kind.eq(item.kind.as_str()))
                .filter(Column::Name.eq(item.name.as_str()));
            q = match parent_id {
                Some(p) => q.filter(Column::ParentId.eq(p)),
                None => q.filter(Column::ParentId.is_null()),
            };
            q = match item.group_key.as_deref() {
                Some(g) => q.filter(Column::GroupKey.eq(g)),
                None => q.filter(Column::GroupKey.is_null()),
            };
            let sort_order = item.sort_order.unwrap_or(0);

            match q.one(self.db()).await? {
                Some(existing) if overwrite => {
                    if existing.abbreviation == item.abbreviation
                        && existing.sort_order == sort_order
                        && existing.active
                    {
                        outcome.skipped += 1;
                        continue;
                    }
                    let mut am: catalog_item::ActiveModel = existing.into();
                    am.abbreviation = Set(item.abbreviation.clone());
                    am.sort_order = Set(sort_order);
                    am.active = Set(true);
                    am.updated_at = Set(now());
                    am.update(self.db()).await?;
                    outcome.updated += 1;
                }
                Some(_) => outcome.skipped += 1,
                None => {
                    let ts = now();
                    let am = catalog_item::ActiveModel {
                        kind: Set(item.kind.as_str().to_owned()),
                        name: Set(item.name.clone()),
                        abbreviation: Set(item.abbreviation.clone()),
                        parent_id: Set(parent_id),
                        group_key: Set(item.group_key.clone()),
                        sort_order: Set(sort_order),
                        active: Set(true),
                        created_at: Set(ts),
                        updated_at: Set(ts),
                        ..Default::default()
                    };
                    am.insert(self.db()).await?;
                    outcome.inserted += 1;
                }
            }
        }
        Ok(outcome)
    }
}
