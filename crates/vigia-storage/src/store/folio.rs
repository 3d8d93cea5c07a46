use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};

use crate::entities::folio_sequence::{self, Column, Entity};
use crate::entities::preventive_action;
use crate::error::{Result, StorageError};

/// Claims the next counter value for `prefix`.
///
/// Runs as a single upsert, so callers inside a transaction hold the row
/// until commit and a rollback returns the number.
pub(crate) async fn next_sequence_value<C: ConnectionTrait>(conn: &C, prefix: &str) -> Result<i64> {
    let am = folio_sequence::ActiveModel {
        prefix: Set(prefix.to_owned()),
        last_value: Set(1),
    };
    Entity::insert(am)
        .on_conflict(
            OnConflict::column(Column::Prefix)
                .value(Column::LastValue, Expr::col(Column::LastValue).add(1))
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    let row = Entity::find_by_id(prefix.to_owned())
        .one(conn)
        .await?
        .ok_or_else(|| StorageError::not_found("folio sequence", prefix))?;
    Ok(row.last_value)
}

pub(crate) async fn action_folio_exists<C: ConnectionTrait>(conn: &C, folio: &str) -> Result<bool> {
    let count = preventive_action::Entity::find()
        .filter(preventive_action::Column::Folio.eq(folio))
        .count(conn)
        .await?;
    Ok(count > 0)
}

/// First free variant of a generated action folio: `base`, then `base-2`,
/// `base-3`, ...
pub(crate) async fn unique_action_folio<C: ConnectionTrait>(conn: &C, base: &str) -> Result<String> {
    if !action_folio_exists(conn, base).await? {
        return Ok(base.to_owned());
    }
    let mut n = 2u32;
    loop {
        let candidate = format!("{base}-{n}");
        if !action_folio_exists(conn, &candidate).await? {
            return Ok(candidate);
        }
        n += 1;
    }
}
