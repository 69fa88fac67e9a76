use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::models::asset::Asset;

fn asset_from_row(row: &PgRow) -> Result<Asset, sqlx::Error> {
    Ok(Asset {
        id: row.try_get("id")?,
        asset_tag: row.try_get("asset_tag")?,
        name: row.try_get("name")?,
        item_type: row.try_get("item_type")?,
        description: row.try_get("description")?,
        location: row.try_get("location")?,
        status: row.try_get("status")?,
        condition: row.try_get("condition")?,
        weight: row.try_get("weight")?,
        last_seen: row.try_get("last_seen")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        notes: row.try_get("notes")?,
    })
}

/// Look up an asset by its canonical (upper-cased) tag.
pub async fn find_by_tag(pool: &PgPool, asset_tag: &str) -> Result<Option<Asset>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, asset_tag, name, item_type, description, location, status,
               condition, weight, last_seen, created_at, updated_at, notes
        FROM assets
        WHERE asset_tag = $1
        "#,
    )
    .bind(asset_tag.to_uppercase())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(asset_from_row).transpose()
}

/// Persist the fields the reconciler is allowed to touch.
pub async fn save_reconciled(pool: &PgPool, asset: &Asset) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE assets
        SET condition = $1,
            weight = $2,
            description = $3,
            last_seen = $4,
            updated_at = $5
        WHERE asset_tag = $6
        "#,
    )
    .bind(&asset.condition)
    .bind(&asset.weight)
    .bind(&asset.description)
    .bind(asset.last_seen)
    .bind(asset.updated_at)
    .bind(&asset.asset_tag)
    .execute(pool)
    .await?;

    Ok(())
}
