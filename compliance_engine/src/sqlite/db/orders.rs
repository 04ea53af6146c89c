use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Money, NewOrder, Order, OrderId, OrderStatusType, SellerId},
    traits::LedgerError,
};

/// Inserts the order into the database, returning `false` in the second slot if the order
/// already exists.
pub async fn idempotent_insert(order: NewOrder, conn: &mut SqliteConnection) -> Result<(Order, bool), LedgerError> {
    let inserted = match fetch_order_by_order_id(&order.order_id, conn).await? {
        Some(order) => (order, false),
        None => {
            let order = insert_order(order, conn).await?;
            debug!("🗃️ Order [{}] inserted with id {}", order.order_id, order.id);
            (order, true)
        },
    };
    Ok(inserted)
}

/// Inserts a new order. Not atomic on its own; embed the call in a transaction and pass
/// `&mut *tx` when the insert must be paired with the gate evaluation.
async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, LedgerError> {
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                seller_id,
                buyer_id,
                total_price,
                currency,
                payment_provider,
                payment_ref
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(order.order_id)
    .bind(order.seller_id)
    .bind(order.buyer_id)
    .bind(order.total_price)
    .bind(order.currency)
    .bind(order.payment_provider)
    .bind(order.payment_ref)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

/// The seller's unfulfilled (paid or shipped) order totals, grouped by currency. Conversion into
/// platform currency happens in the caller, which has access to the rate table.
pub async fn exposure_by_currency(
    seller_id: SellerId,
    conn: &mut SqliteConnection,
) -> Result<Vec<(String, Money)>, sqlx::Error> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT currency, COALESCE(SUM(total_price), 0) FROM orders WHERE seller_id = $1 AND status IN ('Paid', \
         'Shipped') GROUP BY currency",
    )
    .bind(seller_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(|(currency, total)| (currency, Money::from(total))).collect())
}

/// Guarded status transition: the update only applies while the order is still in `from`, so two
/// racing transitions cannot both succeed.
pub async fn transition_status(
    order_id: &OrderId,
    from: OrderStatusType,
    to: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Order, LedgerError> {
    let updated = sqlx::query_as::<_, Order>(
        "UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE order_id = $2 AND status = $3 RETURNING *",
    )
    .bind(to)
    .bind(order_id.as_str())
    .bind(from)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(order) => Ok(order),
        None => {
            let existing =
                fetch_order_by_order_id(order_id, conn).await?.ok_or_else(|| LedgerError::OrderNotFound(order_id.clone()))?;
            Err(LedgerError::InvalidOrderTransition(order_id.clone(), existing.status, to))
        },
    }
}
