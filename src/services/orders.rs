use crate::{
    cart::CartLine,
    entities::{order, order_item, order_log},
    errors::ServiceError,
    events::{Event, EventSender},
    services::pricing::PriceBreakdown,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Status stamped on the audit mirror when an admin removes the live order.
pub const DELETED_STATUS: &str = "Deleted (Admin)";

/// Input for order creation, already validated and priced by the controller.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_name: String,
    pub phone_number: String,
    pub location: String,
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<CartLine>,
    pub breakdown: PriceBreakdown,
    pub promo_label: Option<String>,
    pub payment_method: String,
}

/// Partial update applied by the admin console. Absent fields are left
/// untouched; present fields overwrite (last write wins, no transition
/// restrictions on status).
#[derive(Debug, Clone, Default)]
pub struct OrderChanges {
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub assigned_rider_id: Option<String>,
    pub estimated_time: Option<String>,
}

impl OrderChanges {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.payment_status.is_none()
            && self.assigned_rider_id.is_none()
            && self.estimated_time.is_none()
    }
}

/// Durable storage for orders plus their permanent `order_log` mirror.
///
/// Owns both tables exclusively; every write pairs the live record with a
/// field-level update of the matching log entry inside one transaction
/// (the log is never re-appended and never deleted).
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Inserts the order, its item snapshots and the matching log entry in a
    /// single transaction. Either everything lands or nothing does.
    #[instrument(skip(self, new_order), fields(customer = %new_order.customer_name))]
    pub async fn create(&self, new_order: NewOrder) -> Result<order::Model, ServiceError> {
        let now = Utc::now();
        let order_id = format!("ORD-{}", now.timestamp_millis());

        let txn = self.db.begin().await?;

        let order_model = order::ActiveModel {
            id: Set(order_id.clone()),
            customer_name: Set(new_order.customer_name.clone()),
            phone_number: Set(new_order.phone_number.clone()),
            location: Set(new_order.location.clone()),
            lat: Set(new_order.lat.clone()),
            lng: Set(new_order.lng.clone()),
            notes: Set(new_order.notes.clone()),
            subtotal: Set(new_order.breakdown.subtotal),
            discount_amount: Set(new_order.breakdown.discount_amount),
            delivery_fee: Set(new_order.breakdown.delivery_fee),
            total_amount: Set(new_order.breakdown.total),
            promo_code: Set(new_order.promo_label.clone()),
            payment_method: Set(new_order.payment_method.clone()),
            status: Set("New".to_string()),
            payment_status: Set("Pending".to_string()),
            assigned_rider_id: Set(None),
            estimated_time: Set(None),
            rating: Set(None),
            feedback: Set(None),
            date: Set(now),
        }
        .insert(&txn)
        .await?;

        let item_models: Vec<order_item::ActiveModel> = new_order
            .items
            .iter()
            .map(|line| order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id.clone()),
                product_id: Set(line.product_id.clone()),
                name: Set(line.name.clone()),
                price: Set(line.price),
                quantity: Set(line.quantity),
            })
            .collect();
        order_item::Entity::insert_many(item_models).exec(&txn).await?;

        let items_snapshot = serde_json::to_value(&new_order.items)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;

        order_log::ActiveModel {
            id: Set(order_id.clone()),
            customer_name: Set(new_order.customer_name),
            phone_number: Set(new_order.phone_number),
            location: Set(new_order.location),
            lat: Set(new_order.lat),
            lng: Set(new_order.lng),
            notes: Set(new_order.notes),
            items: Set(items_snapshot),
            subtotal: Set(new_order.breakdown.subtotal),
            discount_amount: Set(new_order.breakdown.discount_amount),
            delivery_fee: Set(new_order.breakdown.delivery_fee),
            total_amount: Set(new_order.breakdown.total),
            promo_code: Set(new_order.promo_label),
            payment_method: Set(new_order.payment_method),
            status: Set("New".to_string()),
            payment_status: Set("Pending".to_string()),
            assigned_rider_id: Set(None),
            estimated_time: Set(None),
            rating: Set(None),
            feedback: Set(None),
            date: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(order_id = %order_id, total = %order_model.total_amount, "order created");
        self.event_sender
            .send_or_log(Event::OrderCreated {
                order_id: order_id.clone(),
            })
            .await;

        Ok(order_model)
    }

    pub async fn find_by_id(
        &self,
        id: &str,
    ) -> Result<Option<(order::Model, Vec<order_item::Model>)>, ServiceError> {
        let Some(order_model) = order::Entity::find_by_id(id).one(&*self.db).await? else {
            return Ok(None);
        };

        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(id))
            .all(&*self.db)
            .await?;

        Ok(Some((order_model, items)))
    }

    /// All orders with their items, newest first.
    pub async fn list(&self) -> Result<Vec<(order::Model, Vec<order_item::Model>)>, ServiceError> {
        let orders = order::Entity::find()
            .order_by_desc(order::Column::Date)
            .find_with_related(order_item::Entity)
            .all(&*self.db)
            .await?;
        Ok(orders)
    }

    /// Applies a partial merge to the live order, then mirrors exactly the
    /// same field set into the log entry. Both writes share a transaction.
    #[instrument(skip(self, changes), fields(order_id = %id))]
    pub async fn update(
        &self,
        id: &str,
        changes: OrderChanges,
    ) -> Result<order::Model, ServiceError> {
        if changes.is_empty() {
            return Err(ServiceError::ValidationError(
                "No fields to update".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let existing = order::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;
        let old_status = existing.status.clone();

        let mut live: order::ActiveModel = existing.into();
        if let Some(status) = &changes.status {
            live.status = Set(status.clone());
        }
        if let Some(payment_status) = &changes.payment_status {
            live.payment_status = Set(payment_status.clone());
        }
        if let Some(rider) = &changes.assigned_rider_id {
            live.assigned_rider_id = Set(Some(rider.clone()));
        }
        if let Some(eta) = &changes.estimated_time {
            live.estimated_time = Set(Some(eta.clone()));
        }
        let updated = live.update(&txn).await?;

        self.mirror_to_log(&txn, id, |log| {
            if let Some(status) = &changes.status {
                log.status = Set(status.clone());
            }
            if let Some(payment_status) = &changes.payment_status {
                log.payment_status = Set(payment_status.clone());
            }
            if let Some(rider) = &changes.assigned_rider_id {
                log.assigned_rider_id = Set(Some(rider.clone()));
            }
            if let Some(eta) = &changes.estimated_time {
                log.estimated_time = Set(Some(eta.clone()));
            }
        })
        .await?;

        txn.commit().await?;

        if let Some(new_status) = changes.status.filter(|s| *s != old_status) {
            self.event_sender
                .send_or_log(Event::OrderStatusChanged {
                    order_id: id.to_string(),
                    old_status,
                    new_status,
                })
                .await;
        } else {
            self.event_sender
                .send_or_log(Event::OrderUpdated {
                    order_id: id.to_string(),
                })
                .await;
        }

        Ok(updated)
    }

    /// Sets the customer rating and feedback. Deliberately last-write-wins;
    /// re-rating overwrites.
    #[instrument(skip(self, feedback), fields(order_id = %id))]
    pub async fn rate(
        &self,
        id: &str,
        rating: i32,
        feedback: Option<String>,
    ) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        let existing = order::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        let mut live: order::ActiveModel = existing.into();
        live.rating = Set(Some(rating));
        live.feedback = Set(feedback.clone());
        live.update(&txn).await?;

        self.mirror_to_log(&txn, id, |log| {
            log.rating = Set(Some(rating));
            log.feedback = Set(feedback.clone());
        })
        .await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderRated {
                order_id: id.to_string(),
                rating,
            })
            .await;

        Ok(())
    }

    /// Removes the live order and its item rows; the log entry survives with
    /// its status stamped "Deleted (Admin)" as the permanent record.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        order::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        self.mirror_to_log(&txn, id, |log| {
            log.status = Set(DELETED_STATUS.to_string());
        })
        .await?;

        order_item::Entity::delete_many()
            .filter(order_item::Column::OrderId.eq(id))
            .exec(&txn)
            .await?;
        order::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;

        info!(order_id = %id, "order deleted; log entry retained");
        self.event_sender
            .send_or_log(Event::OrderDeleted {
                order_id: id.to_string(),
            })
            .await;

        Ok(())
    }

    /// Field-level update of the matching log entry. A missing entry means
    /// the creation-time invariant was broken elsewhere; it is logged, not
    /// fatal, so the live update still lands.
    async fn mirror_to_log<F>(
        &self,
        txn: &sea_orm::DatabaseTransaction,
        id: &str,
        apply: F,
    ) -> Result<(), ServiceError>
    where
        F: FnOnce(&mut order_log::ActiveModel),
    {
        match order_log::Entity::find_by_id(id).one(txn).await? {
            Some(entry) => {
                let mut log: order_log::ActiveModel = entry.into();
                apply(&mut log);
                log.update(txn).await?;
            }
            None => {
                warn!(order_id = %id, "no order_log entry to mirror into");
            }
        }
        Ok(())
    }
}
