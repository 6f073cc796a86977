//! Checkout and status transitions
//!
//! Every write runs in one transaction. Emails are queued only after commit.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    CartItem, Franchise, FranchiseProduct, LoyaltyEntryType, LoyaltyHistory, Order, OrderCreate,
    OrderItem, OrderStatus, Product, ProductStatus, Role, points_for_total,
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::number::order_number;
use crate::auth::CurrentUser;
use crate::catalog::{EffectivePricing, geo};
use crate::db;
use crate::email::{Notification, Notifier};
use crate::error::{ServiceResult, unique_violation};

const ORDER_NUMBER_ATTEMPTS: usize = 3;

/// One cart line joined with its product and franchise overlay
#[derive(Debug, Clone)]
pub struct CheckoutLine {
    pub item: CartItem,
    pub product: Product,
    pub overlay: Option<FranchiseProduct>,
}

/// Priced order lines before an id is assigned
#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub product_id: Uuid,
    pub name: String,
    pub sku: String,
    pub image_url: Option<String>,
    pub quantity: i32,
    pub price: Decimal,
}

/// Priced checkout, independent of the order id
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub franchise_id: Option<Uuid>,
    pub delivery_address: String,
    pub payment_method: String,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub lines: Vec<NewOrderLine>,
}

impl NewOrder {
    /// Snapshot each line at its current price and compute totals
    pub fn new(
        user_id: Uuid,
        franchise: Option<&Franchise>,
        input: &OrderCreate,
        lines: &[CheckoutLine],
        now: DateTime<Utc>,
    ) -> Result<Self, AppError> {
        if lines.is_empty() {
            return Err(AppError::new(ErrorCode::CartEmpty));
        }
        let delivery_address = input.delivery_address.trim();
        if delivery_address.is_empty() {
            return Err(AppError::validation("delivery_address is required"));
        }
        let payment_method = input.payment_method.trim();
        if payment_method.is_empty() {
            return Err(AppError::validation("payment_method is required"));
        }

        let mut priced = Vec::with_capacity(lines.len());
        for line in lines {
            let orderable = match franchise {
                Some(_) => line.overlay.as_ref().is_some_and(|o| o.is_available),
                None => {
                    line.product.status == ProductStatus::Active && line.product.online_visible
                }
            };
            if !orderable {
                return Err(AppError::with_message(
                    ErrorCode::ProductUnavailable,
                    format!("{} is not available", line.product.name),
                )
                .with_detail("product_id", line.product.id.to_string()));
            }

            let price =
                EffectivePricing::resolve(&line.product, line.overlay.as_ref()).current_price(now);
            priced.push(NewOrderLine {
                product_id: line.product.id,
                name: line.product.name.clone(),
                sku: line.product.sku.clone(),
                image_url: line.product.primary_image_url().map(str::to_string),
                quantity: line.item.quantity,
                price,
            });
        }

        let subtotal: Decimal = priced
            .iter()
            .map(|l| l.price * Decimal::from(l.quantity))
            .sum();
        let delivery_fee = franchise
            .map(|f| geo::delivery_fee(subtotal, f.delivery_fee, f.free_delivery_min))
            .unwrap_or(Decimal::ZERO);

        Ok(Self {
            user_id,
            franchise_id: franchise.map(|f| f.id),
            delivery_address: delivery_address.to_string(),
            payment_method: payment_method.to_string(),
            subtotal,
            delivery_fee,
            lines: priced,
        })
    }

    pub fn to_order(&self, id: Uuid, now: DateTime<Utc>) -> Order {
        let items = self
            .lines
            .iter()
            .map(|l| OrderItem {
                id: Uuid::new_v4(),
                order_id: id,
                product_id: Some(l.product_id),
                product_name_snapshot: l.name.clone(),
                product_sku_snapshot: l.sku.clone(),
                image_url_snapshot: l.image_url.clone(),
                quantity: l.quantity,
                price_snapshot: l.price,
            })
            .collect();

        Order {
            id,
            order_number: order_number(id, now),
            user_id: self.user_id,
            franchise_id: self.franchise_id,
            status: OrderStatus::Pending,
            subtotal: self.subtotal,
            delivery_fee: self.delivery_fee,
            total: self.subtotal + self.delivery_fee,
            delivery_address: self.delivery_address.clone(),
            payment_method: self.payment_method.clone(),
            loyalty_points_earned: 0,
            created_at: now,
            updated_at: now,
            items,
        }
    }
}

/// Side effects of moving `order` to `next`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransitionEffects {
    pub restore_stock: bool,
    pub credit_points: i32,
    pub reverse_points: i32,
}

pub fn transition_effects(order: &Order, next: OrderStatus) -> TransitionEffects {
    match next {
        OrderStatus::Cancelled => TransitionEffects {
            restore_stock: true,
            reverse_points: order.loyalty_points_earned.max(0),
            ..Default::default()
        },
        OrderStatus::Delivered => TransitionEffects {
            credit_points: points_for_total(order.total),
            ..Default::default()
        },
        OrderStatus::Pending
        | OrderStatus::Confirmed
        | OrderStatus::Preparing
        | OrderStatus::Ready
        | OrderStatus::OutForDelivery => TransitionEffects::default(),
    }
}

/// Reject moves outside the lifecycle graph with 409
pub fn check_transition(order: &Order, next: OrderStatus) -> Result<(), AppError> {
    if !order.status.can_transition_to(next) {
        return Err(AppError::with_message(
            ErrorCode::InvalidStatusTransition,
            format!("Cannot move order from {} to {}", order.status, next),
        ));
    }
    if order.status == OrderStatus::Pending && next != OrderStatus::Cancelled && order.items.is_empty()
    {
        return Err(AppError::with_message(
            ErrorCode::InvalidStatusTransition,
            "Order has no items",
        ));
    }
    Ok(())
}

/// Admins move any order, franchise members their franchise's orders,
/// customers may only cancel their own pending order
pub fn authorize_transition(
    actor: &CurrentUser,
    order: &Order,
    next: OrderStatus,
) -> Result<(), AppError> {
    let allowed = match actor.role {
        Role::Admin => true,
        Role::FranchiseOwner | Role::FranchiseStaff => {
            order.franchise_id.is_some() && actor.managed_franchise() == order.franchise_id
        }
        Role::Customer => {
            order.user_id == actor.id
                && order.status == OrderStatus::Pending
                && next == OrderStatus::Cancelled
        }
    };
    if allowed {
        Ok(())
    } else {
        tracing::warn!(user_id = %actor.id, order_id = %order.id, next = %next, "Order transition denied");
        Err(AppError::forbidden("Not allowed to change this order"))
    }
}

/// Owner, the order's franchise, or an admin
pub fn ensure_can_view(actor: &CurrentUser, order: &Order) -> Result<(), AppError> {
    let allowed = match actor.role {
        Role::Admin => true,
        Role::FranchiseOwner | Role::FranchiseStaff => {
            order.user_id == actor.id
                || (order.franchise_id.is_some()
                    && actor.managed_franchise() == order.franchise_id)
        }
        Role::Customer => order.user_id == actor.id,
    };
    if allowed {
        Ok(())
    } else {
        Err(AppError::forbidden("Not allowed to view this order"))
    }
}

/// Cart franchise, else the nearest one delivering to the customer, else none
async fn select_franchise(
    conn: &mut PgConnection,
    cart: &[CartItem],
    input: &OrderCreate,
) -> ServiceResult<Option<Franchise>> {
    let mut ids: Vec<Uuid> = cart.iter().filter_map(|c| c.franchise_id).collect();
    ids.sort();
    ids.dedup();

    match ids.as_slice() {
        [] => {}
        [id] => {
            let franchise = db::franchises::find(&mut *conn, *id)
                .await?
                .filter(|f| f.is_active)
                .ok_or_else(|| AppError::new(ErrorCode::FranchiseNotFound))?;
            return Ok(Some(franchise));
        }
        _ => return Err(AppError::new(ErrorCode::MixedFranchiseCart).into()),
    }

    if let (Some(lat), Some(lng)) = (input.customer_lat, input.customer_lng) {
        let active = db::franchises::list_active(&mut *conn).await?;
        return Ok(geo::candidates(active, lat, lng)
            .into_iter()
            .next()
            .map(|n| n.franchise));
    }
    Ok(None)
}

pub async fn create_order(
    pool: &PgPool,
    notifier: &Notifier,
    actor: &CurrentUser,
    input: &OrderCreate,
) -> ServiceResult<Order> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    if !db::users::lock(&mut tx, actor.id).await? {
        return Err(AppError::not_authenticated().into());
    }
    let user = db::users::find(&mut *tx, actor.id)
        .await?
        .ok_or_else(AppError::not_authenticated)?;

    let cart = db::cart::list(&mut *tx, actor.id).await?;
    if cart.is_empty() {
        return Err(AppError::new(ErrorCode::CartEmpty).into());
    }
    let franchise = select_franchise(&mut tx, &cart, input).await?;

    let mut lines = Vec::with_capacity(cart.len());
    for item in cart {
        let mut product = db::products::find(&mut *tx, item.product_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::ProductUnavailable))?;
        product.images = db::products::images(&mut *tx, product.id).await?;
        let overlay = match &franchise {
            Some(f) => db::franchise_products::find(&mut *tx, f.id, product.id).await?,
            None => None,
        };
        lines.push(CheckoutLine {
            item,
            product,
            overlay,
        });
    }

    let draft = NewOrder::new(actor.id, franchise.as_ref(), input, &lines, now)?;

    for line in &draft.lines {
        let taken = match draft.franchise_id {
            Some(fid) => {
                db::franchise_products::decrement_stock(&mut tx, fid, line.product_id, line.quantity)
                    .await?
            }
            None => db::products::decrement_stock(&mut tx, line.product_id, line.quantity).await?,
        };
        if !taken {
            return Err(AppError::with_message(
                ErrorCode::InsufficientStock,
                format!("Not enough stock for {}", line.name),
            )
            .with_detail("product_id", line.product_id.to_string())
            .into());
        }
    }

    let mut created = None;
    for attempt in 1..=ORDER_NUMBER_ATTEMPTS {
        let order = draft.to_order(Uuid::new_v4(), now);
        let mut savepoint = sqlx::Connection::begin(&mut *tx).await?;
        match db::orders::insert(&mut savepoint, &order).await {
            Ok(()) => {
                savepoint.commit().await?;
                created = Some(order);
                break;
            }
            Err(e) if unique_violation(&e) == Some("orders_order_number_key") => {
                savepoint.rollback().await?;
                tracing::warn!(attempt, order_number = %order.order_number, "Order number collision, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
    let order = created.ok_or_else(|| AppError::internal("Could not allocate an order number"))?;

    db::cart::clear(&mut *tx, actor.id).await?;
    tx.commit().await?;

    tracing::info!(
        order_id = %order.id,
        order_number = %order.order_number,
        user_id = %actor.id,
        franchise_id = ?order.franchise_id,
        total = %order.total,
        "Order created"
    );
    notifier.send(Notification::OrderConfirmation {
        to: user.email,
        name: user.name,
        order_number: order.order_number.clone(),
        total: order.total,
    });
    Ok(order)
}

pub async fn transition(
    pool: &PgPool,
    notifier: &Notifier,
    actor: &CurrentUser,
    order_id: Uuid,
    next: OrderStatus,
) -> ServiceResult<Order> {
    let mut tx = pool.begin().await?;

    let mut order = db::orders::find_for_update(&mut tx, order_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    authorize_transition(actor, &order, next)?;
    check_transition(&order, next)?;

    let effects = transition_effects(&order, next);
    let now = Utc::now();

    if effects.restore_stock {
        for item in &order.items {
            let Some(product_id) = item.product_id else {
                continue;
            };
            match order.franchise_id {
                Some(fid) => {
                    db::franchise_products::restore_stock(&mut tx, fid, product_id, item.quantity)
                        .await?
                }
                None => db::products::restore_stock(&mut tx, product_id, item.quantity).await?,
            }
        }
    }

    let mut points_earned = order.loyalty_points_earned;
    if effects.reverse_points > 0 {
        db::users::add_loyalty_points(&mut *tx, order.user_id, -effects.reverse_points).await?;
        db::loyalty::insert(
            &mut *tx,
            &LoyaltyHistory {
                id: Uuid::new_v4(),
                user_id: order.user_id,
                points: -effects.reverse_points,
                entry_type: LoyaltyEntryType::Redeemed,
                order_id: Some(order.id),
                description: format!("Reversed for cancelled order {}", order.order_number),
                created_at: now,
            },
        )
        .await?;
        points_earned = 0;
    }
    if effects.credit_points > 0 {
        db::users::add_loyalty_points(&mut *tx, order.user_id, effects.credit_points).await?;
        db::loyalty::insert(
            &mut *tx,
            &LoyaltyHistory {
                id: Uuid::new_v4(),
                user_id: order.user_id,
                points: effects.credit_points,
                entry_type: LoyaltyEntryType::Earned,
                order_id: Some(order.id),
                description: format!("Earned on order {}", order.order_number),
                created_at: now,
            },
        )
        .await?;
        points_earned = effects.credit_points;
    }

    db::orders::update_status(&mut *tx, order.id, next, points_earned).await?;
    tx.commit().await?;

    tracing::info!(
        order_id = %order.id,
        from = %order.status,
        to = %next,
        actor = %actor.id,
        "Order status changed"
    );

    order.status = next;
    order.loyalty_points_earned = points_earned;
    order.updated_at = now;

    if let Some(customer) = db::users::find(pool, order.user_id).await? {
        notifier.send(Notification::StatusUpdate {
            to: customer.email,
            name: customer.name,
            order_number: order.order_number.clone(),
            status: next,
        });
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::pricing::tests::{overlay, product};
    use chrono::Duration;

    fn input() -> OrderCreate {
        OrderCreate {
            delivery_address: " 1 High St ".into(),
            payment_method: "card".into(),
            customer_lat: None,
            customer_lng: None,
        }
    }

    fn franchise(fee: i64, free_min: Option<i64>) -> Franchise {
        Franchise {
            id: Uuid::new_v4(),
            name: "Central".into(),
            slug: "central".into(),
            owner_id: Uuid::new_v4(),
            address: String::new(),
            latitude: 0.0,
            longitude: 0.0,
            delivery_radius_km: 5.0,
            delivery_fee: Decimal::new(fee, 2),
            free_delivery_min: free_min.map(|m| Decimal::new(m, 2)),
            is_active: true,
        }
    }

    fn line(product: Product, quantity: i32, overlay: Option<FranchiseProduct>) -> CheckoutLine {
        CheckoutLine {
            item: CartItem {
                user_id: Uuid::nil(),
                product_id: product.id,
                franchise_id: overlay.as_ref().map(|o| o.franchise_id),
                quantity,
            },
            product,
            overlay,
        }
    }

    fn order(status: OrderStatus, user_id: Uuid, franchise_id: Option<Uuid>) -> Order {
        let draft = NewOrder {
            user_id,
            franchise_id,
            delivery_address: "x".into(),
            payment_method: "card".into(),
            subtotal: Decimal::new(4250, 2),
            delivery_fee: Decimal::new(299, 2),
            lines: vec![NewOrderLine {
                product_id: Uuid::new_v4(),
                name: "Bread".into(),
                sku: "B".into(),
                image_url: None,
                quantity: 1,
                price: Decimal::new(4250, 2),
            }],
        };
        let mut order = draft.to_order(Uuid::new_v4(), Utc::now());
        order.status = status;
        order
    }

    fn actor(role: Role, id: Uuid, franchise_id: Option<Uuid>) -> CurrentUser {
        CurrentUser {
            id,
            email: "a@example.com".into(),
            role,
            franchise_id,
        }
    }

    #[test]
    fn test_global_checkout_prices_and_totals() {
        let now = Utc::now();
        let mut promo = product(300);
        promo.promotion_price = Some(Decimal::new(200, 2));
        promo.promotion_end = Some(now + Duration::days(1));
        let plain = product(150);

        let draft = NewOrder::new(
            Uuid::new_v4(),
            None,
            &input(),
            &[line(promo, 2, None), line(plain, 3, None)],
            now,
        )
        .unwrap();

        assert_eq!(draft.lines[0].price, Decimal::new(200, 2));
        assert_eq!(draft.subtotal, Decimal::new(850, 2));
        assert_eq!(draft.delivery_fee, Decimal::ZERO);
        assert_eq!(draft.delivery_address, "1 High St");

        let order = draft.to_order(Uuid::new_v4(), now);
        assert_eq!(order.total, order.subtotal + order.delivery_fee);
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.items.iter().all(|i| i.order_id == order.id));
        assert!(order.order_number.starts_with("ORD"));
    }

    #[test]
    fn test_franchise_checkout_uses_overlay_and_fee() {
        let now = Utc::now();
        let f = franchise(299, Some(3000));
        let p = product(500);
        let mut o = overlay(p.id, f.id, 10);
        o.retail_price_override = Some(Decimal::new(450, 2));

        let draft = NewOrder::new(Uuid::new_v4(), Some(&f), &input(), &[line(p.clone(), 2, Some(o.clone()))], now)
            .unwrap();
        assert_eq!(draft.subtotal, Decimal::new(900, 2));
        assert_eq!(draft.delivery_fee, Decimal::new(299, 2));
        assert_eq!(draft.franchise_id, Some(f.id));

        let big = NewOrder::new(Uuid::new_v4(), Some(&f), &input(), &[line(p, 7, Some(o))], now)
            .unwrap();
        assert_eq!(big.subtotal, Decimal::new(3150, 2));
        assert_eq!(big.delivery_fee, Decimal::ZERO);
    }

    #[test]
    fn test_unavailable_lines_are_rejected() {
        let now = Utc::now();
        let f = franchise(0, None);

        let no_overlay = NewOrder::new(Uuid::new_v4(), Some(&f), &input(), &[line(product(100), 1, None)], now)
            .unwrap_err();
        assert_eq!(no_overlay.code, ErrorCode::ProductUnavailable);

        let mut inactive = product(100);
        inactive.status = ProductStatus::Inactive;
        let err = NewOrder::new(Uuid::new_v4(), None, &input(), &[line(inactive, 1, None)], now)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ProductUnavailable);

        let empty = NewOrder::new(Uuid::new_v4(), None, &input(), &[], now).unwrap_err();
        assert_eq!(empty.code, ErrorCode::CartEmpty);

        let mut blank = input();
        blank.delivery_address = "  ".into();
        let err = NewOrder::new(Uuid::new_v4(), None, &blank, &[line(product(100), 1, None)], now)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn test_invalid_transitions_conflict() {
        let o = order(OrderStatus::Pending, Uuid::new_v4(), None);
        assert!(check_transition(&o, OrderStatus::Confirmed).is_ok());
        let err = check_transition(&o, OrderStatus::Delivered).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStatusTransition);
        assert_eq!(err.http_status(), http::StatusCode::CONFLICT);

        let done = order(OrderStatus::Delivered, Uuid::new_v4(), None);
        assert!(check_transition(&done, OrderStatus::Cancelled).is_err());

        let mut empty = order(OrderStatus::Pending, Uuid::new_v4(), None);
        empty.items.clear();
        assert!(check_transition(&empty, OrderStatus::Confirmed).is_err());
        assert!(check_transition(&empty, OrderStatus::Cancelled).is_ok());
    }

    #[test]
    fn test_transition_effects() {
        let mut o = order(OrderStatus::OutForDelivery, Uuid::new_v4(), None);
        assert_eq!(
            transition_effects(&o, OrderStatus::Delivered),
            TransitionEffects {
                credit_points: 45,
                ..Default::default()
            }
        );
        assert_eq!(
            transition_effects(&o, OrderStatus::Cancelled),
            TransitionEffects {
                restore_stock: true,
                ..Default::default()
            }
        );
        o.loyalty_points_earned = 12;
        assert_eq!(transition_effects(&o, OrderStatus::Cancelled).reverse_points, 12);
        assert_eq!(
            transition_effects(&o, OrderStatus::Confirmed),
            TransitionEffects::default()
        );
    }

    #[test]
    fn test_transition_authorization() {
        let customer_id = Uuid::new_v4();
        let fid = Uuid::new_v4();
        let pending = order(OrderStatus::Pending, customer_id, Some(fid));
        let confirmed = order(OrderStatus::Confirmed, customer_id, Some(fid));

        let customer = actor(Role::Customer, customer_id, None);
        assert!(authorize_transition(&customer, &pending, OrderStatus::Cancelled).is_ok());
        assert!(authorize_transition(&customer, &pending, OrderStatus::Confirmed).is_err());
        assert!(authorize_transition(&customer, &confirmed, OrderStatus::Cancelled).is_err());

        let stranger = actor(Role::Customer, Uuid::new_v4(), None);
        assert!(authorize_transition(&stranger, &pending, OrderStatus::Cancelled).is_err());

        let staff = actor(Role::FranchiseStaff, Uuid::new_v4(), Some(fid));
        assert!(authorize_transition(&staff, &pending, OrderStatus::Confirmed).is_ok());
        let other_staff = actor(Role::FranchiseStaff, Uuid::new_v4(), Some(Uuid::new_v4()));
        let err = authorize_transition(&other_staff, &pending, OrderStatus::Confirmed).unwrap_err();
        assert_eq!(err.http_status(), http::StatusCode::FORBIDDEN);

        let admin = actor(Role::Admin, Uuid::new_v4(), None);
        assert!(authorize_transition(&admin, &confirmed, OrderStatus::Preparing).is_ok());

        let global = order(OrderStatus::Pending, customer_id, None);
        let owner = actor(Role::FranchiseOwner, Uuid::new_v4(), Some(fid));
        assert!(authorize_transition(&owner, &global, OrderStatus::Confirmed).is_err());
    }

    #[test]
    fn test_view_authorization() {
        let customer_id = Uuid::new_v4();
        let fid = Uuid::new_v4();
        let o = order(OrderStatus::Pending, customer_id, Some(fid));
        assert!(ensure_can_view(&actor(Role::Customer, customer_id, None), &o).is_ok());
        assert!(ensure_can_view(&actor(Role::Customer, Uuid::new_v4(), None), &o).is_err());
        assert!(ensure_can_view(&actor(Role::FranchiseOwner, Uuid::new_v4(), Some(fid)), &o).is_ok());
        assert!(ensure_can_view(&actor(Role::Admin, Uuid::new_v4(), None), &o).is_ok());
    }
}
