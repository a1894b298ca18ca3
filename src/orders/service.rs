use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::repo::User,
    catalog::Product,
    error::ApiError,
    mail::{MailError, Outbound},
    notice::Notice,
    orders::repo::Order,
    state::AppState,
};

/// Order workflow: validate the selection, persist with the price lock,
/// then attempt the confirmation email. The order stands regardless of
/// the mail outcome.
pub async fn place_order(
    state: &AppState,
    user_id: Uuid,
    product_id: Uuid,
) -> Result<(Order, Notice), ApiError> {
    let product = Product::find_active(&state.db, product_id)
        .await?
        .ok_or_else(|| ApiError::validation("product", "Select a valid product"))?;

    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let order = Order::create(&state.db, user_id, &product).await?;
    info!(
        user_id = %user_id,
        order_id = %order.order_id,
        total = %order.total_amount,
        "order created"
    );

    let outcome = state
        .mailer
        .send(Outbound {
            subject: confirmation_subject(&order.order_id),
            body: confirmation_body(&user.username, &product.name, &order),
            to: vec![user.email],
        })
        .await;
    if let Err(e) = &outcome {
        warn!(order_id = %order.order_id, error = %e, "confirmation email failed");
    }

    let notice = order_notice(outcome);
    Ok((order, notice))
}

fn confirmation_subject(order_id: &str) -> String {
    format!("Order Confirmation - {order_id}")
}

fn confirmation_body(username: &str, product_name: &str, order: &Order) -> String {
    format!(
        "Hi {username},\n\n\
         Thank you for your order!\n\
         Product: {product_name}\n\
         Order ID: {}\n\
         Total Amount: {}\n\n\
         We'll notify you as your order progresses.\n\
         - eshop Team",
        order.order_id, order.total_amount
    )
}

/// Communication failure must not block commerce: transport trouble is a
/// warning on an otherwise successful order.
fn order_notice(outcome: Result<(), MailError>) -> Notice {
    match outcome {
        Ok(()) => Notice::success("Order placed! A confirmation email was sent."),
        Err(MailError::BadHeader(_)) => Notice::error("Invalid header found."),
        Err(e @ MailError::Transport(_)) => {
            Notice::warning(format!("Order placed, but email could not be sent: {e}"))
        }
    }
}
