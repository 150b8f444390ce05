//! HTML bodies for the transactional emails sent about an order.

use crate::entities::{DeliveryMethod, OrderStatus, order_entity as orders};
use crate::error::{AppError, AppResult};
use crate::models::{EmailNotificationRequest, NotificationType};
use crate::services::payment_service::format_amount;

pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn short_id(order: &orders::Model) -> String {
    order.id.simple().to_string()[..8].to_uppercase()
}

fn layout(heading: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <body style="font-family: Arial, sans-serif; color: #333; max-width: 600px; margin: 0 auto;">
    <div style="background: #8B4513; color: #fff; padding: 20px; text-align: center;">
      <h1 style="margin: 0;">{heading}</h1>
    </div>
    <div style="padding: 20px;">
{body}
    </div>
    <div style="padding: 12px; font-size: 12px; color: #888; text-align: center;">
      Artisan Market &middot; Handmade in Uganda
    </div>
  </body>
</html>"#
    )
}

fn status_label(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "Pending",
        OrderStatus::Confirmed => "Confirmed",
        OrderStatus::Processing => "Being prepared",
        OrderStatus::Shipped => "Shipped",
        OrderStatus::Delivered => "Delivered",
        OrderStatus::Cancelled => "Cancelled",
    }
}

fn confirmation(
    request: &EmailNotificationRequest,
    order: &orders::Model,
    currency: &str,
) -> AppResult<String> {
    let name = escape_html(request.customer_name.as_deref().unwrap_or("there"));

    let rows = request
        .items
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|item| {
            let line_total = item
                .price
                .checked_mul(i64::from(item.quantity))
                .ok_or_else(|| {
                    AppError::ValidationError(format!(
                        "Line total out of range for {}",
                        item.name
                    ))
                })?;
            Ok(format!(
                "        <tr><td>{}</td><td style=\"text-align:center;\">{}</td><td style=\"text-align:right;\">{}</td></tr>\n",
                escape_html(&item.name),
                item.quantity,
                format_amount(currency, line_total)
            ))
        })
        .collect::<AppResult<String>>()?;

    let total = format_amount(currency, request.total.unwrap_or(order.total_amount));

    let method = request.delivery_method.unwrap_or(order.delivery_method);
    let destination = match method {
        DeliveryMethod::Pickup => "<p>You chose to collect your order at our pickup point. We will let you know when it is ready.</p>".to_string(),
        DeliveryMethod::Delivery => {
            let address = request.shipping_address.clone().unwrap_or_else(|| {
                [order.shipping_address.as_deref(), order.shipping_city.as_deref()]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join(", ")
            });
            format!(
                "<p><strong>Delivering to:</strong> {}</p>",
                escape_html(&address)
            )
        }
    };

    Ok(layout(
        "Thank you for your order!",
        &format!(
            r#"      <p>Hi {name},</p>
      <p>Your order <strong>#{id}</strong> has been received and confirmed.</p>
      <table style="width: 100%; border-collapse: collapse;">
        <tr><th style="text-align:left;">Item</th><th>Qty</th><th style="text-align:right;">Price</th></tr>
{rows}      </table>
      <p style="font-size: 18px;"><strong>Total: {total}</strong></p>
      {destination}"#,
            id = short_id(order),
        ),
    ))
}

fn status_update(request: &EmailNotificationRequest, order: &orders::Model, status: OrderStatus) -> String {
    let name = escape_html(request.customer_name.as_deref().unwrap_or("there"));
    layout(
        "Order update",
        &format!(
            r#"      <p>Hi {name},</p>
      <p>The status of your order <strong>#{id}</strong> is now:</p>
      <p style="font-size: 20px; color: #8B4513;"><strong>{label}</strong></p>"#,
            id = short_id(order),
            label = status_label(status),
        ),
    )
}

fn shipped(request: &EmailNotificationRequest, order: &orders::Model) -> String {
    let name = escape_html(request.customer_name.as_deref().unwrap_or("there"));
    let tracking = request
        .tracking_number
        .as_deref()
        .map(|t| format!("<p><strong>Tracking number:</strong> {}</p>", escape_html(t)))
        .unwrap_or_default();
    layout(
        "Your order is on its way!",
        &format!(
            r#"      <p>Hi {name},</p>
      <p>Good news: order <strong>#{id}</strong> has shipped and will reach you soon.</p>
      {tracking}"#,
            id = short_id(order),
        ),
    )
}

/// Render the email for `kind`. A status update without `newStatus` is a
/// validation error.
pub fn render(
    kind: NotificationType,
    request: &EmailNotificationRequest,
    order: &orders::Model,
    currency: &str,
) -> AppResult<RenderedEmail> {
    let rendered = match kind {
        NotificationType::Confirmation => RenderedEmail {
            subject: format!("Order Confirmed - #{}", short_id(order)),
            html: confirmation(request, order, currency)?,
        },
        NotificationType::StatusUpdate => {
            let status = request.new_status.ok_or_else(|| {
                AppError::ValidationError("Missing required field: newStatus".to_string())
            })?;
            RenderedEmail {
                subject: format!(
                    "Order #{} is now {}",
                    short_id(order),
                    status_label(status)
                ),
                html: status_update(request, order, status),
            }
        }
        NotificationType::Shipped => RenderedEmail {
            subject: format!("Your order #{} has shipped", short_id(order)),
            html: shipped(request, order),
        },
    };
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::PaymentMethod;
    use crate::models::EmailLineItem;
    use chrono::Utc;
    use uuid::Uuid;

    fn order() -> orders::Model {
        orders::Model {
            id: Uuid::new_v4(),
            buyer_id: Uuid::new_v4(),
            status: OrderStatus::Confirmed,
            total_amount: 115_000,
            shipping_cost: 15_000,
            delivery_method: DeliveryMethod::Delivery,
            shipping_name: "Okello James".to_string(),
            shipping_phone: "+256772123456".to_string(),
            shipping_address: Some("Plot 7, Lumumba Avenue".to_string()),
            shipping_city: Some("Kampala".to_string()),
            pickup_location_id: None,
            payment_method: PaymentMethod::MobileMoney,
            notes: None,
            idempotency_key: Some("k".to_string()),
            request_fingerprint: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_confirmation_lists_items_and_escapes_names() {
        let request = EmailNotificationRequest {
            notification_type: Some(NotificationType::Confirmation),
            customer_name: Some("<Okello>".to_string()),
            items: Some(vec![EmailLineItem {
                name: "Woven basket".to_string(),
                quantity: 2,
                price: 50_000,
            }]),
            ..Default::default()
        };
        let email = render(NotificationType::Confirmation, &request, &order(), "UGX").unwrap();
        assert!(email.subject.starts_with("Order Confirmed"));
        assert!(email.html.contains("Woven basket"));
        assert!(email.html.contains("UGX 100,000"));
        assert!(email.html.contains("UGX 115,000"));
        assert!(email.html.contains("Plot 7, Lumumba Avenue, Kampala"));
        assert!(email.html.contains("&lt;Okello&gt;"));
        assert!(!email.html.contains("<Okello>"));
    }

    #[test]
    fn test_confirmation_rejects_overflowing_line_total() {
        let request = EmailNotificationRequest {
            items: Some(vec![EmailLineItem {
                name: "Woven basket".to_string(),
                quantity: 2,
                price: i64::MAX,
            }]),
            ..Default::default()
        };
        assert!(matches!(
            render(NotificationType::Confirmation, &request, &order(), "UGX"),
            Err(AppError::ValidationError(m)) if m.contains("Woven basket")
        ));
    }

    #[test]
    fn test_status_update_requires_new_status() {
        let request = EmailNotificationRequest::default();
        assert!(matches!(
            render(NotificationType::StatusUpdate, &request, &order(), "UGX"),
            Err(AppError::ValidationError(_))
        ));

        let request = EmailNotificationRequest {
            new_status: Some(OrderStatus::Processing),
            ..Default::default()
        };
        let email = render(NotificationType::StatusUpdate, &request, &order(), "UGX").unwrap();
        assert!(email.html.contains("Being prepared"));
    }

    #[test]
    fn test_shipped_includes_tracking_number() {
        let request = EmailNotificationRequest {
            tracking_number: Some("UG-TRK-0042".to_string()),
            ..Default::default()
        };
        let email = render(NotificationType::Shipped, &request, &order(), "UGX").unwrap();
        assert!(email.subject.contains("has shipped"));
        assert!(email.html.contains("UG-TRK-0042"));
    }
}
