//! HTML invoice rendering for orders.
//!
//! Invoices are rendered server-side from a minijinja template and returned
//! as standalone HTML the dashboard can print or save as PDF.

use minijinja::{Environment, context};
use rust_decimal::Decimal;

use crate::{
    config::Config,
    db::models::{customers::CustomerDBResponse, orders::OrderDBResponse},
    errors::Error,
    types::abbrev_uuid,
};

/// One printable line on the invoice. Descriptions come from the product
/// catalogue at render time, so renamed products show their current name.
#[derive(Debug, Clone)]
pub struct InvoiceLine {
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

const INVOICE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Invoice {{ invoice_number }}</title>
<style>
  body { font-family: sans-serif; margin: 2rem auto; max-width: 48rem; color: #222; }
  h1 { font-size: 1.4rem; }
  table { width: 100%; border-collapse: collapse; margin-top: 1.5rem; }
  th, td { text-align: left; padding: 0.4rem 0.6rem; border-bottom: 1px solid #ddd; }
  td.amount, th.amount { text-align: right; }
  .totals td { border: none; }
  .totals tr:last-child td { font-weight: bold; border-top: 2px solid #222; }
  .meta { color: #666; font-size: 0.9rem; }
  footer { margin-top: 3rem; color: #888; font-size: 0.8rem; }
</style>
</head>
<body>
<h1>{{ app_name }}{% if organization %} / {{ organization }}{% endif %}</h1>
<p class="meta">
  Invoice {{ invoice_number }}<br>
  Date: {{ issued_on }}<br>
  Status: {{ status }}
</p>
<p>
  <strong>Billed to</strong><br>
  {{ customer.name }}<br>
  {% if customer.address %}{{ customer.address }}<br>{% endif %}
  {% if customer.email %}{{ customer.email }}<br>{% endif %}
  {% if customer.phone %}{{ customer.phone }}{% endif %}
</p>
<table>
  <thead>
    <tr><th>Item</th><th class="amount">Qty</th><th class="amount">Unit price</th><th class="amount">Total</th></tr>
  </thead>
  <tbody>
    {% for line in lines %}
    <tr>
      <td>{{ line.description }}</td>
      <td class="amount">{{ line.quantity }}</td>
      <td class="amount">{{ line.unit_price }}</td>
      <td class="amount">{{ line.line_total }}</td>
    </tr>
    {% endfor %}
  </tbody>
</table>
<table class="totals">
  <tr><td></td><td class="amount">Subtotal</td><td class="amount">{{ subtotal }}</td></tr>
  {% if has_discount %}<tr><td></td><td class="amount">Discount</td><td class="amount">-{{ discount }}</td></tr>{% endif %}
  <tr><td></td><td class="amount">Total</td><td class="amount">{{ total }}</td></tr>
</table>
{% if notes %}<p class="meta">{{ notes }}</p>{% endif %}
<footer>
  {{ app_name }}{% if support_email %} &middot; {{ support_email }}{% endif %}
</footer>
</body>
</html>
"#;

/// Render an order as a standalone HTML invoice.
pub fn render_order_invoice(
    config: &Config,
    order: &OrderDBResponse,
    lines: &[InvoiceLine],
    customer: &CustomerDBResponse,
) -> Result<String, Error> {
    let mut env = Environment::new();
    env.add_template("invoice", INVOICE_TEMPLATE).map_err(anyhow::Error::new)?;

    let lines: Vec<_> = lines
        .iter()
        .map(|line| {
            context! {
                description => line.description,
                quantity => line.quantity,
                unit_price => line.unit_price.to_string(),
                line_total => line.line_total.to_string(),
            }
        })
        .collect();

    let html = env
        .get_template("invoice")
        .and_then(|t| {
            t.render(context! {
                app_name => config.metadata.app_name,
                organization => config.metadata.organization,
                support_email => config.metadata.support_email,
                invoice_number => format!("ORD-{}", abbrev_uuid(&order.id).to_uppercase()),
                issued_on => order.created_at.format("%-d %B %Y").to_string(),
                status => format!("{:?}", order.status).to_lowercase(),
                customer => context! {
                    name => customer.name,
                    address => customer.address,
                    email => customer.email,
                    phone => customer.phone,
                },
                lines => lines,
                subtotal => order.subtotal.to_string(),
                discount => order.discount.to_string(),
                has_discount => !order.discount.is_zero(),
                total => order.total.to_string(),
                notes => order.notes,
            })
        })
        .map_err(anyhow::Error::new)?;

    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::orders::OrderStatus;
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_order(discount: Decimal) -> OrderDBResponse {
        OrderDBResponse {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            enquiry_id: None,
            status: OrderStatus::Confirmed,
            subtotal: Decimal::new(49998, 2),
            discount,
            total: Decimal::new(49998, 2) - discount,
            notes: Some("Deliver before Friday".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sample_customer() -> CustomerDBResponse {
        CustomerDBResponse {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "Meera Traders".to_string(),
            email: Some("meera@example.com".to_string()),
            phone: None,
            address: Some("14 Market Road".to_string()),
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sample_lines() -> Vec<InvoiceLine> {
        vec![InvoiceLine {
            description: "Water purifier".to_string(),
            quantity: 2,
            unit_price: Decimal::new(24999, 2),
            line_total: Decimal::new(49998, 2),
        }]
    }

    #[test]
    fn test_invoice_contains_customer_and_lines() {
        let config = Config::default();
        let html = render_order_invoice(&config, &sample_order(Decimal::ZERO), &sample_lines(), &sample_customer()).unwrap();

        assert!(html.contains("Meera Traders"));
        assert!(html.contains("Water purifier"));
        assert!(html.contains("499.98"));
        assert!(html.contains("14 Market Road"));
        // No discount row when the discount is zero
        assert!(!html.contains("Discount"));
    }

    #[test]
    fn test_invoice_shows_discount_when_present() {
        let config = Config::default();
        let discount = Decimal::new(5000, 2);
        let html = render_order_invoice(&config, &sample_order(discount), &sample_lines(), &sample_customer()).unwrap();

        assert!(html.contains("Discount"));
        assert!(html.contains("-50.00"));
        assert!(html.contains("449.98"));
    }
}
